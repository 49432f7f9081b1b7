//! Error types for every stage of a spinorial search experiment.
//!
//! ```text
//! ExperimentError
//! ├── ConstructionError   (per circuit: generators, rotations, circuits)
//! ├── NormalizationError  (per circuit: counts → probabilities → fidelity)
//! ├── ExecutionError      (per batch: backend submission and results)
//! ├── PersistenceError    (per run: report file I/O)
//! └── ConfigError         (per run: configuration loading/validation)
//! ```
//!
//! Per-circuit errors are recorded against their generator pair and do not
//! abort an experiment; per-batch and per-run errors do.

use std::path::PathBuf;
use thiserror::Error;
use crate::report::ExperimentReport;

/// Failure to build generators, rotations, or search circuits.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstructionError {
    /// No generators exist for fewer than one qubit.
    #[error("invalid qubit count {0}: at least one qubit is required")]
    InvalidQubitCount(usize),

    /// The qubit count exceeds what can be simulated with dense operators.
    #[error("qubit count {n} exceeds the dense-simulation limit of {max}")]
    TooManyQubits { n: usize, max: usize },

    /// A rotation plane needs two distinct generators.
    #[error("degenerate generator pair ({0}, {0}): a bivector needs i ≠ j")]
    DegeneratePair(usize),

    /// A generator index outside of the generator set.
    #[error("generator index {index} out of range for {len} generators")]
    IndexOutOfRange { index: usize, len: usize },

    /// Operands act on different numbers of qubits.
    #[error("qubit count mismatch: expected {expected}, got {got}")]
    QubitMismatch { expected: usize, got: usize },

    /// A Pauli label contained something other than `I`, `X`, `Y`, `Z`.
    #[error("malformed Pauli label {0:?}")]
    MalformedLabel(String),

    /// An operator expected to be Hermitian was not.
    #[error("operator {0} is not Hermitian")]
    NotHermitian(String),

    /// Rotation angles must be finite and positive to fix an iteration count.
    #[error("invalid rotation angle {0}: must be finite and > 0")]
    InvalidAngle(f64),

    /// The angle is so small that the circuit would need more rounds than
    /// [`MAX_ITERATIONS`][crate::search::MAX_ITERATIONS].
    #[error("rotation angle {theta} needs {k} amplification rounds, more than the limit of {max}")]
    TooManyIterations { theta: f64, k: f64, max: usize },

    /// A state vector of the wrong length or norm.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Statevector simulation cannot pass a measurement.
    #[error("instruction {position} is a measurement; statevector simulation requires a unitary circuit")]
    NonUnitary { position: usize },

    /// Measurements must be the final instructions of a sampled circuit.
    #[error("measurement at instruction {position} is followed by further operations")]
    MidCircuitMeasurement { position: usize },
}

/// Failure to turn raw counts into probabilities or a fidelity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// Counts sum to zero, so no distribution can be formed.
    #[error("zero total shots: counts cannot be normalized")]
    ZeroShots,

    /// A counts key that is not an `n`-bit binary string.
    #[error("outcome label {label:?} is not a {width}-bit basis state")]
    InvalidOutcome { label: String, width: usize },

    /// The ideal distribution does not cover `2^n` basis states.
    #[error("ideal distribution has {got} entries; expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Failure of the execution collaborator for a whole batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    /// The backend could not be reached or refused work.
    #[error("backend {0} is unavailable")]
    BackendUnavailable(String),

    /// The job could not be queued.
    #[error("job submission failed: {0}")]
    SubmissionFailed(String),

    /// The job finished unsuccessfully.
    #[error("job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    /// The job was cancelled before completing.
    #[error("job {0} was cancelled")]
    JobCancelled(String),

    /// The backend does not know the job.
    #[error("job {0} not found")]
    JobNotFound(String),

    /// The job did not complete in time and was cancelled.
    #[error("job {job_id} timed out after {timeout_secs}s")]
    Timeout { job_id: String, timeout_secs: u64 },

    /// The backend returned a different number of results than submitted.
    #[error("backend returned {got} results for {expected} circuits")]
    ResultCountMismatch { expected: usize, got: usize },

    /// A result could not be attributed to exactly one submitted circuit.
    #[error("result {position} cannot be attributed to a submitted circuit: {reason}")]
    Misattributed { position: usize, reason: String },

    /// The backend rejected a circuit it cannot run.
    #[error("circuit rejected by backend: {0}")]
    CircuitRejected(String),
}

/// Failure to read or write an experiment report.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A report file belonging to a different job.
    #[error("report belongs to job {found:?}, expected {expected:?}")]
    JobMismatch { expected: String, found: String },

    /// A report that fails its own consistency checks.
    #[error("inconsistent report: {0}")]
    Inconsistent(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self
    {
        Self::Io { path: path.into(), source }
    }
}

/// Invalid or unreadable experiment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The configuration file could not be read or written.
    #[error("cannot access config file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`ExperimentConfig`].
    ///
    /// [`ExperimentConfig`]: crate::config::ExperimentConfig
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>)
        -> Self
    {
        Self::InvalidValue { field, reason: reason.into() }
    }
}

/// Top-level error for a whole experiment run.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// The report could not be written; the in-memory report is preserved.
    #[error("cannot persist report for job {}: {source}", .report.job_id)]
    Persistence {
        report: Box<ExperimentReport>,
        #[source]
        source: PersistenceError,
    },

    /// Every generator pair failed before submission.
    #[error("no circuits left to submit for n = {0}")]
    NothingToSubmit(usize),
}

/// Convenience alias for experiment-level results.
pub type ExperimentResult<T> = Result<T, ExperimentError>;
