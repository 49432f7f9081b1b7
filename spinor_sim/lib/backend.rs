//! The execution seam: anything that accepts a batch of circuits and returns
//! sampled outcome counts for each of them.
//!
//! A [`Backend`] works on whole batches. Results come back as
//! [`ExecutedCircuit`]s carrying the [`CircuitMetadata`] of the circuit they
//! belong to, which callers use to match results to submissions; the order in
//! which a backend returns results carries no meaning.

use std::{
    fmt,
    sync::{ atomic::{ AtomicUsize, Ordering }, Mutex, MutexGuard },
};
use rand::{
    distributions::{ Distribution, WeightedIndex },
    rngs::StdRng,
    SeedableRng,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::debug;
use crate::{
    circuit::{ Circuit, CircuitMetadata },
    error::ExecutionError,
    fidelity::Counts,
};

/// Opaque identifier for a submitted batch.
pub type JobId = String;

/// Per-batch execution parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of samples drawn per circuit.
    pub shots: u64,
    /// Compiler optimization level, 0 to 3. Interpretation is up to the
    /// backend.
    pub optimization_level: u8,
}

/// Lifecycle of a submitted job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl JobStatus {
    /// Return `true` if the job will not change status anymore.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The outcome of one circuit of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutedCircuit {
    /// Metadata echoed from the submitted circuit, if the backend preserved
    /// it.
    pub metadata: Option<CircuitMetadata>,
    pub counts: Counts,
    /// Depth of the circuit as compiled by the backend.
    pub depth: usize,
}

/// A batch execution service.
pub trait Backend: Send + Sync {
    /// Identifier recorded for provenance.
    fn name(&self) -> &str;

    /// Queue `batch` for execution, returning a handle to the job.
    fn submit(&self, batch: &[Circuit], options: &RunOptions)
        -> Result<JobId, ExecutionError>;

    /// Poll the status of a job.
    fn status(&self, job_id: &str) -> Result<JobStatus, ExecutionError>;

    /// Fetch the results of a completed job, one per submitted circuit in any
    /// order.
    fn results(&self, job_id: &str)
        -> Result<Vec<ExecutedCircuit>, ExecutionError>;

    /// Abandon a job.
    fn cancel(&self, job_id: &str) -> Result<(), ExecutionError>;
}

impl<B> Backend for &B
where B: Backend + ?Sized
{
    fn name(&self) -> &str { (**self).name() }

    fn submit(&self, batch: &[Circuit], options: &RunOptions)
        -> Result<JobId, ExecutionError>
    {
        (**self).submit(batch, options)
    }

    fn status(&self, job_id: &str) -> Result<JobStatus, ExecutionError> {
        (**self).status(job_id)
    }

    fn results(&self, job_id: &str)
        -> Result<Vec<ExecutedCircuit>, ExecutionError>
    {
        (**self).results(job_id)
    }

    fn cancel(&self, job_id: &str) -> Result<(), ExecutionError> {
        (**self).cancel(job_id)
    }
}

type JobStore = FxHashMap<JobId, Vec<ExecutedCircuit>>;

/// In-process backend that samples each circuit exactly from its simulated
/// state.
///
/// Jobs complete during [`submit`][Backend::submit]. No compilation is
/// performed, so the reported depth is the circuit's own depth regardless of
/// the optimization level. With a seed, the `k`-th circuit of every batch is
/// sampled from an RNG seeded with `seed + k`.
///
/// Results are held until they are fetched or the job is cancelled, after
/// which the job id is no longer known.
#[derive(Debug)]
pub struct LocalSampler {
    name: String,
    seed: Option<u64>,
    jobs: Mutex<JobStore>,
    counter: AtomicUsize,
}

impl Default for LocalSampler {
    fn default() -> Self { Self::new(None) }
}

impl LocalSampler {
    /// Create a new sampler, optionally seeding its random number generators.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            name: "local_sampler".into(),
            seed,
            jobs: Mutex::new(FxHashMap::default()),
            counter: AtomicUsize::new(0),
        }
    }

    /// Set the name reported by [`Backend::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn jobs(&self) -> Result<MutexGuard<'_, JobStore>, ExecutionError> {
        self.jobs.lock()
            .map_err(|_| ExecutionError::BackendUnavailable(self.name.clone()))
    }

    fn sample(&self, k: usize, circuit: &Circuit, shots: u64)
        -> Result<ExecutedCircuit, ExecutionError>
    {
        let (state, measured)
            = circuit.sampling_state()
            .map_err(|e| ExecutionError::CircuitRejected(
                format!("circuit {}: {}", k, e)
            ))?;
        if measured.is_empty() {
            return Err(ExecutionError::CircuitRejected(
                format!("circuit {} measures no qubits", k)
            ));
        }
        let probs = state.probabilities();
        let dist
            = WeightedIndex::new(probs.iter())
            .map_err(|e| ExecutionError::CircuitRejected(
                format!("circuit {}: {}", k, e)
            ))?;
        let mut rng
            = self.seed.map(|s| StdRng::seed_from_u64(s.wrapping_add(k as u64)))
            .unwrap_or_else(StdRng::from_entropy);
        let mut counts = Counts::new();
        for _ in 0..shots {
            let b = dist.sample(&mut rng);
            // classical bit c holds qubit measured[c]; highest bit first
            let label: String
                = measured.iter().rev()
                .map(|q| if (b >> q) & 1 == 1 { '1' } else { '0' })
                .collect();
            *counts.entry(label).or_insert(0) += 1;
        }
        Ok(ExecutedCircuit {
            metadata: circuit.metadata().copied(),
            counts,
            depth: circuit.depth(),
        })
    }
}

impl Backend for LocalSampler {
    fn name(&self) -> &str { &self.name }

    fn submit(&self, batch: &[Circuit], options: &RunOptions)
        -> Result<JobId, ExecutionError>
    {
        if options.shots == 0 {
            return Err(ExecutionError::SubmissionFailed(
                "shot count must be positive".into()
            ));
        }
        let results: Vec<ExecutedCircuit>
            = batch.par_iter().enumerate()
            .map(|(k, circuit)| self.sample(k, circuit, options.shots))
            .collect::<Result<_, _>>()?;
        let job_id
            = format!(
                "{}-{:06}", self.name, self.counter.fetch_add(1, Ordering::SeqCst));
        debug!(
            "{}: sampled {} circuits x {} shots",
            job_id, results.len(), options.shots,
        );
        self.jobs()?.insert(job_id.clone(), results);
        Ok(job_id)
    }

    fn status(&self, job_id: &str) -> Result<JobStatus, ExecutionError> {
        if self.jobs()?.contains_key(job_id) {
            Ok(JobStatus::Completed)
        } else {
            Err(ExecutionError::JobNotFound(job_id.into()))
        }
    }

    fn results(&self, job_id: &str)
        -> Result<Vec<ExecutedCircuit>, ExecutionError>
    {
        // fetched results are handed over, not kept
        self.jobs()?.remove(job_id)
            .ok_or_else(|| ExecutionError::JobNotFound(job_id.into()))
    }

    fn cancel(&self, job_id: &str) -> Result<(), ExecutionError> {
        // jobs are complete as soon as they exist; cancelling drops the results
        self.jobs()?.remove(job_id)
            .map(|_| ())
            .ok_or_else(|| ExecutionError::JobNotFound(job_id.into()))
    }
}
