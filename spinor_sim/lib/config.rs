//! Run configuration for spinorial search experiments.
//!
//! [`ExperimentConfig`] is (de)serialized as JSON; missing fields take their
//! defaults, so a file only needs to name what it changes.

use std::{
    path::{ Path, PathBuf },
    time::Duration,
};
use chrono::NaiveDate;
use serde::{ Deserialize, Serialize };
use crate::{
    backend::RunOptions,
    clifford::MAX_QUBITS,
    error::ConfigError,
    search::{ iteration_count, DEFAULT_THETA },
};

/// Default algorithm label used in artifact names.
pub const DEFAULT_ALGORITHM: &str = "ACE_Algoritmo2";

/// Name of the report file written into each output directory.
pub const REPORT_FILE: &str = "experiment_data.json";

/// Parameters of a single experiment run for one qubit count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of qubits. Default: **3**.
    pub n_qubits: usize,
    /// Samples per circuit. Default: **4000**.
    pub shots: u64,
    /// Rotation angle θ. Default: **π/6**.
    pub theta: f64,
    /// Backend compiler optimization level, 0 to 3. Default: **3**.
    pub optimization_level: u8,
    /// Seconds to wait for a submitted job before cancelling it. Default:
    /// **3600**.
    pub timeout_secs: u64,
    /// Milliseconds between job status polls. Default: **2000**.
    pub poll_interval_ms: u64,
    /// Directory under which per-run output directories are created. Default:
    /// the working directory.
    pub output_dir: Option<PathBuf>,
    /// Seed for local sampling.
    pub seed: Option<u64>,
    /// Algorithm label. Default: **`ACE_Algoritmo2`**.
    pub algorithm: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_qubits: 3,
            shots: 4000,
            theta: DEFAULT_THETA,
            optimization_level: 3,
            timeout_secs: 3600,
            poll_interval_ms: 2000,
            output_dir: None,
            seed: None,
            algorithm: DEFAULT_ALGORITHM.into(),
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents
            = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::File { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Write the configuration to a JSON file, creating parent directories.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::File {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|source| ConfigError::File { path: path.to_path_buf(), source })
    }

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_qubits == 0 {
            return Err(ConfigError::invalid("n_qubits", "must be > 0"));
        }
        if self.n_qubits > MAX_QUBITS {
            return Err(ConfigError::invalid(
                "n_qubits",
                format!("must be <= {} for dense simulation", MAX_QUBITS),
            ));
        }
        if self.shots == 0 {
            return Err(ConfigError::invalid("shots", "must be > 0"));
        }
        if let Err(err) = iteration_count(self.theta) {
            return Err(ConfigError::invalid("theta", err.to_string()));
        }
        if self.optimization_level > 3 {
            return Err(ConfigError::invalid(
                "optimization_level",
                format!("must be in 0..=3, got {}", self.optimization_level),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be > 0"));
        }
        if self.algorithm.is_empty() {
            return Err(ConfigError::invalid("algorithm", "must not be empty"));
        }
        Ok(())
    }

    /// Return a copy of `self` for a different qubit count.
    pub fn with_qubits(&self, n_qubits: usize) -> Self {
        Self { n_qubits, ..self.clone() }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            shots: self.shots,
            optimization_level: self.optimization_level,
        }
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Return the output directory for a run started on `date`, under
    /// [`output_dir`][Self::output_dir] if set.
    pub fn run_dir(&self, date: NaiveDate) -> PathBuf {
        let name = default_output_dir(self.n_qubits, date);
        match &self.output_dir {
            Some(root) => root.join(name),
            None => name,
        }
    }

    /// Return the path of the report file for a run started on `date`.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.run_dir(date).join(REPORT_FILE)
    }
}

/// Return the default output directory name for `n` qubits on `date`,
/// `results_alg2_n{n}_{YYYY_MM_DD}`.
pub fn default_output_dir(n: usize, date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("results_alg2_n{}_{}", n, date.format("%Y_%m_%d")))
}
