//! Persisted experiment reports and the inputs handed to histogram renderers.
//!
//! An [`ExperimentReport`] is the single source of truth for a run: derived
//! artifacts are regenerated from the saved JSON without contacting the
//! backend again.

use std::{
    fmt,
    fs,
    io::{ BufWriter, Write },
    path::{ Path, PathBuf },
};
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use tracing::{ info, warn };
use crate::{
    clifford::MAX_QUBITS,
    config::REPORT_FILE,
    error::{ NormalizationError, PersistenceError },
    fidelity::{ empirical_probabilities, Counts },
    state::basis_states,
};

/// Subdirectory of a run directory that regenerated histograms are written to.
pub const REBUILT_SUBDIR: &str = "histograms_rebuilt";

/// Plot title passed to histogram renderers.
pub const HISTOGRAM_TITLE: &str = "Algorithm 2: Probability Distribution";

/// A fully scored circuit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub gamma_i: usize,
    pub gamma_j: usize,
    /// Depth as compiled by the backend.
    pub depth: usize,
    pub counts: Counts,
    pub prob_ideal: Vec<f64>,
    pub prob_real: Vec<f64>,
    pub fidelity: f64,
}

/// Pipeline stage at which a circuit was abandoned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Construction,
    Normalization,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Normalization => write!(f, "normalization"),
        }
    }
}

/// One entry per generator pair, in pair order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CircuitEntry {
    Scored(ExperimentRecord),
    Failed {
        gamma_i: usize,
        gamma_j: usize,
        stage: FailureStage,
        reason: String,
    },
}

impl CircuitEntry {
    /// Return the generator indices of the entry.
    pub fn pair(&self) -> (usize, usize) {
        match self {
            Self::Scored(rec) => (rec.gamma_i, rec.gamma_j),
            Self::Failed { gamma_i, gamma_j, .. } => (*gamma_i, *gamma_j),
        }
    }

    pub fn as_scored(&self) -> Option<&ExperimentRecord> {
        match self {
            Self::Scored(rec) => Some(rec),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything recorded about one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub timestamp: DateTime<Utc>,
    pub n_qubits: usize,
    pub shots: u64,
    pub backend: String,
    pub job_id: String,
    pub optimization_level: u8,
    pub theta: f64,
    pub circuits: Vec<CircuitEntry>,
}

impl ExperimentReport {
    /// Iterate over successfully scored circuits.
    pub fn scored(&self) -> impl Iterator<Item = &ExperimentRecord> + '_ {
        self.circuits.iter().filter_map(CircuitEntry::as_scored)
    }

    /// Return the number of failed circuits.
    pub fn num_failed(&self) -> usize {
        self.circuits.iter().filter(|c| c.as_scored().is_none()).count()
    }

    /// Return the mean fidelity over scored circuits, if any.
    pub fn mean_fidelity(&self) -> Option<f64> {
        let (sum, count)
            = self.scored()
            .fold((0.0, 0_usize), |(s, c), rec| (s + rec.fidelity, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Check that every scored record fits the register size.
    pub fn check(&self) -> Result<(), PersistenceError> {
        if self.n_qubits == 0 || self.n_qubits > MAX_QUBITS {
            return Err(PersistenceError::Inconsistent(
                format!("unsupported qubit count {}", self.n_qubits)
            ));
        }
        let dim = 1_usize << self.n_qubits;
        for rec in self.scored() {
            if rec.prob_ideal.len() != dim || rec.prob_real.len() != dim {
                return Err(PersistenceError::Inconsistent(format!(
                    "Γ_{}Γ_{}: probability vectors of length {}/{} for {} qubits",
                    rec.gamma_i, rec.gamma_j,
                    rec.prob_ideal.len(), rec.prob_real.len(), self.n_qubits,
                )));
            }
            if !(0.0..=1.0).contains(&rec.fidelity) {
                return Err(PersistenceError::Inconsistent(format!(
                    "Γ_{}Γ_{}: fidelity {} outside [0, 1]",
                    rec.gamma_i, rec.gamma_j, rec.fidelity,
                )));
            }
        }
        Ok(())
    }

    /// Log one line per circuit.
    pub fn log_summary(&self) {
        info!(
            "n = {}: job {} on {}, {} circuits ({} failed)",
            self.n_qubits, self.job_id, self.backend,
            self.circuits.len(), self.num_failed(),
        );
        for entry in self.circuits.iter() {
            match entry {
                CircuitEntry::Scored(rec) => {
                    info!(
                        "\tΓ_{}Γ_{}: fidelity = {:.6}, depth = {}",
                        rec.gamma_i, rec.gamma_j, rec.fidelity, rec.depth,
                    );
                },
                CircuitEntry::Failed { gamma_i, gamma_j, stage, reason } => {
                    warn!(
                        "\tΓ_{}Γ_{}: failed at {}: {}",
                        gamma_i, gamma_j, stage, reason,
                    );
                },
            }
        }
        if let Some(mean) = self.mean_fidelity() {
            info!("\tmean fidelity = {:.6}", mean);
        }
    }

    /// Write the report as `experiment_data.json` in `dir`, creating it if
    /// necessary. Returns the path of the written file.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(dir)
            .map_err(|e| PersistenceError::io(dir, e))?;
        let path = dir.join(REPORT_FILE);
        let file
            = fs::File::create(&path)
            .map_err(|e| PersistenceError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
            .map_err(|e| PersistenceError::io(&path, e))?;
        Ok(path)
    }

    /// Read a report from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let contents
            = fs::read_to_string(path)
            .map_err(|e| PersistenceError::io(path, e))?;
        let report: Self = serde_json::from_str(&contents)?;
        report.check()?;
        Ok(report)
    }

    /// Read the report in `dir`, requiring that it belongs to `job_id`.
    pub fn load_for_job(dir: &Path, job_id: &str)
        -> Result<Self, PersistenceError>
    {
        let report = Self::load(&dir.join(REPORT_FILE))?;
        if report.job_id != job_id {
            return Err(PersistenceError::JobMismatch {
                expected: job_id.into(),
                found: report.job_id,
            });
        }
        Ok(report)
    }

    /// Build validated histogram inputs for every scored circuit.
    pub fn histogram_inputs(&self, algorithm: &str)
        -> Result<Vec<HistogramInput>, NormalizationError>
    {
        self.scored()
            .map(|rec| HistogramInput::new(self, rec, algorithm))
            .collect()
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn clean_job_id(job_id: &str) -> String {
    job_id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' }
        })
        .collect()
}

/// Everything a renderer needs to draw the experimental and ideal
/// distributions of one circuit side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramInput {
    pub basis_states: Vec<String>,
    pub empirical: Vec<f64>,
    pub ideal: Vec<f64>,
    pub fidelity: f64,
    pub gamma_i: usize,
    pub gamma_j: usize,
    pub n: usize,
    pub job_id: String,
    pub algorithm: String,
    pub title: String,
}

impl HistogramInput {
    /// Collect the inputs for `record`, recomputing the empirical distribution
    /// from its raw counts.
    ///
    /// Fails if the counts are empty or malformed, or if the ideal
    /// distribution does not cover every basis state.
    pub fn new(report: &ExperimentReport, record: &ExperimentRecord, algorithm: &str)
        -> Result<Self, NormalizationError>
    {
        let n = report.n_qubits;
        let basis_states = basis_states(n);
        if record.prob_ideal.len() != basis_states.len() {
            return Err(NormalizationError::DimensionMismatch {
                expected: basis_states.len(),
                got: record.prob_ideal.len(),
            });
        }
        let empirical: Vec<f64>
            = empirical_probabilities(&record.counts, n)?.into();
        Ok(Self {
            basis_states,
            empirical,
            ideal: record.prob_ideal.clone(),
            fidelity: record.fidelity,
            gamma_i: record.gamma_i,
            gamma_j: record.gamma_j,
            n,
            job_id: report.job_id.clone(),
            algorithm: algorithm.into(),
            title: HISTOGRAM_TITLE.into(),
        })
    }

    /// File name stem of the rendered artifact,
    /// `hist_ACE_{algorithm}_{n}qb_{job}_Gamma_{i}{j}`.
    pub fn artifact_stem(&self) -> String {
        format!(
            "hist_ACE_{}_{}qb_{}_Gamma_{}{}",
            self.algorithm, self.n, clean_job_id(&self.job_id),
            self.gamma_i, self.gamma_j,
        )
    }
}

/// Renders histogram inputs to some artifact.
pub trait HistogramSink {
    /// Render `input`, returning the path of the produced artifact.
    fn render(&self, input: &HistogramInput) -> Result<PathBuf, PersistenceError>;
}

/// Writes each histogram as a tab-separated table
/// `basis_state  experimental  theoretical`.
#[derive(Clone, Debug)]
pub struct TsvHistogramSink {
    dir: PathBuf,
}

impl TsvHistogramSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }
}

impl HistogramSink for TsvHistogramSink {
    fn render(&self, input: &HistogramInput) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| PersistenceError::io(&self.dir, e))?;
        let path = self.dir.join(format!("{}.tsv", input.artifact_stem()));
        let file
            = fs::File::create(&path)
            .map_err(|e| PersistenceError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        let io_err = |e| PersistenceError::io(&path, e);
        writeln!(writer, "# {}", input.title).map_err(io_err)?;
        writeln!(
            writer, "# Γ_{}Γ_{}, n = {}, job {}, fidelity = {:.6}",
            input.gamma_i, input.gamma_j, input.n, input.job_id, input.fidelity,
        ).map_err(io_err)?;
        writeln!(writer, "basis_state\texperimental\ttheoretical").map_err(io_err)?;
        let rows
            = input.basis_states.iter()
            .zip(&input.empirical)
            .zip(&input.ideal);
        for ((label, p_real), p_ideal) in rows {
            writeln!(writer, "{}\t{:.6}\t{:.6}", label, p_real, p_ideal)
                .map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
        Ok(path)
    }
}

/// Regenerate the histograms of a saved run from its report alone.
///
/// Loads `experiment_data.json` from `dir`, refusing reports of any job other
/// than `job_id`, and renders every scored circuit through `sink`.
pub fn regenerate_histograms<S>(
    dir: &Path,
    job_id: &str,
    algorithm: &str,
    sink: &S,
) -> Result<Vec<PathBuf>, PersistenceError>
where S: HistogramSink + ?Sized
{
    let report = ExperimentReport::load_for_job(dir, job_id)?;
    info!("regenerating histograms for job {}", job_id);
    let inputs
        = report.histogram_inputs(algorithm)
        .map_err(|e| PersistenceError::Inconsistent(e.to_string()))?;
    inputs.iter()
        .map(|input| {
            let path = sink.render(input)?;
            info!("\tΓ_{}Γ_{} rebuilt", input.gamma_i, input.gamma_j);
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_report() -> ExperimentReport {
        let counts: Counts
            = [("000".to_string(), 3000), ("111".to_string(), 1000)]
            .into_iter().collect();
        let mut prob_ideal = vec![0.0; 8];
        prob_ideal[0] = 0.8;
        prob_ideal[7] = 0.2;
        let mut prob_real = vec![0.0; 8];
        prob_real[0] = 0.75;
        prob_real[7] = 0.25;
        ExperimentReport {
            timestamp: Utc::now(),
            n_qubits: 3,
            shots: 4000,
            backend: "local_sampler".into(),
            job_id: "job/42:a".into(),
            optimization_level: 3,
            theta: std::f64::consts::PI / 6.0,
            circuits: vec![
                CircuitEntry::Scored(ExperimentRecord {
                    gamma_i: 0,
                    gamma_j: 3,
                    depth: 7,
                    counts,
                    prob_ideal,
                    prob_real,
                    fidelity: 0.998,
                }),
                CircuitEntry::Failed {
                    gamma_i: 1,
                    gamma_j: 2,
                    stage: FailureStage::Normalization,
                    reason: "zero total shots".into(),
                },
            ],
        }
    }

    #[test]
    fn entry_json_layout() {
        let report = sample_report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["circuits"][0]["status"], "scored");
        assert_eq!(json["circuits"][0]["gamma_j"], 3);
        assert_eq!(json["circuits"][0]["counts"]["111"], 1000);
        assert_eq!(json["circuits"][1]["status"], "failed");
        assert_eq!(json["circuits"][1]["stage"], "normalization");
        let back: ExperimentReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn summary_statistics() {
        let report = sample_report();
        assert_eq!(report.scored().count(), 1);
        assert_eq!(report.num_failed(), 1);
        assert_eq!(report.mean_fidelity(), Some(0.998));
        assert_eq!(report.circuits[1].pair(), (1, 2));
        assert!(report.check().is_ok());
    }

    #[test]
    fn inconsistent_records_detected() {
        let mut report = sample_report();
        if let CircuitEntry::Scored(rec) = &mut report.circuits[0] {
            rec.prob_real.pop();
        }
        assert!(matches!(report.check(), Err(PersistenceError::Inconsistent(_))));
    }

    #[test]
    fn histogram_naming() {
        let report = sample_report();
        let inputs = report.histogram_inputs("ACE_Algoritmo2").unwrap();
        assert_eq!(inputs.len(), 1);
        let input = &inputs[0];
        assert_eq!(input.basis_states.len(), 8);
        assert_eq!(input.empirical[0], 0.75);
        assert_eq!(
            input.artifact_stem(),
            "hist_ACE_ACE_Algoritmo2_3qb_job_42_a_Gamma_03",
        );
        assert_eq!(clean_job_id("ab-c_d.e f"), "ab-c_d_e_f");
    }

    #[test]
    fn histogram_requires_counts() {
        let mut report = sample_report();
        if let CircuitEntry::Scored(rec) = &mut report.circuits[0] {
            rec.counts.clear();
        }
        assert_eq!(
            report.histogram_inputs("a"),
            Err(NormalizationError::ZeroShots),
        );
    }
}
