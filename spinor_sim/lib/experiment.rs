//! Drives a full spinorial search experiment for one qubit count.
//!
//! ```text
//! pairs ──build──▶ circuits ──submit──▶ backend ──results──▶ align ──score──▶ report
//!   │                                                                  │
//!   └──────────── construction / normalization failures ───────────────┘
//! ```
//!
//! Per-circuit failures are recorded in the report against their generator
//! pair; batch-level failures (execution, persistence) end the run.

use std::{
    path::{ Path, PathBuf },
    thread,
    time::{ Duration, Instant },
};
use chrono::Utc;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{ debug, error, info, warn };
use crate::{
    backend::{ Backend, ExecutedCircuit, JobId, JobStatus, RunOptions },
    circuit::{ Circuit, CircuitMetadata },
    clifford::{ build_generators, GeneratorPair, GeneratorSet },
    config::ExperimentConfig,
    error::{
        ConstructionError,
        ExecutionError,
        ExperimentError,
        ExperimentResult,
        NormalizationError,
    },
    fidelity::{ compute_fidelity, empirical_probabilities },
    report::{ CircuitEntry, ExperimentRecord, ExperimentReport, FailureStage },
    search::{ build_search_circuit, SpinorSearch },
};

/// Build the search circuit of every generator pair in parallel.
///
/// The output follows [`GeneratorSet::pairs`] order. Failed constructions are
/// logged and kept in place so that they can be reported.
pub fn prepare_batch(gammas: &GeneratorSet, theta: f64)
    -> Vec<(GeneratorPair, Result<SpinorSearch, ConstructionError>)>
{
    let n = gammas.num_qubits();
    gammas.pairs()
        .into_par_iter()
        .map(|pair| {
            let search
                = gammas.pair(pair)
                .and_then(|(gi, gj)| build_search_circuit(n, gi, gj, theta));
            match &search {
                Ok(s) => info!(
                    "{} built: {} round(s), {} instructions",
                    pair, s.iterations, s.circuit.len(),
                ),
                Err(e) => warn!("{} not built: {}", pair, e),
            }
            (pair, search)
        })
        .collect()
}

/// Submit `circuits` as a single job and block until its results are
/// available.
///
/// The job's status is polled every `poll_interval`. If it has not finished
/// after `timeout`, the job is cancelled and [`ExecutionError::Timeout`] is
/// returned.
pub fn submit_and_wait<B>(
    backend: &B,
    circuits: &[Circuit],
    options: &RunOptions,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(JobId, Vec<ExecutedCircuit>), ExecutionError>
where B: Backend + ?Sized
{
    let job_id = backend.submit(circuits, options)?;
    info!(
        "submitted {} circuits to {} as job {}",
        circuits.len(), backend.name(), job_id,
    );
    let results = wait_for_job(backend, &job_id, timeout, poll_interval)?;
    Ok((job_id, results))
}

/// Poll a submitted job until it completes, fails, or times out.
pub fn wait_for_job<B>(
    backend: &B,
    job_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Vec<ExecutedCircuit>, ExecutionError>
where B: Backend + ?Sized
{
    let start = Instant::now();
    loop {
        match backend.status(job_id)? {
            JobStatus::Completed => { return backend.results(job_id); },
            JobStatus::Failed(reason) => {
                return Err(ExecutionError::JobFailed {
                    job_id: job_id.into(),
                    reason,
                });
            },
            JobStatus::Cancelled => {
                return Err(ExecutionError::JobCancelled(job_id.into()));
            },
            status => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    if let Err(e) = backend.cancel(job_id) {
                        warn!("could not cancel job {}: {}", job_id, e);
                    }
                    return Err(ExecutionError::Timeout {
                        job_id: job_id.into(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                debug!("job {} {} after {:.1?}", job_id, status, elapsed);
                thread::sleep(poll_interval.min(timeout - elapsed));
            },
        }
    }
}

/// Reorder backend results into submission order using the metadata each
/// result echoes.
///
/// Fails if the number of results differs from the number of circuits, or if
/// any result is missing metadata, refers to an unknown or already matched
/// circuit, or disagrees with the submitted circuit's generator indices.
pub fn align_results(circuits: &[Circuit], results: Vec<ExecutedCircuit>)
    -> Result<Vec<ExecutedCircuit>, ExecutionError>
{
    if results.len() != circuits.len() {
        return Err(ExecutionError::ResultCountMismatch {
            expected: circuits.len(),
            got: results.len(),
        });
    }
    let submitted: FxHashMap<usize, (usize, &CircuitMetadata)>
        = circuits.iter().enumerate()
        .filter_map(|(k, c)| c.metadata().map(|m| (m.sequence_index, (k, m))))
        .collect();
    let mut slots: Vec<Option<ExecutedCircuit>> = vec![None; circuits.len()];
    for (position, res) in results.into_iter().enumerate() {
        let misattributed = |reason: String| {
            ExecutionError::Misattributed { position, reason }
        };
        let meta
            = res.metadata
            .ok_or_else(|| misattributed("missing metadata".into()))?;
        let (k, expected)
            = submitted.get(&meta.sequence_index)
            .ok_or_else(|| misattributed(format!(
                "unknown sequence index {}", meta.sequence_index)))?;
        if (meta.gamma_i, meta.gamma_j) != (expected.gamma_i, expected.gamma_j) {
            return Err(misattributed(format!(
                "sequence index {} was submitted for Γ_{}Γ_{}, not Γ_{}Γ_{}",
                meta.sequence_index,
                expected.gamma_i, expected.gamma_j, meta.gamma_i, meta.gamma_j,
            )));
        }
        if slots[*k].is_some() {
            return Err(misattributed(format!(
                "duplicate result for sequence index {}", meta.sequence_index)));
        }
        slots[*k] = Some(res);
    }
    // counts match and no slot was filled twice, so every slot is filled
    // unless a submitted circuit lacked metadata
    slots.into_iter().enumerate()
        .map(|(k, slot)| {
            slot.ok_or_else(|| ExecutionError::Misattributed {
                position: k,
                reason: "no result for submitted circuit".into(),
            })
        })
        .collect()
}

/// Score one executed circuit against its ideal distribution.
pub fn score_circuit(search: &SpinorSearch, executed: &ExecutedCircuit)
    -> Result<ExperimentRecord, NormalizationError>
{
    let n = search.circuit.num_qubits();
    let prob_real = empirical_probabilities(&executed.counts, n)?;
    let fidelity = compute_fidelity(&executed.counts, &search.ideal)?;
    Ok(ExperimentRecord {
        gamma_i: search.pair.i,
        gamma_j: search.pair.j,
        depth: executed.depth,
        counts: executed.counts.clone(),
        prob_ideal: search.ideal.to_vec(),
        prob_real: prob_real.into(),
        fidelity,
    })
}

fn failed(pair: GeneratorPair, stage: FailureStage, reason: String)
    -> CircuitEntry
{
    CircuitEntry::Failed { gamma_i: pair.i, gamma_j: pair.j, stage, reason }
}

/// Run the experiment described by `config` on `backend`.
///
/// Every generator pair gets exactly one entry in the returned report, in
/// pair order.
pub fn run_experiment<B>(config: &ExperimentConfig, backend: &B)
    -> ExperimentResult<ExperimentReport>
where B: Backend + ?Sized
{
    config.validate()?;
    let n = config.n_qubits;
    let gammas = build_generators(n)?;
    info!(
        "n = {}: {} generators, {} pairs, θ = {:.6}",
        n, gammas.len(), gammas.len() * (gammas.len() - 1) / 2, config.theta,
    );
    let prepared = prepare_batch(&gammas, config.theta);

    let mut circuits: Vec<Circuit> = Vec::with_capacity(prepared.len());
    for (pair, search) in prepared.iter() {
        if let Ok(s) = search {
            let metadata = CircuitMetadata {
                gamma_i: pair.i,
                gamma_j: pair.j,
                sequence_index: circuits.len(),
            };
            circuits.push(s.circuit.clone().with_metadata(metadata));
        }
    }
    if circuits.is_empty() {
        error!("n = {}: every circuit failed to build", n);
        return Err(ExperimentError::NothingToSubmit(n));
    }

    let (job_id, results)
        = submit_and_wait(
            backend,
            &circuits,
            &config.run_options(),
            config.timeout(),
            config.poll_interval(),
        )
        .and_then(|(job_id, results)| {
            align_results(&circuits, results).map(|aligned| (job_id, aligned))
        })
        .map_err(|e| {
            error!("n = {}: batch failed: {}", n, e);
            e
        })?;

    let built: Vec<&SpinorSearch>
        = prepared.iter()
        .filter_map(|(_, search)| search.as_ref().ok())
        .collect();
    let mut scored: Vec<CircuitEntry>
        = built.par_iter()
        .zip(results.par_iter())
        .map(|(search, executed)| {
            match score_circuit(search, executed) {
                Ok(rec) => {
                    info!(
                        "{}: fidelity = {:.6}, depth = {}",
                        search.pair, rec.fidelity, rec.depth,
                    );
                    CircuitEntry::Scored(rec)
                },
                Err(e) => {
                    warn!("{} not scored: {}", search.pair, e);
                    failed(search.pair, FailureStage::Normalization, e.to_string())
                },
            }
        })
        .collect::<Vec<_>>();

    // merge back into pair order
    scored.reverse();
    let circuits: Vec<CircuitEntry>
        = prepared.into_iter()
        .filter_map(|(pair, search)| match search {
            Ok(_) => scored.pop(),
            Err(e) => Some(failed(pair, FailureStage::Construction, e.to_string())),
        })
        .collect();

    Ok(ExperimentReport {
        timestamp: Utc::now(),
        n_qubits: n,
        shots: config.shots,
        backend: backend.name().into(),
        job_id,
        optimization_level: config.optimization_level,
        theta: config.theta,
        circuits,
    })
}

/// Run the experiment and save its report under `dir`.
///
/// If the report cannot be written, it is logged and returned inside the
/// error.
pub fn run_and_save<B>(config: &ExperimentConfig, backend: &B, dir: &Path)
    -> ExperimentResult<(ExperimentReport, PathBuf)>
where B: Backend + ?Sized
{
    let report = run_experiment(config, backend)?;
    match report.save(dir) {
        Ok(path) => {
            info!("n = {}: report saved to {}", report.n_qubits, path.display());
            Ok((report, path))
        },
        Err(source) => {
            report.log_summary();
            error!(
                "n = {}: cannot save report to {}: {}",
                report.n_qubits, dir.display(), source,
            );
            Err(ExperimentError::Persistence { report: Box::new(report), source })
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::LocalSampler;

    fn meta(gamma_i: usize, gamma_j: usize, sequence_index: usize)
        -> CircuitMetadata
    {
        CircuitMetadata { gamma_i, gamma_j, sequence_index }
    }

    fn batch() -> Vec<Circuit> {
        [meta(0, 1, 0), meta(0, 2, 1), meta(1, 2, 2)].into_iter()
            .map(|m| Circuit::new(1).unwrap().with_metadata(m))
            .collect()
    }

    fn executed(metadata: Option<CircuitMetadata>, depth: usize)
        -> ExecutedCircuit
    {
        ExecutedCircuit { metadata, counts: Default::default(), depth }
    }

    #[test]
    fn alignment_restores_order() {
        let circuits = batch();
        let results = vec![
            executed(Some(meta(1, 2, 2)), 2),
            executed(Some(meta(0, 1, 0)), 0),
            executed(Some(meta(0, 2, 1)), 1),
        ];
        let aligned = align_results(&circuits, results).unwrap();
        assert_eq!(
            aligned.iter().map(|r| r.depth).collect::<Vec<_>>(),
            vec![0, 1, 2],
        );
    }

    #[test]
    fn alignment_rejects_bad_results() {
        let circuits = batch();
        assert_eq!(
            align_results(&circuits, vec![executed(Some(meta(0, 1, 0)), 0)]),
            Err(ExecutionError::ResultCountMismatch { expected: 3, got: 1 }),
        );
        let cases = [
            (None, 1),
            (Some(meta(0, 2, 7)), 1),
            (Some(meta(0, 1, 0)), 1),
            (Some(meta(0, 2, 2)), 1),
        ];
        for (bad, position) in cases {
            let results = vec![
                executed(Some(meta(0, 1, 0)), 0),
                executed(bad, 1),
                executed(Some(meta(1, 2, 2)), 2),
            ];
            match align_results(&circuits, results) {
                Err(ExecutionError::Misattributed { position: p, .. })
                    => assert_eq!(p, position),
                other => panic!("expected misattribution, got {:?}", other),
            }
        }
    }

    #[test]
    fn prepared_batch_order() {
        let gammas = build_generators(2).unwrap();
        let prepared = prepare_batch(&gammas, crate::search::DEFAULT_THETA);
        let pairs: Vec<GeneratorPair>
            = prepared.iter().map(|(pair, _)| *pair).collect();
        assert_eq!(pairs, gammas.pairs());
        assert!(prepared.iter().all(|(_, s)| s.is_ok()));
    }

    #[test]
    fn local_run() {
        let config = ExperimentConfig {
            n_qubits: 2,
            shots: 1000,
            seed: Some(5),
            ..ExperimentConfig::default()
        };
        let sampler = LocalSampler::new(config.seed);
        let report = run_experiment(&config, &sampler).unwrap();
        assert_eq!(report.circuits.len(), 6);
        assert_eq!(report.num_failed(), 0);
        assert_eq!(report.backend, "local_sampler");
        for (entry, pair) in report.circuits.iter().zip(build_generators(2).unwrap().pairs()) {
            assert_eq!(entry.pair(), (pair.i, pair.j));
            let rec = entry.as_scored().unwrap();
            assert_eq!(rec.counts.values().sum::<u64>(), 1000);
            assert!(rec.fidelity > 0.9, "{}: {}", pair, rec.fidelity);
        }
    }
}
