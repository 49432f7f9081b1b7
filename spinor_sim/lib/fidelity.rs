//! Comparison of sampled outcome counts against an ideal distribution.

use std::collections::BTreeMap;
use crate::{
    error::NormalizationError,
    state::{ parse_basis_label, ProbabilityVector },
};

/// Raw measurement outcomes: basis-state label (highest qubit first) to number
/// of shots.
pub type Counts = BTreeMap<String, u64>;

/// Return the total number of shots recorded in `counts`.
pub fn total_shots(counts: &Counts) -> u64 { counts.values().sum() }

/// Convert `counts` on `n` qubits to an empirical distribution indexed by
/// basis state.
///
/// Fails if the counts are empty or sum to zero, or if any label is not an
/// `n`-bit binary string.
pub fn empirical_probabilities(counts: &Counts, n: usize)
    -> Result<ProbabilityVector, NormalizationError>
{
    let total = total_shots(counts);
    if total == 0 {
        return Err(NormalizationError::ZeroShots);
    }
    let mut probs: Vec<f64> = vec![0.0; 1 << n];
    for (label, count) in counts.iter() {
        let k
            = parse_basis_label(label, n)
            .ok_or_else(|| NormalizationError::InvalidOutcome {
                label: label.clone(),
                width: n,
            })?;
        probs[k] += *count as f64 / total as f64;
    }
    Ok(ProbabilityVector::from_vec(probs))
}

/// Compute the classical (Bhattacharyya) fidelity
/// *F* = (Σ<sub>*s*</sub> √(*p*<sub>real</sub>(*s*) *p*<sub>ideal</sub>(*s*)))²
/// between sampled `counts` and the `ideal` distribution.
///
/// The register width is taken from `ideal`, which must have a power-of-two
/// length matching the width of the count labels. Products are clamped at
/// zero before the square root to absorb negative rounding noise in `ideal`,
/// and the result is clamped to [0, 1].
pub fn compute_fidelity(counts: &Counts, ideal: &[f64])
    -> Result<f64, NormalizationError>
{
    if !ideal.len().is_power_of_two() || ideal.len() < 2 {
        return Err(NormalizationError::DimensionMismatch {
            expected: ideal.len().next_power_of_two().max(2),
            got: ideal.len(),
        });
    }
    let n = ideal.len().trailing_zeros() as usize;
    // well-formed labels of another width mean the ideal vector belongs to a
    // different register
    let other_width
        = counts.keys()
        .find(|label| {
            label.len() != n && label.chars().all(|c| c == '0' || c == '1')
        });
    if let Some(label) = other_width {
        return Err(NormalizationError::DimensionMismatch {
            expected: 1_usize.checked_shl(label.len() as u32).unwrap_or(0),
            got: ideal.len(),
        });
    }
    let real = empirical_probabilities(counts, n)?;
    Ok(fidelity(&real, ideal))
}

// both arguments have the same length
fn fidelity(p: &[f64], q: &[f64]) -> f64 {
    let overlap: f64
        = p.iter().zip(q)
        .map(|(pk, qk)| (pk * qk).max(0.0).sqrt())
        .sum();
    overlap.powi(2).clamp(0.0, 1.0)
}

/// Compute the classical fidelity between two distributions directly.
///
/// Fails if the distributions have different lengths.
pub fn distribution_fidelity(p: &[f64], q: &[f64])
    -> Result<f64, NormalizationError>
{
    if p.len() != q.len() {
        return Err(NormalizationError::DimensionMismatch {
            expected: q.len(),
            got: p.len(),
        });
    }
    Ok(fidelity(p, q))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn counts(entries: &[(&str, u64)]) -> Counts {
        entries.iter().map(|(s, c)| (s.to_string(), *c)).collect()
    }

    fn scenario_ideal() -> Vec<f64> {
        let mut ideal = vec![0.0; 8];
        ideal[0] = 0.8;
        ideal[7] = 0.2;
        ideal
    }

    #[test]
    fn empirical_distribution() {
        let c = counts(&[("000", 3000), ("111", 1000)]);
        let p = empirical_probabilities(&c, 3).unwrap();
        assert_eq!(p.len(), 8);
        assert_abs_diff_eq!(p[0], 0.75);
        assert_abs_diff_eq!(p[7], 0.25);
        assert_eq!(
            empirical_probabilities(&counts(&[("0a1", 5)]), 3),
            Err(NormalizationError::InvalidOutcome { label: "0a1".into(), width: 3 }),
        );
        assert!(empirical_probabilities(&counts(&[("00", 5)]), 3).is_err());
    }

    #[test]
    fn fidelity_two_outcomes() {
        let c = counts(&[("000", 3000), ("111", 1000)]);
        let expected = ((0.75_f64 * 0.8).sqrt() + (0.25_f64 * 0.2).sqrt()).powi(2);
        let f = compute_fidelity(&c, &scenario_ideal()).unwrap();
        assert_abs_diff_eq!(f, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(f, 0.998, epsilon = 1e-3);
    }

    #[test]
    fn zero_counts_rejected() {
        let ideal = scenario_ideal();
        assert_eq!(
            compute_fidelity(&counts(&[("000", 0), ("111", 0)]), &ideal),
            Err(NormalizationError::ZeroShots),
        );
        assert_eq!(
            compute_fidelity(&Counts::new(), &ideal),
            Err(NormalizationError::ZeroShots),
        );
    }

    #[test]
    fn fidelity_is_pure() {
        let c = counts(&[("010", 17), ("011", 3), ("110", 80)]);
        let ideal = vec![0.1, 0.0, 0.2, 0.3, 0.0, 0.0, 0.4, 0.0];
        let f1 = compute_fidelity(&c, &ideal).unwrap();
        let f2 = compute_fidelity(&c, &ideal).unwrap();
        assert_eq!(f1.to_bits(), f2.to_bits());
        assert!((0.0..=1.0).contains(&f1));
    }

    #[test]
    fn matching_distributions_have_unit_fidelity() {
        let c = counts(&[("00", 1), ("01", 2), ("10", 3), ("11", 4)]);
        let ideal = vec![0.1, 0.2, 0.3, 0.4];
        assert_abs_diff_eq!(
            compute_fidelity(&c, &ideal).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn rounding_noise_is_clamped() {
        let c = counts(&[("0", 10)]);
        let f = compute_fidelity(&c, &[1.0, -1e-18]).unwrap();
        assert_abs_diff_eq!(f, 1.0, epsilon = 1e-12);
        assert!(f <= 1.0);
    }

    #[test]
    fn bad_ideal_length() {
        let c = counts(&[("000", 1)]);
        assert_eq!(
            compute_fidelity(&c, &[0.5, 0.25, 0.25]),
            Err(NormalizationError::DimensionMismatch { expected: 4, got: 3 }),
        );
        assert_eq!(
            compute_fidelity(&c, &[0.5, 0.5, 0.0, 0.0]),
            Err(NormalizationError::DimensionMismatch { expected: 8, got: 4 }),
        );
        assert!(distribution_fidelity(&[1.0], &[0.5, 0.5]).is_err());
    }
}
