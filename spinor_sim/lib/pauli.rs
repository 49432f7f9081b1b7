//! *n*-qubit Pauli strings: tensor products of single-qubit [`Pauli`]s with an
//! overall [`Phase`].
//!
//! Qubit `k` of a string acts on bit `k` of a computational basis index. Labels
//! are written with the highest qubit first, so the string `"IYX"` applies
//! σ<sub>*x*</sub> to qubit 0 and σ<sub>*y*</sub> to qubit 1.
//!
//! Strings can be applied to state vectors directly: a Pauli string maps each
//! basis state to exactly one other basis state up to a phase, so its action
//! is a permutation of amplitudes plus signs and never needs the dense
//! 2<sup>*n*</sup> × 2<sup>*n*</sup> matrix.

use std::{ fmt, str::FromStr };
use nalgebra as na;
use num_complex::Complex64 as C64;
use crate::{
    error::ConstructionError,
    gate::{ Pauli, Phase },
};

/// An *n*-qubit Pauli operator with an overall phase.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NPauli {
    pub phase: Phase,
    /// `ops[k]` acts on qubit `k`.
    pub ops: Vec<Pauli>,
}

/// Writes the phase followed by the label, e.g. `+1 IYX`. The alternate flag
/// writes identities as `.`.
impl fmt::Display for NPauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.phase.fmt(f)?;
        write!(f, " ")?;
        self.ops.iter().rev()
            .try_for_each(|p| p.fmt(f))
    }
}

/// Parses a bare label (no phase), highest qubit first.
impl FromStr for NPauli {
    type Err = ConstructionError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let ops: Vec<Pauli>
            = label.chars().rev()
            .map(Pauli::from_char)
            .collect::<Option<Vec<Pauli>>>()
            .ok_or_else(|| ConstructionError::MalformedLabel(label.into()))?;
        if ops.is_empty() {
            return Err(ConstructionError::MalformedLabel(label.into()));
        }
        Ok(Self { phase: Phase::Pi0, ops })
    }
}

impl NPauli {
    /// Create a new string from per-qubit operators with phase +1.
    pub fn new(ops: Vec<Pauli>) -> Self { Self { phase: Phase::Pi0, ops } }

    /// The `n`-qubit identity.
    pub fn identity(n: usize) -> Self { Self::new(vec![Pauli::I; n]) }

    /// Return the number of qubits.
    pub fn num_qubits(&self) -> usize { self.ops.len() }

    /// Return the label with the highest qubit first, without the phase.
    pub fn label(&self) -> String {
        self.ops.iter().rev().map(|p| p.to_string()).collect()
    }

    /// Return `true` if every operator is the identity, regardless of phase.
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(|p| *p == Pauli::I)
    }

    /// Return `true` if the overall phase is ±1, making `self` Hermitian.
    pub fn is_hermitian(&self) -> bool { self.phase.is_real() }

    /// Return the indices of qubits acted on non-trivially.
    pub fn support(&self) -> Vec<usize> {
        self.ops.iter().enumerate()
            .filter_map(|(k, p)| (*p != Pauli::I).then_some(k))
            .collect()
    }

    /// Return a copy of `self` with its phase shifted by `phase`.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self { phase: self.phase + phase, ops: self.ops.clone() }
    }

    fn check_size(&self, other: &Self) -> Result<(), ConstructionError> {
        if self.num_qubits() == other.num_qubits() {
            Ok(())
        } else {
            Err(ConstructionError::QubitMismatch {
                expected: self.num_qubits(),
                got: other.num_qubits(),
            })
        }
    }

    /// Return `true` if `self` and `other` commute.
    ///
    /// Two strings commute iff they anticommute on an even number of qubits.
    pub fn commutes_with(&self, other: &Self) -> Result<bool, ConstructionError>
    {
        self.check_size(other)?;
        let n_anti_comm
            = self.ops.iter().zip(&other.ops)
            .filter(|(a, b)| !a.commutes_with(**b))
            .count();
        Ok(n_anti_comm % 2 == 0)
    }

    /// Compute the operator product `self · rhs`.
    pub fn mul(&self, rhs: &Self) -> Result<Self, ConstructionError> {
        self.check_size(rhs)?;
        let mut phase = self.phase + rhs.phase;
        let ops: Vec<Pauli>
            = self.ops.iter().zip(&rhs.ops)
            .map(|(a, b)| {
                let (ph, c) = a.mul(*b);
                phase += ph;
                c
            })
            .collect();
        Ok(Self { phase, ops })
    }

    // bits flipped by the string, bits picking up a sign, and the number of
    // Y factors (each contributing i)
    fn masks(&self) -> (usize, usize, i8) {
        self.ops.iter().enumerate()
            .fold((0, 0, 0), |(flip, sign, ny), (k, p)| {
                (
                    if p.flips() { flip | (1 << k) } else { flip },
                    if p.signs() { sign | (1 << k) } else { sign },
                    if *p == Pauli::Y { ny + 1 } else { ny },
                )
            })
    }

    /// Apply `self` to a state vector in the computational basis.
    ///
    /// Fails if the vector's length is not 2<sup>*n*</sup>.
    pub fn apply(&self, psi: &na::DVector<C64>)
        -> Result<na::DVector<C64>, ConstructionError>
    {
        let dim: usize = 1 << self.num_qubits();
        if psi.len() != dim {
            return Err(ConstructionError::InvalidState(
                format!("expected {} amplitudes, got {}", dim, psi.len())
            ));
        }
        let (flip, sign, ny) = self.masks();
        // Y = i X Z on the computational basis
        let prefactor: C64
            = (self.phase + Phase::Pi1h * ny).as_complex();
        let mut out: na::DVector<C64> = na::DVector::zeros(dim);
        for (b, amp) in psi.iter().enumerate() {
            let parity = (b & sign).count_ones() % 2;
            let a = if parity == 1 { -amp } else { *amp };
            out[b ^ flip] = prefactor * a;
        }
        Ok(out)
    }

    /// Construct the dense 2<sup>*n*</sup> × 2<sup>*n*</sup> matrix of `self`.
    pub fn to_matrix(&self) -> na::DMatrix<C64> {
        let mut acc: na::DMatrix<C64>
            = na::DMatrix::from_diagonal_element(1, 1, self.phase.as_complex());
        // highest qubit is the most significant tensor factor
        for p in self.ops.iter().rev() {
            acc = acc.kronecker(p.matrix());
        }
        acc
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx_eq(a: &na::DMatrix<C64>, b: &na::DMatrix<C64>) -> bool {
        a.shape() == b.shape()
            && a.iter().zip(b.iter()).all(|(ak, bk)| (ak - bk).norm() < 1e-12)
    }

    #[test]
    fn label_round_trip_and_order() {
        let p: NPauli = "IYX".parse().unwrap();
        assert_eq!(p.ops, vec![Pauli::X, Pauli::Y, Pauli::I]);
        assert_eq!(p.label(), "IYX");
        assert_eq!(format!("{}", p), "+1 IYX");
        assert_eq!(format!("{:#}", p), "+1 .YX");
        assert_eq!(p.support(), vec![0, 1]);
        assert!("IQX".parse::<NPauli>().is_err());
        assert!("".parse::<NPauli>().is_err());
    }

    #[test]
    fn single_qubit_is_least_significant() {
        // X on qubit 0 of two qubits is I ⊗ X
        let p: NPauli = "IX".parse().unwrap();
        let expected = Pauli::I.matrix().kronecker(Pauli::X.matrix());
        assert!(approx_eq(&p.to_matrix(), &expected));
    }

    #[test]
    fn product_matches_matrices() {
        let labels = ["XYZ", "YIX", "ZZI", "IXY", "YYY"];
        for a in labels.iter() {
            for b in labels.iter() {
                let pa: NPauli = a.parse().unwrap();
                let pb: NPauli = b.parse().unwrap();
                let prod = pa.mul(&pb).unwrap();
                assert!(
                    approx_eq(&prod.to_matrix(), &(pa.to_matrix() * pb.to_matrix())),
                    "{} · {}", a, b,
                );
            }
        }
    }

    #[test]
    fn commutation_matches_matrices() {
        let labels = ["XYZ", "YIX", "ZZI", "IXY", "YYY", "III"];
        for a in labels.iter() {
            for b in labels.iter() {
                let pa: NPauli = a.parse().unwrap();
                let pb: NPauli = b.parse().unwrap();
                let (ma, mb) = (pa.to_matrix(), pb.to_matrix());
                let comm = approx_eq(&(&ma * &mb), &(&mb * &ma));
                assert_eq!(pa.commutes_with(&pb).unwrap(), comm, "{} {}", a, b);
            }
        }
    }

    #[test]
    fn apply_matches_matrix() {
        let psi: na::DVector<C64>
            = na::DVector::from_iterator(
                8, (0..8).map(|k| C64::new(k as f64 + 1.0, 0.5 * k as f64)));
        for label in ["XYZ", "YIX", "ZZI", "IXY", "YYY"] {
            let p: NPauli = label.parse::<NPauli>().unwrap()
                .with_phase(Phase::Pi1h);
            let direct = p.apply(&psi).unwrap();
            let dense = p.to_matrix() * &psi;
            assert!(
                direct.iter().zip(dense.iter())
                    .all(|(a, b)| (a - b).norm() < 1e-12),
                "{}", label,
            );
        }
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let a: NPauli = "XY".parse().unwrap();
        let b: NPauli = "XYZ".parse().unwrap();
        assert_eq!(
            a.mul(&b),
            Err(ConstructionError::QubitMismatch { expected: 2, got: 3 }),
        );
        assert!(a.apply(&na::DVector::zeros(8)).is_err());
    }
}
