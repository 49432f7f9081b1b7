//! Dense state vectors of small qubit registers and the probability
//! distributions they induce in the computational basis.
//!
//! States are plain complex vectors of length 2<sup>*n*</sup>, with qubit `k`
//! encoded in bit `k` of the basis index. This representation scales
//! exponentially and is meant for registers of at most
//! [`MAX_QUBITS`][crate::clifford::MAX_QUBITS] qubits.

use std::ops::Deref;
use itertools::Itertools;
use nalgebra as na;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    clifford::MAX_QUBITS,
    error::ConstructionError,
    pauli::NPauli,
};

/// Tolerance used to decide normalization and eigenvalue degeneracy.
pub const TOLERANCE: f64 = 1e-9;

/// Check that a dense state on `n` qubits is within the simulation limit.
pub fn check_qubits(n: usize) -> Result<(), ConstructionError> {
    if n > MAX_QUBITS {
        Err(ConstructionError::TooManyQubits { n, max: MAX_QUBITS })
    } else {
        Ok(())
    }
}

/// Return the binary label of basis state `index` on `n` qubits, highest qubit
/// first.
pub fn basis_label(index: usize, n: usize) -> String {
    format!("{:0width$b}", index, width = n)
}

/// Return the labels of all 2<sup>*n*</sup> basis states in index order.
pub fn basis_states(n: usize) -> Vec<String> {
    (0..1_usize << n).map(|k| basis_label(k, n)).collect()
}

/// Parse an `n`-bit basis label back into its index.
pub fn parse_basis_label(label: &str, n: usize) -> Option<usize> {
    (label.len() == n && label.chars().all(|c| c == '0' || c == '1'))
        .then(|| usize::from_str_radix(label, 2).ok())
        .flatten()
}

/// A pure state of an `n`-qubit register.
#[derive(Clone, Debug, PartialEq)]
pub struct Statevector {
    n: usize,
    amps: na::DVector<C64>,
}

impl Statevector {
    /// Create a new state initialized to ∣0...0⟩.
    ///
    /// Fails if `n` exceeds [`MAX_QUBITS`].
    pub fn new(n: usize) -> Result<Self, ConstructionError> {
        check_qubits(n)?;
        let mut amps: na::DVector<C64> = na::DVector::zeros(1 << n);
        amps[0] = C64::from(1.0);
        Ok(Self { n, amps })
    }

    /// Wrap a vector of amplitudes, checking its length and norm.
    pub fn from_amplitudes(n: usize, amps: na::DVector<C64>)
        -> Result<Self, ConstructionError>
    {
        check_qubits(n)?;
        if amps.len() != 1 << n {
            return Err(ConstructionError::InvalidState(
                format!("{} amplitudes for {} qubits", amps.len(), n)
            ));
        }
        let norm = amps.norm();
        if (norm - 1.0).abs() > TOLERANCE {
            return Err(ConstructionError::InvalidState(
                format!("norm {} is not 1", norm)
            ));
        }
        Ok(Self { n, amps })
    }

    /// Return the number of qubits.
    pub fn num_qubits(&self) -> usize { self.n }

    pub fn amplitudes(&self) -> &na::DVector<C64> { &self.amps }

    pub fn into_amplitudes(self) -> na::DVector<C64> { self.amps }

    /// Apply a Pauli string.
    pub fn apply_pauli(&mut self, p: &NPauli) -> Result<&mut Self, ConstructionError>
    {
        self.amps = p.apply(&self.amps)?;
        Ok(self)
    }

    /// Evolve under a Pauli-string Hamiltonian `h` for time `t`, i.e. apply
    /// exp(−*i t h*) = cos *t*·I − *i* sin *t*·*h*.
    ///
    /// Fails if `h` is not Hermitian.
    pub fn evolve(&mut self, h: &NPauli, t: f64)
        -> Result<&mut Self, ConstructionError>
    {
        if !h.is_hermitian() {
            return Err(ConstructionError::NotHermitian(h.to_string()));
        }
        let h_psi = h.apply(&self.amps)?;
        self.amps
            = &self.amps * C64::from(t.cos()) - h_psi * (C64::i() * t.sin());
        Ok(self)
    }

    /// Apply a dense operator.
    pub fn apply_matrix(&mut self, u: &na::DMatrix<C64>)
        -> Result<&mut Self, ConstructionError>
    {
        if u.nrows() != self.amps.len() || u.ncols() != self.amps.len() {
            return Err(ConstructionError::InvalidState(
                format!(
                    "{}×{} operator on {} amplitudes",
                    u.nrows(), u.ncols(), self.amps.len(),
                )
            ));
        }
        self.amps = u * &self.amps;
        Ok(self)
    }

    /// Return the Born-rule distribution over computational basis states.
    pub fn probabilities(&self) -> ProbabilityVector {
        ProbabilityVector(self.amps.iter().map(|a| a.norm_sqr()).collect())
    }

    /// Construct the projector ∣ψ⟩⟨ψ∣.
    pub fn as_matrix(&self) -> na::DMatrix<C64> {
        outer_prod(&self.amps, &self.amps)
    }
}

/// A probability distribution over the 2<sup>*n*</sup> computational basis
/// states, indexed by basis index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityVector(Vec<f64>);

impl Deref for ProbabilityVector {
    type Target = [f64];

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl From<ProbabilityVector> for Vec<f64> {
    fn from(p: ProbabilityVector) -> Self { p.0 }
}

impl ProbabilityVector {
    /// Wrap raw probabilities without validation.
    pub fn from_vec(probs: Vec<f64>) -> Self { Self(probs) }

    /// Return the number of qubits, if the length is a power of two.
    pub fn num_qubits(&self) -> Option<usize> {
        self.0.len().is_power_of_two()
            .then(|| self.0.len().trailing_zeros() as usize)
    }

    /// Sum of all entries.
    pub fn total(&self) -> f64 { self.0.iter().sum() }

    /// Return `true` if all entries are non-negative and sum to 1 within
    /// [`TOLERANCE`].
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|p| *p >= 0.0) && (self.total() - 1.0).abs() < TOLERANCE
    }

    /// Return the most likely basis index.
    pub fn argmax(&self) -> Option<usize> {
        self.0.iter().copied().position_max_by(|a, b| a.total_cmp(b))
    }
}

/// Select a normalized eigenvector of a Hermitian matrix for its largest
/// eigenvalue.
///
/// The largest eigenvalue may be degenerate (every generator on *n* > 1 qubits
/// has eigenvalues ±1 with multiplicity 2<sup>*n*−1</sup>). To give a
/// reproducible answer regardless of which eigenbasis the decomposition
/// returns, the computational basis is projected onto the maximal eigenspace
/// and the projection of the lowest-index basis state with non-zero overlap is
/// returned. Its leading amplitude is real and positive.
pub fn max_eigenvector(h: &na::DMatrix<C64>)
    -> Result<na::DVector<C64>, ConstructionError>
{
    if !h.is_square() || h.nrows() == 0 {
        return Err(ConstructionError::InvalidState(
            format!("{}×{} operator is not square", h.nrows(), h.ncols())
        ));
    }
    if (h.adjoint() - h).iter().any(|a| a.norm() > TOLERANCE) {
        return Err(ConstructionError::NotHermitian(
            format!("{}×{} operator", h.nrows(), h.ncols())
        ));
    }
    let eigen = h.clone().symmetric_eigen();
    let lmax: f64
        = eigen.eigenvalues.iter().copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let dim = h.nrows();
    let projector: na::DMatrix<C64>
        = eigen.eigenvalues.iter().enumerate()
        .filter(|(_, l)| lmax - **l < TOLERANCE.sqrt())
        .fold(
            na::DMatrix::zeros(dim, dim),
            |acc, (k, _)| {
                let v: na::DVector<C64> = eigen.eigenvectors.column(k).into_owned();
                acc + outer_prod(&v, &v)
            },
        );
    // diagonal entries of a projector are the squared norms of its columns
    let (col, weight)
        = (0..dim)
        .map(|k| (k, projector[(k, k)].re))
        .find(|(_, w)| *w > TOLERANCE.sqrt())
        .ok_or_else(|| ConstructionError::InvalidState(
            "empty maximal eigenspace".into()
        ))?;
    let v: na::DVector<C64> = projector.column(col) / C64::from(weight.sqrt());
    Ok(v)
}

/// Compute the outer product ∣a⟩⟨b∣.
pub fn outer_prod(a: &na::DVector<C64>, b: &na::DVector<C64>)
    -> na::DMatrix<C64>
{
    a * b.adjoint()
}
