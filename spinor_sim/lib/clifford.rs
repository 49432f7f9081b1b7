//! Generators of the Clifford algebra Cl(2*n*) as *n*-qubit Pauli strings, and
//! the rotations generated by their bivectors.
//!
//! The 2*n* generators Γ<sub>0</sub>, ..., Γ<sub>2*n*-1</sub> satisfy
//! {Γ<sub>*i*</sub>, Γ<sub>*j*</sub>} = 2δ<sub>*ij*</sub>·I. They are built
//! Jordan-Wigner style: the *j*-th generator of each half carries σ<sub>*x*</sub>
//! on every qubit below *j* (the "string"), then σ<sub>*y*</sub> (first half)
//! or σ<sub>*z*</sub> (second half) on qubit *j*, and the identity above.
//!
//! For *i* ≠ *j* the bivector Γ<sub>*i*</sub>Γ<sub>*j*</sub> squares to −I, so
//! exp(θ Γ<sub>*i*</sub>Γ<sub>*j*</sub>) = cos θ·I + sin θ·Γ<sub>*i*</sub>Γ<sub>*j*</sub>
//! is a rotation in the (*i*, *j*) plane.

use std::fmt;
use itertools::Itertools;
use nalgebra as na;
use num_complex::Complex64 as C64;
use crate::{
    error::ConstructionError,
    gate::{ Pauli, Phase },
    pauli::NPauli,
    state::check_qubits,
};

/// Largest register for which dense operators are built.
pub const MAX_QUBITS: usize = 10;

/// A single Clifford generator Γ<sub>*index*</sub>.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Generator {
    index: usize,
    pauli: NPauli,
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Γ{} = {}", self.index, self.pauli.label())
    }
}

impl Generator {
    /// Position of `self` in its [`GeneratorSet`].
    pub fn index(&self) -> usize { self.index }

    /// The underlying Pauli string.
    pub fn pauli(&self) -> &NPauli { &self.pauli }

    /// The Pauli label, highest qubit first.
    pub fn label(&self) -> String { self.pauli.label() }

    pub fn num_qubits(&self) -> usize { self.pauli.num_qubits() }

    /// Dense matrix representation.
    pub fn to_matrix(&self) -> na::DMatrix<C64> { self.pauli.to_matrix() }
}

/// The ordered set of all 2*n* generators for *n* qubits.
///
/// Order is significant: index *k* refers to the same generator everywhere
/// downstream, including persisted reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorSet {
    n: usize,
    gammas: Vec<Generator>,
}

impl<'a> IntoIterator for &'a GeneratorSet {
    type Item = &'a Generator;
    type IntoIter = <&'a Vec<Generator> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter { self.gammas.iter() }
}

impl GeneratorSet {
    /// Number of qubits.
    pub fn num_qubits(&self) -> usize { self.n }

    /// Number of generators (always 2*n*).
    pub fn len(&self) -> usize { self.gammas.len() }

    pub fn is_empty(&self) -> bool { self.gammas.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Generator> { self.gammas.iter() }

    /// Look up Γ<sub>*index*</sub>.
    pub fn get(&self, index: usize) -> Result<&Generator, ConstructionError> {
        self.gammas.get(index)
            .ok_or(ConstructionError::IndexOutOfRange {
                index,
                len: self.gammas.len(),
            })
    }

    /// Enumerate all index pairs (*i*, *j*) with *i* < *j*, in lexicographic
    /// order.
    pub fn pairs(&self) -> Vec<GeneratorPair> {
        (0..self.gammas.len())
            .tuple_combinations()
            .map(|(i, j)| GeneratorPair { i, j })
            .collect()
    }

    /// Look up both generators of a pair.
    pub fn pair(&self, pair: GeneratorPair)
        -> Result<(&Generator, &Generator), ConstructionError>
    {
        if pair.i == pair.j {
            return Err(ConstructionError::DegeneratePair(pair.i));
        }
        Ok((self.get(pair.i)?, self.get(pair.j)?))
    }
}

/// Indices (*i*, *j*) of the bivector Γ<sub>*i*</sub>Γ<sub>*j*</sub> defining a
/// rotation plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorPair {
    pub i: usize,
    pub j: usize,
}

impl fmt::Display for GeneratorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Γ_{}Γ_{}", self.i, self.j)
    }
}

// label of the j-th generator of a half, with `last` on qubit j - 1
fn generator_ops(n: usize, j: usize, last: Pauli) -> Vec<Pauli> {
    (0..n)
        .map(|k| {
            if k + 1 < j {
                Pauli::X
            } else if k + 1 == j {
                last
            } else {
                Pauli::I
            }
        })
        .collect()
}

/// Build the 2*n* Clifford generators for `n` qubits.
///
/// For *j* = 1, ..., *n*, generator *j* − 1 is X<sup>⊗(*j*−1)</sup> followed by
/// Y on qubit *j* − 1, and generator *n* + *j* − 1 is the same with Z in place
/// of Y. For `n = 3` the labels are `IIY`, `IYX`, `YXX`, `IIZ`, `IZX`, `ZXX`.
///
/// Fails if `n` is zero or exceeds [`MAX_QUBITS`].
pub fn build_generators(n: usize) -> Result<GeneratorSet, ConstructionError> {
    if n < 1 {
        return Err(ConstructionError::InvalidQubitCount(n));
    }
    check_qubits(n)?;
    let gammas: Vec<Generator>
        = [Pauli::Y, Pauli::Z].into_iter()
        .flat_map(|last| (1..=n).map(move |j| generator_ops(n, j, last)))
        .enumerate()
        .map(|(index, ops)| Generator { index, pauli: NPauli::new(ops) })
        .collect();
    Ok(GeneratorSet { n, gammas })
}

fn check_pair(gamma_i: &Generator, gamma_j: &Generator)
    -> Result<(), ConstructionError>
{
    if gamma_i.num_qubits() != gamma_j.num_qubits() {
        return Err(ConstructionError::QubitMismatch {
            expected: gamma_i.num_qubits(),
            got: gamma_j.num_qubits(),
        });
    }
    if gamma_i.pauli == gamma_j.pauli {
        return Err(ConstructionError::DegeneratePair(gamma_i.index));
    }
    Ok(())
}

/// Compute the bivector Γ<sub>*i*</sub>Γ<sub>*j*</sub> as a Pauli string.
///
/// For distinct generators the result always carries a phase of ±*i*.
pub fn bivector(gamma_i: &Generator, gamma_j: &Generator)
    -> Result<NPauli, ConstructionError>
{
    check_pair(gamma_i, gamma_j)?;
    gamma_i.pauli.mul(&gamma_j.pauli)
}

/// Compute the Hamiltonian *H* = *i*·Γ<sub>*i*</sub>Γ<sub>*j*</sub> whose time
/// evolution exp(−*iθH*) equals exp(θ Γ<sub>*i*</sub>Γ<sub>*j*</sub>).
///
/// *H* is a Pauli string with a real sign, hence Hermitian with *H*² = I.
pub fn bivector_hamiltonian(gamma_i: &Generator, gamma_j: &Generator)
    -> Result<NPauli, ConstructionError>
{
    let h = bivector(gamma_i, gamma_j)?.with_phase(Phase::Pi1h);
    if h.is_hermitian() {
        Ok(h)
    } else {
        // only reachable for commuting generators, which never come from a
        // single generator set
        Err(ConstructionError::NotHermitian(h.to_string()))
    }
}

/// Build the rotation operator exp(θ Γ<sub>*i*</sub>Γ<sub>*j*</sub>) as a dense
/// unitary via the matrix exponential.
///
/// Fails if the two generators are identical, since the product is then the
/// identity rather than an anti-Hermitian bivector.
pub fn build_rotation(theta: f64, gamma_i: &Generator, gamma_j: &Generator)
    -> Result<na::DMatrix<C64>, ConstructionError>
{
    check_pair(gamma_i, gamma_j)?;
    let bv: na::DMatrix<C64> = gamma_i.to_matrix() * gamma_j.to_matrix();
    Ok((bv * C64::from(theta)).exp())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn is_identity(m: &na::DMatrix<C64>) -> bool {
        let id: na::DMatrix<C64> = na::DMatrix::identity(m.nrows(), m.ncols());
        (m - id).iter().all(|a| a.norm() < EPSILON)
    }

    #[test]
    fn labels_n3() {
        let gammas = build_generators(3).unwrap();
        let labels: Vec<String> = gammas.iter().map(|g| g.label()).collect();
        assert_eq!(labels, ["IIY", "IYX", "YXX", "IIZ", "IZX", "ZXX"]);
        assert_eq!(gammas.get(4).unwrap().index(), 4);
        assert!(gammas.get(6).is_err());
    }

    #[test]
    fn invalid_qubit_counts() {
        assert_eq!(
            build_generators(0),
            Err(ConstructionError::InvalidQubitCount(0)),
        );
        assert!(build_generators(MAX_QUBITS + 1).is_err());
    }

    #[test]
    fn hermitian_unitary_traceless() {
        for n in 1..=4 {
            let gammas = build_generators(n).unwrap();
            assert_eq!(gammas.len(), 2 * n);
            for g in gammas.iter() {
                let m = g.to_matrix();
                assert!((m.adjoint() - &m).iter().all(|a| a.norm() < EPSILON));
                assert!(is_identity(&(&m * m.adjoint())));
                assert!(m.trace().norm() < EPSILON, "{}", g);
            }
        }
    }

    #[test]
    fn anticommutation() {
        for n in 1..=4 {
            let gammas = build_generators(n).unwrap();
            for (gi, gj) in gammas.iter().tuple_combinations() {
                let (mi, mj) = (gi.to_matrix(), gj.to_matrix());
                let anti = &mi * &mj + &mj * &mi;
                assert!(anti.iter().all(|a| a.norm() < EPSILON), "{} {}", gi, gj);
                assert!(!gi.pauli().commutes_with(gj.pauli()).unwrap());
            }
        }
    }

    #[test]
    fn pair_enumeration() {
        let gammas = build_generators(3).unwrap();
        let pairs = gammas.pairs();
        assert_eq!(pairs.len(), 15);
        assert_eq!(pairs[0], GeneratorPair { i: 0, j: 1 });
        assert_eq!(pairs[14], GeneratorPair { i: 4, j: 5 });
        assert!(pairs.iter().all(|p| p.i < p.j));
        assert_eq!(
            gammas.pair(GeneratorPair { i: 2, j: 2 }),
            Err(ConstructionError::DegeneratePair(2)),
        );
    }

    #[test]
    fn rotation_is_unitary() {
        let gammas = build_generators(3).unwrap();
        for theta in [0.0, PI / 12.0, PI / 6.0, PI / 4.0] {
            for (gi, gj) in gammas.iter().tuple_combinations() {
                let r = build_rotation(theta, gi, gj).unwrap();
                assert!(is_identity(&(&r * r.adjoint())), "θ = {}", theta);
            }
        }
    }

    #[test]
    fn rotation_closed_form() {
        let gammas = build_generators(2).unwrap();
        let theta = PI / 6.0;
        for (gi, gj) in gammas.iter().tuple_combinations() {
            let r = build_rotation(theta, gi, gj).unwrap();
            let bv = bivector(gi, gj).unwrap().to_matrix();
            let id: na::DMatrix<C64> = na::DMatrix::identity(4, 4);
            let closed = id * C64::from(theta.cos()) + bv * C64::from(theta.sin());
            assert!((r - closed).iter().all(|a| a.norm() < EPSILON));
        }
    }

    #[test]
    fn hamiltonian_evolution_matches_rotation() {
        // exp(-iθH) = cos θ − i sin θ H for H² = I
        let gammas = build_generators(3).unwrap();
        let theta = PI / 12.0;
        for (gi, gj) in gammas.iter().tuple_combinations() {
            let h = bivector_hamiltonian(gi, gj).unwrap();
            assert!(h.is_hermitian());
            let id: na::DMatrix<C64> = na::DMatrix::identity(8, 8);
            let evo = id * C64::from(theta.cos())
                - h.to_matrix() * (C64::i() * theta.sin());
            let r = build_rotation(theta, gi, gj).unwrap();
            assert!((r - evo).iter().all(|a| a.norm() < EPSILON));
        }
    }

    #[test]
    fn degenerate_rotation_rejected() {
        let gammas = build_generators(2).unwrap();
        let g = gammas.get(1).unwrap();
        assert_eq!(
            build_rotation(PI / 6.0, g, g),
            Err(ConstructionError::DegeneratePair(1)),
        );
        assert!(bivector_hamiltonian(g, g).is_err());
    }
}
