//! Grover-like amplitude amplification in the rotation plane of a pair of
//! Clifford generators.
//!
//! For a pair (Γ<sub>*i*</sub>, Γ<sub>*j*</sub>) and angle *θ*, the search
//! circuit
//! 1. prepares the top eigenvector ∣*ψ*<sub>0</sub>⟩ of Γ<sub>*j*</sub>
//! 1. evolves it under *H* = *i*Γ<sub>*i*</sub>Γ<sub>*j*</sub> for time *θ*,
//! giving ∣*ψ*<sub>rot</sub>⟩
//! 1. applies *k* rounds of (Γ<sub>*j*</sub>, *D*), where *D* = 2∣*ψ*<sub>rot</sub>⟩⟨*ψ*<sub>rot</sub>∣ − I
//! reflects about the rotated state (not the initial one)
//! 1. measures every qubit.
//!
//! The ideal output distribution is computed exactly just before the final
//! measurement.

use std::{ f64::consts::PI, sync::Arc };
use nalgebra as na;
use num_complex::Complex64 as C64;
use crate::{
    circuit::{ Circuit, Instruction },
    clifford::{ bivector_hamiltonian, Generator, GeneratorPair },
    error::ConstructionError,
    state::{ max_eigenvector, ProbabilityVector, Statevector },
};

/// Default rotation angle, π/6.
pub const DEFAULT_THETA: f64 = PI / 6.0;

/// Label attached to diffusion instructions.
pub const DIFFUSION_LABEL: &str = "D";

/// Upper limit on the number of amplification rounds in one circuit.
pub const MAX_ITERATIONS: usize = 10_000;

/// A measurable search circuit together with its exact output distribution.
#[derive(Clone, Debug)]
pub struct SpinorSearch {
    pub pair: GeneratorPair,
    pub theta: f64,
    /// Number of (Γ<sub>*j*</sub>, *D*) rounds.
    pub iterations: usize,
    pub circuit: Circuit,
    pub ideal: ProbabilityVector,
}

/// Compute the number of amplification rounds for angle `theta`,
/// *k* = max(1, ⌊π/(4*θ*) − 1/2⌋).
///
/// Fails if `theta` is not finite and positive, or if *k* exceeds
/// [`MAX_ITERATIONS`].
pub fn iteration_count(theta: f64) -> Result<usize, ConstructionError> {
    if !theta.is_finite() || theta <= 0.0 {
        return Err(ConstructionError::InvalidAngle(theta));
    }
    let k = (PI / (4.0 * theta) - 0.5).floor();
    if k > MAX_ITERATIONS as f64 {
        return Err(ConstructionError::TooManyIterations {
            theta, k, max: MAX_ITERATIONS });
    }
    Ok(if k < 1.0 { 1 } else { k as usize })
}

/// Construct the reflection 2∣ψ⟩⟨ψ∣ − I.
pub fn diffusion_operator(psi: &Statevector) -> na::DMatrix<C64> {
    let dim = psi.amplitudes().len();
    psi.as_matrix() * C64::from(2.0) - na::DMatrix::identity(dim, dim)
}

/// Build the search circuit on `n` qubits for the ordered pair
/// (`gamma_i`, `gamma_j`) and rotation angle `theta`.
///
/// Fails if the generators do not act on `n` qubits, if they are the same
/// generator, or if `theta` is not finite and positive.
pub fn build_search_circuit(
    n: usize,
    gamma_i: &Generator,
    gamma_j: &Generator,
    theta: f64,
) -> Result<SpinorSearch, ConstructionError>
{
    for g in [gamma_i, gamma_j] {
        if g.num_qubits() != n {
            return Err(ConstructionError::QubitMismatch {
                expected: n,
                got: g.num_qubits(),
            });
        }
    }
    let iterations = iteration_count(theta)?;
    let hamiltonian = bivector_hamiltonian(gamma_i, gamma_j)?;
    let initial = max_eigenvector(&gamma_j.to_matrix())?;

    let mut circuit = Circuit::new(n)?;
    circuit
        .push(Instruction::Initialize(initial))?
        .push(Instruction::Evolution { hamiltonian, time: theta })?;
    let rotated = circuit.simulate()?;

    let diffusion = Arc::new(diffusion_operator(&rotated));
    for _ in 0..iterations {
        circuit
            .push(Instruction::Pauli(gamma_j.pauli().clone()))?
            .push(Instruction::Unitary {
                label: DIFFUSION_LABEL.into(),
                matrix: Arc::clone(&diffusion),
            })?;
    }
    let ideal = circuit.simulate()?.probabilities();
    circuit.measure_all();

    Ok(SpinorSearch {
        pair: GeneratorPair { i: gamma_i.index(), j: gamma_j.index() },
        theta,
        iterations,
        circuit,
        ideal,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::clifford::{ build_generators, build_rotation };

    #[test]
    fn iteration_counts() {
        assert_eq!(iteration_count(PI / 6.0), Ok(1));
        assert_eq!(iteration_count(PI / 4.0), Ok(1));
        assert_eq!(iteration_count(PI / 20.0), Ok(4));
        assert_eq!(iteration_count(3.0), Ok(1));
        assert!(iteration_count(0.0).is_err());
        assert!(iteration_count(-0.1).is_err());
        assert!(iteration_count(f64::NAN).is_err());
    }

    #[test]
    fn iteration_limit() {
        // θ = π/(4(k + 1/2)) gives exactly k rounds
        let at_limit = PI / (4.0 * (MAX_ITERATIONS as f64 + 0.75));
        assert_eq!(iteration_count(at_limit), Ok(MAX_ITERATIONS));
        assert!(matches!(
            iteration_count(1e-15),
            Err(ConstructionError::TooManyIterations { max: MAX_ITERATIONS, .. }),
        ));

        let gammas = build_generators(2).unwrap();
        let (gi, gj) = gammas.pair(GeneratorPair { i: 0, j: 1 }).unwrap();
        assert!(matches!(
            build_search_circuit(2, gi, gj, 1e-15).map(|s| s.iterations),
            Err(ConstructionError::TooManyIterations { .. }),
        ));
    }

    #[test]
    fn scenario_gamma0_gamma3() {
        let gammas = build_generators(3).unwrap();
        let search
            = build_search_circuit(
                3, gammas.get(0).unwrap(), gammas.get(3).unwrap(), DEFAULT_THETA)
            .unwrap();
        assert_eq!(search.iterations, 1);
        assert_eq!(search.ideal.len(), 8);
        assert_abs_diff_eq!(search.ideal.total(), 1.0, epsilon = 1e-9);
        // the diffusion step rotates ∣000⟩ fully onto ∣001⟩
        assert_abs_diff_eq!(search.ideal[1], 1.0, epsilon = 1e-9);
        assert_eq!(search.ideal.argmax(), Some(1));
    }

    #[test]
    fn ideal_is_normalized_for_all_pairs() {
        for n in 1..=4 {
            let gammas = build_generators(n).unwrap();
            for pair in gammas.pairs() {
                let (gi, gj) = gammas.pair(pair).unwrap();
                let search
                    = build_search_circuit(n, gi, gj, DEFAULT_THETA).unwrap();
                assert_eq!(search.ideal.len(), 1 << n);
                assert!(search.ideal.is_normalized(), "{}", pair);
            }
        }
    }

    #[test]
    fn circuit_structure() {
        let gammas = build_generators(3).unwrap();
        let (gi, gj) = gammas.pair(GeneratorPair { i: 1, j: 4 }).unwrap();
        let theta = PI / 20.0;
        let search = build_search_circuit(3, gi, gj, theta).unwrap();
        let k = search.iterations;
        assert_eq!(k, 4);
        // initialize + evolution + k rounds of two + 3 measurements
        assert_eq!(search.circuit.len(), 2 + 2 * k + 3);
        let (unitary, measured) = search.circuit.split_measurements().unwrap();
        assert_eq!(unitary.len(), 2 + 2 * k);
        assert_eq!(measured, vec![0, 1, 2]);
        assert!(matches!(
            &unitary[3],
            Instruction::Unitary { label, .. } if label == DIFFUSION_LABEL,
        ));
    }

    #[test]
    fn evolution_matches_rotation_operator() {
        let gammas = build_generators(3).unwrap();
        let (gi, gj) = gammas.pair(GeneratorPair { i: 2, j: 5 }).unwrap();
        let search = build_search_circuit(3, gi, gj, DEFAULT_THETA).unwrap();
        let mut prefix = Circuit::new(3).unwrap();
        search.circuit.instructions()[..2].iter()
            .for_each(|instr| { prefix.push(instr.clone()).unwrap(); });
        let evolved = prefix.simulate().unwrap();

        let initial = max_eigenvector(&gj.to_matrix()).unwrap();
        let rotated = build_rotation(DEFAULT_THETA, gi, gj).unwrap() * initial;
        assert!(
            evolved.amplitudes().iter().zip(rotated.iter())
                .all(|(a, b)| (a - b).norm() < 1e-9)
        );
    }

    #[test]
    fn invalid_inputs() {
        let gammas = build_generators(3).unwrap();
        let g0 = gammas.get(0).unwrap();
        let g1 = gammas.get(1).unwrap();
        assert_eq!(
            build_search_circuit(3, g0, g0, DEFAULT_THETA).map(|s| s.iterations),
            Err(ConstructionError::DegeneratePair(0)),
        );
        assert_eq!(
            build_search_circuit(4, g0, g1, DEFAULT_THETA).map(|s| s.iterations),
            Err(ConstructionError::QubitMismatch { expected: 4, got: 3 }),
        );
        assert_eq!(
            build_search_circuit(3, g0, g1, 0.0).map(|s| s.iterations),
            Err(ConstructionError::InvalidAngle(0.0)),
        );
    }
}
