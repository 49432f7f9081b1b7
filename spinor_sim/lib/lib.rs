//! Tools for running spinorial search experiments on small qubit registers.
//!
//! The 2*n* generators of the Clifford algebra Cl(2*n*) are represented on *n*
//! qubits as Pauli strings (Jordan–Wigner). Each pair of generators spans a
//! rotation plane; for every pair, a Grover-like amplitude-amplification
//! circuit is built in that plane, its ideal output distribution is computed
//! by exact statevector simulation, and the circuit is handed to an execution
//! [`Backend`][backend::Backend] for sampling. Sampled counts are scored
//! against the ideal distribution with the classical fidelity and collected in
//! a persistent [`ExperimentReport`][report::ExperimentReport].
//!
//! All simulation is dense, limited to [`MAX_QUBITS`][clifford::MAX_QUBITS]
//! qubits.

pub mod error;
pub mod gate;
pub mod pauli;
pub mod clifford;
pub mod state;
pub mod circuit;
pub mod search;
pub mod fidelity;
pub mod backend;
pub mod config;
pub mod report;
pub mod experiment;

pub use error::{ ExperimentError, ExperimentResult };
pub use clifford::{ build_generators, build_rotation, GeneratorPair, GeneratorSet };
pub use search::{ build_search_circuit, SpinorSearch };
pub use fidelity::{ compute_fidelity, Counts };
pub use experiment::{ run_and_save, run_experiment };
