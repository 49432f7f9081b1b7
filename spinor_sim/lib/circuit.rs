//! Gate-level circuits over an *n*-qubit register.
//!
//! A [`Circuit`] is a flat list of [`Instruction`]s. Everything before the
//! first measurement is unitary and can be simulated exactly with
//! [`Circuit::simulate`]; sampling backends additionally require that all
//! measurements come last (see [`Circuit::split_measurements`]).

use std::{ fmt, sync::Arc };
use nalgebra as na;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    error::ConstructionError,
    pauli::NPauli,
    state::{ check_qubits, Statevector },
};

/// A single circuit operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Overwrite the register with the given amplitudes.
    Initialize(na::DVector<C64>),
    /// Evolution exp(−*i t H*) under a Hermitian Pauli-string Hamiltonian.
    Evolution { hamiltonian: NPauli, time: f64 },
    /// A Pauli string applied as a unitary.
    Pauli(NPauli),
    /// An arbitrary dense unitary on the whole register.
    Unitary { label: String, matrix: Arc<na::DMatrix<C64>> },
    /// Computational-basis measurement of one qubit.
    Measure(usize),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize(amps) => write!(f, "initialize[{}]", amps.len()),
            Self::Evolution { hamiltonian, time }
                => write!(f, "evolve({}; t = {})", hamiltonian, time),
            Self::Pauli(p) => write!(f, "pauli({})", p),
            Self::Unitary { label, .. } => write!(f, "unitary({})", label),
            Self::Measure(k) => write!(f, "measure({})", k),
        }
    }
}

impl Instruction {
    /// Return `true` if `self` is a measurement.
    pub fn is_measurement(&self) -> bool { matches!(self, Self::Measure(_)) }

    /// Return the qubits `self` acts on non-trivially in a register of `n`
    /// qubits.
    pub fn qubits(&self, n: usize) -> Vec<usize> {
        match self {
            Self::Initialize(_) | Self::Unitary { .. } => (0..n).collect(),
            Self::Evolution { hamiltonian: p, .. } | Self::Pauli(p)
                => p.support(),
            Self::Measure(k) => vec![*k],
        }
    }

    fn apply(&self, position: usize, state: &mut Statevector)
        -> Result<(), ConstructionError>
    {
        match self {
            Self::Initialize(amps) => {
                *state
                    = Statevector::from_amplitudes(
                        state.num_qubits(), amps.clone())?;
            },
            Self::Evolution { hamiltonian, time } => {
                state.evolve(hamiltonian, *time)?;
            },
            Self::Pauli(p) => { state.apply_pauli(p)?; },
            Self::Unitary { matrix, .. } => { state.apply_matrix(matrix)?; },
            Self::Measure(_) => {
                return Err(ConstructionError::NonUnitary { position });
            },
        }
        Ok(())
    }
}

/// Identifies the generator pair a circuit was built for and its position in a
/// submitted batch.
///
/// Backends echo this back with each result so that results can be matched to
/// circuits independently of the order they are returned in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitMetadata {
    pub gamma_i: usize,
    pub gamma_j: usize,
    pub sequence_index: usize,
}

/// A list of instructions on a fixed number of qubits.
#[derive(Clone, Debug, PartialEq)]
pub struct Circuit {
    n: usize,
    instructions: Vec<Instruction>,
    metadata: Option<CircuitMetadata>,
}

impl Circuit {
    /// Create a new, empty circuit on `n` qubits.
    ///
    /// Fails if `n` exceeds [`MAX_QUBITS`][crate::clifford::MAX_QUBITS].
    pub fn new(n: usize) -> Result<Self, ConstructionError> {
        check_qubits(n)?;
        Ok(Self { n, instructions: Vec::new(), metadata: None })
    }

    pub fn num_qubits(&self) -> usize { self.n }

    pub fn instructions(&self) -> &[Instruction] { &self.instructions }

    pub fn len(&self) -> usize { self.instructions.len() }

    pub fn is_empty(&self) -> bool { self.instructions.is_empty() }

    pub fn metadata(&self) -> Option<&CircuitMetadata> { self.metadata.as_ref() }

    /// Attach metadata, replacing any already present.
    pub fn with_metadata(mut self, metadata: CircuitMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn set_metadata(&mut self, metadata: CircuitMetadata) {
        self.metadata = Some(metadata);
    }

    /// Append an instruction, checking that it fits the register.
    pub fn push(&mut self, instruction: Instruction)
        -> Result<&mut Self, ConstructionError>
    {
        let dim: usize = 1 << self.n;
        match &instruction {
            Instruction::Initialize(amps) if amps.len() != dim => {
                return Err(ConstructionError::InvalidState(
                    format!("{} amplitudes for {} qubits", amps.len(), self.n)
                ));
            },
            Instruction::Evolution { hamiltonian: p, .. }
            | Instruction::Pauli(p) if p.num_qubits() != self.n => {
                return Err(ConstructionError::QubitMismatch {
                    expected: self.n,
                    got: p.num_qubits(),
                });
            },
            Instruction::Evolution { hamiltonian, .. }
                if !hamiltonian.is_hermitian() =>
            {
                return Err(
                    ConstructionError::NotHermitian(hamiltonian.to_string()));
            },
            Instruction::Unitary { matrix, .. }
                if matrix.nrows() != dim || matrix.ncols() != dim =>
            {
                return Err(ConstructionError::InvalidState(
                    format!(
                        "{}×{} operator on {} qubits",
                        matrix.nrows(), matrix.ncols(), self.n,
                    )
                ));
            },
            Instruction::Measure(k) if *k >= self.n => {
                return Err(ConstructionError::IndexOutOfRange {
                    index: *k,
                    len: self.n,
                });
            },
            _ => { },
        }
        self.instructions.push(instruction);
        Ok(self)
    }

    /// Append a measurement of every qubit.
    pub fn measure_all(&mut self) -> &mut Self {
        (0..self.n).for_each(|k| {
            self.instructions.push(Instruction::Measure(k));
        });
        self
    }

    /// Return the layered depth of the circuit: the length of the longest
    /// chain of instructions that share a qubit.
    pub fn depth(&self) -> usize {
        let mut layers: Vec<usize> = vec![0; self.n];
        for instruction in self.instructions.iter() {
            let support = instruction.qubits(self.n);
            if support.is_empty() { continue; }
            let next
                = support.iter().map(|k| layers[*k]).max().unwrap_or(0) + 1;
            support.iter().for_each(|k| { layers[*k] = next; });
        }
        layers.into_iter().max().unwrap_or(0)
    }

    /// Split the circuit into its unitary prefix and the list of measured
    /// qubits.
    ///
    /// Fails if any measurement is followed by a non-measurement instruction.
    pub fn split_measurements(&self)
        -> Result<(&[Instruction], Vec<usize>), ConstructionError>
    {
        let first
            = self.instructions.iter()
            .position(Instruction::is_measurement)
            .unwrap_or(self.instructions.len());
        let (unitary, tail) = self.instructions.split_at(first);
        let measured: Vec<usize>
            = tail.iter().enumerate()
            .map(|(k, instruction)| match instruction {
                Instruction::Measure(q) => Ok(*q),
                _ => Err(ConstructionError::MidCircuitMeasurement {
                    position: first + k - 1,
                }),
            })
            .collect::<Result<_, _>>()?;
        Ok((unitary, measured))
    }

    /// Simulate the circuit from ∣0...0⟩, returning the final state.
    ///
    /// Fails on the first measurement.
    pub fn simulate(&self) -> Result<Statevector, ConstructionError> {
        let mut state = Statevector::new(self.n)?;
        self.apply_to(&mut state)?;
        Ok(state)
    }

    /// Apply every instruction to `state` in order.
    ///
    /// Fails on the first measurement.
    pub fn apply_to(&self, state: &mut Statevector)
        -> Result<(), ConstructionError>
    {
        if state.num_qubits() != self.n {
            return Err(ConstructionError::QubitMismatch {
                expected: self.n,
                got: state.num_qubits(),
            });
        }
        run(&self.instructions, state)
    }

    /// Simulate the unitary prefix of a sampling circuit, returning the state
    /// just before measurement and the measured qubits in order.
    ///
    /// Fails if the circuit contains a mid-circuit measurement.
    pub fn sampling_state(&self)
        -> Result<(Statevector, Vec<usize>), ConstructionError>
    {
        let (unitary, measured) = self.split_measurements()?;
        let mut state = Statevector::new(self.n)?;
        run(unitary, &mut state)?;
        Ok((state, measured))
    }
}

fn run(instructions: &[Instruction], state: &mut Statevector)
    -> Result<(), ConstructionError>
{
    instructions.iter().enumerate()
        .try_for_each(|(position, instruction)| {
            instruction.apply(position, state)
        })
}
