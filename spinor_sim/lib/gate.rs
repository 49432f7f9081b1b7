//! Single-qubit Pauli operators and the discrete phases that appear in their
//! products.
//!
//! See also: <https://en.wikipedia.org/wiki/Pauli_matrices>

use std::{
    fmt,
    ops::{ Add, AddAssign, Mul },
};
use nalgebra as na;
use num_complex::Complex64 as C64;
use once_cell::sync::Lazy;

/// Global phase factor *e*<sup>*iπk*/4</sup> of a Pauli string, stored as *k*.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Pi0,
    Pi1q,
    Pi1h,
    Pi3q,
    Pi,
    Pi5q,
    Pi3h,
    Pi7q,
}

const PHASES: [Phase; 8] = [
    Phase::Pi0, Phase::Pi1q, Phase::Pi1h, Phase::Pi3q,
    Phase::Pi, Phase::Pi5q, Phase::Pi3h, Phase::Pi7q,
];

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Pi0 => write!(f, "+1"),
            Self::Pi1h => write!(f, "+i"),
            Self::Pi => write!(f, "-1"),
            Self::Pi3h => write!(f, "-i"),
            ph => write!(f, "e^i{}π/4", ph.quarter_turns()),
        }
    }
}

impl Phase {
    /// Number of π/4 steps, in `0..8`.
    pub fn quarter_turns(self) -> i8 { self as i8 }

    /// Wrap an arbitrary number of π/4 steps.
    pub fn from_quarter_turns(k: i8) -> Self {
        PHASES[k.rem_euclid(8) as usize]
    }

    pub fn as_complex(self) -> C64 {
        match self {
            Self::Pi0 => C64::from(1.0),
            Self::Pi1h => C64::i(),
            Self::Pi => C64::from(-1.0),
            Self::Pi3h => -C64::i(),
            ph => C64::cis(f64::from(ph.quarter_turns())
                * std::f64::consts::FRAC_PI_4),
        }
    }

    /// Return `true` if the phase factor is ±1.
    pub fn is_real(self) -> bool { matches!(self, Self::Pi0 | Self::Pi) }
}

impl Add for Phase {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_quarter_turns(self.quarter_turns() + rhs.quarter_turns())
    }
}

impl AddAssign for Phase {
    fn add_assign(&mut self, rhs: Self) { *self = *self + rhs; }
}

// repeated multiplication by the same phase, e.g. i^k for k Y factors
impl Mul<i8> for Phase {
    type Output = Self;

    fn mul(self, k: i8) -> Self::Output {
        Self::from_quarter_turns(
            (i16::from(self.quarter_turns()) * i16::from(k)).rem_euclid(8) as i8)
    }
}

/// A single-qubit Pauli operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pauli {
    /// Identity
    I,
    /// σ<sub>*x*</sub>
    X,
    /// σ<sub>*y*</sub>
    Y,
    /// σ<sub>*z*</sub>
    Z,
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::I => write!(f, "{}", if f.alternate() { "." } else { "I" }),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl Pauli {
    /// Return `true` if `self` and `other` commute.
    pub fn commutes_with(self, other: Self) -> bool {
        match (self, other) {
            (_, Self::I) => true,
            (Self::I, _) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }

    /// Parse a single label character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'I' | '.' => Some(Self::I),
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    /// Return `true` if `self` flips the computational basis state of its
    /// qubit.
    pub fn flips(self) -> bool { matches!(self, Self::X | Self::Y) }

    /// Return `true` if `self` carries a state-dependent sign in the
    /// computational basis.
    pub fn signs(self) -> bool { matches!(self, Self::Y | Self::Z) }

    /// Compute the product `self · rhs`, returning the phase factor and the
    /// resulting Pauli.
    ///
    /// Follows σ<sub>*x*</sub>σ<sub>*y*</sub> = *i*σ<sub>*z*</sub> and cyclic
    /// permutations.
    pub fn mul(self, rhs: Self) -> (Phase, Self) {
        match (self, rhs) {
            (Self::I, p) | (p, Self::I) => (Phase::Pi0, p),
            (a, b) if a == b => (Phase::Pi0, Self::I),
            (Self::X, Self::Y) => (Phase::Pi1h, Self::Z),
            (Self::Y, Self::X) => (Phase::Pi3h, Self::Z),
            (Self::Y, Self::Z) => (Phase::Pi1h, Self::X),
            (Self::Z, Self::Y) => (Phase::Pi3h, Self::X),
            (Self::Z, Self::X) => (Phase::Pi1h, Self::Y),
            (Self::X, Self::Z) => (Phase::Pi3h, Self::Y),
            _ => unreachable!(),
        }
    }

    /// Return a reference to the 2×2 matrix representation of `self`.
    pub fn matrix(self) -> &'static na::DMatrix<C64> {
        match self {
            Self::I => Lazy::force(&PAULI_I),
            Self::X => Lazy::force(&PAULI_X),
            Self::Y => Lazy::force(&PAULI_Y),
            Self::Z => Lazy::force(&PAULI_Z),
        }
    }
}

/// A single-qubit identity matrix.
pub static PAULI_I: Lazy<na::DMatrix<C64>> =
    Lazy::new(|| na::DMatrix::identity(2, 2));

/// A single-qubit Pauli *X* matrix.
pub static PAULI_X: Lazy<na::DMatrix<C64>> =
    Lazy::new(|| {
        let mut x = na::DMatrix::zeros(2, 2);
        x[(0, 1)] = C64::from(1.0);
        x[(1, 0)] = C64::from(1.0);
        x
    });

/// A single-qubit Pauli *Y* matrix.
pub static PAULI_Y: Lazy<na::DMatrix<C64>> =
    Lazy::new(|| {
        let mut y = na::DMatrix::zeros(2, 2);
        y[(0, 1)] = -C64::i();
        y[(1, 0)] =  C64::i();
        y
    });

/// A single-qubit Pauli *Z* matrix.
pub static PAULI_Z: Lazy<na::DMatrix<C64>> =
    Lazy::new(|| {
        let mut z = na::DMatrix::zeros(2, 2);
        z[(0, 0)] = C64::from( 1.0);
        z[(1, 1)] = C64::from(-1.0);
        z
    });

#[cfg(test)]
mod test {
    use super::*;

    const ALL: [Pauli; 4] = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];

    #[test]
    fn phase_arithmetic() {
        assert_eq!(Phase::Pi1h + Phase::Pi1h, Phase::Pi);
        assert_eq!(Phase::Pi3h + Phase::Pi1h, Phase::Pi0);
        assert_eq!(Phase::Pi1q * 3, Phase::Pi3q);
        assert_eq!(Phase::Pi1h * 7, Phase::Pi3h);
        assert_eq!(Phase::Pi3h * -1, Phase::Pi1h);
        assert!(Phase::Pi.is_real() && !Phase::Pi1h.is_real());
        for k in 0..8_i8 {
            let ph = Phase::from_quarter_turns(k);
            assert_eq!(ph.quarter_turns(), k);
            assert!((ph.as_complex() - C64::cis(f64::from(k) * std::f64::consts::FRAC_PI_4)).norm() < 1e-12);
        }
    }

    #[test]
    fn product_table_matches_matrices() {
        for (a, b) in itertools::iproduct!(ALL, ALL) {
            let (ph, c) = a.mul(b);
            let lhs = a.matrix() * b.matrix();
            let rhs = c.matrix() * ph.as_complex();
            assert!(
                lhs.iter().zip(rhs.iter()).all(|(l, r)| (l - r).norm() < 1e-12),
                "{}{} != {} {}", a, b, ph, c,
            );
        }
    }

    #[test]
    fn commutation() {
        for (a, b) in itertools::iproduct!(ALL, ALL) {
            let ab = a.matrix() * b.matrix();
            let ba = b.matrix() * a.matrix();
            let comm = (ab - ba).norm() < 1e-12;
            assert_eq!(a.commutes_with(b), comm);
        }
    }
}
