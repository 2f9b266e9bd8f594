//! Single-qubit Pauli Errors
//!
//! Phases are irrelevant for error tracking, so a qubit state is one of the four Pauli operators.
//! The integer encoding `I=0, X=1, Y=2, Z=3` is shared with serialized qubit arrays.
//!

use super::util::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Pauli {
    #[default]
    I = 0,
    X = 1,
    Y = 2,
    Z = 3,
}

impl Pauli {
    /// the product of two Pauli operators, up to a global phase
    pub fn compose(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => Pauli::I,
            (Pauli::I, b) => b,
            (a, Pauli::I) => a,
            (a, b) => Pauli::from_encoding(6 - a.encoding() - b.encoding()),
        }
    }

    /// apply an X operator: `I <-> X`, `Y <-> Z`
    pub fn toggle_x(self) -> Self {
        Pauli::from_encoding(self.encoding() ^ 1)
    }

    /// apply a Z operator: `I <-> Z`, `X <-> Y`
    pub fn toggle_z(self) -> Self {
        Pauli::from_encoding(3 - self.encoding())
    }

    /// X or Y, detected by plaquette (Z-type) stabilizers
    pub fn has_x_component(self) -> bool {
        matches!(self, Pauli::X | Pauli::Y)
    }

    /// Y or Z, detected by vertex (X-type) stabilizers
    pub fn has_z_component(self) -> bool {
        matches!(self, Pauli::Y | Pauli::Z)
    }

    pub fn encoding(self) -> u8 {
        self as u8
    }

    /// only called with values known to be within `0..4`
    fn from_encoding(value: u8) -> Self {
        match value {
            0 => Pauli::I,
            1 => Pauli::X,
            2 => Pauli::Y,
            3 => Pauli::Z,
            _ => unreachable!("Pauli encoding out of range: {value}"),
        }
    }
}

impl TryFrom<u8> for Pauli {
    type Error = ConfigError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < 4 {
            Ok(Pauli::from_encoding(value))
        } else {
            Err(ConfigError::InvalidPauliEncoding(value))
        }
    }
}

impl From<Pauli> for u8 {
    fn from(pauli: Pauli) -> Self {
        pauli.encoding()
    }
}

impl std::fmt::Display for Pauli {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Pauli::I => "I",
            Pauli::X => "X",
            Pauli::Y => "Y",
            Pauli::Z => "Z",
        };
        write!(f, "{name}")
    }
}
