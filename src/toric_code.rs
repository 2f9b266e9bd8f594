//! Toric Code
//!
//! The lattice error model of a toric code with code distance `L`: 2L² qubits live on the edges of an
//! L×L periodic square lattice. Qubit states are stored as a 2L×L array where unit cell `(i, j)` owns
//! the qubit at row `2i` (even orientation) and the qubit at row `2i+1` (odd orientation), column `j`.
//!
//! The vertex stabilizer of cell `(i, j)` measures qubits `(2i, j)`, `(2i, j-1)`, `(2i-1, j)` and
//! `(2i+1, j)`; the plaquette stabilizer measures `(2i+1, j)`, `(2i+1, j+1)`, `(2i+2, j)` and `(2i, j)`,
//! all indices taken modulo the array shape.
//!
//! The logical check [`ErrorPattern::has_trivial_x_parity`] (and its Z counterpart) counts errors over
//! a whole sublattice instead of along a single non-contractible cycle. This is coarser than the textbook
//! logical-operator test and is kept on purpose so that simulated statistics stay comparable.
//!

use super::pauli::*;
use super::util::*;
use crate::derivative::Derivative;
use crate::rand_xoshiro::rand_core::SeedableRng;
use serde::{Deserialize, Serialize};

/// sum of error rates may exceed 1 by rounding, e.g. when splitting a total rate into thirds
const ERROR_RATE_SUM_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToricCodeConfig {
    /// the lattice size `L`
    pub code_distance: usize,
    /// independent probabilities of an X, Y or Z error on each qubit
    pub errors_rate: [f64; 3],
}

impl ToricCodeConfig {
    pub fn new(code_distance: usize, errors_rate: [f64; 3]) -> Result<Self, ConfigError> {
        let config = Self {
            code_distance,
            errors_rate,
        };
        config.sanity_check()?;
        Ok(config)
    }

    /// depolarizing noise: a total error rate `p` split evenly among X, Y and Z
    pub fn depolarizing(code_distance: usize, p: f64) -> Result<Self, ConfigError> {
        Self::new(code_distance, [p / 3.; 3])
    }

    pub fn sanity_check(&self) -> Result<(), ConfigError> {
        if self.code_distance == 0 {
            return Err(ConfigError::ZeroCodeDistance);
        }
        for (pauli, &value) in ['x', 'y', 'z'].into_iter().zip(self.errors_rate.iter()) {
            // also rejects NaN
            if !(0. ..=1.).contains(&value) {
                return Err(ConfigError::ErrorRateOutOfRange { pauli, value });
            }
        }
        let sum: f64 = self.errors_rate.iter().sum();
        if sum > 1. + ERROR_RATE_SUM_TOLERANCE {
            return Err(ConfigError::ErrorRateSumExceedsOne(sum));
        }
        Ok(())
    }

    /// probability that a qubit is left untouched
    pub fn identity_rate(&self) -> f64 {
        (1. - self.errors_rate.iter().sum::<f64>()).max(0.)
    }
}

/// stabilizer measurement outcomes, one bit per unit cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Syndrome {
    pub size: usize,
    pub bits: Vec<bool>,
}

impl Syndrome {
    fn from_fn(size: usize, mut parity: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(size * size);
        for i in 0..size {
            for j in 0..size {
                bits.push(parity(i, j));
            }
        }
        Self { size, bits }
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        assert!(i < self.size && j < self.size, "cell ({}, {}) out of the {}x{} lattice", i, j, self.size, self.size);
        self.bits[i * self.size + j]
    }

    /// coordinates of all defects in row-major order
    pub fn defects(&self) -> Vec<Coordinate> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(index, _)| (index / self.size, index % self.size))
            .collect()
    }

    pub fn defect_num(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    /// no stabilizer is violated
    pub fn is_trivial(&self) -> bool {
        self.bits.iter().all(|&bit| !bit)
    }
}

/// the Pauli error of every qubit of the lattice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPattern {
    /// the lattice size `L`
    pub size: usize,
    /// 2L×L qubit states in row-major order
    qubits: Vec<Pauli>,
}

impl ErrorPattern {
    /// an error-free lattice; panics if `size == 0`, use [`ErrorPattern::from_qubits`] for unchecked input
    pub fn new_identity(size: usize) -> Self {
        assert!(size > 0, "code distance must be positive");
        Self {
            size,
            qubits: vec![Pauli::I; 2 * size * size],
        }
    }

    pub fn from_qubits(size: usize, qubits: Vec<Pauli>) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroCodeDistance);
        }
        if qubits.len() != 2 * size * size {
            return Err(ConfigError::QubitCountMismatch {
                code_distance: size,
                expected: 2 * size * size,
                found: qubits.len(),
            });
        }
        Ok(Self { size, qubits })
    }

    /// build from the integer encoding `I=0, X=1, Y=2, Z=3`
    pub fn from_encoded(size: usize, encoded: &[u8]) -> Result<Self, ConfigError> {
        let qubits = encoded
            .iter()
            .map(|&value| Pauli::try_from(value))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_qubits(size, qubits)
    }

    pub fn encoded(&self) -> Vec<u8> {
        self.qubits.iter().map(|pauli| pauli.encoding()).collect()
    }

    pub fn qubits(&self) -> &[Pauli] {
        &self.qubits
    }

    /// the number of rows of the qubit array, `2L`
    pub fn row_num(&self) -> usize {
        2 * self.size
    }

    fn index(&self, row: usize, column: usize) -> usize {
        assert!(
            row < self.row_num() && column < self.size,
            "qubit ({row}, {column}) out of the {}x{} array",
            self.row_num(),
            self.size
        );
        row * self.size + column
    }

    pub fn get(&self, row: usize, column: usize) -> Pauli {
        self.qubits[self.index(row, column)]
    }

    pub fn set(&mut self, row: usize, column: usize, pauli: Pauli) {
        let index = self.index(row, column);
        self.qubits[index] = pauli;
    }

    pub fn toggle_x(&mut self, row: usize, column: usize) {
        let index = self.index(row, column);
        self.qubits[index] = self.qubits[index].toggle_x();
    }

    pub fn toggle_z(&mut self, row: usize, column: usize) {
        let index = self.index(row, column);
        self.qubits[index] = self.qubits[index].toggle_z();
    }

    pub fn is_identity(&self) -> bool {
        self.qubits.iter().all(|&pauli| pauli == Pauli::I)
    }

    /// row index moved by `offset` (±1 or ±2) on the 2L rows of the torus
    fn wrap_row(&self, row: usize, offset: isize) -> usize {
        let rows = self.row_num() as isize;
        (row as isize + offset).rem_euclid(rows) as usize
    }

    fn wrap_column(&self, column: usize, offset: isize) -> usize {
        (column as isize + offset).rem_euclid(self.size as isize) as usize
    }

    /// X-type stabilizers on vertices, detecting Z components
    pub fn vertex_syndrome(&self) -> Syndrome {
        Syndrome::from_fn(self.size, |i, j| {
            let incident = [
                (2 * i, j),
                (2 * i, self.wrap_column(j, -1)),
                (self.wrap_row(2 * i, -1), j),
                (2 * i + 1, j),
            ];
            incident.iter().filter(|&&(row, column)| self.get(row, column).has_z_component()).count() % 2 == 1
        })
    }

    /// Z-type stabilizers on plaquettes, detecting X components
    pub fn plaquette_syndrome(&self) -> Syndrome {
        Syndrome::from_fn(self.size, |i, j| {
            let incident = [
                (2 * i + 1, j),
                (2 * i + 1, self.wrap_column(j, 1)),
                (self.wrap_row(2 * i, 2), j),
                (2 * i, j),
            ];
            incident.iter().filter(|&&(row, column)| self.get(row, column).has_x_component()).count() % 2 == 1
        })
    }

    /// the shortest toroidal walk from `u` to `v`, columns first and then rows; at every step the endpoint
    /// with the smaller coordinate moves, upwards unless the gap exceeds `L/2` in which case it wraps downwards.
    /// `step` receives the axis (`false` for columns), the moving cell and whether it moves upwards.
    fn walk(&self, u: Coordinate, v: Coordinate, mut step: impl FnMut(bool, Coordinate, bool)) {
        assert!(u.0 < self.size && u.1 < self.size, "cell {u:?} out of the lattice");
        assert!(v.0 < self.size && v.1 < self.size, "cell {v:?} out of the lattice");
        let (mut u, mut v) = (u, v);
        while u.1 != v.1 {
            if u.1 > v.1 {
                std::mem::swap(&mut u, &mut v);
            }
            let upwards = v.1 - u.1 <= self.size / 2;
            step(false, u, upwards);
            u.1 = self.wrap_column(u.1, if upwards { 1 } else { -1 });
        }
        while u.0 != v.0 {
            if u.0 > v.0 {
                std::mem::swap(&mut u, &mut v);
            }
            let upwards = v.0 - u.0 <= self.size / 2;
            step(true, u, upwards);
            u.0 = (u.0 + if upwards { 1 } else { self.size - 1 }) % self.size;
        }
    }

    /// apply X operators along a chain connecting two plaquette defects, removing both of them
    pub fn apply_x_correction(&mut self, u: Coordinate, v: Coordinate) {
        let mut toggled = vec![];
        self.walk(u, v, |along_rows, (i, j), upwards| {
            toggled.push(match (along_rows, upwards) {
                (false, true) => (2 * i + 1, self.wrap_column(j, 1)),
                (false, false) => (2 * i + 1, j),
                (true, true) => (self.wrap_row(2 * i, 2), j),
                (true, false) => (2 * i, j),
            });
        });
        for (row, column) in toggled {
            self.toggle_x(row, column);
        }
    }

    /// apply Z operators along a chain connecting two vertex defects, removing both of them
    pub fn apply_z_correction(&mut self, u: Coordinate, v: Coordinate) {
        let mut toggled = vec![];
        self.walk(u, v, |along_rows, (i, j), upwards| {
            toggled.push(match (along_rows, upwards) {
                (false, true) => (2 * i, j),
                (false, false) => (2 * i, self.wrap_column(j, -1)),
                (true, true) => (2 * i + 1, j),
                (true, false) => (self.wrap_row(2 * i, -1), j),
            });
        });
        for (row, column) in toggled {
            self.toggle_z(row, column);
        }
    }

    /// the number of qubits satisfying `predicate` on the even-row and the odd-row sublattice
    fn sublattice_counts(&self, predicate: impl Fn(Pauli) -> bool) -> [usize; 2] {
        let mut counts = [0, 0];
        for (row, qubits) in self.qubits.chunks(self.size).enumerate() {
            counts[row % 2] += qubits.iter().filter(|&&pauli| predicate(pauli)).count();
        }
        counts
    }

    /// both sublattices carry an even number of X components
    pub fn has_trivial_x_parity(&self) -> bool {
        self.sublattice_counts(Pauli::has_x_component).iter().all(|count| count % 2 == 0)
    }

    /// both sublattices carry an even number of Z components
    pub fn has_trivial_z_parity(&self) -> bool {
        self.sublattice_counts(Pauli::has_z_component).iter().all(|count| count % 2 == 0)
    }
}

/// random error generator of a toric code, with its own deterministic random number generator
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ToricCode {
    pub config: ToricCodeConfig,
    #[derivative(Debug = "ignore")]
    rng: DeterministicRng,
}

impl ToricCode {
    pub fn new(config: ToricCodeConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, DeterministicRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: ToricCodeConfig, rng: DeterministicRng) -> Result<Self, ConfigError> {
        config.sanity_check()?;
        Ok(Self { config, rng })
    }

    pub fn size(&self) -> usize {
        self.config.code_distance
    }

    /// restart the random number generator, the same seed always yields the same error sequence
    pub fn reseed(&mut self, seed: u64) {
        self.rng = DeterministicRng::seed_from_u64(seed);
    }

    /// sample an independent Pauli error for every qubit
    pub fn generate_errors(&mut self) -> ErrorPattern {
        let size = self.size();
        let [p_x, p_y, _] = self.config.errors_rate;
        let p_i = self.config.identity_rate();
        let thresholds = [(p_i, Pauli::I), (p_i + p_x, Pauli::X), (p_i + p_x + p_y, Pauli::Y)];
        let qubits = (0..2 * size * size)
            .map(|_| {
                let sample = self.rng.next_f64();
                thresholds
                    .iter()
                    .find(|(threshold, _)| sample < *threshold)
                    .map(|&(_, pauli)| pauli)
                    .unwrap_or(Pauli::Z)
            })
            .collect();
        ErrorPattern { size, qubits }
    }
}
