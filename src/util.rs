use crate::rand_xoshiro;
use crate::rand_xoshiro::rand_core::RngCore;
use std::time::Instant;

/// position of a unit cell `(i, j)` on the torus, `i` being the row and `j` the column
pub type Coordinate = (usize, usize);

/// edge weight of the defect graph; negated distances are used so that larger is better
pub type Weight = i64;

/// use Xoshiro256StarStar for deterministic random number generator
pub type DeterministicRng = rand_xoshiro::Xoshiro256StarStar;

pub trait F64Rng {
    fn next_f64(&mut self) -> f64;
}

impl F64Rng for DeterministicRng {
    fn next_f64(&mut self) -> f64 {
        f64::from_bits(0x3FF << 52 | self.next_u64() >> 12) - 1.
    }
}

/// errors raised while validating user inputs; they are always reported before any simulation starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("code distance must be positive")]
    ZeroCodeDistance,
    #[error("error rate p_{pauli} = {value} is not within [0, 1]")]
    ErrorRateOutOfRange { pauli: char, value: f64 },
    #[error("error rates sum up to {0} > 1")]
    ErrorRateSumExceedsOne(f64),
    #[error("qubit array of code distance {code_distance} must have {expected} entries, found {found}")]
    QubitCountMismatch {
        code_distance: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid Pauli encoding {0}, must be one of 0 (I), 1 (X), 2 (Y), 3 (Z)")]
    InvalidPauliEncoding(u8),
    #[error("code distance {code_distance} may produce {defect_num} defects, but the matching solver accepts at most {max_vertex_num}")]
    SolverCapacityExceeded {
        code_distance: usize,
        defect_num: usize,
        max_vertex_num: usize,
    },
}

/// per-axis toroidal distance `(dx, dy)` between two cells of a torus with the given size
pub fn toroidal_distance(u: Coordinate, v: Coordinate, size: usize) -> (usize, usize) {
    let axis = |a: usize, b: usize| {
        let direct = if a > b { a - b } else { b - a };
        direct.min(size - direct)
    };
    (axis(u.0, v.0), axis(u.1, v.1))
}

/// the defect graph edge weight, `-(100 dx + 101 dy)`; the extra unit on `dy` breaks ties towards
/// pairings with a smaller column distance
pub fn defect_weight(u: Coordinate, v: Coordinate, size: usize) -> Weight {
    let (dx, dy) = toroidal_distance(u, v, size);
    -((dx as Weight) * 100 + (dy as Weight) * 101)
}

/// accumulates the wall-clock time of the decoding step, excluding error generation and verification
#[derive(Debug, Clone, Default)]
pub struct DecodeTimer {
    /// summation of all decoding time in seconds
    pub sum_decode_time: f64,
    /// the number of timed decoding procedures
    pub count: usize,
    begin_time: Option<Instant>,
}

impl DecodeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// record the beginning of a decoding procedure
    pub fn begin(&mut self) {
        assert!(self.begin_time.is_none(), "make sure to call `begin` and `end` in pairs");
        self.begin_time = Some(Instant::now());
    }

    /// record the ending of a decoding procedure, returning its duration in seconds
    pub fn end(&mut self) -> f64 {
        let begin_time = self.begin_time.take().expect("call `begin` before `end`");
        let round_time = begin_time.elapsed().as_secs_f64();
        self.sum_decode_time += round_time;
        self.count += 1;
        round_time
    }

    /// print out a brief one-line statistics
    pub fn brief(&self) -> String {
        let average = if self.count == 0 { 0. } else { self.sum_decode_time / (self.count as f64) };
        format!("decoded: {}, average: {average:.3e}s", self.count)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::rand_xoshiro::rand_core::SeedableRng;

    #[test]
    fn util_toroidal_distance_properties() {
        // cargo test util_toroidal_distance_properties -- --nocapture
        for size in 1..=8 {
            for a in 0..size * size {
                let u = (a / size, a % size);
                assert_eq!(toroidal_distance(u, u, size), (0, 0));
                for b in 0..size * size {
                    let v = (b / size, b % size);
                    let (dx, dy) = toroidal_distance(u, v, size);
                    assert_eq!((dx, dy), toroidal_distance(v, u, size), "distance must be symmetric");
                    assert!(dx <= size / 2 && dy <= size / 2, "{u:?} {v:?} on size {size}: ({dx}, {dy})");
                }
            }
        }
    }

    #[test]
    fn util_toroidal_distance_wraps() {
        // cargo test util_toroidal_distance_wraps -- --nocapture
        assert_eq!(toroidal_distance((0, 0), (4, 4), 5), (1, 1));
        assert_eq!(toroidal_distance((0, 1), (3, 1), 5), (2, 0));
        assert_eq!(toroidal_distance((1, 0), (1, 3), 6), (0, 3));
    }

    #[test]
    fn util_defect_weight_prefers_short_columns() {
        // cargo test util_defect_weight_prefers_short_columns -- --nocapture
        assert_eq!(defect_weight((0, 0), (0, 0), 5), 0);
        assert_eq!(defect_weight((0, 0), (1, 0), 5), -100);
        assert_eq!(defect_weight((0, 0), (0, 1), 5), -101);
        assert_eq!(defect_weight((0, 0), (2, 4), 5), -301);
        // same Manhattan length, the one with larger row distance wins
        assert!(defect_weight((0, 0), (2, 1), 7) > defect_weight((0, 0), (1, 2), 7));
    }

    #[test]
    fn util_next_f64_in_unit_interval() {
        // cargo test util_next_f64_in_unit_interval -- --nocapture
        let mut rng = DeterministicRng::seed_from_u64(123);
        for _ in 0..10000 {
            let value = rng.next_f64();
            assert!((0. ..1.).contains(&value));
        }
    }

    #[test]
    fn util_decode_timer() {
        // cargo test util_decode_timer -- --nocapture
        let mut timer = DecodeTimer::new();
        assert_eq!(timer.brief(), "decoded: 0, average: 0.000e0s");
        timer.begin();
        let round_time = timer.end();
        assert!(round_time >= 0.);
        assert_eq!(timer.count, 1);
        assert_eq!(timer.sum_decode_time, round_time);
    }
}
