extern crate rand_xoshiro;
extern crate serde;
extern crate serde_json;
extern crate derivative;
extern crate rayon;
extern crate fusion_blossom;

pub mod util;
pub mod pauli;
pub mod toric_code;
pub mod defect_matcher;
pub mod simulation;

use util::*;
use toric_code::*;
use defect_matcher::*;
use simulation::*;


/// estimate the logical error rate of a toric code using fusion blossom as the matching solver
/// (to run trials in parallel or with another solver, construct a [`simulation::Simulator`] instead)
pub fn evaluate(n_iter: usize, config: ToricCodeConfig, seed: u64) -> Result<EvaluationResult, ConfigError> {
    let simulator = Simulator::new(config, FusionMatcher::new())?;
    Ok(simulator.evaluate(&SimulationConfig::new(n_iter, seed)))
}
