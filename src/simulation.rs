//! Simulation
//!
//! Monte Carlo estimation of the logical error rate of the toric code under the MWPM decoder.
//! Every trial draws a fresh error pattern from its own deterministic random number generator, seeded by
//! `seed + trial_index`, so a run gives identical statistics whether trials are executed in order or in parallel.
//!

use super::defect_matcher::*;
use super::toric_code::*;
use super::util::*;
use crate::rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// the number of trials
    pub n_iter: usize,
    /// the seed of the first trial; trial `t` uses `seed + t`
    #[serde(default)]
    pub seed: u64,
    /// run trials on the rayon thread pool
    #[serde(default)]
    pub parallel: bool,
}

impl SimulationConfig {
    pub fn new(n_iter: usize, seed: u64) -> Self {
        Self {
            n_iter,
            seed,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialOutcome {
    /// no error happened, nothing to decode
    Trivial,
    /// both syndromes are cleared and the residual error has trivial sublattice parity
    Success,
    /// the correction left a syndrome or a non-trivial parity
    LogicalError,
}

/// what happened in a single trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    pub outcome: TrialOutcome,
    /// time spent on matching both syndromes, in seconds
    pub decode_time: f64,
    pub vertex_defect_num: usize,
    pub plaquette_defect_num: usize,
    /// defects left after applying the correction; non-zero values indicate a decoder bug
    pub residual_vertex_defect_num: usize,
    pub residual_plaquette_defect_num: usize,
    /// whether both sublattice parity checks hold after correction
    pub trivial_parity: bool,
}

impl TrialRecord {
    fn trivial() -> Self {
        Self {
            outcome: TrialOutcome::Trivial,
            decode_time: 0.,
            vertex_defect_num: 0,
            plaquette_defect_num: 0,
            residual_vertex_defect_num: 0,
            residual_plaquette_defect_num: 0,
            trivial_parity: true,
        }
    }
}

/// aggregated statistics; [`SimulationStats::merge`] is associative and commutative
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub trials: usize,
    /// trials without any error
    pub trivial_trials: usize,
    pub successes: usize,
    /// summation of decode time over all non-trivial trials, in seconds
    pub total_decode_time: f64,
    /// failed trials that left a non-zero syndrome
    pub residual_syndrome_failures: usize,
    /// failed trials with cleared syndromes but non-trivial sublattice parity
    pub parity_failures: usize,
    pub total_defect_num: usize,
}

impl SimulationStats {
    pub fn add(&mut self, record: &TrialRecord) {
        self.trials += 1;
        match record.outcome {
            TrialOutcome::Trivial => self.trivial_trials += 1,
            TrialOutcome::Success => self.successes += 1,
            TrialOutcome::LogicalError => {
                if record.residual_vertex_defect_num + record.residual_plaquette_defect_num > 0 {
                    self.residual_syndrome_failures += 1;
                } else {
                    self.parity_failures += 1;
                }
            }
        }
        self.total_decode_time += record.decode_time;
        self.total_defect_num += record.vertex_defect_num + record.plaquette_defect_num;
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.trials += other.trials;
        self.trivial_trials += other.trivial_trials;
        self.successes += other.successes;
        self.total_decode_time += other.total_decode_time;
        self.residual_syndrome_failures += other.residual_syndrome_failures;
        self.parity_failures += other.parity_failures;
        self.total_defect_num += other.total_defect_num;
        self
    }

    /// trials that actually went through the decoder
    pub fn decoded_trials(&self) -> usize {
        self.trials - self.trivial_trials
    }

    pub fn logical_errors(&self) -> usize {
        self.decoded_trials() - self.successes
    }

    /// the fraction of decoded trials ending in a logical error, `0` if no trial was decoded
    pub fn logical_error_rate(&self) -> f64 {
        match self.decoded_trials() {
            0 => 0.,
            decoded => self.logical_errors() as f64 / decoded as f64,
        }
    }

    /// the average decode time of decoded trials in seconds, `0` if no trial was decoded
    pub fn average_decode_time(&self) -> f64 {
        match self.decoded_trials() {
            0 => 0.,
            decoded => self.total_decode_time / decoded as f64,
        }
    }

    pub fn result(&self) -> EvaluationResult {
        EvaluationResult {
            logical_error_rate: self.logical_error_rate(),
            average_decode_time: self.average_decode_time(),
        }
    }
}

/// the output of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub logical_error_rate: f64,
    /// in seconds
    pub average_decode_time: f64,
}

/// decodes randomly generated errors of a toric code with a given matching solver
#[derive(Debug, Clone)]
pub struct Simulator<M: MatchingSolver> {
    /// error generator holding the validated configuration, cloned and reseeded for every trial
    code: ToricCode,
    pub solver: M,
}

impl<M: MatchingSolver> Simulator<M> {
    /// fails if the code is invalid, or if one syndrome may hold more defects than `solver` accepts
    pub fn new(code_config: ToricCodeConfig, solver: M) -> Result<Self, ConfigError> {
        let code = ToricCode::new(code_config, 0)?;
        let size = code.size();
        // every cell may hold a defect, and their number is always even
        let defect_num = size * size / 2 * 2;
        if let Some(max_vertex_num) = solver.max_vertex_num() {
            if defect_num > max_vertex_num {
                return Err(ConfigError::SolverCapacityExceeded {
                    code_distance: size,
                    defect_num,
                    max_vertex_num,
                });
            }
        }
        Ok(Self { code, solver })
    }

    pub fn code_config(&self) -> &ToricCodeConfig {
        &self.code.config
    }

    pub fn size(&self) -> usize {
        self.code.size()
    }

    /// the generator used by trial `trial_index`
    pub fn trial_code(&self, seed: u64, trial_index: usize) -> ToricCode {
        let mut code = self.code.clone();
        code.reseed(seed.wrapping_add(trial_index as u64));
        code
    }

    /// compute the matchings of both syndromes and apply the corresponding corrections in place,
    /// returning the time spent on matching
    pub fn decode(&self, errors: &mut ErrorPattern) -> f64 {
        let size = self.size();
        let vertex_defects = errors.vertex_syndrome().defects();
        let plaquette_defects = errors.plaquette_syndrome().defects();
        let mut timer = DecodeTimer::new();
        timer.begin();
        let vertex_matching = match_defects(&self.solver, &vertex_defects, size);
        let plaquette_matching = match_defects(&self.solver, &plaquette_defects, size);
        let decode_time = timer.end();
        for &(u, v) in plaquette_matching.iter() {
            errors.apply_x_correction(u, v);
        }
        for &(u, v) in vertex_matching.iter() {
            errors.apply_z_correction(u, v);
        }
        decode_time
    }

    /// generate, decode and verify a single error pattern
    pub fn run_trial(&self, code: &mut ToricCode) -> TrialRecord {
        let mut errors = code.generate_errors();
        if errors.is_identity() {
            return TrialRecord::trivial();
        }
        let vertex_defect_num = errors.vertex_syndrome().defect_num();
        let plaquette_defect_num = errors.plaquette_syndrome().defect_num();
        let decode_time = self.decode(&mut errors);
        let residual_vertex_defect_num = errors.vertex_syndrome().defect_num();
        let residual_plaquette_defect_num = errors.plaquette_syndrome().defect_num();
        let trivial_parity = errors.has_trivial_x_parity() && errors.has_trivial_z_parity();
        if residual_vertex_defect_num + residual_plaquette_defect_num > 0 {
            log::warn!(
                "correction left {residual_vertex_defect_num} vertex and {residual_plaquette_defect_num} plaquette defects"
            );
        }
        let outcome = if residual_vertex_defect_num == 0 && residual_plaquette_defect_num == 0 && trivial_parity {
            TrialOutcome::Success
        } else {
            TrialOutcome::LogicalError
        };
        log::debug!(
            "defects: {vertex_defect_num} vertex, {plaquette_defect_num} plaquette, decoded in {decode_time:.3e}s: {outcome:?}"
        );
        TrialRecord {
            outcome,
            decode_time,
            vertex_defect_num,
            plaquette_defect_num,
            residual_vertex_defect_num,
            residual_plaquette_defect_num,
            trivial_parity,
        }
    }

    /// run trials in order regardless of `config.parallel`, calling `visitor` after each one (e.g. to report progress)
    pub fn run_visit(&self, config: &SimulationConfig, mut visitor: impl FnMut(usize, &TrialRecord)) -> SimulationStats {
        self.log_start(config, false);
        let mut stats = SimulationStats::default();
        for trial_index in 0..config.n_iter {
            let mut code = self.trial_code(config.seed, trial_index);
            let record = self.run_trial(&mut code);
            stats.add(&record);
            visitor(trial_index, &record);
        }
        self.log_summary(&stats);
        stats
    }

    /// run trials on the rayon thread pool; the result does not depend on the scheduling
    pub fn run_parallel(&self, config: &SimulationConfig) -> SimulationStats {
        self.log_start(config, true);
        let stats = (0..config.n_iter)
            .into_par_iter()
            .map(|trial_index| {
                let mut code = self.trial_code(config.seed, trial_index);
                let mut stats = SimulationStats::default();
                stats.add(&self.run_trial(&mut code));
                stats
            })
            .reduce(SimulationStats::default, SimulationStats::merge);
        self.log_summary(&stats);
        stats
    }

    pub fn run(&self, config: &SimulationConfig) -> SimulationStats {
        if config.parallel {
            self.run_parallel(config)
        } else {
            self.run_visit(config, |_, _| {})
        }
    }

    fn log_start(&self, config: &SimulationConfig, parallel: bool) {
        log::info!(
            "simulating d = {} with errors rate {:?}: {} trials, seed {}{}",
            self.size(),
            self.code_config().errors_rate,
            config.n_iter,
            config.seed,
            if parallel { ", parallel" } else { "" }
        );
    }

    fn log_summary(&self, stats: &SimulationStats) {
        log::info!(
            "logical errors: {}/{}, logical error rate: {}, average decode time: {:.3e}s",
            stats.logical_errors(),
            stats.decoded_trials(),
            stats.logical_error_rate(),
            stats.average_decode_time()
        );
    }

    pub fn evaluate(&self, config: &SimulationConfig) -> EvaluationResult {
        self.run(config).result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;

    fn fusion_simulator(code_distance: usize, errors_rate: [f64; 3]) -> Simulator<FusionMatcher> {
        Simulator::new(ToricCodeConfig::new(code_distance, errors_rate).unwrap(), FusionMatcher::new()).unwrap()
    }

    #[test]
    fn simulation_single_cell_without_noise() {
        // cargo test simulation_single_cell_without_noise -- --nocapture
        let simulator = fusion_simulator(1, [0., 0., 0.]);
        for n_iter in [1, 10, 100] {
            let stats = simulator.run(&SimulationConfig::new(n_iter, 0));
            assert_eq!(stats.trials, n_iter);
            assert_eq!(stats.trivial_trials, n_iter);
            let result = stats.result();
            assert_eq!(result.logical_error_rate, 0.);
            assert_eq!(result.average_decode_time, 0.);
        }
    }

    #[test]
    fn simulation_pure_x_noise_clears_plaquettes() {
        // cargo test simulation_pure_x_noise_clears_plaquettes -- --nocapture
        let simulator = fusion_simulator(5, [0.05, 0., 0.]);
        let config = SimulationConfig::new(1000, 1);
        let stats = simulator.run_visit(&config, |trial_index, record| {
            assert_eq!(record.residual_plaquette_defect_num, 0, "trial {trial_index}");
            assert_eq!(record.vertex_defect_num, 0, "X errors never trigger vertex stabilizers");
        });
        println!("{stats:?}");
        assert_eq!(stats.trials, 1000);
        assert_eq!(stats.residual_syndrome_failures, 0);
    }

    #[test]
    fn simulation_correction_always_clears_syndrome() {
        // cargo test simulation_correction_always_clears_syndrome -- --nocapture
        for (code_distance, p) in [(2, 0.2), (3, 0.1), (4, 0.15), (6, 0.1), (7, 0.05)] {
            let simulator = Simulator::new(ToricCodeConfig::depolarizing(code_distance, p).unwrap(), FusionMatcher::new()).unwrap();
            let stats = simulator.run_visit(&SimulationConfig::new(200, 3), |trial_index, record| {
                assert_eq!(record.residual_vertex_defect_num, 0, "d = {code_distance} trial {trial_index}");
                assert_eq!(record.residual_plaquette_defect_num, 0, "d = {code_distance} trial {trial_index}");
                assert_eq!(record.vertex_defect_num % 2, 0);
                assert_eq!(record.plaquette_defect_num % 2, 0);
            });
            assert_eq!(stats.logical_errors(), stats.parity_failures);
            let rate = stats.logical_error_rate();
            assert!((0. ..=1.).contains(&rate));
        }
    }

    #[test]
    fn simulation_parallel_matches_sequential() {
        // cargo test simulation_parallel_matches_sequential -- --nocapture
        let simulator = fusion_simulator(5, [0.03, 0.02, 0.04]);
        let mut config = SimulationConfig::new(300, 99);
        let sequential = simulator.run(&config);
        config.parallel = true;
        let parallel = simulator.run(&config);
        assert_eq!(sequential.trials, parallel.trials);
        assert_eq!(sequential.trivial_trials, parallel.trivial_trials);
        assert_eq!(sequential.successes, parallel.successes);
        assert_eq!(sequential.parity_failures, parallel.parity_failures);
        assert_eq!(sequential.total_defect_num, parallel.total_defect_num);
    }

    #[test]
    fn simulation_solvers_agree_on_outcome_counts() {
        // cargo test simulation_solvers_agree_on_outcome_counts -- --nocapture
        // a 4x4 lattice holds at most 16 defects per syndrome, within the exhaustive solver's limit
        let code_config = ToricCodeConfig::new(4, [0.05, 0., 0.05]).unwrap();
        let config = SimulationConfig::new(200, 5);
        let fusion = Simulator::new(code_config.clone(), MatcherType::Fusion.build()).unwrap().run(&config);
        let exhaustive = Simulator::new(code_config, MatcherType::Exhaustive.build()).unwrap().run(&config);
        assert_eq!(fusion.trivial_trials, exhaustive.trivial_trials);
        assert_eq!(fusion.total_defect_num, exhaustive.total_defect_num);
        assert_eq!(fusion.residual_syndrome_failures, 0);
        assert_eq!(exhaustive.residual_syndrome_failures, 0);
    }

    #[test]
    fn simulation_decode_clears_single_error() {
        // cargo test simulation_decode_clears_single_error -- --nocapture
        let simulator = fusion_simulator(3, [0., 0., 0.]);
        let mut errors = ErrorPattern::new_identity(3);
        errors.set(0, 0, Pauli::Y);
        let decode_time = simulator.decode(&mut errors);
        assert!(decode_time >= 0.);
        assert!(errors.vertex_syndrome().is_trivial());
        assert!(errors.plaquette_syndrome().is_trivial());
    }

    #[test]
    fn simulation_rejects_solver_too_small_for_code() {
        // cargo test simulation_rejects_solver_too_small_for_code -- --nocapture
        let code_config = ToricCodeConfig::depolarizing(9, 0.3).unwrap();
        let result = Simulator::new(code_config.clone(), MatcherType::Exhaustive.build());
        assert_eq!(
            result.err(),
            Some(ConfigError::SolverCapacityExceeded {
                code_distance: 9,
                defect_num: 80,
                max_vertex_num: ExhaustiveMatcher::MAX_VERTEX_NUM,
            })
        );
        assert!(Simulator::new(code_config, MatcherType::Fusion.build()).is_ok());
        // d = 3 has an odd number of cells, so at most 8 defects
        let code_config = ToricCodeConfig::depolarizing(3, 0.3).unwrap();
        assert!(Simulator::new(code_config.clone(), ExhaustiveMatcher { max_vertex_num: 8 }).is_ok());
        assert!(Simulator::new(code_config, ExhaustiveMatcher { max_vertex_num: 7 }).is_err());
        // the largest accepted code never panics even under heavy noise
        let simulator = Simulator::new(ToricCodeConfig::depolarizing(4, 0.75).unwrap(), MatcherType::Exhaustive.build()).unwrap();
        let stats = simulator.run(&SimulationConfig::new(50, 0));
        assert_eq!(stats.trials, 50);
        assert_eq!(stats.residual_syndrome_failures, 0);
    }

    #[test]
    fn simulation_low_noise_rarely_fails() {
        // cargo test simulation_low_noise_rarely_fails -- --nocapture
        let simulator = fusion_simulator(5, [0.01, 0.01, 0.01]);
        let result = simulator.evaluate(&SimulationConfig::new(500, 11));
        println!("{result:?}");
        assert!(result.logical_error_rate < 0.2);
        assert!(result.average_decode_time >= 0.);
    }

    #[test]
    fn simulation_stats_merge() {
        // cargo test simulation_stats_merge -- --nocapture
        let mut a = SimulationStats::default();
        a.add(&TrialRecord::trivial());
        let mut b = SimulationStats::default();
        b.add(&TrialRecord {
            outcome: TrialOutcome::LogicalError,
            decode_time: 0.5,
            vertex_defect_num: 2,
            plaquette_defect_num: 0,
            residual_vertex_defect_num: 0,
            residual_plaquette_defect_num: 0,
            trivial_parity: false,
        });
        b.add(&TrialRecord {
            outcome: TrialOutcome::Success,
            decode_time: 1.5,
            vertex_defect_num: 2,
            plaquette_defect_num: 2,
            residual_vertex_defect_num: 0,
            residual_plaquette_defect_num: 0,
            trivial_parity: true,
        });
        let merged = a.clone().merge(b.clone());
        assert_eq!(merged, b.merge(a));
        assert_eq!(merged.trials, 3);
        assert_eq!(merged.decoded_trials(), 2);
        assert_eq!(merged.parity_failures, 1);
        assert_eq!(merged.logical_error_rate(), 0.5);
        assert_eq!(merged.average_decode_time(), 1.);
        assert_eq!(merged.total_defect_num, 6);
    }

    #[test]
    fn simulation_config_serde() {
        // cargo test simulation_config_serde -- --nocapture
        let config: SimulationConfig = serde_json::from_str(r#"{"n_iter": 10}"#).unwrap();
        assert_eq!(config, SimulationConfig::new(10, 0));
        assert!(serde_json::from_str::<SimulationConfig>(r#"{"n_iter": 10, "threads": 2}"#).is_err());
    }
}
