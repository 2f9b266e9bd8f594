extern crate clap;
extern crate pbr;

use clap::{Parser, Subcommand};
use pbr::ProgressBar;
use rand::Rng;
use serde_json::json;
use toric_mwpm::defect_matcher::*;
use toric_mwpm::simulation::*;
use toric_mwpm::toric_code::*;
use toric_mwpm::util::*;

#[derive(Parser, Clone)]
#[clap(author = clap::crate_authors!(", "))]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Toric code simulator with a minimum-weight perfect matching decoder")]
#[clap(color = clap::ColorChoice::Auto)]
#[clap(propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// estimate the logical error rate and print a JSON report
    Simulate {
        /// code distance, i.e. the lattice size `L`
        #[clap(value_parser, required_unless_present = "config")]
        code_distance: Option<usize>,
        /// probability of an X error on each qubit
        #[clap(long, default_value_t = 0.)]
        p_x: f64,
        /// probability of a Y error on each qubit
        #[clap(long, default_value_t = 0.)]
        p_y: f64,
        /// probability of a Z error on each qubit
        #[clap(long, default_value_t = 0.)]
        p_z: f64,
        /// depolarizing noise of total rate p, overrides `--p-x`, `--p-y` and `--p-z`
        #[clap(long)]
        depolarizing: Option<f64>,
        /// the number of trials
        #[clap(short = 'n', long, default_value_t = 1000)]
        n_iter: usize,
        /// the seed of the first trial, random if not provided
        #[clap(long)]
        seed: Option<u64>,
        /// run trials in parallel
        #[clap(long, action)]
        parallel: bool,
        /// matching solver
        #[clap(long, value_enum, default_value_t = MatcherType::Fusion)]
        matcher: MatcherType,
        /// the code configuration as JSON, e.g. {"code_distance":5,"errors_rate":[0.01,0.01,0.01]};
        /// overrides the code distance and all error rates
        #[clap(long)]
        config: Option<String>,
        /// hide the progress bar
        #[clap(long, action)]
        disable_progress_bar: bool,
    },
    /// built-in tests
    Test {
        #[clap(subcommand)]
        command: TestCommands,
    },
}

#[derive(Subcommand, Clone)]
enum TestCommands {
    /// compare the total weight of fusion blossom matchings against the exhaustive optimum
    Matcher {
        /// code distance
        #[clap(value_parser)]
        code_distance: usize,
        /// depolarizing error rate
        #[clap(value_parser)]
        p: f64,
        /// the number of random error patterns
        #[clap(short = 'n', long, default_value_t = 1000)]
        rounds: usize,
        /// the seed of the first round
        #[clap(long, default_value_t = 0)]
        seed: u64,
        /// hide the progress bar
        #[clap(long, action)]
        disable_progress_bar: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot parse code configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl Cli {
    fn run(self) -> Result<(), CliError> {
        match self.command {
            Commands::Simulate {
                code_distance,
                p_x,
                p_y,
                p_z,
                depolarizing,
                n_iter,
                seed,
                parallel,
                matcher,
                config,
                disable_progress_bar,
            } => {
                let code_config = match (config, depolarizing) {
                    (Some(config), _) => {
                        let code_config: ToricCodeConfig = serde_json::from_str(&config)?;
                        code_config.sanity_check()?;
                        code_config
                    }
                    (None, Some(p)) => ToricCodeConfig::depolarizing(code_distance.unwrap_or_default(), p)?,
                    (None, None) => ToricCodeConfig::new(code_distance.unwrap_or_default(), [p_x, p_y, p_z])?,
                };
                let simulation_config = SimulationConfig {
                    n_iter,
                    seed: seed.unwrap_or_else(|| rand::thread_rng().gen()),
                    parallel,
                };
                let simulator = Simulator::new(code_config.clone(), matcher.build())?;
                let stats = if parallel || disable_progress_bar {
                    simulator.run(&simulation_config)
                } else {
                    let mut pb = ProgressBar::on(std::io::stderr(), n_iter as u64);
                    pb.message(format!("d = {} ", code_config.code_distance).as_str());
                    let stats = simulator.run_visit(&simulation_config, |trial_index, _| {
                        pb.set(trial_index as u64 + 1);
                    });
                    pb.finish();
                    eprintln!();
                    stats
                };
                let report = json!({
                    "code_config": code_config,
                    "simulation_config": simulation_config,
                    "matcher": matcher,
                    "stats": stats,
                    "result": stats.result(),
                });
                println!("{report}");
            }
            Commands::Test { command } => match command {
                TestCommands::Matcher {
                    code_distance,
                    p,
                    rounds,
                    seed,
                    disable_progress_bar,
                } => {
                    let mut code = ToricCode::new(ToricCodeConfig::depolarizing(code_distance, p)?, seed)?;
                    let fusion = FusionMatcher::new();
                    let exhaustive = ExhaustiveMatcher::new();
                    let mut timer = DecodeTimer::new();
                    let mut skipped = 0;
                    let mut pb = (!disable_progress_bar).then(|| ProgressBar::on(std::io::stderr(), rounds as u64));
                    for round in 0..rounds {
                        if let Some(pb) = pb.as_mut() {
                            pb.set(round as u64);
                        }
                        let errors = code.generate_errors();
                        for syndrome in [errors.vertex_syndrome(), errors.plaquette_syndrome()] {
                            let defects = syndrome.defects();
                            if defects.len() > ExhaustiveMatcher::MAX_VERTEX_NUM {
                                skipped += 1;
                                continue;
                            }
                            let graph = DefectGraph::new(&defects, code_distance);
                            timer.begin();
                            let fusion_matching = fusion.compute_max_weight_perfect_matching(&graph);
                            timer.end();
                            graph.assert_perfect_matching(&fusion_matching);
                            let expected = exhaustive.compute_max_weight_perfect_matching(&graph);
                            assert_eq!(
                                graph.matching_weight(&fusion_matching),
                                graph.matching_weight(&expected),
                                "round {round}: fusion blossom is not optimal on defects {defects:?}"
                            );
                        }
                    }
                    if let Some(pb) = pb.as_mut() {
                        pb.finish();
                        eprintln!();
                    }
                    println!("{}, skipped {skipped} syndromes too large for exhaustive matching", timer.brief());
                }
            },
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();
    if let Err(error) = Cli::parse().run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
