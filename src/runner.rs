use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Command, FromArgMatches as _};

use crate::config::load_config;
use crate::error::ModelError;
use crate::execution_stats::{log_execution_statistics, print_execution_statistics};
use crate::log::{disable_logging, info, set_log_level, LevelFilter};
use crate::simulation::Simulation;

/// Default cli arguments for the model runner
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// Random seed. Overrides the seed in the configuration file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Path of the JSON model configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

fn create_cli() -> Command {
    let cli = Command::new("rabies-model").about("Week-by-week animal population model");
    BaseArgs::augment_args(cli)
}

/// Runs a model configured from the command line.
///
/// `setup_fn` is called with the built simulation before it runs, for example to subscribe
/// observers.
///
/// # Errors
/// Returns an error if argument parsing, loading the configuration or the setup function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Simulation, Box<dyn std::error::Error>>
where
    F: Fn(&mut Simulation, &BaseArgs) -> Result<(), ModelError>,
{
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_base_args(&args, setup_fn)?)
}

/// Loads the configuration named by `args`, builds the simulation and runs it to the end.
///
/// # Errors
/// Returns an error if the log level is unknown, or loading or building the model fails
pub fn run_with_base_args<F>(args: &BaseArgs, setup_fn: F) -> Result<Simulation, ModelError>
where
    F: Fn(&mut Simulation, &BaseArgs) -> Result<(), ModelError>,
{
    let level = LevelFilter::from_str(&args.log_level).map_err(|_| {
        ModelError::illegal("log_level", format!("unknown level `{}`", args.log_level))
    })?;
    if level == LevelFilter::Off {
        disable_logging();
    } else {
        set_log_level(level);
    }

    info!("loading model configuration from {}", args.config.display());
    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.random_seed {
        config.random_seed = seed;
    }

    let mut sim = config.build_simulation()?;
    sim.subscribe_after_removing_dead(|sim, event| {
        if event.week == 1 {
            info!(
                "{}: {} animals at the start of year {}",
                sim.name(),
                sim.population().len(),
                event.year
            );
        }
    });

    setup_fn(&mut sim, args)?;

    let outcome = sim.run_model()?;
    println!("{}: run {outcome}", sim.name());
    let stats = sim.execution_statistics();
    log_execution_statistics(&stats);
    print_execution_statistics(&stats);
    Ok(sim)
}
