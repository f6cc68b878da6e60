use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::config::{EpisimConfig, EpisimParameters};
use crate::context::Context;
use crate::error::EpisimError;
use crate::events::read_events;
use crate::global_properties::read_global_property;
use crate::log::{parse_log_level, set_log_file, set_log_level};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;
use crate::reporting::ContextReportingExt;
use crate::simulation::ContextSimulationExt;

/// Default cli arguments for the episim runner
#[derive(Args, Debug, Clone, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path to a JSON file with an `EpisimParameters` entry
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mobility events of the representative day, as CSV
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Write the CSV reports into this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prefix for report file names
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Enable logging at this level: error, warn, info, debug or trace
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Also write log messages to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Maximum number of simulated days, overriding the config
    #[arg(short, long)]
    pub iterations: Option<u32>,
}

fn create_episim_cli() -> Command {
    let cli = Command::new("episim").about("Simulates disease spread over replayed daily mobility");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with the arguments of the command line.
///
/// `setup_fn` runs after configuration and events are loaded and before the first day starts,
/// e.g. to install a different policy or progression model.
///
/// # Errors
/// Returns an error if argument parsing, loading or the simulation itself fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, EpisimError>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), EpisimError>,
{
    let matches = create_episim_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)
        .map_err(|error| EpisimError::ConfigError(error.to_string()))?;
    run_with_base_args(&args, setup_fn)
}

/// Runs a simulation with already parsed arguments.
///
/// # Errors
/// Returns an error if loading or the simulation itself fails
pub fn run_with_base_args<F>(args: &BaseArgs, setup_fn: F) -> Result<Context, EpisimError>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), EpisimError>,
{
    if let Some(level) = &args.log_level {
        set_log_level(parse_log_level(level)?);
    }
    if args.log_file.is_some() {
        set_log_file(args.log_file.clone())?;
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            read_global_property(EpisimParameters, path)?
        }
        None => EpisimConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }

    let mut context = Context::new();
    context.init_random(args.random_seed);
    context.init_episim(config)?;

    if let Some(output_dir) = &args.output_dir {
        context
            .report_options()
            .directory(output_dir.clone())
            .file_prefix(args.prefix.clone())
            .overwrite(args.force_overwrite);
        context.add_episim_reports()?;
    }

    if let Some(path) = &args.events {
        info!("Reading mobility events from: {}", path.display());
        context.load_mobility_events(read_events(path)?)?;
    }

    setup_fn(&mut context, args)?;

    context.start_simulation()?;
    context.execute()?;
    Ok(context)
}
