//! Independent runs of many scenarios, e.g. a parameter sweep.
//!
//! Every scenario gets its own `Context` on a worker thread; the only thing the runs share is
//! the read-only event script. Results come back in scenario order.
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use log::{debug, info};

use crate::config::EpisimConfig;
use crate::context::Context;
use crate::error::EpisimError;
use crate::events::MobilityEvent;
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;
use crate::reporting::{ContextReportingExt, InfectionReport};
use crate::simulation::ContextSimulationExt;

#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: String,
    pub random_seed: u64,
    pub config: EpisimConfig,
    /// Reports are written to `<output_dir>/<name>_*.csv` when set.
    pub output_dir: Option<PathBuf>,
}

impl Scenario {
    #[must_use]
    pub fn new(name: &str, random_seed: u64, config: EpisimConfig) -> Self {
        Scenario {
            name: name.to_string(),
            random_seed,
            config,
            output_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub name: String,
    /// Number of days that were started, day 0 included.
    pub days: usize,
    pub infections: usize,
    pub final_report: Option<InfectionReport>,
}

/// Runs one scenario to completion on the current thread.
///
/// # Errors
///
/// Whatever the run fails with.
pub fn run_scenario(
    scenario: &Scenario,
    events: &[MobilityEvent],
) -> Result<RunSummary, EpisimError> {
    let mut context = Context::new();
    context.init_random(scenario.random_seed);
    context.init_episim(scenario.config.clone())?;
    if let Some(output_dir) = &scenario.output_dir {
        context
            .report_options()
            .directory(output_dir.clone())
            .file_prefix(format!("{}_", scenario.name))
            .overwrite(true);
        context.add_episim_reports()?;
    }
    context.load_mobility_events(events.to_vec())?;
    context.start_simulation()?;
    context.execute()?;

    Ok(RunSummary {
        name: scenario.name.clone(),
        days: context.get_daily_reports().len(),
        infections: context.get_infection_events().len(),
        final_report: context.get_infection_report().cloned(),
    })
}

/// Runs `scenarios` on up to `threads` worker threads.
#[must_use]
pub fn run_batch(
    scenarios: &[Scenario],
    events: &[MobilityEvent],
    threads: usize,
) -> Vec<Result<RunSummary, EpisimError>> {
    let workers = threads.clamp(1, scenarios.len().max(1));
    info!("running {} scenarios on {workers} threads", scenarios.len());

    let next = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel();
    thread::scope(|scope| {
        for worker in 0..workers {
            let sender = sender.clone();
            let next = &next;
            scope.spawn(move || loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(scenario) = scenarios.get(index) else {
                    break;
                };
                debug!("worker {worker} runs scenario {}", scenario.name);
                // The receiver outlives the scope, so sending cannot fail.
                let _ = sender.send((index, run_scenario(scenario, events)));
            });
        }
    });
    drop(sender);

    let mut results: Vec<Option<Result<RunSummary, EpisimError>>> =
        (0..scenarios.len()).map(|_| None).collect();
    for (index, result) in receiver {
        results[index] = Some(result);
    }
    results
        .into_iter()
        .map(|result| {
            result.unwrap_or_else(|| Err(EpisimError::from("scenario produced no result")))
        })
        .collect()
}
