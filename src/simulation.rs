//! The day driver.
//!
//! Day `d` starts with a plan at `d * 86400` in `ExecutionPhase::First`. It closes the previous
//! day for every person, advances disease progression, seeds the initial infections on day 1,
//! reports, and asks the policy for the day's restrictions. Unless the run is finished it then
//! queues the day's mobility events at `d * 86400 + t` and the start of the next day.
//!
//! Day 0 records trajectories from the events; every later day replays the same script.
use std::rc::Rc;

use log::{info, warn};

use crate::config::{ContextConfigExt, EpisimConfig, EpisimParameters};
use crate::context::{Context, ExecutionPhase};
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::events::{validate_day, MobilityEvent, SECONDS_PER_DAY};
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::policy::{FixedPolicy, ShutdownPolicy};
use crate::population::{ContextPopulationExt, DiseaseStatus, PersonId};
use crate::progression::{DefaultProgressionModel, ProgressionModel};
use crate::random::{ContextRandomExt, EpisimRng};
use crate::reporting::ContextReportingExt;
use crate::restrictions::ContextRestrictionsExt;
use crate::trajectory::ContextTrajectoryExt;

struct SimulationData {
    iteration: u32,
    script: Rc<[MobilityEvent]>,
    policy: Rc<dyn ShutdownPolicy>,
    progression: Rc<dyn ProgressionModel>,
    finished: bool,
}

impl Default for SimulationData {
    fn default() -> Self {
        SimulationData {
            iteration: 0,
            script: Rc::from(Vec::new()),
            policy: Rc::new(FixedPolicy::default()),
            progression: Rc::new(DefaultProgressionModel::default()),
            finished: false,
        }
    }
}

define_data_plugin!(SimulationPlugin, SimulationData, SimulationData::default());

pub trait ContextSimulationExt {
    /// The current simulated day, 0 before the first day has started.
    fn get_iteration(&self) -> u32;

    /// Stores `config` and installs the initial restrictions, a `FixedPolicy` built from the
    /// config's schedule and the default progression model.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the config is invalid or was already set.
    fn init_episim(&mut self, config: EpisimConfig) -> Result<(), EpisimError>;

    fn set_shutdown_policy(&mut self, policy: Rc<dyn ShutdownPolicy>);

    fn set_progression_model(&mut self, model: Rc<dyn ProgressionModel>);

    /// Sets the event script of the representative day.
    ///
    /// # Errors
    ///
    /// `ConfigError` if an event lies outside `[0, 86400)` or the script is not ordered by
    /// time.
    fn load_mobility_events(&mut self, events: Vec<MobilityEvent>) -> Result<(), EpisimError>;

    /// Runs the day boundary into `day`: reconciliation and progression per person, seeding,
    /// the day report and the day's restrictions.
    ///
    /// # Errors
    ///
    /// Whatever the collaborators or the contact dynamics of the synthetic leaves return.
    fn reset_for_iteration(&mut self, day: u32) -> Result<(), EpisimError>;

    /// True once a day past day 0 started with nothing left that could progress.
    fn is_finished(&self) -> bool;

    /// Queues the start of day 0. Run the simulation with `execute()`.
    ///
    /// # Errors
    ///
    /// `ConfigError` if `init_episim` or `init_random` have not been called.
    fn start_simulation(&mut self) -> Result<(), EpisimError>;
}

impl ContextSimulationExt for Context {
    fn get_iteration(&self) -> u32 {
        self.get_data(SimulationPlugin)
            .map_or(0, |data| data.iteration)
    }

    fn init_episim(&mut self, config: EpisimConfig) -> Result<(), EpisimError> {
        let policy = FixedPolicy::from_config(&config);
        let progression = DefaultProgressionModel::from_config(&config);
        let restrictions = config.initial_restrictions();
        self.set_global_property_value(EpisimParameters, config)?;
        self.set_restrictions(restrictions);

        let data = self.get_data_mut(SimulationPlugin);
        data.policy = Rc::new(policy);
        data.progression = Rc::new(progression);
        Ok(())
    }

    fn set_shutdown_policy(&mut self, policy: Rc<dyn ShutdownPolicy>) {
        self.get_data_mut(SimulationPlugin).policy = policy;
    }

    fn set_progression_model(&mut self, model: Rc<dyn ProgressionModel>) {
        self.get_data_mut(SimulationPlugin).progression = model;
    }

    fn load_mobility_events(&mut self, events: Vec<MobilityEvent>) -> Result<(), EpisimError> {
        validate_day(&events)?;
        info!("loaded {} mobility events", events.len());
        self.get_data_mut(SimulationPlugin).script = Rc::from(events);
        Ok(())
    }

    fn reset_for_iteration(&mut self, day: u32) -> Result<(), EpisimError> {
        let day_start = f64::from(day) * SECONDS_PER_DAY;
        let progression = Rc::clone(&self.get_data_mut(SimulationPlugin).progression);
        let persons: Vec<PersonId> = self
            .get_population()
            .map(|population| population.person_ids().collect())
            .unwrap_or_default();

        for person in persons {
            // Contact dynamics of the synthetic leaves still belong to the previous day.
            if day > 0 {
                self.reconcile_day_boundary(person, day_start)?;
            }
            self.get_person_mut(person)?.reset_trajectory_position();
            progression.update_state(self, person, day)?;
        }

        self.get_data_mut(SimulationPlugin).iteration = day;
        if day == 1 {
            seed_initial_infections(self)?;
        }

        let report = self.create_infection_report(day);
        let policy = Rc::clone(&self.get_data_mut(SimulationPlugin).policy);
        let mut restrictions = self.get_restrictions().cloned().unwrap_or_default();
        policy.update_restrictions(&report, &mut restrictions)?;
        self.set_restrictions(restrictions.clone());

        let finished = day > 0 && !progression.can_progress(&report);
        info!(
            "day {day}: {} susceptible, {} infected, {} recovered, {} ever infected",
            report.susceptible,
            report.currently_infected(),
            report.recovered,
            report.total_infected
        );
        self.record_day(report, &restrictions)?;
        self.get_data_mut(SimulationPlugin).finished = finished;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.get_data(SimulationPlugin)
            .is_some_and(|data| data.finished)
    }

    fn start_simulation(&mut self) -> Result<(), EpisimError> {
        self.get_episim_config()?;
        if self.get_base_seed().is_none() {
            return Err(EpisimError::ConfigError(
                "the random number generator has not been initialized".to_string(),
            ));
        }
        schedule_day(self, 0);
        Ok(())
    }
}

fn schedule_day(context: &mut Context, day: u32) {
    context.add_plan_with_phase(
        f64::from(day) * SECONDS_PER_DAY,
        move |context| begin_day(context, day),
        ExecutionPhase::First,
    );
}

fn begin_day(context: &mut Context, day: u32) -> Result<(), EpisimError> {
    context.reset_for_iteration(day)?;
    if context.is_finished() {
        info!("nothing left to progress, stopping at day {day}");
        context.shutdown();
        return Ok(());
    }

    let offset = f64::from(day) * SECONDS_PER_DAY;
    let script = Rc::clone(&context.get_data_mut(SimulationPlugin).script);
    for (index, event) in script.iter().enumerate() {
        if !event.is_handled() {
            continue;
        }
        let script = Rc::clone(&script);
        context.add_plan(offset + event.time(), move |context| {
            let now = context.get_current_time();
            context.handle_mobility_event(&script[index], now)
        });
    }

    if day + 1 < context.get_episim_config()?.iterations {
        schedule_day(context, day + 1);
    }
    Ok(())
}

/// Infects `initial_infections` distinct susceptible persons, drawn uniformly by index.
fn seed_initial_infections(context: &mut Context) -> Result<(), EpisimError> {
    let mut remaining = context.get_episim_config()?.initial_infections;
    let persons: Vec<PersonId> = context
        .get_population()
        .map(|population| population.person_ids().collect())
        .unwrap_or_default();
    let mut susceptible = persons
        .iter()
        .filter(|person| {
            context
                .get_person(**person)
                .is_ok_and(|record| record.disease_status() == DiseaseStatus::Susceptible)
        })
        .count();

    while remaining > 0 {
        if susceptible == 0 {
            warn!("no susceptible person left, {remaining} initial infections not seeded");
            break;
        }
        let person = persons[context.sample_range(EpisimRng, 0..persons.len())];
        let record = context.get_person_mut(person)?;
        if record.disease_status() != DiseaseStatus::Susceptible {
            continue;
        }
        record.set_disease_status(DiseaseStatus::InfectedButNotContagious);
        record.set_infection_date(0)?;
        info!("person {} has initial infection", record.name());
        remaining -= 1;
        susceptible -= 1;
    }
    Ok(())
}
