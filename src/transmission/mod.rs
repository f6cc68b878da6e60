//! Contact and transmission.
//!
//! Every time a person leaves a container, real or synthetic, the engine hands the leave to the
//! run's `TransmissionStrategy`. The strategy samples co-present persons and decides who gets
//! infected; `ContextTransmissionExt::infect_person` commits the outcome. The building blocks
//! (`contacts_to_sample`, `joint_time_in_container`, `infection_probability`, ...) are public so
//! alternative strategies and tests can use them without drawing random numbers.
mod default_model;

use std::rc::Rc;

use log::debug;

pub use default_model::DefaultTransmission;

use crate::config::EpisimConfig;
use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::events::SECONDS_PER_DAY;
use crate::population::{
    ContainerId, ContainerKind, ContextPopulationExt, DiseaseStatus, EpisimContainer, PersonId,
    QuarantineStatus,
};
use crate::reporting::{ContextReportingExt, InfectionEvent};
use crate::simulation::ContextSimulationExt;

/// Infection type recorded for contacts inside vehicles.
pub const VEHICLE_INFECTION_TYPE: &str = "pt";

/// Contact sampling for one container leave.
pub trait TransmissionStrategy {
    /// Runs the contact dynamics for `leaving` inside `container` at absolute time `now`,
    /// before the person is removed.
    ///
    /// # Errors
    ///
    /// Configuration errors and invariant violations are fatal for the run.
    fn infection_dynamics(
        &self,
        context: &mut Context,
        leaving: PersonId,
        container: ContainerId,
        now: f64,
    ) -> Result<(), EpisimError>;
}

define_data_plugin!(
    TransmissionPlugin,
    Rc<dyn TransmissionStrategy>,
    Rc::new(DefaultTransmission)
);

/// The number of distinct contacts sampled from a pool of `pool_size` other occupants:
/// `min(pool_size, max(floor(sample_size * 10), 3))`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn contacts_to_sample(pool_size: usize, sample_size: f64) -> usize {
    // `as` truncates towards zero, which is the floor for the validated, positive sample size.
    let scaled = (sample_size * 10.0) as usize;
    pool_size.min(scaled.max(3))
}

/// `1 - exp(-calibration * intensity * joint_time)`.
#[must_use]
pub fn infection_probability(calibration_parameter: f64, contact_intensity: f64, joint_time: f64) -> f64 {
    1.0 - (-calibration_parameter * contact_intensity * joint_time).exp()
}

/// Time two persons have spent together in a container, at `now`. A missing entry time counts
/// as negative infinity, i.e. the other person's entry decides.
///
/// # Errors
///
/// `InvariantViolation` if both entry times are missing or the result lies outside
/// `[0, 86400]`. The value is never clamped.
pub fn joint_time_in_container(
    now: f64,
    leaving_entered: Option<f64>,
    other_entered: Option<f64>,
) -> Result<f64, EpisimError> {
    if leaving_entered.is_none() && other_entered.is_none() {
        return Err(EpisimError::InvariantViolation(
            "neither person has an entry time in the shared container".to_string(),
        ));
    }
    let entered = leaving_entered
        .unwrap_or(f64::NEG_INFINITY)
        .max(other_entered.unwrap_or(f64::NEG_INFINITY));
    let joint_time = now - entered;
    if !(0.0..=SECONDS_PER_DAY).contains(&joint_time) {
        return Err(EpisimError::InvariantViolation(format!(
            "joint time in container is not plausible: {joint_time} (now={now}, entered={entered})"
        )));
    }
    Ok(joint_time)
}

/// Exactly one of the two is susceptible and the other contagious.
#[must_use]
pub fn persons_can_infect_each_other(a: DiseaseStatus, b: DiseaseStatus) -> bool {
    a != b && a.is_relevant_for_transmission() && b.is_relevant_for_transmission()
}

/// `<leaving activity>_<other activity>` in facilities, `pt` in vehicles.
#[must_use]
pub fn infection_type(kind: ContainerKind, leaving_activity: &str, other_activity: &str) -> String {
    match kind {
        ContainerKind::Facility => format!("{leaving_activity}_{other_activity}"),
        ContainerKind::Vehicle => VEHICLE_INFECTION_TYPE.to_string(),
    }
}

/// Facility pairs that cannot meet: home only meets home or leisure, education only meets
/// education or work.
#[must_use]
pub fn is_excluded_cross_activity(
    infection_type: &str,
    leaving_activity: &str,
    other_activity: &str,
) -> bool {
    if infection_type.contains("home") && !infection_type.contains("leis") {
        !(leaving_activity.contains("home") && other_activity.contains("home"))
    } else if infection_type.contains("edu") && !infection_type.contains("work") {
        !(leaving_activity.contains("edu") && other_activity.contains("edu"))
    } else {
        false
    }
}

/// Contact intensity of a pair: the vehicle's own group, or in a facility the larger of the
/// two persons' activity groups.
///
/// # Errors
///
/// `ConfigError` if a group is missing.
pub fn contact_intensity(
    config: &EpisimConfig,
    container: &EpisimContainer,
    leaving_activity: &str,
    other_activity: &str,
) -> Result<f64, EpisimError> {
    match container.kind() {
        ContainerKind::Vehicle => config.contact_intensity(container.name()),
        ContainerKind::Facility => Ok(config
            .contact_intensity(leaving_activity)?
            .max(config.contact_intensity(other_activity)?)),
    }
}

pub trait ContextTransmissionExt {
    /// Replaces the contact sampling strategy. `DefaultTransmission` is used otherwise.
    fn set_transmission_strategy(&mut self, strategy: Rc<dyn TransmissionStrategy>);

    /// Runs the run's strategy for one container leave.
    ///
    /// # Errors
    ///
    /// Whatever the strategy returns.
    fn infection_dynamics(
        &mut self,
        leaving: PersonId,
        container: ContainerId,
        now: f64,
    ) -> Result<(), EpisimError>;

    /// Infects `target` by `source` at `now` and reports it.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` unless `target` is susceptible, `source` contagious, neither is in
    /// quarantine and both are in the same container.
    fn infect_person(
        &mut self,
        target: PersonId,
        source: PersonId,
        now: f64,
        infection_type: &str,
    ) -> Result<(), EpisimError>;
}

impl ContextTransmissionExt for Context {
    fn set_transmission_strategy(&mut self, strategy: Rc<dyn TransmissionStrategy>) {
        *self.get_data_mut(TransmissionPlugin) = strategy;
    }

    fn infection_dynamics(
        &mut self,
        leaving: PersonId,
        container: ContainerId,
        now: f64,
    ) -> Result<(), EpisimError> {
        let strategy = Rc::clone(self.get_data_mut(TransmissionPlugin));
        strategy.infection_dynamics(self, leaving, container, now)
    }

    fn infect_person(
        &mut self,
        target: PersonId,
        source: PersonId,
        now: f64,
        infection_type: &str,
    ) -> Result<(), EpisimError> {
        let day = self.get_iteration();
        let target_record = self.get_person(target)?;
        let source_record = self.get_person(source)?;
        let violation = |msg: String| Err(EpisimError::InvariantViolation(msg));

        if target_record.disease_status() != DiseaseStatus::Susceptible {
            return violation(format!(
                "person {} to be infected is not susceptible, status is {:?}",
                target_record.name(),
                target_record.disease_status()
            ));
        }
        if source_record.disease_status() != DiseaseStatus::Contagious {
            return violation(format!(
                "infector {} is not contagious, status is {:?}",
                source_record.name(),
                source_record.disease_status()
            ));
        }
        if target_record.quarantine_status() != QuarantineStatus::No {
            return violation(format!(
                "person {} to be infected is in quarantine",
                target_record.name()
            ));
        }
        if source_record.quarantine_status() != QuarantineStatus::No {
            return violation(format!("infector {} is in quarantine", source_record.name()));
        }
        let container = match target_record.current_container() {
            Some(container) if source_record.current_container() == Some(container) => container,
            _ => {
                return violation(format!(
                    "person {} and infector {} are not in the same container",
                    target_record.name(),
                    source_record.name()
                ))
            }
        };

        let event = InfectionEvent {
            day,
            time: now,
            infected: target_record.name().to_string(),
            infector: source_record.name().to_string(),
            infection_type: infection_type.to_string(),
            container: self.get_container(container)?.name().to_string(),
        };

        let record = self.get_person_mut(target)?;
        record.set_infection_date(day)?;
        record.set_disease_status(DiseaseStatus::InfectedButNotContagious);
        debug!(
            "day {day} t={now}: {} infected {} ({infection_type}) in {}",
            event.infector, event.infected, event.container
        );
        self.record_infection(event)
    }
}
