//! Day-over-day disease progression.
//!
//! The engine calls the run's `ProgressionModel` once per person at every day boundary and
//! asks it whether another day can still change the outcome.
use log::debug;

use crate::config::{EpisimConfig, ProgressionParams};
use crate::context::Context;
use crate::error::EpisimError;
use crate::population::{ContextPopulationExt, DiseaseStatus, PersonId, QuarantineStatus};
use crate::random::{ContextRandomExt, EpisimRng};
use crate::reporting::InfectionReport;

pub trait ProgressionModel {
    /// Advances `person` to its state on `day`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` for an unknown person.
    fn update_state(&self, context: &mut Context, person: PersonId, day: u32)
        -> Result<(), EpisimError>;

    /// Whether any further day can change the outcome.
    fn can_progress(&self, report: &InfectionReport) -> bool;
}

/// Fixed-duration progression with random symptom, sickness and critical outcomes.
///
/// A contagious person shows symptoms on day `days_until_symptoms` with probability
/// `symptomatic_fraction` and goes into full quarantine, together with the traceable contacts
/// when tracing is on. On the same day and independently the person becomes seriously sick
/// with probability `seriously_sick_fraction`.
#[derive(Clone, Debug, Default)]
pub struct DefaultProgressionModel {
    params: ProgressionParams,
    tracing: bool,
}

impl DefaultProgressionModel {
    #[must_use]
    pub fn new(params: ProgressionParams, tracing: bool) -> Self {
        DefaultProgressionModel { params, tracing }
    }

    #[must_use]
    pub fn from_config(config: &EpisimConfig) -> Self {
        DefaultProgressionModel::new(config.progression.clone(), config.tracing)
    }

    fn quarantine_with_contacts(
        &self,
        context: &mut Context,
        person: PersonId,
        day: u32,
    ) -> Result<(), EpisimError> {
        let record = context.get_person_mut(person)?;
        record.set_quarantine_status(QuarantineStatus::Full, day);
        if !self.tracing {
            return Ok(());
        }
        let contacts: Vec<PersonId> = record.traceable_contacts().iter().copied().collect();
        record.clear_traceable_contacts();
        debug!(
            "day {day}: {} is symptomatic, tracing {} contacts",
            record.name(),
            contacts.len()
        );
        for contact in contacts {
            let contact = context.get_person_mut(contact)?;
            if contact.quarantine_status() == QuarantineStatus::No {
                contact.set_quarantine_status(QuarantineStatus::Full, day);
            }
        }
        Ok(())
    }
}

impl ProgressionModel for DefaultProgressionModel {
    fn update_state(
        &self,
        context: &mut Context,
        person: PersonId,
        day: u32,
    ) -> Result<(), EpisimError> {
        let record = context.get_person(person)?;
        let status = record.disease_status();
        let params = &self.params;

        if let Some(days) = record.days_since_infection(day) {
            let next = match status {
                DiseaseStatus::InfectedButNotContagious if days >= params.days_until_contagious => {
                    Some(DiseaseStatus::Contagious)
                }
                DiseaseStatus::Contagious if days == params.days_until_symptoms => {
                    if context.sample_uniform(EpisimRng) < params.symptomatic_fraction {
                        self.quarantine_with_contacts(context, person, day)?;
                    }
                    (context.sample_uniform(EpisimRng) < params.seriously_sick_fraction)
                        .then_some(DiseaseStatus::SeriouslySick)
                }
                DiseaseStatus::Contagious if days >= params.days_until_recovered => {
                    Some(DiseaseStatus::Recovered)
                }
                DiseaseStatus::SeriouslySick if days == params.days_until_critical => {
                    (context.sample_uniform(EpisimRng) < params.critical_fraction)
                        .then_some(DiseaseStatus::Critical)
                }
                DiseaseStatus::SeriouslySick | DiseaseStatus::Critical
                    if days >= params.days_until_recovered_from_sickness =>
                {
                    Some(DiseaseStatus::Recovered)
                }
                _ => None,
            };
            if let Some(next) = next {
                context.get_person_mut(person)?.set_disease_status(next);
            }
        }

        let record = context.get_person_mut(person)?;
        if let Some(since) = record.quarantine_date() {
            if day.saturating_sub(since) >= params.quarantine_days {
                record.set_quarantine_status(QuarantineStatus::No, day);
            }
        }
        Ok(())
    }

    fn can_progress(&self, report: &InfectionReport) -> bool {
        report.currently_infected() > 0
    }
}
