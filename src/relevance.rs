//! Decides whether a person takes part in contact dynamics under today's restrictions.
//!
//! A restriction with remaining fraction exactly 1 or exactly 0 is decided without drawing a
//! random number. Only fractions strictly in between consume one draw from `EpisimRng`, so
//! runs that differ only in non-binding restrictions see the same random stream. Trip checks
//! short-circuit left to right and stop drawing at the first irrelevant activity.
use log::trace;

use crate::config::{ContextConfigExt, TRANSIT_ACTIVITY};
use crate::context::Context;
use crate::error::EpisimError;
use crate::population::{
    ContainerId, ContainerKind, ContextPopulationExt, DiseaseStatus, EpisimPerson, PersonId,
    QuarantineStatus,
};
use crate::random::{ContextRandomExt, EpisimRng};
use crate::restrictions::ContextRestrictionsExt;

pub trait ContextRelevanceExt {
    /// Whether `activity` takes place today under the restriction of its group.
    ///
    /// # Errors
    ///
    /// `ConfigError` if no group maps the activity or the group has no restriction.
    fn activity_is_relevant(&self, activity: &str) -> Result<bool, EpisimError>;

    /// Whether the trip `person` is on carries contact risk: transit itself, the activity the
    /// trip leads to and, unless the trip starts the day, the activity it comes from must all
    /// be relevant.
    ///
    /// # Errors
    ///
    /// As `activity_is_relevant`, plus `InvariantViolation` for an unknown person or a cursor
    /// outside the recorded trajectory.
    fn trip_is_relevant(&self, person: PersonId) -> Result<bool, EpisimError>;

    /// Whether `person` takes part in contact dynamics inside `container` right now.
    ///
    /// # Errors
    ///
    /// As `activity_is_relevant` and `trip_is_relevant`.
    fn person_is_relevant(
        &self,
        person: PersonId,
        container: ContainerId,
    ) -> Result<bool, EpisimError>;
}

impl ContextRelevanceExt for Context {
    #[allow(clippy::float_cmp)]
    fn activity_is_relevant(&self, activity: &str) -> Result<bool, EpisimError> {
        let params = self
            .get_episim_config()?
            .params_for_activity(activity)
            .ok_or_else(|| {
                EpisimError::ConfigError(format!(
                    "no restriction group configured for activity '{activity}'"
                ))
            })?;
        let restriction = self
            .get_restrictions()
            .and_then(|restrictions| restrictions.get(&params.container_name))
            .ok_or_else(|| {
                EpisimError::ConfigError(format!(
                    "no restriction in force for group '{}'",
                    params.container_name
                ))
            })?;

        let fraction = restriction.remaining_fraction();
        if fraction == 1.0 {
            return Ok(true);
        }
        if fraction == 0.0 {
            return Ok(false);
        }
        Ok(self.sample_uniform(EpisimRng) < fraction)
    }

    fn trip_is_relevant(&self, person: PersonId) -> Result<bool, EpisimError> {
        let record = self.get_person(person)?;
        let next_activity = activity_at_cursor(record)?;
        let relevant = self.activity_is_relevant(TRANSIT_ACTIVITY)?
            && self.activity_is_relevant(next_activity)?
            && match record.previous_activity() {
                Some(last_activity) => self.activity_is_relevant(last_activity)?,
                None => true,
            };
        Ok(relevant)
    }

    fn person_is_relevant(
        &self,
        person: PersonId,
        container: ContainerId,
    ) -> Result<bool, EpisimError> {
        let record = self.get_person(person)?;
        let status = record.disease_status();
        // Infected but not yet contagious persons still count, for contact tracing.
        if !status.is_relevant_for_transmission()
            && status != DiseaseStatus::InfectedButNotContagious
        {
            return Ok(false);
        }
        if record.quarantine_status() == QuarantineStatus::Full {
            return Ok(false);
        }
        let relevant = match self.get_container(container)?.kind() {
            ContainerKind::Facility => self.activity_is_relevant(activity_at_cursor(record)?)?,
            ContainerKind::Vehicle => self.trip_is_relevant(person)?,
        };
        if !relevant {
            trace!("person {} sits out today in container {container}", record.name());
        }
        Ok(relevant)
    }
}

/// The activity under the person's trajectory cursor.
///
/// # Errors
///
/// `InvariantViolation` if the cursor points past the recorded trajectory.
pub(crate) fn activity_at_cursor(person: &EpisimPerson) -> Result<&str, EpisimError> {
    person.current_activity().ok_or_else(|| {
        EpisimError::InvariantViolation(format!(
            "person {} has no recorded activity at trajectory position {} (length {})",
            person.name(),
            person.position_in_trajectory(),
            person.trajectory().len()
        ))
    })
}
