use indexmap::IndexSet;

use crate::error::EpisimError;
use crate::population::{ContainerId, DiseaseStatus, PersonId, QuarantineStatus};

/// One agent. Created the first time the person shows up in the event stream.
#[derive(Debug, Clone)]
pub struct EpisimPerson {
    id: PersonId,
    name: String,
    disease_status: DiseaseStatus,
    quarantine_status: QuarantineStatus,
    infection_date: Option<u32>,
    quarantine_date: Option<u32>,
    trajectory: Vec<String>,
    position_in_trajectory: usize,
    first_facility: Option<ContainerId>,
    last_facility: Option<ContainerId>,
    pub(super) current_container: Option<ContainerId>,
    traceable_contacts: IndexSet<PersonId>,
}

impl EpisimPerson {
    pub(super) fn new(id: PersonId, name: &str) -> Self {
        EpisimPerson {
            id,
            name: name.to_string(),
            disease_status: DiseaseStatus::Susceptible,
            quarantine_status: QuarantineStatus::No,
            infection_date: None,
            quarantine_date: None,
            trajectory: Vec::new(),
            position_in_trajectory: 0,
            first_facility: None,
            last_facility: None,
            current_container: None,
            traceable_contacts: IndexSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    /// The id the person has in the event stream.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn disease_status(&self) -> DiseaseStatus {
        self.disease_status
    }

    pub fn set_disease_status(&mut self, status: DiseaseStatus) {
        self.disease_status = status;
    }

    #[must_use]
    pub fn quarantine_status(&self) -> QuarantineStatus {
        self.quarantine_status
    }

    /// Sets the quarantine status. Entering quarantine records `day`, leaving clears it.
    pub fn set_quarantine_status(&mut self, status: QuarantineStatus, day: u32) {
        self.quarantine_status = status;
        self.quarantine_date = match status {
            QuarantineStatus::No => None,
            QuarantineStatus::Home | QuarantineStatus::Full => Some(day),
        };
    }

    #[must_use]
    pub fn quarantine_date(&self) -> Option<u32> {
        self.quarantine_date
    }

    #[must_use]
    pub fn infection_date(&self) -> Option<u32> {
        self.infection_date
    }

    /// Records the day of infection.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if an infection date was already recorded.
    pub fn set_infection_date(&mut self, day: u32) -> Result<(), EpisimError> {
        if let Some(previous) = self.infection_date {
            return Err(EpisimError::InvariantViolation(format!(
                "person {} was already infected on day {previous}",
                self.name
            )));
        }
        self.infection_date = Some(day);
        Ok(())
    }

    /// Days since infection, if infected.
    #[must_use]
    pub fn days_since_infection(&self, day: u32) -> Option<u32> {
        self.infection_date.map(|date| day.saturating_sub(date))
    }

    #[must_use]
    pub fn trajectory(&self) -> &[String] {
        &self.trajectory
    }

    #[must_use]
    pub fn position_in_trajectory(&self) -> usize {
        self.position_in_trajectory
    }

    /// The activity at the cursor: the one the person is about to do, or is doing.
    #[must_use]
    pub fn current_activity(&self) -> Option<&str> {
        self.trajectory
            .get(self.position_in_trajectory)
            .map(String::as_str)
    }

    /// The activity before the cursor, absent at the start of the day.
    #[must_use]
    pub fn previous_activity(&self) -> Option<&str> {
        self.position_in_trajectory
            .checked_sub(1)
            .and_then(|position| self.trajectory.get(position))
            .map(String::as_str)
    }

    /// The last activity of the recorded day.
    #[must_use]
    pub fn last_activity(&self) -> Option<&str> {
        self.trajectory.last().map(String::as_str)
    }

    /// Moves the cursor one step. The cursor stays put once it sits on the last recorded
    /// element; `label` is only appended while `recording`.
    pub fn advance_trajectory(&mut self, label: &str, recording: bool) {
        if self.position_in_trajectory + 1 == self.trajectory.len() {
            return;
        }
        self.position_in_trajectory += 1;
        if recording {
            self.trajectory.push(label.to_string());
        }
    }

    pub fn reset_trajectory_position(&mut self) {
        self.position_in_trajectory = 0;
    }

    #[must_use]
    pub fn first_facility(&self) -> Option<ContainerId> {
        self.first_facility
    }

    pub fn set_first_facility(&mut self, facility: ContainerId) {
        self.first_facility = Some(facility);
    }

    #[must_use]
    pub fn last_facility(&self) -> Option<ContainerId> {
        self.last_facility
    }

    pub fn set_last_facility(&mut self, facility: ContainerId) {
        self.last_facility = Some(facility);
    }

    #[must_use]
    pub fn current_container(&self) -> Option<ContainerId> {
        self.current_container
    }

    #[must_use]
    pub fn traceable_contacts(&self) -> &IndexSet<PersonId> {
        &self.traceable_contacts
    }

    pub fn add_traceable_contact(&mut self, other: PersonId) {
        self.traceable_contacts.insert(other);
    }

    pub fn clear_traceable_contacts(&mut self) {
        self.traceable_contacts.clear();
    }
}
