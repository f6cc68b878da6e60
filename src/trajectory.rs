//! Container membership driven by mobility events.
//!
//! On day 0 every event is authoritative: it moves the person between containers and appends
//! the activity label to the person's trajectory. On later days the same event script is
//! replayed; membership is re-derived the same way, the trajectory cursor advances over the
//! recorded labels and nothing is appended. Every leave, real or synthetic, first runs the
//! contact dynamics for the container and only then removes the person.
//!
//! All times passed in are absolute: `day * 86400 + time of day`.
use log::trace;

use crate::config::ContextConfigExt;
use crate::context::Context;
use crate::error::EpisimError;
use crate::events::{ActivityEvent, MobilityEvent, VehicleEvent};
use crate::population::{ContainerId, ContainerKind, ContextPopulationExt, PersonId};
use crate::simulation::ContextSimulationExt;
use crate::transmission::ContextTransmissionExt;

pub trait ContextTrajectoryExt {
    /// Applies one event at absolute time `now`. Events the engine ignores (stage activities,
    /// transit drivers) are skipped.
    ///
    /// # Errors
    ///
    /// Invariant violations and configuration errors from the handlers below.
    fn handle_mobility_event(&mut self, event: &MobilityEvent, now: f64)
        -> Result<(), EpisimError>;

    /// Leaves the activity's facility. On day 0 a person whose first event this is starts the
    /// day inside the facility.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if, on a replayed day, the person is not inside the event's
    /// facility.
    fn handle_activity_end(&mut self, event: &ActivityEvent, now: f64) -> Result<(), EpisimError>;

    /// Enters the activity's facility.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if the person is still inside another container.
    fn handle_activity_start(&mut self, event: &ActivityEvent, now: f64)
        -> Result<(), EpisimError>;

    /// # Errors
    ///
    /// `InvariantViolation` if the person is still inside another container.
    fn handle_vehicle_enter(&mut self, event: &VehicleEvent, now: f64) -> Result<(), EpisimError>;

    /// # Errors
    ///
    /// `InvariantViolation` if the vehicle or person is unknown or the person is not inside.
    fn handle_vehicle_leave(&mut self, event: &VehicleEvent, now: f64) -> Result<(), EpisimError>;

    /// Closes the day for `person` at `now`, the start of the next day. A person who is
    /// inside anything other than the first facility of the day leaves it (running the
    /// contact dynamics) and re-enters the first facility; a person who is outside just
    /// enters it. Persons whose recorded day did not begin with leaving a facility stay
    /// outside.
    ///
    /// # Errors
    ///
    /// Invariant violations from the contact dynamics or membership changes.
    fn reconcile_day_boundary(&mut self, person: PersonId, now: f64) -> Result<(), EpisimError>;
}

impl ContextTrajectoryExt for Context {
    fn handle_mobility_event(
        &mut self,
        event: &MobilityEvent,
        now: f64,
    ) -> Result<(), EpisimError> {
        if !event.is_handled() {
            trace!("ignoring event of {} at {now}", event.person());
            return Ok(());
        }
        match event {
            MobilityEvent::ActivityStart(activity) => self.handle_activity_start(activity, now),
            MobilityEvent::ActivityEnd(activity) => self.handle_activity_end(activity, now),
            MobilityEvent::PersonEntersVehicle(vehicle) => self.handle_vehicle_enter(vehicle, now),
            MobilityEvent::PersonLeavesVehicle(vehicle) => self.handle_vehicle_leave(vehicle, now),
        }
    }

    fn handle_activity_end(&mut self, event: &ActivityEvent, now: f64) -> Result<(), EpisimError> {
        let facility_name = event.facility_id(self.get_episim_config()?.facilities_handling)?;
        let recording = self.get_iteration() == 0;
        let person = self.population_mut().get_or_create_person(&event.person);

        let facility = if recording {
            let facility = self
                .population_mut()
                .get_or_create_container(&facility_name, ContainerKind::Facility);
            let record = self.get_person(person)?;
            if record.first_facility().is_none() && record.current_container().is_none() {
                self.population_mut()
                    .add_person_to_container(facility, person, 0.0)?;
            }
            facility
        } else {
            let current = self.get_person(person)?.current_container();
            let expected = self
                .get_population()
                .and_then(|population| population.find_container(&facility_name, ContainerKind::Facility));
            match (current, expected) {
                (Some(current), Some(expected)) if current == expected => current,
                _ => {
                    return Err(EpisimError::InvariantViolation(format!(
                        "person {} ends activity {} in facility {facility_name} but is in {}",
                        event.person,
                        event.act_type,
                        describe_container(self, current)
                    )))
                }
            }
        };

        self.infection_dynamics(person, facility, now)?;
        self.population_mut()
            .remove_person_from_container(facility, person)?;

        let record = self.get_person_mut(person)?;
        if record.position_in_trajectory() == 0 {
            record.set_first_facility(facility);
        }
        record.advance_trajectory(&event.act_type, recording);
        trace!(
            "{} left {facility_name} at {now}, trajectory position {}",
            event.person,
            record.position_in_trajectory()
        );
        Ok(())
    }

    fn handle_activity_start(
        &mut self,
        event: &ActivityEvent,
        now: f64,
    ) -> Result<(), EpisimError> {
        let facility_name = event.facility_id(self.get_episim_config()?.facilities_handling)?;
        let recording = self.get_iteration() == 0;
        let population = self.population_mut();
        let person = population.get_or_create_person(&event.person);
        let facility = population.get_or_create_container(&facility_name, ContainerKind::Facility);
        population.add_person_to_container(facility, person, now)?;

        let record = self.get_person_mut(person)?;
        record.set_last_facility(facility);
        record.advance_trajectory(&event.act_type, recording);
        Ok(())
    }

    fn handle_vehicle_enter(&mut self, event: &VehicleEvent, now: f64) -> Result<(), EpisimError> {
        let population = self.population_mut();
        let person = population.get_or_create_person(&event.person);
        let vehicle = population.get_or_create_container(&event.vehicle, ContainerKind::Vehicle);
        population.add_person_to_container(vehicle, person, now)
    }

    fn handle_vehicle_leave(&mut self, event: &VehicleEvent, now: f64) -> Result<(), EpisimError> {
        let population = self.get_population();
        let vehicle = population
            .and_then(|population| population.find_container(&event.vehicle, ContainerKind::Vehicle))
            .ok_or_else(|| {
                EpisimError::InvariantViolation(format!(
                    "person {} leaves unknown vehicle {}",
                    event.person, event.vehicle
                ))
            })?;
        let person = population
            .and_then(|population| population.find_person(&event.person))
            .ok_or_else(|| {
                EpisimError::InvariantViolation(format!(
                    "unknown person {} leaves vehicle {}",
                    event.person, event.vehicle
                ))
            })?;
        if !self.get_container(vehicle)?.contains(person) {
            return Err(EpisimError::InvariantViolation(format!(
                "person {} leaves vehicle {} without having entered it",
                event.person, event.vehicle
            )));
        }

        self.infection_dynamics(person, vehicle, now)?;
        self.population_mut()
            .remove_person_from_container(vehicle, person)
    }

    fn reconcile_day_boundary(&mut self, person: PersonId, now: f64) -> Result<(), EpisimError> {
        let record = self.get_person(person)?;
        let first = record.first_facility();
        let Some(current) = record.current_container() else {
            if let Some(first) = first {
                self.population_mut()
                    .add_person_to_container(first, person, now)?;
            }
            return Ok(());
        };
        if Some(current) == first {
            return Ok(());
        }

        self.infection_dynamics(person, current, now)?;
        self.population_mut()
            .remove_person_from_container(current, person)?;
        match first {
            Some(first) => self
                .population_mut()
                .add_person_to_container(first, person, now)?,
            None => trace!(
                "person {} has no first facility and stays outside",
                self.get_person(person)?.name()
            ),
        }
        Ok(())
    }
}

fn describe_container(context: &Context, container: Option<ContainerId>) -> String {
    match container.map(|id| context.get_container(id)) {
        Some(Ok(container)) => format!("{:?} {}", container.kind(), container.name()),
        Some(Err(_)) | None => "no container".to_string(),
    }
}
