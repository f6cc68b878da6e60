//! The person and container registries.
//!
//! Persons and containers live in index-stable tables and refer to each other by id only.
//! Both are created lazily on first observation and never removed. Membership changes go
//! through `Population::add_person_to_container` / `remove_person_from_container`, which keep
//! the container's member table and the person's `current_container` in agreement: a person
//! is inside at most one container at any time.
mod container;
mod person;

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub use container::EpisimContainer;
pub use person::EpisimPerson;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::hashing::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub(crate) usize);

impl PersonId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub(crate) usize);

impl ContainerId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Facility,
    Vehicle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiseaseStatus {
    Susceptible,
    InfectedButNotContagious,
    Contagious,
    Recovered,
    SeriouslySick,
    Critical,
}

impl DiseaseStatus {
    /// Statuses that take part in a transmission: the susceptible target and the contagious
    /// source.
    #[must_use]
    pub fn is_relevant_for_transmission(self) -> bool {
        matches!(self, DiseaseStatus::Susceptible | DiseaseStatus::Contagious)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    No,
    Home,
    /// Removed from all contact dynamics.
    Full,
}

#[derive(Debug, Default)]
pub struct Population {
    persons: Vec<EpisimPerson>,
    person_lookup: HashMap<String, PersonId>,
    containers: Vec<EpisimContainer>,
    facility_lookup: HashMap<String, ContainerId>,
    vehicle_lookup: HashMap<String, ContainerId>,
}

impl Population {
    /// The person with event id `name`, created on first request.
    pub fn get_or_create_person(&mut self, name: &str) -> PersonId {
        if let Some(id) = self.person_lookup.get(name) {
            return *id;
        }
        let id = PersonId(self.persons.len());
        self.persons.push(EpisimPerson::new(id, name));
        self.person_lookup.insert(name.to_string(), id);
        id
    }

    /// The container with event id `name` of the given kind, created on first request.
    /// Facilities and vehicles have separate id spaces.
    pub fn get_or_create_container(&mut self, name: &str, kind: ContainerKind) -> ContainerId {
        let lookup = match kind {
            ContainerKind::Facility => &mut self.facility_lookup,
            ContainerKind::Vehicle => &mut self.vehicle_lookup,
        };
        if let Some(id) = lookup.get(name) {
            return *id;
        }
        let id = ContainerId(self.containers.len());
        self.containers.push(EpisimContainer::new(id, name, kind));
        lookup.insert(name.to_string(), id);
        id
    }

    #[must_use]
    pub fn find_person(&self, name: &str) -> Option<PersonId> {
        self.person_lookup.get(name).copied()
    }

    #[must_use]
    pub fn find_container(&self, name: &str, kind: ContainerKind) -> Option<ContainerId> {
        match kind {
            ContainerKind::Facility => self.facility_lookup.get(name).copied(),
            ContainerKind::Vehicle => self.vehicle_lookup.get(name).copied(),
        }
    }

    #[must_use]
    pub fn person(&self, id: PersonId) -> Option<&EpisimPerson> {
        self.persons.get(id.0)
    }

    pub fn person_mut(&mut self, id: PersonId) -> Option<&mut EpisimPerson> {
        self.persons.get_mut(id.0)
    }

    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&EpisimContainer> {
        self.containers.get(id.0)
    }

    /// All persons in creation order.
    pub fn persons(&self) -> impl Iterator<Item = &EpisimPerson> {
        self.persons.iter()
    }

    /// All person ids in creation order.
    pub fn person_ids(&self) -> impl Iterator<Item = PersonId> {
        (0..self.persons.len()).map(PersonId)
    }

    /// All containers in creation order.
    pub fn containers(&self) -> impl Iterator<Item = &EpisimContainer> {
        self.containers.iter()
    }

    #[must_use]
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Puts `person` into `container`, entering at `time`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if either id is unknown or the person is already inside a
    /// container.
    pub fn add_person_to_container(
        &mut self,
        container: ContainerId,
        person: PersonId,
        time: f64,
    ) -> Result<(), EpisimError> {
        let (person_record, container_record) = self.pair_mut(person, container)?;
        if let Some(current) = person_record.current_container {
            return Err(EpisimError::InvariantViolation(format!(
                "person {} cannot enter {} while still inside container {current}",
                person_record.name(),
                container_record.name()
            )));
        }
        container_record.members.insert(person, time);
        person_record.current_container = Some(container);
        Ok(())
    }

    /// Takes `person` out of `container`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if either id is unknown or the person is not inside `container`.
    pub fn remove_person_from_container(
        &mut self,
        container: ContainerId,
        person: PersonId,
    ) -> Result<(), EpisimError> {
        let (person_record, container_record) = self.pair_mut(person, container)?;
        if person_record.current_container != Some(container)
            || !container_record.members.contains_key(&person)
        {
            return Err(EpisimError::InvariantViolation(format!(
                "person {} is not inside container {}",
                person_record.name(),
                container_record.name()
            )));
        }
        container_record.members.shift_remove(&person);
        person_record.current_container = None;
        Ok(())
    }

    fn pair_mut(
        &mut self,
        person: PersonId,
        container: ContainerId,
    ) -> Result<(&mut EpisimPerson, &mut EpisimContainer), EpisimError> {
        let person_record = self.persons.get_mut(person.0).ok_or_else(|| {
            EpisimError::InvariantViolation(format!("unknown person id {person}"))
        })?;
        let container_record = self.containers.get_mut(container.0).ok_or_else(|| {
            EpisimError::InvariantViolation(format!("unknown container id {container}"))
        })?;
        Ok((person_record, container_record))
    }
}

define_data_plugin!(PopulationPlugin, Population, Population::default());

pub trait ContextPopulationExt {
    /// Mutable access to the registries, created empty on first use.
    fn population_mut(&mut self) -> &mut Population;

    /// The registries, if any person or container has been created.
    fn get_population(&self) -> Option<&Population>;

    /// # Errors
    ///
    /// `InvariantViolation` if the id is unknown.
    fn get_person(&self, person: PersonId) -> Result<&EpisimPerson, EpisimError>;

    /// # Errors
    ///
    /// `InvariantViolation` if the id is unknown.
    fn get_person_mut(&mut self, person: PersonId) -> Result<&mut EpisimPerson, EpisimError>;

    /// # Errors
    ///
    /// `InvariantViolation` if the id is unknown.
    fn get_container(&self, container: ContainerId) -> Result<&EpisimContainer, EpisimError>;

    fn get_person_count(&self) -> usize;
}

impl ContextPopulationExt for Context {
    fn population_mut(&mut self) -> &mut Population {
        self.get_data_mut(PopulationPlugin)
    }

    fn get_population(&self) -> Option<&Population> {
        self.get_data(PopulationPlugin)
    }

    fn get_person(&self, person: PersonId) -> Result<&EpisimPerson, EpisimError> {
        self.get_population()
            .and_then(|population| population.person(person))
            .ok_or_else(|| EpisimError::InvariantViolation(format!("unknown person id {person}")))
    }

    fn get_person_mut(&mut self, person: PersonId) -> Result<&mut EpisimPerson, EpisimError> {
        self.population_mut()
            .person_mut(person)
            .ok_or_else(|| EpisimError::InvariantViolation(format!("unknown person id {person}")))
    }

    fn get_container(&self, container: ContainerId) -> Result<&EpisimContainer, EpisimError> {
        self.get_population()
            .and_then(|population| population.container(container))
            .ok_or_else(|| {
                EpisimError::InvariantViolation(format!("unknown container id {container}"))
            })
    }

    fn get_person_count(&self) -> usize {
        self.get_population().map_or(0, Population::person_count)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod test {
    use super::*;

    #[test]
    fn upserts_are_idempotent_and_ordered() {
        let mut population = Population::default();
        let a = population.get_or_create_person("a");
        let b = population.get_or_create_person("b");
        assert_eq!(population.get_or_create_person("a"), a);
        assert_eq!(population.person_ids().collect::<Vec<_>>(), vec![a, b]);

        let home = population.get_or_create_container("home_1", ContainerKind::Facility);
        assert_eq!(
            population.get_or_create_container("home_1", ContainerKind::Facility),
            home
        );
        // Same name, other kind, other container.
        let bus = population.get_or_create_container("home_1", ContainerKind::Vehicle);
        assert_ne!(bus, home);
        assert_eq!(population.container_count(), 2);
        assert_eq!(
            population.find_container("home_1", ContainerKind::Vehicle),
            Some(bus)
        );
    }

    #[test]
    fn membership_moves_together() {
        let mut population = Population::default();
        let p = population.get_or_create_person("p");
        let home = population.get_or_create_container("home_1", ContainerKind::Facility);

        population.add_person_to_container(home, p, 10.0).unwrap();
        assert_eq!(population.person(p).unwrap().current_container(), Some(home));
        assert_eq!(population.container(home).unwrap().entering_time(p), Some(10.0));

        population.remove_person_from_container(home, p).unwrap();
        assert_eq!(population.person(p).unwrap().current_container(), None);
        assert!(!population.container(home).unwrap().contains(p));
    }

    #[test]
    fn double_membership_is_rejected() {
        let mut population = Population::default();
        let p = population.get_or_create_person("p");
        let home = population.get_or_create_container("home_1", ContainerKind::Facility);
        let work = population.get_or_create_container("work_1", ContainerKind::Facility);

        population.add_person_to_container(home, p, 0.0).unwrap();
        let result = population.add_person_to_container(work, p, 5.0);
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        let result = population.add_person_to_container(home, p, 5.0);
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        // Nothing changed.
        assert_eq!(population.container(home).unwrap().entering_time(p), Some(0.0));
        assert_eq!(population.container(work).unwrap().member_count(), 0);
    }

    #[test]
    fn removing_absent_person_is_rejected() {
        let mut population = Population::default();
        let p = population.get_or_create_person("p");
        let home = population.get_or_create_container("home_1", ContainerKind::Facility);
        let work = population.get_or_create_container("work_1", ContainerKind::Facility);
        assert!(population.remove_person_from_container(home, p).is_err());

        population.add_person_to_container(home, p, 0.0).unwrap();
        assert!(population.remove_person_from_container(work, p).is_err());
        assert!(population.container(home).unwrap().contains(p));
    }

    #[test]
    fn members_keep_entry_order_after_removal() {
        let mut population = Population::default();
        let home = population.get_or_create_container("home_1", ContainerKind::Facility);
        let ids: Vec<PersonId> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| population.get_or_create_person(name))
            .collect();
        for (time, id) in ids.iter().enumerate() {
            population
                .add_person_to_container(home, *id, time as f64)
                .unwrap();
        }
        population.remove_person_from_container(home, ids[1]).unwrap();
        let members: Vec<PersonId> = population.container(home).unwrap().members().collect();
        assert_eq!(members, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn context_access() {
        let mut context = Context::new();
        assert_eq!(context.get_person_count(), 0);
        let p = context.population_mut().get_or_create_person("p");
        context
            .get_person_mut(p)
            .unwrap()
            .set_disease_status(DiseaseStatus::Contagious);
        assert_eq!(
            context.get_person(p).unwrap().disease_status(),
            DiseaseStatus::Contagious
        );
        assert!(context.get_person(PersonId(7)).is_err());
        assert!(context.get_container(ContainerId(0)).is_err());
    }
}
