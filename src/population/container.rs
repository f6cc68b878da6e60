use indexmap::IndexMap;

use crate::population::{ContainerId, ContainerKind, PersonId};

/// A facility or vehicle and the persons currently inside it.
#[derive(Debug, Clone)]
pub struct EpisimContainer {
    id: ContainerId,
    name: String,
    kind: ContainerKind,
    activity: String,
    /// Person to entry time, in entry order.
    pub(super) members: IndexMap<PersonId, f64>,
}

impl EpisimContainer {
    pub(super) fn new(id: ContainerId, name: &str, kind: ContainerKind) -> Self {
        EpisimContainer {
            id,
            name: name.to_string(),
            kind,
            activity: activity_label(name).to_string(),
            members: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The activity label embedded in the id, i.e. everything before the first `_`.
    #[must_use]
    pub fn activity(&self) -> &str {
        &self.activity
    }

    #[must_use]
    pub fn contains(&self, person: PersonId) -> bool {
        self.members.contains_key(&person)
    }

    /// When `person` entered, or `None` if they are not inside.
    #[must_use]
    pub fn entering_time(&self, person: PersonId) -> Option<f64> {
        self.members.get(&person).copied()
    }

    /// Current members in the order they entered.
    pub fn members(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.members.keys().copied()
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

fn activity_label(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}
