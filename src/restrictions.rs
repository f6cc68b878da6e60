//! Per-group participation restrictions.
//!
//! A `Restriction` is the fraction of normal participation in an activity group that is still
//! permitted. The set of restrictions in force is replaced wholesale once per simulated day and
//! is read-only in between.
use indexmap::IndexMap;
use serde::Serialize;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Restriction {
    remaining_fraction: f64,
}

impl Restriction {
    /// A restriction permitting `remaining_fraction` of normal participation.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the fraction is outside `[0, 1]`.
    pub fn new(remaining_fraction: f64) -> Result<Self, EpisimError> {
        if !(0.0..=1.0).contains(&remaining_fraction) {
            return Err(EpisimError::ConfigError(format!(
                "remaining fraction must lie in [0, 1], got {remaining_fraction}"
            )));
        }
        Ok(Restriction { remaining_fraction })
    }

    /// Unrestricted participation.
    #[must_use]
    pub fn none() -> Self {
        Restriction {
            remaining_fraction: 1.0,
        }
    }

    /// Participation fully suppressed.
    #[must_use]
    pub fn closed() -> Self {
        Restriction {
            remaining_fraction: 0.0,
        }
    }

    #[must_use]
    pub fn remaining_fraction(&self) -> f64 {
        self.remaining_fraction
    }
}

/// Restrictions keyed by group name, in configuration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Restrictions {
    by_group: IndexMap<String, Restriction>,
}

impl Restrictions {
    #[must_use]
    pub fn get(&self, group: &str) -> Option<Restriction> {
        self.by_group.get(group).copied()
    }

    pub fn set(&mut self, group: &str, restriction: Restriction) {
        self.by_group.insert(group.to_string(), restriction);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Restriction)> {
        self.by_group
            .iter()
            .map(|(group, restriction)| (group.as_str(), *restriction))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_group.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_group.is_empty()
    }
}

define_data_plugin!(RestrictionsPlugin, Restrictions, Restrictions::default());

pub trait ContextRestrictionsExt {
    /// The restrictions in force today.
    fn get_restrictions(&self) -> Option<&Restrictions>;

    /// Replaces the restrictions in force.
    fn set_restrictions(&mut self, restrictions: Restrictions);
}

impl ContextRestrictionsExt for Context {
    fn get_restrictions(&self) -> Option<&Restrictions> {
        self.get_data(RestrictionsPlugin)
    }

    fn set_restrictions(&mut self, restrictions: Restrictions) {
        *self.get_data_mut(RestrictionsPlugin) = restrictions;
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod test {
    use super::*;

    #[test]
    fn fraction_bounds() {
        assert!(Restriction::new(0.0).is_ok());
        assert!(Restriction::new(1.0).is_ok());
        assert!(Restriction::new(-0.1).is_err());
        assert!(Restriction::new(1.01).is_err());
        assert!(Restriction::new(f64::NAN).is_err());
    }

    #[test]
    fn replaced_wholesale() {
        let mut context = Context::new();
        assert!(context.get_restrictions().is_none());

        let mut restrictions = Restrictions::default();
        restrictions.set("work", Restriction::new(0.5).unwrap());
        restrictions.set("edu", Restriction::closed());
        context.set_restrictions(restrictions);

        let mut replacement = Restrictions::default();
        replacement.set("leisure", Restriction::none());
        context.set_restrictions(replacement);

        let current = context.get_restrictions().unwrap();
        assert_eq!(current.len(), 1);
        assert!(current.get("work").is_none());
        assert_eq!(current.get("leisure").unwrap().remaining_fraction(), 1.0);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut restrictions = Restrictions::default();
        restrictions.set("b", Restriction::none());
        restrictions.set("a", Restriction::closed());
        let groups: Vec<&str> = restrictions.iter().map(|(group, _)| group).collect();
        assert_eq!(groups, vec!["b", "a"]);
    }
}
