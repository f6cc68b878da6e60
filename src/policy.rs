//! Restriction policies. The engine asks the run's `ShutdownPolicy` for the restrictions of
//! every new day, after the day's report has been created.
use indexmap::IndexMap;

use crate::config::{EpisimConfig, RestrictionStep};
use crate::error::EpisimError;
use crate::reporting::InfectionReport;
use crate::restrictions::{Restriction, Restrictions};

pub trait ShutdownPolicy {
    /// Updates `restrictions` in place for the day of `report`.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the policy produces an invalid fraction.
    fn update_restrictions(
        &self,
        report: &InfectionReport,
        restrictions: &mut Restrictions,
    ) -> Result<(), EpisimError>;
}

/// A schedule fixed in advance: per group, the latest step whose day has been reached
/// applies. Groups without a reached step keep their current restriction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedPolicy {
    schedule: IndexMap<String, Vec<RestrictionStep>>,
}

impl FixedPolicy {
    #[must_use]
    pub fn new() -> Self {
        FixedPolicy::default()
    }

    #[must_use]
    pub fn from_config(config: &EpisimConfig) -> Self {
        let mut policy = FixedPolicy::new();
        for (group, steps) in &config.policy {
            for step in steps {
                policy.add_step(group, *step);
            }
        }
        policy
    }

    /// From `day` on, allow `remaining_fraction` of normal participation in `groups`.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the fraction lies outside `[0, 1]`.
    pub fn restrict(
        mut self,
        day: u32,
        remaining_fraction: f64,
        groups: &[&str],
    ) -> Result<Self, EpisimError> {
        Restriction::new(remaining_fraction)?;
        for group in groups {
            self.add_step(
                group,
                RestrictionStep {
                    day,
                    remaining_fraction,
                },
            );
        }
        Ok(self)
    }

    /// Closes `groups` from `day` on.
    #[must_use]
    pub fn shutdown(mut self, day: u32, groups: &[&str]) -> Self {
        for group in groups {
            self.add_step(
                group,
                RestrictionStep {
                    day,
                    remaining_fraction: 0.0,
                },
            );
        }
        self
    }

    /// Lifts every restriction on `groups` from `day` on.
    #[must_use]
    pub fn open(mut self, day: u32, groups: &[&str]) -> Self {
        for group in groups {
            self.add_step(
                group,
                RestrictionStep {
                    day,
                    remaining_fraction: 1.0,
                },
            );
        }
        self
    }

    // Steps stay sorted by day; steps on the same day keep insertion order, so the later one
    // wins.
    fn add_step(&mut self, group: &str, step: RestrictionStep) {
        let steps = self.schedule.entry(group.to_string()).or_default();
        steps.push(step);
        steps.sort_by_key(|step| step.day);
    }
}

impl ShutdownPolicy for FixedPolicy {
    fn update_restrictions(
        &self,
        report: &InfectionReport,
        restrictions: &mut Restrictions,
    ) -> Result<(), EpisimError> {
        for (group, steps) in &self.schedule {
            if let Some(step) = steps.iter().rev().find(|step| step.day <= report.day) {
                restrictions.set(group, Restriction::new(step.remaining_fraction)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod test {
    use super::*;
    use crate::config::EpisimConfig;

    fn on_day(day: u32) -> InfectionReport {
        InfectionReport {
            day,
            ..InfectionReport::default()
        }
    }

    fn fraction(restrictions: &Restrictions, group: &str) -> f64 {
        restrictions.get(group).unwrap().remaining_fraction()
    }

    #[test]
    fn latest_reached_step_applies() {
        let policy = FixedPolicy::new()
            .shutdown(10, &["edu"])
            .restrict(5, 0.5, &["work", "leisure"])
            .unwrap()
            .open(20, &["edu", "work"]);
        let mut restrictions = EpisimConfig::default().initial_restrictions();

        policy.update_restrictions(&on_day(4), &mut restrictions).unwrap();
        assert_eq!(fraction(&restrictions, "work"), 1.0);

        policy.update_restrictions(&on_day(12), &mut restrictions).unwrap();
        assert_eq!(fraction(&restrictions, "edu"), 0.0);
        assert_eq!(fraction(&restrictions, "work"), 0.5);
        assert_eq!(fraction(&restrictions, "leisure"), 0.5);
        assert_eq!(fraction(&restrictions, "home"), 1.0);

        policy.update_restrictions(&on_day(25), &mut restrictions).unwrap();
        assert_eq!(fraction(&restrictions, "edu"), 1.0);
        assert_eq!(fraction(&restrictions, "work"), 1.0);
        assert_eq!(fraction(&restrictions, "leisure"), 0.5);
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        assert!(matches!(
            FixedPolicy::new().restrict(3, 1.5, &["work"]),
            Err(EpisimError::ConfigError(_))
        ));
    }

    #[test]
    fn built_from_config() {
        let mut config = EpisimConfig::default();
        config.policy.insert(
            "shopping".to_string(),
            vec![
                RestrictionStep {
                    day: 8,
                    remaining_fraction: 1.0,
                },
                RestrictionStep {
                    day: 2,
                    remaining_fraction: 0.3,
                },
            ],
        );
        let policy = FixedPolicy::from_config(&config);
        let mut restrictions = config.initial_restrictions();
        policy.update_restrictions(&on_day(5), &mut restrictions).unwrap();
        assert_eq!(fraction(&restrictions, "shopping"), 0.3);
        policy.update_restrictions(&on_day(8), &mut restrictions).unwrap();
        assert_eq!(fraction(&restrictions, "shopping"), 1.0);
    }
}
