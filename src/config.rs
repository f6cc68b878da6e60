//! Scenario configuration: calibration, sampling, activity groups and the schedules of the
//! default collaborators.
//!
//! An activity label belongs to the *first* configured group that has a mapped activity
//! prefix of it. The group supplies both the contact intensity and the name under which
//! restrictions are looked up.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_global_property;
use crate::error::EpisimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::hashing::HashSet;
use crate::restrictions::{Restriction, Restrictions};

/// Activity label used for the transit part of a trip.
pub const TRANSIT_ACTIVITY: &str = "tr";

/// How facility ids are derived from activity events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilitiesHandling {
    /// Use the facility id carried by the event.
    #[default]
    Snz,
    /// Use `<activity prefix>_<link id>`, one pseudo facility per activity type and link.
    Bln,
}

/// Contact parameters of one activity group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfectionParams {
    pub container_name: String,
    pub mapped_activities: Vec<String>,
    pub contact_intensity: f64,
}

impl InfectionParams {
    #[must_use]
    pub fn new(container_name: &str, contact_intensity: f64, mapped_activities: &[&str]) -> Self {
        InfectionParams {
            container_name: container_name.to_string(),
            mapped_activities: mapped_activities.iter().map(ToString::to_string).collect(),
            contact_intensity,
        }
    }

    /// Whether `activity` starts with one of the mapped activity prefixes.
    #[must_use]
    pub fn includes_activity(&self, activity: &str) -> bool {
        self.mapped_activities
            .iter()
            .any(|mapped| activity.starts_with(mapped.as_str()))
    }
}

/// One step of a fixed restriction schedule: from `day` on, `remaining_fraction` applies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestrictionStep {
    pub day: u32,
    pub remaining_fraction: f64,
}

/// Parameters of the default disease progression. Day counts are relative to the
/// infection date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionParams {
    pub days_until_contagious: u32,
    pub days_until_symptoms: u32,
    pub symptomatic_fraction: f64,
    pub seriously_sick_fraction: f64,
    pub days_until_critical: u32,
    pub critical_fraction: f64,
    pub days_until_recovered: u32,
    pub days_until_recovered_from_sickness: u32,
    pub quarantine_days: u32,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        ProgressionParams {
            days_until_contagious: 4,
            days_until_symptoms: 6,
            symptomatic_fraction: 0.2,
            seriously_sick_fraction: 0.05,
            days_until_critical: 10,
            critical_fraction: 0.25,
            days_until_recovered: 16,
            days_until_recovered_from_sickness: 23,
            quarantine_days: 14,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisimConfig {
    pub calibration_parameter: f64,
    /// Population down-sampling factor. Sets the number of contacts sampled per leave.
    pub sample_size: f64,
    #[serde(default)]
    pub facilities_handling: FacilitiesHandling,
    /// Record traceable contacts and quarantine them with a symptomatic person.
    #[serde(default)]
    pub tracing: bool,
    #[serde(default = "default_initial_infections")]
    pub initial_infections: usize,
    /// Maximum number of simulated days, day 0 included.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_infection_params")]
    pub infection_params: Vec<InfectionParams>,
    /// Fixed restriction schedule per group.
    #[serde(default)]
    pub policy: IndexMap<String, Vec<RestrictionStep>>,
    #[serde(default)]
    pub progression: ProgressionParams,
}

fn default_initial_infections() -> usize {
    10
}

fn default_iterations() -> u32 {
    365
}

/// One group per common activity type, all with unit contact intensity.
#[must_use]
pub fn default_infection_params() -> Vec<InfectionParams> {
    vec![
        InfectionParams::new("pt", 1.0, &[TRANSIT_ACTIVITY]),
        InfectionParams::new("work", 1.0, &["work"]),
        InfectionParams::new("leisure", 1.0, &["leis"]),
        InfectionParams::new("edu", 1.0, &["edu"]),
        InfectionParams::new("shopping", 1.0, &["shop"]),
        InfectionParams::new("errands", 1.0, &["errands"]),
        InfectionParams::new("business", 1.0, &["business"]),
        InfectionParams::new("other", 1.0, &["other"]),
        InfectionParams::new("freight", 1.0, &["freight"]),
        InfectionParams::new("home", 1.0, &["home"]),
    ]
}

impl Default for EpisimConfig {
    fn default() -> Self {
        EpisimConfig {
            calibration_parameter: 0.000_002,
            sample_size: 0.25,
            facilities_handling: FacilitiesHandling::default(),
            tracing: false,
            initial_infections: default_initial_infections(),
            iterations: default_iterations(),
            infection_params: default_infection_params(),
            policy: IndexMap::new(),
            progression: ProgressionParams::default(),
        }
    }
}

impl EpisimConfig {
    /// The first group whose mapped activities match `activity`.
    #[must_use]
    pub fn params_for_activity(&self, activity: &str) -> Option<&InfectionParams> {
        self.infection_params
            .iter()
            .find(|params| params.includes_activity(activity))
    }

    /// Contact intensity of the group `activity` belongs to.
    ///
    /// # Errors
    ///
    /// `ConfigError` if no group matches.
    pub fn contact_intensity(&self, activity: &str) -> Result<f64, EpisimError> {
        self.params_for_activity(activity)
            .map(|params| params.contact_intensity)
            .ok_or_else(|| {
                EpisimError::ConfigError(format!(
                    "no infection params (contact intensity) configured for activity '{activity}'"
                ))
            })
    }

    /// Every group at remaining fraction 1.
    #[must_use]
    pub fn initial_restrictions(&self) -> Restrictions {
        let mut restrictions = Restrictions::default();
        for params in &self.infection_params {
            restrictions.set(&params.container_name, Restriction::none());
        }
        restrictions
    }

    /// Checks the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// `ConfigError` naming the first offending value.
    pub fn validate(&self) -> Result<(), EpisimError> {
        let invalid = |msg: String| Err(EpisimError::ConfigError(msg));
        if !self.calibration_parameter.is_finite() || self.calibration_parameter < 0.0 {
            return invalid(format!(
                "calibration_parameter must be a non-negative number, got {}",
                self.calibration_parameter
            ));
        }
        if !self.sample_size.is_finite() || self.sample_size <= 0.0 {
            return invalid(format!(
                "sample_size must be positive, got {}",
                self.sample_size
            ));
        }
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".to_string());
        }
        let mut names = HashSet::default();
        for params in &self.infection_params {
            if !names.insert(params.container_name.as_str()) {
                return invalid(format!(
                    "infection params for '{}' are defined twice",
                    params.container_name
                ));
            }
            if params.mapped_activities.is_empty() {
                return invalid(format!(
                    "infection params for '{}' map no activities",
                    params.container_name
                ));
            }
            if !params.contact_intensity.is_finite() || params.contact_intensity < 0.0 {
                return invalid(format!(
                    "contact intensity of '{}' must be non-negative, got {}",
                    params.container_name, params.contact_intensity
                ));
            }
        }
        for (group, steps) in &self.policy {
            if !names.contains(group.as_str()) {
                return invalid(format!("policy refers to unknown group '{group}'"));
            }
            for step in steps {
                Restriction::new(step.remaining_fraction)?;
            }
        }
        let progression = &self.progression;
        for (name, fraction) in [
            ("symptomatic_fraction", progression.symptomatic_fraction),
            ("seriously_sick_fraction", progression.seriously_sick_fraction),
            ("critical_fraction", progression.critical_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return invalid(format!("{name} must lie in [0, 1], got {fraction}"));
            }
        }
        Ok(())
    }
}

define_global_property!(EpisimParameters, EpisimConfig, EpisimConfig::validate);

pub trait ContextConfigExt {
    /// The run's configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError` if `EpisimParameters` has not been set.
    fn get_episim_config(&self) -> Result<&EpisimConfig, EpisimError>;
}

impl ContextConfigExt for Context {
    fn get_episim_config(&self) -> Result<&EpisimConfig, EpisimError> {
        self.get_global_property_value(EpisimParameters)
            .ok_or_else(|| {
                EpisimError::ConfigError("EpisimParameters have not been set".to_string())
            })
    }
}
