//! An epidemic simulation over replayed daily mobility
//!
//! Episim simulates the day-by-day spread of a contagious disease through a
//! population whose co-location pattern comes from one recorded day of
//! mobility: persons end and start activities in facilities and ride in
//! vehicles. On day 0 the events build every person's trajectory; every later
//! day replays it. Each time a person leaves a container the contact engine
//! samples a few co-present persons and tests for transmission based on joint
//! dwell time, the contact intensity of the activities and a calibration
//! parameter, thinned by the restrictions in force.
//!
//! The central object is the `Context`, which owns
//! * the plan queue and the simulation clock,
//! * the module data: registries, restrictions, configuration, the random
//!   number generator and the reports.
//!
//! A run is assembled from a few modules:
//! * `population`: persons and containers, with the membership invariant.
//! * `trajectory`: event handling, recording, replay and day boundaries.
//! * `relevance`: who takes part in contact dynamics under restrictions.
//! * `transmission`: contact sampling and infection.
//! * `simulation`: the day driver that calls the `progression` model and the
//!   restriction `policy` and feeds `reporting`.
//!
//! `runner` wraps all of it behind a command line and `batch` runs many
//! independent scenarios in parallel.
pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod global_properties;
pub mod hashing;
pub mod log;
pub mod plan;
pub mod policy;
pub mod population;
pub mod prelude;
pub mod progression;
pub mod random;
pub mod relevance;
pub mod report;
pub mod reporting;
pub mod restrictions;
pub mod runner;
pub mod simulation;
pub mod trajectory;
pub mod transmission;

pub use config::{ContextConfigExt, EpisimConfig, EpisimParameters, FacilitiesHandling};
pub use context::{Context, ExecutionPhase};
pub use error::EpisimError;
pub use events::{read_events, EventFilter, MobilityEvent};
pub use global_properties::ContextGlobalPropertiesExt;
pub use policy::{FixedPolicy, ShutdownPolicy};
pub use population::{ContextPopulationExt, DiseaseStatus, PersonId, QuarantineStatus};
pub use progression::{DefaultProgressionModel, ProgressionModel};
pub use random::{ContextRandomExt, EpisimRng};
pub use report::ContextReportExt;
pub use reporting::ContextReportingExt;
pub use restrictions::{ContextRestrictionsExt, Restriction, Restrictions};
pub use runner::{run_with_args, BaseArgs};
pub use simulation::ContextSimulationExt;
pub use trajectory::ContextTrajectoryExt;
pub use transmission::{ContextTransmissionExt, DefaultTransmission, TransmissionStrategy};

pub use crate::log::{debug, error, info, trace, warn};

// Re-exported for use in macros.
pub use csv;
pub use paste;
pub use rand;
