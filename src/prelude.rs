pub use crate::config::{ContextConfigExt, EpisimConfig, EpisimParameters};
pub use crate::context::{Context, ExecutionPhase};
pub use crate::error::EpisimError;
pub use crate::events::MobilityEvent;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::population::{ContextPopulationExt, DiseaseStatus, PersonId, QuarantineStatus};
pub use crate::random::{ContextRandomExt, EpisimRng};
pub use crate::relevance::ContextRelevanceExt;
pub use crate::report::ContextReportExt;
pub use crate::reporting::ContextReportingExt;
pub use crate::restrictions::ContextRestrictionsExt;
pub use crate::simulation::ContextSimulationExt;
pub use crate::trajectory::ContextTrajectoryExt;
pub use crate::transmission::ContextTransmissionExt;
pub use crate::{define_data_plugin, define_global_property, define_report, define_rng};
