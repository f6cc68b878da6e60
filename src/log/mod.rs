//! The `log` module configures episim's diagnostic logging. This is not to be confused with
//! _reporting_ (see `crate::reporting`), which records the epidemic itself.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!`. What the engine logs at each level:
//!
//!  - `info!`: day start summaries, initial infections, run completion
//!  - `warn!`: recoverable oddities, e.g. fewer susceptible persons than initial infections
//!  - `debug!`: every committed transmission
//!  - `trace!`: individual event handling and trajectory decisions
//!
//! Logging is _disabled_ by default. The runner enables it with `--log-level <level>`. From code:
//!
//! ```rust
//! use episim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! pub fn setup_logging() {
//!     set_log_level(LevelFilter::Info);
//!     // Show each transmission but keep the per-event chatter off.
//!     set_module_filter("episim::transmission", LevelFilter::Debug);
//!     set_module_filter("episim::trajectory", LevelFilter::Off);
//! }
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::error::EpisimError;

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;
// One trace line per mobility event swamps everything else unless asked for explicitly.
const DEFAULT_MODULE_FILTERS: [(&str, LevelFilter); 1] =
    [("episim::trajectory", LevelFilter::Debug)];

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Holds logging configuration: the global filter, per-module filters, the optional log file and
/// a handle to the installed logger.
///
/// Loggers are installed process-wide, so only the singleton behind `LOG_CONFIGURATION` exists.
/// Concurrent batch runs share it.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// The "default" level filter for modules ("targets") without an explicitly set filter. A
    /// global filter level of `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    /// Module path to maximum level. Ordered so rebuilt configurations are identical.
    pub(in crate::log) module_filters: BTreeMap<String, LevelFilter>,
    pub(in crate::log) log_file: Option<PathBuf>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_filters: DEFAULT_MODULE_FILTERS
                .iter()
                .map(|(module, level)| ((*module).to_string(), *level))
                .collect(),
            log_file: None,

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

// The public API

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    let mut log_configuration = get_log_configuration();
    log_configuration.global_log_level = level;
    log_configuration.set_config();
}

/// Parses a level name as accepted on the command line (`off`, `error`, ..., `trace`).
///
/// # Errors
///
/// Returns `EpisimError::ConfigError` for an unknown level name.
pub fn parse_log_level(level: &str) -> Result<LevelFilter, EpisimError> {
    LevelFilter::from_str(level)
        .map_err(|_| EpisimError::ConfigError(format!("unknown log level '{level}'")))
}

/// Sets a level filter for the given module path, e.g. `"episim::transmission"`.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    let mut log_configuration = get_log_configuration();
    if log_configuration
        .module_filters
        .insert(module_path.to_string(), level_filter)
        != Some(level_filter)
    {
        log_configuration.set_config();
    }
}

/// Removes a module-specific level filter for the given module path. The global level filter will
/// apply to the module.
pub fn remove_module_filter(module_path: &str) {
    let mut log_configuration = get_log_configuration();
    if log_configuration.module_filters.remove(module_path).is_some() {
        log_configuration.set_config();
    }
}

/// Additionally writes log messages to `path`, or stops doing so when `None`.
///
/// # Errors
///
/// Returns `EpisimError::IoError` if the file cannot be opened for appending.
pub fn set_log_file(path: Option<PathBuf>) -> Result<(), EpisimError> {
    if let Some(path) = &path {
        OpenOptions::new().create(true).append(true).open(path)?;
    }
    let mut log_configuration = get_log_configuration();
    log_configuration.log_file = path;
    log_configuration.set_config();
    Ok(())
}

/// Fetches a mutable reference to the global `LogConfiguration`.
fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
