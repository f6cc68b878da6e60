use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::runtime::ConfigBuilder;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogConfiguration;

// Use an ISO 8601 timestamp format and color coded level tag
const CONSOLE_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";
// Log files get the same layout without ANSI escapes
const FILE_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {l} {t} - {m}{n}";

impl LogConfiguration {
    /// Sets the global logger to conform to this [`LogConfiguration`].
    ///
    /// # Panics
    ///
    /// Panics if the log file cannot be opened. `set_log_file` checks this up front.
    pub(in crate::log) fn set_config(&mut self) {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(CONSOLE_LOG_PATTERN)))
            .build();
        let mut config: ConfigBuilder =
            Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
        let mut root = Root::builder().appender("stdout");

        if let Some(path) = &self.log_file {
            let file = FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(FILE_LOG_PATTERN)))
                .build(path)
                .unwrap_or_else(|e| panic!("failed to open log file {}: {e}", path.display()));
            config = config.appender(Appender::builder().build("file", Box::new(file)));
            root = root.appender("file");
        }

        for (module, level) in &self.module_filters {
            config = config.logger(Logger::builder().build(module.clone(), *level));
        }

        // The `Root` determines the global log level
        let new_config = match config.build(root.build(self.global_log_level)) {
            Err(e) => {
                panic!("failed to build config: {e}");
            }
            Ok(config) => config,
        };

        match self.root_handle {
            Some(ref mut handle) => {
                // The global logger has already been initialized
                handle.set_config(new_config);
            }

            None => {
                // The global logger has not yet been initialized
                self.root_handle = Some(log4rs::init_config(new_config).unwrap());
            }
        }
    }
}
