//! CSV report output.
//!
//! A report is a serializable row type registered with `add_report`. Each registered type gets
//! its own CSV file named `<directory>/<file_prefix><short_name>.csv`; every `send_report` call
//! appends one row and flushes.
use std::any::TypeId;
use std::cell::RefCell;
use std::env;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::hashing::HashMap;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), EpisimError>;
}

/// Use this macro to make a `serde::Serialize` struct usable as a report row
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::EpisimError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use define_report;

/// Where and how report files are created.
#[derive(Debug, Clone)]
pub struct ConfigReportOptions {
    pub file_prefix: String,
    pub output_dir: PathBuf,
    pub overwrite: bool,
}

impl ConfigReportOptions {
    #[must_use]
    pub fn new() -> Self {
        ConfigReportOptions {
            file_prefix: String::new(),
            output_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            overwrite: false,
        }
    }

    /// Sets the file prefix option (e.g., "baseline_")
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ConfigReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    /// Sets the directory where reports will be output
    pub fn directory(&mut self, directory: PathBuf) -> &mut ConfigReportOptions {
        self.output_dir = directory;
        self
    }

    /// Sets whether to overwrite existing reports of the same name if they exist
    pub fn overwrite(&mut self, overwrite: bool) -> &mut ConfigReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ConfigReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ConfigReportOptions,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * config: Contains all the customizable filename options that the user supplies
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ConfigReportOptions::new(),
    }
);

pub trait ContextReportExt {
    /// Returns the report options for this run so they can be changed before reports are added.
    fn report_options(&mut self) -> &mut ConfigReportOptions;

    /// Creates the CSV file for report type `T` and registers a writer for it.
    ///
    /// # Errors
    ///
    /// Fails if the file exists and overwriting is off, if the directory or file cannot be
    /// created, or if `T` already has a writer.
    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), EpisimError>;

    /// Whether a writer exists for report type `T`.
    fn has_report<T: Report + 'static>(&self) -> bool;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    ///
    /// Fails if `T` was never added or the row cannot be written.
    fn send_report<T: Report>(&self, report: T) -> Result<(), EpisimError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ConfigReportOptions {
        &mut self.get_data_mut(ReportPlugin).config
    }

    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), EpisimError> {
        let data_container = self.get_data_mut(ReportPlugin);
        let config = &data_container.config;
        let path = config
            .output_dir
            .join(format!("{}{short_name}.csv", config.file_prefix));
        if path.exists() && !config.overwrite {
            return Err(EpisimError::ReportError(format!(
                "{} already exists. Use the overwrite option to replace it",
                path.display()
            )));
        }
        let file_writers = data_container.file_writers.get_mut();
        if file_writers.contains_key(&TypeId::of::<T>()) {
            return Err(EpisimError::ReportError(format!(
                "a report type has already been added under {short_name}"
            )));
        }
        create_dir_all(&config.output_dir)?;
        let file = File::create(&path)?;
        file_writers.insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn has_report<T: Report + 'static>(&self) -> bool {
        self.get_data(ReportPlugin).is_some_and(|data| {
            data.file_writers
                .borrow()
                .contains_key(&TypeId::of::<T>())
        })
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), EpisimError> {
        let missing = || EpisimError::ReportError("No writer found for the report type".into());
        // No data container will exist if no reports have been added
        let data_container = self.get_data(ReportPlugin).ok_or_else(missing)?;
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers.get_mut(&report.type_id()).ok_or_else(missing)?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}
