//! Epidemic reporting: infection events, daily status counts and the restrictions in force.
//!
//! Everything is kept in memory for inspection after a run. When `add_episim_reports` has been
//! called the same rows are also written to CSV files (`infections.csv`,
//! `infection_events.csv`, `restrictions.csv`).
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_report;
use crate::error::EpisimError;
use crate::population::{ContextPopulationExt, DiseaseStatus, Population, QuarantineStatus};
use crate::report::ContextReportExt;
use crate::restrictions::Restrictions;

/// One committed transmission.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InfectionEvent {
    pub day: u32,
    pub time: f64,
    pub infected: String,
    pub infector: String,
    pub infection_type: String,
    pub container: String,
}

define_report!(InfectionEvent);

/// Status counts at the start of a day, after progression and seeding.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InfectionReport {
    pub day: u32,
    pub time: f64,
    pub susceptible: usize,
    pub infected_but_not_contagious: usize,
    pub contagious: usize,
    pub seriously_sick: usize,
    pub critical: usize,
    pub recovered: usize,
    pub quarantined_full: usize,
    pub quarantined_home: usize,
    /// Everybody who was ever infected.
    pub total_infected: usize,
}

define_report!(InfectionReport);

impl InfectionReport {
    #[must_use]
    pub fn from_population(day: u32, time: f64, population: &Population) -> Self {
        let mut report = InfectionReport {
            day,
            time,
            ..InfectionReport::default()
        };
        for person in population.persons() {
            match person.disease_status() {
                DiseaseStatus::Susceptible => report.susceptible += 1,
                DiseaseStatus::InfectedButNotContagious => report.infected_but_not_contagious += 1,
                DiseaseStatus::Contagious => report.contagious += 1,
                DiseaseStatus::SeriouslySick => report.seriously_sick += 1,
                DiseaseStatus::Critical => report.critical += 1,
                DiseaseStatus::Recovered => report.recovered += 1,
            }
            match person.quarantine_status() {
                QuarantineStatus::Full => report.quarantined_full += 1,
                QuarantineStatus::Home => report.quarantined_home += 1,
                QuarantineStatus::No => {}
            }
        }
        report.total_infected = population.person_count() - report.susceptible;
        report
    }

    /// Persons whose disease is still running.
    #[must_use]
    pub fn currently_infected(&self) -> usize {
        self.infected_but_not_contagious + self.contagious + self.seriously_sick + self.critical
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RestrictionRecord {
    pub day: u32,
    pub group: String,
    pub remaining_fraction: f64,
}

define_report!(RestrictionRecord);

#[derive(Default)]
struct ReportingData {
    infections: Vec<InfectionEvent>,
    daily: Vec<InfectionReport>,
}

define_data_plugin!(ReportingPlugin, ReportingData, ReportingData::default());

pub trait ContextReportingExt {
    /// Writes infection events, daily reports and restrictions to CSV files, located by
    /// `report_options()`.
    ///
    /// # Errors
    ///
    /// Fails if a report file cannot be created.
    fn add_episim_reports(&mut self) -> Result<(), EpisimError>;

    /// Counts persons by status for `day`.
    fn create_infection_report(&self, day: u32) -> InfectionReport;

    /// Stores a transmission and writes it out if reports are enabled.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be written.
    fn record_infection(&mut self, event: InfectionEvent) -> Result<(), EpisimError>;

    /// Stores the day report and writes it out, with today's restrictions, if reports are
    /// enabled.
    ///
    /// # Errors
    ///
    /// Fails if a row cannot be written.
    fn record_day(
        &mut self,
        report: InfectionReport,
        restrictions: &Restrictions,
    ) -> Result<(), EpisimError>;

    /// All transmissions so far, in commit order.
    fn get_infection_events(&self) -> &[InfectionEvent];

    /// All day reports so far.
    fn get_daily_reports(&self) -> &[InfectionReport];

    /// The most recent day report.
    fn get_infection_report(&self) -> Option<&InfectionReport>;
}

impl ContextReportingExt for Context {
    fn add_episim_reports(&mut self) -> Result<(), EpisimError> {
        self.add_report::<InfectionReport>("infections")?;
        self.add_report::<InfectionEvent>("infection_events")?;
        self.add_report::<RestrictionRecord>("restrictions")?;
        Ok(())
    }

    fn create_infection_report(&self, day: u32) -> InfectionReport {
        let time = self.get_current_time();
        match self.get_population() {
            Some(population) => InfectionReport::from_population(day, time, population),
            None => InfectionReport {
                day,
                time,
                ..InfectionReport::default()
            },
        }
    }

    fn record_infection(&mut self, event: InfectionEvent) -> Result<(), EpisimError> {
        if self.has_report::<InfectionEvent>() {
            self.send_report(event.clone())?;
        }
        self.get_data_mut(ReportingPlugin).infections.push(event);
        Ok(())
    }

    fn record_day(
        &mut self,
        report: InfectionReport,
        restrictions: &Restrictions,
    ) -> Result<(), EpisimError> {
        if self.has_report::<InfectionReport>() {
            self.send_report(report.clone())?;
        }
        if self.has_report::<RestrictionRecord>() {
            for (group, restriction) in restrictions.iter() {
                self.send_report(RestrictionRecord {
                    day: report.day,
                    group: group.to_string(),
                    remaining_fraction: restriction.remaining_fraction(),
                })?;
            }
        }
        self.get_data_mut(ReportingPlugin).daily.push(report);
        Ok(())
    }

    fn get_infection_events(&self) -> &[InfectionEvent] {
        self.get_data(ReportingPlugin)
            .map_or(&[], |data| data.infections.as_slice())
    }

    fn get_daily_reports(&self) -> &[InfectionReport] {
        self.get_data(ReportingPlugin)
            .map_or(&[], |data| data.daily.as_slice())
    }

    fn get_infection_report(&self) -> Option<&InfectionReport> {
        self.get_daily_reports().last()
    }
}
