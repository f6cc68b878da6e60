//! Mobility events: the day-0 input of the engine.
//!
//! Events come from a CSV file with the columns `time,type,person,act_type,link,facility,vehicle`
//! where `type` is one of `actstart`, `actend`, `PersonEntersVehicle`, `PersonLeavesVehicle`.
//! Columns a type does not use may be left empty.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::config::FacilitiesHandling;
use crate::error::EpisimError;
use crate::hashing::HashSet;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

const ACTIVITY_START: &str = "actstart";
const ACTIVITY_END: &str = "actend";
const ENTERS_VEHICLE: &str = "PersonEntersVehicle";
const LEAVES_VEHICLE: &str = "PersonLeavesVehicle";

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityEvent {
    pub time: f64,
    pub person: String,
    pub act_type: String,
    pub link: String,
    pub facility: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleEvent {
    pub time: f64,
    pub person: String,
    pub vehicle: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MobilityEvent {
    ActivityStart(ActivityEvent),
    ActivityEnd(ActivityEvent),
    PersonEntersVehicle(VehicleEvent),
    PersonLeavesVehicle(VehicleEvent),
}

impl MobilityEvent {
    #[must_use]
    pub fn activity_start(time: f64, person: &str, act_type: &str, facility: &str) -> Self {
        MobilityEvent::ActivityStart(ActivityEvent::at_facility(time, person, act_type, facility))
    }

    #[must_use]
    pub fn activity_end(time: f64, person: &str, act_type: &str, facility: &str) -> Self {
        MobilityEvent::ActivityEnd(ActivityEvent::at_facility(time, person, act_type, facility))
    }

    #[must_use]
    pub fn enters_vehicle(time: f64, person: &str, vehicle: &str) -> Self {
        MobilityEvent::PersonEntersVehicle(VehicleEvent::new(time, person, vehicle))
    }

    #[must_use]
    pub fn leaves_vehicle(time: f64, person: &str, vehicle: &str) -> Self {
        MobilityEvent::PersonLeavesVehicle(VehicleEvent::new(time, person, vehicle))
    }

    /// Sets the link of an activity event. Vehicle events are returned unchanged.
    #[must_use]
    pub fn with_link(mut self, link: &str) -> Self {
        if let MobilityEvent::ActivityStart(event) | MobilityEvent::ActivityEnd(event) = &mut self {
            event.link = link.to_string();
        }
        self
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        match self {
            MobilityEvent::ActivityStart(event) | MobilityEvent::ActivityEnd(event) => event.time,
            MobilityEvent::PersonEntersVehicle(event)
            | MobilityEvent::PersonLeavesVehicle(event) => event.time,
        }
    }

    #[must_use]
    pub fn person(&self) -> &str {
        match self {
            MobilityEvent::ActivityStart(event) | MobilityEvent::ActivityEnd(event) => {
                &event.person
            }
            MobilityEvent::PersonEntersVehicle(event)
            | MobilityEvent::PersonLeavesVehicle(event) => &event.person,
        }
    }

    /// Whether the engine processes this event at all. Stage activities and the
    /// movements of transit drivers and demand-responsive vehicles are ignored.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        match self {
            MobilityEvent::ActivityStart(event) | MobilityEvent::ActivityEnd(event) => {
                should_handle_activity_event(&event.person, &event.act_type)
            }
            MobilityEvent::PersonEntersVehicle(event)
            | MobilityEvent::PersonLeavesVehicle(event) => should_handle_person_event(&event.person),
        }
    }
}

impl ActivityEvent {
    #[must_use]
    pub fn at_facility(time: f64, person: &str, act_type: &str, facility: &str) -> Self {
        ActivityEvent {
            time,
            person: person.to_string(),
            act_type: act_type.to_string(),
            link: String::new(),
            facility: Some(facility.to_string()),
        }
    }

    /// The id of the facility this activity takes place in.
    ///
    /// # Errors
    ///
    /// `ConfigError` if facility ids are taken from events and this event has none.
    pub fn facility_id(&self, handling: FacilitiesHandling) -> Result<String, EpisimError> {
        match handling {
            FacilitiesHandling::Snz => self.facility.clone().ok_or_else(|| {
                EpisimError::ConfigError(format!(
                    "activity event of person {} at t={} carries no facility id",
                    self.person, self.time
                ))
            }),
            FacilitiesHandling::Bln => {
                let activity = self.act_type.split('_').next().unwrap_or(&self.act_type);
                Ok(format!("{activity}_{}", self.link))
            }
        }
    }
}

impl VehicleEvent {
    #[must_use]
    pub fn new(time: f64, person: &str, vehicle: &str) -> Self {
        VehicleEvent {
            time,
            person: person.to_string(),
            vehicle: vehicle.to_string(),
        }
    }
}

/// Stage activities are the short interaction activities between trip legs.
#[must_use]
pub fn is_stage_activity(act_type: &str) -> bool {
    act_type.ends_with(" interaction")
}

#[must_use]
pub fn should_handle_activity_event(person: &str, act_type: &str) -> bool {
    !(person.starts_with("drt") || person.starts_with("rt") || is_stage_activity(act_type))
}

#[must_use]
pub fn should_handle_person_event(person: &str) -> bool {
    !["pt_pt", "pt_tr", "drt", "rt"]
        .iter()
        .any(|prefix| person.starts_with(prefix))
}

/// Checks that every event lies within one day and the stream is ordered by time.
///
/// # Errors
///
/// `ConfigError` naming the first offending event.
pub fn validate_day(events: &[MobilityEvent]) -> Result<(), EpisimError> {
    let mut previous = 0.0;
    for (index, event) in events.iter().enumerate() {
        let time = event.time();
        if !(0.0..SECONDS_PER_DAY).contains(&time) {
            return Err(EpisimError::ConfigError(format!(
                "event {index} of person {} at t={time} lies outside [0, {SECONDS_PER_DAY})",
                event.person()
            )));
        }
        if time < previous {
            return Err(EpisimError::ConfigError(format!(
                "event {index} at t={time} comes after an event at t={previous}; events must be ordered by time"
            )));
        }
        previous = time;
    }
    Ok(())
}

/// One CSV row.
#[derive(Debug, Default, Serialize, Deserialize)]
struct EventRecord {
    time: f64,
    #[serde(rename = "type")]
    kind: String,
    person: String,
    #[serde(default)]
    act_type: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    facility: Option<String>,
    #[serde(default)]
    vehicle: Option<String>,
}

impl TryFrom<EventRecord> for MobilityEvent {
    type Error = EpisimError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let missing = |column: &str| {
            EpisimError::ConfigError(format!(
                "{} event of person {} at t={} has no {column}",
                record.kind, record.person, record.time
            ))
        };
        match record.kind.as_str() {
            ACTIVITY_START | ACTIVITY_END => {
                let event = ActivityEvent {
                    time: record.time,
                    person: record.person.clone(),
                    act_type: record.act_type.clone().ok_or_else(|| missing("act_type"))?,
                    link: record.link.clone().unwrap_or_default(),
                    facility: record.facility.clone().filter(|f| !f.is_empty()),
                };
                Ok(if record.kind == ACTIVITY_START {
                    MobilityEvent::ActivityStart(event)
                } else {
                    MobilityEvent::ActivityEnd(event)
                })
            }
            ENTERS_VEHICLE | LEAVES_VEHICLE => {
                let event = VehicleEvent {
                    time: record.time,
                    person: record.person.clone(),
                    vehicle: record.vehicle.clone().ok_or_else(|| missing("vehicle"))?,
                };
                Ok(if record.kind == ENTERS_VEHICLE {
                    MobilityEvent::PersonEntersVehicle(event)
                } else {
                    MobilityEvent::PersonLeavesVehicle(event)
                })
            }
            other => Err(EpisimError::ConfigError(format!(
                "unknown event type '{other}'"
            ))),
        }
    }
}

impl From<&MobilityEvent> for EventRecord {
    fn from(event: &MobilityEvent) -> Self {
        match event {
            MobilityEvent::ActivityStart(activity) | MobilityEvent::ActivityEnd(activity) => {
                EventRecord {
                    time: activity.time,
                    kind: if matches!(event, MobilityEvent::ActivityStart(_)) {
                        ACTIVITY_START
                    } else {
                        ACTIVITY_END
                    }
                    .to_string(),
                    person: activity.person.clone(),
                    act_type: Some(activity.act_type.clone()),
                    link: Some(activity.link.clone()),
                    facility: activity.facility.clone(),
                    vehicle: None,
                }
            }
            MobilityEvent::PersonEntersVehicle(vehicle)
            | MobilityEvent::PersonLeavesVehicle(vehicle) => EventRecord {
                time: vehicle.time,
                kind: if matches!(event, MobilityEvent::PersonEntersVehicle(_)) {
                    ENTERS_VEHICLE
                } else {
                    LEAVES_VEHICLE
                }
                .to_string(),
                person: vehicle.person.clone(),
                vehicle: Some(vehicle.vehicle.clone()),
                ..EventRecord::default()
            },
        }
    }
}

/// Reads events from any CSV source.
///
/// # Errors
///
/// Fails on malformed rows or unknown event types.
pub fn read_events_from_reader<R: Read>(reader: R) -> Result<Vec<MobilityEvent>, EpisimError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    reader
        .deserialize::<EventRecord>()
        .map(|record| MobilityEvent::try_from(record?))
        .collect()
}

/// Reads events from a CSV file.
///
/// # Errors
///
/// Fails if the file cannot be opened or `read_events_from_reader` fails.
pub fn read_events(path: &Path) -> Result<Vec<MobilityEvent>, EpisimError> {
    read_events_from_reader(File::open(path)?)
}

/// Writes events in the format `read_events` accepts.
///
/// # Errors
///
/// Fails if a row cannot be written.
pub fn write_events<W: Write>(writer: W, events: &[MobilityEvent]) -> Result<(), EpisimError> {
    let mut writer = csv::Writer::from_writer(writer);
    for event in events {
        writer.serialize(EventRecord::from(event))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reduces an event stream to a subset of persons.
pub struct EventFilter {
    persons: HashSet<String>,
}

/// What `EventFilter::apply` kept.
pub struct FilteredEvents {
    pub events: Vec<MobilityEvent>,
    /// Facilities visited by the kept persons, in order of first visit.
    pub facilities: IndexSet<String>,
}

impl EventFilter {
    pub fn new<I, S>(persons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EventFilter {
            persons: persons.into_iter().map(Into::into).collect(),
        }
    }

    /// Keeps the events of the selected persons.
    ///
    /// # Errors
    ///
    /// Fails if a facility id cannot be derived from a kept activity event.
    pub fn apply(
        &self,
        events: &[MobilityEvent],
        handling: FacilitiesHandling,
    ) -> Result<FilteredEvents, EpisimError> {
        let mut kept = Vec::new();
        let mut facilities = IndexSet::new();
        for event in events {
            if !self.persons.contains(event.person()) {
                continue;
            }
            if let MobilityEvent::ActivityStart(activity) | MobilityEvent::ActivityEnd(activity) =
                event
            {
                if should_handle_activity_event(&activity.person, &activity.act_type) {
                    facilities.insert(activity.facility_id(handling)?);
                }
            }
            kept.push(event.clone());
        }
        Ok(FilteredEvents {
            events: kept,
            facilities,
        })
    }
}
