//! Input seam for demand and schedule data.
//!
//! Real network and demand ingestion lives with external collaborators;
//! these loaders only read the already-prepared JSON tables and build the
//! validated domain types, anchoring minute offsets to the run's reference
//! date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{
    Direction, PersonId, ScheduleError, SimTime, StopId, StopSequence, StopTimeRecord, TimeError,
    TripId, TripListId, TripRequest, VehicleSchedule, ZoneId,
};

/// Errors reading demand or schedule input.
#[derive(Debug, thiserror::Error)]
pub enum DemandError {
    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid direction {0:?}; expected \"outbound\" or \"inbound\"")]
    InvalidDirection(String),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DemandError> {
    let json = std::fs::read_to_string(path).map_err(|e| DemandError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&json).map_err(|e| DemandError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn default_user_class() -> String {
    "generic_user_class".to_string()
}

fn default_walk_modes() -> Vec<String> {
    vec!["walk".to_string()]
}

fn default_transit_modes() -> Vec<String> {
    vec!["transit".to_string()]
}

#[derive(Debug, Deserialize)]
struct TripRecord {
    person_id: String,
    trip_list_id: u64,
    orig_zone: u32,
    dest_zone: u32,
    #[serde(default = "default_user_class")]
    user_class: String,
    #[serde(default = "default_walk_modes")]
    access_modes: Vec<String>,
    #[serde(default = "default_transit_modes")]
    transit_modes: Vec<String>,
    #[serde(default = "default_walk_modes")]
    egress_modes: Vec<String>,
    direction: String,
    preferred_time_min: f64,
    #[serde(default)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: u32,
    stop_id: u32,
    stop_sequence: u32,
    arrival_min: f64,
    departure_min: f64,
    #[serde(default)]
    capacity: Option<u32>,
}

fn parse_direction(raw: &str) -> Result<Direction, DemandError> {
    match raw {
        "outbound" => Ok(Direction::Outbound),
        "inbound" => Ok(Direction::Inbound),
        other => Err(DemandError::InvalidDirection(other.to_string())),
    }
}

/// Loads the trip list of passenger requests.
pub fn load_trip_list(
    path: impl AsRef<Path>,
    reference: NaiveDate,
) -> Result<Vec<TripRequest>, DemandError> {
    let records: Vec<TripRecord> = read_json(path.as_ref())?;
    records
        .into_iter()
        .map(|record| {
            Ok(TripRequest {
                person_id: PersonId(record.person_id),
                trip_list_id: TripListId(record.trip_list_id),
                orig_zone: ZoneId(record.orig_zone),
                dest_zone: ZoneId(record.dest_zone),
                user_class: record.user_class,
                access_modes: record.access_modes,
                transit_modes: record.transit_modes,
                egress_modes: record.egress_modes,
                direction: parse_direction(&record.direction)?,
                preferred_time: SimTime::from_minutes_after_midnight(
                    reference,
                    record.preferred_time_min,
                )?,
                trace: record.trace,
            })
        })
        .collect()
}

/// Loads the vehicle stop-time schedule with capacities.
pub fn load_schedule(
    path: impl AsRef<Path>,
    reference: NaiveDate,
) -> Result<VehicleSchedule, DemandError> {
    let rows: Vec<StopTimeRow> = read_json(path.as_ref())?;
    let records = rows
        .into_iter()
        .map(|row| {
            Ok(StopTimeRecord {
                trip: TripId(row.trip_id),
                stop: StopId(row.stop_id),
                sequence: StopSequence(row.stop_sequence),
                arrival: SimTime::from_minutes_after_midnight(reference, row.arrival_min)?,
                departure: SimTime::from_minutes_after_midnight(reference, row.departure_min)?,
                capacity: row.capacity,
            })
        })
        .collect::<Result<Vec<_>, DemandError>>()?;
    Ok(VehicleSchedule::new(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 3, 9).unwrap()
    }

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn trip_list_loads_with_defaults() {
        let file = write_file(
            r#"[
                {
                    "person_id": "alice",
                    "trip_list_id": 1,
                    "orig_zone": 100,
                    "dest_zone": 200,
                    "direction": "outbound",
                    "preferred_time_min": 480.0
                },
                {
                    "person_id": "bob",
                    "trip_list_id": 2,
                    "orig_zone": 100,
                    "dest_zone": 300,
                    "direction": "inbound",
                    "preferred_time_min": 510.0,
                    "user_class": "generic_user_class",
                    "trace": true
                }
            ]"#,
        );

        let requests = load_trip_list(file.path(), reference()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].person_id, PersonId::from("alice"));
        assert_eq!(requests[0].direction, Direction::Outbound);
        assert_eq!(requests[0].access_modes, vec!["walk".to_string()]);
        assert_eq!(requests[0].preferred_time.to_string(), "08:00:00");
        assert!(!requests[0].trace);
        assert_eq!(requests[1].direction, Direction::Inbound);
        assert!(requests[1].trace);
    }

    #[test]
    fn bad_direction_rejected() {
        let file = write_file(
            r#"[{
                "person_id": "alice",
                "trip_list_id": 1,
                "orig_zone": 100,
                "dest_zone": 200,
                "direction": "sideways",
                "preferred_time_min": 480.0
            }]"#,
        );
        assert!(matches!(
            load_trip_list(file.path(), reference()),
            Err(DemandError::InvalidDirection(_))
        ));
    }

    #[test]
    fn schedule_loads_sorted_with_optional_capacity() {
        let file = write_file(
            r#"[
                {"trip_id": 2, "stop_id": 20, "stop_sequence": 1,
                 "arrival_min": 540.0, "departure_min": 541.0},
                {"trip_id": 1, "stop_id": 10, "stop_sequence": 1,
                 "arrival_min": 480.0, "departure_min": 481.0, "capacity": 40}
            ]"#,
        );

        let schedule = load_schedule(file.path(), reference()).unwrap();
        assert_eq!(schedule.rows().len(), 2);
        assert_eq!(schedule.rows()[0].trip, TripId(1));
        assert_eq!(schedule.rows()[0].capacity, Some(40));
        assert_eq!(schedule.rows()[1].capacity, None);
        assert!(schedule.has_capacity_configured());
    }

    #[test]
    fn unreadable_and_unparsable_files_reported() {
        assert!(matches!(
            load_trip_list("/nonexistent/trips.json", reference()),
            Err(DemandError::Read { .. })
        ));
        let file = write_file("not json");
        assert!(matches!(
            load_schedule(file.path(), reference()),
            Err(DemandError::Parse { .. })
        ));
    }
}
