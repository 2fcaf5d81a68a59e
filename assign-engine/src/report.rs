//! Report writers for the assignment's collaborators.
//!
//! Three tabular outputs per run: a vehicle load profile per iteration
//! (including iteration 0, the unloaded schedule), the chosen-path time
//! records per iteration, and one performance file with the search counters
//! per (iteration, trip-list id).

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{LoadedTrips, PassengerLink, TripListId};
use crate::search::SearchCounters;

/// Errors writing report files.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct LoadProfileRow {
    trip_id: u32,
    stop_id: u32,
    stop_sequence: u32,
    arrival: String,
    departure: String,
    capacity: Option<u32>,
    boards: u32,
    alights: u32,
    onboard: i64,
}

#[derive(Debug, Serialize)]
struct PathTimeRow {
    person_id: String,
    trip_list_id: u64,
    path_num: usize,
    trip_id: u32,
    board_stop: u32,
    board_seq: u32,
    alight_stop: u32,
    alight_seq: u32,
    stop_arrival: String,
    board_time: Option<String>,
    alight_time: Option<String>,
}

/// Search performance counters for one completed request.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub iteration: u32,
    pub trip_list_id: u64,
    pub label_iterations: u64,
    pub max_stop_process_count: u64,
    pub time_labeling_ms: f64,
    pub time_enumerating_ms: f64,
}

impl PerformanceRecord {
    pub fn new(iteration: u32, trip_list_id: TripListId, counters: SearchCounters) -> Self {
        Self {
            iteration,
            trip_list_id: trip_list_id.0,
            label_iterations: counters.label_iterations,
            max_stop_process_count: counters.max_stop_process_count,
            time_labeling_ms: counters.time_labeling_ms,
            time_enumerating_ms: counters.time_enumerating_ms,
        }
    }
}

/// Writes the run's report files into one output directory.
#[derive(Debug)]
pub struct Reporter {
    out_dir: PathBuf,
}

impl Reporter {
    /// Creates the output directory if needed.
    pub fn new(out_dir: impl AsRef<Path>) -> Result<Self, ReportError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Writes `load_profile_iterNN.csv` for one iteration.
    pub fn write_load_profile(
        &self,
        iteration: u32,
        loaded: &LoadedTrips,
    ) -> Result<(), ReportError> {
        let path = self.out_dir.join(format!("load_profile_iter{iteration:02}.csv"));
        let mut writer = csv::Writer::from_path(path)?;
        for row in loaded.rows() {
            writer.serialize(LoadProfileRow {
                trip_id: row.trip.0,
                stop_id: row.stop.0,
                stop_sequence: row.sequence.0,
                arrival: row.arrival.to_string(),
                departure: row.departure.to_string(),
                capacity: row.capacity,
                boards: row.boards,
                alights: row.alights,
                onboard: row.onboard,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `path_times_iterNN.csv`: the surviving chosen-path links with
    /// their vehicle board and alight times.
    pub fn write_path_times(
        &self,
        iteration: u32,
        links: &[PassengerLink],
    ) -> Result<(), ReportError> {
        let path = self.out_dir.join(format!("path_times_iter{iteration:02}.csv"));
        let mut writer = csv::Writer::from_path(path)?;
        for link in links {
            writer.serialize(PathTimeRow {
                person_id: link.person_id.to_string(),
                trip_list_id: link.trip_list_id.0,
                path_num: link.path_num,
                trip_id: link.trip.0,
                board_stop: link.board_stop.0,
                board_seq: link.board_seq.0,
                alight_stop: link.alight_stop.0,
                alight_seq: link.alight_seq.0,
                stop_arrival: link.stop_arrival.to_string(),
                board_time: link.board_time.map(|t| t.to_string()),
                alight_time: link.alight_time.map(|t| t.to_string()),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `performance.csv` for the whole run.
    pub fn write_performance(&self, records: &[PerformanceRecord]) -> Result<(), ReportError> {
        let path = self.out_dir.join("performance.csv");
        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        PersonId, SimTime, StopId, StopSequence, StopTimeRecord, TripId, VehicleSchedule,
    };
    use chrono::NaiveDate;

    fn t(hhmm: &str) -> SimTime {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        SimTime::parse_hhmm(hhmm, date).unwrap()
    }

    fn schedule() -> VehicleSchedule {
        VehicleSchedule::new(vec![
            StopTimeRecord {
                trip: TripId(1),
                stop: StopId(10),
                sequence: StopSequence(1),
                arrival: t("08:00"),
                departure: t("08:01"),
                capacity: Some(40),
            },
            StopTimeRecord {
                trip: TripId(1),
                stop: StopId(11),
                sequence: StopSequence(2),
                arrival: t("08:10"),
                departure: t("08:11"),
                capacity: None,
            },
        ])
        .unwrap()
    }

    #[test]
    fn load_profile_shape() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path()).unwrap();
        reporter
            .write_load_profile(0, &LoadedTrips::unloaded(&schedule()))
            .unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("load_profile_iter00.csv")).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "trip_id,stop_id,stop_sequence,arrival,departure,capacity,boards,alights,onboard"
        );
        assert_eq!(lines.clone().count(), 2);
        assert!(lines.next().unwrap().starts_with("1,10,1,08:00:00,08:01:00,40,0,0,0"));
    }

    #[test]
    fn path_times_include_missing_vehicle_times_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path()).unwrap();
        let link = PassengerLink {
            person_id: PersonId::from("p1"),
            trip_list_id: crate::domain::TripListId(3),
            path_num: 0,
            trip: TripId(1),
            board_stop: StopId(10),
            board_seq: StopSequence(1),
            alight_stop: StopId(11),
            alight_seq: StopSequence(2),
            stop_arrival: t("07:58"),
            board_time: Some(t("08:01")),
            alight_time: None,
        };
        reporter.write_path_times(2, &[link]).unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("path_times_iter02.csv")).unwrap();
        let row = written.lines().nth(1).unwrap();
        assert_eq!(row, "p1,3,0,1,10,1,11,2,07:58:00,08:01:00,");
    }

    #[test]
    fn performance_rows_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path()).unwrap();
        let records = vec![
            PerformanceRecord::new(
                1,
                TripListId(5),
                SearchCounters {
                    label_iterations: 12,
                    max_stop_process_count: 3,
                    time_labeling_ms: 4.5,
                    time_enumerating_ms: 0.5,
                },
            ),
            PerformanceRecord::new(2, TripListId(5), SearchCounters::default()),
        ];
        reporter.write_performance(&records).unwrap();

        let written = std::fs::read_to_string(dir.path().join("performance.csv")).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(written.lines().nth(1).unwrap().starts_with("1,5,12,3,4.5,0.5"));
    }

    #[test]
    fn nested_output_dir_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let reporter = Reporter::new(&nested).unwrap();
        assert!(nested.is_dir());
        reporter.write_performance(&[]).unwrap();
        assert!(nested.join("performance.csv").exists());
    }
}
