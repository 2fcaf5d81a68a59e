//! Vehicle schedule types.
//!
//! [`VehicleSchedule`] holds the read-only stop-time input, validated and
//! sorted at construction. [`LoadedTrips`] is the per-iteration mutated copy
//! carrying simulated boards, alights and onboard counts.

use std::collections::HashMap;

use super::{SimTime, StopId, StopSequence, TripId};

/// Error from schedule validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("duplicate stop-time row for trip {trip} sequence {sequence}")]
    DuplicateRow {
        trip: TripId,
        sequence: StopSequence,
    },
    #[error("trip {trip} sequence {sequence}: departure precedes arrival")]
    DepartureBeforeArrival {
        trip: TripId,
        sequence: StopSequence,
    },
}

/// One scheduled (trip, stop, sequence) row with its vehicle capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeRecord {
    pub trip: TripId,
    pub stop: StopId,
    pub sequence: StopSequence,
    pub arrival: SimTime,
    pub departure: SimTime,
    /// Total seated-plus-standing capacity; `None` when the vehicle type has
    /// no configured capacity.
    pub capacity: Option<u32>,
}

/// The full stop-time schedule, sorted by (trip, sequence).
#[derive(Debug, Clone)]
pub struct VehicleSchedule {
    rows: Vec<StopTimeRecord>,
    // (trip, sequence) -> index into rows, for the board/alight time joins.
    index: HashMap<(TripId, StopSequence), usize>,
}

impl VehicleSchedule {
    /// Validates and sorts the input rows.
    pub fn new(mut rows: Vec<StopTimeRecord>) -> Result<Self, ScheduleError> {
        rows.sort_by_key(|r| (r.trip, r.sequence));
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.departure < row.arrival {
                return Err(ScheduleError::DepartureBeforeArrival {
                    trip: row.trip,
                    sequence: row.sequence,
                });
            }
            if index.insert((row.trip, row.sequence), i).is_some() {
                return Err(ScheduleError::DuplicateRow {
                    trip: row.trip,
                    sequence: row.sequence,
                });
            }
        }
        Ok(Self { rows, index })
    }

    /// Rows in (trip, sequence) order.
    pub fn rows(&self) -> &[StopTimeRecord] {
        &self.rows
    }

    /// Whether any vehicle in the schedule has a configured capacity.
    /// Bumping is skipped entirely when nothing does.
    pub fn has_capacity_configured(&self) -> bool {
        self.rows.iter().any(|r| r.capacity.is_some())
    }

    fn row_at(&self, trip: TripId, stop: StopId, sequence: StopSequence) -> Option<&StopTimeRecord> {
        self.index
            .get(&(trip, sequence))
            .map(|&i| &self.rows[i])
            .filter(|r| r.stop == stop)
    }

    /// Vehicle departure time at a boarding row, which is when the
    /// passenger boards.
    pub fn departure_at(
        &self,
        trip: TripId,
        stop: StopId,
        sequence: StopSequence,
    ) -> Option<SimTime> {
        self.row_at(trip, stop, sequence).map(|r| r.departure)
    }

    /// Vehicle arrival time at an alighting row, which is when the
    /// passenger alights.
    pub fn arrival_at(
        &self,
        trip: TripId,
        stop: StopId,
        sequence: StopSequence,
    ) -> Option<SimTime> {
        self.row_at(trip, stop, sequence).map(|r| r.arrival)
    }
}

/// One schedule row with this iteration's simulated load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRow {
    pub trip: TripId,
    pub stop: StopId,
    pub sequence: StopSequence,
    pub arrival: SimTime,
    pub departure: SimTime,
    pub capacity: Option<u32>,
    pub boards: u32,
    pub alights: u32,
    /// Running sum of boards minus alights in sequence order; never negative
    /// for well-formed passenger links.
    pub onboard: i64,
}

impl LoadedRow {
    /// How many passengers exceed capacity at this row. Zero when the
    /// vehicle has no configured capacity.
    pub fn overcap(&self) -> i64 {
        match self.capacity {
            Some(cap) => self.onboard - i64::from(cap),
            None => 0,
        }
    }
}

/// The schedule with one iteration's loads, in (trip, sequence) order.
#[derive(Debug, Clone)]
pub struct LoadedTrips {
    rows: Vec<LoadedRow>,
}

impl LoadedTrips {
    pub(crate) fn from_rows(rows: Vec<LoadedRow>) -> Self {
        Self { rows }
    }

    /// The schedule before anyone boards: every count zero. Written as the
    /// iteration-0 load profile.
    pub fn unloaded(schedule: &VehicleSchedule) -> Self {
        Self {
            rows: schedule
                .rows()
                .iter()
                .map(|r| LoadedRow {
                    trip: r.trip,
                    stop: r.stop,
                    sequence: r.sequence,
                    arrival: r.arrival,
                    departure: r.departure,
                    capacity: r.capacity,
                    boards: 0,
                    alights: 0,
                    onboard: 0,
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[LoadedRow] {
        &self.rows
    }

    /// Rows where the simulated load exceeds capacity.
    pub fn overcap_rows(&self) -> impl Iterator<Item = &LoadedRow> {
        self.rows.iter().filter(|r| r.overcap() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(hhmm: &str) -> SimTime {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        SimTime::parse_hhmm(hhmm, date).unwrap()
    }

    fn row(trip: u32, stop: u32, seq: u32, arr: &str, dep: &str) -> StopTimeRecord {
        StopTimeRecord {
            trip: TripId(trip),
            stop: StopId(stop),
            sequence: StopSequence(seq),
            arrival: t(arr),
            departure: t(dep),
            capacity: Some(40),
        }
    }

    #[test]
    fn rows_sorted_on_construction() {
        let schedule = VehicleSchedule::new(vec![
            row(2, 20, 1, "09:00", "09:01"),
            row(1, 11, 2, "08:10", "08:11"),
            row(1, 10, 1, "08:00", "08:01"),
        ])
        .unwrap();

        let order: Vec<_> = schedule
            .rows()
            .iter()
            .map(|r| (r.trip.0, r.sequence.0))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn duplicate_rows_rejected() {
        let err = VehicleSchedule::new(vec![
            row(1, 10, 1, "08:00", "08:01"),
            row(1, 10, 1, "08:00", "08:01"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DuplicateRow {
                trip: TripId(1),
                sequence: StopSequence(1),
            }
        );
    }

    #[test]
    fn departure_before_arrival_rejected() {
        let err = VehicleSchedule::new(vec![row(1, 10, 1, "08:05", "08:00")]).unwrap_err();
        assert!(matches!(err, ScheduleError::DepartureBeforeArrival { .. }));
    }

    #[test]
    fn time_joins_check_the_stop() {
        let schedule = VehicleSchedule::new(vec![row(1, 10, 1, "08:00", "08:01")]).unwrap();
        assert_eq!(
            schedule.departure_at(TripId(1), StopId(10), StopSequence(1)),
            Some(t("08:01"))
        );
        assert_eq!(
            schedule.arrival_at(TripId(1), StopId(10), StopSequence(1)),
            Some(t("08:00"))
        );
        // Right sequence, wrong stop: no match.
        assert_eq!(
            schedule.departure_at(TripId(1), StopId(99), StopSequence(1)),
            None
        );
    }

    #[test]
    fn capacity_configured_predicate() {
        let with = VehicleSchedule::new(vec![row(1, 10, 1, "08:00", "08:01")]).unwrap();
        assert!(with.has_capacity_configured());

        let mut no_cap = row(1, 10, 1, "08:00", "08:01");
        no_cap.capacity = None;
        let without = VehicleSchedule::new(vec![no_cap]).unwrap();
        assert!(!without.has_capacity_configured());
    }

    #[test]
    fn unloaded_profile_is_all_zero() {
        let schedule = VehicleSchedule::new(vec![
            row(1, 10, 1, "08:00", "08:01"),
            row(1, 11, 2, "08:10", "08:11"),
        ])
        .unwrap();
        let loaded = LoadedTrips::unloaded(&schedule);
        assert_eq!(loaded.rows().len(), 2);
        assert!(
            loaded
                .rows()
                .iter()
                .all(|r| r.boards == 0 && r.alights == 0 && r.onboard == 0)
        );
        assert_eq!(loaded.overcap_rows().count(), 0);
    }
}
