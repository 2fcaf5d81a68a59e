//! Vehicle loading simulator.
//!
//! Counts boards and alights for every (trip, stop, sequence) row of the
//! schedule from the working passenger-link set, and accumulates the onboard
//! count per trip. Rows must be processed in ascending sequence order within
//! a trip or the cumulative count is meaningless; `VehicleSchedule`
//! guarantees that order at construction.

use std::collections::HashMap;

use crate::domain::{
    LoadedRow, LoadedTrips, PassengerLink, StopId, StopSequence, TripId, VehicleSchedule,
};

/// Puts the passenger links onto the scheduled vehicles.
///
/// For every schedule row: boards is the number of links boarding there,
/// alights the number alighting there (zero when no link touches the row),
/// and onboard the running sum of boards minus alights along the trip,
/// seeded at zero before the first stop.
pub fn load_passengers(schedule: &VehicleSchedule, links: &[PassengerLink]) -> LoadedTrips {
    let mut boards: HashMap<(TripId, StopId, StopSequence), u32> = HashMap::new();
    let mut alights: HashMap<(TripId, StopId, StopSequence), u32> = HashMap::new();
    for link in links {
        *boards
            .entry((link.trip, link.board_stop, link.board_seq))
            .or_default() += 1;
        *alights
            .entry((link.trip, link.alight_stop, link.alight_seq))
            .or_default() += 1;
    }

    let mut rows = Vec::with_capacity(schedule.rows().len());
    let mut current_trip: Option<TripId> = None;
    let mut onboard: i64 = 0;

    for record in schedule.rows() {
        if current_trip != Some(record.trip) {
            current_trip = Some(record.trip);
            onboard = 0;
        }
        let key = (record.trip, record.stop, record.sequence);
        let board = boards.get(&key).copied().unwrap_or(0);
        let alight = alights.get(&key).copied().unwrap_or(0);
        onboard += i64::from(board) - i64::from(alight);

        rows.push(LoadedRow {
            trip: record.trip,
            stop: record.stop,
            sequence: record.sequence,
            arrival: record.arrival,
            departure: record.departure,
            capacity: record.capacity,
            boards: board,
            alights: alight,
            onboard,
        });
    }

    LoadedTrips::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PersonId, SimTime, StopTimeRecord, TripListId};
    use chrono::NaiveDate;

    fn t(hhmm: &str) -> SimTime {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        SimTime::parse_hhmm(hhmm, date).unwrap()
    }

    fn schedule() -> VehicleSchedule {
        let row = |trip, stop, seq, arr: &str, dep: &str| StopTimeRecord {
            trip: TripId(trip),
            stop: StopId(stop),
            sequence: StopSequence(seq),
            arrival: t(arr),
            departure: t(dep),
            capacity: Some(2),
        };
        VehicleSchedule::new(vec![
            row(1, 10, 1, "08:00", "08:01"),
            row(1, 11, 2, "08:10", "08:11"),
            row(1, 12, 3, "08:20", "08:21"),
            row(2, 10, 1, "09:00", "09:01"),
            row(2, 12, 2, "09:15", "09:16"),
        ])
        .unwrap()
    }

    fn link(n: u64, trip: u32, board: (u32, u32), alight: (u32, u32)) -> PassengerLink {
        PassengerLink {
            person_id: PersonId::from(format!("p{n}").as_str()),
            trip_list_id: TripListId(n),
            path_num: 0,
            trip: TripId(trip),
            board_stop: StopId(board.0),
            board_seq: StopSequence(board.1),
            alight_stop: StopId(alight.0),
            alight_seq: StopSequence(alight.1),
            stop_arrival: t("07:55"),
            board_time: None,
            alight_time: None,
        }
    }

    #[test]
    fn counts_boards_alights_and_onboard() {
        let links = vec![
            link(1, 1, (10, 1), (12, 3)),
            link(2, 1, (10, 1), (11, 2)),
            link(3, 1, (11, 2), (12, 3)),
        ];
        let loaded = load_passengers(&schedule(), &links);
        let by_row: Vec<_> = loaded
            .rows()
            .iter()
            .map(|r| (r.trip.0, r.sequence.0, r.boards, r.alights, r.onboard))
            .collect();
        assert_eq!(
            by_row,
            vec![
                (1, 1, 2, 0, 2),
                (1, 2, 1, 1, 2),
                (1, 3, 0, 2, 0),
                (2, 1, 0, 0, 0),
                (2, 2, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn rows_without_links_count_zero() {
        let loaded = load_passengers(&schedule(), &[]);
        assert!(
            loaded
                .rows()
                .iter()
                .all(|r| r.boards == 0 && r.alights == 0 && r.onboard == 0)
        );
    }

    #[test]
    fn onboard_resets_between_trips() {
        let links = vec![link(1, 1, (10, 1), (12, 3)), link(2, 2, (10, 1), (12, 2))];
        let loaded = load_passengers(&schedule(), &links);
        // Trip 1 still has a rider at its last row's predecessor; trip 2
        // starts from zero regardless.
        let trip2_first = loaded
            .rows()
            .iter()
            .find(|r| r.trip == TripId(2))
            .unwrap();
        assert_eq!(trip2_first.onboard, 1);
        assert_eq!(trip2_first.boards, 1);
    }

    #[test]
    fn overcap_rows_detected() {
        let links = vec![
            link(1, 1, (10, 1), (12, 3)),
            link(2, 1, (10, 1), (12, 3)),
            link(3, 1, (10, 1), (12, 3)),
        ];
        let loaded = load_passengers(&schedule(), &links);
        let overcap: Vec<_> = loaded.overcap_rows().map(|r| (r.sequence.0, r.overcap())).collect();
        // Capacity 2, three riders from seq 1 through seq 2.
        assert_eq!(overcap, vec![(1, 1), (2, 1)]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{PersonId, SimTime, StopTimeRecord, TripListId};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const TRIPS: u32 = 3;
    const STOPS_PER_TRIP: u32 = 6;

    fn schedule() -> VehicleSchedule {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        let mut rows = Vec::new();
        for trip in 0..TRIPS {
            for seq in 1..=STOPS_PER_TRIP {
                let arr = SimTime::from_minutes_after_midnight(
                    date,
                    480.0 + f64::from(trip) * 60.0 + f64::from(seq) * 5.0,
                )
                .unwrap();
                rows.push(StopTimeRecord {
                    trip: TripId(trip),
                    stop: StopId(100 + seq),
                    sequence: StopSequence(seq),
                    arrival: arr,
                    departure: arr + chrono::Duration::minutes(1),
                    capacity: None,
                });
            }
        }
        VehicleSchedule::new(rows).unwrap()
    }

    prop_compose! {
        /// A link boarding before it alights on one of the fixture trips.
        fn arb_link(n: u64)(
            trip in 0..TRIPS,
            board in 1..STOPS_PER_TRIP,
            extra in 1u32..STOPS_PER_TRIP,
        ) -> PassengerLink {
            let alight = (board + extra).min(STOPS_PER_TRIP);
            PassengerLink {
                person_id: PersonId::from(format!("p{n}").as_str()),
                trip_list_id: TripListId(n),
                path_num: 0,
                trip: TripId(trip),
                board_stop: StopId(100 + board),
                board_seq: StopSequence(board),
                alight_stop: StopId(100 + alight),
                alight_seq: StopSequence(alight),
                stop_arrival: SimTime::from_minutes_after_midnight(
                    NaiveDate::from_ymd_opt(2015, 3, 9).unwrap(),
                    470.0,
                )
                .unwrap(),
                board_time: None,
                alight_time: None,
            }
        }
    }

    fn arb_links() -> impl Strategy<Value = Vec<PassengerLink>> {
        prop::collection::vec(any::<u64>().prop_flat_map(arb_link), 0..40)
    }

    proptest! {
        /// Total boards equal total alights on every trip.
        #[test]
        fn boards_balance_alights(links in arb_links()) {
            let loaded = load_passengers(&schedule(), &links);
            let mut boards: HashMap<TripId, u64> = HashMap::new();
            let mut alights: HashMap<TripId, u64> = HashMap::new();
            for row in loaded.rows() {
                *boards.entry(row.trip).or_default() += u64::from(row.boards);
                *alights.entry(row.trip).or_default() += u64::from(row.alights);
            }
            prop_assert_eq!(boards, alights);
        }

        /// Onboard obeys the cumulative recurrence and never goes negative.
        #[test]
        fn onboard_recurrence(links in arb_links()) {
            let loaded = load_passengers(&schedule(), &links);
            let mut prev: Option<(TripId, i64)> = None;
            for row in loaded.rows() {
                let carried = match prev {
                    Some((trip, onboard)) if trip == row.trip => onboard,
                    _ => 0,
                };
                prop_assert_eq!(
                    row.onboard,
                    carried + i64::from(row.boards) - i64::from(row.alights)
                );
                prop_assert!(row.onboard >= 0);
                prev = Some((row.trip, row.onboard));
            }
        }

        /// Every link is counted exactly once at each end.
        #[test]
        fn link_conservation(links in arb_links()) {
            let loaded = load_passengers(&schedule(), &links);
            let total_boards: u64 = loaded.rows().iter().map(|r| u64::from(r.boards)).sum();
            prop_assert_eq!(total_boards, links.len() as u64);
        }
    }
}
