//! Passenger links: the boarding/alighting legs of chosen paths.

use super::{
    PathOption, PersonId, SimTime, StopId, StopSequence, TripId, TripListId, TripRequest,
    VehicleSchedule,
};

/// One boarding/alighting leg of a passenger's chosen path.
///
/// Derived fresh each iteration from the chosen path; the working link set is
/// what the loading simulator counts and the bumping resolver filters.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerLink {
    pub person_id: PersonId,
    pub trip_list_id: TripListId,
    /// Index of the chosen path within the request's pathset.
    pub path_num: usize,
    pub trip: TripId,
    pub board_stop: StopId,
    pub board_seq: StopSequence,
    pub alight_stop: StopId,
    pub alight_seq: StopSequence,
    /// When the passenger reached the boarding stop (end of the preceding
    /// access or transfer leg). Drives the eviction order: earlier arrivals
    /// keep their seats.
    pub stop_arrival: SimTime,
    /// Vehicle departure at the boarding row, if the row exists.
    pub board_time: Option<SimTime>,
    /// Vehicle arrival at the alighting row, if the row exists.
    pub alight_time: Option<SimTime>,
}

impl PassengerLink {
    /// Extracts the transit legs of a chosen path as passenger links, with
    /// board and alight times joined from the vehicle schedule.
    ///
    /// Legs that are not ridden aboard a vehicle (access, egress, transfer)
    /// contribute no link, but the time their leg ends is carried forward as
    /// the next link's arrival-at-stop time.
    pub fn from_chosen_path(
        request: &TripRequest,
        path_num: usize,
        path: &PathOption,
        schedule: &VehicleSchedule,
    ) -> Vec<PassengerLink> {
        let mut links = Vec::new();
        let mut prev_arrival: Option<SimTime> = None;

        for leg in &path.legs {
            if leg.mode.is_transit() {
                if let (Some(trip), Some(board_seq), Some(alight_seq)) =
                    (leg.trip, leg.from_seq, leg.to_seq)
                {
                    links.push(PassengerLink {
                        person_id: request.person_id.clone(),
                        trip_list_id: request.trip_list_id,
                        path_num,
                        trip,
                        board_stop: leg.from_stop,
                        board_seq,
                        alight_stop: leg.to_stop,
                        alight_seq,
                        stop_arrival: prev_arrival.unwrap_or(leg.depart),
                        board_time: schedule.departure_at(trip, leg.from_stop, board_seq),
                        alight_time: schedule.arrival_at(trip, leg.to_stop, alight_seq),
                    });
                }
            }
            prev_arrival = Some(leg.arrive);
        }

        links
    }
}
