//! Passenger trip requests.

use super::{PersonId, SimTime, TripListId, ZoneId};

/// Which way the search runs relative to the preferred time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Depart near the preferred time; the search labels backward from the
    /// destination.
    Outbound,
    /// Arrive near the preferred time; the search labels forward from the
    /// origin.
    Inbound,
}

/// One passenger's request for a trip, created once from demand input.
///
/// Requests are immutable for the whole run. Everything that changes between
/// iterations (the candidate paths, the chosen path, eviction state) lives
/// elsewhere, keyed by [`TripListId`].
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    pub person_id: PersonId,
    pub trip_list_id: TripListId,
    pub orig_zone: ZoneId,
    pub dest_zone: ZoneId,
    /// User class name forwarded to the search capability's weight lookup.
    pub user_class: String,
    pub access_modes: Vec<String>,
    pub transit_modes: Vec<String>,
    pub egress_modes: Vec<String>,
    pub direction: Direction,
    /// Preferred departure (outbound) or arrival (inbound) time.
    pub preferred_time: SimTime,
    /// Emit detailed search diagnostics for this passenger.
    pub trace: bool,
}

impl TripRequest {
    /// A request between identical zones has no path worth searching for.
    pub fn goes_somewhere(&self) -> bool {
        self.orig_zone != self.dest_zone
    }
}
