//! Candidate paths for one trip request.
//!
//! A [`Pathset`] is created the first time its request is searched and then
//! lives for the rest of the run. A re-search overwrites its contents in
//! place rather than recreating it, so anything holding the trip-list id can
//! keep referring to the same pathset across iterations.

use chrono::Duration;

use super::{LegMode, SimTime, StopId, StopSequence, TripId, TripListId};

/// Label and cost of one leg.
///
/// Deterministic searches report elapsed durations; stochastic searches
/// report abstract scores whose absolute scale only matters to the
/// capability. Keeping them as distinct variants stops durations and scores
/// from being compared to each other by accident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegWeight {
    /// Deterministic search: label and cost are elapsed time.
    Elapsed { label: Duration, cost: Duration },
    /// Stochastic search: label and cost are dimensionless scores.
    Score { label: f64, cost: f64 },
}

/// One decoded leg of a candidate path.
#[derive(Debug, Clone, PartialEq)]
pub struct LegRecord {
    pub mode: LegMode,
    /// Vehicle trip for transit legs, absent for access/egress/transfer.
    pub trip: Option<TripId>,
    /// Where the leg starts: a stop, or a zone id reused in the stop space
    /// for access legs.
    pub from_stop: StopId,
    /// Stop sequence at `from_stop` for transit legs.
    pub from_seq: Option<StopSequence>,
    pub to_stop: StopId,
    pub to_seq: Option<StopSequence>,
    /// Time leaving `from_stop`.
    pub depart: SimTime,
    /// Time reaching `to_stop`.
    pub arrive: SimTime,
    pub link_time: Duration,
    pub weight: LegWeight,
}

/// One candidate path: a cost, a selection probability and its legs in
/// travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct PathOption {
    pub cost: f64,
    pub probability: f64,
    pub legs: Vec<LegRecord>,
}

/// The candidate paths generated for one trip request.
#[derive(Debug, Clone)]
pub struct Pathset {
    trip_list_id: TripListId,
    paths: Vec<PathOption>,
}

impl Pathset {
    /// Creates an empty pathset for a request that has not been searched
    /// yet, or whose search found nothing.
    pub fn empty(trip_list_id: TripListId) -> Self {
        Self {
            trip_list_id,
            paths: Vec::new(),
        }
    }

    pub fn trip_list_id(&self) -> TripListId {
        self.trip_list_id
    }

    /// Overwrites the candidate paths with a fresh search result. The
    /// pathset itself survives; only its contents change.
    pub fn replace(&mut self, paths: Vec<PathOption>) {
        self.paths = paths;
    }

    /// Whether the last search produced at least one candidate.
    pub fn path_found(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathOption] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_in_place() {
        let mut ps = Pathset::empty(TripListId(9));
        assert!(!ps.path_found());

        ps.replace(vec![PathOption {
            cost: 12.0,
            probability: 1.0,
            legs: vec![],
        }]);
        assert!(ps.path_found());
        assert_eq!(ps.paths().len(), 1);

        ps.replace(vec![
            PathOption {
                cost: 10.0,
                probability: 0.6,
                legs: vec![],
            },
            PathOption {
                cost: 11.0,
                probability: 0.4,
                legs: vec![],
            },
        ]);
        assert_eq!(ps.paths().len(), 2);
        assert_eq!(ps.trip_list_id(), TripListId(9));
    }
}
