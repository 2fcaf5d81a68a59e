//! Capacity bumping resolver.
//!
//! Given loaded vehicle rows and the working passenger-link set, removes
//! just enough passengers to clear every over-capacity boarding, in a
//! deterministic order: passengers who reached the stop earliest keep their
//! places; later arrivals go first, with the higher trip-list id breaking
//! exact ties. Evictions feed the run-scoped [`RunContext`] so the next
//! iteration's search knows who could not board, and when.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{debug, info};

use crate::domain::{
    LoadedRow, LoadedTrips, PassengerLink, PersonId, SimTime, StopId, StopSequence, TripId,
    TripListId,
};
use crate::search::BumpWaitEntry;

/// How aggressively one resolver pass clears over-capacity rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpPolicy {
    /// Resolve every affected trip's first over-capacity row in one pass.
    ///
    /// Fast, but can over-bump: evicting a passenger who rode several
    /// crowded vehicles frees space elsewhere that this pass does not see.
    Batch,
    /// Resolve only the single earliest-arriving over-capacity row across
    /// all trips, then let the caller re-load and call again. More passes,
    /// more accurate.
    OneAtATime,
}

/// Run-lifetime assignment state, owned by the iteration controller and
/// threaded by reference into the resolver.
///
/// The bump-wait table accumulates monotonically for the whole run: keys are
/// never removed, values are overwritten by the latest pass that evicts at
/// that row. The bumped-id sets are per-iteration: cleared at the start of
/// each loading pass, then read by the controller to scope the next
/// iteration's search.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    bump_wait: BTreeMap<(TripId, StopId, StopSequence), SimTime>,
    bumped_persons: HashSet<PersonId>,
    bumped_trip_lists: HashSet<TripListId>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-iteration bumped-id sets. The bump-wait table is
    /// deliberately left alone; it lives for the whole run.
    pub fn clear_bumped(&mut self) {
        self.bumped_persons.clear();
        self.bumped_trip_lists.clear();
    }

    pub fn bumped_persons(&self) -> &HashSet<PersonId> {
        &self.bumped_persons
    }

    pub fn bumped_trip_lists(&self) -> &HashSet<TripListId> {
        &self.bumped_trip_lists
    }

    pub fn bump_wait(&self) -> &BTreeMap<(TripId, StopId, StopSequence), SimTime> {
        &self.bump_wait
    }

    /// The bump-wait table in the form the search capability consumes,
    /// in deterministic key order.
    pub fn bump_wait_entries(&self, reference: NaiveDate) -> Vec<BumpWaitEntry> {
        self.bump_wait
            .iter()
            .map(|(&(trip, stop, sequence), time)| BumpWaitEntry {
                trip,
                stop,
                sequence,
                arrival_min: time.minutes_after_midnight(reference),
            })
            .collect()
    }
}

/// Result of one resolver pass.
#[derive(Debug)]
pub struct BumpPass {
    /// Whether the pass found any over-capacity row. The caller keeps
    /// re-loading and re-invoking until a pass reports `false`.
    pub had_overcap: bool,
    /// Distinct passengers evicted by this pass.
    pub evicted: usize,
    /// The working link set with every evicted passenger's entire path
    /// removed.
    pub links: Vec<PassengerLink>,
}

struct Candidate {
    link_idx: usize,
    veh_arrival: SimTime,
    trip: TripId,
    sequence: StopSequence,
    stop: StopId,
    pax_arrival: SimTime,
    trip_list: TripListId,
    overcap: i64,
}

/// Evicts passengers from over-capacity boardings.
///
/// Returns immediately with `had_overcap == false` and the link set
/// untouched when no row is over capacity, which also makes the resolver
/// idempotent once the loads are feasible.
pub fn bump_overcap_passengers(
    mut links: Vec<PassengerLink>,
    loaded: &LoadedTrips,
    policy: BumpPolicy,
    ctx: &mut RunContext,
) -> BumpPass {
    let overcap_total = loaded.overcap_rows().count();
    if overcap_total == 0 {
        debug!("no overcapacity vehicles");
        return BumpPass {
            had_overcap: false,
            evicted: 0,
            links,
        };
    }

    // Boarding past a trip's first over-capacity row is infeasible, so each
    // trip is resolved at that row. Rows arrive in (trip, sequence) order,
    // so consecutive grouping gives the earliest-sequence row per trip.
    let groups = loaded.overcap_rows().chunk_by(|r| r.trip);
    let first_per_trip = groups.into_iter().filter_map(|(_, mut rows)| rows.next());

    let selected: Vec<&LoadedRow> = match policy {
        BumpPolicy::Batch => first_per_trip.collect(),
        BumpPolicy::OneAtATime => first_per_trip
            .min_by_key(|r| (r.arrival, r.trip, r.sequence, r.stop))
            .into_iter()
            .collect(),
    };

    info!(
        overcap_rows = overcap_total,
        bump_rows = selected.len(),
        "resolving overcapacity boardings"
    );

    let selected_rows: HashMap<(TripId, StopId, StopSequence), &LoadedRow> = selected
        .iter()
        .map(|r| ((r.trip, r.stop, r.sequence), *r))
        .collect();

    // Everyone boarding at a selected row is an eviction candidate.
    let mut candidates: Vec<Candidate> = links
        .iter()
        .enumerate()
        .filter_map(|(link_idx, link)| {
            let row = selected_rows.get(&(link.trip, link.board_stop, link.board_seq))?;
            Some(Candidate {
                link_idx,
                veh_arrival: row.arrival,
                trip: link.trip,
                sequence: link.board_seq,
                stop: link.board_stop,
                pax_arrival: link.stop_arrival,
                trip_list: link.trip_list_id,
                overcap: row.overcap(),
            })
        })
        .collect();

    // Earliest-arriving passengers are retained; within a row, later stop
    // arrivals are evicted first, then the higher trip-list id.
    candidates.sort_by(|a, b| {
        a.veh_arrival
            .cmp(&b.veh_arrival)
            .then(a.trip.cmp(&b.trip))
            .then(a.sequence.cmp(&b.sequence))
            .then(a.stop.cmp(&b.stop))
            .then(b.pax_arrival.cmp(&a.pax_arrival))
            .then(b.trip_list.cmp(&a.trip_list))
    });

    let mut rank: HashMap<(TripId, StopSequence, StopId), i64> = HashMap::new();
    let mut evicted_trip_lists: HashSet<TripListId> = HashSet::new();
    let mut wait_updates: HashMap<(TripId, StopId, StopSequence), SimTime> = HashMap::new();

    for candidate in &candidates {
        let slot = rank
            .entry((candidate.trip, candidate.sequence, candidate.stop))
            .or_insert(0);
        let this_rank = *slot;
        *slot += 1;
        if this_rank >= candidate.overcap {
            continue;
        }

        // A passenger boarding twice among the selected rows is evicted
        // (and recorded) at most once.
        if !evicted_trip_lists.insert(candidate.trip_list) {
            continue;
        }
        let link = &links[candidate.link_idx];
        debug!(
            person = %link.person_id,
            trip_list = %link.trip_list_id,
            trip = %candidate.trip,
            stop = %candidate.stop,
            "bumping passenger"
        );
        ctx.bumped_persons.insert(link.person_id.clone());
        ctx.bumped_trip_lists.insert(link.trip_list_id);

        wait_updates
            .entry((candidate.trip, candidate.stop, candidate.sequence))
            .and_modify(|earliest| {
                if candidate.pax_arrival < *earliest {
                    *earliest = candidate.pax_arrival;
                }
            })
            .or_insert(candidate.pax_arrival);
    }

    // Latest write wins per key; keys only ever accumulate.
    for (key, earliest) in wait_updates {
        ctx.bump_wait.insert(key, earliest);
    }

    let before = links.len();
    links.retain(|l| !evicted_trip_lists.contains(&l.trip_list_id));
    info!(
        evicted = evicted_trip_lists.len(),
        links_before = before,
        links_after = links.len(),
        "bumped passengers removed from working set"
    );

    BumpPass {
        had_overcap: true,
        evicted: evicted_trip_lists.len(),
        links,
    }
}
