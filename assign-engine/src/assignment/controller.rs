//! The iteration controller.
//!
//! Runs SEARCH, LOAD, BUMP and REPORT once per iteration until the capacity
//! gap converges, the mode is single-pass, or the iteration budget runs out.
//! Iteration 1 searches every request; later iterations search only the
//! requests bumped in the previous iteration and carry every other pathset
//! forward unchanged.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::bumping::{RunContext, bump_overcap_passengers};
use crate::dispatch::Dispatcher;
use crate::domain::{
    LoadedTrips, PassengerLink, Pathset, TripListId, TripRequest, VehicleSchedule,
};
use crate::loading::load_passengers;
use crate::report::{PerformanceRecord, Reporter};
use crate::search::{CapabilityFactory, SearchTask};

use super::config::{AssignmentConfig, AssignmentMode};
use super::error::AssignmentError;

/// Halt once fewer than this percentage of assigned passengers miss their
/// trips.
const CAPACITY_GAP_EPSILON: f64 = 0.001;

/// What the run ended with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Iterations actually run.
    pub iterations: u32,
    /// Passengers with a usable pathset in the final iteration.
    pub assigned: usize,
    /// Of those, how many completed their trip without being bumped.
    pub arrived: usize,
    /// 100 × (assigned − arrived) ÷ assigned in the final iteration.
    pub capacity_gap: f64,
}

/// Orchestrates one assignment run over immutable demand and schedule.
#[derive(Debug)]
pub struct Controller {
    config: AssignmentConfig,
    schedule: VehicleSchedule,
    requests: Vec<TripRequest>,
}

impl Controller {
    pub fn new(
        config: AssignmentConfig,
        schedule: VehicleSchedule,
        requests: Vec<TripRequest>,
    ) -> Self {
        Self {
            config,
            schedule,
            requests,
        }
    }

    /// Runs the whole assignment.
    pub fn run<F: CapabilityFactory>(
        &self,
        factory: &F,
        reporter: &Reporter,
    ) -> Result<RunSummary, AssignmentError> {
        self.config.validate()?;
        let mode = self.config.mode()?;
        let reference = self.config.reference_date()?;
        let policy = self.config.bump_policy();
        let capacity_active =
            self.config.capacity_constraint && self.schedule.has_capacity_configured();

        info!(
            mode = ?mode,
            iterations = self.config.iterations,
            capacity_constraint = capacity_active,
            requests = self.requests.len(),
            time_window_min = self.config.time_window_min,
            bump_buffer_min = self.config.bump_buffer_min,
            pathset_size = self.config.stochastic_pathset_size,
            dispersion = self.config.stochastic_dispersion,
            max_stop_process_count = self.config.stochastic_max_stop_process_count,
            "starting assignment run"
        );

        let dispatcher = Dispatcher::new(self.config.number_of_workers, reference);
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        // Run-lifetime mutable state: reset here, accumulated until the run
        // ends, and only ever touched by this coordinating thread.
        let mut ctx = RunContext::new();
        let mut pathsets: HashMap<TripListId, Pathset> = HashMap::new();
        let mut performance: Vec<PerformanceRecord> = Vec::new();

        reporter.write_load_profile(0, &LoadedTrips::unloaded(&self.schedule))?;

        let mut summary = RunSummary {
            iterations: 0,
            assigned: 0,
            arrived: 0,
            capacity_gap: 0.0,
        };

        for iteration in 1..=self.config.iterations {
            info!(iteration, "================ iteration {iteration} ================");

            // SEARCH: everyone on the first pass, only last iteration's
            // bumped requests afterwards.
            let tasks: Vec<SearchTask> = self
                .requests
                .iter()
                .filter(|r| r.goes_somewhere())
                .filter(|r| iteration == 1 || ctx.bumped_trip_lists().contains(&r.trip_list_id))
                .map(|request| SearchTask {
                    iteration,
                    stochastic: mode.is_stochastic(),
                    request: request.clone(),
                })
                .collect();

            let bump_wait = ctx.bump_wait_entries(reference);
            let outcome = dispatcher.dispatch(iteration, tasks, factory, &bump_wait)?;
            let not_found: HashSet<TripListId> = outcome.not_found().collect();
            for (trip_list, paths) in outcome.pathsets {
                pathsets
                    .entry(trip_list)
                    .or_insert_with(|| Pathset::empty(trip_list))
                    .replace(paths);
            }
            for (trip_list, counters) in outcome.counters {
                performance.push(PerformanceRecord::new(iteration, trip_list, counters));
            }

            // LOAD: choose a path per assigned passenger and derive links.
            let mut assigned = 0usize;
            let mut links: Vec<PassengerLink> = Vec::new();
            for request in &self.requests {
                if !request.goes_somewhere() || not_found.contains(&request.trip_list_id) {
                    continue;
                }
                let Some(pathset) = pathsets.get(&request.trip_list_id) else {
                    continue;
                };
                if !pathset.path_found() {
                    continue;
                }
                assigned += 1;
                let Some(path_num) = choose_path(mode, pathset, &mut rng) else {
                    continue;
                };
                links.extend(PassengerLink::from_chosen_path(
                    request,
                    path_num,
                    &pathset.paths()[path_num],
                    &self.schedule,
                ));
            }
            if assigned < self.requests.len() {
                warn!(
                    iteration,
                    assigned,
                    requests = self.requests.len(),
                    "some requests have no usable pathset this iteration"
                );
            }

            // BUMP: re-load and resolve until no boarding is over capacity.
            ctx.clear_bumped();
            let mut loaded = load_passengers(&self.schedule, &links);
            if capacity_active {
                let mut rounds = 0u32;
                loop {
                    let pass = bump_overcap_passengers(links, &loaded, policy, &mut ctx);
                    links = pass.links;
                    if !pass.had_overcap {
                        break;
                    }
                    rounds += 1;
                    debug!(iteration, rounds, evicted = pass.evicted, "bumping pass");
                    loaded = load_passengers(&self.schedule, &links);
                }
                info!(
                    iteration,
                    rounds,
                    bumped = ctx.bumped_trip_lists().len(),
                    "capacity constraints resolved"
                );
            }

            // REPORT.
            let bumped = ctx.bumped_trip_lists().len();
            let arrived = assigned.saturating_sub(bumped);
            let capacity_gap = if assigned == 0 {
                0.0
            } else {
                100.0 * bumped as f64 / assigned as f64
            };
            info!(
                iteration,
                assigned, arrived, missed = bumped, capacity_gap, "iteration complete"
            );
            reporter.write_load_profile(iteration, &loaded)?;
            reporter.write_path_times(iteration, &links)?;

            summary = RunSummary {
                iterations: iteration,
                assigned,
                arrived,
                capacity_gap,
            };

            if capacity_gap < CAPACITY_GAP_EPSILON {
                info!(iteration, capacity_gap, "capacity gap converged");
                break;
            }
            if mode.is_stochastic() {
                info!("stochastic assignment is single-pass");
                break;
            }
        }

        reporter.write_performance(&performance)?;
        info!(
            iterations = summary.iterations,
            assigned = summary.assigned,
            arrived = summary.arrived,
            capacity_gap = summary.capacity_gap,
            "assignment run finished"
        );
        Ok(summary)
    }
}

/// Picks the path a passenger rides this iteration: cheapest for
/// deterministic assignment, a probability-weighted draw for stochastic.
fn choose_path(mode: AssignmentMode, pathset: &Pathset, rng: &mut StdRng) -> Option<usize> {
    let paths = pathset.paths();
    if paths.is_empty() {
        return None;
    }
    match mode {
        AssignmentMode::Deterministic => paths
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cost.total_cmp(&b.cost))
            .map(|(num, _)| num),
        AssignmentMode::Stochastic => {
            let total: f64 = paths.iter().map(|p| p.probability).sum();
            if total <= 0.0 {
                return Some(0);
            }
            let mut draw = rng.random::<f64>() * total;
            for (num, path) in paths.iter().enumerate() {
                draw -= path.probability;
                if draw <= 0.0 {
                    return Some(num);
                }
            }
            Some(paths.len() - 1)
        }
    }
}
