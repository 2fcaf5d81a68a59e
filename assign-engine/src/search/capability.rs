//! The seam to the external path-search capability.
//!
//! The label-setting search itself is an external collaborator. The engine
//! talks to it through [`SearchCapability`], one instance per worker, each
//! initialized with its own private copy of the network supply so that no
//! supply structure is ever shared between workers.

use serde::{Deserialize, Serialize};

use crate::domain::{StopId, StopSequence, TripId, TripRequest};

use super::error::SearchError;
use super::tables::RawPathset;

/// One bump-wait row pushed to the capability before a re-search: the
/// earliest arrival time (as a minute offset from the reference midnight)
/// among passengers evicted at that boarding row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumpWaitEntry {
    pub trip: TripId,
    pub stop: StopId,
    pub sequence: StopSequence,
    pub arrival_min: f64,
}

/// One unit of search work: a request plus the iteration context it is
/// searched under.
#[derive(Debug, Clone)]
pub struct SearchTask {
    pub iteration: u32,
    /// Hyperpath search with per-path probabilities, rather than a single
    /// deterministic shortest path.
    pub stochastic: bool,
    pub request: TripRequest,
}

/// A handle on the external search capability.
///
/// Calls are synchronous; the capability holds whatever mutable labeling
/// state it needs, which is why methods take `&mut self` and why every
/// worker owns its own instance.
pub trait SearchCapability: Send {
    /// Pushes the current bump-wait table so the search can account for
    /// passengers who could not board. Called once per worker before any
    /// task of an iteration after the first.
    fn set_bump_waits(&mut self, entries: &[BumpWaitEntry]);

    /// Searches one request, returning the raw result tables.
    fn find_pathset(&mut self, task: &SearchTask) -> Result<RawPathset, SearchError>;
}

/// Builds one capability per worker.
///
/// `build` loads a private, immutably-initialized copy of the network supply
/// and the global search parameters (time window, bump buffer, pathset size,
/// dispersion, stop-process cap). It runs on the worker's own thread, once,
/// before the worker takes its first task.
pub trait CapabilityFactory: Sync {
    type Capability: SearchCapability;

    fn build(&self, worker: usize) -> Result<Self::Capability, SearchError>;
}
