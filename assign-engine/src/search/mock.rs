//! Fixture search capability.
//!
//! Serves canned raw result tables keyed by trip-list id, as if they came
//! from the real label-setting search. Useful for development runs without
//! the external capability and for exercising the dispatcher's fault paths
//! in tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::domain::TripListId;

use super::capability::{BumpWaitEntry, CapabilityFactory, SearchCapability, SearchTask};
use super::error::SearchError;
use super::tables::RawPathset;

/// A capability that answers every search from a fixed table.
///
/// Requests with no fixture entry get an empty result, which the controller
/// counts as path-not-found. Each clone is an independent instance, so the
/// factory below gives every worker its own private copy, mirroring how the
/// real capability is initialized per worker.
#[derive(Debug, Clone, Default)]
pub struct FixtureCapability {
    pathsets: HashMap<TripListId, RawPathset>,
    bump_waits: Vec<BumpWaitEntry>,
}

impl FixtureCapability {
    pub fn new(pathsets: HashMap<TripListId, RawPathset>) -> Self {
        Self {
            pathsets,
            bump_waits: Vec::new(),
        }
    }

    /// The bump-wait entries pushed so far, for test assertions.
    pub fn bump_waits(&self) -> &[BumpWaitEntry] {
        &self.bump_waits
    }
}

impl SearchCapability for FixtureCapability {
    fn set_bump_waits(&mut self, entries: &[BumpWaitEntry]) {
        self.bump_waits = entries.to_vec();
    }

    fn find_pathset(&mut self, task: &SearchTask) -> Result<RawPathset, SearchError> {
        Ok(self
            .pathsets
            .get(&task.request.trip_list_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Builds a private [`FixtureCapability`] per worker.
#[derive(Debug, Clone, Default)]
pub struct FixtureFactory {
    pathsets: HashMap<TripListId, RawPathset>,
}

impl FixtureFactory {
    pub fn new(pathsets: HashMap<TripListId, RawPathset>) -> Self {
        Self { pathsets }
    }

    /// Loads fixtures from a JSON file mapping trip-list ids to raw
    /// pathsets.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SearchError::Capability {
            message: format!("failed to read fixture file {}: {e}", path.display()),
        })?;
        let by_id: HashMap<u64, RawPathset> =
            serde_json::from_str(&json).map_err(|e| SearchError::Capability {
                message: format!("failed to parse fixture file {}: {e}", path.display()),
            })?;
        Ok(Self::new(
            by_id
                .into_iter()
                .map(|(id, raw)| (TripListId(id), raw))
                .collect(),
        ))
    }
}

impl CapabilityFactory for FixtureFactory {
    type Capability = FixtureCapability;

    fn build(&self, _worker: usize) -> Result<FixtureCapability, SearchError> {
        Ok(FixtureCapability::new(self.pathsets.clone()))
    }
}

/// A fixture capability with scripted faults, for dispatcher tests.
#[derive(Debug, Clone, Default)]
pub struct FaultyFactory {
    pub fixtures: FixtureFactory,
    /// Trip-list ids whose search reports a capability error.
    pub fail_on: HashSet<TripListId>,
    /// Trip-list ids whose search panics, simulating a worker death.
    pub panic_on: HashSet<TripListId>,
    /// Workers whose capability fails to initialize.
    pub fail_build_for: HashSet<usize>,
}

pub struct FaultyCapability {
    inner: FixtureCapability,
    fail_on: HashSet<TripListId>,
    panic_on: HashSet<TripListId>,
}

impl SearchCapability for FaultyCapability {
    fn set_bump_waits(&mut self, entries: &[BumpWaitEntry]) {
        self.inner.set_bump_waits(entries);
    }

    fn find_pathset(&mut self, task: &SearchTask) -> Result<RawPathset, SearchError> {
        let id = task.request.trip_list_id;
        if self.panic_on.contains(&id) {
            panic!("scripted search crash for trip list {id}");
        }
        if self.fail_on.contains(&id) {
            return Err(SearchError::Capability {
                message: format!("scripted search failure for trip list {id}"),
            });
        }
        self.inner.find_pathset(task)
    }
}

impl CapabilityFactory for FaultyFactory {
    type Capability = FaultyCapability;

    fn build(&self, worker: usize) -> Result<FaultyCapability, SearchError> {
        if self.fail_build_for.contains(&worker) {
            return Err(SearchError::Init {
                worker,
                message: "scripted init failure".into(),
            });
        }
        Ok(FaultyCapability {
            inner: self.fixtures.build(worker)?,
            fail_on: self.fail_on.clone(),
            panic_on: self.panic_on.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, PersonId, SimTime, TripRequest, ZoneId};
    use crate::search::tables::RawPathRow;
    use chrono::NaiveDate;
    use std::io::Write;

    fn task(id: u64) -> SearchTask {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        SearchTask {
            iteration: 1,
            stochastic: false,
            request: TripRequest {
                person_id: PersonId::from("p"),
                trip_list_id: TripListId(id),
                orig_zone: ZoneId(1),
                dest_zone: ZoneId(2),
                user_class: "generic_user_class".into(),
                access_modes: vec!["walk".into()],
                transit_modes: vec!["transit".into()],
                egress_modes: vec!["walk".into()],
                direction: Direction::Outbound,
                preferred_time: SimTime::parse_hhmm("08:00", date).unwrap(),
                trace: false,
            },
        }
    }

    fn one_path() -> RawPathset {
        RawPathset {
            path_rows: vec![RawPathRow {
                cost: 1.0,
                probability: 1.0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn serves_fixture_or_empty() {
        let mut cap =
            FixtureCapability::new(HashMap::from([(TripListId(1), one_path())]));
        assert_eq!(cap.find_pathset(&task(1)).unwrap().path_rows.len(), 1);
        assert!(cap.find_pathset(&task(2)).unwrap().path_rows.is_empty());
    }

    #[test]
    fn records_bump_waits() {
        let mut cap = FixtureCapability::default();
        assert!(cap.bump_waits().is_empty());
        cap.set_bump_waits(&[BumpWaitEntry {
            trip: crate::domain::TripId(1),
            stop: crate::domain::StopId(2),
            sequence: crate::domain::StopSequence(3),
            arrival_min: 485.0,
        }]);
        assert_eq!(cap.bump_waits().len(), 1);
    }

    #[test]
    fn factory_builds_independent_copies() {
        let factory = FixtureFactory::new(HashMap::from([(TripListId(1), one_path())]));
        let mut a = factory.build(0).unwrap();
        let b = factory.build(1).unwrap();
        a.set_bump_waits(&[]);
        // Mutating one worker's copy never shows up in another's.
        assert_eq!(b.bump_waits().len(), 0);
        assert_eq!(a.find_pathset(&task(1)).unwrap().path_rows.len(), 1);
    }

    #[test]
    fn scripted_failure_and_build_failure() {
        let factory = FaultyFactory {
            fixtures: FixtureFactory::new(HashMap::new()),
            fail_on: HashSet::from([TripListId(7)]),
            panic_on: HashSet::new(),
            fail_build_for: HashSet::from([2]),
        };
        let mut cap = factory.build(0).unwrap();
        assert!(cap.find_pathset(&task(7)).is_err());
        assert!(cap.find_pathset(&task(8)).is_ok());
        assert!(matches!(
            factory.build(2),
            Err(SearchError::Init { worker: 2, .. })
        ));
    }

    #[test]
    fn fixtures_load_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "4": {
                "path_rows": [{"cost": 2.0, "probability": 1.0}],
                "int_rows": [],
                "float_rows": [],
                "counters": {
                    "label_iterations": 1,
                    "max_stop_process_count": 1,
                    "time_labeling_ms": 0.0,
                    "time_enumerating_ms": 0.0
                }
            }
        });
        write!(file, "{json}").unwrap();

        let factory = FixtureFactory::from_file(file.path()).unwrap();
        let mut cap = factory.build(0).unwrap();
        assert_eq!(cap.find_pathset(&task(4)).unwrap().path_rows.len(), 1);
    }
}
