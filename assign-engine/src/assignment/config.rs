//! Assignment run configuration.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::bumping::BumpPolicy;

/// User class functions the engine knows how to apply. The weight lookup is
/// keyed by the function's output, so an unknown name is a fatal
/// configuration error, not something to discover mid-run.
const KNOWN_USER_CLASS_FUNCTIONS: &[&str] = &["generic_user_class"];

/// Fatal configuration errors, raised before any iteration runs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid assignment mode {0:?}; expected \"deterministic\" or \"stochastic\"")]
    InvalidAssignmentMode(String),

    #[error("invalid reference date {0:?}; expected YYYY-MM-DD")]
    InvalidReferenceDate(String),

    #[error("iterations must be at least 1")]
    NoIterations,

    #[error("no path weights file configured")]
    MissingWeights,

    #[error("path weights file {0} does not exist")]
    WeightsNotFound(PathBuf),

    #[error("unknown user class function {0:?}")]
    UnknownUserClassFunction(String),
}

/// How pathsets are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    /// Trip-based shortest path; iterates until the capacity gap closes.
    Deterministic,
    /// Trip-based hyperpath with per-path probabilities; single pass.
    Stochastic,
}

impl AssignmentMode {
    pub fn is_stochastic(self) -> bool {
        matches!(self, AssignmentMode::Stochastic)
    }
}

/// Parameters of one assignment run.
///
/// Loaded from a JSON file; every field has the engine's default so a
/// minimal config can stay minimal. `validate` must pass before a run
/// starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignmentConfig {
    /// Maximum iterations to spend clearing capacity violations.
    pub iterations: u32,
    /// `"deterministic"` or `"stochastic"`.
    pub assignment_mode: String,
    /// Enforce vehicle capacities via bumping.
    pub capacity_constraint: bool,
    /// Window around the preferred time within which paths are generated.
    pub time_window_min: f64,
    /// Extra wait margin so marginal passengers are not bumped.
    pub bump_buffer_min: f64,
    /// Dispersion of the stochastic path choice logit.
    pub stochastic_dispersion: f64,
    /// Stochastic paths generated per request (not necessarily unique).
    pub stochastic_pathset_size: u32,
    /// Cap on how often the labeling may process one stop; -1 for no cap.
    pub stochastic_max_stop_process_count: i32,
    /// Search workers; 0 means host parallelism.
    pub number_of_workers: usize,
    /// Resolve one over-capacity row per pass instead of all of them.
    pub bump_one_at_a_time: bool,
    /// Seed for the stochastic path-choice draw.
    pub random_seed: u64,
    /// The service day all minute offsets are anchored to, `YYYY-MM-DD`.
    pub reference_date: String,
    pub path_weights_file: Option<PathBuf>,
    pub user_class_function: String,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            assignment_mode: "deterministic".to_string(),
            capacity_constraint: false,
            time_window_min: 30.0,
            bump_buffer_min: 5.0,
            stochastic_dispersion: 1.0,
            stochastic_pathset_size: 1000,
            stochastic_max_stop_process_count: -1,
            number_of_workers: 0,
            bump_one_at_a_time: true,
            random_seed: 1,
            reference_date: "2015-03-09".to_string(),
            path_weights_file: None,
            user_class_function: "generic_user_class".to_string(),
        }
    }
}

impl AssignmentConfig {
    /// Loads a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The parsed assignment mode.
    pub fn mode(&self) -> Result<AssignmentMode, ConfigError> {
        match self.assignment_mode.as_str() {
            "deterministic" => Ok(AssignmentMode::Deterministic),
            "stochastic" => Ok(AssignmentMode::Stochastic),
            other => Err(ConfigError::InvalidAssignmentMode(other.to_string())),
        }
    }

    /// The parsed reference date.
    pub fn reference_date(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(&self.reference_date, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidReferenceDate(self.reference_date.clone()))
    }

    pub fn bump_policy(&self) -> BumpPolicy {
        if self.bump_one_at_a_time {
            BumpPolicy::OneAtATime
        } else {
            BumpPolicy::Batch
        }
    }

    pub fn time_window(&self) -> Duration {
        Duration::milliseconds((self.time_window_min * 60_000.0) as i64)
    }

    pub fn bump_buffer(&self) -> Duration {
        Duration::milliseconds((self.bump_buffer_min * 60_000.0) as i64)
    }

    /// Checks everything that must hold before an iteration may run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mode()?;
        self.reference_date()?;
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        let weights = self
            .path_weights_file
            .as_ref()
            .ok_or(ConfigError::MissingWeights)?;
        if !weights.exists() {
            return Err(ConfigError::WeightsNotFound(weights.clone()));
        }
        if !KNOWN_USER_CLASS_FUNCTIONS.contains(&self.user_class_function.as_str()) {
            return Err(ConfigError::UnknownUserClassFunction(
                self.user_class_function.clone(),
            ));
        }
        Ok(())
    }
}
