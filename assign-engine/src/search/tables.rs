//! Raw result tables from the search capability and their decoder.
//!
//! The capability returns each pathset as dense, row-aligned numeric tables:
//! one integer table and one float table with one row per path leg, a
//! per-path cost/probability table, and four scalar performance counters.
//! The decoder turns those into [`PathOption`] records: rows grouped by path
//! index, mode sentinels translated, and relative minute offsets converted to
//! absolute clock times against the reference midnight.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{
    LegMode, LegRecord, LegWeight, PathOption, SimTime, StopId, StopSequence, TimeError, TripId,
    UnknownModeSentinel,
};

/// Integer table columns: path index, from stop, mode sentinel, trip id,
/// to stop, from sequence, to sequence.
pub const INT_COLUMNS: usize = 7;

/// Float table columns: label, departure minute offset, link minutes, cost,
/// arrival minute offset.
pub const FLOAT_COLUMNS: usize = 5;

/// Scalar performance counters reported with every search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCounters {
    /// Label-setting iterations performed.
    pub label_iterations: u64,
    /// Maximum number of times any single stop was processed.
    pub max_stop_process_count: u64,
    pub time_labeling_ms: f64,
    pub time_enumerating_ms: f64,
}

/// Per-path cost and selection probability row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPathRow {
    pub cost: f64,
    pub probability: f64,
}

/// The undecoded output of one pathset search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPathset {
    /// One row per candidate path.
    pub path_rows: Vec<RawPathRow>,
    /// One row per leg, aligned with `float_rows`.
    pub int_rows: Vec<[i32; INT_COLUMNS]>,
    pub float_rows: Vec<[f64; FLOAT_COLUMNS]>,
    pub counters: SearchCounters,
}

/// Errors turning raw tables into path records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("integer and float tables misaligned: {ints} vs {floats} rows")]
    RowMismatch { ints: usize, floats: usize },

    #[error("leg row references path {index} but only {paths} paths were reported")]
    PathIndex { index: usize, paths: usize },

    #[error(transparent)]
    UnknownMode(#[from] UnknownModeSentinel),

    #[error("transit leg on path {path} has no trip id")]
    MissingTrip { path: usize },

    #[error("negative {column} id {value}")]
    NegativeId { column: &'static str, value: i32 },

    #[error("non-finite {column} value")]
    NonFinite { column: &'static str },

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("stochastic path {path} has no usable selection probability")]
    MissingProbability { path: usize },
}

fn stop_id(column: &'static str, value: i32) -> Result<StopId, DecodeError> {
    if value < 0 {
        return Err(DecodeError::NegativeId { column, value });
    }
    Ok(StopId(value as u32))
}

fn sequence(value: i32) -> Option<StopSequence> {
    (value >= 0).then(|| StopSequence(value as u32))
}

fn finite(column: &'static str, value: f64) -> Result<f64, DecodeError> {
    if !value.is_finite() {
        return Err(DecodeError::NonFinite { column });
    }
    Ok(value)
}

fn minutes(column: &'static str, value: f64) -> Result<Duration, DecodeError> {
    Ok(Duration::milliseconds(
        (finite(column, value)? * 60_000.0).round() as i64,
    ))
}

/// Decodes one raw search result into path records.
///
/// Deterministic results carry elapsed durations in the label and cost
/// columns; stochastic results carry abstract scores and must supply a
/// finite, non-negative selection probability for every path.
pub fn decode_pathset(
    raw: &RawPathset,
    stochastic: bool,
    reference: NaiveDate,
) -> Result<Vec<PathOption>, DecodeError> {
    if raw.int_rows.len() != raw.float_rows.len() {
        return Err(DecodeError::RowMismatch {
            ints: raw.int_rows.len(),
            floats: raw.float_rows.len(),
        });
    }

    let mut paths: Vec<PathOption> = raw
        .path_rows
        .iter()
        .map(|row| PathOption {
            cost: row.cost,
            probability: row.probability,
            legs: Vec::new(),
        })
        .collect();

    for (ints, floats) in raw.int_rows.iter().zip(&raw.float_rows) {
        let index = ints[0] as usize;
        if ints[0] < 0 || index >= paths.len() {
            return Err(DecodeError::PathIndex {
                index: ints[0].max(0) as usize,
                paths: paths.len(),
            });
        }

        let mode = LegMode::from_sentinel(ints[2])?;
        let trip = if mode.is_transit() {
            if ints[3] < 0 {
                return Err(DecodeError::MissingTrip { path: index });
            }
            Some(TripId(ints[3] as u32))
        } else {
            None
        };

        let weight = if stochastic {
            LegWeight::Score {
                label: finite("label", floats[0])?,
                cost: finite("cost", floats[3])?,
            }
        } else {
            LegWeight::Elapsed {
                label: minutes("label", floats[0])?,
                cost: minutes("cost", floats[3])?,
            }
        };

        paths[index].legs.push(LegRecord {
            mode,
            trip,
            from_stop: stop_id("from stop", ints[1])?,
            from_seq: sequence(ints[5]),
            to_stop: stop_id("to stop", ints[4])?,
            to_seq: sequence(ints[6]),
            depart: SimTime::from_minutes_after_midnight(reference, finite("departure", floats[1])?)?,
            arrive: SimTime::from_minutes_after_midnight(reference, finite("arrival", floats[4])?)?,
            link_time: minutes("link time", floats[2])?,
            weight,
        });
    }

    if stochastic {
        for (num, path) in paths.iter().enumerate() {
            if !path.probability.is_finite() || path.probability < 0.0 {
                return Err(DecodeError::MissingProbability { path: num });
            }
        }
    }

    Ok(paths)
}
