//! Leg modes decoded from the search capability's sentinel values.

use std::fmt;

/// Sentinel for an access leg (origin zone to first stop).
const SENTINEL_ACCESS: i32 = -100;
/// Sentinel for an egress leg (last stop to destination zone).
const SENTINEL_EGRESS: i32 = -101;
/// Sentinel for a transfer between stops.
const SENTINEL_TRANSFER: i32 = -102;
/// Sentinel for a transit leg without a specific route mode.
const SENTINEL_GENERIC_TRANSIT: i32 = -103;

/// Error for a mode value the decoder does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode sentinel {0}")]
pub struct UnknownModeSentinel(pub i32);

/// The kind of one leg of a path.
///
/// The capability encodes the mode as an integer: negative sentinels for the
/// non-vehicle legs, any non-negative value for a scheduled leg carrying the
/// route's mode number. Decoding happens once, here, so the rest of the crate
/// matches on variants instead of magic integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegMode {
    /// From the origin zone to a boarding stop.
    Access,
    /// From an alighting stop to the destination zone.
    Egress,
    /// Between two stops, on foot.
    Transfer,
    /// Aboard a transit vehicle with no specific route mode.
    GenericTransit,
    /// Aboard a scheduled vehicle; carries the route's mode number.
    Scheduled(i32),
}

impl LegMode {
    /// Decodes a raw mode value from the capability's integer table.
    pub fn from_sentinel(raw: i32) -> Result<Self, UnknownModeSentinel> {
        match raw {
            SENTINEL_ACCESS => Ok(LegMode::Access),
            SENTINEL_EGRESS => Ok(LegMode::Egress),
            SENTINEL_TRANSFER => Ok(LegMode::Transfer),
            SENTINEL_GENERIC_TRANSIT => Ok(LegMode::GenericTransit),
            mode if mode >= 0 => Ok(LegMode::Scheduled(mode)),
            other => Err(UnknownModeSentinel(other)),
        }
    }

    /// Encodes back to the capability's representation (fixtures, tests).
    pub fn to_sentinel(self) -> i32 {
        match self {
            LegMode::Access => SENTINEL_ACCESS,
            LegMode::Egress => SENTINEL_EGRESS,
            LegMode::Transfer => SENTINEL_TRANSFER,
            LegMode::GenericTransit => SENTINEL_GENERIC_TRANSIT,
            LegMode::Scheduled(mode) => mode,
        }
    }

    /// True for legs ridden aboard a vehicle. Only these become passenger
    /// links in the loading pass.
    pub fn is_transit(self) -> bool {
        matches!(self, LegMode::GenericTransit | LegMode::Scheduled(_))
    }
}

impl fmt::Display for LegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegMode::Access => f.write_str("access"),
            LegMode::Egress => f.write_str("egress"),
            LegMode::Transfer => f.write_str("transfer"),
            LegMode::GenericTransit => f.write_str("transit"),
            LegMode::Scheduled(mode) => write!(f, "scheduled({mode})"),
        }
    }
}
