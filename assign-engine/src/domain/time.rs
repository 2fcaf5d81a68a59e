//! Simulation clock time.
//!
//! The search capability reports times as fractional minute offsets from a
//! fixed reference midnight. [`SimTime`] anchors those offsets to an absolute
//! date-aware instant so that overnight trips compare correctly, and converts
//! back to minute offsets when state is pushed to the capability.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Error for out-of-range time construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid simulation time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// An absolute instant on the simulation clock.
///
/// Backed by a [`NaiveDateTime`] with millisecond precision, which is enough
/// to round-trip the fractional minutes produced by the path search without
/// drift a passenger would notice.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimTime(NaiveDateTime);

impl SimTime {
    /// Wraps an existing date-time.
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// Builds a time from a fractional minute offset after the reference
    /// midnight. Offsets beyond 24:00 land on the following day.
    ///
    /// Returns an error if the offset is not finite or overflows the
    /// calendar.
    pub fn from_minutes_after_midnight(
        reference: NaiveDate,
        minutes: f64,
    ) -> Result<Self, TimeError> {
        if !minutes.is_finite() {
            return Err(TimeError::new("minute offset must be finite"));
        }
        let millis = (minutes * 60_000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return Err(TimeError::new("minute offset out of range"));
        }
        let midnight = reference.and_time(NaiveTime::MIN);
        midnight
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .map(Self)
            .ok_or_else(|| TimeError::new("minute offset overflows the calendar"))
    }

    /// Parses `"HH:MM"` on the reference date, for fixtures and tests.
    pub fn parse_hhmm(s: &str, reference: NaiveDate) -> Result<Self, TimeError> {
        let time = NaiveTime::parse_from_str(s, "%H:%M")
            .map_err(|_| TimeError::new("expected HH:MM"))?;
        Ok(Self(reference.and_time(time)))
    }

    /// The fractional minute offset of this instant after the reference
    /// midnight. This is the representation the search capability consumes
    /// for bump-wait entries.
    pub fn minutes_after_midnight(&self, reference: NaiveDate) -> f64 {
        let midnight = reference.and_time(NaiveTime::MIN);
        self.0.signed_duration_since(midnight).num_milliseconds() as f64 / 60_000.0
    }

    /// Returns the underlying date-time.
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Adds a duration, failing on calendar overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Subtracts a duration, failing on calendar overflow.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Self)
    }

    /// Signed duration from `other` to `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        self.0.signed_duration_since(other.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs).expect("simulation time overflow")
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({})", self.0.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn valid_date()(
            year in 2000i32..2100,
            month in 1u32..=12,
            day in 1u32..=28
        ) -> NaiveDate {
            NaiveDate::from_ymd_opt(year, month, day).unwrap()
        }
    }

    proptest! {
        /// Minute offsets round-trip through the absolute representation.
        #[test]
        fn offset_roundtrip(reference in valid_date(), minutes in -1440.0f64..4320.0) {
            let t = SimTime::from_minutes_after_midnight(reference, minutes).unwrap();
            let back = t.minutes_after_midnight(reference);
            // Millisecond storage bounds the round-trip error.
            prop_assert!((back - minutes).abs() < 1.0 / 60_000.0);
        }

        /// Larger offsets are always later instants.
        #[test]
        fn offset_order_matches_time_order(
            reference in valid_date(),
            a in 0.0f64..4320.0,
            b in 0.0f64..4320.0
        ) {
            let ta = SimTime::from_minutes_after_midnight(reference, a).unwrap();
            let tb = SimTime::from_minutes_after_midnight(reference, b).unwrap();
            if (a - b).abs() > 1.0 / 30_000.0 {
                prop_assert_eq!(a < b, ta < tb);
            }
        }

        /// Adding then subtracting a duration is the identity.
        #[test]
        fn add_sub_identity(
            reference in valid_date(),
            minutes in 0.0f64..1440.0,
            delta in 0i64..10_000
        ) {
            let t = SimTime::from_minutes_after_midnight(reference, minutes).unwrap();
            let dur = Duration::minutes(delta);
            if let Some(added) = t.checked_add(dur) {
                prop_assert_eq!(added.checked_sub(dur), Some(t));
            }
        }
    }
}
