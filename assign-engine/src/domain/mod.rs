//! Domain types for the assignment engine.
//!
//! Validated core types shared by every phase of an assignment run. Types
//! enforce their invariants at construction time, so code receiving them can
//! trust their validity.

mod ids;
mod link;
mod mode;
mod pathset;
mod request;
mod schedule;
mod time;

pub use ids::{PersonId, StopId, StopSequence, TripId, TripListId, ZoneId};
pub use link::PassengerLink;
pub use mode::{LegMode, UnknownModeSentinel};
pub use pathset::{LegRecord, LegWeight, PathOption, Pathset};
pub use request::{Direction, TripRequest};
pub use schedule::{
    LoadedRow, LoadedTrips, ScheduleError, StopTimeRecord, VehicleSchedule,
};
pub use time::{SimTime, TimeError};
