//! Interface to the external path-search capability.
//!
//! The label-setting search algorithm is outside this crate. This module
//! defines the trait it is invoked through, the raw table format it returns,
//! the decoder into domain path records, and a fixture implementation.

mod capability;
mod error;
pub mod mock;
mod tables;

pub use capability::{BumpWaitEntry, CapabilityFactory, SearchCapability, SearchTask};
pub use error::SearchError;
pub use tables::{
    DecodeError, FLOAT_COLUMNS, INT_COLUMNS, RawPathRow, RawPathset, SearchCounters,
    decode_pathset,
};
