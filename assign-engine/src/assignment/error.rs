//! Run-level error type.

use crate::report::ReportError;
use crate::search::SearchError;

use super::config::ConfigError;

/// Anything that can end an assignment run early.
///
/// Per-request search failures and worker crashes are not here: they are
/// absorbed as not-found pathsets and the run continues. What remains is
/// fatal configuration, a sequential dispatch that cannot initialize its
/// capability, and report I/O.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("search dispatch failed: {0}")]
    Search(#[from] SearchError),

    #[error("report output failed: {0}")]
    Report(#[from] ReportError),
}
