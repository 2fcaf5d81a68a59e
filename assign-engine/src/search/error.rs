//! Search capability error types.

use super::tables::DecodeError;

/// Errors from the external path-search capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// The capability itself failed while searching one request.
    #[error("search capability failed: {message}")]
    Capability { message: String },

    /// The capability could not be initialized for a worker.
    #[error("search capability init failed for worker {worker}: {message}")]
    Init { worker: usize, message: String },

    /// The capability returned tables the decoder could not interpret.
    #[error("failed to decode search result: {0}")]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = SearchError::Capability {
            message: "label table truncated".into(),
        };
        assert_eq!(
            err.to_string(),
            "search capability failed: label table truncated"
        );

        let err = SearchError::Init {
            worker: 3,
            message: "supply missing".into(),
        };
        assert!(err.to_string().contains("worker 3"));
    }
}
