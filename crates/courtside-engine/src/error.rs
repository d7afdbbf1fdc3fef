//! Engine error types.

use std::io;

use courtside_providers::ProviderError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that stop an engine call as a whole.
///
/// Per-date and per-batch provider failures are not errors at this level;
/// they are recorded as gaps or failed results.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A requested court is not in the court directory.
    #[error("Unknown court: {court_id}")]
    UnknownCourt { court_id: String },

    /// Month outside 1..=12 or an unrepresentable year.
    #[error("Invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    /// A snapshot was stored under a key for a different month.
    #[error("Snapshot is for {found}, expected {expected}")]
    SnapshotMismatch { expected: String, found: String },

    /// Blob store IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot encoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider failure that aborts the whole call (e.g. the crawl login).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// No provider is registered for a region that has work.
    #[error("No provider configured for region {region}")]
    MissingProvider { region: String },
}

impl EngineError {
    /// Creates an unknown court error.
    pub fn unknown_court(court_id: impl Into<String>) -> Self {
        Self::UnknownCourt {
            court_id: court_id.into(),
        }
    }

    /// Creates a missing provider error.
    pub fn missing_provider(region: impl ToString) -> Self {
        Self::MissingProvider {
            region: region.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            EngineError::unknown_court("mars-1").to_string(),
            "Unknown court: mars-1"
        );
        assert_eq!(
            EngineError::InvalidMonth { year: 2025, month: 13 }.to_string(),
            "Invalid month: 2025-13"
        );
    }
}
