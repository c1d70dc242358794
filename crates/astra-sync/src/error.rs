//! Error types for astra-sync

use astra_world::StepError;
use thiserror::Error;

/// Sync error type
///
/// Only conditions that make the current call unserviceable are errors.
/// Recoverable divergence (stale pending actions, shape mismatches,
/// unclassified fields, duplicate ids) is logged and healed in place.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An event arrived before initialization
    #[error("no state: event arrived before Init")]
    NoState,

    /// The deterministic world step failed
    #[error(transparent)]
    Step(#[from] StepError),
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
