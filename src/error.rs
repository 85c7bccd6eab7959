// ⚠️ Detection Errors
// Typed failures surfaced by the duplicate detector

use thiserror::Error;

/// Errors that abort a detection call.
///
/// Detection is batch-only: the first failure stops the whole call and no
/// partial result is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// A transaction's time could not be resolved to an instant
    #[error("invalid timestamp {value:?} on transaction {id}")]
    InvalidTimestamp { id: String, value: String },
}

pub type Result<T> = std::result::Result<T, DetectionError>;
