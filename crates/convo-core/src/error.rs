//! Error types for the conversation core.

use thiserror::Error;

/// Errors surfaced by pure `convo-core` operations.
///
/// Per the error handling design, nothing here is fatal to a caller: these
/// are returned so the caller (the state machine, in `convo-state`) can log
/// and keep going rather than unwind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("time tag rejected: {new} is before current {current}")]
    TimeNotForward { current: String, new: String },
}
