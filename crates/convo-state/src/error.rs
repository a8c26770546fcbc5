//! Error types for the conversation state machine.

use thiserror::Error;

/// Errors surfaced while handling an event or driving a chunk step.
///
/// None of these are fatal: per the error handling design, the machine
/// stays viable and the caller (the host composition layer) decides what,
/// if anything, to surface to the user.
#[derive(Error, Debug, Clone)]
pub enum TransitionError {
    #[error("event {event} is not valid in state {state:?}")]
    InvalidEvent { state: crate::states::ConversationState, event: String },

    #[error("story processing error: {0}")]
    StoryError(String),
}
