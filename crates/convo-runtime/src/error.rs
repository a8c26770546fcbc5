//! Error types surfaced at the composition boundary. Unlike the inner
//! crates, the runtime is allowed an `anyhow`-flavored catch-all for the
//! one thing that genuinely can't be made non-fatal: the host driving the
//! runtime after the story handle itself has become unusable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("conversation transition failed: {0}")]
    Transition(#[from] convo_state::TransitionError),

    #[error("snapshot is malformed: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("no story loaded")]
    NotLoaded,
}
