//! Conversation states — Defines all possible states of the conversation
//! state machine.

use serde::{Deserialize, Serialize};

/// The possible states of the conversation state machine's lifecycle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Waiting for `STORY_LOADED`.
    Loading,
    /// Actively draining chunks from the story.
    Processing,
    /// A message is buffered and a delay timer is armed.
    Delaying,
    /// The story flagged `_awaitingData`; waiting for `DATA_READY`.
    AwaitingData,
    /// The story has presented choices; waiting for `CHOOSE`.
    WaitingForInput,
    /// The story cannot continue and has no choices.
    Idle,
}
