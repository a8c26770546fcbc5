//! The interpreter seam — a narrow trait standing in for the black-box
//! "ink"-style story engine.
//!
//! The state machine never concerns itself with how a `Story` evaluates a
//! conditional block or stores its variables; it only calls through this
//! trait, the way a caller drives an interpreter through a handle rather
//! than owning the underlying engine directly.

use convo_core::ChatId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of text produced by `Continue()`, and its untrimmed tag
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub tags: Vec<String>,
}

/// A choice offered by the story, resolved to the chat it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub index: usize,
    pub text: String,
    pub target_chat: Option<ChatId>,
}

/// The interpreter handle the state machine drives.
///
/// Implementations own the actual story runtime; everything here mirrors
/// the fixed contract (`canContinue`, `Continue()`,
/// `currentTags`, `currentChoices`, `ChooseChoiceIndex()`, a variables
/// table, and state serialize/load).
pub trait Story {
    /// Whether another `continue_chunk` call would produce more content.
    fn can_continue(&self) -> bool;

    /// Advance the story by one chunk. Executes an entire conditional
    /// block, including variable resets, in one call — "atomic
    /// Continue()".
    fn continue_chunk(&mut self) -> Result<Chunk, String>;

    /// Choices offered at the current point, empty if none.
    fn current_choices(&self) -> Vec<Choice>;

    /// Commit to a choice. Only called after the state machine has
    /// verified the choice belongs to the open view.
    fn choose_choice_index(&mut self, index: usize) -> Result<(), String>;

    /// Read-only access to the story's `current_chat` variable, the
    /// fallback used when a chunk carries no `targetChat` tag. Callers
    /// must capture this *before* any later variable reset
    /// inside the same `Continue()` block can clobber it — which is why
    /// the state machine reads it immediately after `continue_chunk`.
    fn current_chat_variable(&self) -> Option<String>;

    /// Whether the story is parked awaiting an external data response.
    ///
    /// A concrete implementation backed by the external-function bridge
    /// (`convo_runtime::ExternalFunctionBridge`) sets its own flag
    /// here from the same `request_data` callback that hands the bridge
    /// the request payload, so this trait stays unaware of the bridge
    /// type while still reflecting its state.
    fn is_awaiting_data(&self) -> bool;

    /// Clear the awaiting-data flag, called on `DATA_READY`.
    fn clear_awaiting_data(&mut self);

    /// The current path string, for stall diagnostics.
    fn current_path_string(&self) -> Option<String>;

    /// How many times the current path has been visited.
    fn current_path_visit_count(&self) -> u32;

    /// A monotonically increasing turn counter, for stall diagnostics.
    fn turn_index(&self) -> u32;

    /// True if the current path is recognized as a terminal "ending" path.
    fn is_ending_path(&self) -> bool;

    /// Serialize interpreter state to an opaque JSON value.
    fn save_state(&self) -> Value;

    /// Restore interpreter state from a previously saved value.
    fn load_state(&mut self, state: Value) -> Result<(), String>;
}
