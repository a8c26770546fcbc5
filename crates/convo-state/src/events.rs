//! Conversation events — the host-facing input surface of the state
//! machine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use convo_core::{ChatId, Message, ReadCursor};

/// A deferred entry awaiting replay when its chat opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredEntry {
    pub message: Message,
    pub delay_ms: u64,
}

/// Events the host may raise against the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// Load or reload a story. `story` is the interpreter's opaque saved
    /// state blob; the rest restores prior session context.
    StoryLoaded {
        story: Value,
        #[serde(default)]
        history: HashMap<ChatId, Vec<Message>>,
        #[serde(default)]
        last_read_message_id: HashMap<ChatId, ReadCursor>,
        #[serde(default)]
        deferred_messages: HashMap<ChatId, Vec<DeferredEntry>>,
    },
    /// The player selected choice `index` in the currently open view.
    Choose { index: usize },
    /// The player navigated into a chat.
    OpenChat { chat_id: ChatId },
    /// The player navigated back to the hub.
    CloseChat,
    /// Poll for forward progress without any new input.
    CheckStory,
    /// Reset the whole session; late emissions may be suppressed by the
    /// host once this flag is observed.
    ResetGame,
    /// The host has shown a chat's first notification out of band.
    MarkChatNotified { chat_id: ChatId },
    /// A previously requested external data fetch has resolved.
    DataReady { payload: Value },
}
