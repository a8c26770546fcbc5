//! Saved-state layout: `{v, story, history, lastReadMessageId,
//! deferredMessages, labeledMessages}`. `notifiedChatIds` is intentionally
//! never part of this shape, so a reload re-notifies rather than silently
//! suppressing delivery.

use std::collections::HashMap;

use convo_core::{ChatId, Message, ReadCursor};
use convo_state::{ConversationContext, DeferredEntry, Story};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub v: u32,
    /// Opaque interpreter state; the core never inspects this, only
    /// carries it through.
    pub story: Value,
    pub history: HashMap<ChatId, Vec<Message>>,
    pub last_read_message_id: HashMap<ChatId, ReadCursor>,
    pub deferred_messages: HashMap<ChatId, Vec<DeferredEntry>>,
    pub labeled_messages: HashMap<String, Message>,
}

impl Snapshot {
    pub fn capture(context: &ConversationContext, story: &dyn Story) -> Self {
        Snapshot {
            v: SNAPSHOT_VERSION,
            story: story.save_state(),
            history: context.message_history.clone(),
            last_read_message_id: context.last_read_message_id.clone(),
            deferred_messages: context
                .deferred_messages
                .iter()
                .map(|(chat_id, queue)| (chat_id.clone(), queue.iter().cloned().collect()))
                .collect(),
            labeled_messages: context.labeled_messages.clone(),
        }
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let snapshot = Snapshot {
            v: 1,
            story: Value::String("opaque".to_string()),
            history: HashMap::new(),
            last_read_message_id: HashMap::new(),
            deferred_messages: HashMap::new(),
            labeled_messages: HashMap::new(),
        };
        let json = snapshot.to_json().unwrap();
        let restored = Snapshot::from_json(json).unwrap();
        assert_eq!(restored.v, 1);
        assert_eq!(restored.story, Value::String("opaque".to_string()));
    }
}
