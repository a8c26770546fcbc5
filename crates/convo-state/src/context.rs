//! Conversation Context — the state-machine-owned mutable context.

use std::collections::{HashMap, HashSet, VecDeque};

use convo_core::{BatteryContext, ChatId, Message, MessageId, ReadCursor, Receipt, TimeContext};
use serde_json::Value;

use crate::events::DeferredEntry;

/// Either the hub (chat list) or a single open chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentView {
    Hub,
    Chat(ChatId),
}

impl CurrentView {
    pub fn chat_id(&self) -> Option<&ChatId> {
        match self {
            CurrentView::Hub => None,
            CurrentView::Chat(id) => Some(id),
        }
    }
}

/// The transient `_receiptChanged` signal, consumed once per cycle by the
/// host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptChangedSignal {
    pub chat_id: ChatId,
    pub label: Option<String>,
    pub receipt: Receipt,
}

/// All state mutated across the lifetime of one loaded story.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub current_view: CurrentView,
    pub message_history: HashMap<ChatId, Vec<Message>>,
    pub emitted_message_ids: HashMap<ChatId, HashSet<MessageId>>,
    pub saved_choices_state: HashMap<ChatId, Value>,
    pub buffered_message: Option<Message>,
    pub pending_delay_ms: u64,
    pub target_chat_id: Option<ChatId>,
    pub story_started_this_render: bool,
    pub labeled_messages: HashMap<String, Message>,
    pub last_read_message_id: HashMap<ChatId, ReadCursor>,
    pub notified_chat_ids: HashSet<ChatId>,
    pub deferred_messages: HashMap<ChatId, VecDeque<DeferredEntry>>,
    pub receipt_changed: Option<ReceiptChangedSignal>,
    pub is_resetting: bool,
    /// The set of chats the host has declared valid, for target-chat
    /// validation. Empty means "accept anything", matching
    /// `convo_core::chunk::resolve_target_chat`'s no-validation mode.
    pub known_chats: HashSet<String>,
    /// Unresolved target-chat ids already surfaced as a diagnostic, so a
    /// story that keeps routing to the same unknown id only logs it once.
    pub notified_unknown_chats: HashSet<String>,
    pub time: TimeContext,
    pub battery: BatteryContext,
    /// Per-chat monotonic counter backing freshly minted message ids.
    /// Independent of `message_history`'s length, since a message can be
    /// assigned an id before it is appended (it may sit in a deferred
    /// queue for a while first).
    message_seq: HashMap<ChatId, u64>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        ConversationContext {
            current_view: CurrentView::Hub,
            message_history: HashMap::new(),
            emitted_message_ids: HashMap::new(),
            saved_choices_state: HashMap::new(),
            buffered_message: None,
            pending_delay_ms: 0,
            target_chat_id: None,
            story_started_this_render: false,
            labeled_messages: HashMap::new(),
            last_read_message_id: HashMap::new(),
            notified_chat_ids: HashSet::new(),
            deferred_messages: HashMap::new(),
            receipt_changed: None,
            is_resetting: false,
            known_chats: HashSet::new(),
            notified_unknown_chats: HashSet::new(),
            time: TimeContext::new(),
            battery: BatteryContext::new(),
            message_seq: HashMap::new(),
        }
    }
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_for(&self, chat_id: &ChatId) -> &[Message] {
        self.message_history
            .get(chat_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn last_message_id(&self, chat_id: &ChatId) -> ReadCursor {
        match self.history_for(chat_id).last() {
            Some(msg) => ReadCursor::At(MessageId::new(msg.id.as_str())),
            None => ReadCursor::BeforeAll,
        }
    }

    /// Mint the next unique message id for `chat_id`.
    pub fn next_message_id(&mut self, chat_id: &ChatId) -> MessageId {
        let counter = self.message_seq.entry(chat_id.clone()).or_insert(0);
        let id = MessageId::new(format!("{}-{}", chat_id.as_str(), *counter));
        *counter += 1;
        id
    }

    /// Append `message` to `chat_id`'s history and run the auto receipt
    /// upgrade, recording `_receiptChanged` if it fired.
    pub fn append_and_upgrade(&mut self, chat_id: ChatId, message: Message) {
        if let Some(label) = message.label.clone() {
            self.labeled_messages.insert(label, message.clone());
        }

        let is_received = message.message_type == convo_core::MessageType::Received;
        let entry = self.message_history.entry(chat_id.clone()).or_default();
        entry.push(message);

        if is_received {
            if let Some(signal) = crate::receipt::auto_upgrade(entry, &chat_id) {
                self.receipt_changed = Some(signal);
            }
        }
    }

    pub fn mark_all_emitted(&mut self, chat_id: &ChatId) {
        let ids: HashSet<MessageId> = self
            .history_for(chat_id)
            .iter()
            .map(|m| m.id.clone())
            .collect();
        self.emitted_message_ids.insert(chat_id.clone(), ids);
    }
}
