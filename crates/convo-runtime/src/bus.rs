//! The wire-level event set delivered to the host, and the bus that fans
//! `Effect`s out to it.
//!
//! An unbounded channel per subscriber plus typed `emit_*` helpers and an
//! in-memory history buffer, useful for tests and replay without requiring
//! a specific host-side log sink.

use std::sync::{Arc, Mutex};

use convo_core::{ChatId, Message, Receipt, TimeOfDay};
use convo_state::{Choice, Effect};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One event in the contract, a 1:1 mirror of `Effect`'s payload shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuntimeEvent {
    MessageReceived {
        chat_id: ChatId,
        message: Message,
        is_current_chat: bool,
    },
    MessageSent {
        chat_id: ChatId,
        choice_index: usize,
        text: String,
    },
    NotificationShow {
        chat_id: ChatId,
        preview: String,
    },
    NotificationDismiss {
        chat_id: ChatId,
    },
    TypingStart {
        chat_id: ChatId,
        speaker: Option<String>,
    },
    TypingEnd {
        chat_id: ChatId,
    },
    ChoicesAvailable {
        choices: Vec<Choice>,
    },
    ChatOpened {
        chat_id: ChatId,
        messages: Vec<Message>,
    },
    ChatClosed,
    PresenceChanged {
        chat_id: ChatId,
        status: String,
    },
    TimeUpdated {
        time: TimeOfDay,
        day: u64,
    },
    DayAdvanced {
        time: Option<TimeOfDay>,
        day: u64,
    },
    BatteryChanged {
        battery: i64,
        is_low: bool,
    },
    DataRequested {
        id: String,
        source: String,
        query: String,
        params: Value,
    },
    DataReceived {
        payload: Value,
    },
    DataError {
        message: String,
    },
    AudioCue {
        sound_id: String,
    },
    ReceiptChanged {
        chat_id: ChatId,
        label: Option<String>,
        receipt: Receipt,
    },
    Ready,
}

impl From<Effect> for RuntimeEvent {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::MessageReceived { chat_id, message, is_current_chat } => {
                RuntimeEvent::MessageReceived { chat_id, message, is_current_chat }
            }
            Effect::MessageSent { chat_id, choice_index, text } => {
                RuntimeEvent::MessageSent { chat_id, choice_index, text }
            }
            Effect::NotificationShow { chat_id, preview } => {
                RuntimeEvent::NotificationShow { chat_id, preview }
            }
            Effect::NotificationDismiss { chat_id } => RuntimeEvent::NotificationDismiss { chat_id },
            Effect::TypingStart { chat_id, speaker } => RuntimeEvent::TypingStart { chat_id, speaker },
            Effect::TypingEnd { chat_id } => RuntimeEvent::TypingEnd { chat_id },
            Effect::ChoicesAvailable { choices } => RuntimeEvent::ChoicesAvailable { choices },
            Effect::ChatOpened { chat_id, messages } => RuntimeEvent::ChatOpened { chat_id, messages },
            Effect::ChatClosed => RuntimeEvent::ChatClosed,
            Effect::PresenceChanged { chat_id, status } => RuntimeEvent::PresenceChanged { chat_id, status },
            Effect::TimeUpdated { time, day } => RuntimeEvent::TimeUpdated { time, day },
            Effect::DayAdvanced { time, day } => RuntimeEvent::DayAdvanced { time, day },
            Effect::BatteryChanged { battery, is_low } => RuntimeEvent::BatteryChanged { battery, is_low },
            Effect::DataRequested { id, source, query, params } => {
                RuntimeEvent::DataRequested { id, source, query, params }
            }
            Effect::DataReceived { payload } => RuntimeEvent::DataReceived { payload },
            Effect::DataError { message } => RuntimeEvent::DataError { message },
            Effect::AudioCue { sound_id } => RuntimeEvent::AudioCue { sound_id },
            Effect::ReceiptChanged { chat_id, label, receipt } => {
                RuntimeEvent::ReceiptChanged { chat_id, label, receipt }
            }
            Effect::Ready => RuntimeEvent::Ready,
        }
    }
}

/// Fans `RuntimeEvent`s out to every subscriber registered at (or after)
/// construction, and keeps a history buffer for tests/replay.
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RuntimeEvent>>>,
    history: Arc<Mutex<Vec<RuntimeEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new subscriber, returning its receiving half.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RuntimeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Emit one event, recording it in history and fanning it out. Dead
    /// subscribers (receiver dropped) are pruned rather than treated as an
    /// error, since the bus has no way to know whether that was intentional.
    pub fn emit(&self, event: RuntimeEvent) {
        self.history.lock().unwrap().push(event.clone());
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Emit every effect the state machine produced for one evaluation,
    /// in order.
    pub fn emit_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.emit(RuntimeEvent::from(effect));
        }
    }

    /// The full emission history, for tests and replay.
    pub fn history(&self) -> Vec<RuntimeEvent> {
        self.history.lock().unwrap().clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
