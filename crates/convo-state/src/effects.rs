//! Effects — the outputs the state machine produces for the runtime layer
//! to translate into bus emissions, minus the bus-delivery mechanism
//! itself, which lives in `convo-runtime`.

use convo_core::{ChatId, Message, Receipt, TimeOfDay};

use crate::story::Choice;

#[derive(Debug, Clone)]
pub enum Effect {
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
        params: serde_json::Value,
    },
    DataReceived {
        payload: serde_json::Value,
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
