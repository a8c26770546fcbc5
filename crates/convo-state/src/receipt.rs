//! Receipt Upgrader — the single mutation point for read-receipt status.

use std::collections::HashMap;

use convo_core::{ChatId, Message, MessageType, Receipt};

use crate::context::{ConversationContext, ReceiptChangedSignal};

/// Auto mode: called whenever a new `received` message has just been
/// appended to `history`. Walks backward and upgrades the first `sent`
/// message with `receipt == delivered` to `read`, stopping at the first
/// `sent` message regardless of whether an upgrade happened.
pub fn auto_upgrade(history: &mut [Message], chat_id: &ChatId) -> Option<ReceiptChangedSignal> {
    for msg in history.iter_mut().rev() {
        if msg.message_type == MessageType::Sent {
            if msg.receipt == Receipt::Delivered {
                msg.receipt = Receipt::Read;
                return Some(ReceiptChangedSignal {
                    chat_id: chat_id.clone(),
                    label: msg.label.clone(),
                    receipt: Receipt::Read,
                });
            }
            return None;
        }
    }
    None
}

/// Explicit mode: triggered by a `receipt:status:label` deferred tag.
/// Scans all chats for the first message carrying `label`, upgrades its
/// receipt, and refreshes the `labeledMessages` registry entry.
pub fn explicit_upgrade(
    context: &mut ConversationContext,
    label: &str,
    status: Receipt,
) -> Option<ReceiptChangedSignal> {
    for (chat_id, msgs) in context.message_history.iter_mut() {
        if let Some(msg) = msgs.iter_mut().find(|m| m.label.as_deref() == Some(label)) {
            msg.receipt = status;
            let updated = msg.clone();
            context.labeled_messages.insert(label.to_string(), updated);
            return Some(ReceiptChangedSignal {
                chat_id: chat_id.clone(),
                label: Some(label.to_string()),
                receipt: status,
            });
        }
    }
    tracing::warn!(label, "receipt upgrade requested for unknown label");
    None
}

/// Replay auto-mode upgrades across an entire restored history, applied in
/// per-chat chronological order, so reloaded sessions end up with the same
/// receipt state they would have accumulated live.
pub fn bulk_upgrade_on_load(history: &mut HashMap<ChatId, Vec<Message>>) {
    for (chat_id, msgs) in history.iter_mut() {
        for i in 0..msgs.len() {
            if msgs[i].message_type == MessageType::Received {
                auto_upgrade(&mut msgs[..=i], chat_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use convo_core::MessageId;

    fn msg(id: &str, message_type: MessageType, receipt: Receipt) -> Message {
        Message {
            id: MessageId::new(id),
            message_type,
            speaker: None,
            time: None,
            date: None,
            receipt,
            timestamp: Utc::now(),
            label: None,
            quote: None,
            is_seed: false,
            kind: convo_core::MessageKind::Text {
                text: "x".to_string(),
                link_preview: None,
                notification_preview: None,
            },
        }
    }

    #[test]
    fn auto_upgrade_promotes_nearest_sent() {
        let chat = ChatId::from("P");
        let mut history = vec![
            msg("1", MessageType::Sent, Receipt::Delivered),
            msg("2", MessageType::Received, Receipt::None),
        ];
        let signal = auto_upgrade(&mut history, &chat);
        assert!(signal.is_some());
        assert_eq!(history[0].receipt, Receipt::Read);
    }

    #[test]
    fn auto_upgrade_stops_at_first_sent_even_if_already_read() {
        let chat = ChatId::from("P");
        let mut history = vec![
            msg("1", MessageType::Sent, Receipt::Read),
            msg("2", MessageType::Received, Receipt::None),
        ];
        let signal = auto_upgrade(&mut history, &chat);
        assert!(signal.is_none());
        assert_eq!(history[0].receipt, Receipt::Read);
    }

    #[test]
    fn bulk_upgrade_replays_history_in_order() {
        let chat = ChatId::from("P");
        let mut history = HashMap::new();
        history.insert(
            chat.clone(),
            vec![
                msg("1", MessageType::Sent, Receipt::Delivered),
                msg("2", MessageType::Received, Receipt::None),
                msg("3", MessageType::Sent, Receipt::Delivered),
            ],
        );
        bulk_upgrade_on_load(&mut history);
        let msgs = &history[&chat];
        assert_eq!(msgs[0].receipt, Receipt::Read);
        assert_eq!(msgs[2].receipt, Receipt::Delivered);
    }
}
