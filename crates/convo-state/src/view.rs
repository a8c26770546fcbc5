//! View & Saved-Choice Management — `OPEN_CHAT`/`CLOSE_CHAT` handling.

use convo_core::{message, ChatId};

use crate::context::{ConversationContext, CurrentView};
use crate::events::DeferredEntry;
use crate::story::Story;

/// What happened while opening a chat, for the runtime layer to turn into
/// events.
#[derive(Debug, Clone, Default)]
pub struct OpenChatOutcome {
    /// The buffered message was committed immediately (chat had already
    /// been the target of an in-flight delayed message).
    pub committed_buffered: Option<(ChatId, convo_core::Message)>,
    pub restored_saved_choices: bool,
    /// The head of the chat's deferred queue, now armed as the buffered
    /// message.
    pub armed_deferred: Option<DeferredEntry>,
}

/// Handle `OPEN_CHAT{chatId}`.
pub fn open_chat(
    context: &mut ConversationContext,
    chat_id: ChatId,
    story: &mut dyn Story,
) -> OpenChatOutcome {
    let mut outcome = OpenChatOutcome::default();
    let previous_chat_id = context.current_view.chat_id().cloned();

    // Step 1: flush a buffered message destined for the chat being opened.
    if context.target_chat_id.as_ref() == Some(&chat_id) {
        if let Some(pending) = context.buffered_message.take() {
            let recent = context.history_for(&chat_id);
            let window_start = recent.len().saturating_sub(10);
            if !message::is_duplicate(&pending, &recent[window_start..]) {
                context.append_and_upgrade(chat_id.clone(), pending.clone());
                outcome.committed_buffered = Some((chat_id.clone(), pending));
            }
        }
        context.pending_delay_ms = 0;
        context.target_chat_id = None;
    }

    // Step 2: save/restore choice state.
    let choices = story.current_choices();
    if let Some(choice) = choices.first() {
        if let Some(target) = &choice.target_chat {
            if target != &chat_id {
                if let Some(prev_chat_id) = previous_chat_id.clone() {
                    context
                        .saved_choices_state
                        .insert(prev_chat_id, story.save_state());
                }
            }
        }
    }
    if let Some(saved) = context.saved_choices_state.remove(&chat_id) {
        if let Err(err) = story.load_state(saved) {
            tracing::warn!(error = %err, chat_id = %chat_id, "failed to restore saved choice state");
        } else {
            outcome.restored_saved_choices = true;
        }
    }

    // Step 3: update view and the previous chat's read cursor.
    context.current_view = CurrentView::Chat(chat_id.clone());
    if let Some(previous) = previous_chat_id {
        let cursor = context.last_message_id(&previous);
        context.last_read_message_id.insert(previous, cursor);
    }

    // Step 4: arm the head of the deferred queue.
    if let Some(queue) = context.deferred_messages.get_mut(&chat_id) {
        if let Some(entry) = queue.pop_front() {
            context.buffered_message = Some(entry.message.clone());
            context.target_chat_id = Some(chat_id.clone());
            context.pending_delay_ms = entry.delay_ms;
            outcome.armed_deferred = Some(entry);
        }
    }

    // Step 5: clear the notification flag.
    context.notified_chat_ids.remove(&chat_id);

    // Step 6: mark existing history as emitted.
    context.mark_all_emitted(&chat_id);

    outcome
}

/// Handle `CLOSE_CHAT`: save the read cursor, save choice state if the
/// open chat still holds choices, and return the view to the hub.
pub fn close_chat(context: &mut ConversationContext, story: &mut dyn Story) {
    let Some(chat_id) = context.current_view.chat_id().cloned() else {
        return;
    };

    let cursor = context.last_message_id(&chat_id);
    context.last_read_message_id.insert(chat_id.clone(), cursor);

    let choices = story.current_choices();
    if choices
        .first()
        .and_then(|c| c.target_chat.as_ref())
        .is_some_and(|target| *target == chat_id)
    {
        context
            .saved_choices_state
            .insert(chat_id, story.save_state());
    }

    context.current_view = CurrentView::Hub;
}
