//! Conversation State Machine — orchestrates story advancement, per-chunk
//! processing, delay buffering, and stall detection.
//!
//! A `state` field plus a bounded transition history, and a driving
//! function that computes the next state from the current one and an
//! event/evaluation pass.

use std::collections::VecDeque;

use convo_core::{chunk, message, ChatId, Message, MessageType, Receipt, TagMap};
use serde_json::Value;

use crate::context::{ConversationContext, CurrentView};
use crate::diagnostics::{detect_stall, unknown_target_chat, Diagnostic, DiagnosticLog};
use crate::effects::Effect;
use crate::error::TransitionError;
use crate::events::DeferredEntry;
use crate::options::RuntimeOptions;
use crate::receipt;
use crate::states::ConversationState;
use crate::story::Story;
use crate::view;

/// One recorded transition; the history itself is bounded the same way a
/// round log is capped to the most recent N entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConversationState,
    pub to: ConversationState,
}

pub struct ConversationMachine {
    state: ConversationState,
    pub context: ConversationContext,
    pub diagnostics: DiagnosticLog,
    pub options: RuntimeOptions,
    history: VecDeque<StateTransition>,
    max_history: usize,
}

impl ConversationMachine {
    pub fn new(options: RuntimeOptions) -> Self {
        ConversationMachine {
            state: ConversationState::Loading,
            context: ConversationContext::new(),
            diagnostics: DiagnosticLog::new(),
            options,
            history: VecDeque::new(),
            max_history: 50,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.history.iter()
    }

    fn transition_to(&mut self, next: ConversationState) {
        if next == self.state {
            return;
        }
        let from = std::mem::replace(&mut self.state, next.clone());
        self.history.push_back(StateTransition { from, to: next });
        if self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    fn is_current_chat(&self, chat_id: &ChatId) -> bool {
        self.context.current_view.chat_id() == Some(chat_id)
    }

    // ---- STORY_LOADED ----------------------------------------------------

    pub fn handle_story_loaded(
        &mut self,
        _story_blob: Value,
        history: std::collections::HashMap<ChatId, Vec<Message>>,
        last_read: std::collections::HashMap<ChatId, convo_core::ReadCursor>,
        deferred: std::collections::HashMap<ChatId, Vec<DeferredEntry>>,
    ) -> Vec<Effect> {
        let mut history = history;
        receipt::bulk_upgrade_on_load(&mut history);

        self.context.message_history = history;
        self.context.last_read_message_id = last_read;
        self.context.deferred_messages = deferred
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect();
        // notifiedChatIds is intentionally not restored.
        self.context.notified_chat_ids.clear();

        self.transition_to(ConversationState::Processing);
        vec![Effect::Ready]
    }

    // ---- CHOOSE ------------------------------------------------------------

    pub fn handle_choose(
        &mut self,
        index: usize,
        story: &mut dyn Story,
    ) -> Result<Vec<Effect>, TransitionError> {
        if self.state != ConversationState::WaitingForInput {
            return Err(TransitionError::InvalidEvent {
                state: self.state.clone(),
                event: "CHOOSE".to_string(),
            });
        }

        let choices = story.current_choices();
        let Some(choice) = choices.get(index) else {
            self.diagnostics
                .push(Diagnostic::InvalidChoiceIndex { index });
            return Ok(vec![]);
        };

        let belongs_to_open_view = match (&choice.target_chat, self.context.current_view.chat_id()) {
            (Some(target), Some(open)) => target == open,
            _ => false,
        };
        if !belongs_to_open_view {
            self.diagnostics
                .push(Diagnostic::ChoiceChatMismatch { index });
            return Ok(vec![]);
        }

        let chat_id = choice.target_chat.clone().unwrap();
        let text = choice.text.clone();

        story
            .choose_choice_index(index)
            .map_err(TransitionError::StoryError)?;

        self.transition_to(ConversationState::Processing);
        Ok(vec![Effect::MessageSent {
            chat_id,
            choice_index: index,
            text,
        }])
    }

    // ---- OPEN_CHAT / CLOSE_CHAT --------------------------------------------

    pub fn handle_open_chat(&mut self, chat_id: ChatId, story: &mut dyn Story) -> Vec<Effect> {
        let mut effects = Vec::new();

        // "Opening is a flush point": an in-flight delay is cancelled and its
        // buffered message committed immediately, regardless of which chat
        // it targets.
        if self.state == ConversationState::Delaying {
            if let (Some(pending), Some(target)) = (
                self.context.buffered_message.take(),
                self.context.target_chat_id.take(),
            ) {
                effects.push(Effect::TypingEnd {
                    chat_id: target.clone(),
                });
                let is_current = self.is_current_chat(&target);
                self.context.append_and_upgrade(target.clone(), pending.clone());
                effects.push(Effect::MessageReceived {
                    chat_id: target,
                    message: pending,
                    is_current_chat: is_current,
                });
            }
            self.context.pending_delay_ms = 0;
        }

        let outcome = view::open_chat(&mut self.context, chat_id.clone(), story);

        if let Some((committed_chat, message)) = outcome.committed_buffered {
            effects.push(Effect::MessageReceived {
                chat_id: committed_chat,
                message,
                is_current_chat: true,
            });
        }

        effects.push(Effect::NotificationDismiss {
            chat_id: chat_id.clone(),
        });
        effects.push(Effect::ChatOpened {
            chat_id: chat_id.clone(),
            messages: self.context.history_for(&chat_id).to_vec(),
        });

        self.transition_to(ConversationState::Processing);
        effects
    }

    pub fn handle_close_chat(&mut self, story: &mut dyn Story) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.state == ConversationState::Delaying {
            if let Some(target) = self.context.target_chat_id.take() {
                effects.push(Effect::TypingEnd { chat_id: target });
            }
            self.context.buffered_message = None;
            self.context.pending_delay_ms = 0;
            view::close_chat(&mut self.context, story);
            effects.push(Effect::ChatClosed);
            self.transition_to(ConversationState::Idle);
            return effects;
        }

        view::close_chat(&mut self.context, story);
        effects.push(Effect::ChatClosed);
        effects
    }

    pub fn handle_mark_chat_notified(&mut self, chat_id: ChatId) {
        self.context.notified_chat_ids.insert(chat_id);
    }

    /// `CHECK_STORY`: re-attempt forward progress from `idle`. A no-op in
    /// every other state, since those are proper suspensions waiting on a
    /// specific different event.
    pub fn handle_check_story(&mut self) {
        if self.state == ConversationState::Idle {
            self.transition_to(ConversationState::Processing);
        }
    }

    pub fn handle_reset_game(&mut self) {
        self.context.is_resetting = true;
    }

    pub fn handle_data_ready(&mut self, payload: Value) -> Vec<Effect> {
        if self.state != ConversationState::AwaitingData {
            return vec![];
        }
        self.transition_to(ConversationState::Processing);
        vec![Effect::DataReceived { payload }]
    }

    // ---- the processing loop -----------------------------------------------

    /// One evaluation of `processing`'s priority order.
    /// Callers (the async driver in `convo-runtime`) call this repeatedly;
    /// it returns the effects produced by at most one unit of work, so the
    /// driver can interleave timers and incoming events between calls.
    pub fn evaluate(&mut self, story: &mut dyn Story) -> Result<Vec<Effect>, TransitionError> {
        // A bare `#delay:N` chunk only accumulates `pendingDelay` without
        // attaching a message; the machine only actually waits once a
        // message has been buffered against that delay.
        if self.context.buffered_message.is_some() {
            let speaker = self
                .context
                .buffered_message
                .as_ref()
                .and_then(|m| m.speaker.clone());
            let chat_id = self.context.target_chat_id.clone();
            self.transition_to(ConversationState::Delaying);
            return Ok(match chat_id {
                Some(chat_id) => vec![Effect::TypingStart { chat_id, speaker }],
                None => vec![],
            });
        }

        if story.is_awaiting_data() {
            self.transition_to(ConversationState::AwaitingData);
            return Ok(vec![]);
        }

        if story.can_continue() {
            self.transition_to(ConversationState::Processing);
            return self.process_one_chunk(story);
        }

        let choices = story.current_choices();
        if !choices.is_empty() {
            self.transition_to(ConversationState::WaitingForInput);
            return Ok(vec![Effect::ChoicesAvailable { choices }]);
        }

        self.transition_to(ConversationState::Idle);
        if let Some(diag) = detect_stall(
            story.current_path_string(),
            story.current_path_visit_count(),
            story.turn_index(),
            story.is_ending_path(),
            self.options.stall_visit_threshold,
            self.options.stall_turn_threshold,
        ) {
            self.diagnostics.push(diag);
        }
        Ok(vec![])
    }

    /// Commit the currently buffered message once its delay has elapsed
    /// (the `delaying` state's timeout transition). Called by the async
    /// driver after its armed timer fires.
    pub fn commit_delayed_message(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let (Some(message), Some(chat_id)) = (
            self.context.buffered_message.take(),
            self.context.target_chat_id.take(),
        ) {
            effects.push(Effect::TypingEnd {
                chat_id: chat_id.clone(),
            });
            let is_current = self.is_current_chat(&chat_id);
            self.context.append_and_upgrade(chat_id.clone(), message.clone());
            effects.push(Effect::MessageReceived {
                chat_id: chat_id.clone(),
                message,
                is_current_chat: is_current,
            });
            // Only the head of a chat's deferred queue is armed at open time;
            // the tail arms itself as each previous commit completes,
            // chaining the replay without a second OPEN_CHAT.
            if let Some(queue) = self.context.deferred_messages.get_mut(&chat_id) {
                if let Some(next) = queue.pop_front() {
                    self.context.buffered_message = Some(next.message);
                    self.context.target_chat_id = Some(chat_id);
                    self.context.pending_delay_ms = next.delay_ms;
                    // Re-enter `processing` so the next `evaluate()` call sees the
                    // freshly armed `buffered_message` and emits `typing-start` for
                    // it before the driver starts the next timer.
                    self.transition_to(ConversationState::Processing);
                    return effects;
                }
            }
        }
        self.context.pending_delay_ms = 0;
        self.transition_to(ConversationState::Processing);
        if let Some(signal) = self.context.receipt_changed.take() {
            effects.push(Effect::ReceiptChanged {
                chat_id: signal.chat_id,
                label: signal.label,
                receipt: signal.receipt,
            });
        }
        effects
    }

    fn apply_time_tag(&mut self, tags: &TagMap, just_started: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if just_started {
            self.context.time.start();
        }
        if let Some(day) = tags.day().and_then(|d| d.parse::<u64>().ok()) {
            self.context.time.apply_day(day);
        }
        if let Some(raw) = tags.time() {
            let before = self.context.time.current();
            match self.context.time.apply_time(raw) {
                Ok(()) => {
                    if let Some(after) = self.context.time.current() {
                        if before != Some(after) {
                            effects.push(Effect::TimeUpdated {
                                time: after,
                                day: self.context.time.day(),
                            });
                            if let Some(before) = before {
                                let elapsed = after
                                    .minutes_since_midnight()
                                    .saturating_sub(before.minutes_since_midnight());
                                if elapsed > 0 {
                                    self.context.battery.drain(elapsed as f64);
                                    effects.push(Effect::BatteryChanged {
                                        battery: self.context.battery.level(),
                                        is_low: self.context.battery.level()
                                            <= self.options.low_battery_threshold,
                                    });
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "time tag rejected");
                }
            }
        }
        effects
    }

    /// The per-chunk step algorithm.
    fn process_one_chunk(&mut self, story: &mut dyn Story) -> Result<Vec<Effect>, TransitionError> {
        let mut effects = Vec::new();

        // Step 1: advance and parse.
        let chunk = story
            .continue_chunk()
            .map_err(TransitionError::StoryError)?;
        let text = chunk.text.trim();
        let tags = TagMap::parse(&chunk.tags);

        // Step 2: resolve target chat (tag wins over the story variable;
        // the variable must only be read after Continue()'s variable
        // resets have already happened, which `continue_chunk` already
        // performed atomically).
        let story_chat_var = story.current_chat_variable();
        let resolution = chunk::resolve_target_chat(
            tags.target_chat(),
            story_chat_var.as_deref(),
            &self.context.known_chats,
        );
        if resolution.fell_back_to_unknown {
            let attempted = tags.target_chat().or(story_chat_var.as_deref()).map(str::to_string);
            let not_yet_logged = match &attempted {
                Some(id) => self.context.notified_unknown_chats.insert(id.clone()),
                None => true,
            };
            if not_yet_logged {
                self.diagnostics.push(unknown_target_chat(attempted));
            }
        }
        let target_chat_id = ChatId::from(resolution.chat_id.as_str());

        // Step 3: story-started tracking.
        let story_started = chunk::story_started(self.context.story_started_this_render, &tags);
        let just_started = !self.context.story_started_this_render && story_started;
        effects.extend(self.apply_time_tag(&tags, just_started));
        self.context.story_started_this_render = story_started;

        // Step 4: deferred receipt upgrade short-circuits the rest.
        if let Some(deferred) = tags.receipt_deferred() {
            if let Some(status) = Receipt::parse(&deferred.status) {
                if let Some(signal) =
                    receipt::explicit_upgrade(&mut self.context, &deferred.label, status)
                {
                    effects.push(Effect::ReceiptChanged {
                        chat_id: signal.chat_id,
                        label: signal.label,
                        receipt: signal.receipt,
                    });
                }
            }
            self.context.pending_delay_ms =
                chunk::compose_delay(self.context.pending_delay_ms, tags.delay_ms());
            return Ok(effects);
        }

        // Step 5: empty-text branches.
        if text.is_empty() {
            match chunk::classify_empty_text_chunk(&tags, tags.story_start()) {
                chunk::EmptyTextChunk::StoryStartOnly => {
                    self.context.pending_delay_ms =
                        chunk::compose_delay(self.context.pending_delay_ms, tags.delay_ms());
                    return Ok(effects);
                }
                chunk::EmptyTextChunk::StatusOnly => {
                    self.append_status_message(target_chat_id, &tags, &mut effects)?;
                    return Ok(effects);
                }
                chunk::EmptyTextChunk::DelayOnly => {
                    self.context.pending_delay_ms =
                        chunk::compose_delay(self.context.pending_delay_ms, tags.delay_ms());
                    return Ok(effects);
                }
                chunk::EmptyTextChunk::NoOp => return Ok(effects),
            }
        }

        // Step 6: seed-skip guard.
        if !story_started {
            let has_seed = self
                .context
                .history_for(&target_chat_id)
                .iter()
                .any(|m| m.is_seed);
            if has_seed {
                return Ok(effects);
            }
        }

        // Step 7: build the message.
        let message_id = self.context.next_message_id(&target_chat_id);
        let message = message::build_message(message::MessageInput {
            id: message_id,
            message_type: tags
                .message_type()
                .and_then(MessageType::parse)
                .unwrap_or(MessageType::Received),
            speaker: tags.speaker().map(str::to_string),
            time: tags.time().map(str::to_string),
            date: tags.date().map(|d| convo_core::DateField::Display(d.to_string())),
            label: tags.label().map(str::to_string),
            is_seed: false,
            timestamp: chrono::Utc::now(),
            text: Some(text.to_string()),
            tags: &tags,
            labeled_messages: &self.context.labeled_messages,
        });

        self.insert_message(target_chat_id, message, tags.delay_ms(), tags.immediate(), &mut effects)?;

        Ok(effects)
    }

    fn append_status_message(
        &mut self,
        target_chat_id: ChatId,
        tags: &TagMap,
        effects: &mut Vec<Effect>,
    ) -> Result<(), TransitionError> {
        let message_id = self.context.next_message_id(&target_chat_id);
        let message = Message {
            id: message_id,
            message_type: MessageType::System,
            speaker: tags.speaker().map(str::to_string),
            time: tags.time().map(str::to_string),
            date: None,
            receipt: Receipt::None,
            timestamp: chrono::Utc::now(),
            label: None,
            quote: None,
            is_seed: false,
            kind: convo_core::MessageKind::Status,
        };
        if let Some(presence) = tags.presence() {
            effects.push(Effect::PresenceChanged {
                chat_id: target_chat_id.clone(),
                status: presence.to_string(),
            });
        }
        if let Some(percent) = tags.status().battery() {
            self.context.battery.set_level(percent);
            effects.push(Effect::BatteryChanged {
                battery: self.context.battery.level(),
                is_low: self.context.battery.level() <= self.options.low_battery_threshold,
            });
        }
        self.insert_message(target_chat_id, message, tags.delay_ms(), false, effects)
    }

    /// Steps 8-11 of the per-chunk algorithm: dedup, deferred routing,
    /// high-water mark, delay decision.
    fn insert_message(
        &mut self,
        target_chat_id: ChatId,
        message: Message,
        captured_delay_ms: Option<u64>,
        immediate: bool,
        effects: &mut Vec<Effect>,
    ) -> Result<(), TransitionError> {
        // Step 8: dedup.
        let recent = self.context.history_for(&target_chat_id);
        let window_start = recent.len().saturating_sub(10);
        if message::is_duplicate(&message, &recent[window_start..]) {
            return Ok(());
        }

        // isBackground requires the view to actually be a *different* chat;
        // the hub counts as foreground for every chat, so messages
        // delivered while at the hub never notify.
        let is_background = matches!(
            &self.context.current_view,
            CurrentView::Chat(open) if open != &target_chat_id
        );
        let already_notified = self.context.notified_chat_ids.contains(&target_chat_id);
        let current_view_chat_id = self.context.current_view.chat_id().map(ChatId::as_str);
        let defer_eligible = chunk::is_background_and_already_notified(
            current_view_chat_id,
            target_chat_id.as_str(),
            already_notified,
        );

        // Step 9: deferred-delivery routing.
        if defer_eligible && immediate {
            self.flush_deferred_queue(target_chat_id.clone(), effects);
            self.context.append_and_upgrade(target_chat_id.clone(), message.clone());
            effects.push(Effect::MessageReceived {
                chat_id: target_chat_id,
                message,
                is_current_chat: false,
            });
            return Ok(());
        }

        if defer_eligible {
            let delay_ms = captured_delay_ms.unwrap_or(self.options.default_deferred_delay_ms);
            self.context
                .deferred_messages
                .entry(target_chat_id)
                .or_default()
                .push_back(DeferredEntry { message, delay_ms });
            return Ok(());
        }

        // Step 10: high-water mark.
        let will_notify = is_background && !already_notified;
        if will_notify && !self.context.last_read_message_id.contains_key(&target_chat_id) {
            let cursor = self.context.last_message_id(&target_chat_id);
            self.context
                .last_read_message_id
                .insert(target_chat_id.clone(), cursor);
        }
        if will_notify {
            if let Some(preview) = message.kind.visible_payload() {
                effects.push(Effect::NotificationShow {
                    chat_id: target_chat_id.clone(),
                    preview,
                });
            }
            self.context.notified_chat_ids.insert(target_chat_id.clone());
        }

        // Step 11: delay decision.
        let total_delay = chunk::compose_delay(self.context.pending_delay_ms, captured_delay_ms);
        let total_delay = if self.options.reduce_motion { 0 } else { total_delay };

        if total_delay > 0 {
            self.context.buffered_message = Some(message);
            self.context.target_chat_id = Some(target_chat_id);
            self.context.pending_delay_ms = total_delay;
        } else {
            let is_current = self.is_current_chat(&target_chat_id);
            self.context.append_and_upgrade(target_chat_id.clone(), message.clone());
            effects.push(Effect::MessageReceived {
                chat_id: target_chat_id,
                message,
                is_current_chat: is_current,
            });
            if let Some(signal) = self.context.receipt_changed.take() {
                effects.push(Effect::ReceiptChanged {
                    chat_id: signal.chat_id,
                    label: signal.label,
                    receipt: signal.receipt,
                });
            }
        }

        Ok(())
    }

    fn flush_deferred_queue(&mut self, chat_id: ChatId, effects: &mut Vec<Effect>) {
        let Some(mut queue) = self.context.deferred_messages.remove(&chat_id) else {
            return;
        };
        while let Some(entry) = queue.pop_front() {
            let is_current = self.is_current_chat(&chat_id);
            self.context.append_and_upgrade(chat_id.clone(), entry.message.clone());
            effects.push(Effect::MessageReceived {
                chat_id: chat_id.clone(),
                message: entry.message,
                is_current_chat: is_current,
            });
            if let Some(signal) = self.context.receipt_changed.take() {
                effects.push(Effect::ReceiptChanged {
                    chat_id: signal.chat_id,
                    label: signal.label,
                    receipt: signal.receipt,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque as Deque;

    /// A minimal queued-chunk `Story` double, local to this module — the
    /// scripted double in `convo-runtime`'s test suite lives on the far
    /// side of the crate boundary and can't be reused here.
    #[derive(Default)]
    struct QueueStory {
        queue: Deque<crate::story::Chunk>,
    }

    impl QueueStory {
        fn push(&mut self, text: &str, tags: &[&str]) {
            self.queue.push_back(crate::story::Chunk {
                text: text.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            });
        }
    }

    impl Story for QueueStory {
        fn can_continue(&self) -> bool {
            !self.queue.is_empty()
        }

        fn continue_chunk(&mut self) -> Result<crate::story::Chunk, String> {
            self.queue.pop_front().ok_or_else(|| "empty".to_string())
        }

        fn current_choices(&self) -> Vec<crate::story::Choice> {
            Vec::new()
        }

        fn choose_choice_index(&mut self, _index: usize) -> Result<(), String> {
            Ok(())
        }

        fn current_chat_variable(&self) -> Option<String> {
            None
        }

        fn is_awaiting_data(&self) -> bool {
            false
        }

        fn clear_awaiting_data(&mut self) {}

        fn current_path_string(&self) -> Option<String> {
            None
        }

        fn current_path_visit_count(&self) -> u32 {
            0
        }

        fn turn_index(&self) -> u32 {
            0
        }

        fn is_ending_path(&self) -> bool {
            false
        }

        fn save_state(&self) -> Value {
            Value::Null
        }

        fn load_state(&mut self, _state: Value) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn unknown_target_chat_is_only_logged_once_per_id() {
        let mut machine = ConversationMachine::new(RuntimeOptions::default());
        machine.context.known_chats.insert("P".to_string());

        let mut story = QueueStory::default();
        story.push("hi", &["targetChat:ghost"]);
        story.push("again", &["targetChat:ghost"]);

        machine.evaluate(&mut story).unwrap();
        machine.evaluate(&mut story).unwrap();

        let unknown_count = machine
            .diagnostics
            .entries()
            .filter(|d| matches!(d, Diagnostic::UnknownTargetChat { .. }))
            .count();
        assert_eq!(unknown_count, 1);
    }

    /// A `sent`/`delivered` message already in history is upgraded to
    /// `read` the moment a `received` message lands in the same chat, and
    /// both the upgrade and the new message are reported.
    #[test]
    fn auto_receipt_upgrade_fires_alongside_the_triggering_message() {
        let mut machine = ConversationMachine::new(RuntimeOptions::default());
        machine.context.known_chats.insert("P".to_string());
        machine.context.current_view = CurrentView::Chat(ChatId::from("P"));

        let delivered = Message {
            id: machine.context.next_message_id(&ChatId::from("P")),
            message_type: MessageType::Sent,
            speaker: None,
            time: None,
            date: None,
            receipt: Receipt::Delivered,
            timestamp: chrono::Utc::now(),
            label: None,
            quote: None,
            is_seed: false,
            kind: convo_core::MessageKind::Text {
                text: "Hey".to_string(),
                link_preview: None,
                notification_preview: None,
            },
        };
        machine
            .context
            .message_history
            .entry(ChatId::from("P"))
            .or_default()
            .push(delivered);

        let mut story = QueueStory::default();
        story.push("Yo", &["targetChat:P", "speaker:P"]);

        let effects = machine.evaluate(&mut story).unwrap();

        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReceiptChanged { receipt: Receipt::Read, .. })));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::MessageReceived { chat_id, .. } if chat_id.as_str() == "P"
        )));
    }

    /// A seed block that re-executes after `story_start` against a chat
    /// whose history already holds the matching seed content is dropped by
    /// the step-8 dedup check: no append, no emitted effects, and the
    /// render-started flag is left untouched.
    #[test]
    fn reexecuted_seed_block_after_story_start_is_dropped() {
        let mut machine = ConversationMachine::new(RuntimeOptions::default());
        machine.context.known_chats.insert("N".to_string());
        machine.context.story_started_this_render = true;

        let seeded = Message {
            id: machine.context.next_message_id(&ChatId::from("N")),
            message_type: MessageType::Received,
            speaker: Some("Pat".to_string()),
            time: None,
            date: None,
            receipt: Receipt::None,
            timestamp: chrono::Utc::now(),
            label: None,
            quote: None,
            is_seed: true,
            kind: convo_core::MessageKind::Text {
                text: "Welcome".to_string(),
                link_preview: None,
                notification_preview: None,
            },
        };
        machine
            .context
            .message_history
            .entry(ChatId::from("N"))
            .or_default()
            .push(seeded);

        let mut story = QueueStory::default();
        story.push("Welcome", &["targetChat:N", "speaker:Pat"]);

        let effects = machine.evaluate(&mut story).unwrap();

        assert!(effects.is_empty());
        assert_eq!(machine.context.history_for(&ChatId::from("N")).len(), 1);
        assert!(machine.context.story_started_this_render);
    }
}
