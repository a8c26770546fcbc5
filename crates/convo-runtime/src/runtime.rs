//! Ties a concrete `Story` implementation to the state machine, drives
//! the processing loop, and owns the single cancellable delay timer.

use std::sync::Arc;
use std::time::Duration;

use convo_state::{ConversationEvent, ConversationMachine, ConversationState, Effect, RuntimeOptions, Story};
use tokio::sync::mpsc;

use crate::bridge::{ExternalFunctionBridge, IdentityLocale};
use crate::bus::EventBus;
use crate::error::RuntimeError;
use crate::snapshot::Snapshot;

/// Owns the interpreter handle and the state machine; the one task driving
/// this struct is "the" logical event loop.
///
/// Also owns the external-function bridge. A concrete `Story`
/// implementation registers its interpreter's callbacks against the same
/// `Arc<ExternalFunctionBridge>` (via [`Self::with_bridge`]) so that
/// `request_data`/`play_sound`/`advance_day` calls made from inside the
/// interpreter surface here as real effects rather than being captured and
/// never drained.
pub struct ConversationRuntime {
    machine: ConversationMachine,
    story: Box<dyn Story + Send>,
    bus: Arc<EventBus>,
    bridge: Arc<ExternalFunctionBridge>,
}

impl ConversationRuntime {
    /// Construct a runtime that owns its own bridge, unshared with the
    /// `Story` implementation. Fine for stories that never call through
    /// the external-function bridge (including every test double in this
    /// workspace).
    pub fn new(story: Box<dyn Story + Send>, options: RuntimeOptions) -> Self {
        Self::with_bridge(
            story,
            options,
            Arc::new(ExternalFunctionBridge::new(Box::new(IdentityLocale))),
        )
    }

    /// Construct a runtime against a bridge the caller has already handed
    /// to the concrete `Story` implementation at construction time, so
    /// both sides observe the same captured state.
    pub fn with_bridge(story: Box<dyn Story + Send>, options: RuntimeOptions, bridge: Arc<ExternalFunctionBridge>) -> Self {
        ConversationRuntime {
            machine: ConversationMachine::new(options),
            story,
            bus: Arc::new(EventBus::new()),
            bridge,
        }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    pub fn bridge(&self) -> Arc<ExternalFunctionBridge> {
        self.bridge.clone()
    }

    pub fn machine(&self) -> &ConversationMachine {
        &self.machine
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.machine.context, self.story.as_ref())
    }

    /// Drain captured bridge state into effects the state machine itself
    /// never produces — the bridge lives one layer above `convo-state` and
    /// has no way to push directly into a `Vec<Effect>`.
    fn drain_bridge_effects(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        for sound_id in self.bridge.drain_sound_cues() {
            effects.push(Effect::AudioCue { sound_id });
        }

        if let Some(request) = self.bridge.take_pending_data_request() {
            effects.push(Effect::DataRequested {
                id: request.id,
                source: request.source,
                query: request.query,
                params: request.params,
            });
        }

        if let Some(morning) = self.bridge.take_day_advance_request() {
            let minutes_since_midnight = self
                .machine
                .context
                .time
                .current()
                .map(|t| t.minutes_since_midnight())
                .unwrap_or(0);
            self.machine.context.battery.advance_day(minutes_since_midnight);
            self.machine.context.time.roll_to_next_day(morning);
            effects.push(Effect::DayAdvanced {
                time: morning,
                day: self.machine.context.time.day(),
            });
            effects.push(Effect::BatteryChanged {
                battery: self.machine.context.battery.level(),
                is_low: self.machine.context.battery.level() <= self.machine.options.low_battery_threshold,
            });
        }

        effects
    }

    /// Emit whatever the bridge accumulated since the last drain, if
    /// anything did.
    fn flush_bridge(&mut self) {
        let effects = self.drain_bridge_effects();
        if !effects.is_empty() {
            self.bus.emit_effects(effects);
        }
    }

    /// Apply one host-originated event to the machine, emitting whatever
    /// effects it produces immediately. Does not drain the processing loop
    /// afterwards — callers drive that via [`Self::run`] or
    /// [`Self::drain`].
    fn handle_event(&mut self, event: ConversationEvent) -> Result<(), RuntimeError> {
        match event {
            ConversationEvent::StoryLoaded {
                story,
                history,
                last_read_message_id,
                deferred_messages,
            } => {
                let effects = self
                    .machine
                    .handle_story_loaded(story, history, last_read_message_id, deferred_messages);
                self.bus.emit_effects(effects);
            }
            ConversationEvent::Choose { index } => {
                let effects = self.machine.handle_choose(index, self.story.as_mut())?;
                self.bus.emit_effects(effects);
            }
            ConversationEvent::OpenChat { chat_id } => {
                let effects = self.machine.handle_open_chat(chat_id, self.story.as_mut());
                self.bus.emit_effects(effects);
            }
            ConversationEvent::CloseChat => {
                let effects = self.machine.handle_close_chat(self.story.as_mut());
                self.bus.emit_effects(effects);
            }
            ConversationEvent::CheckStory => self.machine.handle_check_story(),
            ConversationEvent::ResetGame => self.machine.handle_reset_game(),
            ConversationEvent::MarkChatNotified { chat_id } => {
                self.machine.handle_mark_chat_notified(chat_id);
            }
            ConversationEvent::DataReady { payload } => {
                let was_awaiting = *self.machine.state() == ConversationState::AwaitingData;
                let effects = self.machine.handle_data_ready(payload);
                if was_awaiting {
                    self.story.clear_awaiting_data();
                }
                self.bus.emit_effects(effects);
            }
        }
        self.flush_bridge();
        Ok(())
    }

    /// Drain the `processing` loop until the machine parks in a state that
    /// needs an external event (`waitingForInput`, `awaitingData`, `idle`)
    /// or arms a delay. Does not itself wait out the delay — call [`Self::run`]
    /// for a driver that does.
    fn drain(&mut self) -> Result<(), RuntimeError> {
        loop {
            match self.machine.state() {
                ConversationState::Loading
                | ConversationState::Delaying
                | ConversationState::WaitingForInput
                | ConversationState::AwaitingData
                | ConversationState::Idle => {
                    self.flush_bridge();
                    return Ok(());
                }
                ConversationState::Processing => {
                    let effects = self.machine.evaluate(self.story.as_mut())?;
                    self.bus.emit_effects(effects);
                    self.flush_bridge();
                }
            }
        }
    }

    /// Apply one event and drain the loop up to (but not through) the next
    /// suspension point. Use this for a host that drives the delay timer
    /// itself rather than handing this runtime an event channel.
    pub fn step(&mut self, event: ConversationEvent) -> Result<(), RuntimeError> {
        self.handle_event(event)?;
        self.drain()
    }

    /// The single-task driver loop: repeatedly drains processing,
    /// then races the `delaying` timer against the next inbound event so
    /// `OPEN_CHAT`/`CLOSE_CHAT` can pre-empt an in-flight delay. Returns when
    /// `inbox` closes.
    pub async fn run(&mut self, mut inbox: mpsc::UnboundedReceiver<ConversationEvent>) -> Result<(), RuntimeError> {
        loop {
            self.drain()?;

            if *self.machine.state() == ConversationState::Delaying {
                let delay_ms = self.machine.context.pending_delay_ms;
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                        let effects = self.machine.commit_delayed_message();
                        self.bus.emit_effects(effects);
                        self.flush_bridge();
                    }
                    maybe_event = inbox.recv() => {
                        match maybe_event {
                            Some(event) => self.handle_event(event)?,
                            None => return Ok(()),
                        }
                    }
                }
                continue;
            }

            match inbox.recv().await {
                Some(event) => self.handle_event(event)?,
                None => return Ok(()),
            }
        }
    }
}
