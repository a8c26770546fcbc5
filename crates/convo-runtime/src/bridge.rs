//! The fixed external-function callback contract a concrete story
//! implementation registers with its interpreter, plus the
//! lookahead-safety declaration for each entry.
//!
//! The interpreter may call these during lookahead (predicate evaluation)
//! as well as real execution; callbacks that mutate runtime state declare
//! themselves unsafe for that so a `Story` implementation knows to gate
//! them behind "am I actually executing, not just evaluating a condition".

use std::sync::Mutex;

use convo_core::TimeOfDay;
use serde_json::Value;

/// Whether a bridge call may run during the interpreter's lookahead pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadSafety {
    Safe,
    Unsafe,
}

/// One request captured by `request_data`, awaiting a `DATA_READY` event.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub id: String,
    pub source: String,
    pub query: String,
    pub params: Value,
}

/// Resolves a locale id (+ optional variant) to a display name. Modeled as
/// a trait rather than a loader: the bridge needs somewhere to route
/// `name()` calls, but loading a locale table from disk is out of scope.
pub trait LocaleResolver: Send + Sync {
    fn resolve(&self, id: &str, variant: Option<&str>) -> Option<String>;
}

/// A resolver that always falls back to the bare id, for hosts that have
/// not wired up localization.
pub struct IdentityLocale;

impl LocaleResolver for IdentityLocale {
    fn resolve(&self, _id: &str, _variant: Option<&str>) -> Option<String> {
        None
    }
}

/// The fixed external-function contract, lookahead safety per entry:
///
/// | name | lookahead-safe |
/// |---|---|
/// | `delay_next` | no |
/// | `play_sound` | yes |
/// | `advance_day` | no |
/// | `name` | yes |
/// | `request_data` | no |
pub struct ExternalFunctionBridge {
    locale: Box<dyn LocaleResolver>,
    captured_delay_ms: Mutex<Option<u64>>,
    day_advance_requested: Mutex<Option<Option<TimeOfDay>>>,
    pending_data_request: Mutex<Option<DataRequest>>,
    sound_cues: Mutex<Vec<String>>,
    next_request_id: Mutex<u64>,
}

impl ExternalFunctionBridge {
    pub fn new(locale: Box<dyn LocaleResolver>) -> Self {
        ExternalFunctionBridge {
            locale,
            captured_delay_ms: Mutex::new(None),
            day_advance_requested: Mutex::new(None),
            pending_data_request: Mutex::new(None),
            sound_cues: Mutex::new(Vec::new()),
            next_request_id: Mutex::new(0),
        }
    }

    /// Give the table above teeth: a concrete `Story` implementation checks
    /// this before invoking the real callback during the interpreter's
    /// lookahead pass, rather than trusting the doc comment alone.
    pub fn lookahead_safety(name: &str) -> LookaheadSafety {
        match name {
            "play_sound" | "name" => LookaheadSafety::Safe,
            _ => LookaheadSafety::Unsafe,
        }
    }

    /// `delay_next(ms)` — not lookahead-safe.
    pub fn delay_next(&self, ms: u64) {
        *self.captured_delay_ms.lock().unwrap() = Some(ms);
    }

    /// `play_sound(soundId)` — lookahead-safe (pure audio-cue emission).
    pub fn play_sound(&self, sound_id: &str) {
        self.sound_cues.lock().unwrap().push(sound_id.to_string());
    }

    /// `advance_day(morningTime?)` — not lookahead-safe.
    pub fn advance_day(&self, morning_time: Option<&str>) {
        let parsed = morning_time.and_then(TimeOfDay::parse);
        *self.day_advance_requested.lock().unwrap() = Some(parsed);
    }

    /// `name(id, variant?)` — lookahead-safe. Falls back to `id` itself,
    /// never returning nothing.
    pub fn name(&self, id: &str, variant: Option<&str>) -> String {
        self.locale.resolve(id, variant).unwrap_or_else(|| id.to_string())
    }

    /// `request_data(source, query, params)` — not lookahead-safe. Marks
    /// the story awaiting data and returns the request id for correlation.
    pub fn request_data(&self, source: &str, query: &str, params: Value) -> String {
        let mut counter = self.next_request_id.lock().unwrap();
        let id = format!("req-{}", *counter);
        *counter += 1;
        *self.pending_data_request.lock().unwrap() = Some(DataRequest {
            id: id.clone(),
            source: source.to_string(),
            query: query.to_string(),
            params,
        });
        id
    }

    /// Drain the delay captured since the last drain, if any.
    pub fn take_captured_delay_ms(&self) -> Option<u64> {
        self.captured_delay_ms.lock().unwrap().take()
    }

    pub fn take_day_advance_request(&self) -> Option<Option<TimeOfDay>> {
        self.day_advance_requested.lock().unwrap().take()
    }

    pub fn take_pending_data_request(&self) -> Option<DataRequest> {
        self.pending_data_request.lock().unwrap().take()
    }

    pub fn drain_sound_cues(&self) -> Vec<String> {
        std::mem::take(&mut self.sound_cues.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_falls_back_to_id_with_no_resolver_entry() {
        let bridge = ExternalFunctionBridge::new(Box::new(IdentityLocale));
        assert_eq!(bridge.name("pat", None), "pat");
    }

    #[test]
    fn delay_next_is_captured_and_drains_once() {
        let bridge = ExternalFunctionBridge::new(Box::new(IdentityLocale));
        bridge.delay_next(500);
        assert_eq!(bridge.take_captured_delay_ms(), Some(500));
        assert_eq!(bridge.take_captured_delay_ms(), None);
    }

    #[test]
    fn request_data_marks_pending_and_returns_a_correlation_id() {
        let bridge = ExternalFunctionBridge::new(Box::new(IdentityLocale));
        let id = bridge.request_data("weather", "today", Value::Null);
        let pending = bridge.take_pending_data_request().unwrap();
        assert_eq!(pending.id, id);
        assert_eq!(pending.source, "weather");
    }

    #[test]
    fn lookahead_safety_matches_the_fixed_table() {
        assert_eq!(ExternalFunctionBridge::lookahead_safety("play_sound"), LookaheadSafety::Safe);
        assert_eq!(ExternalFunctionBridge::lookahead_safety("name"), LookaheadSafety::Safe);
        assert_eq!(ExternalFunctionBridge::lookahead_safety("delay_next"), LookaheadSafety::Unsafe);
        assert_eq!(ExternalFunctionBridge::lookahead_safety("advance_day"), LookaheadSafety::Unsafe);
        assert_eq!(ExternalFunctionBridge::lookahead_safety("request_data"), LookaheadSafety::Unsafe);
    }
}
