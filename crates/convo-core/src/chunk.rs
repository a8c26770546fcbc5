//! Chunk Helpers — pure functions shared by the per-chunk step algorithm:
//! target-chat resolution, empty-text classification, and delay
//! composition. Duplicate detection lives in [`crate::message::factory`].

use std::collections::HashSet;

use crate::tags::TagMap;

/// The resolved destination of a chunk, plus whether resolution fell back
/// to the `"unknown"` sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetChatResolution {
    pub chat_id: String,
    pub fell_back_to_unknown: bool,
}

/// Resolve the target chat for the current chunk: the `targetChat` tag
/// wins over the story's `current_chat` variable. If neither is present,
/// or the resolved id isn't in `known_chats`, the chunk routes to the
/// `"unknown"` sink chat.
///
/// `known_chats` empty means "no validation available"; treat every
/// candidate as known in that case rather than always falling back.
pub fn resolve_target_chat(
    tag_target_chat: Option<&str>,
    story_current_chat: Option<&str>,
    known_chats: &HashSet<String>,
) -> TargetChatResolution {
    let candidate = tag_target_chat.or(story_current_chat);

    match candidate {
        Some(id) if known_chats.is_empty() || known_chats.contains(id) => TargetChatResolution {
            chat_id: id.to_string(),
            fell_back_to_unknown: false,
        },
        Some(unknown_id) => {
            tracing::warn!(chat_id = unknown_id, "chunk targets an unrecognized chat, routing to unknown");
            TargetChatResolution {
                chat_id: "unknown".to_string(),
                fell_back_to_unknown: true,
            }
        }
        None => {
            tracing::warn!("chunk has no resolvable target chat, routing to unknown");
            TargetChatResolution {
                chat_id: "unknown".to_string(),
                fell_back_to_unknown: true,
            }
        }
    }
}

/// Whether a chunk's `story_start` is newly encountered this render, or
/// was already true coming in.
pub fn story_started(already_started: bool, tags: &TagMap) -> bool {
    already_started || tags.story_start()
}

/// The classification of a chunk whose text is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyTextChunk {
    /// Only a `story_start` flag; no content to append.
    StoryStartOnly,
    /// Only `status:*`/`presence:*` tags; append a synthetic status message.
    StatusOnly,
    /// Only a `delay:` tag; accumulate delay, append nothing.
    DelayOnly,
    /// Nothing recognizable; skip entirely.
    NoOp,
}

/// Classify an empty-text chunk. Callers must check `text.trim().is_empty()`
/// before calling this — it does not re-derive emptiness itself.
pub fn classify_empty_text_chunk(tags: &TagMap, just_started: bool) -> EmptyTextChunk {
    if just_started && tags.is_empty_of_content() {
        return EmptyTextChunk::StoryStartOnly;
    }
    if tags.has_only_status() {
        return EmptyTextChunk::StatusOnly;
    }
    if tags.has_only_delay() {
        return EmptyTextChunk::DelayOnly;
    }
    EmptyTextChunk::NoOp
}

/// Compose the running `pendingDelay` with this chunk's captured `delay:`
/// tag.
pub fn compose_delay(pending_delay_ms: u64, captured_delay_ms: Option<u64>) -> u64 {
    pending_delay_ms + captured_delay_ms.unwrap_or(0)
}

/// Whether this message's delivery must be deferred because the
/// destination chat is in the background and has already received its
/// first notification.
pub fn is_background_and_already_notified(
    current_view_chat_id: Option<&str>,
    target_chat_id: &str,
    already_notified: bool,
) -> bool {
    let is_background = current_view_chat_id != Some(target_chat_id);
    is_background && already_notified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tag_target_wins_over_variable() {
        let r = resolve_target_chat(Some("P"), Some("N"), &known(&["P", "N"]));
        assert_eq!(r.chat_id, "P");
        assert!(!r.fell_back_to_unknown);
    }

    #[test]
    fn falls_back_to_variable_when_no_tag() {
        let r = resolve_target_chat(None, Some("N"), &known(&["P", "N"]));
        assert_eq!(r.chat_id, "N");
    }

    #[test]
    fn unknown_id_falls_back_to_unknown_sink() {
        let r = resolve_target_chat(Some("ghost"), None, &known(&["P", "N"]));
        assert_eq!(r.chat_id, "unknown");
        assert!(r.fell_back_to_unknown);
    }

    #[test]
    fn no_candidate_falls_back_to_unknown_sink() {
        let r = resolve_target_chat(None, None, &known(&["P", "N"]));
        assert_eq!(r.chat_id, "unknown");
    }

    #[test]
    fn empty_known_set_skips_validation() {
        let r = resolve_target_chat(Some("anything"), None, &HashSet::new());
        assert_eq!(r.chat_id, "anything");
        assert!(!r.fell_back_to_unknown);
    }

    #[test]
    fn classify_story_start_only() {
        let tags = TagMap::parse(&["story_start"]);
        assert_eq!(
            classify_empty_text_chunk(&tags, true),
            EmptyTextChunk::StoryStartOnly
        );
    }

    #[test]
    fn classify_status_only() {
        let tags = TagMap::parse(&["status:battery:50"]);
        assert_eq!(
            classify_empty_text_chunk(&tags, false),
            EmptyTextChunk::StatusOnly
        );
    }

    #[test]
    fn classify_delay_only() {
        let tags = TagMap::parse(&["delay:500"]);
        assert_eq!(
            classify_empty_text_chunk(&tags, false),
            EmptyTextChunk::DelayOnly
        );
    }

    #[test]
    fn classify_no_op() {
        let tags = TagMap::parse(&[] as &[&str]);
        assert_eq!(classify_empty_text_chunk(&tags, false), EmptyTextChunk::NoOp);
    }

    #[test]
    fn delay_composes_additively() {
        assert_eq!(compose_delay(200, Some(300)), 500);
        assert_eq!(compose_delay(0, None), 0);
    }

    #[test]
    fn background_requires_both_conditions() {
        assert!(is_background_and_already_notified(Some("N"), "P", true));
        assert!(!is_background_and_already_notified(Some("P"), "P", true));
        assert!(!is_background_and_already_notified(Some("N"), "P", false));
    }
}
