//! Message Factory — turns one chunk's tags plus the interpreter's line text
//! into a typed [`Message`], selecting a variant, filling in defaults, and
//! resolving quotes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::tags::TagMap;

use super::{
    DateField, LinkLayout, LinkPreview, Message, MessageId, MessageKind, MessageType, Receipt,
};

/// Words per second used to estimate a synthetic audio message's duration
/// when no explicit `duration:` tag is present.
const WORDS_PER_SECOND: f64 = 2.3;
const MIN_AUDIO_SECONDS: f64 = 2.0;
const JITTER_FRACTION: f64 = 0.15;

/// Estimate an audio message's duration from its transcript.
///
/// Deterministic: the same transcript always yields the same duration, via
/// a hash-derived jitter rather than real randomness, so repeated calls in
/// tests and replays are reproducible.
pub fn estimate_audio_duration(transcript: &str) -> f64 {
    let word_count = transcript.split_whitespace().count().max(1) as f64;
    let base = (word_count / WORDS_PER_SECOND).max(MIN_AUDIO_SECONDS);

    let mut hasher = DefaultHasher::new();
    transcript.hash(&mut hasher);
    let bucket = (hasher.finish() % 2001) as f64 / 1000.0 - 1.0; // in [-1.0, 1.0]
    let jittered = base * (1.0 + bucket * JITTER_FRACTION);

    jittered.max(MIN_AUDIO_SECONDS)
}

/// Everything the factory needs to build one message from one chunk.
pub struct MessageInput<'a> {
    pub id: MessageId,
    pub message_type: MessageType,
    pub speaker: Option<String>,
    pub time: Option<String>,
    pub date: Option<DateField>,
    pub label: Option<String>,
    pub is_seed: bool,
    pub timestamp: DateTime<Utc>,
    /// The story line's visible text, if this chunk carries a `text`-shaped
    /// payload (as opposed to a pure media tag set).
    pub text: Option<String>,
    pub tags: &'a TagMap,
    /// Messages seen so far, keyed by `label:`, for `quoteRef` resolution.
    pub labeled_messages: &'a HashMap<String, Message>,
}

fn parse_layout(tags: &TagMap) -> LinkLayout {
    tags.link_layout()
        .and_then(LinkLayout::parse)
        .unwrap_or_default()
}

fn link_preview_from_tags(tags: &TagMap) -> Option<LinkPreview> {
    tags.link_url().map(|url| LinkPreview {
        url: url.to_string(),
        domain: tags.link_domain().map(str::to_string),
        title: tags.link_title().map(str::to_string),
        description: tags.link_desc().map(str::to_string),
        image: tags.link_image().map(str::to_string),
        layout: parse_layout(tags),
        is_video: tags.link_video(),
    })
}

/// Build an inline quote from `quote`/`quoteFrom` tags if present, or else
/// resolve `quoteRef` against the label table.
///
/// An explicit `quote` tag takes priority over `quoteRef` when both
/// co-occur. An unresolved `quoteRef` is logged and treated as no quote at
/// all — never fatal to building the message.
fn resolve_quote(
    tags: &TagMap,
    labeled_messages: &HashMap<String, Message>,
) -> Option<super::QuotedContent> {
    if let Some(content) = tags.quote() {
        return Some(super::QuotedContent {
            speaker: tags.quote_from().map(str::to_string),
            content: content.to_string(),
        });
    }

    let reference = tags.quote_ref()?;
    match labeled_messages.get(reference) {
        Some(msg) => msg.as_quoted_content(),
        None => {
            tracing::warn!(label = reference, "unresolved quoteRef, proceeding without a quote");
            None
        }
    }
}

fn select_kind(input: &MessageInput<'_>) -> MessageKind {
    let tags = input.tags;

    if let Some(audio_src) = tags.audio() {
        let transcript = input.text.clone().unwrap_or_default();
        let duration = tags
            .duration()
            .unwrap_or_else(|| estimate_audio_duration(&transcript));
        return MessageKind::Audio {
            audio_src: Some(audio_src.to_string()),
            duration,
            transcript,
            transcript_revealed: false,
        };
    }

    if let Some(image_src) = tags.image() {
        return MessageKind::Image {
            image_src: image_src.to_string(),
            caption: input.text.clone(),
        };
    }

    if let Some(attachment_src) = tags.attachment() {
        return MessageKind::Attachment {
            attachment_src: attachment_src.to_string(),
            caption: input.text.clone(),
        };
    }

    if tags.link_url().is_some() && input.text.is_none() {
        if let Some(preview) = link_preview_from_tags(tags) {
            return MessageKind::LinkPreview { preview };
        }
    }

    MessageKind::Text {
        text: input.text.clone().unwrap_or_default(),
        link_preview: link_preview_from_tags(tags),
        notification_preview: tags.notification_preview().map(str::to_string),
    }
}

/// Build a `Message` from one chunk's inputs, applying variant selection
/// (audio > image > attachment > standalone link preview > text), receipt
/// defaulting, and quote resolution.
pub fn build_message(input: MessageInput<'_>) -> Message {
    let quote = resolve_quote(input.tags, input.labeled_messages);

    let receipt = match input.tags.receipt().and_then(Receipt::parse) {
        Some(explicit) => explicit,
        None => Receipt::default_for(input.message_type),
    };

    Message {
        id: input.id,
        message_type: input.message_type,
        speaker: input.speaker,
        time: input.time,
        date: input.date,
        receipt,
        timestamp: input.timestamp,
        label: input.label,
        quote,
        is_seed: input.is_seed,
        kind: select_kind(&input),
    }
}

/// True if `candidate` duplicates any of `recent`, per the "same kind,
/// type, speaker, and content" rule. `recent` should be the chat's last
/// 10 messages, newest-last or newest-first; order does not matter here.
pub fn is_duplicate(candidate: &Message, recent: &[Message]) -> bool {
    recent.iter().any(|existing| candidate.is_duplicate_of(existing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> TagMap {
        TagMap::parse(raw)
    }

    fn base_input<'a>(tags: &'a TagMap, text: Option<&str>, labels: &'a HashMap<String, Message>) -> MessageInput<'a> {
        MessageInput {
            id: MessageId::new("m1"),
            message_type: MessageType::Received,
            speaker: Some("Pat".to_string()),
            time: Some("9:15 AM".to_string()),
            date: None,
            label: None,
            is_seed: false,
            timestamp: Utc::now(),
            text: text.map(str::to_string),
            tags,
            labeled_messages: labels,
        }
    }

    #[test]
    fn audio_duration_is_deterministic() {
        let a = estimate_audio_duration("hello there friend");
        let b = estimate_audio_duration("hello there friend");
        assert_eq!(a, b);
    }

    #[test]
    fn audio_duration_has_a_floor() {
        assert!(estimate_audio_duration("hi") >= MIN_AUDIO_SECONDS);
    }

    #[test]
    fn plain_text_is_default_variant() {
        let t = tags(&[]);
        let labels = HashMap::new();
        let input = base_input(&t, Some("hello"), &labels);
        let msg = build_message(input);
        assert!(matches!(msg.kind, MessageKind::Text { .. }));
    }

    #[test]
    fn audio_tag_wins_over_text() {
        let t = tags(&["audio:clip.mp3"]);
        let labels = HashMap::new();
        let input = base_input(&t, Some("hello there"), &labels);
        let msg = build_message(input);
        assert!(matches!(msg.kind, MessageKind::Audio { .. }));
    }

    #[test]
    fn received_default_receipt_is_none() {
        let t = tags(&[]);
        let labels = HashMap::new();
        let input = base_input(&t, Some("hi"), &labels);
        let msg = build_message(input);
        assert_eq!(msg.receipt, Receipt::None);
    }

    #[test]
    fn sent_default_receipt_is_delivered() {
        let t = tags(&[]);
        let labels = HashMap::new();
        let mut input = base_input(&t, Some("hi"), &labels);
        input.message_type = MessageType::Sent;
        let msg = build_message(input);
        assert_eq!(msg.receipt, Receipt::Delivered);
    }

    #[test]
    fn unresolved_quote_ref_proceeds_without_a_quote() {
        let t = tags(&["quoteRef:missing"]);
        let labels = HashMap::new();
        let input = base_input(&t, Some("hi"), &labels);
        let msg = build_message(input);
        assert_eq!(msg.quote, None);
    }

    #[test]
    fn explicit_quote_tag_wins_over_quote_ref() {
        let mut labels = HashMap::new();
        let empty_labels = HashMap::new();
        let t_label = tags(&[]);
        let labeled = build_message(base_input(&t_label, Some("earlier line"), &empty_labels));
        labels.insert("earlier".to_string(), labeled);

        let t = tags(&["quoteRef:earlier", "quote:explicit quote", "quoteFrom:Sam"]);
        let input = base_input(&t, Some("hi"), &labels);
        let msg = build_message(input);
        let quote = msg.quote.expect("expected a quote");
        assert_eq!(quote.content, "explicit quote");
        assert_eq!(quote.speaker, Some("Sam".to_string()));
    }

    #[test]
    fn duplicate_detection_matches_same_content() {
        let t = tags(&[]);
        let labels = HashMap::new();
        let input = base_input(&t, Some("hi"), &labels);
        let msg = build_message(input);
        assert!(is_duplicate(&msg, std::slice::from_ref(&msg)));
    }
}
