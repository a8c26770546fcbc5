//! The Message data model and the Message Factory.

mod content;
mod factory;

pub use content::{LinkLayout, LinkPreview, QuotedContent};
pub use factory::{build_message, estimate_audio_duration, is_duplicate, MessageInput};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat identifier. Newtype over `String` so "unique id per chat" and
/// "known-chat-set membership" are checked at the type boundary rather than
/// by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    /// The sink chat for chunks whose target could not be resolved.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn unknown() -> Self {
        ChatId(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        ChatId(s.to_string())
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        ChatId(s)
    }
}

/// A message identifier, unique within the chat it belongs to and stable
/// across serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        MessageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The high-water-mark sentinel and per-chat cursor used to drive the
/// unread separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCursor {
    /// No message in the chat has ever been read; the separator anchors
    /// before the first message.
    BeforeAll,
    /// The reader's cursor sits at (and includes) this message.
    At(MessageId),
}

const BEFORE_ALL_SENTINEL: &str = "__BEFORE_ALL__";

impl Serialize for ReadCursor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ReadCursor::BeforeAll => serializer.serialize_str(BEFORE_ALL_SENTINEL),
            ReadCursor::At(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for ReadCursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == BEFORE_ALL_SENTINEL {
            Ok(ReadCursor::BeforeAll)
        } else {
            Ok(ReadCursor::At(MessageId::new(s)))
        }
    }
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Sent,
    Received,
    System,
}

impl MessageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "received" => Some(Self::Received),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Read-receipt status. `Ord` follows declaration order so "receipt only
/// advances" is a plain `new >= old` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receipt {
    None,
    Sent,
    Delivered,
    Read,
}

impl Receipt {
    /// The default receipt for a freshly constructed message of `message_type`.
    pub fn default_for(message_type: MessageType) -> Self {
        match message_type {
            MessageType::Sent => Receipt::Delivered,
            MessageType::Received | MessageType::System => Receipt::None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// `date` may be a display string or a relative day offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateField {
    Display(String),
    Relative(i64),
}

/// The kind-specific payload of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        link_preview: Option<LinkPreview>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification_preview: Option<String>,
    },
    Audio {
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_src: Option<String>,
        duration: f64,
        transcript: String,
        transcript_revealed: bool,
    },
    Image {
        image_src: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Attachment {
        attachment_src: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    LinkPreview {
        #[serde(flatten)]
        preview: LinkPreview,
    },
    /// A synthetic, text-free message carrying only a status change
    /// ("status.* only").
    Status,
}

impl MessageKind {
    /// The "visible payload" used both for duplicate-detection content keys
    /// and for building a `QuotedContent` from this message.
    pub fn visible_payload(&self) -> Option<String> {
        match self {
            MessageKind::Text { text, .. } => Some(text.clone()),
            MessageKind::Audio { transcript, .. } => Some(transcript.clone()),
            MessageKind::Image { caption, .. } => caption.clone(),
            MessageKind::Attachment { caption, .. } => caption.clone(),
            MessageKind::LinkPreview { preview } => Some(preview.url.clone()),
            MessageKind::Status => None,
        }
    }

    fn content_key(&self) -> String {
        match self {
            MessageKind::Text { text, link_preview } => {
                format!("text:{text}:{}", link_preview.as_ref().map(|p| p.url.as_str()).unwrap_or(""))
            }
            MessageKind::Audio { audio_src, .. } => {
                format!("audio:{}", audio_src.as_deref().unwrap_or(""))
            }
            MessageKind::Image { image_src, .. } => format!("image:{image_src}"),
            MessageKind::Attachment { attachment_src, .. } => {
                format!("attachment:{attachment_src}")
            }
            MessageKind::LinkPreview { preview } => format!("link:{}", preview.url),
            MessageKind::Status => "status".to_string(),
        }
    }

    fn discriminant_name(&self) -> &'static str {
        match self {
            MessageKind::Text { .. } => "text",
            MessageKind::Audio { .. } => "audio",
            MessageKind::Image { .. } => "image",
            MessageKind::Attachment { .. } => "attachment",
            MessageKind::LinkPreview { .. } => "link_preview",
            MessageKind::Status => "status",
        }
    }
}

/// A single chat message: common envelope fields plus a kind-specific
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateField>,
    pub receipt: Receipt,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuotedContent>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_seed: bool,
    #[serde(flatten)]
    pub kind: MessageKind,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Message {
    /// True iff `self` and `other` are duplicate candidates under the rule
    /// same kind, type, speaker, and kind-specific content.
    pub fn is_duplicate_of(&self, other: &Message) -> bool {
        self.message_type == other.message_type
            && self.speaker == other.speaker
            && self.kind.discriminant_name() == other.kind.discriminant_name()
            && self.kind.content_key() == other.kind.content_key()
    }

    /// Build the `QuotedContent` a later message would embed if it quoted
    /// this one.
    pub fn as_quoted_content(&self) -> Option<QuotedContent> {
        self.kind.visible_payload().map(|content| QuotedContent {
            speaker: self.speaker.clone(),
            content,
        })
    }

    pub fn with_receipt(&self, receipt: Receipt) -> Message {
        let mut clone = self.clone();
        clone.receipt = receipt;
        clone
    }
}
