//! Shared content types embedded in messages: link previews and resolved
//! quote references.

use serde::{Deserialize, Serialize};

/// How a link preview should be laid out by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkLayout {
    Card,
    Inline,
    Minimal,
}

impl LinkLayout {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(Self::Card),
            "inline" => Some(Self::Inline),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }
}

impl Default for LinkLayout {
    fn default() -> Self {
        Self::Card
    }
}

/// A link preview, either embedded in a `text` message or standalone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub layout: LinkLayout,
    pub is_video: bool,
}

/// The resolved payload of a `quoteRef`, embedded into the quoting message.
///
/// Built from the referenced message's *visible* payload (text, image src,
/// audio transcript, or attachment caption) plus its original speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub content: String,
}
