//! Typed core of the conversation runtime: tag parsing, the message model
//! and factory, time/battery simulation, and the pure chunk helpers the
//! state machine builds on.

pub mod battery;
pub mod chunk;
pub mod error;
pub mod message;
pub mod tags;
pub mod time;

pub use battery::BatteryContext;
pub use error::CoreError;
pub use message::{
    ChatId, DateField, LinkLayout, LinkPreview, Message, MessageId, MessageKind, MessageType,
    QuotedContent, ReadCursor, Receipt,
};
pub use tags::{ReceiptDeferred, StatusMap, TagMap, TagValue};
pub use time::{TimeContext, TimeOfDay};
