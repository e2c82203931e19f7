//! Raw Telegram message payloads and their classification into `MessageKind`.
//!
//! Classification is presence-of-key in a fixed priority order; the first
//! recognized key wins, so a message never has two kinds.

use serde_json::{Map, Value};

use crate::domain::{ChatId, FileId, MessageId};

/// Media-bearing message keys, in classification priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaLabel {
    Photo,
    Voice,
    Video,
    Document,
}

impl MediaLabel {
    pub const ALL: [MediaLabel; 4] = [
        MediaLabel::Photo,
        MediaLabel::Voice,
        MediaLabel::Video,
        MediaLabel::Document,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MediaLabel::Photo => "photo",
            MediaLabel::Voice => "voice",
            MediaLabel::Video => "video",
            MediaLabel::Document => "document",
        }
    }
}

/// A file reference extracted from a message, with the message caption if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub file_id: FileId,
    pub caption: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    Photo(Media),
    Voice(Media),
    Video(Media),
    Document(Media),
    Unrecognized,
}

impl MessageKind {
    pub fn from_media(label: MediaLabel, media: Media) -> Self {
        match label {
            MediaLabel::Photo => MessageKind::Photo(media),
            MediaLabel::Voice => MessageKind::Voice(media),
            MediaLabel::Video => MessageKind::Video(media),
            MediaLabel::Document => MessageKind::Document(media),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text(_) => "text",
            MessageKind::Photo(_) => "photo",
            MessageKind::Voice(_) => "voice",
            MessageKind::Video(_) => "video",
            MessageKind::Document(_) => "document",
            MessageKind::Unrecognized => "unrecognized",
        }
    }

    pub fn media(&self) -> Option<&Media> {
        match self {
            MessageKind::Photo(m)
            | MessageKind::Voice(m)
            | MessageKind::Video(m)
            | MessageKind::Document(m) => Some(m),
            MessageKind::Text(_) | MessageKind::Unrecognized => None,
        }
    }
}

/// The raw `message` object of the latest update, kept as a JSON mapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; anything that is not an object yields `None`.
    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.0
            .get("message_id")
            .and_then(Value::as_i64)
            .map(MessageId)
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.0
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(ChatId)
    }

    /// Unix timestamp (seconds) the message was sent at.
    pub fn date(&self) -> Option<i64> {
        self.0.get("date").and_then(Value::as_i64)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    /// Content of the `text` key whatever its JSON type; strings verbatim.
    pub fn text_lossy(&self) -> Option<String> {
        match self.0.get("text")? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.0.get("caption").and_then(Value::as_str)
    }

    /// Extract the `file_id` under `label`, plus the caption if the message has one.
    ///
    /// The payload is either a single mapping or a list of variants ordered
    /// smallest to largest (photo sizes); the last variant is used.
    pub fn media(&self, label: MediaLabel) -> Option<Media> {
        let payload = self.0.get(label.key())?;
        let entry = match payload {
            Value::Array(items) => items.last()?,
            other => other,
        };
        let file_id = entry.get("file_id").and_then(Value::as_str)?;

        Some(Media {
            file_id: FileId(file_id.to_string()),
            caption: self.caption().map(str::to_string),
        })
    }

    /// Classify by key presence: text > photo > voice > video > document.
    pub fn classify(&self) -> MessageKind {
        if let Some(text) = self.text_lossy() {
            return MessageKind::Text(text);
        }

        for label in MediaLabel::ALL {
            if !self.has(label.key()) {
                continue;
            }
            return match self.media(label) {
                Some(media) => MessageKind::from_media(label, media),
                None => {
                    tracing::warn!("{} payload without a file_id", label.key());
                    MessageKind::Unrecognized
                }
            };
        }

        MessageKind::Unrecognized
    }
}
