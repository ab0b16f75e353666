//! Full message body and attachment metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{EmailAddress, MessageRef};

/// Metadata for one attachment of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes as reported by the backend; may be missing or bogus
    #[serde(default, alias = "data_size")]
    pub size: Option<i64>,
    /// Opaque body-part identifier; absent means not downloadable
    #[serde(default, alias = "id", deserialize_with = "part_id")]
    pub part: Option<String>,
    #[serde(default)]
    pub inline: bool,
}

impl AttachmentMeta {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            size: None,
            part: None,
            inline: false,
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// The part identifier when it can be used to address the backend
    pub fn usable_part(&self) -> Option<&str> {
        self.part.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// Part ids arrive as strings ("1.2") or bare integers depending on the backend
fn part_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Text(s) => s,
        Repr::Number(n) => n.to_string(),
    }))
}

/// Full message content, fetched on demand when a record is opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDetail {
    #[serde(rename = "ref", default)]
    pub reference: MessageRef,
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "from_email")]
    pub from: Option<EmailAddress>,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentMeta>,
}

impl MessageDetail {
    pub fn new(reference: MessageRef) -> Self {
        Self {
            reference,
            subject: String::new(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            date: None,
            html: None,
            text: None,
            attachments: Vec::new(),
        }
    }
}
