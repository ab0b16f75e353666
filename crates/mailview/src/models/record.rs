//! Overview record: the lightweight list-row summary of one message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::EmailAddress;

/// Boolean message flags the view can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Seen,
    Flagged,
    Answered,
    Draft,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Seen, Flag::Flagged, Flag::Answered, Flag::Draft];

    /// System flag name as stored by IMAP servers (e.g. `\Seen`)
    pub fn imap_name(self) -> &'static str {
        match self {
            Flag::Seen => "\\Seen",
            Flag::Flagged => "\\Flagged",
            Flag::Answered => "\\Answered",
            Flag::Draft => "\\Draft",
        }
    }

    /// Lowercase wire name used in REST payloads
    pub fn name(self) -> &'static str {
        match self {
            Flag::Seen => "seen",
            Flag::Flagged => "flagged",
            Flag::Answered => "answered",
            Flag::Draft => "draft",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unrecognised flag name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown flag: {0}")]
pub struct UnknownFlag(pub String);

impl FromStr for Flag {
    type Err = UnknownFlag;

    /// Accepts wire names, IMAP names and the UI aliases "read"/"starred".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim().trim_start_matches('\\').to_lowercase();
        match bare.as_str() {
            "seen" | "read" => Ok(Flag::Seen),
            "flagged" | "starred" => Ok(Flag::Flagged),
            "answered" => Ok(Flag::Answered),
            "draft" => Ok(Flag::Draft),
            _ => Err(UnknownFlag(s.to_string())),
        }
    }
}

/// Backend reference carried by a record; every part may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Explicit account reference stamped by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub mailbox: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
}

/// Composite identity `(account, mailbox, uid)` of a message
///
/// The uid is only unique within its `(account, mailbox)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageKey {
    pub account: String,
    pub mailbox: String,
    pub uid: u32,
}

impl MessageKey {
    pub fn new(account: impl Into<String>, mailbox: impl Into<String>, uid: u32) -> Self {
        Self {
            account: account.into(),
            mailbox: mailbox.into(),
            uid,
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.mailbox, self.uid)
    }
}

impl From<MessageKey> for MessageRef {
    fn from(key: MessageKey) -> Self {
        Self {
            account: Some(key.account),
            mailbox: key.mailbox,
            uid: Some(key.uid),
        }
    }
}

/// Summary of one message as shown in the list
///
/// Records are never mutated after they are fetched. Pending flag changes
/// live in [`crate::flags::FlagStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRecord {
    #[serde(rename = "ref", default)]
    pub reference: MessageRef,
    /// Record-level account field, used when `ref.account` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "from_email")]
    pub from: Option<EmailAddress>,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    /// Unparsed "To" header, when the backend supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_raw: Option<String>,
    #[serde(default, alias = "received_at")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, alias = "snippet")]
    pub preview: String,
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

impl OverviewRecord {
    /// Create a new record builder
    pub fn builder(mailbox: impl Into<String>, uid: u32) -> OverviewRecordBuilder {
        OverviewRecordBuilder::new(mailbox.into(), uid)
    }

    /// The composite key, when the record carries every part of it
    ///
    /// The account comes from the explicit reference, then the record-level
    /// field. Records without a key cannot be de-duplicated or mutated.
    pub fn key(&self) -> Option<MessageKey> {
        let account = self
            .reference
            .account
            .as_deref()
            .or(self.account.as_deref())
            .filter(|a| !a.is_empty())?;
        if self.reference.mailbox.is_empty() {
            return None;
        }
        let uid = self.reference.uid?;
        Some(MessageKey::new(account, self.reference.mailbox.clone(), uid))
    }

    /// Server-side value of a flag as fetched
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags
            .iter()
            .any(|f| f.trim_start_matches('\\').eq_ignore_ascii_case(flag.name()))
    }
}

/// Builder for creating OverviewRecord instances
pub struct OverviewRecordBuilder {
    record: OverviewRecord,
}

impl OverviewRecordBuilder {
    fn new(mailbox: String, uid: u32) -> Self {
        Self {
            record: OverviewRecord {
                reference: MessageRef {
                    account: None,
                    mailbox,
                    uid: Some(uid),
                },
                account: None,
                subject: String::new(),
                from: None,
                to: Vec::new(),
                to_raw: None,
                date: None,
                preview: String::new(),
                flags: BTreeSet::new(),
            },
        }
    }

    /// Set the explicit account reference
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.record.reference.account = Some(account.into());
        self
    }

    /// Set the record-level account field
    pub fn record_account(mut self, account: impl Into<String>) -> Self {
        self.record.account = Some(account.into());
        self
    }

    pub fn without_uid(mut self) -> Self {
        self.record.reference.uid = None;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.record.subject = subject.into();
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.record.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.record.to = to;
        self
    }

    pub fn to_raw(mut self, raw: impl Into<String>) -> Self {
        self.record.to_raw = Some(raw.into());
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.record.date = Some(date);
        self
    }

    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.record.preview = preview.into();
        self
    }

    pub fn flag(mut self, flag: Flag) -> Self {
        self.record.flags.insert(flag.imap_name().to_string());
        self
    }

    pub fn build(self) -> OverviewRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_explicit_reference() {
        let record = OverviewRecord::builder("INBOX", 7)
            .account("a@x.com")
            .record_account("b@x.com")
            .build();
        assert_eq!(record.key(), Some(MessageKey::new("a@x.com", "INBOX", 7)));
    }

    #[test]
    fn test_key_falls_back_to_record_account() {
        let record = OverviewRecord::builder("INBOX", 7)
            .record_account("b@x.com")
            .build();
        assert_eq!(record.key().unwrap().account, "b@x.com");
    }

    #[test]
    fn test_key_missing_parts() {
        assert!(OverviewRecord::builder("INBOX", 1).build().key().is_none());
        let no_uid = OverviewRecord::builder("INBOX", 1)
            .account("a@x.com")
            .without_uid()
            .build();
        assert!(no_uid.key().is_none());
        let no_mailbox = OverviewRecord::builder("", 1).account("a@x.com").build();
        assert!(no_mailbox.key().is_none());
    }

    #[test]
    fn test_has_flag_accepts_both_spellings() {
        let mut record = OverviewRecord::builder("INBOX", 1).flag(Flag::Seen).build();
        record.flags.insert("flagged".to_string());
        assert!(record.has_flag(Flag::Seen));
        assert!(record.has_flag(Flag::Flagged));
        assert!(!record.has_flag(Flag::Answered));
    }

    #[test]
    fn test_flag_from_str_aliases() {
        assert_eq!("\\Seen".parse::<Flag>(), Ok(Flag::Seen));
        assert_eq!("starred".parse::<Flag>(), Ok(Flag::Flagged));
        assert!("\\Recent".parse::<Flag>().is_err());
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "ref": {"account": "a@x.com", "mailbox": "INBOX", "uid": 42},
            "subject": "Hello",
            "from_email": "Ann <ann@y.com>",
            "to": [{"email": "a@x.com"}],
            "received_at": "2024-05-01T10:00:00Z",
            "snippet": "Hi there",
            "flags": ["\\Seen"]
        }"#;
        let record: OverviewRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.key(), Some(MessageKey::new("a@x.com", "INBOX", 42)));
        assert_eq!(record.from.as_ref().unwrap().label(), "Ann");
        assert_eq!(record.preview, "Hi there");
        assert!(record.date.is_some());
        assert!(record.has_flag(Flag::Seen));
    }
}
