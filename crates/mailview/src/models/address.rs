//! Email address model

use serde::{Deserialize, Deserializer, Serialize};

/// An email address with optional display name
///
/// Deserializes from either `{"name": .., "email": ..}` or a bare header
/// string such as `"John Doe <john@example.com>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an address from a header value like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(open) = s.rfind('<')
            && let Some(close) = s.rfind('>')
            && open < close
        {
            let name = s[..open].trim().trim_matches('"').trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: s[open + 1..close].trim().to_string(),
            };
        }

        Self::new(s)
    }

    /// Case-insensitive comparison of the address part
    pub fn matches(&self, email: &str) -> bool {
        self.email.trim().to_lowercase() == email.trim().to_lowercase()
    }

    /// The display name when present, otherwise the address
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    /// Format the address as a header value
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Header(String),
    Structured {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: String,
    },
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match AddressRepr::deserialize(deserializer)? {
            AddressRepr::Header(raw) => Self::parse(&raw),
            AddressRepr::Structured { name, email } => Self {
                name: name.filter(|n| !n.trim().is_empty()),
                email,
            },
        })
    }
}
