//! Pagination cursors
//!
//! To the engine a [`Cursor`] is an opaque token. Adapters that mint their
//! own cursors use [`CursorState`]: compact JSON with sorted keys, encoded
//! as unpadded URL-safe base64, which is what the webmail server issues.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ViewError;

/// Opaque "continue after this point" token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-account position: continue with uids strictly below this one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAnchor {
    pub next_before_uid: Option<u32>,
}

/// Decoded cursor contents
///
/// Fields are declared in alphabetical order so the serialized JSON has
/// sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub accounts: BTreeMap<String, AccountAnchor>,
    pub limit: usize,
    pub mailbox: String,
    pub search_query: Option<String>,
}

impl CursorState {
    pub fn encode(&self) -> Result<Cursor, ViewError> {
        let raw = serde_json::to_vec(self).map_err(|e| ViewError::InvalidCursor {
            message: e.to_string(),
        })?;
        Ok(Cursor(URL_SAFE_NO_PAD.encode(raw)))
    }

    /// Decode a cursor; padded input is accepted
    pub fn decode(cursor: &Cursor) -> Result<Self, ViewError> {
        let token = cursor.as_str().trim().trim_end_matches('=');
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| ViewError::InvalidCursor {
                message: format!("not base64: {e}"),
            })?;
        serde_json::from_slice(&raw).map_err(|e| ViewError::InvalidCursor {
            message: format!("malformed cursor state: {e}"),
        })
    }
}
