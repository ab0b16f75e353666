//! Account directory: the ordered set of mail accounts and their mailboxes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mapping of account identity (usually an email address) to its mailboxes
///
/// Insertion order is significant: it breaks resolution ties and decides
/// color assignment order. It serializes as a JSON object, keeping the
/// order in which the backend listed the accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountDirectory(IndexMap<String, Vec<String>>);

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account at the end of the directory.
    ///
    /// Re-inserting an existing account replaces its mailboxes but keeps
    /// its original position.
    pub fn insert(&mut self, account: impl Into<String>, mailboxes: Vec<String>) {
        self.0.insert(account.into(), mailboxes);
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with_account<I, S>(mut self, account: impl Into<String>, mailboxes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(account, mailboxes.into_iter().map(Into::into).collect());
        self
    }

    /// Account identities in directory order
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn mailboxes(&self, account: &str) -> Option<&[String]> {
        self.0.get(account).map(Vec::as_slice)
    }

    pub fn contains(&self, account: &str) -> bool {
        self.0.contains_key(account)
    }

    /// Position of an account in directory order
    pub fn position(&self, account: &str) -> Option<usize> {
        self.0.get_index_of(account)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for AccountDirectory {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
