//! The active mailbox/account/search selection of the list view

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAILBOX: &str = "INBOX";

/// What the list view is currently showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub mailbox: String,
    /// Accounts to include; `None` means every account in the directory
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::mailbox(DEFAULT_MAILBOX)
    }
}

impl Selection {
    pub fn mailbox(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
            accounts: None,
            search: None,
        }
    }

    pub fn inbox() -> Self {
        Self::default()
    }

    /// Restrict the view to the given accounts
    pub fn with_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts = Some(accounts.into_iter().map(Into::into).collect());
        self
    }

    /// Set a free-text search; blank input clears it
    pub fn with_search(mut self, search: &str) -> Self {
        self.search = normalize_search(search);
        self
    }

    /// Whether an account passes the account filter
    pub fn includes_account(&self, account: &str) -> bool {
        match &self.accounts {
            Some(accounts) => accounts.iter().any(|a| a.eq_ignore_ascii_case(account)),
            None => true,
        }
    }
}

/// Trim and collapse internal whitespace; `None` when nothing is left
pub fn normalize_search(s: &str) -> Option<String> {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search("  quarterly   report "), Some("quarterly report".into()));
        assert_eq!(normalize_search(" \t\n"), None);
    }

    #[test]
    fn test_account_filter() {
        let all = Selection::inbox();
        assert!(all.includes_account("anyone@x.com"));

        let some = Selection::inbox().with_accounts(["a@x.com"]);
        assert!(some.includes_account("A@X.com"));
        assert!(!some.includes_account("b@x.com"));
    }
}
