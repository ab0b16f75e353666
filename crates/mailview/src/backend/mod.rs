//! Mail backend capability consumed by the view-state components
//!
//! The engine never speaks a wire protocol itself. Hosts provide an adapter
//! implementing [`MailBackend`]; two ship with the crate:
//! - [`InMemoryBackend`] - reference implementation and test double
//! - [`HttpBackend`] - REST adapter for the webmail server

mod cursor;
mod http;
mod memory;

pub use cursor::{AccountAnchor, Cursor, CursorState};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;

use anyhow::Result;

use crate::models::{AccountDirectory, Flag, MessageDetail, MessageKey, OverviewRecord, Selection};

/// Parameters of one overview page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub mailbox: String,
    /// Accounts to merge; `None` means all of them
    pub accounts: Option<Vec<String>>,
    pub search: Option<String>,
    pub page_size: usize,
    /// Continue after this point; `None` requests the first page
    pub cursor: Option<Cursor>,
}

impl PageQuery {
    pub fn first(selection: &Selection, page_size: usize) -> Self {
        Self {
            mailbox: selection.mailbox.clone(),
            accounts: selection.accounts.clone(),
            search: selection.search.clone(),
            page_size,
            cursor: None,
        }
    }

    pub fn after(selection: &Selection, page_size: usize, cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
            ..Self::first(selection, page_size)
        }
    }
}

/// One page of overview records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewPage {
    pub records: Vec<OverviewRecord>,
    /// `None` means there are no further pages
    pub next_cursor: Option<Cursor>,
    /// Total matching messages across accounts, when the backend knows it
    pub total_count: Option<u64>,
}

/// Asynchronous, fallible operations the webmail server offers
///
/// Futures are not required to be `Send`: the view-state engine runs on a
/// single logical thread and only suspends at these calls.
#[allow(async_fn_in_trait)]
pub trait MailBackend {
    /// List accounts and their mailboxes, in server order
    async fn list_accounts(&self) -> Result<AccountDirectory>;

    /// Fetch one page of overview records
    async fn fetch_overview_page(&self, query: &PageQuery) -> Result<OverviewPage>;

    /// Fetch the full body and attachment metadata of one message
    async fn fetch_message_detail(&self, key: &MessageKey) -> Result<MessageDetail>;

    /// Download one attachment part
    async fn fetch_attachment_bytes(&self, key: &MessageKey, part: &str) -> Result<Vec<u8>>;

    /// Set or clear a flag on one message
    async fn set_flag(&self, key: &MessageKey, flag: Flag, value: bool) -> Result<()>;

    /// Create a mailbox for an account
    async fn create_mailbox(&self, account: &str, name: &str) -> Result<()>;

    /// Move a message to another mailbox of the same account
    async fn move_message(&self, key: &MessageKey, destination: &str) -> Result<()>;

    /// Delete and expunge a message
    async fn delete_message(&self, key: &MessageKey) -> Result<()>;
}
