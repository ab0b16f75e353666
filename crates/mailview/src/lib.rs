//! Mailview - client-side view state for a multi-account webmail
//!
//! This crate provides platform-independent view logic including:
//! - Domain models (OverviewRecord, MessageDetail, AccountDirectory)
//! - Account resolution and stable per-account colors
//! - A paged, de-duplicating list engine with stale-result protection
//! - Optimistic flag toggles with exact rollback
//! - HTML sanitization and isolated rendering of message bodies
//! - Message actions (archive, delete, open, attachment download)
//!
//! The crate has no UI dependencies. Hosts supply a [`MailBackend`]
//! adapter; [`HttpBackend`] talks to the webmail REST API and
//! [`InMemoryBackend`] serves tests and demos.

pub mod actions;
pub mod backend;
pub mod config;
pub mod error;
pub mod flags;
pub mod identity;
pub mod models;
pub mod render;
pub mod session;
pub mod sync;

pub use actions::{ARCHIVE_MAILBOX, ActionHandler, OpenedMessage};
pub use backend::{Cursor, CursorState, HttpBackend, InMemoryBackend, MailBackend, OverviewPage, PageQuery};
pub use config::ViewConfig;
pub use error::ViewError;
pub use flags::{FlagStore, PendingToggle, ToggleOutcome};
pub use identity::{AccountBadge, ColorMap, NEUTRAL_COLOR, PALETTE, UNKNOWN_ACCOUNT, resolve_account};
pub use models::{
    AccountDirectory, AttachmentMeta, EmailAddress, Flag, MessageDetail, MessageKey, MessageRef,
    OverviewRecord, Selection,
};
pub use render::{RenderedMessage, Renderer, VisibleAttachment, isolated_document, sanitize_html};
pub use session::{MailSession, RowView};
pub use sync::{ListSyncEngine, LoadOutcome, PageTicket, near_end};
