//! Message actions module
//!
//! Archive, delete, open and attachment download. Flag toggles go through
//! [`crate::flags::FlagStore`] so they can be applied optimistically.

mod handler;

pub use handler::{ARCHIVE_MAILBOX, ActionHandler, OpenedMessage, key_of};
