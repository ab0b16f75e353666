//! Domain models shared by the view-state components

mod account;
mod address;
mod detail;
mod record;
mod selection;

pub use account::AccountDirectory;
pub use address::EmailAddress;
pub use detail::{AttachmentMeta, MessageDetail};
pub use record::{Flag, MessageKey, MessageRef, OverviewRecord, OverviewRecordBuilder, UnknownFlag};
pub use selection::{DEFAULT_MAILBOX, Selection, normalize_search};
