//! List sync engine: grows the overview list page by page
//!
//! Pages are appended idempotently (duplicate keys are dropped) and results
//! that arrive after a selection change are discarded by generation.

mod list;

pub use list::{ListSyncEngine, LoadOutcome, PageTicket};

/// Whether the last visible row is within `threshold` rows of the end of a
/// list of `len` rows. An empty list is never near its end.
pub fn near_end(last_visible_index: usize, len: usize, threshold: usize) -> bool {
    if len == 0 {
        return false;
    }
    let remaining = len.saturating_sub(last_visible_index.saturating_add(1));
    remaining <= threshold
}
