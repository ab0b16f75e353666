//! Optimistic flag state
//!
//! Flag toggles show up in the UI before the backend confirms them. The
//! displayed value combines the fetched server value with local overrides
//! that are reverted exactly when the backend rejects the change.

mod store;

pub use store::{FlagStore, PendingToggle, ToggleOutcome};
