//! Account identity: which account owns a record, and which color it gets

mod colors;
mod resolver;

pub use colors::{AccountBadge, ColorMap, NEUTRAL_COLOR, PALETTE, avatar_letter};
pub use resolver::{UNKNOWN_ACCOUNT, resolve_account};
