//! Stable per-account colors for list badges

use indexmap::IndexMap;

use super::resolve_account;
use crate::models::{AccountDirectory, OverviewRecord};

/// Fixed palette, assigned in order. Slots are reused modulo its length
/// once every color is taken.
pub const PALETTE: [&str; 10] = [
    "#2563eb", // blue
    "#16a34a", // green
    "#dc2626", // red
    "#9333ea", // purple
    "#ea580c", // orange
    "#0891b2", // cyan
    "#db2777", // pink
    "#ca8a04", // amber
    "#4f46e5", // indigo
    "#0d9488", // teal
];

/// Color used for keys missing from the map
pub const NEUTRAL_COLOR: &str = "#6b7280";

/// Account color table for one generation of directory + records
///
/// Produced only by [`ColorMap::build`]; rebuild it when the directory or
/// the record set changes instead of editing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMap {
    colors: IndexMap<String, &'static str>,
}

impl ColorMap {
    /// Assign colors to directory accounts first, in directory order, then
    /// to any other account the records resolve to, in record order.
    pub fn build(records: &[OverviewRecord], directory: &AccountDirectory) -> Self {
        let mut map = Self::default();
        for account in directory.accounts() {
            map.assign(account);
        }
        for record in records {
            map.assign(&resolve_account(record, directory));
        }
        map
    }

    fn assign(&mut self, key: &str) {
        if !self.colors.contains_key(key) {
            let color = PALETTE[self.colors.len() % PALETTE.len()];
            self.colors.insert(key.to_string(), color);
        }
    }

    pub fn get(&self, account: &str) -> Option<&'static str> {
        self.colors.get(account).copied()
    }

    /// Color for the account a record resolves to, or [`NEUTRAL_COLOR`]
    pub fn color_of(&self, record: &OverviewRecord, directory: &AccountDirectory) -> &'static str {
        self.get(&resolve_account(record, directory))
            .unwrap_or(NEUTRAL_COLOR)
    }

    /// Badge (letter + color) for a record's account
    pub fn badge(&self, record: &OverviewRecord, directory: &AccountDirectory) -> AccountBadge {
        let account = resolve_account(record, directory);
        let color = self.get(&account).unwrap_or(NEUTRAL_COLOR);
        AccountBadge {
            letter: avatar_letter(&account),
            color,
            account,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.colors.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// What the list shows next to a record to identify its account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBadge {
    pub account: String,
    pub letter: String,
    pub color: &'static str,
}

/// First letter of the account, uppercased, or "?"
pub fn avatar_letter(account: &str) -> String {
    account
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;

    fn record_to(uid: u32, to: &str) -> OverviewRecord {
        OverviewRecord::builder("INBOX", uid)
            .to(vec![EmailAddress::new(to)])
            .build()
    }

    #[test]
    fn test_directory_accounts_take_first_slots() {
        let dir = AccountDirectory::new()
            .with_account("a@x.com", ["INBOX"])
            .with_account("b@x.com", ["INBOX"]);
        let map = ColorMap::build(&[], &dir);
        assert_eq!(map.get("a@x.com"), Some(PALETTE[0]));
        assert_eq!(map.get("b@x.com"), Some(PALETTE[1]));
    }

    #[test]
    fn test_records_add_unseen_accounts_in_order() {
        let dir = AccountDirectory::new().with_account("a@x.com", ["INBOX"]);
        let records = vec![
            record_to(1, "a@x.com"),
            OverviewRecord::builder("INBOX", 2).account("shared@x.com").build(),
            OverviewRecord::builder("INBOX", 3).build(),
            OverviewRecord::builder("INBOX", 4).account("shared@x.com").build(),
        ];
        let map = ColorMap::build(&records, &dir);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("shared@x.com"), Some(PALETTE[1]));
        assert_eq!(map.get("unknown"), Some(PALETTE[2]));
    }

    #[test]
    fn test_one_color_per_key_and_rebuild_is_identical() {
        let dir = AccountDirectory::new()
            .with_account("a@x.com", ["INBOX"])
            .with_account("b@x.com", ["INBOX"]);
        let records = vec![record_to(1, "b@x.com"), record_to(2, "a@x.com"), record_to(3, "b@x.com")];

        let first = ColorMap::build(&records, &dir);
        let second = ColorMap::build(&records, &dir);
        assert_eq!(first, second);
        assert_eq!(first.color_of(&records[0], &dir), first.color_of(&records[2], &dir));
        assert_ne!(first.color_of(&records[0], &dir), first.color_of(&records[1], &dir));
    }

    #[test]
    fn test_palette_cycles_after_exhaustion() {
        let dir: AccountDirectory = (0..PALETTE.len() + 2)
            .map(|i| (format!("user{i}@x.com"), vec!["INBOX".to_string()]))
            .collect();
        let map = ColorMap::build(&[], &dir);
        assert_eq!(map.len(), PALETTE.len() + 2);
        assert_eq!(map.get(&format!("user{}@x.com", PALETTE.len())), Some(PALETTE[0]));
        assert_eq!(map.get(&format!("user{}@x.com", PALETTE.len() + 1)), Some(PALETTE[1]));
    }

    #[test]
    fn test_missing_key_gets_neutral_color() {
        let dir = AccountDirectory::new().with_account("a@x.com", ["INBOX"]);
        let map = ColorMap::build(&[], &dir);
        let stranger = OverviewRecord::builder("INBOX", 9).account("z@q.com").build();
        assert_eq!(map.color_of(&stranger, &dir), NEUTRAL_COLOR);
    }

    #[test]
    fn test_badge_letter() {
        let dir = AccountDirectory::new().with_account("alice@x.com", ["INBOX"]);
        let map = ColorMap::build(&[], &dir);
        let badge = map.badge(&record_to(1, "alice@x.com"), &dir);
        assert_eq!(badge.letter, "A");
        assert_eq!(badge.color, PALETTE[0]);
        assert_eq!(avatar_letter(""), "?");
    }
}
