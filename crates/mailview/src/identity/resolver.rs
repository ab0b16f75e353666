//! Account resolution for records that may not say which account owns them

use crate::models::{AccountDirectory, OverviewRecord};

/// Sentinel returned when nothing identifies the owning account
pub const UNKNOWN_ACCOUNT: &str = "unknown";

/// Resolve which account a record belongs to.
///
/// Pure and total. Priority order:
/// 1. the explicit `ref.account`, returned unchanged;
/// 2. the first directory account (in directory order) that exactly matches
///    a recipient address, ignoring case;
/// 3. the first directory account contained in the raw "To" string,
///    ignoring case;
/// 4. the record-level `account` field, or [`UNKNOWN_ACCOUNT`].
///
/// When several accounts match, directory order wins rather than the most
/// specific match.
pub fn resolve_account(record: &OverviewRecord, directory: &AccountDirectory) -> String {
    if let Some(account) = record.reference.account.as_deref().filter(|a| !a.is_empty()) {
        return account.to_string();
    }

    if !directory.is_empty() && !record.to.is_empty() {
        let recipients: Vec<String> = record
            .to
            .iter()
            .map(|addr| addr.email.trim().to_lowercase())
            .collect();
        if let Some(account) = directory
            .accounts()
            .find(|account| recipients.iter().any(|r| *r == account.to_lowercase()))
        {
            return account.to_string();
        }
    }

    if let Some(raw) = record.to_raw.as_deref().filter(|r| !r.is_empty()) {
        let raw = raw.to_lowercase();
        if let Some(account) = directory
            .accounts()
            .find(|account| !account.is_empty() && raw.contains(&account.to_lowercase()))
        {
            return account.to_string();
        }
    }

    record
        .account
        .clone()
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string())
}
