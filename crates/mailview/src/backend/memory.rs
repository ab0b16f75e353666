//! In-memory backend
//!
//! Serves pages the way the webmail server does: each selected account
//! contributes its newest records below its anchor, the union is sorted by
//! date and truncated to the page size, and only accounts that contributed
//! advance their anchor. Used by tests and as a stub host backend.

use anyhow::{Result, bail};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use super::{AccountAnchor, CursorState, MailBackend, OverviewPage, PageQuery};
use crate::models::{
    AccountDirectory, Flag, MessageDetail, MessageKey, OverviewRecord, normalize_search,
};

struct StoredMessage {
    account: String,
    record: OverviewRecord,
    detail: Option<MessageDetail>,
    parts: HashMap<String, Vec<u8>>,
}

impl StoredMessage {
    fn is(&self, key: &MessageKey) -> bool {
        self.account == key.account
            && self.record.reference.mailbox == key.mailbox
            && self.record.reference.uid == Some(key.uid)
    }
}

/// Failures queued per operation, consumed one per call
#[derive(Default)]
struct FailurePlan {
    overview: usize,
    set_flag: usize,
    detail: usize,
}

pub struct InMemoryBackend {
    directory: RefCell<AccountDirectory>,
    messages: RefCell<Vec<StoredMessage>>,
    failures: RefCell<FailurePlan>,
    overview_calls: Cell<usize>,
    flag_updates: RefCell<Vec<(MessageKey, Flag, bool)>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            directory: RefCell::new(AccountDirectory::new()),
            messages: RefCell::new(Vec::new()),
            failures: RefCell::new(FailurePlan::default()),
            overview_calls: Cell::new(0),
            flag_updates: RefCell::new(Vec::new()),
        }
    }

    /// Register an account with its mailboxes
    pub fn add_account<I, S>(&self, account: &str, mailboxes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directory
            .borrow_mut()
            .insert(account, mailboxes.into_iter().map(Into::into).collect());
    }

    /// Store a record under an account. The record's `ref.account` is left
    /// as given; pages stamp it when absent.
    pub fn insert(&self, account: &str, record: OverviewRecord) {
        self.ensure_mailbox(account, &record.reference.mailbox);
        self.messages.borrow_mut().push(StoredMessage {
            account: account.to_string(),
            record,
            detail: None,
            parts: HashMap::new(),
        });
    }

    /// Attach a full body to a stored message
    pub fn insert_detail(&self, key: &MessageKey, detail: MessageDetail) -> Result<()> {
        let mut messages = self.messages.borrow_mut();
        let Some(stored) = messages.iter_mut().find(|m| m.is(key)) else {
            bail!("No such message: {key}");
        };
        stored.detail = Some(detail);
        Ok(())
    }

    /// Attach downloadable bytes for an attachment part
    pub fn insert_part(&self, key: &MessageKey, part: &str, bytes: Vec<u8>) -> Result<()> {
        let mut messages = self.messages.borrow_mut();
        let Some(stored) = messages.iter_mut().find(|m| m.is(key)) else {
            bail!("No such message: {key}");
        };
        stored.parts.insert(part.to_string(), bytes);
        Ok(())
    }

    /// Make the next `count` overview fetches fail
    pub fn fail_overview(&self, count: usize) {
        self.failures.borrow_mut().overview = count;
    }

    /// Make the next `count` flag updates fail
    pub fn fail_set_flag(&self, count: usize) {
        self.failures.borrow_mut().set_flag = count;
    }

    /// Make the next `count` detail fetches fail
    pub fn fail_detail(&self, count: usize) {
        self.failures.borrow_mut().detail = count;
    }

    /// Number of overview fetches served so far, failed ones included
    pub fn overview_calls(&self) -> usize {
        self.overview_calls.get()
    }

    /// Flag updates accepted so far, in order
    pub fn flag_updates(&self) -> Vec<(MessageKey, Flag, bool)> {
        self.flag_updates.borrow().clone()
    }

    /// Current stored record for a key
    pub fn record(&self, key: &MessageKey) -> Option<OverviewRecord> {
        self.messages
            .borrow()
            .iter()
            .find(|m| m.is(key))
            .map(|m| m.record.clone())
    }

    fn ensure_mailbox(&self, account: &str, mailbox: &str) {
        let mut directory = self.directory.borrow_mut();
        let mut mailboxes = directory
            .mailboxes(account)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if !mailboxes.iter().any(|m| m == mailbox) {
            mailboxes.push(mailbox.to_string());
            directory.insert(account, mailboxes);
        }
    }

    fn take_failure(&self, pick: impl FnOnce(&mut FailurePlan) -> &mut usize, what: &str) -> Result<()> {
        let mut plan = self.failures.borrow_mut();
        let remaining = pick(&mut *plan);
        if *remaining > 0 {
            *remaining -= 1;
            bail!("Simulated {what} failure");
        }
        Ok(())
    }
}

fn matches_search(record: &OverviewRecord, search: Option<&str>) -> bool {
    let Some(term) = search else {
        return true;
    };
    let term = term.to_lowercase();
    let hit = |s: &str| s.to_lowercase().contains(&term);

    hit(&record.subject)
        || hit(&record.preview)
        || record
            .from
            .as_ref()
            .is_some_and(|f| hit(&f.email) || f.name.as_deref().is_some_and(hit))
        || record.to.iter().any(|t| hit(&t.email))
}

impl MailBackend for InMemoryBackend {
    async fn list_accounts(&self) -> Result<AccountDirectory> {
        Ok(self.directory.borrow().clone())
    }

    async fn fetch_overview_page(&self, query: &PageQuery) -> Result<OverviewPage> {
        self.overview_calls.set(self.overview_calls.get() + 1);
        self.take_failure(|p| &mut p.overview, "overview fetch")?;

        if query.page_size < 1 {
            bail!("limit must be >= 1");
        }
        let limit = query.page_size;

        let (mailbox, anchors, search) = match &query.cursor {
            Some(cursor) => {
                let state = CursorState::decode(cursor)?;
                (state.mailbox, state.accounts, state.search_query)
            }
            None => {
                let accounts: Vec<String> = match &query.accounts {
                    Some(accounts) => accounts.clone(),
                    None => self.directory.borrow().accounts().map(str::to_string).collect(),
                };
                let anchors: BTreeMap<String, AccountAnchor> = accounts
                    .into_iter()
                    .map(|a| (a, AccountAnchor::default()))
                    .collect();
                let search = query.search.as_deref().and_then(normalize_search);
                (query.mailbox.clone(), anchors, search)
            }
        };

        if anchors.is_empty() {
            return Ok(OverviewPage::default());
        }

        {
            let directory = self.directory.borrow();
            if let Some(unknown) = anchors.keys().find(|a| !directory.contains(a)) {
                bail!("Unknown account: {unknown}");
            }
        }

        let messages = self.messages.borrow();
        let mut total = 0u64;
        let mut combined: Vec<(&str, &OverviewRecord, u32)> = Vec::new();

        for (account, anchor) in &anchors {
            let mut candidates: Vec<(&OverviewRecord, u32)> = messages
                .iter()
                .filter(|m| m.account == *account && m.record.reference.mailbox == mailbox)
                .filter(|m| matches_search(&m.record, search.as_deref()))
                .filter_map(|m| m.record.reference.uid.map(|uid| (&m.record, uid)))
                .collect();
            total += candidates.len() as u64;

            candidates.retain(|(_, uid)| anchor.next_before_uid.is_none_or(|before| *uid < before));
            candidates.sort_by(|a, b| b.1.cmp(&a.1));
            candidates.truncate(limit);
            combined.extend(candidates.into_iter().map(|(r, uid)| (account.as_str(), r, uid)));
        }

        // Newest first; ties broken by account then uid so pages are stable
        combined.sort_by(|a, b| (b.1.date, b.0, b.2).cmp(&(a.1.date, a.0, a.2)));
        combined.truncate(limit);

        let mut next_anchors = anchors.clone();
        for (account, anchor) in next_anchors.iter_mut() {
            let oldest = combined
                .iter()
                .filter(|(a, _, _)| *a == account.as_str())
                .map(|(_, _, uid)| *uid)
                .min();
            if let Some(oldest) = oldest {
                anchor.next_before_uid = Some(oldest.max(1));
            }
        }

        let records: Vec<OverviewRecord> = combined
            .iter()
            .map(|(account, record, _)| {
                let mut record = (*record).clone();
                if record.reference.account.is_none() {
                    record.reference.account = Some(account.to_string());
                }
                record
            })
            .collect();

        let any_anchor = next_anchors.values().any(|a| a.next_before_uid.is_some());
        let next_cursor = if !records.is_empty() && any_anchor {
            let state = CursorState {
                accounts: next_anchors,
                limit,
                mailbox,
                search_query: search,
            };
            Some(state.encode()?)
        } else {
            None
        };

        Ok(OverviewPage {
            records,
            next_cursor,
            total_count: Some(total),
        })
    }

    async fn fetch_message_detail(&self, key: &MessageKey) -> Result<MessageDetail> {
        self.take_failure(|p| &mut p.detail, "detail fetch")?;

        let messages = self.messages.borrow();
        let Some(stored) = messages.iter().find(|m| m.is(key)) else {
            bail!("Message not found: {key}");
        };
        if let Some(detail) = &stored.detail {
            return Ok(detail.clone());
        }

        let record = &stored.record;
        let mut detail = MessageDetail::new(key.clone().into());
        detail.subject = record.subject.clone();
        detail.from = record.from.clone();
        detail.to = record.to.clone();
        detail.date = record.date;
        detail.text = Some(record.preview.clone());
        Ok(detail)
    }

    async fn fetch_attachment_bytes(&self, key: &MessageKey, part: &str) -> Result<Vec<u8>> {
        let messages = self.messages.borrow();
        let Some(stored) = messages.iter().find(|m| m.is(key)) else {
            bail!("Message not found: {key}");
        };
        match stored.parts.get(part) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("Attachment part {part} not found on {key}"),
        }
    }

    async fn set_flag(&self, key: &MessageKey, flag: Flag, value: bool) -> Result<()> {
        self.take_failure(|p| &mut p.set_flag, "flag update")?;

        let mut messages = self.messages.borrow_mut();
        let Some(stored) = messages.iter_mut().find(|m| m.is(key)) else {
            bail!("Message not found: {key}");
        };
        let flags = &mut stored.record.flags;
        flags.retain(|f| !f.trim_start_matches('\\').eq_ignore_ascii_case(flag.name()));
        if value {
            flags.insert(flag.imap_name().to_string());
        }
        self.flag_updates.borrow_mut().push((key.clone(), flag, value));
        Ok(())
    }

    async fn create_mailbox(&self, account: &str, name: &str) -> Result<()> {
        let mailboxes = match self.directory.borrow().mailboxes(account) {
            Some(mailboxes) => mailboxes.to_vec(),
            None => bail!("Unknown account: {account}"),
        };
        if mailboxes.iter().any(|m| m == name) {
            bail!("Mailbox {name} already exists for {account}");
        }
        self.ensure_mailbox(account, name);
        Ok(())
    }

    async fn move_message(&self, key: &MessageKey, destination: &str) -> Result<()> {
        let exists = self
            .directory
            .borrow()
            .mailboxes(&key.account)
            .is_some_and(|m| m.iter().any(|m| m == destination));
        if !exists {
            bail!("Mailbox {destination} does not exist for {}", key.account);
        }

        let mut messages = self.messages.borrow_mut();
        let Some(stored) = messages.iter_mut().find(|m| m.is(key)) else {
            bail!("Message not found: {key}");
        };
        stored.record.reference.mailbox = destination.to_string();
        if let Some(detail) = stored.detail.as_mut() {
            detail.reference.mailbox = destination.to_string();
        }
        Ok(())
    }

    async fn delete_message(&self, key: &MessageKey) -> Result<()> {
        let mut messages = self.messages.borrow_mut();
        let before = messages.len();
        messages.retain(|m| !m.is(key));
        if messages.len() == before {
            bail!("Message not found: {key}");
        }
        Ok(())
    }
}
