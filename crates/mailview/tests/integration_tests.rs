//! Integration tests for the mailview crate
//!
//! These tests drive the public API the way a host UI does: load the
//! directory, select a mailbox, scroll, toggle flags and open messages.

use anyhow::bail;
use chrono::{Duration, TimeZone, Utc};
use mailview::backend::{Cursor, InMemoryBackend, MailBackend, OverviewPage, PageQuery};
use mailview::models::{
    AccountDirectory, AttachmentMeta, EmailAddress, Flag, MessageDetail, MessageKey, OverviewRecord,
    Selection,
};
use mailview::{
    FlagStore, ListSyncEngine, LoadOutcome, MailSession, ToggleOutcome, ViewConfig, ViewError,
    resolve_account, sanitize_html,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::task::Poll;
use tokio_test::{block_on, task};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Backend that serves queued overview pages and can hold a fetch open
#[derive(Default)]
struct ScriptedBackend {
    pages: RefCell<VecDeque<anyhow::Result<OverviewPage>>>,
    queries: RefCell<Vec<PageQuery>>,
    held: Cell<bool>,
}

impl ScriptedBackend {
    fn push(&self, page: anyhow::Result<OverviewPage>) {
        self.pages.borrow_mut().push_back(page);
    }
}

impl MailBackend for ScriptedBackend {
    async fn list_accounts(&self) -> anyhow::Result<AccountDirectory> {
        Ok(AccountDirectory::new().with_account("a@x.com", ["INBOX"]))
    }

    async fn fetch_overview_page(&self, query: &PageQuery) -> anyhow::Result<OverviewPage> {
        self.queries.borrow_mut().push(query.clone());
        std::future::poll_fn(|_| if self.held.get() { Poll::Pending } else { Poll::Ready(()) }).await;
        match self.pages.borrow_mut().pop_front() {
            Some(page) => page,
            None => bail!("no page scripted"),
        }
    }

    async fn fetch_message_detail(&self, _: &MessageKey) -> anyhow::Result<MessageDetail> {
        bail!("unsupported")
    }

    async fn fetch_attachment_bytes(&self, _: &MessageKey, _: &str) -> anyhow::Result<Vec<u8>> {
        bail!("unsupported")
    }

    async fn set_flag(&self, _: &MessageKey, _: Flag, _: bool) -> anyhow::Result<()> {
        bail!("unsupported")
    }

    async fn create_mailbox(&self, _: &str, _: &str) -> anyhow::Result<()> {
        bail!("unsupported")
    }

    async fn move_message(&self, _: &MessageKey, _: &str) -> anyhow::Result<()> {
        bail!("unsupported")
    }

    async fn delete_message(&self, _: &MessageKey) -> anyhow::Result<()> {
        bail!("unsupported")
    }
}

fn records(account: &str, uids: impl Iterator<Item = u32>) -> Vec<OverviewRecord> {
    uids.map(|uid| OverviewRecord::builder("INBOX", uid).account(account).build())
        .collect()
}

fn page(records: Vec<OverviewRecord>, cursor: Option<&str>) -> OverviewPage {
    OverviewPage {
        records,
        next_cursor: cursor.map(Cursor::new),
        total_count: None,
    }
}

#[test]
fn test_resolve_by_recipient_list() {
    let directory = AccountDirectory::new().with_account("a@x.com", ["INBOX"]);
    let record = OverviewRecord::builder("INBOX", 1)
        .to(vec![EmailAddress::new("a@x.com")])
        .build();
    assert_eq!(resolve_account(&record, &directory), "a@x.com");
}

#[test]
fn test_resolve_by_raw_to_substring() {
    let directory = AccountDirectory::new()
        .with_account("z@y.com", ["INBOX"])
        .with_account("a@x.com", ["INBOX"]);
    let record = OverviewRecord::builder("INBOX", 1)
        .to_raw("promo+a@x.com-noreply")
        .build();
    assert_eq!(resolve_account(&record, &directory), "a@x.com");
    // Deterministic across calls
    assert_eq!(resolve_account(&record, &directory), resolve_account(&record, &directory));
}

#[test]
fn test_second_page_empty_ends_list() {
    init_logging();
    let backend = Rc::new(ScriptedBackend::default());
    backend.push(Ok(page(records("a@x.com", (1..=50).rev()), Some("C1"))));
    backend.push(Ok(page(vec![], None)));

    let engine = ListSyncEngine::new(backend.clone(), 50);
    block_on(engine.select(Selection::inbox())).unwrap();
    assert!(engine.has_more());

    let outcome = block_on(engine.load_more()).unwrap();
    assert_eq!(outcome, LoadOutcome::Appended { added: 0, duplicates: 0 });
    assert!(!engine.has_more());
    assert_eq!(engine.len(), 50);

    let queries = backend.queries.borrow();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].cursor, None);
    assert_eq!(queries[1].cursor, Some(Cursor::new("C1")));
}

#[test]
fn test_failed_page_is_retryable() {
    init_logging();
    let backend = Rc::new(ScriptedBackend::default());
    backend.push(Ok(page(records("a@x.com", (6..=10).rev()), Some("C1"))));
    backend.push(Err(anyhow::anyhow!("gateway timeout")));
    backend.push(Ok(page(records("a@x.com", (1..=5).rev()), Some("C2"))));

    let engine = ListSyncEngine::new(backend.clone(), 5);
    block_on(engine.select(Selection::inbox())).unwrap();

    let err = block_on(engine.load_more()).unwrap_err();
    assert!(matches!(err, ViewError::SyncFetchFailed { .. }));
    assert!(engine.has_more());
    assert!(!engine.is_loading_more());
    assert_eq!(engine.len(), 5);

    block_on(engine.load_more()).unwrap();
    assert_eq!(engine.len(), 10);
    assert_eq!(backend.queries.borrow()[2].cursor, Some(Cursor::new("C1")));
}

#[test]
fn test_selection_change_discards_in_flight_page() {
    init_logging();
    let backend = Rc::new(ScriptedBackend::default());
    backend.push(Ok(page(records("a@x.com", [9, 8].into_iter()), Some("C1"))));
    backend.push(Ok(page(records("a@x.com", [7, 6].into_iter()), Some("C2"))));

    let engine = ListSyncEngine::new(backend.clone(), 2);
    block_on(engine.select(Selection::inbox())).unwrap();

    backend.held.set(true);
    let mut more = task::spawn(engine.load_more());
    assert!(more.poll().is_pending());
    assert!(engine.is_loading_more());

    // A second trigger while the first is in flight does nothing
    assert_eq!(block_on(engine.load_more()).unwrap(), LoadOutcome::Skipped);

    engine.reset(Selection::mailbox("Archive"));
    backend.held.set(false);
    assert!(matches!(more.poll(), Poll::Ready(Ok(LoadOutcome::Stale))));
    assert!(engine.is_empty());
    assert!(engine.has_more());
    assert_eq!(engine.selection().mailbox, "Archive");
}

#[test]
fn test_abandoned_load_more_does_not_wedge_list() {
    init_logging();
    let backend = Rc::new(ScriptedBackend::default());
    backend.push(Ok(page(records("a@x.com", [9, 8].into_iter()), Some("C1"))));
    backend.push(Ok(page(records("a@x.com", [7, 6].into_iter()), Some("C2"))));

    let engine = ListSyncEngine::new(backend.clone(), 2);
    block_on(engine.select(Selection::inbox())).unwrap();

    // The host gives up on a slow scroll fetch
    backend.held.set(true);
    let mut more = task::spawn(engine.load_more());
    assert!(more.poll().is_pending());
    assert!(engine.is_loading_more());
    drop(more);

    assert!(!engine.is_loading_more());
    assert!(engine.has_more());

    backend.held.set(false);
    let outcome = block_on(engine.load_more()).unwrap();
    assert_eq!(outcome, LoadOutcome::Appended { added: 2, duplicates: 0 });
    assert_eq!(engine.len(), 4);
    let queries = backend.queries.borrow();
    assert_eq!(queries[1].cursor, Some(Cursor::new("C1")));
    assert_eq!(queries[2].cursor, Some(Cursor::new("C1")));
}

#[test]
fn test_rejected_star_reverts_in_session() {
    init_logging();
    let backend = Rc::new(InMemoryBackend::new());
    backend.add_account("a@x.com", ["INBOX"]);
    backend.insert("a@x.com", OverviewRecord::builder("INBOX", 1).subject("Hello").build());

    let session = MailSession::new(backend.clone(), ViewConfig::default());
    block_on(session.load_directory()).unwrap();
    block_on(session.select(Selection::inbox())).unwrap();
    let record = session.list().records()[0].clone();
    let key = record.key().unwrap();

    backend.fail_set_flag(1);
    let result = block_on(session.toggle(&record, Flag::Flagged));

    assert!(matches!(result, Err(ViewError::MutationFailed { flag: Flag::Flagged, .. })));
    assert!(!session.flags().effective(&record, Flag::Flagged));
    assert!(!session.flags().is_busy(&key, Flag::Flagged));
    assert!(!session.rows()[0].flagged);

    // Retrying succeeds and the list stays usable
    assert_eq!(
        block_on(session.toggle(&record, Flag::Flagged)).unwrap(),
        ToggleOutcome::Applied { value: true }
    );
    assert!(session.rows()[0].flagged);
}

#[test]
fn test_toggle_twice_restores_effective_value() {
    let store = FlagStore::new();
    let record = OverviewRecord::builder("INBOX", 3)
        .account("a@x.com")
        .flag(Flag::Seen)
        .build();
    let accept = |_: MessageKey, _: Flag, _: bool| async { Ok(()) };

    block_on(store.toggle(&record, Flag::Seen, accept)).unwrap();
    assert!(!store.effective(&record, Flag::Seen));
    block_on(store.toggle(&record, Flag::Seen, accept)).unwrap();
    assert!(store.effective(&record, Flag::Seen));
}

#[test]
fn test_multi_account_scrolling_has_no_duplicates() {
    init_logging();
    let backend = Rc::new(InMemoryBackend::new());
    backend.add_account("work@x.com", ["INBOX"]);
    backend.add_account("home@y.com", ["INBOX"]);
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    for uid in 1..=40u32 {
        let account = if uid % 3 == 0 { "home@y.com" } else { "work@x.com" };
        backend.insert(
            account,
            OverviewRecord::builder("INBOX", uid)
                .subject(format!("#{uid}"))
                .date(base + Duration::minutes(uid as i64))
                .build(),
        );
    }

    let config = ViewConfig {
        page_size: 7,
        prefetch_threshold: 2,
        ..ViewConfig::default()
    };
    let session = MailSession::new(backend, config);
    block_on(session.load_directory()).unwrap();
    block_on(session.select(Selection::inbox())).unwrap();

    let mut guard = 0;
    while session.list().has_more() {
        let last = session.list().visible_len().saturating_sub(1);
        block_on(session.on_near_end(last)).unwrap();
        guard += 1;
        assert!(guard < 20, "list never finished");
    }

    let rows = session.rows();
    assert_eq!(rows.len(), 40);
    let keys: HashSet<MessageKey> = rows.iter().map(|r| r.record.key().unwrap()).collect();
    assert_eq!(keys.len(), 40);

    // Newest first across both accounts
    let dates: Vec<_> = rows.iter().map(|r| r.record.date.unwrap()).collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));

    // Colors follow directory order
    let colors = session.colors();
    assert_eq!(colors.get("work@x.com"), Some(mailview::PALETTE[0]));
    assert_eq!(colors.get("home@y.com"), Some(mailview::PALETTE[1]));
}

#[test]
fn test_account_filter_hides_other_accounts() {
    let backend = Rc::new(InMemoryBackend::new());
    backend.add_account("a@x.com", ["INBOX"]);
    backend.add_account("b@x.com", ["INBOX"]);
    backend.insert("a@x.com", OverviewRecord::builder("INBOX", 1).build());
    backend.insert("b@x.com", OverviewRecord::builder("INBOX", 1).build());

    let session = MailSession::new(backend, ViewConfig::default());
    block_on(session.load_directory()).unwrap();
    block_on(session.select(Selection::inbox().with_accounts(["b@x.com"]))).unwrap();

    let rows = session.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].badge.account, "b@x.com");
}

#[test]
fn test_open_message_end_to_end() {
    let backend = Rc::new(InMemoryBackend::new());
    backend.add_account("a@x.com", ["INBOX"]);
    backend.insert("a@x.com", OverviewRecord::builder("INBOX", 5).subject("Report").build());
    let key = MessageKey::new("a@x.com", "INBOX", 5);

    let mut detail = MessageDetail::new(key.clone().into());
    detail.html = Some(
        r#"<div class="x" style="color: navy; position: absolute"><a href="javascript:steal()">Open</a> the <b>report</b></div>"#
            .to_string(),
    );
    detail.attachments = vec![
        AttachmentMeta::new("report.pdf", "application/pdf")
            .with_part("2")
            .with_size(1536),
        AttachmentMeta::new("logo.png", "image/png").with_part("3").inline(),
    ];
    backend.insert_detail(&key, detail).unwrap();
    backend.insert_part(&key, "2", vec![1, 2, 3]).unwrap();

    let session = MailSession::new(backend, ViewConfig::default());
    block_on(session.select(Selection::inbox())).unwrap();
    let record = session.list().records()[0].clone();

    let opened = block_on(session.open(&record)).unwrap();
    let fragment = opened.rendered.safe_fragment.clone().unwrap();
    assert!(!fragment.contains("javascript"));
    assert!(!fragment.contains("class="));
    assert!(fragment.contains(r#"style="color: navy""#));
    assert!(opened.rendered.document().unwrap().contains("Content-Security-Policy"));

    let attachments = &opened.rendered.visible_attachments;
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].size_label, "1.5 KB");
    let bytes = block_on(session.download(&record, &attachments[0].attachment)).unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
}

#[test]
fn test_sanitizer_never_emits_scripts() {
    let inputs = [
        "<script>alert(1)</script>",
        "<SCRIPT SRC=//evil.js></SCRIPT><p>x</p>",
        "<img src=x onerror=alert(1)>",
        "<svg onload=alert(1)><script>1</script></svg>",
        "<a href=' javascript:alert(1)'>x</a>",
        "<scr<script>ipt>alert(1)</script>",
    ];
    for input in inputs {
        let out = sanitize_html(input, 1 << 20).unwrap();
        let lowered = out.to_lowercase();
        assert!(!lowered.contains("<script"), "{input} -> {out}");
        assert!(!lowered.contains("onerror") && !lowered.contains("onload"), "{input} -> {out}");
        assert!(!lowered.contains("javascript:"), "{input} -> {out}");
    }
}
