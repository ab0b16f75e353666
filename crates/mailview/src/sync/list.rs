//! Paged overview list for one selection

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::backend::{Cursor, MailBackend, OverviewPage, PageQuery};
use crate::error::{Result, ViewError};
use crate::identity::resolve_account;
use crate::models::{AccountDirectory, MessageKey, OverviewRecord, Selection};

/// What a completed (or skipped) fetch did to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The first page replaced the list
    Replaced { count: usize },
    /// A further page was appended
    Appended { added: usize, duplicates: usize },
    /// Preconditions failed; nothing was fetched
    Skipped,
    /// The result belonged to an older generation and was dropped
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    First,
    More,
}

/// An in-flight page request, tagged with the generation it was issued in
///
/// Obtained from [`ListSyncEngine::begin_first_page`] or
/// [`ListSyncEngine::begin_load_more`] and handed back with the fetch result.
/// Dropping a ticket without completing it cancels the fetch: its loading
/// flag is cleared if the generation is still current.
pub struct PageTicket {
    generation: u64,
    kind: PageKind,
    query: PageQuery,
    state: Weak<RefCell<ListState>>,
    settled: bool,
}

impl PageTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The request to send to the backend
    pub fn query(&self) -> &PageQuery {
        &self.query
    }
}

impl fmt::Debug for PageTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTicket")
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .field("query", &self.query)
            .field("settled", &self.settled)
            .finish()
    }
}

impl Drop for PageTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(shared) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = shared.try_borrow_mut() else {
            log::error!("List state in use; cannot cancel {:?} fetch", self.kind);
            return;
        };
        if state.generation != self.generation {
            return;
        }
        log::debug!("{:?} page fetch cancelled (generation {})", self.kind, self.generation);
        match self.kind {
            PageKind::First => state.is_loading_first = false,
            PageKind::More => state.is_loading_more = false,
        }
    }
}

struct ListState {
    selection: Selection,
    directory: AccountDirectory,
    records: Vec<OverviewRecord>,
    seen: HashSet<MessageKey>,
    next_cursor: Option<Cursor>,
    has_more: bool,
    is_loading_more: bool,
    is_loading_first: bool,
    generation: u64,
    total_count: Option<u64>,
}

impl ListState {
    /// Append records, keeping the first occurrence of each key.
    /// Returns (added, duplicates).
    fn append(&mut self, records: Vec<OverviewRecord>) -> (usize, usize) {
        let mut added = 0;
        let mut duplicates = 0;
        for record in records {
            let fresh = match record.key() {
                Some(key) => self.seen.insert(key),
                None => true,
            };
            if fresh {
                self.records.push(record);
                added += 1;
            } else {
                duplicates += 1;
            }
        }
        (added, duplicates)
    }

    fn is_visible(&self, record: &OverviewRecord) -> bool {
        self.selection.accounts.is_none()
            || self
                .selection
                .includes_account(&resolve_account(record, &self.directory))
    }

    fn has_visible(&self) -> bool {
        self.records.iter().any(|r| self.is_visible(r))
    }
}

/// Owns the record sequence of the active selection
///
/// `has_more` only goes from true to false until the next [`reset`]; a
/// failed fetch never clears it.
///
/// [`reset`]: ListSyncEngine::reset
pub struct ListSyncEngine<B> {
    backend: Rc<B>,
    page_size: usize,
    state: Rc<RefCell<ListState>>,
}

impl<B: MailBackend> ListSyncEngine<B> {
    pub fn new(backend: Rc<B>, page_size: usize) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
            state: Rc::new(RefCell::new(ListState {
                selection: Selection::default(),
                directory: AccountDirectory::new(),
                records: Vec::new(),
                seen: HashSet::new(),
                next_cursor: None,
                has_more: true,
                is_loading_more: false,
                is_loading_first: false,
                generation: 0,
                total_count: None,
            })),
        }
    }

    /// Switch to a new selection: drop every record and invalidate any
    /// in-flight fetch. Returns the new generation.
    pub fn reset(&self, selection: Selection) -> u64 {
        let mut state = self.state.borrow_mut();
        state.selection = selection;
        state.records.clear();
        state.seen.clear();
        state.next_cursor = None;
        state.has_more = true;
        state.is_loading_more = false;
        state.is_loading_first = false;
        state.total_count = None;
        state.generation += 1;
        log::debug!(
            "List reset to {} (generation {})",
            state.selection.mailbox,
            state.generation
        );
        state.generation
    }

    /// Directory used to resolve accounts for the visible view
    pub fn set_directory(&self, directory: AccountDirectory) {
        self.state.borrow_mut().directory = directory;
    }

    /// Start a first-page fetch for the current selection
    pub fn begin_first_page(&self) -> PageTicket {
        let mut state = self.state.borrow_mut();
        state.is_loading_first = true;
        PageTicket {
            generation: state.generation,
            kind: PageKind::First,
            query: PageQuery::first(&state.selection, self.page_size),
            state: Rc::downgrade(&self.state),
            settled: false,
        }
    }

    /// Apply a first-page result: replace the list and take cursor state
    /// from the response
    pub fn complete_first_page(
        &self,
        mut ticket: PageTicket,
        result: anyhow::Result<OverviewPage>,
    ) -> Result<LoadOutcome> {
        ticket.settled = true;
        let mut state = self.state.borrow_mut();
        if ticket.kind != PageKind::First || ticket.generation != state.generation {
            log::debug!(
                "Discarding stale first page (generation {} != {})",
                ticket.generation,
                state.generation
            );
            return Ok(LoadOutcome::Stale);
        }
        state.is_loading_first = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::warn!("First page fetch failed: {e:#}");
                return Err(ViewError::sync(&e));
            }
        };

        let exhausted = page.next_cursor.is_none() || page.records.is_empty();
        state.records.clear();
        state.seen.clear();
        let (count, duplicates) = state.append(page.records);
        if duplicates > 0 {
            log::debug!("Dropped {duplicates} duplicate records from first page");
        }
        state.next_cursor = page.next_cursor;
        state.total_count = page.total_count;
        if exhausted {
            state.has_more = false;
        }

        log::info!(
            "Loaded first page of {}: {} records, has_more={}",
            state.selection.mailbox,
            count,
            state.has_more
        );
        Ok(LoadOutcome::Replaced { count })
    }

    /// Start fetching the next page, or `None` when a fetch would be
    /// pointless or is already running
    pub fn begin_load_more(&self) -> Option<PageTicket> {
        let mut state = self.state.borrow_mut();
        if !state.has_more || state.is_loading_more || state.is_loading_first {
            return None;
        }
        // A view filtered down to nothing must not pull pages on its own
        if !state.has_visible() {
            return None;
        }
        let cursor = state.next_cursor.clone()?;

        state.is_loading_more = true;
        Some(PageTicket {
            generation: state.generation,
            kind: PageKind::More,
            query: PageQuery::after(&state.selection, self.page_size, cursor),
            state: Rc::downgrade(&self.state),
            settled: false,
        })
    }

    /// Apply a further page: append without duplicates and advance the cursor
    pub fn complete_load_more(
        &self,
        mut ticket: PageTicket,
        result: anyhow::Result<OverviewPage>,
    ) -> Result<LoadOutcome> {
        ticket.settled = true;
        let mut state = self.state.borrow_mut();
        if ticket.kind != PageKind::More || ticket.generation != state.generation {
            log::debug!(
                "Discarding stale page (generation {} != {})",
                ticket.generation,
                state.generation
            );
            return Ok(LoadOutcome::Stale);
        }
        state.is_loading_more = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Page fetch failed, will retry on next trigger: {e:#}");
                return Err(ViewError::sync(&e));
            }
        };

        let exhausted = page.next_cursor.is_none() || page.records.is_empty();
        let (added, duplicates) = state.append(page.records);
        if duplicates > 0 {
            log::debug!("Dropped {duplicates} overlapping records");
        }
        state.next_cursor = page.next_cursor;
        if page.total_count.is_some() {
            state.total_count = page.total_count;
        }
        if exhausted {
            state.has_more = false;
        }

        Ok(LoadOutcome::Appended { added, duplicates })
    }

    /// Fetch the first page of the current selection
    pub async fn load_first_page(&self) -> Result<LoadOutcome> {
        let ticket = self.begin_first_page();
        let result = self.backend.fetch_overview_page(ticket.query()).await;
        self.complete_first_page(ticket, result)
    }

    /// Fetch the next page if the preconditions hold
    ///
    /// Dropping the future mid-fetch leaves the list ready for the next
    /// trigger.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let Some(ticket) = self.begin_load_more() else {
            return Ok(LoadOutcome::Skipped);
        };
        let result = self.backend.fetch_overview_page(ticket.query()).await;
        self.complete_load_more(ticket, result)
    }

    /// Reset to `selection` and load its first page
    pub async fn select(&self, selection: Selection) -> Result<LoadOutcome> {
        self.reset(selection);
        self.load_first_page().await
    }

    /// Drop the list and reload the current selection from the start
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        let selection = self.selection();
        self.select(selection).await
    }

    /// Scroll trigger: load more when the viewport nears the end of the
    /// visible view
    pub async fn on_near_end(&self, last_visible_index: usize, threshold: usize) -> Result<LoadOutcome> {
        let len = self.visible_len();
        if !super::near_end(last_visible_index, len, threshold) {
            return Ok(LoadOutcome::Skipped);
        }
        self.load_more().await
    }

    /// Every record fetched for the selection, in arrival order
    pub fn records(&self) -> Ref<'_, [OverviewRecord]> {
        Ref::map(self.state.borrow(), |s| s.records.as_slice())
    }

    /// Records passing the selection's account filter
    pub fn visible(&self) -> Vec<OverviewRecord> {
        let state = self.state.borrow();
        state
            .records
            .iter()
            .filter(|r| state.is_visible(r))
            .cloned()
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        let state = self.state.borrow();
        state.records.iter().filter(|r| state.is_visible(r)).count()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().records.is_empty()
    }

    pub fn selection(&self) -> Selection {
        self.state.borrow().selection.clone()
    }

    pub fn next_cursor(&self) -> Option<Cursor> {
        self.state.borrow().next_cursor.clone()
    }

    pub fn has_more(&self) -> bool {
        self.state.borrow().has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.state.borrow().is_loading_more
    }

    pub fn is_loading_first(&self) -> bool {
        self.state.borrow().is_loading_first
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Total matching messages as last reported by the backend
    pub fn total_count(&self) -> Option<u64> {
        self.state.borrow().total_count
    }
}
