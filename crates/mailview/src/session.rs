//! One webmail session: directory, list, flags and colors together
//!
//! The session owns each piece of view state and keeps the derived parts
//! (color map, flag overrides) in step with the record list.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::actions::{ActionHandler, OpenedMessage, key_of};
use crate::backend::MailBackend;
use crate::config::ViewConfig;
use crate::error::{Result, ViewError};
use crate::flags::{FlagStore, ToggleOutcome};
use crate::identity::{AccountBadge, ColorMap};
use crate::models::{AccountDirectory, AttachmentMeta, Flag, OverviewRecord, Selection};
use crate::render::Renderer;
use crate::sync::{ListSyncEngine, LoadOutcome};

/// Everything a list row needs to draw itself
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub record: OverviewRecord,
    pub badge: AccountBadge,
    pub seen: bool,
    pub flagged: bool,
    /// A star toggle for this row is waiting on the backend
    pub flag_pending: bool,
}

pub struct MailSession<B> {
    backend: Rc<B>,
    config: ViewConfig,
    directory: RefCell<AccountDirectory>,
    list: ListSyncEngine<B>,
    flags: FlagStore,
    colors: RefCell<ColorMap>,
    actions: ActionHandler<B>,
}

impl<B: MailBackend> MailSession<B> {
    pub fn new(backend: Rc<B>, config: ViewConfig) -> Self {
        Self {
            list: ListSyncEngine::new(backend.clone(), config.page_size),
            actions: ActionHandler::new(backend.clone(), Renderer::new(config.max_html_bytes)),
            backend,
            config,
            directory: RefCell::new(AccountDirectory::new()),
            flags: FlagStore::new(),
            colors: RefCell::new(ColorMap::default()),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Fetch the account directory from the backend
    pub async fn load_directory(&self) -> Result<()> {
        let directory = self
            .backend
            .list_accounts()
            .await
            .map_err(|e| ViewError::backend(&e))?;
        log::info!("Loaded {} accounts", directory.len());
        self.list.set_directory(directory.clone());
        *self.directory.borrow_mut() = directory;
        self.rebuild_colors();
        Ok(())
    }

    pub fn directory(&self) -> AccountDirectory {
        self.directory.borrow().clone()
    }

    /// Empty the list for a new selection without fetching
    pub fn reset(&self, selection: Selection) -> u64 {
        let generation = self.list.reset(selection);
        self.rebuild_colors();
        generation
    }

    /// Switch the list to a new selection and load its first page
    pub async fn select(&self, selection: Selection) -> Result<LoadOutcome> {
        self.reset(selection);
        let result = self.list.load_first_page().await;
        self.after_list_change();
        result
    }

    /// Reload the current selection from the first page
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        self.select(self.list.selection()).await
    }

    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let result = self.list.load_more().await;
        self.after_list_change();
        result
    }

    /// Scroll signal from the host: the row at `last_visible_index` is on screen
    pub async fn on_near_end(&self, last_visible_index: usize) -> Result<LoadOutcome> {
        let result = self
            .list
            .on_near_end(last_visible_index, self.config.prefetch_threshold)
            .await;
        if matches!(result, Ok(LoadOutcome::Appended { .. })) {
            self.after_list_change();
        }
        result
    }

    fn after_list_change(&self) {
        let dropped = self.flags.reconcile(&self.list.records());
        if dropped > 0 {
            log::debug!("Dropped {dropped} confirmed flag overrides");
        }
        self.rebuild_colors();
    }

    fn rebuild_colors(&self) {
        let map = ColorMap::build(&self.list.records(), &self.directory.borrow());
        *self.colors.borrow_mut() = map;
    }

    pub fn list(&self) -> &ListSyncEngine<B> {
        &self.list
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn colors(&self) -> Ref<'_, ColorMap> {
        self.colors.borrow()
    }

    pub fn color_of(&self, record: &OverviewRecord) -> &'static str {
        self.colors.borrow().color_of(record, &self.directory.borrow())
    }

    /// Visible rows with their badge and effective flags
    pub fn rows(&self) -> Vec<RowView> {
        let colors = self.colors.borrow();
        let directory = self.directory.borrow();
        self.list
            .visible()
            .into_iter()
            .map(|record| RowView {
                badge: colors.badge(&record, &directory),
                seen: self.flags.effective(&record, Flag::Seen),
                flagged: self.flags.effective(&record, Flag::Flagged),
                flag_pending: record
                    .key()
                    .is_some_and(|k| self.flags.is_busy(&k, Flag::Flagged)),
                record,
            })
            .collect()
    }

    /// Optimistically toggle a flag and persist it
    pub async fn toggle(&self, record: &OverviewRecord, flag: Flag) -> Result<ToggleOutcome> {
        self.flags.toggle_on(self.backend.as_ref(), record, flag).await
    }

    /// Fetch and render a message
    pub async fn open(&self, record: &OverviewRecord) -> Result<OpenedMessage> {
        let key = key_of(record)?;
        self.actions.open_message(&key).await
    }

    /// Archive a message and reload the list
    pub async fn archive(&self, record: &OverviewRecord) -> Result<()> {
        let key = key_of(record)?;
        self.actions.archive(&key).await?;
        self.refresh().await.map(|_| ())
    }

    /// Delete a message and reload the list
    pub async fn delete(&self, record: &OverviewRecord) -> Result<()> {
        let key = key_of(record)?;
        self.actions.delete(&key).await?;
        self.refresh().await.map(|_| ())
    }

    pub async fn download(&self, record: &OverviewRecord, attachment: &AttachmentMeta) -> Result<Vec<u8>> {
        let key = key_of(record)?;
        self.actions.download_attachment(&key, attachment).await
    }
}
