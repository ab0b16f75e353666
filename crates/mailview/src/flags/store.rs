//! Override sets and the toggle protocol

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

use crate::backend::MailBackend;
use crate::error::{Result, ViewError};
use crate::models::{Flag, MessageKey, OverviewRecord};

type Entry = (MessageKey, Flag);

#[derive(Default)]
struct Overrides {
    on: HashSet<Entry>,
    off: HashSet<Entry>,
    busy: HashSet<Entry>,
}

impl Overrides {
    /// `Some(true)` when forced on, `Some(false)` when forced off
    fn get(&self, entry: &Entry) -> Option<bool> {
        if self.on.contains(entry) {
            Some(true)
        } else if self.off.contains(entry) {
            Some(false)
        } else {
            None
        }
    }

    /// Put an entry in exactly one set, or in neither for `None`
    fn set(&mut self, entry: Entry, value: Option<bool>) {
        self.on.remove(&entry);
        self.off.remove(&entry);
        match value {
            Some(true) => {
                self.on.insert(entry);
            }
            Some(false) => {
                self.off.insert(entry);
            }
            None => {}
        }
    }
}

/// A toggle whose optimistic value is applied but not yet confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub key: MessageKey,
    pub flag: Flag,
    /// Value sent to the backend
    pub value: bool,
    /// Override before the toggle, restored on failure
    previous: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend accepted the new value
    Applied { value: bool },
    /// Not addressable or already in flight; nothing happened
    Ignored,
}

/// Local flag overrides for every message in the session
#[derive(Default)]
pub struct FlagStore {
    overrides: RefCell<Overrides>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value to display for a flag of a fetched record
    pub fn effective(&self, record: &OverviewRecord, flag: Flag) -> bool {
        let server = record.has_flag(flag);
        match record.key() {
            Some(key) => self.effective_for(&key, flag, server),
            None => server,
        }
    }

    pub fn effective_for(&self, key: &MessageKey, flag: Flag, server: bool) -> bool {
        self.override_for(key, flag).unwrap_or(server)
    }

    pub fn override_for(&self, key: &MessageKey, flag: Flag) -> Option<bool> {
        self.overrides.borrow().get(&(key.clone(), flag))
    }

    pub fn is_busy(&self, key: &MessageKey, flag: Flag) -> bool {
        self.overrides.borrow().busy.contains(&(key.clone(), flag))
    }

    /// Apply the optimistic half of a toggle
    ///
    /// Returns `None` (and changes nothing) when the record has no composite
    /// key or a toggle of the same flag is already in flight.
    pub fn begin_toggle(&self, record: &OverviewRecord, flag: Flag) -> Option<PendingToggle> {
        let key = record.key()?;
        let entry = (key.clone(), flag);
        let mut overrides = self.overrides.borrow_mut();

        if overrides.busy.contains(&entry) {
            log::debug!("Ignoring {flag} toggle on {key}: already in flight");
            return None;
        }
        overrides.busy.insert(entry.clone());

        let previous = overrides.get(&entry);
        let value = !previous.unwrap_or_else(|| record.has_flag(flag));
        overrides.set(entry, Some(value));

        log::debug!("Toggling {flag} on {key} to {value}");
        Some(PendingToggle {
            key,
            flag,
            value,
            previous,
        })
    }

    /// Resolve a toggle with the backend's answer
    ///
    /// Success leaves the override until a fresh fetch supersedes it; failure
    /// restores the override sets to their pre-toggle state. The busy mark is
    /// cleared either way.
    pub fn finish_toggle(
        &self,
        pending: PendingToggle,
        result: anyhow::Result<()>,
    ) -> Result<ToggleOutcome> {
        let entry = (pending.key, pending.flag);
        let mut overrides = self.overrides.borrow_mut();
        overrides.busy.remove(&entry);

        match result {
            Ok(()) => Ok(ToggleOutcome::Applied {
                value: pending.value,
            }),
            Err(e) => {
                log::warn!("Reverting {} on {}: {e:#}", entry.1, entry.0);
                let flag = entry.1;
                overrides.set(entry, pending.previous);
                Err(ViewError::MutationFailed {
                    flag,
                    message: format!("{e:#}"),
                })
            }
        }
    }

    /// Give up on a toggle that will never be answered
    ///
    /// Restores the pre-toggle override and clears the busy mark, the same
    /// as a failed write.
    pub fn abandon_toggle(&self, pending: PendingToggle) {
        let entry = (pending.key, pending.flag);
        let Ok(mut overrides) = self.overrides.try_borrow_mut() else {
            log::error!("Flag overrides in use; cannot abandon {} on {}", entry.1, entry.0);
            return;
        };
        log::warn!("Abandoned {} toggle on {}; reverting", entry.1, entry.0);
        overrides.busy.remove(&entry);
        overrides.set(entry, pending.previous);
    }

    /// Toggle a flag, calling `perform(key, flag, value)` to persist it
    ///
    /// Dropping the returned future before it completes (a caller timeout,
    /// say) reverts the optimistic value like a failed write.
    pub async fn toggle<F, Fut>(&self, record: &OverviewRecord, flag: Flag, perform: F) -> Result<ToggleOutcome>
    where
        F: FnOnce(MessageKey, Flag, bool) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let Some(pending) = self.begin_toggle(record, flag) else {
            return Ok(ToggleOutcome::Ignored);
        };
        let write = perform(pending.key.clone(), pending.flag, pending.value);
        let mut guard = InFlight {
            store: self,
            pending: Some(pending),
        };
        let result = write.await;
        match guard.pending.take() {
            Some(pending) => self.finish_toggle(pending, result),
            None => Ok(ToggleOutcome::Ignored),
        }
    }

    /// Toggle a flag through a backend's `set_flag`
    pub async fn toggle_on<B: MailBackend>(
        &self,
        backend: &B,
        record: &OverviewRecord,
        flag: Flag,
    ) -> Result<ToggleOutcome> {
        self.toggle(record, flag, |key, flag, value| async move {
            backend.set_flag(&key, flag, value).await
        })
        .await
    }

    /// Drop overrides that freshly fetched records already agree with
    ///
    /// In-flight entries are left alone. Returns how many were dropped.
    pub fn reconcile(&self, records: &[OverviewRecord]) -> usize {
        let mut overrides = self.overrides.borrow_mut();
        let mut dropped = 0;
        for record in records {
            let Some(key) = record.key() else {
                continue;
            };
            for flag in Flag::ALL {
                let entry = (key.clone(), flag);
                if overrides.busy.contains(&entry) {
                    continue;
                }
                if overrides.get(&entry) == Some(record.has_flag(flag)) {
                    overrides.set(entry, None);
                    dropped += 1;
                }
            }
        }
        dropped
    }

    /// Number of entries with an override in place
    pub fn len(&self) -> usize {
        let overrides = self.overrides.borrow();
        overrides.on.len() + overrides.off.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reverts a toggle whose future was dropped mid-write
struct InFlight<'a> {
    store: &'a FlagStore,
    pending: Option<PendingToggle>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.store.abandon_toggle(pending);
        }
    }
}
