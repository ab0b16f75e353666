//! Action handler for message operations
//!
//! Each action is a backend call. The list is not edited in place; callers
//! refresh it afterwards so the server stays the source of truth.

use log::info;
use std::rc::Rc;

use crate::backend::MailBackend;
use crate::error::{Result, ViewError};
use crate::models::{AttachmentMeta, MessageDetail, MessageKey, OverviewRecord};
use crate::render::{RenderedMessage, Renderer};

/// Mailbox archived messages are moved to, created on first use
pub const ARCHIVE_MAILBOX: &str = "Archive";

/// A fetched message with its rendered body
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedMessage {
    pub detail: MessageDetail,
    pub rendered: RenderedMessage,
}

/// Composite key of a record, or `NotAddressable`
pub fn key_of(record: &OverviewRecord) -> Result<MessageKey> {
    record.key().ok_or_else(|| ViewError::NotAddressable {
        what: format!(
            "message {:?} in {:?} has no account or uid",
            record.subject, record.reference.mailbox
        ),
    })
}

/// Handler for archive, delete, open and attachment download
pub struct ActionHandler<B> {
    backend: Rc<B>,
    renderer: Renderer,
}

impl<B: MailBackend> ActionHandler<B> {
    pub fn new(backend: Rc<B>, renderer: Renderer) -> Self {
        Self { backend, renderer }
    }

    /// Move a message to the account's Archive mailbox, creating it if needed
    pub async fn archive(&self, key: &MessageKey) -> Result<()> {
        if key.mailbox == ARCHIVE_MAILBOX {
            return Ok(());
        }

        let directory = self
            .backend
            .list_accounts()
            .await
            .map_err(|e| ViewError::backend(&e))?;
        let has_archive = directory
            .mailboxes(&key.account)
            .is_some_and(|m| m.iter().any(|name| name == ARCHIVE_MAILBOX));

        if !has_archive {
            info!("Creating {ARCHIVE_MAILBOX} mailbox for {}", key.account);
            self.backend
                .create_mailbox(&key.account, ARCHIVE_MAILBOX)
                .await
                .map_err(|e| ViewError::backend(&e))?;
        }

        info!("Archiving {key}");
        self.backend
            .move_message(key, ARCHIVE_MAILBOX)
            .await
            .map_err(|e| ViewError::backend(&e))
    }

    /// Delete and expunge a message
    pub async fn delete(&self, key: &MessageKey) -> Result<()> {
        info!("Deleting {key}");
        self.backend
            .delete_message(key)
            .await
            .map_err(|e| ViewError::backend(&e))
    }

    /// Fetch a message body and render it
    pub async fn open_message(&self, key: &MessageKey) -> Result<OpenedMessage> {
        let detail = self
            .backend
            .fetch_message_detail(key)
            .await
            .map_err(|e| ViewError::backend(&e))?;
        let rendered = self.renderer.render_detail(&detail);
        Ok(OpenedMessage { detail, rendered })
    }

    /// Download an attachment; refused when it has no part id
    pub async fn download_attachment(
        &self,
        key: &MessageKey,
        attachment: &AttachmentMeta,
    ) -> Result<Vec<u8>> {
        let Some(part) = attachment.usable_part() else {
            return Err(ViewError::NotAddressable {
                what: format!("attachment {:?} has no part id", attachment.filename),
            });
        };
        self.backend
            .fetch_attachment_bytes(key, part)
            .await
            .map_err(|e| ViewError::backend(&e))
    }
}
