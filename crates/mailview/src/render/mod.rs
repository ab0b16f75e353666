//! Message body rendering
//!
//! Turns an untrusted message body into:
//! - a sanitized HTML fragment for the isolated frame ([`isolated_document`])
//! - display text (text body, else text derived from the HTML, else [`EMPTY_STATE`])
//! - the attachment list, without inline parts
//!
//! Sanitization fails closed. When it cannot complete, no fragment is
//! produced and the view shows the text instead.

mod attachments;
mod isolation;
mod sanitize;
mod text;

pub use attachments::{VisibleAttachment, format_size, visible_attachments};
pub use isolation::{BASELINE_CSS, CONTENT_SECURITY_POLICY, SANDBOX_ATTRIBUTES, isolated_document};
pub use sanitize::{ALLOWED_STYLE_PROPERTIES, filter_style, sanitize_html};
pub use text::{EMPTY_STATE, collapse_blank_lines, derive_text, display_text};

use serde::Serialize;

use crate::models::{AttachmentMeta, MessageDetail};

/// Default cap on HTML body size before sanitization is refused
pub const DEFAULT_MAX_HTML_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    /// Sanitized HTML, absent when there was no HTML or sanitization failed
    pub safe_fragment: Option<String>,
    pub display_text: String,
    pub visible_attachments: Vec<VisibleAttachment>,
}

impl RenderedMessage {
    /// Full isolated document for the fragment, if there is one
    pub fn document(&self) -> Option<String> {
        self.safe_fragment.as_deref().map(isolated_document)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    max_html_bytes: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HTML_BYTES)
    }
}

impl Renderer {
    pub fn new(max_html_bytes: usize) -> Self {
        Self { max_html_bytes }
    }

    pub fn render(
        &self,
        html: Option<&str>,
        text: Option<&str>,
        attachments: &[AttachmentMeta],
    ) -> RenderedMessage {
        let html = html.filter(|h| !h.trim().is_empty());

        let safe_fragment = html.and_then(|h| match sanitize_html(h, self.max_html_bytes) {
            Ok(fragment) => Some(fragment).filter(|f| !f.trim().is_empty()),
            Err(e) => {
                log::warn!("Falling back to text body: {e}");
                None
            }
        });

        // Derive from the cleaned fragment when there is one so removed
        // elements (style, script) never leak into the text
        let display_text = display_text(text, safe_fragment.as_deref().or(html));

        RenderedMessage {
            safe_fragment,
            display_text,
            visible_attachments: visible_attachments(attachments),
        }
    }

    pub fn render_detail(&self, detail: &MessageDetail) -> RenderedMessage {
        self.render(detail.html.as_deref(), detail.text.as_deref(), &detail.attachments)
    }
}
