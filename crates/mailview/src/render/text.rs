//! Plain-text fallback for message bodies

use regex::Regex;
use std::sync::LazyLock;

/// Shown when a message has neither text nor usable HTML
pub const EMPTY_STATE: &str = "(This message has no content)";

/// Wide enough that html2text never wraps paragraphs itself
const TEXT_WIDTH: usize = 4096;

static BLANK_RUNS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").ok());

/// Collapse runs of 3+ blank lines to one blank line and trim
pub fn collapse_blank_lines(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = match BLANK_RUNS.as_ref() {
        Some(re) => re.replace_all(&text, "\n\n").into_owned(),
        None => text,
    };
    collapsed.trim().to_string()
}

/// Strip markup from an HTML body. `None` when nothing readable is left.
pub fn derive_text(html: &str) -> Option<String> {
    let raw = match html2text::from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Failed to convert HTML body to text: {e}");
            return None;
        }
    };
    let text = collapse_blank_lines(&raw);
    (!text.is_empty()).then_some(text)
}

/// Text to show: the text body, else text derived from HTML, else the
/// empty-state string
pub fn display_text(text: Option<&str>, html: Option<&str>) -> String {
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        return text.to_string();
    }
    html.filter(|h| !h.trim().is_empty())
        .and_then(derive_text)
        .unwrap_or_else(|| EMPTY_STATE.to_string())
}
