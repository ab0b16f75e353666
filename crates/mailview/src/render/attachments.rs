//! Attachment list shown under a message

use serde::Serialize;

use crate::models::AttachmentMeta;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with binary prefixes
///
/// One decimal below 10 of a unit (`1.5 KB`), none otherwise (`42 MB`).
/// Missing, zero or negative sizes render as an empty string.
pub fn format_size(bytes: Option<i64>) -> String {
    let Some(bytes) = bytes.filter(|b| *b > 0) else {
        return String::new();
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else if value < 10.0 {
        format!("{value:.1} {}", UNITS[unit])
    } else {
        format!("{value:.0} {}", UNITS[unit])
    }
}

/// An attachment as listed in the message view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleAttachment {
    pub attachment: AttachmentMeta,
    pub size_label: String,
    /// False when the attachment has no part id to download it by
    pub downloadable: bool,
}

/// Attachments to list: inline parts are dropped, the rest keep their order
pub fn visible_attachments(attachments: &[AttachmentMeta]) -> Vec<VisibleAttachment> {
    attachments
        .iter()
        .filter(|a| !a.inline)
        .map(|a| VisibleAttachment {
            size_label: format_size(a.size),
            downloadable: a.usable_part().is_some(),
            attachment: a.clone(),
        })
        .collect()
}
