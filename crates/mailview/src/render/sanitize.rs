//! HTML sanitization for untrusted message bodies

use ammonia::{Builder, UrlRelative};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::error::{Result, ViewError};

/// Style properties kept on `style` attributes; every other declaration is dropped
pub const ALLOWED_STYLE_PROPERTIES: &[&str] = &[
    "background-color",
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "line-height",
    "text-align",
    "text-decoration",
    "text-transform",
    "vertical-align",
    "white-space",
];

/// Elements removed together with everything inside them
const REMOVED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "form", "textarea", "select", "button",
    "noscript", "title",
];

/// Presentational attributes common in email markup
const LAYOUT_ATTRIBUTES: &[&str] = &[
    "align",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "dir",
    "height",
    "style",
    "valign",
    "width",
];

static SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .add_tags(["font"])
        .add_tag_attributes("font", ["color", "face", "size"])
        .add_generic_attributes(LAYOUT_ATTRIBUTES.iter().copied())
        .clean_content_tags(REMOVED_WITH_CONTENT.iter().copied().collect())
        .add_url_schemes(["cid"])
        .url_relative(UrlRelative::Deny)
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank")
        .strip_comments(true)
        .attribute_filter(|_element, attribute, value| match attribute {
            "style" => filter_style(value).map(Cow::Owned),
            _ => Some(Cow::Borrowed(value)),
        });
    builder
});

/// Patterns that must never survive sanitization
static FORBIDDEN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<\s*/?\s*(script|iframe|object|embed|form|base|meta|link)\b|<[^>]*\son[a-z]+\s*=|<[^>]*\s(href|src)\s*=\s*["']?\s*javascript:"#,
    )
});

/// Keep only allow-listed declarations of a `style` attribute value
///
/// Returns `None` when nothing is left, which removes the attribute.
pub fn filter_style(value: &str) -> Option<String> {
    let kept: Vec<String> = value
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() || !ALLOWED_STYLE_PROPERTIES.contains(&property.as_str()) {
                return None;
            }
            let lowered = value.to_ascii_lowercase();
            if ["url(", "expression(", "javascript:", "\\", "@import"]
                .iter()
                .any(|bad| lowered.contains(bad))
            {
                return None;
            }
            Some(format!("{property}: {value}"))
        })
        .collect();

    (!kept.is_empty()).then(|| kept.join("; "))
}

/// Sanitize an HTML body into a fragment safe to mount in the isolated frame
///
/// Fails closed: bodies larger than `max_bytes`, or output that still
/// contains active content, yield [`ViewError::SanitizationFailure`] and
/// callers fall back to plain text.
pub fn sanitize_html(html: &str, max_bytes: usize) -> Result<String> {
    if html.len() > max_bytes {
        return Err(ViewError::SanitizationFailure {
            reason: format!("body is {} bytes, limit is {max_bytes}", html.len()),
        });
    }

    let cleaned = SANITIZER.clean(html).to_string();
    verify(&cleaned)?;
    Ok(cleaned)
}

fn verify(fragment: &str) -> Result<()> {
    let forbidden = FORBIDDEN
        .as_ref()
        .map_err(|e| ViewError::SanitizationFailure {
            reason: format!("verifier unavailable: {e}"),
        })?;
    if let Some(found) = forbidden.find(fragment) {
        return Err(ViewError::SanitizationFailure {
            reason: format!("active content survived cleaning: {}", found.as_str()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024 * 1024;

    #[test]
    fn test_script_and_handlers_removed() {
        let out = sanitize_html(
            r#"<p onclick="steal()">Hi<script>alert(1)</script></p><img src="x.png" onerror="boom()">"#,
            LIMIT,
        )
        .unwrap();
        assert!(!out.to_lowercase().contains("<script"));
        assert!(!out.contains("alert(1)"));
        assert!(!out.contains("onclick"));
        assert!(!out.contains("onerror"));
        assert!(out.contains("Hi"));
    }

    #[test]
    fn test_javascript_urls_stripped() {
        let out = sanitize_html(
            r#"<a href="  JavaScript:alert(1)">click</a><a href="https://example.com/">ok</a>"#,
            LIMIT,
        )
        .unwrap();
        assert!(!out.to_lowercase().contains("javascript"));
        assert!(out.contains(r#"href="https://example.com/""#));
        assert!(out.contains("click"));
    }

    #[test]
    fn test_links_open_in_new_context() {
        let out = sanitize_html(r#"<a href="https://example.com/" target="_self">x</a>"#, LIMIT).unwrap();
        assert!(out.contains(r#"target="_blank""#));
        assert!(out.contains(r#"rel="noopener noreferrer""#));
        assert!(!out.contains("_self"));
    }

    #[test]
    fn test_disallowed_elements_removed_with_content() {
        let html = r#"<style>body{display:none}</style><iframe src="https://evil">x</iframe>
            <form action="/steal"><input name="pw"><button>Go</button></form>
            <object data="a.swf"></object><embed src="b.swf"><base href="https://evil/">
            <meta http-equiv="refresh" content="0"><link rel="stylesheet" href="x.css"><p>kept</p>"#;
        let out = sanitize_html(html, LIMIT).unwrap();
        for gone in ["<style", "display:none", "<iframe", "<form", "<input", "<button", "Go", "<object", "<embed", "<base", "<meta", "<link"] {
            assert!(!out.contains(gone), "{gone} survived: {out}");
        }
        assert!(out.contains("<p>kept</p>"));
    }

    #[test]
    fn test_class_and_id_removed() {
        let out = sanitize_html(r#"<div class="header" id="main">x</div>"#, LIMIT).unwrap();
        assert_eq!(out, "<div>x</div>");
    }

    #[test]
    fn test_style_declarations_filtered() {
        let out = sanitize_html(
            r#"<span style="color: red; position: fixed; background-image: url(https://t.co/p.gif); font-weight: bold">a</span><span style="position:absolute">b</span>"#,
            LIMIT,
        )
        .unwrap();
        assert!(out.contains(r#"<span style="color: red; font-weight: bold">a</span>"#));
        assert!(out.contains("<span>b</span>"));
    }

    #[test]
    fn test_filter_style() {
        assert_eq!(filter_style("COLOR: Blue;;"), Some("color: Blue".into()));
        assert_eq!(filter_style("color: expression(alert(1))"), None);
        assert_eq!(filter_style("margin: 0; padding: 0"), None);
        assert_eq!(filter_style("garbage"), None);
    }

    #[test]
    fn test_email_layout_attributes_survive() {
        let out = sanitize_html(
            r##"<table width="600" cellpadding="0" bgcolor="#ffffff"><tr><td align="center"><font color="red">Sale</font></td></tr></table>"##,
            LIMIT,
        )
        .unwrap();
        assert!(out.contains(r#"width="600""#));
        assert!(out.contains(r##"bgcolor="#ffffff""##));
        assert!(out.contains(r#"<font color="red">Sale</font>"#));
    }

    #[test]
    fn test_cid_images_allowed() {
        let out = sanitize_html(r#"<img src="cid:logo@mail" alt="logo">"#, LIMIT).unwrap();
        assert!(out.contains(r#"src="cid:logo@mail""#));
    }

    #[test]
    fn test_oversized_body_fails_closed() {
        let err = sanitize_html(&"<p>x</p>".repeat(100), 64).unwrap_err();
        assert!(matches!(err, ViewError::SanitizationFailure { .. }));
    }

    #[test]
    fn test_verifier_rejects_active_content() {
        assert!(verify(r#"<p>fine</p>"#).is_ok());
        assert!(verify(r#"<a href="javascript:x()">"#).is_err());
        assert!(verify(r#"<div onmouseover="x()">"#).is_err());
        // Text mentioning a scheme is not markup
        assert!(verify("<p>type javascript: in the console</p>").is_ok());
    }
}
