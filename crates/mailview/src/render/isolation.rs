//! Isolated rendering boundary for sanitized fragments
//!
//! The fragment is wrapped in a standalone document meant for a sandboxed
//! frame. The frame keeps host styles out and message styles in; the
//! document's content policy blocks scripts and remote loads other than
//! images.

/// Content-Security-Policy of the isolated document
pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'none'; img-src https: data: cid:; style-src 'unsafe-inline'";

/// `sandbox` attribute for the hosting frame. Scripts and same-origin
/// access stay disabled; links may open a new context.
pub const SANDBOX_ATTRIBUTES: &str = "allow-popups allow-popups-to-escape-sandbox";

/// Safe defaults applied inside the boundary only
pub const BASELINE_CSS: &str = "\
html,body{margin:0;padding:0;}
body{font-family:-apple-system,BlinkMacSystemFont,\"Segoe UI\",Roboto,Helvetica,Arial,sans-serif;font-size:14px;line-height:1.5;color:#1f2937;background:#ffffff;overflow-wrap:anywhere;word-break:break-word;padding:12px;}
img,video{max-width:100%;height:auto;}
table{max-width:100%;border-collapse:collapse;}
pre{white-space:pre-wrap;}
blockquote{margin:0 0 0 8px;padding-left:12px;border-left:3px solid #d1d5db;color:#4b5563;}
hr{border:0;border-top:1px solid #e5e7eb;margin:16px 0;}
a{color:#2563eb;text-decoration:underline;}
";

/// A complete document hosting `fragment` behind a strict content policy
///
/// `fragment` must already be sanitized.
pub fn isolated_document(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta http-equiv=\"Content-Security-Policy\" content=\"{CONTENT_SECURITY_POLICY}\">\n\
         <meta name=\"referrer\" content=\"no-referrer\">\n\
         <base target=\"_blank\">\n\
         <style>\n{BASELINE_CSS}</style>\n\
         </head>\n<body>\n{fragment}\n</body>\n</html>\n"
    )
}
