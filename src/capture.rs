//! Capture body formatting and metadata re-extraction
//!
//! A capture is stored as a regular Taggr post whose body carries the
//! submission metadata as labeled text sections, with the HTML snapshot as a
//! bucket attachment. The parser is the inverse of the formatter, used when
//! rendering archived posts whose body came back from the canister.

use regex::Regex;

use crate::types::CaptureSubmission;

/// Format the canonical post body for a capture submission.
pub fn format_capture_body(submission: &CaptureSubmission) -> String {
    let mut sections = vec![format!("Captured URL: {}", submission.url.trim())];
    if let Some(at) = trimmed(&submission.captured_at) {
        sections.push(format!("Captured At: {at}"));
    }
    if let Some(hash) = trimmed(&submission.content_hash) {
        sections.push(format!("Content Hash: {hash}"));
    }
    if let Some(notes) = trimmed(&submission.notes) {
        sections.push(format!("Notes: {notes}"));
    }
    sections.join("\n\n")
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Metadata recovered from a capture post body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMetadata {
    pub url: String,
    pub captured_at: Option<String>,
    pub hash: Option<String>,
    pub notes: Option<String>,
}

/// Re-extract capture metadata from a post body.
///
/// Returns `None` when the body has no `Captured URL` line, i.e. the post
/// is not a capture. Notes run to the end of the body.
pub fn parse_capture_metadata(body: &str) -> Option<CaptureMetadata> {
    let url = line_value(body, r"(?i)Captured URL:\s*(.+)")?;

    Some(CaptureMetadata {
        url,
        captured_at: line_value(body, r"(?i)Captured At:\s*(.+)"),
        hash: line_value(body, r"(?i)Content Hash:\s*(.+)"),
        notes: tail_value(body, r"(?i)Notes:\s*"),
    })
}

fn line_value(body: &str, pattern: &str) -> Option<String> {
    let regex = Regex::new(pattern).ok()?;
    regex
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn tail_value(body: &str, pattern: &str) -> Option<String> {
    let regex = Regex::new(pattern).ok()?;
    regex
        .find(body)
        .map(|m| body[m.end()..].trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Deterministic stand-in document shown when a capture cannot be fetched.
pub fn fallback_capture_html(post_id: u64) -> String {
    format!(
        "<!doctype html><html><head><style>\
         body{{font-family:system-ui;padding:40px;background:#f8fafc;color:#0f172a;}}\
         article{{max-width:720px;margin:0 auto;background:#fff;border-radius:16px;padding:32px;}}\
         h1{{font-size:24px;margin-bottom:16px;}}p{{line-height:1.6;}}\
         </style></head><body><article>\
         <h1>Gyotaku #{post_id}</h1>\
         <p>The archived snapshot for this post is not available yet or could not be fetched.</p>\
         </article></body></html>"
    )
}
