//! Caller-side naming policy: what an uploaded file may be called on disk and
//! which table name its script gets.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._ \-]").expect("valid regex"));
static PLAIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._ \-]+$").expect("valid regex"));

/// Strip the final extension, then turn spaces and hyphens into underscores.
///
/// `"Sales Report-2024.xlsx"` → `"Sales_Report_2024"`.
pub fn derive_table_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    stem.replace([' ', '-'], "_")
}

/// Reduce a client-supplied file name to a safe, single path component.
///
/// Keeps only the part after the last `/` or `\`, replaces anything outside
/// `[A-Za-z0-9._ -]` with `_`, and rejects names that end up empty, `.` or `..`.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned = UNSAFE_CHARS.replace_all(last, "_").into_owned();
    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

/// True if `name` can be joined onto a directory without escaping it and can
/// be quoted into a `Content-Disposition` header as-is. Same character set
/// that [`sanitize_file_name`] produces.
pub fn is_plain_file_name(name: &str) -> bool {
    name != "." && name != ".." && PLAIN_NAME.is_match(name)
}
