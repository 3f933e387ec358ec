//! Stored-name convention: every file the service writes is named
//! `"<user_id>__<rest>"`, so the owner can be read back from the name alone.

use lazy_static::lazy_static;
use regex::Regex;

pub const SEPARATOR: &str = "__";
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
}

pub fn owner_prefix(user_id: i64) -> String {
    format!("{}{}", user_id, SEPARATOR)
}

pub fn has_owner_prefix(user_id: i64, stored: &str) -> bool {
    stored.starts_with(&owner_prefix(user_id))
}

/// Lower-cased extension after the last dot, if any.
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn is_allowed_upload(name: &str) -> bool {
    extension(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied name to a flat ASCII name safe to join onto a
/// directory. Returns `None` when nothing usable is left.
pub fn sanitize(original: &str) -> Option<String> {
    let ascii: String = original
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn stored_name(user_id: i64, sanitized: &str) -> String {
    format!("{}{}", owner_prefix(user_id), sanitized)
}

/// The part of a stored name after the owner prefix.
pub fn display_name(stored: &str) -> &str {
    stored
        .split_once(SEPARATOR)
        .map(|(_, rest)| rest)
        .unwrap_or(stored)
}

/// Display name without its final extension.
pub fn base_name(stored: &str) -> &str {
    let display = display_name(stored);
    match display.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => display,
    }
}

pub fn cleaned_name(user_id: i64, source_stored: &str) -> String {
    format!(
        "{}cleaned_{}.csv",
        owner_prefix(user_id),
        base_name(source_stored)
    )
}

pub fn visualization_name(user_id: i64, source_stored: &str, chart: &str) -> String {
    format!(
        "{}viz_{}_{}.png",
        owner_prefix(user_id),
        base_name(source_stored),
        chart
    )
}

/// True when `name` addresses a single entry directly inside an area.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
