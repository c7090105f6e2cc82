//! Shared lopdf helpers used by the link walker.

use lopdf::{Dictionary, Document, Object};

/// Extract a string value from a PDF dictionary for a given key.
///
/// Returns `Some(String)` if the key exists and contains a valid non-empty string,
/// `None` otherwise.
pub fn extract_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .filter(|s| !s.is_empty())
}

/// Returns `true` when `dict[key]` is the PDF name `expected`.
pub fn has_name(dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    dict.get(key)
        .and_then(Object::as_name)
        .map(|name| name == expected)
        .unwrap_or(false)
}

/// Resolve a value that might be an inline dictionary or a reference to one.
pub fn resolve_dict<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Dictionary> {
    match value.as_reference() {
        Ok(id) => document.get_object(id).ok()?.as_dict().ok(),
        Err(_) => value.as_dict().ok(),
    }
}

/// Resolve a value that might be an inline array or a reference to one.
pub fn resolve_array<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Vec<Object>> {
    match value.as_reference() {
        Ok(id) => document.get_object(id).ok()?.as_array().ok(),
        Err(_) => value.as_array().ok(),
    }
}
