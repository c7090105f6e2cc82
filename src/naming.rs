//! Filename and folder-name rules.
//!
//! A downloaded attachment is named from, in order of preference:
//! 1. the `Content-Disposition` header's filename,
//! 2. the last URL path segment, when it contains a `.`,
//! 3. `file_<index>` plus an extension guessed from `Content-Type`.
//!
//! Names are then sanitized and made unique inside their folder by appending
//! `_1`, `_2`, … before the extension.

use std::path::{Path, PathBuf};

/// Characters kept by [`sanitize_filename`] besides alphanumerics.
const FILENAME_EXTRA_CHARS: &[char] = &['.', '_', '-', ' '];

/// Characters kept by [`sanitize_folder_name`] besides ASCII alphanumerics.
const FOLDER_EXTRA_CHARS: &[char] = &['-', '_', '.', '(', ')', ' '];

/// Preferred extensions for common attachment types. Anything not listed falls
/// back to `mime_guess`.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("text/plain", "txt"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/xml", "xml"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/tiff", "tif"),
];

/// Pick the on-disk name for a downloaded attachment. The result is already
/// sanitized and never empty.
pub fn resolve_filename(
    content_disposition: Option<&str>,
    url: &str,
    content_type: Option<&str>,
    index: usize,
) -> String {
    let candidate = content_disposition
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url(url));

    if let Some(name) = candidate {
        let clean = sanitize_filename(&name);
        if !clean.is_empty() {
            return clean;
        }
    }

    let ext = content_type
        .and_then(extension_for_mime)
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("file_{index}{ext}")
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// `filename*=` (RFC 5987, e.g. `UTF-8''r%C3%A9sum%C3%A9.pdf`) wins over
/// `filename=`. Surrounding quotes are stripped.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in header.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'percent-encoded-name
                let encoded = value.rsplit('\'').next().unwrap_or(value);
                extended = urlencoding::decode(encoded).ok().map(|s| s.into_owned());
            }
            "filename" => plain = Some(value.to_string()),
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.is_empty())
}

/// The percent-decoded last path segment of `url`, if it contains a `.`.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?;
    let decoded = urlencoding::decode(last).ok()?.into_owned();
    // A decoded segment may itself contain '/', keep only the basename.
    let base = decoded.rsplit('/').next().unwrap_or_default().to_string();
    if base.contains('.') {
        Some(base)
    } else {
        None
    }
}

/// Extension (without the dot) for a `Content-Type` value such as
/// `"application/pdf; charset=binary"`.
pub fn extension_for_mime(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }

    if let Some((_, ext)) = PREFERRED_EXTENSIONS.iter().find(|(mime, _)| *mime == essence) {
        return Some((*ext).to_string());
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .map(|ext| (*ext).to_string())
}

/// Keep only alphanumerics, `.`, `_`, `-` and space.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || FILENAME_EXTRA_CHARS.contains(c))
        .collect()
}

/// Turn a document stem into a folder name: ASCII letters, digits and
/// `-_.() ` only, at most `max_len` characters.
pub fn sanitize_folder_name(stem: &str, max_len: usize) -> String {
    stem.chars()
        .filter(|c| c.is_ascii_alphanumeric() || FOLDER_EXTRA_CHARS.contains(c))
        .take(max_len)
        .collect()
}

/// `filename` for `n == 0`, otherwise `stem_n.ext`.
pub fn numbered_name(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    format!("{stem}_{n}{ext}")
}

/// First path in `dir` named `filename`, `stem_1.ext`, `stem_2.ext`, … that
/// is not taken. A dangling symlink counts as taken.
pub fn unique_file_path(dir: &Path, filename: &str) -> PathBuf {
    let mut n = 0;
    loop {
        let candidate = dir.join(numbered_name(filename, n));
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// First path `base`, `base_1`, `base_2`, … that does not exist yet, treating
/// `allowed` as free (it is the folder being renamed).
pub fn unique_dir_path(base: &Path, allowed: &Path) -> PathBuf {
    let is_free = |p: &Path| p == allowed || !is_taken(p);
    if is_free(base) {
        return base.to_path_buf();
    }

    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut counter = 1;
    loop {
        let candidate = base.with_file_name(format!("{name}_{counter}"));
        if is_free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Anything at `path`, including a symlink whose target is missing.
fn is_taken(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Split `"report.final.pdf"` into `("report.final", ".pdf")`. A leading dot
/// (`".env"`) is not an extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => filename.split_at(pos),
        _ => (filename, ""),
    }
}
