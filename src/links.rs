use std::path::{Path, PathBuf};

// ── SourceDocument ───────────────────────────────────────────────────────────

/// A PDF discovered in the source folder.
///
/// Returned by [`crate::discover_documents`]; never modified by the harvester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// 1-based position in the run, used for the summary report and the
    /// document's working folder name.
    pub ordinal: usize,

    /// Full path to the PDF.
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(ordinal: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            ordinal,
            path: path.into(),
        }
    }

    /// File name including the extension, e.g. `"A.pdf"`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its extension, e.g. `"A"`.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the folder this document's downloads go into before renaming.
    pub fn working_folder_name(&self) -> String {
        format!("pdf_{}", self.ordinal)
    }

    /// Returns `true` when `path` has a `.pdf` extension (case-insensitive).
    pub fn is_pdf_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

// ── ExtractedLink ────────────────────────────────────────────────────────────

/// How the downloader treats a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `mailto:` link. Skipped, not a failure.
    Mailto,
    /// Any other non-web scheme (`file:`, `ftp:`, relative paths, …). Skipped,
    /// not a failure.
    NonHttp,
    /// `http://` or `https://`. Fetched.
    Http,
}

impl LinkKind {
    /// Classify a raw URI (scheme comparison is case-insensitive).
    pub fn classify(uri: &str) -> Self {
        let lower = uri.trim_start().to_ascii_lowercase();
        if lower.starts_with("mailto:") {
            LinkKind::Mailto
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            LinkKind::Http
        } else {
            LinkKind::NonHttp
        }
    }

    pub fn is_downloadable(self) -> bool {
        self == LinkKind::Http
    }
}

/// A hyperlink target found in a document's link annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// 0-based position within the document's link list. Used for the
    /// synthetic `file_<index>` filename.
    pub index: usize,

    /// The annotation's URI target, with surrounding whitespace trimmed.
    pub uri: String,
}

impl ExtractedLink {
    pub fn new(index: usize, uri: impl Into<String>) -> Self {
        Self {
            index,
            uri: uri.into(),
        }
    }

    pub fn kind(&self) -> LinkKind {
        LinkKind::classify(&self.uri)
    }

    /// Wrap raw URIs in document order.
    pub fn from_uris<I, S>(uris: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        uris.into_iter()
            .enumerate()
            .map(|(i, uri)| Self::new(i, uri))
            .collect()
    }
}
