use crate::{HarvestError, Result};
use lopdf::Document;
use std::path::{Path, PathBuf};

// ── PdfAnalyzer ───────────────────────────────────────────────────────────────

/// Entry point for reading hyperlinks out of a PDF.
///
/// # Creating an analyzer
///
/// ```no_run
/// use attachment_harvester::PdfAnalyzer;
///
/// // From a file path
/// let a = PdfAnalyzer::from_path("Submittals/A.pdf").unwrap();
///
/// // From an in-memory buffer
/// let bytes = std::fs::read("Submittals/A.pdf").unwrap();
/// let a = PdfAnalyzer::from_bytes(&bytes).unwrap();
/// ```
#[derive(Debug)]
pub struct PdfAnalyzer {
    document: Document,
}

impl PdfAnalyzer {
    // ── Constructors ──────────────────────────────────────────────────────────

    /// Load a PDF from the file system.
    ///
    /// Fails with [`HarvestError::DocumentOpen`] when the file is missing,
    /// corrupt, or not a PDF.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|source| HarvestError::DocumentOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { document })
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|source| HarvestError::DocumentOpen {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        Ok(Self { document })
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Returns a reference to the underlying [`lopdf::Document`].
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}
