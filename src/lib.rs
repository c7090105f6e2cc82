//! # attachment_harvester
//!
//! A Rust library for harvesting the attachments that construction transmittals
//! and submittals reference through embedded hyperlinks.
//!
//! ## What this crate does
//!
//! 1. **Discover documents** — scans a source folder (non-recursively) for PDFs.
//! 2. **Extract links** — walks every page's link annotations and collects the
//!    URI targets in page order.
//! 3. **Download attachments** — fetches every `http(s)` link with a streamed
//!    GET, names the file from the response, and never overwrites an existing
//!    file.
//! 4. **Organize folders** — renames each document's working folder after the
//!    document itself.
//! 5. **Report** — writes `file_summary.csv` and, when anything failed,
//!    `failed_downloads.csv` into the destination root.
//!
//! ## Quick example
//!
//! ```no_run
//! use attachment_harvester::{HarvestConfig, Harvester};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig {
//!     source_dir: "./Submittals".into(),
//!     dest_dir: "./attachments".into(),
//!     ..Default::default()
//! };
//!
//! let report = Harvester::new(&config)?.run(&CancellationToken::new())?;
//! println!(
//!     "{} document(s), {} attachment(s), {} failure(s)",
//!     report.summaries.len(),
//!     report.total_downloaded(),
//!     report.failures.len()
//! );
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

mod analyzer;
mod analyzer_links;
mod discovery;
mod downloader;
mod harvester;
mod link_discovery;
mod links;
pub mod logging;
pub mod naming;
mod organizer;
mod pdf_utils;
mod report;

pub use analyzer::PdfAnalyzer;
pub use discovery::discover_documents;
pub use downloader::{BatchOutcome, DownloadOutcome, Downloader};
pub use harvester::{DocumentHarvest, HarvestReport, Harvester};
pub use links::{ExtractedLink, LinkKind, SourceDocument};
pub use organizer::{FolderOrganizer, OrganizedFolder};
pub use report::{FailureRecord, ReportWriter, SummaryRecord, FAILURE_REPORT, SUMMARY_REPORT};

// ── Configuration ────────────────────────────────────────────────────────────

/// Upper bound accepted for [`HarvestConfig::request_timeout`].
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Runtime configuration for a harvest run.
///
/// Built once at start-up (defaults, then an optional TOML file, then CLI
/// flags) and handed by reference to every collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Folder scanned (non-recursively) for `*.pdf` documents.
    pub source_dir: PathBuf,

    /// Root folder receiving attachments and both reports.
    pub dest_dir: PathBuf,

    /// When `true`, each document gets its own folder, renamed after the
    /// document once its downloads finish. When `false`, every attachment
    /// lands directly in [`dest_dir`](Self::dest_dir).
    pub per_document_subfolders: bool,

    /// When `true`, an HTTP 401 response is treated as a skip rather than a
    /// logged failure.
    pub suppress_401_failures: bool,

    /// Timeout for connecting and for each read of a single GET. A body that
    /// keeps arriving is not cut off.
    #[serde(rename = "request_timeout_secs", deserialize_with = "de_secs")]
    pub request_timeout: Duration,

    /// Maximum length of a renamed per-document folder.
    pub max_folder_name_len: usize,

    /// Retry behaviour for individual downloads.
    pub retry: RetryPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./Submittals"),
            dest_dir: PathBuf::from("./attachments"),
            per_document_subfolders: true,
            suppress_401_failures: false,
            request_timeout: Duration::from_secs(15),
            max_folder_name_len: 80,
            retry: RetryPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a TOML file. Keys that are absent keep their
    /// default values.
    ///
    /// ```toml
    /// source_dir = "./Transmittals"
    /// dest_dir = "./Transmittals/attachments"
    /// per_document_subfolders = false
    /// request_timeout_secs = 30
    ///
    /// [retry]
    /// max_attempts = 3
    /// ```
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| HarvestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the harvester cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(HarvestError::Config("request timeout must be positive".into()));
        }
        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(HarvestError::Config(format!(
                "request timeout must be at most {} seconds",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }
        if self.max_folder_name_len == 0 {
            return Err(HarvestError::Config(
                "max_folder_name_len must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HarvestError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.backoff_base_secs.is_finite() || self.retry.backoff_base_secs < 0.0 {
            return Err(HarvestError::Config(
                "retry.backoff_base_secs must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// Bounded retry with exponential backoff (no jitter).
///
/// The default is a single attempt: each link is fetched once and its outcome
/// recorded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per link, including the first.
    pub max_attempts: u32,

    /// Base of the backoff curve. The pause before attempt `n + 1` is
    /// `base^(n - 1) + 0.1 * n` seconds.
    pub backoff_base_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_base_secs: 1.8,
        }
    }
}

impl RetryPolicy {
    /// Longest pause between two attempts.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

    /// Pause to take after `attempt` (1-based) has failed, at most
    /// [`MAX_BACKOFF`](Self::MAX_BACKOFF).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.backoff_base_secs.powi(exp) + 0.1 * f64::from(attempt);
        Duration::try_from_secs_f64(secs)
            .map(|pause| pause.min(Self::MAX_BACKOFF))
            .unwrap_or(Self::MAX_BACKOFF)
    }

    /// Status codes worth another attempt.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
    }
}

fn de_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(|e| {
        serde::de::Error::custom(format!("timeout of {secs} seconds is not usable: {e}"))
    })
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
///
/// Per-link download problems are not errors: they are recorded as
/// [`DownloadOutcome`] values and end up in the failure report.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A PDF could not be opened or parsed.
    #[error("cannot open PDF '{}': {source}", .path.display())]
    DocumentOpen {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// The source folder is missing or unreadable.
    #[error("cannot scan source folder '{}': {reason}", .path.display())]
    Discovery { path: PathBuf, reason: String },

    /// The source folder contains no PDF documents.
    #[error("no PDF files found in '{}'", .0.display())]
    NoDocuments(PathBuf),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A report could not be written.
    #[error("report error: {0}")]
    Report(#[from] csv::Error),

    /// A logger was already installed.
    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, HarvestError>;
