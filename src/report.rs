use crate::Result;
use csv::Writer;
use log::info;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Per-document summary file name, written into the destination root.
pub const SUMMARY_REPORT: &str = "file_summary.csv";

/// Failure ledger file name, written only when something failed.
pub const FAILURE_REPORT: &str = "failed_downloads.csv";

/// One row of `file_summary.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    pub file_number: usize,
    pub file_name: String,
    pub attachments_count: usize,
}

/// One row of `failed_downloads.csv`. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub pdf_file: String,
    pub attachments_folder: PathBuf,
    pub link: String,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// Writes both reports into the destination root.
pub struct ReportWriter<'a> {
    dest_root: &'a Path,
}

impl<'a> ReportWriter<'a> {
    pub fn new(dest_root: &'a Path) -> Self {
        Self { dest_root }
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dest_root.join(SUMMARY_REPORT)
    }

    pub fn failure_path(&self) -> PathBuf {
        self.dest_root.join(FAILURE_REPORT)
    }

    /// Make sure both report names exist before any download lands in the
    /// destination root, so an attachment called `file_summary.csv` gets a
    /// suffixed name instead of being overwritten by the report later.
    ///
    /// On error nothing reserved is left behind.
    pub fn reserve_names(&self) -> Result<()> {
        for path in [self.failure_path(), self.summary_path()] {
            if let Err(e) = OpenOptions::new().create(true).append(true).open(&path) {
                self.discard_reservations();
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Remove report files that are still empty placeholders, so an aborted
    /// run does not leave a failure file behind.
    pub fn discard_reservations(&self) {
        for path in [self.failure_path(), self.summary_path()] {
            let empty = std::fs::metadata(&path)
                .map(|m| m.is_file() && m.len() == 0)
                .unwrap_or(false);
            if empty {
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    /// Write `file_summary.csv`. The header is written even with no rows.
    pub fn write_summary(&self, rows: &[SummaryRecord]) -> Result<PathBuf> {
        let path = self.summary_path();
        let mut writer = Writer::from_path(&path)?;
        if rows.is_empty() {
            writer.write_record(["file_number", "file_name", "attachments_count"])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("File summary saved to: {}", path.display());
        Ok(path)
    }

    /// Write `failed_downloads.csv`, or make sure it is absent when there are
    /// no failures. Returns the path when a file was written.
    pub fn write_failures(&self, rows: &[FailureRecord]) -> Result<Option<PathBuf>> {
        let path = self.failure_path();
        if rows.is_empty() {
            if path.is_file() {
                std::fs::remove_file(&path)?;
                info!("Removed stale {}", path.display());
            }
            info!("No failed downloads.");
            return Ok(None);
        }

        let mut writer = Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Failed downloads saved to: {}", path.display());
        Ok(Some(path))
    }
}
