use crate::{
    discover_documents, BatchOutcome, Downloader, FailureRecord, FolderOrganizer, HarvestConfig,
    PdfAnalyzer, ReportWriter, Result, SourceDocument, SummaryRecord,
};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Everything a run produced. The same rows are on disk in the two reports.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub summaries: Vec<SummaryRecord>,
    pub failures: Vec<FailureRecord>,
    pub summary_path: PathBuf,

    /// `None` when there were no failures (and so no failure file).
    pub failure_path: Option<PathBuf>,

    /// `true` when cancellation cut the run short.
    pub interrupted: bool,
}

impl HarvestReport {
    /// Attachments downloaded across all documents.
    pub fn total_downloaded(&self) -> usize {
        self.summaries.iter().map(|s| s.attachments_count).sum()
    }
}

/// Result of harvesting one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentHarvest {
    pub links_found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failures: Vec<FailureRecord>,

    /// Final folder holding this document's attachments, if any link was
    /// processed.
    pub folder: Option<PathBuf>,
    pub interrupted: bool,
}

/// Drives a run: discover, then per document extract → download → organize,
/// then write reports.
pub struct Harvester<'a> {
    config: &'a HarvestConfig,
    downloader: Downloader,
}

impl<'a> Harvester<'a> {
    pub fn new(config: &'a HarvestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            downloader: Downloader::new(config)?,
        })
    }

    /// Run the whole pipeline.
    ///
    /// Only discovery problems (and failing to create the destination root or
    /// write the reports) abort the run. A document that cannot be opened or
    /// processed gets a zero-count summary row and the run moves on. When
    /// `cancel` fires, the current document is wrapped up and the reports are
    /// written with what has been gathered so far.
    pub fn run(&self, cancel: &CancellationToken) -> Result<HarvestReport> {
        let documents = discover_documents(&self.config.source_dir)?;
        let dest = &self.config.dest_dir;
        std::fs::create_dir_all(dest)?;

        let reports = ReportWriter::new(dest);
        if !self.config.per_document_subfolders {
            // Attachments share the root with the reports in this mode.
            reports.reserve_names()?;
        }

        info!(
            "Found {} PDF file(s) to process (attachments folder: {})",
            documents.len(),
            dest.display()
        );

        let mut summaries = Vec::with_capacity(documents.len());
        let mut failures = Vec::new();
        let mut interrupted = false;

        for document in &documents {
            if cancel.is_cancelled() {
                warn!(
                    "Interrupted; {} document(s) not processed",
                    documents.len() - summaries.len()
                );
                interrupted = true;
                break;
            }

            info!(
                "Processing PDF file {}/{}: {}",
                document.ordinal,
                documents.len(),
                document.path.display()
            );

            let attachments_count = match self.process_document(document, cancel) {
                Ok(harvest) => {
                    failures.extend(harvest.failures);
                    interrupted = harvest.interrupted;
                    harvest.downloaded
                }
                Err(e) => {
                    error!("Error extracting/downloading links for {}: {e}", document.file_name());
                    0
                }
            };

            summaries.push(SummaryRecord {
                file_number: document.ordinal,
                file_name: document.file_name(),
                attachments_count,
            });

            if interrupted {
                break;
            }
        }
        // Ctrl-C during the last link, or during a document that then failed.
        interrupted |= cancel.is_cancelled();

        let (summary_path, failure_path) = match write_reports(&reports, &summaries, &failures) {
            Ok(paths) => paths,
            Err(e) => {
                reports.discard_reservations();
                return Err(e);
            }
        };

        Ok(HarvestReport {
            summaries,
            failures,
            summary_path,
            failure_path,
            interrupted,
        })
    }

    /// Extract, download and organize a single document.
    ///
    /// `Err` means the document could not be opened or its folder could not
    /// be created; per-link problems are in [`DocumentHarvest::failures`].
    pub fn process_document(
        &self,
        document: &SourceDocument,
        cancel: &CancellationToken,
    ) -> Result<DocumentHarvest> {
        let links = PdfAnalyzer::from_path(&document.path)?.extract_links();
        let name = document.file_name();

        if links.is_empty() {
            info!("No links found in {name}");
            return Ok(DocumentHarvest::default());
        }
        info!("Found {} link(s) in {name}", links.len());

        let dest = &self.config.dest_dir;
        let organizer = FolderOrganizer::new(dest, self.config.max_folder_name_len);
        let working = if self.config.per_document_subfolders {
            organizer.create_working_folder(document)?
        } else {
            dest.clone()
        };

        let batch = self.downloader.download_links(&links, &working, cancel)?;

        let folder = if self.config.per_document_subfolders {
            organizer.organize(document, &working).path
        } else {
            working
        };
        let failures = failure_records(&name, &folder, &batch);

        Ok(DocumentHarvest {
            links_found: links.len(),
            downloaded: batch.success_count(),
            skipped: batch.skipped_count(),
            failures,
            folder: Some(folder),
            interrupted: batch.interrupted,
        })
    }
}

fn write_reports(
    reports: &ReportWriter,
    summaries: &[SummaryRecord],
    failures: &[FailureRecord],
) -> Result<(PathBuf, Option<PathBuf>)> {
    let summary_path = reports.write_summary(summaries)?;
    let failure_path = reports.write_failures(failures)?;
    Ok((summary_path, failure_path))
}

/// One failure row per failed link, all pointing at `folder`.
fn failure_records(pdf_file: &str, folder: &Path, batch: &BatchOutcome) -> Vec<FailureRecord> {
    batch
        .failures()
        .map(|(link, status_code, error)| FailureRecord {
            pdf_file: pdf_file.to_string(),
            attachments_folder: folder.to_path_buf(),
            link: link.uri.clone(),
            status_code,
            error: Some(error.to_string()),
        })
        .collect()
}
