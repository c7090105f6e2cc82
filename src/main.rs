//! `harvest`: download the attachments linked from a folder of PDF
//! transmittals.
//!
//! This binary is a thin wrapper around the `attachment_harvester` library.
//! It handles argument parsing, logger set-up, Ctrl-C and the final summary.

use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use attachment_harvester::logging::{init_logger, LogLevel, DEFAULT_LOG_FILE};
use attachment_harvester::{discover_documents, HarvestConfig, HarvestReport, Harvester, PdfAnalyzer};

#[derive(Debug, Parser)]
#[command(
    name = "harvest",
    version,
    about = "Download the attachments hyperlinked from PDF transmittals and submittals"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML configuration file; flags below override its values
    #[arg(long, global = true, env = "HARVEST_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Folder scanned for *.pdf documents
    #[arg(long, short = 's', global = true, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Folder receiving attachments and reports
    #[arg(long, short = 'd', global = true, value_name = "DIR")]
    dest_dir: Option<PathBuf>,

    /// Put every attachment directly in the destination folder
    #[arg(long, global = true)]
    common_folder: bool,

    /// Treat HTTP 401 responses as skips instead of failures
    #[arg(long = "suppress-401", global = true)]
    suppress_401: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<f64>,

    /// Attempts per link, including the first
    #[arg(long, global = true, value_name = "N")]
    max_attempts: Option<u32>,

    /// Maximum length of a renamed document folder
    #[arg(long, global = true, value_name = "N")]
    max_folder_name_len: Option<usize>,

    /// Log level (RUST_LOG is honoured for other targets)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// File mirroring every log line (appended to)
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to the console only
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Extract links, download attachments and write the reports (default)
    Run,
    /// Count downloadable links per PDF without downloading anything
    Count,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn harvest_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => HarvestConfig::default(),
        };

        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.dest_dir {
            config.dest_dir = dir.clone();
        }
        if self.common_folder {
            config.per_document_subfolders = false;
        }
        if self.suppress_401 {
            config.suppress_401_failures = true;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid timeout: {secs}"))?;
        }
        if let Some(n) = self.max_attempts {
            config.retry.max_attempts = n;
        }
        if let Some(n) = self.max_folder_name_len {
            config.max_folder_name_len = n;
        }

        config.source_dir = absolute(&config.source_dir);
        config.dest_dir = absolute(&config.dest_dir);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    init_logger(cli.log_level.into(), log_file).context("Failed to initialize logger")?;

    let config = cli.harvest_config()?;
    if let Ok(cwd) = std::env::current_dir() {
        info!("Current working directory: {}", cwd.display());
    }
    info!("Source folder: {}", config.source_dir.display());
    info!("Attachments folder: {}", config.dest_dir.display());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config),
        Command::Count => count(&config),
    }
}

fn run(config: &HarvestConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let harvester = Harvester::new(config).context("Failed to set up the downloader")?;
    match harvester.run(&cancel) {
        Ok(report) => {
            print_summary(&report);
            if report.interrupted {
                eprintln!("⚠️  Interrupted: reports contain the documents processed so far");
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("harvest error: {e:#}");
            process::exit(1);
        }
    }
}

fn print_summary(report: &HarvestReport) {
    println!(
        "✅ Processed {} PDF{}: {} attachment{} downloaded, {} failure{}",
        report.summaries.len(),
        plural(report.summaries.len()),
        report.total_downloaded(),
        plural(report.total_downloaded()),
        report.failures.len(),
        plural(report.failures.len()),
    );
    println!("Summary saved in {}", report.summary_path.display());
    if let Some(path) = &report.failure_path {
        println!("Failures saved in {}", path.display());
    }
}

fn count(config: &HarvestConfig) -> Result<()> {
    let documents = discover_documents(&config.source_dir)?;
    println!("Found {} PDF file(s) to process for attachment counts.", documents.len());

    let mut total = 0;
    for document in &documents {
        match PdfAnalyzer::from_path(&document.path) {
            Ok(analyzer) => {
                let n = analyzer.downloadable_link_count();
                println!("{:>4}  {}  {n}", document.ordinal, document.file_name());
                total += n;
            }
            Err(e) => warn!("❌ Error processing {}: {e}", document.file_name()),
        }
    }

    println!("📊 Total downloadable attachments across all PDFs: {total}");
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn watch_ctrl_c(token: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl-C handling unavailable: {e}");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Ctrl-C received; stopping after the current download");
                    token.cancel();
                }
            });
        });

    if let Err(e) = spawned {
        warn!("Ctrl-C handling unavailable: {e}");
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
