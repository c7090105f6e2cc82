use crate::{naming, ExtractedLink, HarvestConfig, LinkKind, Result, RetryPolicy};
use log::{info, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tokio_util::sync::CancellationToken;

/// Response bodies are copied to disk in chunks of this size.
pub const CHUNK_SIZE: usize = 8 * 1024;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ── DownloadOutcome ──────────────────────────────────────────────────────────

/// Terminal result of handling one link. Exactly one per processed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// `mailto:` link. No request made.
    SkippedMailto,
    /// Not an `http(s)` link. No request made.
    SkippedNonHttp,
    /// HTTP 401 while `suppress_401_failures` is on.
    SkippedUnauthorized,
    /// HTTP 200, body written to `path`.
    Success { path: PathBuf },
    /// Non-200 status (`status_code` set) or a transport/write error
    /// (`status_code` is `None`).
    Failed {
        status_code: Option<u16>,
        error: String,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::SkippedMailto
                | DownloadOutcome::SkippedNonHttp
                | DownloadOutcome::SkippedUnauthorized
        )
    }

    fn status(code: u16) -> Self {
        DownloadOutcome::Failed {
            status_code: Some(code),
            error: format!("Status {code}"),
        }
    }

    fn transport(error: String) -> Self {
        DownloadOutcome::Failed {
            status_code: None,
            error,
        }
    }
}

/// Outcomes for one document's links, in link order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<(ExtractedLink, DownloadOutcome)>,

    /// `true` when cancellation stopped the batch before every link was
    /// handled.
    pub interrupted: bool,
}

impl BatchOutcome {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_skip()).count()
    }

    /// `(link, status_code, error)` for every failed link.
    pub fn failures(&self) -> impl Iterator<Item = (&ExtractedLink, Option<u16>, &str)> {
        self.results.iter().filter_map(|(link, outcome)| match outcome {
            DownloadOutcome::Failed { status_code, error } => {
                Some((link, *status_code, error.as_str()))
            }
            _ => None,
        })
    }
}

// ── Downloader ───────────────────────────────────────────────────────────────

/// Fetches attachment links one at a time into a destination folder.
pub struct Downloader {
    client: Client,
    suppress_401: bool,
    retry: RetryPolicy,
}

enum FetchFailure {
    Status(u16),
    Transport(String),
}

impl Downloader {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            suppress_401: config.suppress_401_failures,
            retry: config.retry.clone(),
        })
    }

    /// Download every link into `folder`, creating it if needed.
    ///
    /// Only a failure to create `folder` is an `Err`; every per-link problem
    /// becomes a [`DownloadOutcome`]. Cancellation is checked before each
    /// link.
    pub fn download_links(
        &self,
        links: &[ExtractedLink],
        folder: &Path,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        std::fs::create_dir_all(folder)?;

        let mut batch = BatchOutcome::default();
        for link in links {
            if cancel.is_cancelled() {
                warn!("Interrupted; {} link(s) not processed", links.len() - batch.results.len());
                batch.interrupted = true;
                break;
            }
            let outcome = self.download_link(link, folder);
            batch.results.push((link.clone(), outcome));
        }
        Ok(batch)
    }

    /// Classify and, for web links, fetch a single link into `folder`.
    pub fn download_link(&self, link: &ExtractedLink, folder: &Path) -> DownloadOutcome {
        match link.kind() {
            LinkKind::Mailto => {
                info!("Skipping email link: {}", link.uri);
                return DownloadOutcome::SkippedMailto;
            }
            LinkKind::NonHttp => {
                info!("Skipping non-http(s) link: {}", link.uri);
                return DownloadOutcome::SkippedNonHttp;
            }
            LinkKind::Http => {}
        }

        let response = match self.fetch(&link.uri) {
            Ok(response) => response,
            Err(FetchFailure::Status(401)) if self.suppress_401 => {
                info!("Skipping unauthorized (401) link: {}", link.uri);
                return DownloadOutcome::SkippedUnauthorized;
            }
            Err(FetchFailure::Status(code)) => {
                warn!("Failed (status {code}): {}", link.uri);
                return DownloadOutcome::status(code);
            }
            Err(FetchFailure::Transport(error)) => {
                warn!("Error downloading {}: {error}", link.uri);
                return DownloadOutcome::transport(error);
            }
        };

        match save_response(response, link, folder) {
            Ok(path) => {
                info!("Downloaded: {}", path.display());
                DownloadOutcome::Success { path }
            }
            Err(e) => {
                warn!("Error saving {}: {e}", link.uri);
                DownloadOutcome::transport(e.to_string())
            }
        }
    }

    /// GET `url`, retrying per the policy. Returns the response only for
    /// HTTP 200.
    fn fetch(&self, url: &str) -> std::result::Result<Response, FetchFailure> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let failure = match self.client.get(url).send() {
                Ok(response) if response.status() == StatusCode::OK => return Ok(response),
                Ok(response) => {
                    let code = response.status().as_u16();
                    if !RetryPolicy::is_retryable_status(code) {
                        return Err(FetchFailure::Status(code));
                    }
                    FetchFailure::Status(code)
                }
                Err(e) => FetchFailure::Transport(error_chain(&e)),
            };

            if attempt >= max_attempts {
                return Err(failure);
            }
            let pause = self.retry.backoff(attempt);
            warn!(
                "Attempt {attempt}/{max_attempts} for {url} failed; retrying in {:.1}s",
                pause.as_secs_f64()
            );
            thread::sleep(pause);
            attempt += 1;
        }
    }
}

/// Name, create and stream a successful response into `folder`.
///
/// The file is created with `create_new`, so an existing file is never
/// truncated. A partially written file is removed on error.
fn save_response(mut response: Response, link: &ExtractedLink, folder: &Path) -> io::Result<PathBuf> {
    let filename = naming::resolve_filename(
        header_str(&response, CONTENT_DISPOSITION).as_deref(),
        &link.uri,
        header_str(&response, CONTENT_TYPE).as_deref(),
        link.index,
    );

    let (path, mut file) = create_unique(folder, &filename)?;
    if let Err(e) = copy_in_chunks(&mut response, &mut file) {
        drop(file);
        let _ = std::fs::remove_file(&path);
        return Err(e);
    }
    Ok(path)
}

fn header_str(response: &Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Allocate a free name in `folder` and create it atomically.
///
/// The counter only moves forward, so a name that `create_new` refuses is
/// never tried twice.
fn create_unique(folder: &Path, filename: &str) -> io::Result<(PathBuf, File)> {
    let mut n = 0;
    loop {
        let path = folder.join(naming::numbered_name(filename, n));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

fn copy_in_chunks<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// `error: cause: root cause`, so timeouts and DNS failures are legible in
/// the failure report.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
