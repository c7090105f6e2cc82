//! Logger initialization.
//!
//! Console output goes through `env_logger` with a coloured level tag. Every
//! line can also be mirrored, without colour codes, to a log file opened in
//! append mode.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use colored::Colorize;
use log::LevelFilter;

use crate::Result;

/// Default log file, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "download.log";

/// Logging level for the application.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and progress messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Initializes the logger.
///
/// `RUST_LOG` is read first; `level` overrides it for this crate. When
/// `log_file` is given, output is mirrored there. If that file cannot be
/// opened a warning is printed and logging continues on the console only.
///
/// Returns the log file path actually in use.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("lopdf", LevelFilter::Warn);

    builder.format(|buf, record| {
        let level = record.level();
        let tag = match level {
            log::Level::Error => level.as_str().red(),
            log::Level::Warn => level.as_str().yellow(),
            log::Level::Info => level.as_str().green(),
            log::Level::Debug => level.as_str().blue(),
            log::Level::Trace => level.as_str().purple(),
        };
        writeln!(buf, "{} [{}] {}", buf.timestamp_seconds(), tag, record.args())
    });

    let mirrored = match log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter::new(file))));
                Some(path.to_path_buf())
            }
            Err(e) => {
                eprintln!(
                    "Could not open log file '{}': {e}; logging to console only",
                    path.display()
                );
                None
            }
        },
        None => None,
    };

    builder.try_init()?;
    Ok(mirrored)
}

/// Writes to stderr as-is and to a file with ANSI colour codes removed.
struct TeeWriter {
    file: File,
}

impl TeeWriter {
    fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        // Never let the mirror disrupt console output.
        let _ = self.file.write_all(&strip_ansi(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        io::stderr().flush()
    }
}

/// Remove `ESC [ ... <letter>` sequences.
fn strip_ansi(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b == 0x1b && iter.peek() == Some(&b'[') {
            iter.next();
            for c in iter.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(b);
    }
    out
}
