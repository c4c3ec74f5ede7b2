//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use super::{DispatchTrace, Level};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Self::File(Mutex::new(open_log_file(path)?))),
            None => Ok(fallback),
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            Self::Stdout => io::stdout().is_terminal(),
            Self::Stderr => io::stderr().is_terminal(),
            Self::File(_) => false,
        }
    }
}

/// Thread-safe log writer
pub struct LogWriter {
    /// Info and success trace target
    info: LogTarget,
    /// Error and failure trace target
    error: LogTarget,
    /// Most verbose level that is written
    level: Level,
    /// Dispatch trace format (text or json)
    format: String,
}

impl LogWriter {
    /// Create a new log writer with optional file paths
    fn new(
        info_log_file: Option<&str>,
        error_log_file: Option<&str>,
        level: Level,
        format: &str,
    ) -> io::Result<Self> {
        Ok(Self {
            info: LogTarget::open(info_log_file, LogTarget::Stdout)?,
            error: LogTarget::open(error_log_file, LogTarget::Stderr)?,
            level,
            format: format.to_string(),
        })
    }

    /// Write to the info log
    pub fn write_info(&self, message: &str) {
        write_to_target(&self.info, message);
    }

    /// Write to the error log
    pub fn write_error(&self, message: &str) {
        write_to_target(&self.error, message);
    }

    /// Write a dispatch trace: a 200 goes to the info log, anything else to the error log
    pub fn write_trace(&self, trace: &DispatchTrace) {
        if trace.is_success() {
            self.write_info(&trace.format(&self.format, self.info.is_terminal()));
        } else {
            self.write_error(&trace.format(&self.format, self.error.is_terminal()));
        }
    }

    pub const fn level(&self) -> Level {
        self.level
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write message to log target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => {
            println!("{message}");
        }
        LogTarget::Stderr => {
            eprintln!("{message}");
        }
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened.
pub fn init(
    info_log_file: Option<&str>,
    error_log_file: Option<&str>,
    level: Level,
    format: &str,
) -> io::Result<()> {
    let writer = LogWriter::new(info_log_file, error_log_file, level, format)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer, if `init()` has been called
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}

/// File-backed global writer shared by tests that inspect logged lines
///
/// Returns the info and error log paths.
#[cfg(test)]
pub fn init_for_tests() -> (std::path::PathBuf, std::path::PathBuf) {
    let dir = std::env::temp_dir().join(format!("hello_api_test_logs_{}", std::process::id()));
    let info = dir.join("info.log");
    let error = dir.join("error.log");
    LOG_WRITER.get_or_init(|| {
        LogWriter::new(
            Some(&info.to_string_lossy()),
            Some(&error.to_string_lossy()),
            Level::Debug,
            "text",
        )
        .unwrap()
    });
    (info, error)
}
