// Logging setup and the leveled sink handed to each component

use anyhow::Context;
use chrono::Local;
use log::Level;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

// Conditional logging macros - only active in debug builds

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{}};
}

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        log::info!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{}};
}

/// Target used for raw inbound/outbound frame traces.
pub const PACKET_TARGET: &str = "packets";

/// Leveled log capability injected into the dictionary, solver and session.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

pub type Logger = Arc<dyn LogSink>;

/// Forwards records to the `log` facade under a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct FacadeLog {
    target: &'static str,
}

impl FacadeLog {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn shared(target: &'static str) -> Logger {
        Arc::new(Self::new(target))
    }
}

impl LogSink for FacadeLog {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{message}");
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingLog {
    records: Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True if some record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl LogSink for RecordingLog {
    fn log(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

/// Writes every line to stderr and to a log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Initializes `env_logger`. `RUST_LOG` still overrides the default filter.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
    }

    builder.try_init().context("initialize logger")?;
    Ok(())
}
