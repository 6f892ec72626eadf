// Logging module for active-object
// Provides structured logging with timestamp formatting and multiple output formats
//
// Records are formatted on the calling thread and handed to a dedicated
// writer, which is itself an active object named "log-writer". Callers never
// wait for console or file I/O.
//
// - Output formats: Text and JSON
// - Destinations: Console, File, or Both
// - Independent log levels for console and file output
// - Timestamps formatted as YYYY-MM-DD HH:mm:ss
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Info,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("app.log")),
// };
// let handle = init_logger(config)?;
// log::info!("Application started");
// handle.shutdown(Duration::from_secs(5));
// ```

use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use anyhow::{Context, Result};

use crate::active::{ActiveBehavior, ActiveObject, ActiveObjectConfig, ActiveObjectStats, ProcessingContext};

/// Thread name of the log writer; records emitted there are dropped
pub const WRITER_NAME: &str = "log-writer";

/// Queue capacity of the log writer
pub const WRITER_CAPACITY: usize = 4096;

const WRITER_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn includes_console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    fn should_log_to_console(&self, level: Level) -> bool {
        self.destination.includes_console() && level <= self.console_level
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        match (self.destination.file_path(), self.file_level) {
            (Some(_), Some(file_level)) => level <= file_level,
            _ => false,
        }
    }

    fn enabled(&self, level: Level) -> bool {
        self.should_log_to_console(level) || self.should_log_to_file(level)
    }

    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

pub fn format_timestamp() -> String {
    let now: DateTime<Local> = Local::now();
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_text_message(level: Level, message: &str) -> String {
    format!("{} [{}] {}", format_timestamp(), level.to_string().to_uppercase(), message)
}

pub fn format_json_message(level: Level, message: &str, thread: Option<&str>) -> Result<String> {
    let entry = JsonLogEntry {
        timestamp: format_timestamp(),
        level: level.to_string().to_uppercase(),
        message: message.to_string(),
        detail: thread.map(|name| serde_json::json!({ "thread": name })),
    };

    serde_json::to_string(&entry)
        .context("Failed to serialize log entry to JSON")
}

/// Work items for the log writer
#[derive(Debug)]
pub enum LogMessage {
    /// A fully formatted line
    Record { level: Level, line: String },
    /// Flush console and file buffers
    Flush,
    /// Shutdown sentinel
    Stop,
}

/// Writer behaviour: owns the log file and performs all output I/O
pub struct LogWriter {
    config: LogConfig,
    file: Option<BufWriter<File>>,
}

impl LogWriter {
    pub fn new(config: LogConfig) -> Self {
        Self { config, file: None }
    }

    fn write_to_console(&self, line: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", line)
            .context("Failed to write to console")
    }

    fn write_to_file(&mut self, line: &str) -> Result<()> {
        match self.file.as_mut() {
            Some(file) => writeln!(file, "{}", line).context("Failed to write to log file"),
            None => Ok(()),
        }
    }

    fn write_line(&mut self, level: Level, line: &str) {
        if self.config.should_log_to_console(level) {
            if let Err(e) = self.write_to_console(line) {
                eprintln!("Console logging error: {}", e);
            }
        }
        if self.config.should_log_to_file(level) {
            if let Err(e) = self.write_to_file(line) {
                eprintln!("File logging error: {}. Falling back to console.", e);
                if let Err(console_err) = self.write_to_console(line) {
                    eprintln!("Console fallback error: {}", console_err);
                }
            }
        }
    }

    fn flush_all(&mut self) -> Result<()> {
        io::stderr().flush().context("Failed to flush console")?;
        if let Some(file) = self.file.as_mut() {
            file.flush().context("Failed to flush log file")?;
        }
        Ok(())
    }
}

impl ActiveBehavior for LogWriter {
    type Message = LogMessage;

    fn is_stop_message(message: &LogMessage) -> bool {
        matches!(message, LogMessage::Stop)
    }

    fn stop_message() -> LogMessage {
        LogMessage::Stop
    }

    fn before_process_messages(&mut self, _ctx: &ProcessingContext<'_, LogMessage>) -> Result<()> {
        if let Some(path) = self.config.destination.file_path() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            self.file = Some(BufWriter::new(file));
        }
        Ok(())
    }

    fn process_message(&mut self, _ctx: &ProcessingContext<'_, LogMessage>, message: &LogMessage) -> Result<()> {
        match message {
            LogMessage::Record { level, line } => {
                self.write_line(*level, line);
                Ok(())
            }
            LogMessage::Flush => self.flush_all(),
            LogMessage::Stop => Ok(()),
        }
    }

    fn after_process_messages(&mut self, _ctx: &ProcessingContext<'_, LogMessage>) -> Result<()> {
        self.flush_all()
    }
}

/// `log::Log` implementation that hands records to the writer thread
pub struct ActiveLogger {
    config: LogConfig,
    writer: Arc<ActiveObject<LogWriter>>,
    /// Records logged from here would feed back into the writer's own queue
    writer_thread: Option<ThreadId>,
}

impl ActiveLogger {
    /// Start the writer thread. Fails if the log file cannot be opened.
    pub fn start(config: LogConfig) -> Result<Self> {
        let object_config = ActiveObjectConfig::named(WRITER_NAME).with_capacity(WRITER_CAPACITY);
        let writer = ActiveObject::with_config(object_config, LogWriter::new(config.clone()))
            .context("Failed to create log writer")?;
        writer
            .launch(WRITER_START_TIMEOUT)
            .context("Failed to start log writer")?;
        let writer_thread = writer.worker_thread_id();

        Ok(Self {
            config,
            writer: Arc::new(writer),
            writer_thread,
        })
    }

    /// Handle used to drain and stop the writer
    pub fn handle(&self) -> LoggerHandle {
        LoggerHandle {
            writer: Arc::clone(&self.writer),
        }
    }

    fn on_writer_thread(&self) -> bool {
        self.writer_thread == Some(thread::current().id())
    }

    fn format(&self, level: Level, message: &str) -> String {
        match self.config.format {
            LogFormat::Text => format_text_message(level, message),
            LogFormat::Json => {
                match format_json_message(level, message, thread::current().name()) {
                    Ok(json) => json,
                    Err(e) => {
                        // Fallback to text format if JSON serialization fails
                        eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                        format_text_message(level, message)
                    }
                }
            }
        }
    }
}

impl log::Log for ActiveLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.config.enabled(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) || self.on_writer_thread() {
            return;
        }

        let level = record.level();
        let line = self.format(level, &record.args().to_string());

        // Writer gone or shutting down: write synchronously instead
        if !self.writer.post_message(LogMessage::Record { level, line: line.clone() }) {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if !self.on_writer_thread() {
            self.writer.post_message(LogMessage::Flush);
        }
    }
}

/// Owner-side handle to the installed logger's writer
#[derive(Clone)]
pub struct LoggerHandle {
    writer: Arc<ActiveObject<LogWriter>>,
}

impl LoggerHandle {
    /// Write out everything queued so far and stop the writer.
    ///
    /// Records logged afterwards go straight to stderr.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.writer.stop(timeout)
    }

    pub fn stats(&self) -> ActiveObjectStats {
        self.writer.stats()
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<LoggerHandle> {
    let max_level = config.max_level();
    let logger = ActiveLogger::start(config)?;
    let handle = logger.handle();

    if let Err(e) = log::set_boxed_logger(Box::new(logger)) {
        handle.shutdown(WRITER_START_TIMEOUT);
        return Err(anyhow::anyhow!(e)).context("Failed to set global logger");
    }

    log::set_max_level(max_level);

    Ok(handle)
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off", level_str)),
    }
}
