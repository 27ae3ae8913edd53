#![deny(missing_docs)]
//! Logging for the consultation harvester workspace.
//!
//! The `consult_*` macros forward to the `log` facade, so callers need `log`
//! in their own dependency list. Binaries install a logger once with
//! [`initialize`]; tests call [`initialize_for_tests`].

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message.
#[macro_export]
macro_rules! consult_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! consult_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message.
#[macro_export]
macro_rules! consult_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message.
#[macro_export]
macro_rules! consult_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message.
#[macro_export]
macro_rules! consult_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Only the log file.
    File,
    /// Only stderr/stdout.
    Terminal,
    /// Terminal and log file.
    Both,
}

/// Logger setup for a binary run.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Output channels.
    pub destination: LogDestination,
    /// Most verbose level written.
    pub level: LevelFilter,
    /// Log file, truncated at startup.
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            destination: LogDestination::Both,
            level: LevelFilter::Info,
            file: PathBuf::from("consult.log"),
        }
    }
}

impl LogSettings {
    /// Raises the level by one step per `-v`: info, debug, trace.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.level = match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        self
    }
}

/// Installs the global logger. A log file that cannot be created is reported
/// on stderr and skipped; a second initialization is a no-op.
pub fn initialize(settings: &LogSettings) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if matches!(
        settings.destination,
        LogDestination::Terminal | LogDestination::Both
    ) {
        loggers.push(TermLogger::new(
            settings.level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(
        settings.destination,
        LogDestination::File | LogDestination::Both
    ) {
        match File::create(&settings.file) {
            Ok(file) => loggers.push(WriteLogger::new(settings.level, config, file)),
            Err(err) => eprintln!(
                "Warning: could not create log file {}: {}",
                settings.file.display(),
                err
            ),
        }
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
}

/// Terminal logger for tests; safe to call from every test.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str("consult")
        .build()
}
