#![deny(missing_docs)]
//! Shared logging utilities for the magazine workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the three-level [`Verbosity`] switch and the process-wide logger setup.

use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// How chatty a run is.
///
/// Controls both the log severity threshold and whether external tools
/// are allowed to write to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Progress messages.
    Normal,
    /// Everything, including the output of external tools.
    Debug,
}

impl Verbosity {
    /// Maps a repeated `-v` flag count onto a level, saturating at [`Verbosity::Debug`].
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Quiet,
            1 => Verbosity::Normal,
            _ => Verbosity::Debug,
        }
    }

    /// The log threshold for this level.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }

    /// Whether subprocess stdout/stderr should reach the terminal.
    pub fn shows_subprocess_output(self) -> bool {
        self >= Verbosity::Debug
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Installs the terminal logger for the whole process.
///
/// Output goes to stderr so stdout stays free for the final file path.
/// Calling this more than once keeps the first logger.
pub fn initialize(verbosity: Verbosity) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();

    let _ = TermLogger::init(
        verbosity.level_filter(),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let verbosity = if cfg!(debug_assertions) {
        Verbosity::Debug
    } else {
        Verbosity::Normal
    };
    initialize(verbosity);
}
