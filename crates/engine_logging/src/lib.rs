#![deny(missing_docs)]
//! Shared logging utilities for the test generator workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Deterministic runs (driven by a virtual clock instead of real timers) can
//! publish their logical time with [`set_virtual_clock_ms`]; while it is set,
//! every `engine_*` line on that thread is prefixed with `[t+{ms}ms]`.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Logical time of the virtual clock currently driving this thread, if any.
    static VIRTUAL_CLOCK_MS: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Publishes the virtual clock reading for the current thread.
///
/// Pass `None` when the thread goes back to real-time scheduling.
pub fn set_virtual_clock_ms(millis: Option<u64>) {
    VIRTUAL_CLOCK_MS.with(|v| v.set(millis));
}

/// Returns the virtual clock reading for the current thread, if one is set.
pub fn virtual_clock_ms() -> Option<u64> {
    VIRTUAL_CLOCK_MS.with(|v| v.get())
}

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($level:ident, $($arg:tt)*) => {{
        match $crate::virtual_clock_ms() {
            Some(ms) => $crate::log::$level!("[t+{}ms] {}", ms, format_args!($($arg)*)),
            None => $crate::log::$level!($($arg)*),
        }
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::__engine_log!(trace, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::__engine_log!(info, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::__engine_log!(debug, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::__engine_log!(warn, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::__engine_log!(error, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may have installed the logger already.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
