#![deny(missing_docs)]
//! Shared logging utilities for the embed pipeline workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line emitted
//! through the macros is stamped with the simulated clock of the thread that
//! drives the embed engine, so timer-driven rescans can be read in order.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the simulated clock, in milliseconds.
    static SIM_TIME_MS: Cell<u64> = const { Cell::new(0) };
}

/// Sets the simulated clock for the current thread.
/// The engine's timer queue calls this every time it advances.
pub fn set_sim_time_ms(now_ms: u64) {
    SIM_TIME_MS.with(|v| v.set(now_ms));
}

/// Retrieves the simulated clock for the current thread.
/// Returns 0 if no engine has advanced time on this thread.
pub fn sim_time_ms() -> u64 {
    SIM_TIME_MS.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("[t={}ms] {}", $crate::sim_time_ms(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("[t={}ms] {}", $crate::sim_time_ms(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("[t={}ms] {}", $crate::sim_time_ms(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("[t={}ms] {}", $crate::sim_time_ms(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("[t={}ms] {}", $crate::sim_time_ms(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
