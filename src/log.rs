//! Logging helpers.
//!
//! The `log_*!` macros write through the [`log`](https://crates.io/crates/log) facade. Each record is prefixed
//! with the current simulation time, a colored level and the name of the component emitting it, and uses the
//! component name as the log target, so the output can be filtered per entity (e.g. `RUST_LOG=server=debug`).
//!
//! The macros accept anything exposing `time()` and `name()` methods, such as
//! [`SimulationContext`](crate::SimulationContext).

use colored::Colorize;

use crate::component::Id;
use crate::message::Message;

/// Formats a line for the user logger sink: `"<time> <entity id>   <message>\n"`.
///
/// The entity id is left empty for lines which do not belong to an entity.
pub fn format_line(time: f64, entity: Option<Id>, message: &str) -> String {
    match entity {
        Some(id) => format!("{:.6} {}   {}\n", time, id, message),
        None => format!("{:.6}    {}\n", time, message),
    }
}

/// Logs a message whose payload type was not matched by [`cast!`](crate::cast).
pub fn log_unhandled_message(message: &Message) {
    log::warn!(
        target: "qsim",
        "[{:.3} {} {}] unhandled message from {}: {}",
        message.sent_at,
        "WARN".yellow(),
        "qsim",
        message.src,
        message.data_json()
    );
}

/// Logs a message at the trace level.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => (
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::cyan("TRACE"),
                $ctx.name(),
                $msg
            )
        }
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::cyan("TRACE"),
                $ctx.name(),
                format!($format, $($arg)+)
            )
        }
    );
}

/// Logs a message at the debug level.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => (
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::blue("DEBUG"),
                $ctx.name(),
                $msg
            )
        }
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::blue("DEBUG"),
                $ctx.name(),
                format!($format, $($arg)+)
            )
        }
    );
}

/// Logs a message at the info level.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => (
        if log::log_enabled!(log::Level::Info) {
            log::info!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::green("INFO"),
                $ctx.name(),
                $msg
            )
        }
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        if log::log_enabled!(log::Level::Info) {
            log::info!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::green("INFO"),
                $ctx.name(),
                format!($format, $($arg)+)
            )
        }
    );
}

/// Logs a message at the warn level.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => (
        if log::log_enabled!(log::Level::Warn) {
            log::warn!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::yellow("WARN"),
                $ctx.name(),
                $msg
            )
        }
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        if log::log_enabled!(log::Level::Warn) {
            log::warn!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::yellow("WARN"),
                $ctx.name(),
                format!($format, $($arg)+)
            )
        }
    );
}

/// Logs a message at the error level.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => (
        if log::log_enabled!(log::Level::Error) {
            log::error!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::red("ERROR"),
                $ctx.name(),
                $msg
            )
        }
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        if log::log_enabled!(log::Level::Error) {
            log::error!(
                target: $ctx.name(),
                "[{:.3} {} {}] {}",
                $ctx.time(),
                $crate::colored::Colorize::red("ERROR"),
                $ctx.name(),
                format!($format, $($arg)+)
            )
        }
    );
}
