//! Logging macros that compile down to nothing unless the calling module opts in.
//!
//! A module declares `const ENABLE_LOGS: bool = ...;` and imports the macros from the
//! crate root:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("session {} started", session_id);
//! ```
//!
//! Per-frame chatter in the tick loop stays behind `log_debug!` so that the default
//! `info` filter only shows session lifecycle and failures.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Recoverable problems: skipped frames, unreadable optional files.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Failures the user should see, such as a repetition that was counted but not saved.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
