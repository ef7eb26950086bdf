//! Shared `logtest` logger for unit tests.
//!
//! `log::set_logger` may only succeed once per process, so every test that
//! captures log records must go through [`start_logger`].

use std::sync::Once;

use logtest::Logger;

static START: Once = Once::new();

/// Install the global test logger on first use and return a handle to it.
pub fn start_logger() -> Logger {
    let mut logger = None;
    START.call_once(|| logger = Some(Logger::start()));
    logger.unwrap_or(Logger)
}
