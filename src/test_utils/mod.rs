//! Test-only helpers shared across crate unit tests.
//!
//! This module is only compiled for unit tests.

pub mod console;
pub mod logging;
pub mod shared_buf;
