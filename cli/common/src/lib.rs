//! Shared utilities for prefetch-cursor CLI binaries.
//!
//! This crate provides log level selection, logging setup and number
//! formatting for the `pc-drain` binary.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_number, format_rate};
pub use logging::init_logging;
