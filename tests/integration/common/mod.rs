//! Common utilities for integration tests.
//!
//! This module provides latency-simulating fetchers that record how many
//! fetches ran at once.

pub mod source;

pub use source::{DelayedFetcher, drain};
