//! Integration tests for prefetch-cursor.
//!
//! These tests drive a [`StreamingCursor`](pc_cursor::StreamingCursor) end to
//! end over sources with random latency and injected failures.
//!
//! ## Running Integration Tests
//!
//! ```bash
//! cargo test -p integration-tests
//! ```

mod common;
mod ordering_test;
mod reset_test;
