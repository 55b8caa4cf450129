//! Core traits for prefetch-cursor.
//!
//! This crate defines the collaborator seams the cursor depends on:
//! - [`IndexFetcher`] - Trait for index-addressed data sources
//! - [`ResetHook`] - Trait for callbacks run when a cursor is reset

pub mod fetcher;
pub mod reset;

pub use fetcher::*;
pub use reset::*;
