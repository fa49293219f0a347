//! Core pipeline for leakhound.
//!
//! This crate wires the scanning pipeline together, one module per
//! stage:
//! - [`cache`] - Per-process memoization of file contents by
//!   `(commit, path)`, minimizing platform API calls
//! - [`walker`] - Walks a chronological commit list, scans changed
//!   files, tracks resolved findings, and deduplicates across commits
//! - [`scan`] - Maps each inbound event variant to the text or commits
//!   it introduces
//! - [`rectify`] - Redacts editable surfaces, opens tracking issues for
//!   pushes, and completes CI check runs
//! - [`error`] - The error taxonomy shared by the pipeline
//!
//! The dispatcher in `leakhound-server` drives one pass of
//! scan-then-rectify per inbound event; everything here is stateless
//! between events except the injected [`cache::FileCache`].

pub mod cache;
pub mod error;
pub mod rectify;
pub mod scan;
pub mod walker;

pub use cache::FileCache;
pub use error::{Error, ScanSkip};
pub use rectify::{CheckSuiteRunner, Rectifier, redact_matches};
pub use scan::PayloadScanner;
pub use walker::CommitWalker;

#[cfg(test)]
mod testing;
