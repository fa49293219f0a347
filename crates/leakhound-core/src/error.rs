//! Error taxonomy for the scanning pipeline.
//!
//! The variants map directly onto how the dispatcher answers the
//! platform: validation failures are 400 and never retried, upstream
//! failures are 500 so the platform redelivers, and scan skips never
//! surface to the caller at all — the affected file is skipped and the
//! surrounding commit continues.

use thiserror::Error;

/// A pipeline failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound request is malformed: bad signature, undecodable
    /// body. Answered with 400; the platform will not redeliver.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Startup configuration is unusable: pattern catalogue rejected,
    /// signing key invalid. Fatal before the server binds.
    #[error("configuration error: {0}")]
    Config(String),

    /// A platform API call failed. Answered with 500; the platform
    /// redelivers and redaction is idempotent, so a retry is safe.
    #[error(transparent)]
    Upstream(#[from] leakhound_github::ApiError),

    /// A file could not be scanned. Callers skip the file, log at warn,
    /// and continue with the rest of the commit.
    #[error(transparent)]
    Scan(#[from] ScanSkip),
}

impl Error {
    /// Whether this error only skips one file rather than failing the
    /// whole event.
    pub fn is_scan_skip(&self) -> bool {
        matches!(self, Self::Scan(_))
    }
}

/// Why a single file was skipped during a commit walk.
#[derive(Debug, Error)]
pub enum ScanSkip {
    /// Content exceeds the scanner's size limit.
    #[error(transparent)]
    TooLarge(#[from] leakhound_scanner::ScanError),

    /// The platform's base64 payload or the decoded bytes were not
    /// valid UTF-8 text.
    #[error("failed to decode {path} at {commit}: {reason}")]
    Decode {
        /// Path of the undecodable file.
        path: String,
        /// Commit the file was fetched at.
        commit: String,
        /// Human-readable decode failure.
        reason: String,
    },
}
