use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the install pipeline.
/// Every module returns `Result<T, InstallerError>`.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download cancelled: {url}")]
    DownloadCancelled { url: String },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Package ─────────────────────────────────────────
    #[error("Installer package is missing required entry: {0}")]
    MissingPackageEntry(String),

    #[error("Install profile error: {0}")]
    Profile(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Processor ───────────────────────────────────────
    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    #[error("Processor error: {0}")]
    Processor(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
