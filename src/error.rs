use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, searching or exporting icons.
#[derive(Error, Debug)]
pub enum LucideError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Failed to walk icon directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Icon not found: {0}")]
    IconNotFound(String),
    #[error("Icon set not found at {}", .0.display())]
    IconSetNotFound(PathBuf),
    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Errors raised while reading a package descriptor.
#[derive(Error, Debug)]
pub enum FormulaError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No `class <Name> < Formula` declaration found")]
    MissingClass,
    #[error("Formula {class} is missing `{field}`")]
    MissingField { class: String, field: &'static str },
    #[error("Failed to walk formula directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors raised by the fetch → verify → install sequence.
///
/// Every variant is fatal: nothing is written to the binary directory once one
/// of these has been returned.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Descriptor {name} has an unpopulated `{field}`; pass a concrete release first")]
    Unpopulated { name: String, field: &'static str },
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Binary `{target}` not found in archive {archive}")]
    BinaryNotInArchive { target: String, archive: String },
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),
    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
