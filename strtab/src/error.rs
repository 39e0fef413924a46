//! All error types for the strtab crate.
//!
//! These are returned from every fallible operation: codec reads and writes,
//! job validation, backups, and the QA store.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("format error: {0}")]
    Format(String),

    #[error(
        "string id `{string_id}` is outside id space {id_space} ({}..{})",
        .range.0,
        .range.1
    )]
    IdSpaceViolation {
        string_id: String,
        id_space: u32,
        range: (u64, u64),
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),

    #[error("backup digest mismatch: expected {expected}, found {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new format error.
    pub fn format_error(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }

    /// True for a missing source file or a missing backup copy.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Maps an I/O error on `path` to [`Error::NotFound`] when the file is absent.
    pub(crate) fn from_io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.into())
        } else {
            Error::Io(err)
        }
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(value: calamine::XlsxError) -> Self {
        Error::Spreadsheet(value.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Error::Spreadsheet(value.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Error::Io(value.error)
    }
}
