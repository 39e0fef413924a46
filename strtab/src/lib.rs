#![forbid(unsafe_code)]
//! String-table toolkit for a game's localization resources.
//!
//! Reads and writes one string table in three interchangeable formats (CSV,
//! an `.xlsx` spreadsheet and the game's enciphered binary container), keeps
//! a content-addressed backup of every file before it is overwritten, and
//! remembers acknowledged quality-assurance findings.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strtab::{BackupStore, CancelToken, FormatType, JobService, LoadOptions, ServiceConfig};
//!
//! let backups = Arc::new(BackupStore::open(".strtab/backups")?);
//! let service = JobService::new(backups, ServiceConfig::default());
//! let cancel = CancelToken::new();
//!
//! let mut job = service.deserialize(
//!     "strings.stbl",
//!     FormatType::Binary,
//!     &LoadOptions::default(),
//!     &cancel,
//! )?;
//! if let Some(record) = job.find_mut("500001") {
//!     record.set_text("Hello again");
//! }
//! service.serialize(job, &cancel)?;
//! # Ok::<(), strtab::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **CSV**: header `stringId,keyHex,keyName,text`, RFC 4180 quoting
//! - **Spreadsheet**: the same four columns on the first worksheet of an `.xlsx`
//! - **Binary**: `STBL` container with a per-language enciphered string pool
//!
//! Every write is validated (key hashes, id space), snapshotted into the
//! [`BackupStore`] and committed with write-then-rename.

pub mod atomic;
pub mod backup;
pub mod error;
pub mod formats;
pub mod hash;
pub mod language;
pub mod qa;
pub mod read_options;
pub mod service;
pub mod sync;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export most used types for easy consumption
pub use crate::{
    backup::{BackupItem, BackupStore},
    error::Error,
    formats::FormatType,
    language::Language,
    qa::{IssueType, QaEntry, QaKey, QualityAssuranceStore},
    read_options::{DEFAULT_ID_SPACE_WIDTH, LoadOptions, ServiceConfig},
    service::JobService,
    sync::CancelToken,
    types::{ResourceJob, StringRecord},
};
