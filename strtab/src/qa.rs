//! Remembered quality-assurance findings.
//!
//! A finding is identified by its `(source text, target text, issue type)`
//! triple, independent of the file it was raised on. Saving the same triple
//! again updates the stored details instead of adding a row, so a warning the
//! user already acknowledged can be suppressed everywhere.

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Error,
    sync::{CancelToken, KeyedLocks},
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS qa_entries (
    source_text TEXT NOT NULL,
    target_text TEXT NOT NULL,
    issue_type  TEXT NOT NULL,
    details     TEXT,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (source_text, target_text, issue_type)
);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Kind of translation problem a finding reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    SameAsSource,
    Untranslated,
    PlaceholderMismatch,
    Inconsistent,
    LengthExceeded,
    Other(String),
}

impl IssueType {
    /// Stable code stored in the database.
    pub fn code(&self) -> &str {
        match self {
            IssueType::SameAsSource => "SAME_AS_SOURCE",
            IssueType::Untranslated => "UNTRANSLATED",
            IssueType::PlaceholderMismatch => "PLACEHOLDER_MISMATCH",
            IssueType::Inconsistent => "INCONSISTENT",
            IssueType::LengthExceeded => "LENGTH_EXCEEDED",
            IssueType::Other(code) => code,
        }
    }

    /// A custom issue kind. Codes naming a built-in kind (in any spelling
    /// [`FromStr`] accepts) resolve to that kind, so one code never maps to
    /// two values.
    pub fn other(code: impl Into<String>) -> Self {
        IssueType::Other(code.into()).canonical()
    }

    /// Replaces an `Other` whose code names a built-in kind with that kind.
    pub fn canonical(self) -> Self {
        match self {
            IssueType::Other(code) => match code.parse::<IssueType>() {
                Ok(IssueType::Other(_)) | Err(_) => IssueType::Other(code),
                Ok(known) => known,
            },
            known => known,
        }
    }
}

impl Display for IssueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Known codes parse case-insensitively (`-` and `_` interchangeable); any
/// other non-empty code becomes [`IssueType::Other`].
impl FromStr for IssueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.to_ascii_uppercase().replace('-', "_");
        let issue = match normalized.as_str() {
            "" => return Err(Error::format_error("empty issue type")),
            "SAME_AS_SOURCE" => IssueType::SameAsSource,
            "UNTRANSLATED" => IssueType::Untranslated,
            "PLACEHOLDER_MISMATCH" => IssueType::PlaceholderMismatch,
            "INCONSISTENT" => IssueType::Inconsistent,
            "LENGTH_EXCEEDED" => IssueType::LengthExceeded,
            _ => IssueType::Other(trimmed.to_string()),
        };
        Ok(issue)
    }
}

/// Lookup key of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QaKey {
    pub source_text: String,
    pub target_text: String,
    pub issue_type: IssueType,
}

impl QaKey {
    pub fn new(
        source_text: impl Into<String>,
        target_text: impl Into<String>,
        issue_type: IssueType,
    ) -> Self {
        QaKey {
            source_text: source_text.into(),
            target_text: target_text.into(),
            issue_type: issue_type.canonical(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    pub source_text: String,
    pub target_text: String,
    pub issue_type: IssueType,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QaEntry {
    /// A new finding stamped with the current time.
    pub fn new(
        source_text: impl Into<String>,
        target_text: impl Into<String>,
        issue_type: IssueType,
    ) -> Self {
        QaEntry {
            source_text: source_text.into(),
            target_text: target_text.into(),
            issue_type: issue_type.canonical(),
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn key(&self) -> QaKey {
        QaKey::new(
            self.source_text.clone(),
            self.target_text.clone(),
            self.issue_type.clone(),
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let issue: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(QaEntry {
            source_text: row.get(0)?,
            target_text: row.get(1)?,
            issue_type: issue.parse().unwrap_or(IssueType::Other(issue)),
            details: row.get(3)?,
            created_at,
        })
    }
}

/// SQLite-backed store of acknowledged findings.
///
/// Each call opens its own connection in WAL mode, so readers run alongside
/// a writer and SQLite serializes writers across processes. Writers to the
/// same triple are additionally serialized in-process.
#[derive(Debug)]
pub struct QualityAssuranceStore {
    db_path: PathBuf,
    locks: KeyedLocks<QaKey>,
}

impl QualityAssuranceStore {
    /// Opens the store at `db_path`, creating the database and schema if needed.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let store = QualityAssuranceStore {
            db_path: db_path.into(),
            locks: KeyedLocks::new(),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, Error> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Creates the schema if missing. Safe to call any number of times.
    pub fn initialize(&self) -> Result<(), Error> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        debug!(db = %self.db_path.display(), "initialized QA store");
        Ok(())
    }

    /// Exact lookup on the triple.
    pub fn find(&self, key: &QaKey, cancel: &CancelToken) -> Result<Option<QaEntry>, Error> {
        cancel.check()?;
        let issue = key.issue_type.clone().canonical();
        let conn = self.connect()?;
        let entry = conn
            .query_row(
                "SELECT source_text, target_text, issue_type, details, created_at
                 FROM qa_entries
                 WHERE source_text = ?1 AND target_text = ?2 AND issue_type = ?3",
                params![key.source_text, key.target_text, issue.code()],
                QaEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Inserts the entry, or overwrites `details` and `created_at` of the
    /// entry with the same triple.
    pub fn save(&self, entry: &QaEntry, cancel: &CancelToken) -> Result<(), Error> {
        let key = entry.key();
        self.locks.with_lock(&key, || {
            cancel.check()?;
            let conn = self.connect()?;
            conn.execute(
                "INSERT INTO qa_entries (source_text, target_text, issue_type, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (source_text, target_text, issue_type)
                 DO UPDATE SET details = excluded.details, created_at = excluded.created_at",
                params![
                    entry.source_text,
                    entry.target_text,
                    key.issue_type.code(),
                    entry.details,
                    entry.created_at.to_rfc3339(),
                ],
            )?;
            debug!(issue = %key.issue_type, "saved QA finding");
            Ok(())
        })
    }

    /// Forgets a finding. Returns whether one was stored.
    pub fn remove(&self, key: &QaKey, cancel: &CancelToken) -> Result<bool, Error> {
        let key = QaKey::new(
            key.source_text.clone(),
            key.target_text.clone(),
            key.issue_type.clone(),
        );
        self.locks.with_lock(&key, || {
            cancel.check()?;
            let conn = self.connect()?;
            let removed = conn.execute(
                "DELETE FROM qa_entries
                 WHERE source_text = ?1 AND target_text = ?2 AND issue_type = ?3",
                params![key.source_text, key.target_text, key.issue_type.code()],
            )?;
            Ok(removed > 0)
        })
    }

    /// Every stored finding, newest first.
    pub fn list(&self) -> Result<Vec<QaEntry>, Error> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT source_text, target_text, issue_type, details, created_at
             FROM qa_entries
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let entries = stmt
            .query_map([], QaEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<usize, Error> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM qa_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
