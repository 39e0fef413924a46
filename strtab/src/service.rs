//! Loading and saving [`ResourceJob`]s.
//!
//! [`JobService`] picks the codec from the job's [`FormatType`], enforces the
//! pre-write checks and makes every overwrite recoverable: the old file is
//! snapshotted into the [`BackupStore`] and the new bytes are committed with a
//! write-then-rename, both under a lock held per target path.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    atomic::write_atomic,
    backup::{self, BackupItem, BackupStore},
    error::Error,
    formats::{BinaryFormat, CsvFormat, FormatType, SpreadsheetFormat},
    read_options::{LoadOptions, ServiceConfig},
    sync::{CancelToken, KeyedLocks},
    traits::Parser,
    types::{ResourceJob, StringRecord},
};

/// Decodes `bytes` as `format` into a job for `path`.
///
/// Binary files carry their own language and id space, which override
/// `options`; the other formats take both from `options`.
pub fn decode(
    bytes: &[u8],
    format: FormatType,
    path: impl Into<PathBuf>,
    options: &LoadOptions,
) -> Result<ResourceJob, Error> {
    let mut job = ResourceJob::new(path, format);
    job.apply_options(options);
    match format {
        FormatType::Csv => {
            job.items = Vec::<StringRecord>::from(CsvFormat::from_bytes(bytes)?);
        }
        FormatType::Spreadsheet => {
            job.items = Vec::<StringRecord>::from(SpreadsheetFormat::from_bytes(bytes)?);
        }
        FormatType::Binary => {
            let table = BinaryFormat::from_bytes(bytes)?;
            job.language = table.language;
            job.id_space = table.id_space;
            job.items = Vec::<StringRecord>::from(table);
        }
    }
    Ok(job)
}

/// Encodes `job` in its own format. Binary output is enciphered for
/// `job.language`.
pub fn encode(job: &ResourceJob) -> Result<Vec<u8>, Error> {
    match job.format {
        FormatType::Csv => CsvFormat::from(job).to_bytes(),
        FormatType::Spreadsheet => SpreadsheetFormat::from(job).to_bytes(),
        FormatType::Binary => BinaryFormat::try_from(job)?.to_bytes(),
    }
}

/// Reads and writes string tables on behalf of a caller.
///
/// Cheap to share between threads; concurrent saves to different paths run
/// in parallel, saves to the same path queue up.
#[derive(Debug)]
pub struct JobService {
    backups: Arc<BackupStore>,
    locks: KeyedLocks<PathBuf>,
    config: ServiceConfig,
}

impl JobService {
    pub fn new(backups: Arc<BackupStore>, config: ServiceConfig) -> Self {
        JobService {
            backups,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Loads the file at `path` as `format`.
    ///
    /// Records come back in file order. A missing file is
    /// [`Error::NotFound`]; content the codec cannot parse is
    /// [`Error::Format`].
    pub fn deserialize(
        &self,
        path: impl AsRef<Path>,
        format: FormatType,
        options: &LoadOptions,
        cancel: &CancelToken,
    ) -> Result<ResourceJob, Error> {
        let path = path.as_ref();
        cancel.check()?;
        let bytes = fs::read(path).map_err(|e| Error::from_io_at(e, path))?;
        cancel.check()?;

        let job = decode(&bytes, format, path, options)?;
        debug!(
            path = %path.display(),
            %format,
            language = %job.language,
            records = job.items.len(),
            "loaded string table"
        );
        Ok(job)
    }

    /// Writes `job` back to `job.path`.
    ///
    /// The job must pass [`ResourceJob::validate`]. When the target already
    /// exists it is backed up first; the returned item is that snapshot.
    /// On cancellation or any error the target keeps its previous bytes.
    pub fn serialize(
        &self,
        job: ResourceJob,
        cancel: &CancelToken,
    ) -> Result<Option<BackupItem>, Error> {
        job.validate(self.config.id_space_width)?;
        cancel.check()?;
        let bytes = encode(&job)?;

        let target = backup::resolve(&job.path);
        self.locks.with_lock(&target, || {
            cancel.check()?;
            let snapshot = if target.exists() {
                Some(self.backups.backup(&target, cancel)?)
            } else {
                None
            };
            write_atomic(&target, &bytes, cancel)?;
            info!(
                path = %target.display(),
                format = %job.format,
                language = %job.language,
                records = job.items.len(),
                "saved string table"
            );
            Ok(snapshot)
        })
    }

    /// Loads `input` as `input_format` and saves it to `output` as
    /// `output_format`.
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        input_format: FormatType,
        output: impl Into<PathBuf>,
        output_format: FormatType,
        options: &LoadOptions,
        cancel: &CancelToken,
    ) -> Result<Option<BackupItem>, Error> {
        let mut job = self.deserialize(input, input_format, options, cancel)?;
        job.path = output.into();
        job.format = output_format;
        self.serialize(job, cancel)
    }
}
