//! Content-addressed backups of files about to be overwritten.
//!
//! Each snapshot is stored once per `(origin, digest)` pair as
//! `{file name}_{sha256}` inside the backup directory, next to an
//! `index.json` listing every [`BackupItem`]. Backing up unchanged content
//! again is a successful no-op.
//!
//! Several handles may share one directory, in this process or others. Every
//! mutation holds an exclusive lock on `index.lock` and re-reads the index
//! before rewriting it.

use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{atomic::write_atomic, error::Error, sync::CancelToken};

const INDEX_FILE: &str = "index.json";
const LOCK_FILE: &str = "index.lock";

/// One stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupItem {
    /// File name of the origin at backup time.
    pub file_name: String,
    /// Hex SHA-256 of the full file contents.
    pub hash: String,
    pub origin_path: PathBuf,
    pub backup_path: PathBuf,
    pub backup_time: DateTime<Utc>,
}

impl BackupItem {
    fn same_snapshot(&self, other: &BackupItem) -> bool {
        self.hash == other.hash && self.origin_path == other.origin_path
    }
}

/// Hex SHA-256 of `bytes`.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Absolute form of `path`, resolved through symlinks when the file exists.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

/// Exclusive hold on the index across processes, released on drop.
struct IndexLock {
    file: File,
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "failed to unlock backup index");
        }
    }
}

/// A directory of content-addressed snapshots plus their index.
///
/// Mutations are serialized by an in-process writer mutex and then by the
/// `index.lock` file lock. Reads refresh the cached index from disk.
#[derive(Debug)]
pub struct BackupStore {
    root: PathBuf,
    index: RwLock<Vec<BackupItem>>,
    writer: Mutex<()>,
}

impl BackupStore {
    /// Opens (or creates) the store rooted at `root`, loading its index.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let items = read_index(&root)?;
        debug!(root = %root.display(), "opened backup store");
        Ok(BackupStore {
            root,
            index: RwLock::new(items),
            writer: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock_index(&self) -> Result<IndexLock, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&file)?;
        Ok(IndexLock { file })
    }

    /// Current on-disk index. Callers hold the index lock.
    fn load_index(&self) -> Result<Vec<BackupItem>, Error> {
        let items = read_index(&self.root)?;
        *self.index.write() = items.clone();
        Ok(items)
    }

    fn persist_index(&self, items: Vec<BackupItem>) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(&items)?;
        // The index must follow a committed copy even if the caller cancels late.
        write_atomic(&self.root.join(INDEX_FILE), &json, &CancelToken::new())?;
        *self.index.write() = items;
        Ok(())
    }

    /// Picks up records written by other handles. The index file is only
    /// ever replaced by rename, so no lock is needed to read it.
    fn refresh(&self) {
        match read_index(&self.root) {
            Ok(items) => *self.index.write() = items,
            Err(e) => warn!(root = %self.root.display(), error = %e, "cannot reload backup index"),
        }
    }

    /// Snapshots the file at `path`.
    ///
    /// Returns the existing item when the same content from the same origin
    /// is already stored. A missing source is [`Error::NotFound`]; the
    /// original file is never modified.
    pub fn backup(&self, path: &Path, cancel: &CancelToken) -> Result<BackupItem, Error> {
        cancel.check()?;
        let origin_path = fs::canonicalize(path).map_err(|e| Error::from_io_at(e, path))?;
        let bytes = fs::read(&origin_path).map_err(|e| Error::from_io_at(e, path))?;
        let hash = digest_bytes(&bytes);

        let _writer = self.writer.lock();
        let _index_lock = self.lock_index()?;
        let mut items = self.load_index()?;
        let existing = items
            .iter()
            .find(|item| item.hash == hash && item.origin_path == origin_path)
            .cloned();
        if let Some(item) = existing {
            if item.backup_path.exists() {
                debug!(origin = %origin_path.display(), %hash, "content unchanged; reusing backup");
                return Ok(item);
            }
            warn!(backup = %item.backup_path.display(), "backup file missing; copying again");
        }

        let file_name = origin_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let backup_path = self.root.join(format!("{file_name}_{hash}"));
        write_atomic(&backup_path, &bytes, cancel)?;

        let item = BackupItem {
            file_name,
            hash,
            origin_path,
            backup_path,
            backup_time: Utc::now(),
        };
        items.retain(|other| !other.same_snapshot(&item));
        items.push(item.clone());
        self.persist_index(items)?;

        info!(
            origin = %item.origin_path.display(),
            backup = %item.backup_path.display(),
            "created backup"
        );
        Ok(item)
    }

    /// Copies the snapshot back over its origin.
    ///
    /// A vanished backup file is [`Error::NotFound`] so the caller can drop
    /// the stale item; a file whose bytes no longer match the recorded digest
    /// is [`Error::DigestMismatch`].
    pub fn restore(&self, item: &BackupItem, cancel: &CancelToken) -> Result<(), Error> {
        cancel.check()?;
        let bytes =
            fs::read(&item.backup_path).map_err(|e| Error::from_io_at(e, &item.backup_path))?;
        let actual = digest_bytes(&bytes);
        if actual != item.hash {
            return Err(Error::DigestMismatch {
                expected: item.hash.clone(),
                actual,
            });
        }
        write_atomic(&item.origin_path, &bytes, cancel)?;
        info!(
            origin = %item.origin_path.display(),
            hash = %item.hash,
            "restored backup"
        );
        Ok(())
    }

    /// Removes the snapshot and its index record. Deleting an item that is
    /// already gone succeeds.
    pub fn delete(&self, item: &BackupItem) -> Result<(), Error> {
        let _writer = self.writer.lock();
        let _index_lock = self.lock_index()?;
        let mut items = self.load_index()?;
        let before = items.len();
        items.retain(|other| !other.same_snapshot(item));

        // Two origins with the same name and content share one copy.
        let shared = items.iter().any(|other| other.backup_path == item.backup_path);
        if !shared {
            match fs::remove_file(&item.backup_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }

        if items.len() != before {
            self.persist_index(items)?;
            info!(backup = %item.backup_path.display(), "deleted backup");
        }
        Ok(())
    }

    /// Every stored item, oldest first.
    pub fn list(&self) -> Vec<BackupItem> {
        self.refresh();
        self.index.read().clone()
    }

    /// Items whose origin is `path`, newest first.
    pub fn items_for(&self, path: &Path) -> Vec<BackupItem> {
        let origin = resolve(path);
        self.refresh();
        let mut items: Vec<BackupItem> = self
            .index
            .read()
            .iter()
            .rev()
            .filter(|item| item.origin_path == origin)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.backup_time.cmp(&a.backup_time));
        items
    }

    pub fn latest_for(&self, path: &Path) -> Option<BackupItem> {
        self.items_for(path).into_iter().next()
    }

    /// Drops index records whose backup file no longer exists.
    pub fn prune_missing(&self) -> Result<Vec<BackupItem>, Error> {
        let _writer = self.writer.lock();
        let _index_lock = self.lock_index()?;
        let (kept, dropped): (Vec<BackupItem>, Vec<BackupItem>) = self
            .load_index()?
            .into_iter()
            .partition(|item| item.backup_path.exists());
        if !dropped.is_empty() {
            self.persist_index(kept)?;
            warn!(count = dropped.len(), "pruned backups with missing files");
        }
        Ok(dropped)
    }
}

fn read_index(root: &Path) -> Result<Vec<BackupItem>, Error> {
    match fs::read(root.join(INDEX_FILE)) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BackupStore, PathBuf) {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::open(dir.path().join("backups")).unwrap();
        let file = dir.path().join("strings.csv");
        fs::write(&file, b"v1").unwrap();
        (dir, store, file)
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_backup_names_copy_by_file_name_and_digest() {
        let (_dir, store, file) = setup();
        let item = store.backup(&file, &CancelToken::new()).unwrap();
        assert_eq!(item.file_name, "strings.csv");
        assert_eq!(
            item.backup_path.file_name().unwrap().to_string_lossy(),
            format!("strings.csv_{}", digest_bytes(b"v1"))
        );
        assert_eq!(fs::read(&item.backup_path).unwrap(), b"v1");
        assert_eq!(fs::read(&file).unwrap(), b"v1");
    }

    #[test]
    fn test_unchanged_content_is_deduplicated() {
        let (_dir, store, file) = setup();
        let first = store.backup(&file, &CancelToken::new()).unwrap();
        let second = store.backup(&file, &CancelToken::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let (dir, store, _file) = setup();
        let err = store
            .backup(&dir.path().join("nope.csv"), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_index_survives_reopen() {
        let (dir, store, file) = setup();
        let item = store.backup(&file, &CancelToken::new()).unwrap();
        drop(store);

        let reopened = BackupStore::open(dir.path().join("backups")).unwrap();
        assert_eq!(reopened.list(), vec![item]);
    }

    #[test]
    fn test_cancelled_backup_records_nothing() {
        let (_dir, store, file) = setup();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(store.backup(&file, &cancel).unwrap_err().is_cancelled());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_restore_detects_tampered_copy() {
        let (_dir, store, file) = setup();
        let item = store.backup(&file, &CancelToken::new()).unwrap();
        fs::write(&item.backup_path, b"tampered").unwrap();
        let err = store.restore(&item, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, Error::DigestMismatch { .. }));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store, file) = setup();
        let item = store.backup(&file, &CancelToken::new()).unwrap();
        store.delete(&item).unwrap();
        assert!(!item.backup_path.exists());
        assert!(store.list().is_empty());
        store.delete(&item).unwrap();
    }

    #[test]
    fn test_prune_missing() {
        let (_dir, store, file) = setup();
        let item = store.backup(&file, &CancelToken::new()).unwrap();
        fs::remove_file(&item.backup_path).unwrap();

        let dropped = store.prune_missing().unwrap();
        assert_eq!(dropped, vec![item]);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_two_handles_on_one_root_keep_each_others_records() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("backups");
        let first = BackupStore::open(&root).unwrap();
        let second = BackupStore::open(&root).unwrap();
        let one = dir.path().join("one.csv");
        let two = dir.path().join("two.csv");
        fs::write(&one, b"one").unwrap();
        fs::write(&two, b"two").unwrap();

        let item_one = first.backup(&one, &CancelToken::new()).unwrap();
        let item_two = second.backup(&two, &CancelToken::new()).unwrap();
        assert_eq!(first.list(), vec![item_one.clone(), item_two.clone()]);

        first.delete(&item_one).unwrap();
        assert_eq!(second.list(), vec![item_two.clone()]);

        let reopened = BackupStore::open(&root).unwrap();
        assert_eq!(reopened.list(), vec![item_two]);
        assert!(!item_one.backup_path.exists());
    }

    #[test]
    fn test_concurrent_handles_lose_no_records() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("backups");
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let root = root.clone();
                let file = dir.path().join(format!("file{i}.csv"));
                fs::write(&file, format!("content {i}")).unwrap();
                std::thread::spawn(move || {
                    let store = BackupStore::open(root).unwrap();
                    store.backup(&file, &CancelToken::new()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(BackupStore::open(&root).unwrap().list().len(), 4);
    }

    #[test]
    fn test_items_for_is_newest_first() {
        let (_dir, store, file) = setup();
        let first = store.backup(&file, &CancelToken::new()).unwrap();
        fs::write(&file, b"v2").unwrap();
        let second = store.backup(&file, &CancelToken::new()).unwrap();

        assert_eq!(store.items_for(&file), vec![second.clone(), first]);
        assert_eq!(store.latest_for(&file), Some(second));
    }
}
