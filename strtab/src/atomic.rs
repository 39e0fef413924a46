//! Write-then-rename file replacement.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{error::Error, sync::CancelToken};

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Replaces `path` with `bytes` so readers see either the old file or the new
/// one, never a mix.
///
/// The bytes go to a temporary file in the target directory, which is synced
/// and renamed over the target. `cancel` is checked right before the rename;
/// a cancelled write leaves the target untouched and removes the temporary.
pub fn write_atomic(path: &Path, bytes: &[u8], cancel: &CancelToken) -> Result<(), Error> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    cancel.check()?;
    temp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out.bin");

        write_atomic(&target, b"first", &CancelToken::new()).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first");

        write_atomic(&target, b"second", &CancelToken::new()).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn test_cancelled_write_leaves_target_and_no_temporaries() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.bin");
        fs::write(&target, b"original").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = write_atomic(&target, b"replacement", &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
