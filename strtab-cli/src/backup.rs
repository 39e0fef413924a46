use std::path::Path;

use strtab::{BackupItem, BackupStore, CancelToken};

use strtab_cli::{CliConfig, options::open_backups};

/// Finds the item for `path` whose hash starts with `hash`, or the newest
/// one when no hash is given.
fn select_item(store: &BackupStore, path: &Path, hash: Option<&str>) -> Result<BackupItem, String> {
    let items = store.items_for(path);
    if items.is_empty() {
        return Err(format!("No backups recorded for {}", path.display()));
    }
    let Some(prefix) = hash else {
        return Ok(items[0].clone());
    };
    let prefix = prefix.to_ascii_lowercase();
    let matches: Vec<&BackupItem> = items.iter().filter(|i| i.hash.starts_with(&prefix)).collect();
    match matches.as_slice() {
        [] => Err(format!("No backup of {} with hash {}", path.display(), prefix)),
        [item] => Ok((*item).clone()),
        _ => Err(format!("Hash prefix {} is ambiguous; use more characters", prefix)),
    }
}

fn print_item(item: &BackupItem) {
    println!(
        "{}  {}  {}  {}",
        item.backup_time.format("%Y-%m-%d %H:%M:%S"),
        &item.hash[..item.hash.len().min(12)],
        item.origin_path.display(),
        item.backup_path.display()
    );
}

pub fn run_backup_create(config: &CliConfig, path: &str) -> Result<(), String> {
    let store = open_backups(config)?;
    let item = store
        .backup(Path::new(path), &CancelToken::new())
        .map_err(|e| format!("Backup failed: {}", e))?;
    println!("✅ Backed up {} as {}", path, item.backup_path.display());
    Ok(())
}

pub fn run_backup_list(config: &CliConfig, path: Option<&str>, json: bool) -> Result<(), String> {
    let store = open_backups(config)?;
    let items = match path {
        Some(path) => store.items_for(Path::new(path)),
        None => store.list(),
    };
    if json {
        let out = serde_json::to_string_pretty(&items).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }
    if items.is_empty() {
        println!("No backups");
        return Ok(());
    }
    for item in &items {
        print_item(item);
    }
    Ok(())
}

pub fn run_backup_restore(config: &CliConfig, path: &str, hash: Option<&str>) -> Result<(), String> {
    let store = open_backups(config)?;
    let item = select_item(&store, Path::new(path), hash)?;
    match store.restore(&item, &CancelToken::new()) {
        Ok(()) => {
            println!("✅ Restored {} from {}", path, item.backup_path.display());
            Ok(())
        }
        Err(e) if e.is_not_found() => Err(format!(
            "Backup file {} is missing; run `strtab backup prune` to drop it",
            item.backup_path.display()
        )),
        Err(e) => Err(format!("Restore failed: {}", e)),
    }
}

pub fn run_backup_delete(config: &CliConfig, path: &str, hash: &str) -> Result<(), String> {
    let store = open_backups(config)?;
    let item = select_item(&store, Path::new(path), Some(hash))?;
    store
        .delete(&item)
        .map_err(|e| format!("Delete failed: {}", e))?;
    println!("✅ Deleted backup {}", item.backup_path.display());
    Ok(())
}

pub fn run_backup_prune(config: &CliConfig) -> Result<(), String> {
    let store = open_backups(config)?;
    let dropped = store
        .prune_missing()
        .map_err(|e| format!("Prune failed: {}", e))?;
    println!("Pruned {} stale backup record(s)", dropped.len());
    Ok(())
}
