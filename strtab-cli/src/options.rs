//! Argument helpers shared by the subcommands.

use std::{path::Path, sync::Arc};

use strtab::{BackupStore, FormatType, JobService, Language, LoadOptions, ServiceConfig};

use crate::config::CliConfig;

/// Uses the explicit format when given, else infers it from the extension.
pub fn resolve_format(path: &Path, explicit: Option<&str>) -> Result<FormatType, String> {
    match explicit {
        Some(name) => name.parse::<FormatType>().map_err(|e| e.to_string()),
        None => FormatType::from_path(path)
            .ok_or_else(|| format!("Cannot infer format from path: {}", path.display())),
    }
}

pub fn parse_language(lang: Option<&str>) -> Result<Language, String> {
    match lang {
        Some(tag) => tag.parse::<Language>().map_err(|e| e.to_string()),
        None => Ok(Language::default()),
    }
}

pub fn load_options(
    lang: Option<&str>,
    id_space: u32,
    ignore_id_space_check: bool,
) -> Result<LoadOptions, String> {
    Ok(LoadOptions::new()
        .with_language(parse_language(lang)?)
        .with_id_space(id_space)
        .with_ignore_id_space_check(ignore_id_space_check))
}

pub fn open_backups(config: &CliConfig) -> Result<BackupStore, String> {
    BackupStore::open(&config.backup_dir).map_err(|e| {
        format!(
            "Cannot open backup store {}: {}",
            config.backup_dir.display(),
            e
        )
    })
}

pub fn open_service(config: &CliConfig) -> Result<JobService, String> {
    let backups = open_backups(config)?;
    Ok(JobService::new(
        Arc::new(backups),
        ServiceConfig::default().with_id_space_width(config.id_space_width),
    ))
}
