use std::path::Path;

use strtab::{CancelToken, StringRecord};
use tracing::debug;

use strtab_cli::{
    CliConfig,
    options::{load_options, open_service, resolve_format},
};

/// Options for the `edit` subcommand.
#[derive(Debug, Clone)]
pub struct EditOptions {
    pub input: String,
    pub format: Option<String>,
    pub lang: Option<String>,
    pub id_space: u32,
    pub ignore_id_space_check: bool,
    pub string_id: String,
    /// New text; required when the record does not exist yet.
    pub text: Option<String>,
    /// Renames the record's key (and recomputes its keyHex).
    pub key: Option<String>,
    /// Write to another path instead of the input.
    pub output: Option<String>,
    pub remove: bool,
    pub dry_run: bool,
}

pub fn run_edit_command(config: &CliConfig, opts: EditOptions) -> Result<(), String> {
    let input = Path::new(&opts.input);
    let format = resolve_format(input, opts.format.as_deref())?;
    let load = load_options(opts.lang.as_deref(), opts.id_space, opts.ignore_id_space_check)?;
    let service = open_service(config)?;
    let cancel = CancelToken::new();

    let mut job = service
        .deserialize(input, format, &load, &cancel)
        .map_err(|e| format!("Error reading {}: {}", input.display(), e))?;

    let action = if opts.remove {
        let before = job.items.len();
        job.items.retain(|r| r.string_id != opts.string_id);
        if job.items.len() == before {
            return Err(format!("String id '{}' not found", opts.string_id));
        }
        "Removed"
    } else if let Some(record) = job.find_mut(&opts.string_id) {
        if let Some(text) = &opts.text {
            record.set_text(text.clone());
        }
        if let Some(key) = &opts.key {
            record.rename_key(key.clone());
        }
        "Updated"
    } else {
        let text = opts
            .text
            .clone()
            .ok_or_else(|| format!("String id '{}' not found; pass --text to add it", opts.string_id))?;
        let key = opts.key.clone().unwrap_or_else(|| opts.string_id.clone());
        job.push(StringRecord::new(opts.string_id.clone(), key, text));
        "Added"
    };

    debug!(action, string_id = %opts.string_id, "applied edit");

    if let Some(output) = &opts.output {
        let output = Path::new(output);
        job.format = resolve_format(output, None).unwrap_or(format);
        job.path = output.to_path_buf();
    }

    if opts.dry_run {
        job.validate(service.config().id_space_width)
            .map_err(|e| format!("Validation failed: {}", e))?;
        println!(
            "Dry run: {} '{}' ({} record(s) modified); nothing written",
            action.to_lowercase(),
            opts.string_id,
            job.modified_count()
        );
        return Ok(());
    }

    let target = job.path.clone();
    service
        .serialize(job, &cancel)
        .map_err(|e| format!("Error writing {}: {}", target.display(), e))?;
    println!("✅ {} '{}' in {}", action, opts.string_id, target.display());
    Ok(())
}
