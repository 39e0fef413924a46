use std::path::Path;

use strtab::CancelToken;
use tracing::info;

use strtab_cli::{
    CliConfig,
    options::{load_options, open_service, resolve_format},
};

/// Options for the `convert` subcommand.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: String,
    pub output: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub lang: Option<String>,
    pub id_space: u32,
    pub ignore_id_space_check: bool,
}

pub fn run_convert_command(config: &CliConfig, opts: ConvertOptions) -> Result<(), String> {
    let input = Path::new(&opts.input);
    let output = Path::new(&opts.output);
    let input_format = resolve_format(input, opts.input_format.as_deref())?;
    let output_format = resolve_format(output, opts.output_format.as_deref())?;
    let load = load_options(opts.lang.as_deref(), opts.id_space, opts.ignore_id_space_check)?;

    let service = open_service(config)?;
    let snapshot = service
        .convert(
            input,
            input_format,
            output,
            output_format,
            &load,
            &CancelToken::new(),
        )
        .map_err(|e| format!("Conversion failed: {}", e))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        backed_up = snapshot.is_some(),
        "converted string table"
    );
    println!(
        "✅ Converted {} ({}) -> {} ({})",
        input.display(),
        input_format,
        output.display(),
        output_format
    );
    if let Some(item) = snapshot {
        println!("   Previous output backed up to {}", item.backup_path.display());
    }
    Ok(())
}
