mod backup;
mod convert;
mod edit;
mod logging;
mod qa;

use std::{
    io,
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use strtab::CancelToken;
use tracing::debug;
use strtab_cli::{
    CliConfig,
    options::{load_options, open_service, resolve_format},
    view::print_view,
};

use crate::{
    backup::{
        run_backup_create, run_backup_delete, run_backup_list, run_backup_prune,
        run_backup_restore,
    },
    convert::{ConvertOptions, run_convert_command},
    edit::{EditOptions, run_edit_command},
    qa::{run_qa_find, run_qa_list, run_qa_save},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./strtab.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View a string-table file.
    View {
        /// The input file to view
        #[arg(short, long)]
        input: String,

        /// Input format (csv, spreadsheet, binary); inferred from the extension by default
        #[arg(long)]
        format: Option<String>,

        /// Language for formats that do not record one
        #[arg(short, long)]
        lang: Option<String>,

        /// Id space for formats that do not record one
        #[arg(long, default_value_t = 0)]
        id_space: u32,

        /// Display full text without truncation
        #[arg(long)]
        full: bool,
    },

    /// Convert a string table between formats.
    Convert {
        /// The input file to process
        #[arg(short, long)]
        input: String,
        /// The output file to write the results to
        #[arg(short, long)]
        output: String,
        #[arg(long)]
        input_format: Option<String>,
        #[arg(long)]
        output_format: Option<String>,
        /// Language of the output (binary input carries its own)
        #[arg(short, long)]
        lang: Option<String>,
        #[arg(long, default_value_t = 0)]
        id_space: u32,
        /// Write even if string ids fall outside the id space
        #[arg(long)]
        ignore_id_space_check: bool,
    },

    /// Add, update or remove one record in place.
    Edit {
        #[arg(short, long)]
        input: String,
        #[arg(long)]
        format: Option<String>,
        #[arg(short, long)]
        lang: Option<String>,
        #[arg(long, default_value_t = 0)]
        id_space: u32,
        #[arg(long)]
        ignore_id_space_check: bool,
        /// String id of the record to change
        #[arg(short, long)]
        string_id: String,
        /// New text
        #[arg(short, long)]
        text: Option<String>,
        /// New key name
        #[arg(short, long)]
        key: Option<String>,
        /// Remove the record instead
        #[arg(long, conflicts_with_all = ["text", "key"])]
        remove: bool,
        /// Write to this file instead of the input
        #[arg(short, long)]
        output: Option<String>,
        /// Validate the change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage content-addressed backups.
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Remember acknowledged QA findings.
    Qa {
        #[command(subcommand)]
        command: QaCommands,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum BackupCommands {
    /// Snapshot a file now.
    Create { path: String },
    /// List backups, optionally only those of one file.
    List {
        path: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Restore a file from its newest backup, or the one matching --hash.
    Restore {
        path: String,
        #[arg(long)]
        hash: Option<String>,
    },
    /// Delete one backup of a file.
    Delete {
        path: String,
        #[arg(long)]
        hash: String,
    },
    /// Drop records whose backup file is gone.
    Prune,
}

#[derive(Subcommand, Debug)]
enum QaCommands {
    /// Check whether a finding was already acknowledged.
    Find {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        issue: String,
    },
    /// Acknowledge a finding.
    Save {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        issue: String,
        #[arg(long)]
        details: Option<String>,
    },
    /// List acknowledged findings, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
}

fn run_view_command(
    config: &CliConfig,
    input: &str,
    format: Option<&str>,
    lang: Option<&str>,
    id_space: u32,
    full: bool,
) -> Result<(), String> {
    let path = Path::new(input);
    let format = resolve_format(path, format)?;
    let options = load_options(lang, id_space, false)?;
    let job = open_service(config)?
        .deserialize(path, format, &options, &CancelToken::new())
        .map_err(|e| format!("Error reading {}: {}", input, e))?;
    print_view(&job, full);
    Ok(())
}

fn run(args: Args) -> Result<(), String> {
    if let Commands::Completions { shell } = &args.commands {
        let mut cmd = Args::command();
        generate(*shell, &mut cmd, "strtab", &mut io::stdout());
        return Ok(());
    }

    let config = CliConfig::load(args.config.as_deref())?;
    debug!(
        backup_dir = %config.backup_dir.display(),
        qa_database = %config.qa_database.display(),
        id_space_width = config.id_space_width,
        "loaded configuration"
    );
    debug!(command = ?args.commands, "running command");
    match args.commands {
        Commands::View {
            input,
            format,
            lang,
            id_space,
            full,
        } => run_view_command(
            &config,
            &input,
            format.as_deref(),
            lang.as_deref(),
            id_space,
            full,
        ),
        Commands::Convert {
            input,
            output,
            input_format,
            output_format,
            lang,
            id_space,
            ignore_id_space_check,
        } => run_convert_command(
            &config,
            ConvertOptions {
                input,
                output,
                input_format,
                output_format,
                lang,
                id_space,
                ignore_id_space_check,
            },
        ),
        Commands::Edit {
            input,
            format,
            lang,
            id_space,
            ignore_id_space_check,
            string_id,
            text,
            key,
            remove,
            output,
            dry_run,
        } => run_edit_command(
            &config,
            EditOptions {
                input,
                format,
                lang,
                id_space,
                ignore_id_space_check,
                string_id,
                text,
                key,
                output,
                remove,
                dry_run,
            },
        ),
        Commands::Backup { command } => match command {
            BackupCommands::Create { path } => run_backup_create(&config, &path),
            BackupCommands::List { path, json } => run_backup_list(&config, path.as_deref(), json),
            BackupCommands::Restore { path, hash } => {
                run_backup_restore(&config, &path, hash.as_deref())
            }
            BackupCommands::Delete { path, hash } => run_backup_delete(&config, &path, &hash),
            BackupCommands::Prune => run_backup_prune(&config),
        },
        Commands::Qa { command } => match command {
            QaCommands::Find {
                source,
                target,
                issue,
            } => run_qa_find(&config, &source, &target, &issue),
            QaCommands::Save {
                source,
                target,
                issue,
                details,
            } => run_qa_save(&config, &source, &target, &issue, details),
            QaCommands::List { json } => run_qa_list(&config, json),
        },
        Commands::Completions { .. } => Ok(()),
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
