//! Diagnostic output for the CLI.
//!
//! Library events go to stderr through `tracing-subscriber`; stdout stays
//! reserved for command output. `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `verbose` raises the default to `debug`.
pub fn init(verbose: bool) {
    let default = if verbose {
        "strtab=debug,strtab_cli=debug"
    } else {
        "strtab=info,strtab_cli=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}
