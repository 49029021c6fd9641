//! lockfile-mutex: run jobs under a cross-process lockfile mutex.
//!
//! This is the main entry point for the `lockfile-mutex` CLI. It parses
//! arguments, sets up logging, dispatches to the appropriate command handler,
//! and maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use lockfile_mutex::exit_codes;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: {}", e);
    }

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(exit_code_byte(code)),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(exit_code_byte(err.exit_code()))
        }
    }
}

/// Initialize the tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level follows `-v` (warn by default).
fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

fn exit_code_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(exit_codes::USER_ERROR as u8)
}
