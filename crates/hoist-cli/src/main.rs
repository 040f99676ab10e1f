#![forbid(unsafe_code)]

mod cmd;
mod credentials;
mod jira;
mod output;

use clap::{Parser, Subcommand};
use hoist_core::error::ErrorCode;
use output::{CliError, OutputMode};
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hoist: bulk-create epics and stories in Jira from a catalog file",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Import",
        about = "Create every epic and story of a catalog",
        long_about = "Create each epic of the catalog in order, then its stories linked to it. \
                      A failed epic skips its stories; no failure stops the run.",
        after_help = "EXAMPLES:\n    # Import using ./hoist.toml\n    hoist import --catalog dashboard.toml\n\n    # Preview without credentials or network\n    hoist import --catalog dashboard.toml --dry-run\n\n    # Override the project and emit machine-readable output\n    hoist import --catalog dashboard.json --project CP --json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Import",
        about = "Check a catalog file",
        long_about = "Parse and validate a catalog file and print its counts and planned points.",
        after_help = "EXAMPLES:\n    # Validate a catalog\n    hoist validate --catalog dashboard.toml\n\n    # Emit machine-readable output\n    hoist validate --catalog dashboard.toml --json"
    )]
    Validate(cmd::validate::ValidateArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("HOIST_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "hoist=debug,info"
        } else {
            "hoist=warn"
        })
    });

    let format = env::var("HOIST_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Turn a fatal command error into what the operator sees.
fn describe_failure(err: &anyhow::Error) -> CliError {
    let code = cmd::error_code(err);
    let mut cli_error = CliError::new(format!("{err:#}"));
    if code == ErrorCode::MissingCredentials {
        cli_error = cli_error.with_suggestion(format!(
            "Set your Jira credentials first:\n{}",
            credentials::setup_instructions()
        ));
    }
    cli_error.with_code(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let project_root = match env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("error: cannot determine working directory: {err}");
            return ExitCode::FAILURE;
        }
    };
    debug!(root = %project_root.display(), ?output, "starting");

    let command_result = match &cli.command {
        Commands::Import(args) => cmd::import::run_import(args, output, &project_root),
        Commands::Validate(args) => cmd::validate::run_validate(args, output),
    };

    match command_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let failure = describe_failure(&err);
            debug!(code = ?failure.error_code, "command failed");
            if let Err(render_err) = output::render_error(output, &failure) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}
