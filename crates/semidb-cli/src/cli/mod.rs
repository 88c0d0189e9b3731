mod commands;
mod render;

use clap::{ArgAction, Parser};
use semidb_core::common::ConfigError;
use semidb_core::domain::{DbError, ErrorCategory};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("semidb".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.global.verbose);
            commands::dispatch(cli.global, cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Logs go to stderr; stdout carries only query results.
fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A subscriber may already be installed when `run` is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "semidb",
    version,
    about = "Query semiconductor DFT convergence, equation-of-state and alloy data"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args)]
pub(crate) struct GlobalArgs {
    /// Database config (camelCase JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory relative dataset paths resolve against
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand)]
pub(crate) enum CliCommand {
    /// List materials with convergence data
    Materials,
    /// List structures computed for a material
    Structures {
        material: String,
    },
    /// List functionals computed for a material and structure
    Functionals {
        material: String,
        structure: String,
    },
    /// Show k-point and cutoff convergence series
    Convergence(commands::ConvergenceArgs),
    /// Query energy-volume points and Vinet fits
    #[command(subcommand)]
    Eos(commands::EosCommand),
    /// Query pseudo-binary alloy records and bowing fits
    #[command(subcommand)]
    Alloy(commands::AlloyCommand),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Query(#[from] DbError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Usage(_) => ErrorCategory::InputValidationError,
            Self::Query(error) => error.category(),
            Self::Config(ConfigError::Read { .. }) | Self::Internal(_) => {
                ErrorCategory::IoSystemError
            }
            Self::Config(_) => ErrorCategory::InputValidationError,
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            Self::Usage(_) => "INPUT.CLI_USAGE",
            Self::Query(error) => error.placeholder(),
            Self::Config(ConfigError::Read { .. }) => "IO.CONFIG_READ",
            Self::Config(_) => "INPUT.CONFIG",
            Self::Internal(_) => "IO.CLI",
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        match self {
            Self::Internal(error) => format!("ERROR: [{}] {error:#}", self.placeholder()),
            _ => format!("ERROR: [{}] {}", self.placeholder(), self),
        }
    }

    pub fn fatal_exit_line(&self) -> String {
        match self {
            Self::Query(error) => error.fatal_exit_line(),
            _ => format!("FATAL EXIT CODE: {}", self.exit_code()),
        }
    }
}
