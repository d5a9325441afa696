mod commands;
mod helpers;

use crate::logging::setup_logging;
use azr_core::domain::{AzrError, AzrErrorCategory};
use clap::Parser;
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let azr_error = error.as_azr_error();
            eprintln!("{}", azr_error.diagnostic_line());
            eprintln!("{}", azr_error.fatal_exit_line());
            azr_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("azr-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()).map_err(|source| {
                CliError::Compute(AzrError::io_system(
                    "IO.CLI_LOG_FILE",
                    format!("failed to open log file: {}", source),
                ))
            })?;
            dispatch_parsed(cli.command)
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

#[derive(Parser)]
#[command(
    name = "azr-rs",
    version,
    about = "R-matrix evaluations through the AZURE2 solver"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// List the sampled parameters with labels, addresses and document values
    Parameters(commands::InspectArgs),
    /// List data and extrapolation segments and the output files they imply
    Segments(commands::InspectArgs),
    /// Evaluate the model against the measured data segments
    Predict(commands::PredictArgs),
    /// Evaluate the model on the extrapolation segments
    Extrapolate(commands::ExtrapolateArgs),
    /// Report the reduced width amplitudes for a parameter vector
    Rwas(commands::EvaluateArgs),
    /// Compute external capture integrals, optionally on shifted data
    CaptureIntegrals(commands::CaptureArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Parameters(args) => commands::run_parameters_command(args),
        CliCommand::Segments(args) => commands::run_segments_command(args),
        CliCommand::Predict(args) => commands::run_predict_command(args),
        CliCommand::Extrapolate(args) => commands::run_extrapolate_command(args),
        CliCommand::Rwas(args) => commands::run_rwas_command(args),
        CliCommand::CaptureIntegrals(args) => commands::run_capture_integrals_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(AzrError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AzrError> for CliError {
    fn from(error: AzrError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_azr_error(&self) -> AzrError {
        match self {
            Self::Usage(message) => AzrError::new(
                AzrErrorCategory::DocumentFormat,
                "INPUT.CLI_USAGE",
                message.clone(),
            ),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => AzrError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
