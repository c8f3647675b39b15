mod commands;
mod helpers;

use clap::Parser;
use decksweep_core::domain::SweepError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let sweep_error = error.as_sweep_error();
            eprintln!("{}", sweep_error.diagnostic_line());
            sweep_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.log_level.as_deref())?;
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
    name = "decksweep",
    version,
    about = "Parameter-sweep generator for reservoir simulation decks"
)]
struct Cli {
    /// Log filter, e.g. `debug` or `decksweep_core=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Materialize every case of a JSON sweep config
    Sweep(commands::SweepArgs),
    /// Write one case per value of an integer range, routing the value into a schedule include
    ScheduleCases(commands::ScheduleCasesArgs),
    /// Write TSTEP split variants for every `<prefix>_<NNN>` case folder
    Tstep(commands::TstepArgs),
    /// Write one schedule include per value of a rate ramp
    Ramp(commands::RampArgs),
    /// Sum solver iterations reported in a simulator print file
    Iterations(commands::IterationsArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Sweep(args) => commands::run_sweep_command(args),
        CliCommand::ScheduleCases(args) => commands::run_schedule_cases_command(args),
        CliCommand::Tstep(args) => commands::run_tstep_command(args),
        CliCommand::Ramp(args) => commands::run_ramp_command(args),
        CliCommand::Iterations(args) => commands::run_iterations_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Sweep(SweepError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SweepError> for CliError {
    fn from(error: SweepError) -> Self {
        Self::Sweep(error)
    }
}

impl CliError {
    fn as_sweep_error(&self) -> SweepError {
        match self {
            Self::Usage(message) => SweepError::configuration("CONFIG.CLI_USAGE", message.clone()),
            Self::Sweep(error) => error.clone(),
            Self::Internal(error) => SweepError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
