mod commands;

use clap::Parser;

/// Entry point for the installed binary: parse `std::env::args`, run, map
/// failures to a diagnostic line and a nonzero exit code.
pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    }
}

/// Run the CLI against an explicit argument list. Integration tests drive
/// this directly instead of spawning the binary.
pub fn run<I, S>(args: I) -> anyhow::Result<i32>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args: Vec<String> = std::iter::once("duvet".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch(cli.command),
        Err(error) => match error.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{error}");
                Ok(0)
            }
            _ => Err(anyhow::anyhow!(error.to_string())),
        },
    }
}

fn dispatch(command: CliCommand) -> anyhow::Result<i32> {
    match command {
        CliCommand::Spectrum(args) => commands::run_spectrum(args),
        CliCommand::Deposition(args) => commands::run_deposition(args),
    }
}

#[derive(Parser)]
#[command(
    name = "duvet",
    about = "UV-VIS spectrum averaging, peak fitting and deposition-rate analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Average background/sample scans into a spectrum, optionally fit
    /// peaks, and export the result
    Spectrum(commands::SpectrumArgs),
    /// Fit a deposition time scan and export its parameter table
    Deposition(commands::DepositionArgs),
}
