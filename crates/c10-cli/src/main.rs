use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = c10_cli::Cli::parse();
    match c10_cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(error.exit_code())
        }
    }
}
