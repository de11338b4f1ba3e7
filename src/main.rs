use std::process::ExitCode;

use kubicorn::cli::{CliError, CommandRegistry, Dispatcher};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(usage)) => {
            eprintln!("{}", usage);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CliError> {
    let registry = CommandRegistry::new()?;
    Dispatcher::new(registry).execute()
}
