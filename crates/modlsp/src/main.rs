mod args;
mod cli;
mod commands;

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run(env::args().collect()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(source) = e.source() {
                eprintln!("Caused by: {source}");
            }
            ExitCode::FAILURE
        }
    }
}
