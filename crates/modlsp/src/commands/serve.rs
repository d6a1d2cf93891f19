use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::Command;

#[derive(Debug, Parser)]
pub struct Serve;

impl Command for Serve {
    fn execute(&self, _args: &Args) -> Result<ExitCode> {
        modlsp_session::run()?;
        Ok(ExitCode::SUCCESS)
    }
}
