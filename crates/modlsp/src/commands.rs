mod serve;

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::args::Args;

pub trait Command {
    fn execute(&self, args: &Args) -> Result<ExitCode>;
}

#[derive(Debug, Subcommand)]
pub enum ModlspCommand {
    /// Start the language server over stdio.
    Serve(self::serve::Serve),
}

impl ModlspCommand {
    pub fn execute(&self, args: &Args) -> Result<ExitCode> {
        match self {
            Self::Serve(serve) => serve.execute(args),
        }
    }
}
