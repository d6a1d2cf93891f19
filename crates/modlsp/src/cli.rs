use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::commands::ModlspCommand;

/// The main CLI structure that defines the command-line interface
#[derive(Parser)]
#[command(name = "modlsp")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: ModlspCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments, install the log subscriber at the requested
/// verbosity, and dispatch to the chosen command. Logs go to a rolling file
/// under `logs/`, never to stdout -- stdio is the LSP transport once
/// `serve` starts.
pub fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let filter = match (cli.args.global.quiet, cli.args.global.verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::new("info"),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };

    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "modlsp.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(non_blocking)
        .init();

    cli.command.execute(&cli.args)
}
