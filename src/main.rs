//! Application entry point.
//!
//! Parses command-line arguments and filters standard input through the
//! requested command with [`runner::run_stdio_filter`].

use clap::Parser;
use pipepump::{PumpSession, cli::Cli, runner};
use std::{io, process::ExitCode};
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt().with_max_level(max_level).with_writer(io::stderr).init();
    let mut session = PumpSession::new(cli.command_line(), cli.environment(), cli.config());
    match runner::run_stdio_filter(&mut session, cli.buffer_size) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}
