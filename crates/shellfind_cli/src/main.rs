mod cli;

use std::process::ExitCode;

use anstream::eprintln;
use clap::Parser;
use clap::error::ErrorKind;
use crossterm::style::Stylize;
use eyre::Result;
use shellfind_log::get_log_level_max;
use tracing::metadata::LevelFilter;

use crate::cli::{
    EXIT_ERROR,
    EXIT_SNAPSHOT_UNAVAILABLE,
    EXIT_USAGE,
};

fn main() -> Result<ExitCode> {
    let parsed = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return Ok(match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            });
        },
    };

    let verbose = parsed.verbose > 0;

    match parsed.execute() {
        Ok(exit_code) => Ok(exit_code),
        Err(err) => {
            if verbose || get_log_level_max() > LevelFilter::INFO {
                eprintln!("{} {err:?}", "error:".bold().red());
            } else {
                eprintln!("{} {err}", "error:".bold().red());
            }

            Ok(ExitCode::from(
                match err.downcast_ref::<shellfind_util::Error>() {
                    Some(shellfind_util::Error::SnapshotUnavailable(_)) => EXIT_SNAPSHOT_UNAVAILABLE,
                    None => EXIT_ERROR,
                },
            ))
        },
    }
}
