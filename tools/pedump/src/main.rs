//! Prints the sections, alignments and symbols of a PE image or COFF object, or dumps the
//! contents and relocations of one of its sections.

use std::{
    io::{self, BufWriter, Write},
    process::ExitCode,
};

use anyhow::{Context, Result};

use crate::{
    action::{dump::dump, list::list},
    cli::{Action, Arguments},
};

pub mod action;
pub mod cli;
pub mod common;
pub mod render;

fn main() -> ExitCode {
    let arguments = match cli::get_arguments() {
        Ok(arguments) => arguments,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(arguments.log_level.as_level_filter())
        .init();

    match run(arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}: {error:#}", cli::program_name());
            ExitCode::FAILURE
        }
    }
}

/// Carries out the parsed [`Action`], writing its output to standard output.
fn run(arguments: Arguments) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());

    let result = match arguments.action {
        Action::List(config) => list(&config, &mut out),
        Action::Dump(config) => dump(&config, &mut out),
    };

    // Output written before a failure is still flushed.
    let flushed = out.flush().context("error writing to standard output");
    result.and(flushed)
}
