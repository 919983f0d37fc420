//! Command line parsing and [`Action`] construction.

use core::fmt;
use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use clap::{Arg, ArgAction, ArgMatches, Command, builder::EnumValueParser, value_parser};

use crate::common::LogLevel;

/// The action to carry out.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Action {
    /// List the sections, alignments and symbols of a file.
    List(ListConfig),
    /// Dump the contents and relocations of a single section.
    Dump(DumpConfig),
}

/// Description of an [`Action::List`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ListConfig {
    /// The file to inspect.
    pub path: PathBuf,
    /// Whether the raw string table should be dumped after the symbols.
    pub strings: bool,
}

/// Description of an [`Action::Dump`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DumpConfig {
    /// The file to inspect.
    pub path: PathBuf,
    /// The name of the section to dump.
    pub section: OsString,
}

/// Everything parsed from the command line.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Arguments {
    /// The most verbose diagnostics to emit.
    pub log_level: LogLevel,
    /// The [`Action`] to carry out.
    pub action: Action,
}

/// The positional arguments did not name a file and at most one section.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct UsageError {
    /// The name the program was invoked as.
    pub program: String,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Usage is: {} <exe-name> [<section-name>]", self.program)
    }
}

impl core::error::Error for UsageError {}

/// Parses `pedump`'s arguments to construct an [`Action`].
///
/// `--help`, `--version` and malformed options are reported by [`clap`], which exits the process.
///
/// # Errors
///
/// Returns a [`UsageError`] if the number of positional arguments is wrong.
pub fn get_arguments() -> Result<Arguments, UsageError> {
    parse_arguments(&program_name(), &command_parser().get_matches())
}

/// Returns the name `pedump` was invoked as, without any leading directories.
pub fn program_name() -> String {
    env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map_or_else(
            || String::from("pedump"),
            |name| name.to_string_lossy().into_owned(),
        )
}

/// Constructs [`Arguments`] from `matches`.
///
/// # Errors
///
/// Returns a [`UsageError`] naming `program` if the number of positional arguments is wrong.
pub fn parse_arguments(program: &str, matches: &ArgMatches) -> Result<Arguments, UsageError> {
    let log_level = matches
        .get_one::<LogLevel>("log-level")
        .copied()
        .unwrap_or_else(|| unreachable!("`log-level` should have a default value"));
    let strings = matches.get_flag("strings");

    let mut positionals = matches
        .get_many::<OsString>("positionals")
        .into_iter()
        .flatten()
        .cloned();
    let action = match (positionals.next(), positionals.next(), positionals.next()) {
        (Some(path), None, None) => Action::List(ListConfig {
            path: PathBuf::from(path),
            strings,
        }),
        (Some(path), Some(section), None) => Action::Dump(DumpConfig {
            path: PathBuf::from(path),
            section,
        }),
        _ => {
            return Err(UsageError {
                program: program.to_owned(),
            });
        }
    };

    Ok(Arguments { log_level, action })
}

/// Returns the command parser for all [`Action`]s.
pub fn command_parser() -> Command {
    let positionals = Arg::new("positionals")
        .value_name("ARGS")
        .help("The file to inspect, optionally followed by the section to dump")
        .num_args(0..)
        .value_parser(value_parser!(OsString));

    let log_level = Arg::new("log-level")
        .long("log-level")
        .env("PEDUMP_LOG")
        .help("The most verbose diagnostics written to standard error")
        .value_parser(EnumValueParser::<LogLevel>::new())
        .default_value("warn");

    let strings = Arg::new("strings")
        .long("strings")
        .help("Dump the raw string table after the symbols")
        .action(ArgAction::SetTrue);

    Command::new("pedump")
        .about("Prints the sections and symbols of PE images and COFF objects")
        .version(env!("CARGO_PKG_VERSION"))
        .override_usage("pedump <exe-name> [<section-name>]")
        .arg(positionals)
        .arg(log_level)
        .arg(strings)
}
