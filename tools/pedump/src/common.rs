//! Various items that are common between [`Action`][a] parsing and execution.
//!
//! [a]: crate::cli::Action

use tracing_subscriber::filter::LevelFilter;

/// The most verbose diagnostics that are written to standard error.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum LogLevel {
    /// No diagnostics.
    Off,
    /// Only errors.
    Error,
    /// Errors and recoverable anomalies in the input.
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Header locations, table offsets and counts.
    Debug,
    /// Every decoded record.
    Trace,
}

impl LogLevel {
    /// Returns the textual representation of the [`LogLevel`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Returns the [`LevelFilter`] corresponding to the [`LogLevel`].
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

impl clap::ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        static LEVELS: &[LogLevel] = &[
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];

        LEVELS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}
