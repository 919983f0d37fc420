//! Implementations of the [`Action`][action]s.
//!
//! [action]: crate::cli::Action

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use pe::PeFile;

pub mod dump;
pub mod list;

#[cfg(test)]
mod fixture;

/// Opens the PE image or COFF object at `path`.
///
/// # Errors
///
/// Returns errors naming `path` if the file cannot be opened or its headers are malformed.
pub fn open(path: &Path) -> Result<PeFile<File>> {
    PeFile::open(path).with_context(|| path.display().to_string())
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::open;

    #[test]
    fn missing_file_is_reported_once() {
        let error = open(Path::new("/nonexistent/pedump/input.o")).unwrap_err();
        let message = format!("{error:#}");

        assert!(message.starts_with("/nonexistent/pedump/input.o: "));
        assert_eq!(message.matches("(os error").count(), 1, "{message}");
    }
}
