//! Listing of the sections, alignments and symbols of a file given a [`ListConfig`].

use std::io::{Read, Seek, Write};

use anyhow::Result;
use pe::PeFile;
use tracing::debug;

use crate::{action::open, cli::ListConfig, render};

/// Lists the file named by `config` to `out`.
///
/// # Errors
///
/// Returns errors when the file cannot be read, is malformed, or `out` fails.
pub fn list<W: Write>(config: &ListConfig, out: &mut W) -> Result<()> {
    let mut file = open(&config.path)?;
    list_file(&mut file, config.strings, out)
}

/// Lists the sections, alignments and symbols of `file` to `out`, followed by the raw string
/// table if `strings` is set.
///
/// # Errors
///
/// Returns errors when a table of `file` cannot be read or `out` fails.
pub fn list_file<R: Read + Seek, W: Write>(
    file: &mut PeFile<R>,
    strings: bool,
    out: &mut W,
) -> Result<()> {
    debug!(kind = ?file.kind(), sections = file.sections().len(), "listing");

    render::sections(out, file.sections())?;
    render::alignments(out, file.optional_header())?;

    let symbols = file.symbols()?;
    render::symbols(out, &symbols)?;

    if strings {
        render::strings(out, file.string_table()?)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use pe::{
        PeError, StorageClass,
        raw::{OptionalHeader32, Record},
    };

    use super::list_file;
    use crate::action::fixture::{Fixture, symbol};

    fn list(fixture: Fixture, strings: bool) -> String {
        let mut out = Vec::new();
        list_file(&mut fixture.open(), strings, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn object_without_symbols() {
        let output = list(
            Fixture::object()
                .section(b".text", &[0x90; 4], &[])
                .section(b".data", &[], &[]),
            false,
        );

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "Sections:");
        assert!(lines[6].starts_with("  1 ") && lines[6].ends_with(" .text"));
        assert!(lines[6].contains("       4      "));
        assert!(lines[7].starts_with("  2 ") && lines[7].ends_with(" .data"));
        assert_eq!(
            lines[9],
            "no section or file alignment (no optional header present)"
        );
        assert_eq!(&lines[10..], ["", "no symbols"]);
    }

    #[test]
    fn image_alignments() {
        let optional_header = OptionalHeader32 {
            magic: 0x10B,
            section_alignment: 0x1000,
            file_alignment: 0x200,
            ..Default::default()
        };
        let output = list(
            Fixture::image(optional_header.to_bytes()).section(b".text", &[0xC3], &[]),
            false,
        );

        assert!(output.contains("\n\nsection alignment is 0x1000\nfile alignment is 0x200\n"));
    }

    #[test]
    fn symbol_rows_match_table() {
        let mut file_name = [0; 18];
        file_name[..11].copy_from_slice(b"hello.c\0\0\0\0");
        let output = list(
            Fixture::object()
                .section(b".text", &[0xC3], &[])
                .symbol(symbol(*b".file\0\0\0", StorageClass::FILE.0, 1))
                .aux(file_name)
                .symbol(symbol([0, 0, 0, 0, 4, 0, 0, 0], StorageClass::EXTERNAL.0, 0))
                .strings(b"hello\0"),
            false,
        );

        let symbols = output
            .split_once("----------------\n")
            .map(|(_, rows)| rows)
            .unwrap();
        let rows: Vec<&str> = symbols.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].ends_with(" 2e66696c65000000 .file"));
        assert_eq!(rows[1], "    hello.c");
        assert!(rows[2].starts_with("  2 "));
        assert!(rows[2].ends_with(" 0000000004000000 hello"));
    }

    #[test]
    fn strings_are_dumped_on_request() {
        let fixture = || {
            Fixture::object()
                .symbol(symbol([0, 0, 0, 0, 4, 0, 0, 0], StorageClass::EXTERNAL.0, 0))
                .strings(b"hello\0")
        };

        assert!(!list(fixture(), false).contains("Strings:"));
        assert!(list(fixture(), true).ends_with(
            "\nStrings:\n\n\
             00000000  0a 00 00 00 68 65 6c 6c  6f 00                    |....hello.|\n"
        ));
    }

    #[test]
    fn truncated_symbol_table_fails_after_sections() {
        let mut image = Fixture::object()
            .section(b".text", &[0xC3], &[])
            .symbol(symbol(*b"main\0\0\0\0", StorageClass::EXTERNAL.0, 0))
            .build();
        image.truncate(image.len() - 10);

        let mut file = pe::PeFile::new(std::io::Cursor::new(image)).unwrap();
        let mut out = Vec::new();
        let error = list_file(&mut file, false, &mut out).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<PeError>(),
            Some(PeError::MalformedTable { .. })
        ));
        assert!(String::from_utf8(out).unwrap().contains("Sections:"));
    }
}
