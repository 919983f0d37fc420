//! Dumping of a single section given a [`DumpConfig`].

use std::{
    ffi::OsStr,
    io::{Read, Seek, Write},
};

use anyhow::{Result, bail};
use pe::PeFile;
use tracing::debug;

use crate::{action::open, cli::DumpConfig, render};

/// Dumps the section named by `config` to `out`.
///
/// # Errors
///
/// Returns errors when the file cannot be read, is malformed, does not contain the section, or
/// `out` fails.
pub fn dump<W: Write>(config: &DumpConfig, out: &mut W) -> Result<()> {
    let mut file = open(&config.path)?;
    dump_section(&mut file, &config.section, out)
}

/// Writes a hex dump of the raw contents of the first section of `file` named `name`, followed by
/// its relocations.
///
/// # Errors
///
/// Returns errors when no section is named `name`, the section's tables cannot be read, or `out`
/// fails.
pub fn dump_section<R: Read + Seek, W: Write>(
    file: &mut PeFile<R>,
    name: &OsStr,
    out: &mut W,
) -> Result<()> {
    let Some(section) = file.section(name.as_encoded_bytes()) else {
        bail!("could not find section {name:?}");
    };
    let header = *section.header();
    debug!(
        name = %section.name().escape_ascii(),
        size = header.size_of_raw_data,
        relocations = header.number_of_relocations,
        "dumping section"
    );

    let data = file.section_data(&header)?;
    render::hex_dump(out, &data)?;

    let relocations = file.relocations(&header)?;
    render::relocations(out, &relocations)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use std::ffi::OsStr;

    use pe::raw::Relocation;

    use super::dump_section;
    use crate::action::fixture::Fixture;

    fn dump(fixture: Fixture, name: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dump_section(&mut fixture.open(), OsStr::new(name), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn seventeen_bytes_take_two_rows() {
        let data: Vec<u8> = (0..17).collect();
        let output = dump(Fixture::object().section(b".rdata", &data, &[]), ".rdata").unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("00000000  00 01 02"));
        assert!(lines[1].starts_with("00000010  10 "));
        assert_eq!(&lines[2..], ["", "no relocations"]);
    }

    #[test]
    fn relocations_follow_data() {
        let relocations = [
            Relocation {
                virtual_address: 0x1,
                symbol_table_index: 7,
                relocation_type: 0x4,
            },
            Relocation {
                virtual_address: 0x10,
                symbol_table_index: 8,
                relocation_type: 0x4,
            },
        ];
        let output = dump(
            Fixture::object().section(b".text", &[0xE8, 0, 0, 0, 0, 0xC3], &relocations),
            ".text",
        )
        .unwrap();

        assert!(output.ends_with(
            "\nRelocations:\n\n\
             idx  type   address symtab_index\n\
             --- ----- --------- ------------\n  \
             0     4         1            7\n  \
             1     4        10            8\n"
        ));
    }

    #[test]
    fn empty_section_has_no_rows() {
        let output = dump(Fixture::object().section(b".bss", &[], &[]), ".bss").unwrap();
        assert_eq!(output, "\nno relocations\n");
    }

    #[test]
    fn first_duplicate_wins() {
        let output = dump(
            Fixture::object()
                .section(b".data", b"first", &[])
                .section(b".data", b"second", &[]),
            ".data",
        )
        .unwrap();

        assert!(output.contains("|first|"));
    }

    #[test]
    fn long_names_match_resolved_and_raw() {
        let fixture = || {
            Fixture::object()
                .section(b"/4", b"dwarf", &[])
                .symbol(crate::action::fixture::symbol(*b"x\0\0\0\0\0\0\0", 3, 0))
                .strings(b".debug_info\0")
        };

        assert!(dump(fixture(), ".debug_info").unwrap().contains("|dwarf|"));
        assert!(dump(fixture(), "/4").unwrap().contains("|dwarf|"));
    }

    #[test]
    fn missing_section() {
        let error = dump(Fixture::object().section(b".text", &[0xC3], &[]), ".data").unwrap_err();
        assert_eq!(error.to_string(), "could not find section \".data\"");
    }
}
