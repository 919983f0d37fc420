//! Formatting of decoded tables as the text written to standard output.
//!
//! Every function writes complete lines, including their terminating newline. Names are written
//! as raw bytes.

use std::io::{self, Write};

use pe::{
    OptionalHeader, SectionTable, StringTable, SymbolRecord,
    raw::Relocation,
    symbol::AuxiliaryRecord,
};

/// The number of bytes shown on each row of a hex dump.
const BYTES_PER_ROW: usize = 16;

/// Writes the section table preceded by its heading.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn sections<W: Write>(out: &mut W, sections: &SectionTable) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Sections:")?;
    writeln!(out)?;
    writeln!(out, "idx virtual virtual    disk    disk   reloc  reloc     mask")?;
    writeln!(out, "    address    size  offset    size  offset    qty         ")?;
    writeln!(out, "--- ------- ------- ------- ------- ------- ------ --------")?;

    for (index, section) in sections.iter().enumerate() {
        let header = section.header();
        write!(
            out,
            "{:3} {:7x} {:7x} {:7x} {:7x} {:7x} {:6} {:x} ",
            index + 1,
            header.virtual_address,
            header.virtual_size,
            header.pointer_to_raw_data,
            header.size_of_raw_data,
            header.pointer_to_relocations,
            header.number_of_relocations,
            header.characteristics,
        )?;
        out.write_all(section.name())?;
        writeln!(out)?;
    }

    Ok(())
}

/// Writes the section and file alignment of the optional header.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn alignments<W: Write>(out: &mut W, optional_header: &OptionalHeader) -> io::Result<()> {
    writeln!(out)?;

    match (
        optional_header.section_alignment(),
        optional_header.file_alignment(),
    ) {
        (Some(section_alignment), Some(file_alignment)) => {
            writeln!(out, "section alignment is {section_alignment:#x}")?;
            writeln!(out, "file alignment is {file_alignment:#x}")
        }
        _ => writeln!(
            out,
            "no section or file alignment (no optional header present)"
        ),
    }
}

/// Writes one row per slot of the symbol table preceded by its heading.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn symbols<W: Write>(out: &mut W, records: &[SymbolRecord]) -> io::Result<()> {
    writeln!(out)?;
    if records.is_empty() {
        return writeln!(out, "no symbols");
    }

    writeln!(out, "Symbols:")?;
    writeln!(out)?;
    writeln!(out, "idx  type section     value  class   aux name")?;
    writeln!(out, "--- ----- ------- --------- ------ ----- ----------------")?;

    for record in records {
        match record {
            SymbolRecord::Primary(symbol) => {
                write!(
                    out,
                    "{:3} {:5} {:7} {:9x} {:6} {:5} ",
                    symbol.index(),
                    symbol.symbol_type(),
                    symbol.section_number(),
                    symbol.value(),
                    symbol.storage_class().0,
                    symbol.number_of_aux_symbols(),
                )?;
                write_hex(out, &symbol.raw_name())?;
                write!(out, " ")?;
                out.write_all(symbol.name())?;
                writeln!(out)?;
            }
            SymbolRecord::Auxiliary(record) => auxiliary(out, record)?,
        }
    }

    Ok(())
}

/// Writes an auxiliary record as text if it names a file, or as hex otherwise.
fn auxiliary<W: Write>(out: &mut W, record: &AuxiliaryRecord) -> io::Result<()> {
    write!(out, "    ")?;
    match record.file_name() {
        Some(name) => out.write_all(name)?,
        None => write_hex(out, record.bytes())?,
    }
    writeln!(out)
}

/// Writes the relocations of a section preceded by their heading.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn relocations<W: Write>(out: &mut W, relocations: &[Relocation]) -> io::Result<()> {
    writeln!(out)?;
    if relocations.is_empty() {
        return writeln!(out, "no relocations");
    }

    writeln!(out, "Relocations:")?;
    writeln!(out)?;
    writeln!(out, "idx  type   address symtab_index")?;
    writeln!(out, "--- ----- --------- ------------")?;

    for (index, relocation) in relocations.iter().enumerate() {
        writeln!(
            out,
            "{:3} {:5x} {:9x} {:12}",
            index,
            relocation.relocation_type,
            relocation.virtual_address,
            relocation.symbol_table_index,
        )?;
    }

    Ok(())
}

/// Writes the raw string table, length field included, preceded by its heading.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn strings<W: Write>(out: &mut W, strings: &StringTable) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Strings:")?;
    writeln!(out)?;
    hex_dump(out, strings.as_bytes())
}

/// Writes `data` as a canonical hex dump of 16 bytes per row.
///
/// # Errors
///
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn hex_dump<W: Write>(out: &mut W, data: &[u8]) -> io::Result<()> {
    for (row, bytes) in data.chunks(BYTES_PER_ROW).enumerate() {
        write!(out, "{:08x}  ", row * BYTES_PER_ROW)?;

        for slot in 0..BYTES_PER_ROW {
            match bytes.get(slot) {
                Some(byte) => write!(out, "{byte:02x} ")?,
                None => write!(out, "   ")?,
            }
            if slot == BYTES_PER_ROW / 2 - 1 {
                write!(out, " ")?;
            }
        }

        write!(out, " |")?;
        for &byte in bytes {
            let shown = if (0x20..=0x7E).contains(&byte) {
                byte
            } else {
                b'.'
            };
            out.write_all(&[shown])?;
        }
        writeln!(out, "|")?;
    }

    Ok(())
}

/// Writes `bytes` as lowercase hex without separators.
fn write_hex<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    bytes.iter().try_for_each(|byte| write!(out, "{byte:02x}"))
}
