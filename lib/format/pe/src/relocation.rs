//! Per-section COFF relocation arrays.
//!
//! Relocation types are machine specific and are kept as raw numbers.

use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    error::{PeError, Table},
    medium::Medium,
    raw::{Relocation, SectionHeader},
};

/// Reads the relocation array of the section described by `header`.
///
/// A section with no relocations yields an empty array without touching the file, whatever its
/// relocation pointer says.
///
/// # Errors
///
/// - [`PeError::MalformedTable`]: The relocation array does not fit inside of the file.
/// - [`PeError::IoFailure`]: The underlying file failed.
pub fn read_relocations<R: Read + Seek>(
    medium: &mut Medium<R>,
    header: &SectionHeader,
) -> Result<Vec<Relocation>, PeError> {
    if header.number_of_relocations == 0 {
        return Ok(Vec::new());
    }

    debug!(
        offset = header.pointer_to_relocations,
        count = header.number_of_relocations,
        "reading relocations"
    );
    medium
        .read_records(
            u64::from(header.pointer_to_relocations),
            u64::from(header.number_of_relocations),
        )
        .map_err(|error| PeError::table(Table::Relocations, error))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::read_relocations;
    use crate::{
        error::{PeError, Table},
        medium::Medium,
        raw::{Record, Relocation, SectionHeader},
    };

    #[test]
    fn zero_relocations_ignore_pointer() {
        let mut medium = Medium::new(Cursor::new(Vec::new())).unwrap();
        let header = SectionHeader {
            pointer_to_relocations: 0x1234,
            ..Default::default()
        };

        assert!(read_relocations(&mut medium, &header).unwrap().is_empty());
    }

    #[test]
    fn reads_declared_count() {
        let expected = [
            Relocation {
                virtual_address: 0x4,
                symbol_table_index: 9,
                relocation_type: 0x14,
            },
            Relocation {
                virtual_address: 0x1C,
                symbol_table_index: 2,
                relocation_type: 0x4,
            },
        ];

        let mut bytes = vec![0; 8];
        for relocation in &expected {
            relocation.write(&mut bytes);
        }
        let mut medium = Medium::new(Cursor::new(bytes)).unwrap();
        let header = SectionHeader {
            pointer_to_relocations: 8,
            number_of_relocations: 2,
            ..Default::default()
        };

        assert_eq!(read_relocations(&mut medium, &header).unwrap(), expected);
    }

    #[test]
    fn truncated_array_is_malformed() {
        let mut medium = Medium::new(Cursor::new(vec![0; 15])).unwrap();
        let header = SectionHeader {
            pointer_to_relocations: 0,
            number_of_relocations: 2,
            ..Default::default()
        };

        assert!(matches!(
            read_relocations(&mut medium, &header),
            Err(PeError::MalformedTable {
                table: Table::Relocations,
                ..
            })
        ));
    }
}
