//! The COFF string table that follows the symbol table.

use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    error::{PeError, Table},
    medium::{Medium, MediumError},
};

/// The string table holding names longer than 8 bytes.
///
/// The stored bytes begin with the 4-byte length field, so offsets index them directly.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct StringTable {
    /// The raw table, length field included.
    bytes: Vec<u8>,
}

impl StringTable {
    /// The size of the length field at the start of the table.
    pub const LENGTH_FIELD_SIZE: u32 = 4;

    /// Creates a [`StringTable`] from its raw bytes, length field included.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Reads the string table located at `offset`.
    ///
    /// A declared length smaller than the length field itself yields an empty table.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedTable`]: The length field or the declared length does not fit
    ///   inside of the file.
    /// - [`PeError::IoFailure`]: The underlying file failed.
    pub fn read<R: Read + Seek>(medium: &mut Medium<R>, offset: u64) -> Result<Self, PeError> {
        let map_error = |error| PeError::table(Table::Strings, error);

        medium
            .check_bounds(offset, u64::from(Self::LENGTH_FIELD_SIZE))
            .map_err(|bounds| map_error(MediumError::BoundsError(bounds)))?;
        medium.seek(offset)?;
        let length = medium.read_u32()?;
        debug!(offset, length, "reading string table");

        if length < Self::LENGTH_FIELD_SIZE {
            return Ok(Self::default());
        }

        let bytes = medium
            .read_bytes_at(offset, u64::from(length))
            .map_err(map_error)?;
        Ok(Self { bytes })
    }

    /// Returns the NUL-terminated string starting at `offset`, without its terminator.
    ///
    /// Returns [`None`] if `offset` points into the length field or past the end of the table,
    /// or if the string is not terminated.
    pub fn get(&self, offset: u32) -> Option<&[u8]> {
        if offset < Self::LENGTH_FIELD_SIZE {
            return None;
        }

        let tail = self.bytes.get(usize::try_from(offset).ok()?..)?;
        let end = tail.iter().position(|&byte| byte == 0)?;
        Some(&tail[..end])
    }

    /// Returns the raw bytes of the table, length field included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the table holds no strings.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 4
    }
}
