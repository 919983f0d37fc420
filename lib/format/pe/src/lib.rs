//! The `pe` crate provides an interface for reading PE images and COFF object files.
//!
//! # Capabilities
//!
//! ## Images and objects
//!
//! Files starting with the MS-DOS `MZ` magic are treated as PE images and their COFF file header
//! is located through the `PE\0\0` signature. Anything else is treated as a bare COFF object
//! whose file header starts at offset 0.
//!
//! ## Bounded reads
//!
//! Every table is bounds checked against the size of the file before it is allocated, so corrupt
//! counts and offsets are reported as errors instead of causing oversized allocations.
//!
//! ## Lazy tables
//!
//! Section contents, relocations, the symbol table and the string table are only read when they
//! are requested.
//!
//! ## Uses no unsafe code
//!
//! This crate contains zero unsafe blocks of code.

use std::{
    fs::File,
    io::{Read, Seek},
    path::Path,
};

use tracing::warn;

use crate::{
    header::Headers,
    medium::Medium,
    raw::{FileHeader, Relocation, SectionHeader},
    section_header::{long_name_offset, read_section_data, trim_name},
    symbol::{decode_symbols, read_symbol_table, string_table_offset},
};

pub mod error;
pub mod header;
pub mod medium;
pub mod raw;
pub mod relocation;
pub mod section_header;
pub mod string_table;
pub mod symbol;

pub use error::PeError;
pub use header::{ImageKind, OptionalHeader};
pub use section_header::{Section, SectionTable};
pub use string_table::StringTable;
pub use symbol::{AuxiliaryRecord, StorageClass, Symbol, SymbolRecord};

#[cfg(not(target_pointer_width = "64"))]
compile_error!("pe requires a 64-bit target");

/// A PE image or COFF object file.
#[derive(Debug)]
pub struct PeFile<R> {
    /// The underlying [`Medium`] of this [`PeFile`].
    medium: Medium<R>,
    /// The headers preceding the section table.
    headers: Headers,
    /// The decoded section table.
    sections: SectionTable,
    /// The string table, once it has been read.
    string_table: Option<StringTable>,
}

impl PeFile<File> {
    /// Opens the file at `path` and decodes its headers and section table.
    ///
    /// # Errors
    ///
    /// - [`PeError::IoFailure`]: The file could not be opened or read.
    /// - [`PeError::MalformedHeader`]: See [`PeFile::new()`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PeError> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> PeFile<R> {
    /// Decodes the headers and section table of `inner`.
    ///
    /// Long section names are resolved through the string table. If the string table cannot be
    /// read, those sections keep their `/<offset>` names.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedHeader`]: The headers or the section table are malformed.
    /// - [`PeError::IoFailure`]: The underlying source failed.
    pub fn new(inner: R) -> Result<Self, PeError> {
        let mut medium = Medium::new(inner)?;
        let headers = Headers::read(&mut medium)?;
        let section_headers = SectionTable::read_headers(
            &mut medium,
            headers.section_table_offset,
            headers.file_header.number_of_sections,
        )?;

        let mut file = Self {
            medium,
            headers,
            sections: SectionTable::default(),
            string_table: None,
        };

        let has_long_names = section_headers
            .iter()
            .any(|header| long_name_offset(trim_name(&header.name)).is_some());
        if has_long_names
            && let Err(error) = file.string_table()
        {
            warn!(%error, "string table needed for long section names is unreadable");
        }
        file.sections = SectionTable::new(section_headers, file.string_table.as_ref());

        Ok(file)
    }

    /// Returns whether this [`PeFile`] is an image or an object.
    pub fn kind(&self) -> ImageKind {
        self.headers.kind
    }

    /// Returns the COFF [`FileHeader`].
    pub fn file_header(&self) -> &FileHeader {
        &self.headers.file_header
    }

    /// Returns the [`OptionalHeader`].
    pub fn optional_header(&self) -> &OptionalHeader {
        &self.headers.optional_header
    }

    /// Returns the [`SectionTable`].
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Returns the first [`Section`] named `name`.
    pub fn section(&self, name: &[u8]) -> Option<&Section> {
        self.sections.find(name)
    }

    /// Reads the raw contents of the section described by `header`.
    ///
    /// # Errors
    ///
    /// See [`read_section_data()`].
    pub fn section_data(&mut self, header: &SectionHeader) -> Result<Vec<u8>, PeError> {
        read_section_data(&mut self.medium, header)
    }

    /// Reads the relocations of the section described by `header`.
    ///
    /// # Errors
    ///
    /// See [`relocation::read_relocations()`].
    pub fn relocations(&mut self, header: &SectionHeader) -> Result<Vec<Relocation>, PeError> {
        relocation::read_relocations(&mut self.medium, header)
    }

    /// Returns the [`StringTable`], reading it on first use.
    ///
    /// Files without a symbol table have an empty string table.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedTable`]: The string table does not fit inside of the file.
    /// - [`PeError::IoFailure`]: The underlying source failed.
    pub fn string_table(&mut self) -> Result<&StringTable, PeError> {
        let strings = match self.string_table.take() {
            Some(strings) => strings,
            None if self.headers.file_header.pointer_to_symbol_table == 0 => {
                StringTable::default()
            }
            None => StringTable::read(
                &mut self.medium,
                string_table_offset(&self.headers.file_header),
            )?,
        };

        Ok(self.string_table.insert(strings))
    }

    /// Reads and decodes every slot of the symbol table.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedTable`]: The symbol table or the string table does not fit inside
    ///   of the file.
    /// - [`PeError::IoFailure`]: The underlying source failed.
    pub fn symbols(&mut self) -> Result<Vec<SymbolRecord>, PeError> {
        if self.headers.file_header.number_of_symbols == 0 {
            return Ok(Vec::new());
        }

        let table = read_symbol_table(&mut self.medium, &self.headers.file_header)?;
        let strings = self.string_table()?;
        Ok(decode_symbols(&table, strings))
    }
}

/// Converts `value` to a `usize`, relying on the 64-bit target check above.
#[expect(clippy::cast_possible_truncation)]
pub(crate) const fn u64_to_usize(value: u64) -> usize {
    value as usize
}

/// Converts `value` to a `u64`, relying on the 64-bit target check above.
pub(crate) const fn usize_to_u64(value: usize) -> u64 {
    value as u64
}
