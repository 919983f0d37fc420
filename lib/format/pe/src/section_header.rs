//! The section table and on-demand access to section contents.

use std::io::{Read, Seek};

use tracing::{debug, warn};

use crate::{
    error::{Header, PeError, Table},
    medium::Medium,
    raw::SectionHeader,
    string_table::StringTable,
};

/// A section header together with its resolved name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Section {
    /// The decoded header.
    header: SectionHeader,
    /// The name after resolving any string table reference.
    name: Vec<u8>,
}

impl Section {
    /// Returns the decoded [`SectionHeader`].
    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    /// Returns the name of the [`Section`].
    ///
    /// Long names stored in the string table are resolved, otherwise this is the same as
    /// [`Section::raw_name()`].
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the 8-byte name field with trailing NULs removed.
    pub fn raw_name(&self) -> &[u8] {
        trim_name(&self.header.name)
    }
}

/// The sections of a PE image or COFF object, in file order.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct SectionTable {
    /// The sections in file order.
    sections: Vec<Section>,
}

impl SectionTable {
    /// Builds a [`SectionTable`], resolving `/<offset>` names through `strings` when it is
    /// available.
    ///
    /// Names that cannot be resolved keep their raw form.
    pub fn new(headers: Vec<SectionHeader>, strings: Option<&StringTable>) -> Self {
        let sections = headers
            .into_iter()
            .map(|header| {
                let raw_name = trim_name(&header.name);
                let name = match long_name_offset(raw_name) {
                    Some(offset) => match strings.and_then(|strings| strings.get(offset)) {
                        Some(name) => name.to_vec(),
                        None => {
                            warn!(
                                name = %raw_name.escape_ascii(),
                                "could not resolve long section name"
                            );
                            raw_name.to_vec()
                        }
                    },
                    None => raw_name.to_vec(),
                };

                Section { header, name }
            })
            .collect();

        Self { sections }
    }

    /// Reads the `count` section headers located at `offset`.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedHeader`]: The section table does not fit inside of the file.
    /// - [`PeError::IoFailure`]: The underlying file failed.
    pub fn read_headers<R: Read + Seek>(
        medium: &mut Medium<R>,
        offset: u64,
        count: u16,
    ) -> Result<Vec<SectionHeader>, PeError> {
        debug!(offset, count, "reading section table");
        medium
            .read_records(offset, u64::from(count))
            .map_err(|error| PeError::header(Header::SectionTable, error))
    }

    /// Returns the first [`Section`] whose resolved or raw name is exactly `name`.
    pub fn find(&self, name: &[u8]) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.name() == name || section.raw_name() == name)
    }

    /// Returns the [`Section`] at `index`.
    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Returns the number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if there are no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Returns an iterator over the sections in file order.
    pub fn iter(&self) -> core::slice::Iter<'_, Section> {
        self.sections.iter()
    }
}

impl<'table> IntoIterator for &'table SectionTable {
    type Item = &'table Section;
    type IntoIter = core::slice::Iter<'table, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reads the raw bytes of the section described by `header`.
///
/// Sections without file contents (a raw data offset of zero) yield no bytes.
///
/// # Errors
///
/// - [`PeError::MalformedTable`]: The raw data does not fit inside of the file.
/// - [`PeError::IoFailure`]: The underlying file failed.
pub fn read_section_data<R: Read + Seek>(
    medium: &mut Medium<R>,
    header: &SectionHeader,
) -> Result<Vec<u8>, PeError> {
    if header.pointer_to_raw_data == 0 {
        return Ok(Vec::new());
    }

    debug!(
        offset = header.pointer_to_raw_data,
        size = header.size_of_raw_data,
        "reading section data"
    );
    medium
        .read_bytes_at(
            u64::from(header.pointer_to_raw_data),
            u64::from(header.size_of_raw_data),
        )
        .map_err(|error| PeError::table(Table::SectionData, error))
}

/// Removes the NUL padding from an 8-byte name field.
pub fn trim_name(name: &[u8; 8]) -> &[u8] {
    let end = name
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |index| index + 1);
    &name[..end]
}

/// Parses a `/<decimal offset>` long section name reference.
pub fn long_name_offset(name: &[u8]) -> Option<u32> {
    let digits = name.strip_prefix(b"/")?;
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    core::str::from_utf8(digits).ok()?.parse().ok()
}
