//! In-memory PE images and COFF objects for exercising the actions.

use std::io::Cursor;

use pe::{
    PeFile,
    raw::{FileHeader, Record, Relocation, SectionHeader, Symbol},
};

/// The offset of the `PE\0\0` signature in images.
const SIGNATURE_OFFSET: u32 = 0x40;

/// Assembles a file from its parts, laying them out in the usual order.
#[derive(Default)]
pub struct Fixture {
    optional_header: Option<Vec<u8>>,
    sections: Vec<(SectionHeader, Vec<u8>, Vec<Relocation>)>,
    symbols: Vec<u8>,
    strings: Option<Vec<u8>>,
}

impl Fixture {
    /// Starts a COFF object.
    pub fn object() -> Self {
        Self::default()
    }

    /// Starts a PE image with the given encoded optional header.
    pub fn image(optional_header: Vec<u8>) -> Self {
        Self {
            optional_header: Some(optional_header),
            ..Self::default()
        }
    }

    /// Adds a section named `name`. Sections without `data` get a raw data offset of zero.
    pub fn section(mut self, name: &[u8], data: &[u8], relocations: &[Relocation]) -> Self {
        let mut header = SectionHeader::default();
        header.name[..name.len()].copy_from_slice(name);
        self.sections
            .push((header, data.to_vec(), relocations.to_vec()));
        self
    }

    /// Appends a primary symbol.
    pub fn symbol(mut self, symbol: Symbol) -> Self {
        symbol.write(&mut self.symbols);
        self
    }

    /// Appends an auxiliary record.
    pub fn aux(mut self, bytes: [u8; 18]) -> Self {
        self.symbols.extend_from_slice(&bytes);
        self
    }

    /// Sets the strings following the length field of the string table.
    pub fn strings(mut self, strings: &[u8]) -> Self {
        let length = u32::try_from(strings.len() + 4).unwrap();
        let mut table = length.to_le_bytes().to_vec();
        table.extend_from_slice(strings);
        self.strings = Some(table);
        self
    }

    /// Lays out the file.
    pub fn build(self) -> Vec<u8> {
        let mut image = Vec::new();
        if self.optional_header.is_some() {
            image.resize(usize::try_from(SIGNATURE_OFFSET).unwrap(), 0);
            image[..2].copy_from_slice(b"MZ");
            image[0x3C..0x40].copy_from_slice(&SIGNATURE_OFFSET.to_le_bytes());
            image.extend_from_slice(b"PE\0\0");
        }

        let optional_header = self.optional_header.unwrap_or_default();
        let headers_end = image.len()
            + FileHeader::SIZE
            + optional_header.len()
            + self.sections.len() * SectionHeader::SIZE;

        let mut body = Vec::new();
        let offset = |body: &Vec<u8>| u32::try_from(headers_end + body.len()).unwrap();
        let mut section_headers = Vec::new();
        for (mut header, data, relocations) in self.sections {
            if !data.is_empty() {
                header.pointer_to_raw_data = offset(&body);
                header.size_of_raw_data = u32::try_from(data.len()).unwrap();
                body.extend_from_slice(&data);
            }
            if !relocations.is_empty() {
                header.pointer_to_relocations = offset(&body);
                header.number_of_relocations = u16::try_from(relocations.len()).unwrap();
                for relocation in &relocations {
                    relocation.write(&mut body);
                }
            }
            section_headers.push(header);
        }

        let number_of_symbols = u32::try_from(self.symbols.len() / Symbol::SIZE).unwrap();
        let pointer_to_symbol_table = if number_of_symbols == 0 {
            0
        } else {
            offset(&body)
        };
        body.extend_from_slice(&self.symbols);
        if number_of_symbols != 0 {
            let strings = self.strings.unwrap_or_else(|| vec![4, 0, 0, 0]);
            body.extend_from_slice(&strings);
        }

        FileHeader {
            machine: 0x8664,
            number_of_sections: u16::try_from(section_headers.len()).unwrap(),
            pointer_to_symbol_table,
            number_of_symbols,
            size_of_optional_header: u16::try_from(optional_header.len()).unwrap(),
            ..Default::default()
        }
        .write(&mut image);
        image.extend_from_slice(&optional_header);
        for header in &section_headers {
            header.write(&mut image);
        }
        image.extend_from_slice(&body);
        image
    }

    /// Lays out the file and opens it.
    pub fn open(self) -> PeFile<Cursor<Vec<u8>>> {
        PeFile::new(Cursor::new(self.build())).unwrap()
    }
}

/// Builds a primary symbol with the given name field, storage class and auxiliary count.
pub fn symbol(name: [u8; 8], storage_class: u8, number_of_aux_symbols: u8) -> Symbol {
    Symbol {
        name,
        value: 0,
        section_number: 1,
        symbol_type: 0,
        storage_class,
        number_of_aux_symbols,
    }
}
