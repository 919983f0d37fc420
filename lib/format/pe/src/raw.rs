//! Raw definitions of PE/COFF structures and their packed little-endian layouts.

#![expect(missing_docs, reason = "no need to document raw definitions")]

/// A fixed-size structure stored packed and little-endian on disk.
pub trait Record: Sized {
    /// The size, in bytes, of the on-disk representation.
    const SIZE: usize;

    /// Decodes a [`Record`] from the start of `bytes`.
    ///
    /// Returns [`None`] if `bytes` is shorter than [`Record::SIZE`].
    fn parse(bytes: &[u8]) -> Option<Self>;

    /// Appends the on-disk representation of this [`Record`] to `out`.
    fn write(&self, out: &mut Vec<u8>);

    /// Returns the on-disk representation of this [`Record`].
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write(&mut out);
        out
    }
}

/// Sequential little-endian field extraction from a byte slice.
struct Fields<'bytes>(&'bytes [u8]);

impl Fields<'_> {
    /// Takes the next `N` bytes.
    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let (value, rest) = self.0.split_first_chunk::<N>()?;
        self.0 = rest;
        Some(*value)
    }

    /// Takes the next byte.
    fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(u8::from_le_bytes)
    }

    /// Takes the next little-endian `u16`.
    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Takes the next little-endian `i16`.
    fn i16(&mut self) -> Option<i16> {
        self.array().map(i16::from_le_bytes)
    }

    /// Takes the next little-endian `u32`.
    fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Takes the next little-endian `u64`.
    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct FileHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl Record for FileHeader {
    const SIZE: usize = 20;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            machine: fields.u16()?,
            number_of_sections: fields.u16()?,
            time_date_stamp: fields.u32()?,
            pointer_to_symbol_table: fields.u32()?,
            number_of_symbols: fields.u32()?,
            size_of_optional_header: fields.u16()?,
            characteristics: fields.u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.machine.to_le_bytes());
        out.extend_from_slice(&self.number_of_sections.to_le_bytes());
        out.extend_from_slice(&self.time_date_stamp.to_le_bytes());
        out.extend_from_slice(&self.pointer_to_symbol_table.to_le_bytes());
        out.extend_from_slice(&self.number_of_symbols.to_le_bytes());
        out.extend_from_slice(&self.size_of_optional_header.to_le_bytes());
        out.extend_from_slice(&self.characteristics.to_le_bytes());
    }
}

/// The fixed part of the PE32 optional header, without its data directories.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct OptionalHeader32 {
    pub magic: u16,
    pub linker_major_version: u8,
    pub linker_minor_version: u8,
    pub code_size: u32,
    pub initialized_data_size: u32,
    pub uninitialized_data_size: u32,
    pub entry_point: u32,
    pub base_of_code: u32,
    pub base_of_data: u32,

    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub operating_system_major_version: u16,
    pub operating_system_minor_version: u16,
    pub image_major_version: u16,
    pub image_minor_version: u16,
    pub subsystem_major_version: u16,
    pub subsystem_minor_version: u16,
    pub win32_version_value: u32,
    pub image_size: u32,
    pub header_size: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u32,
    pub size_of_stack_commit: u32,
    pub size_of_heap_reserve: u32,
    pub size_of_heap_commit: u32,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

impl Record for OptionalHeader32 {
    const SIZE: usize = 96;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            magic: fields.u16()?,
            linker_major_version: fields.u8()?,
            linker_minor_version: fields.u8()?,
            code_size: fields.u32()?,
            initialized_data_size: fields.u32()?,
            uninitialized_data_size: fields.u32()?,
            entry_point: fields.u32()?,
            base_of_code: fields.u32()?,
            base_of_data: fields.u32()?,

            image_base: fields.u32()?,
            section_alignment: fields.u32()?,
            file_alignment: fields.u32()?,
            operating_system_major_version: fields.u16()?,
            operating_system_minor_version: fields.u16()?,
            image_major_version: fields.u16()?,
            image_minor_version: fields.u16()?,
            subsystem_major_version: fields.u16()?,
            subsystem_minor_version: fields.u16()?,
            win32_version_value: fields.u32()?,
            image_size: fields.u32()?,
            header_size: fields.u32()?,
            checksum: fields.u32()?,
            subsystem: fields.u16()?,
            dll_characteristics: fields.u16()?,
            size_of_stack_reserve: fields.u32()?,
            size_of_stack_commit: fields.u32()?,
            size_of_heap_reserve: fields.u32()?,
            size_of_heap_commit: fields.u32()?,
            loader_flags: fields.u32()?,
            number_of_rva_and_sizes: fields.u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.push(self.linker_major_version);
        out.push(self.linker_minor_version);
        out.extend_from_slice(&self.code_size.to_le_bytes());
        out.extend_from_slice(&self.initialized_data_size.to_le_bytes());
        out.extend_from_slice(&self.uninitialized_data_size.to_le_bytes());
        out.extend_from_slice(&self.entry_point.to_le_bytes());
        out.extend_from_slice(&self.base_of_code.to_le_bytes());
        out.extend_from_slice(&self.base_of_data.to_le_bytes());

        out.extend_from_slice(&self.image_base.to_le_bytes());
        out.extend_from_slice(&self.section_alignment.to_le_bytes());
        out.extend_from_slice(&self.file_alignment.to_le_bytes());
        out.extend_from_slice(&self.operating_system_major_version.to_le_bytes());
        out.extend_from_slice(&self.operating_system_minor_version.to_le_bytes());
        out.extend_from_slice(&self.image_major_version.to_le_bytes());
        out.extend_from_slice(&self.image_minor_version.to_le_bytes());
        out.extend_from_slice(&self.subsystem_major_version.to_le_bytes());
        out.extend_from_slice(&self.subsystem_minor_version.to_le_bytes());
        out.extend_from_slice(&self.win32_version_value.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.subsystem.to_le_bytes());
        out.extend_from_slice(&self.dll_characteristics.to_le_bytes());
        out.extend_from_slice(&self.size_of_stack_reserve.to_le_bytes());
        out.extend_from_slice(&self.size_of_stack_commit.to_le_bytes());
        out.extend_from_slice(&self.size_of_heap_reserve.to_le_bytes());
        out.extend_from_slice(&self.size_of_heap_commit.to_le_bytes());
        out.extend_from_slice(&self.loader_flags.to_le_bytes());
        out.extend_from_slice(&self.number_of_rva_and_sizes.to_le_bytes());
    }
}

/// The fixed part of the PE32+ optional header, without its data directories.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct OptionalHeader64 {
    pub magic: u16,
    pub linker_major_version: u8,
    pub linker_minor_version: u8,
    pub code_size: u32,
    pub initialized_data_size: u32,
    pub uninitialized_data_size: u32,
    pub entry_point: u32,
    pub base_of_code: u32,

    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub operating_system_major_version: u16,
    pub operating_system_minor_version: u16,
    pub image_major_version: u16,
    pub image_minor_version: u16,
    pub subsystem_major_version: u16,
    pub subsystem_minor_version: u16,
    pub win32_version_value: u32,
    pub image_size: u32,
    pub header_size: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

impl Record for OptionalHeader64 {
    const SIZE: usize = 112;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            magic: fields.u16()?,
            linker_major_version: fields.u8()?,
            linker_minor_version: fields.u8()?,
            code_size: fields.u32()?,
            initialized_data_size: fields.u32()?,
            uninitialized_data_size: fields.u32()?,
            entry_point: fields.u32()?,
            base_of_code: fields.u32()?,

            image_base: fields.u64()?,
            section_alignment: fields.u32()?,
            file_alignment: fields.u32()?,
            operating_system_major_version: fields.u16()?,
            operating_system_minor_version: fields.u16()?,
            image_major_version: fields.u16()?,
            image_minor_version: fields.u16()?,
            subsystem_major_version: fields.u16()?,
            subsystem_minor_version: fields.u16()?,
            win32_version_value: fields.u32()?,
            image_size: fields.u32()?,
            header_size: fields.u32()?,
            checksum: fields.u32()?,
            subsystem: fields.u16()?,
            dll_characteristics: fields.u16()?,
            size_of_stack_reserve: fields.u64()?,
            size_of_stack_commit: fields.u64()?,
            size_of_heap_reserve: fields.u64()?,
            size_of_heap_commit: fields.u64()?,
            loader_flags: fields.u32()?,
            number_of_rva_and_sizes: fields.u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.push(self.linker_major_version);
        out.push(self.linker_minor_version);
        out.extend_from_slice(&self.code_size.to_le_bytes());
        out.extend_from_slice(&self.initialized_data_size.to_le_bytes());
        out.extend_from_slice(&self.uninitialized_data_size.to_le_bytes());
        out.extend_from_slice(&self.entry_point.to_le_bytes());
        out.extend_from_slice(&self.base_of_code.to_le_bytes());

        out.extend_from_slice(&self.image_base.to_le_bytes());
        out.extend_from_slice(&self.section_alignment.to_le_bytes());
        out.extend_from_slice(&self.file_alignment.to_le_bytes());
        out.extend_from_slice(&self.operating_system_major_version.to_le_bytes());
        out.extend_from_slice(&self.operating_system_minor_version.to_le_bytes());
        out.extend_from_slice(&self.image_major_version.to_le_bytes());
        out.extend_from_slice(&self.image_minor_version.to_le_bytes());
        out.extend_from_slice(&self.subsystem_major_version.to_le_bytes());
        out.extend_from_slice(&self.subsystem_minor_version.to_le_bytes());
        out.extend_from_slice(&self.win32_version_value.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.subsystem.to_le_bytes());
        out.extend_from_slice(&self.dll_characteristics.to_le_bytes());
        out.extend_from_slice(&self.size_of_stack_reserve.to_le_bytes());
        out.extend_from_slice(&self.size_of_stack_commit.to_le_bytes());
        out.extend_from_slice(&self.size_of_heap_reserve.to_le_bytes());
        out.extend_from_slice(&self.size_of_heap_commit.to_le_bytes());
        out.extend_from_slice(&self.loader_flags.to_le_bytes());
        out.extend_from_slice(&self.number_of_rva_and_sizes.to_le_bytes());
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl Record for DataDirectory {
    const SIZE: usize = 8;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            virtual_address: fields.u32()?,
            size: fields.u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.virtual_address.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_line_numbers: u32,
    pub number_of_relocations: u16,
    pub number_of_line_numbers: u16,
    pub characteristics: u32,
}

impl Record for SectionHeader {
    const SIZE: usize = 40;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            name: fields.array()?,
            virtual_size: fields.u32()?,
            virtual_address: fields.u32()?,
            size_of_raw_data: fields.u32()?,
            pointer_to_raw_data: fields.u32()?,
            pointer_to_relocations: fields.u32()?,
            pointer_to_line_numbers: fields.u32()?,
            number_of_relocations: fields.u16()?,
            number_of_line_numbers: fields.u16()?,
            characteristics: fields.u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.virtual_size.to_le_bytes());
        out.extend_from_slice(&self.virtual_address.to_le_bytes());
        out.extend_from_slice(&self.size_of_raw_data.to_le_bytes());
        out.extend_from_slice(&self.pointer_to_raw_data.to_le_bytes());
        out.extend_from_slice(&self.pointer_to_relocations.to_le_bytes());
        out.extend_from_slice(&self.pointer_to_line_numbers.to_le_bytes());
        out.extend_from_slice(&self.number_of_relocations.to_le_bytes());
        out.extend_from_slice(&self.number_of_line_numbers.to_le_bytes());
        out.extend_from_slice(&self.characteristics.to_le_bytes());
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Relocation {
    pub virtual_address: u32,
    pub symbol_table_index: u32,
    /// Machine specific; kept unsigned, so types with the high bit set print as positive hex.
    pub relocation_type: u16,
}

impl Record for Relocation {
    const SIZE: usize = 10;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            virtual_address: fields.u32()?,
            symbol_table_index: fields.u32()?,
            relocation_type: fields.u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.virtual_address.to_le_bytes());
        out.extend_from_slice(&self.symbol_table_index.to_le_bytes());
        out.extend_from_slice(&self.relocation_type.to_le_bytes());
    }
}

/// A primary entry of the COFF symbol table.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Symbol {
    pub name: [u8; 8],
    pub value: u32,
    pub section_number: i16,
    pub symbol_type: u16,
    pub storage_class: u8,
    pub number_of_aux_symbols: u8,
}

impl Record for Symbol {
    const SIZE: usize = 18;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Fields(bytes);
        Some(Self {
            name: fields.array()?,
            value: fields.u32()?,
            section_number: fields.i16()?,
            symbol_type: fields.u16()?,
            storage_class: fields.u8()?,
            number_of_aux_symbols: fields.u8()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.section_number.to_le_bytes());
        out.extend_from_slice(&self.symbol_type.to_le_bytes());
        out.push(self.storage_class);
        out.push(self.number_of_aux_symbols);
    }
}
