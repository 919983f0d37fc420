//! Decoding of the COFF symbol table.
//!
//! The table is a flat array of 18-byte slots. A primary symbol declares how many of the slots
//! after it are auxiliary records, and the meaning of those records depends on the primary's
//! [`StorageClass`]. Decoding is a single pass that attaches each auxiliary record to the primary
//! that owns it.

use core::{fmt, slice::ChunksExact};
use std::io::{Read, Seek};

use tracing::{debug, trace, warn};

use crate::{
    error::{PeError, Table},
    medium::Medium,
    raw::{self, FileHeader, Record},
    string_table::StringTable,
    usize_to_u64,
};

/// The size of every slot in the symbol table.
pub const SYMBOL_SIZE: usize = raw::Symbol::SIZE;

/// Either a primary symbol or an auxiliary record belonging to one.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum SymbolRecord {
    /// A symbol declaring a name, value and section.
    Primary(Symbol),
    /// Extra data attached to the preceding primary symbol.
    Auxiliary(AuxiliaryRecord),
}

impl SymbolRecord {
    /// Returns the index of the slot this record occupies.
    pub fn index(&self) -> u32 {
        match self {
            Self::Primary(symbol) => symbol.index,
            Self::Auxiliary(record) => record.index,
        }
    }
}

/// A decoded primary symbol.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Symbol {
    /// The index of the slot this symbol occupies.
    index: u32,
    /// The fields as stored on disk.
    raw: raw::Symbol,
    /// The resolved name.
    name: Vec<u8>,
}

impl Symbol {
    /// Returns the index of the slot this [`Symbol`] occupies.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the 8-byte name field as stored on disk.
    pub fn raw_name(&self) -> [u8; 8] {
        self.raw.name
    }

    /// Returns the name, resolved through the string table if needed.
    ///
    /// Names that could not be resolved are empty.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the value of the [`Symbol`], whose meaning depends on its storage class.
    pub fn value(&self) -> u32 {
        self.raw.value
    }

    /// Returns the one-based section index, or one of the special negative values.
    pub fn section_number(&self) -> i16 {
        self.raw.section_number
    }

    /// Returns the type of the [`Symbol`].
    pub fn symbol_type(&self) -> u16 {
        self.raw.symbol_type
    }

    /// Returns the [`StorageClass`] of the [`Symbol`].
    pub fn storage_class(&self) -> StorageClass {
        StorageClass(self.raw.storage_class)
    }

    /// Returns the number of auxiliary records following the [`Symbol`].
    pub fn number_of_aux_symbols(&self) -> u8 {
        self.raw.number_of_aux_symbols
    }
}

/// An auxiliary record, kept as raw bytes.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AuxiliaryRecord {
    /// The index of the slot this record occupies.
    index: u32,
    /// The index of the primary symbol this record belongs to.
    owner_index: u32,
    /// The storage class of the owning primary symbol.
    owner_class: StorageClass,
    /// The contents of the slot.
    bytes: [u8; SYMBOL_SIZE],
}

impl AuxiliaryRecord {
    /// Returns the index of the slot this record occupies.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the index of the primary [`Symbol`] that owns this record.
    pub fn owner_index(&self) -> u32 {
        self.owner_index
    }

    /// Returns the [`StorageClass`] of the owning primary [`Symbol`].
    pub fn owner_class(&self) -> StorageClass {
        self.owner_class
    }

    /// Returns the raw contents of the record.
    pub fn bytes(&self) -> &[u8; SYMBOL_SIZE] {
        &self.bytes
    }

    /// Returns the file name fragment held by the record if its owner is a
    /// [`StorageClass::FILE`] symbol.
    pub fn file_name(&self) -> Option<&[u8]> {
        (self.owner_class == StorageClass::FILE).then(|| c_string(&self.bytes))
    }
}

/// The interpretation of a symbol's 8-byte name field.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum NameField {
    /// All 8 bytes are zero.
    Empty,
    /// The name is stored inline, NUL-terminated only if shorter than 8 bytes.
    Inline([u8; 8]),
    /// The name is stored in the string table at the given offset.
    StringTable(u32),
}

impl NameField {
    /// Classifies a raw 8-byte name field.
    pub fn new(name: [u8; 8]) -> Self {
        match name {
            [0, 0, 0, 0, 0, 0, 0, 0] => Self::Empty,
            [0, 0, 0, 0, a, b, c, d] => Self::StringTable(u32::from_le_bytes([a, b, c, d])),
            name => Self::Inline(name),
        }
    }

    /// Resolves the name, consulting `strings` only for [`NameField::StringTable`].
    ///
    /// Returns [`None`] if the string table offset is invalid.
    pub fn resolve<'a>(&'a self, strings: &'a StringTable) -> Option<&'a [u8]> {
        match self {
            Self::Empty => Some(&[]),
            Self::Inline(name) => Some(c_string(name)),
            Self::StringTable(offset) => strings.get(*offset),
        }
    }
}

/// The storage class of a symbol.
#[repr(transparent)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorageClass(pub u8);

impl StorageClass {
    /// A special symbol representing the end of a function, for debugging.
    pub const END_OF_FUNCTION: Self = Self(0xFF);
    /// No assigned storage class.
    pub const NULL: Self = Self(0);
    /// An automatic (stack) variable.
    pub const AUTOMATIC: Self = Self(1);
    /// An external symbol, defined or referenced.
    pub const EXTERNAL: Self = Self(2);
    /// A static symbol or the start of a section.
    pub const STATIC: Self = Self(3);
    /// A register variable.
    pub const REGISTER: Self = Self(4);
    /// A symbol defined externally.
    pub const EXTERNAL_DEF: Self = Self(5);
    /// A code label defined within the module.
    pub const LABEL: Self = Self(6);
    /// A reference to an undefined code label.
    pub const UNDEFINED_LABEL: Self = Self(7);
    /// A structure member.
    pub const MEMBER_OF_STRUCT: Self = Self(8);
    /// A formal function argument.
    pub const ARGUMENT: Self = Self(9);
    /// A structure tag-name entry.
    pub const STRUCT_TAG: Self = Self(10);
    /// A union member.
    pub const MEMBER_OF_UNION: Self = Self(11);
    /// A union tag-name entry.
    pub const UNION_TAG: Self = Self(12);
    /// A typedef entry.
    pub const TYPE_DEFINITION: Self = Self(13);
    /// A static data declaration.
    pub const UNDEFINED_STATIC: Self = Self(14);
    /// An enumerated type tag-name entry.
    pub const ENUM_TAG: Self = Self(15);
    /// A member of an enumeration.
    pub const MEMBER_OF_ENUM: Self = Self(16);
    /// A register parameter.
    pub const REGISTER_PARAM: Self = Self(17);
    /// A bit-field reference.
    pub const BIT_FIELD: Self = Self(18);
    /// A `.bb` or `.eb` record marking the bounds of a block.
    pub const BLOCK: Self = Self(100);
    /// A `.bf`, `.ef` or `.lf` record marking the extent of a function.
    pub const FUNCTION: Self = Self(101);
    /// An end-of-structure entry.
    pub const END_OF_STRUCT: Self = Self(102);
    /// The source file; followed by auxiliary records holding the file name.
    pub const FILE: Self = Self(103);
    /// A definition of a section.
    pub const SECTION: Self = Self(104);
    /// A weak external.
    pub const WEAK_EXTERNAL: Self = Self(105);
    /// A CLR token.
    pub const CLR_TOKEN: Self = Self(107);
}

impl fmt::Debug for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::END_OF_FUNCTION => f.pad("EndOfFunction"),
            Self::NULL => f.pad("Null"),
            Self::AUTOMATIC => f.pad("Automatic"),
            Self::EXTERNAL => f.pad("External"),
            Self::STATIC => f.pad("Static"),
            Self::REGISTER => f.pad("Register"),
            Self::EXTERNAL_DEF => f.pad("ExternalDef"),
            Self::LABEL => f.pad("Label"),
            Self::UNDEFINED_LABEL => f.pad("UndefinedLabel"),
            Self::MEMBER_OF_STRUCT => f.pad("MemberOfStruct"),
            Self::ARGUMENT => f.pad("Argument"),
            Self::STRUCT_TAG => f.pad("StructTag"),
            Self::MEMBER_OF_UNION => f.pad("MemberOfUnion"),
            Self::UNION_TAG => f.pad("UnionTag"),
            Self::TYPE_DEFINITION => f.pad("TypeDefinition"),
            Self::UNDEFINED_STATIC => f.pad("UndefinedStatic"),
            Self::ENUM_TAG => f.pad("EnumTag"),
            Self::MEMBER_OF_ENUM => f.pad("MemberOfEnum"),
            Self::REGISTER_PARAM => f.pad("RegisterParam"),
            Self::BIT_FIELD => f.pad("BitField"),
            Self::BLOCK => f.pad("Block"),
            Self::FUNCTION => f.pad("Function"),
            Self::END_OF_STRUCT => f.pad("EndOfStruct"),
            Self::FILE => f.pad("File"),
            Self::SECTION => f.pad("Section"),
            Self::WEAK_EXTERNAL => f.pad("WeakExternal"),
            Self::CLR_TOKEN => f.pad("ClrToken"),
            storage_class => f
                .debug_tuple("StorageClass")
                .field(&storage_class.0)
                .finish(),
        }
    }
}

/// Reads the raw symbol table declared by `file_header`.
///
/// # Errors
///
/// - [`PeError::MalformedTable`]: The symbol table does not fit inside of the file.
/// - [`PeError::IoFailure`]: The underlying file failed.
pub fn read_symbol_table<R: Read + Seek>(
    medium: &mut Medium<R>,
    file_header: &FileHeader,
) -> Result<Vec<u8>, PeError> {
    let offset = u64::from(file_header.pointer_to_symbol_table);
    let length = u64::from(file_header.number_of_symbols) * usize_to_u64(SYMBOL_SIZE);
    debug!(offset, count = file_header.number_of_symbols, "reading symbol table");

    medium
        .read_bytes_at(offset, length)
        .map_err(|error| PeError::table(Table::Symbols, error))
}

/// Returns the offset of the string table that follows the symbol table.
pub fn string_table_offset(file_header: &FileHeader) -> u64 {
    u64::from(file_header.pointer_to_symbol_table)
        + u64::from(file_header.number_of_symbols) * usize_to_u64(SYMBOL_SIZE)
}

/// Decodes every slot of `table` into a [`SymbolRecord`].
///
/// Exactly one record is produced per 18-byte slot. Trailing bytes that do not form a full slot
/// are ignored.
pub fn decode_symbols(table: &[u8], strings: &StringTable) -> Vec<SymbolRecord> {
    let mut records = SymbolRecords::new(table, strings);
    let decoded = records.by_ref().collect();

    if let Some(owner) = records.unfinished_owner() {
        warn!(
            owner,
            "symbol declares more auxiliary records than remain in the table"
        );
    }

    decoded
}

/// An [`Iterator`] over the slots of a symbol table.
pub struct SymbolRecords<'table> {
    /// The remaining slots.
    slots: ChunksExact<'table, u8>,
    /// The string table used to resolve long names.
    strings: &'table StringTable,
    /// The index of the next slot.
    index: u32,
    /// The number of auxiliary records still owed to the current primary symbol.
    aux_remaining: u8,
    /// The index and storage class of the current primary symbol.
    owner: (u32, StorageClass),
}

impl<'table> SymbolRecords<'table> {
    /// Creates a new [`SymbolRecords`] over the slots of `table`.
    pub fn new(table: &'table [u8], strings: &'table StringTable) -> Self {
        Self {
            slots: table.chunks_exact(SYMBOL_SIZE),
            strings,
            index: 0,
            aux_remaining: 0,
            owner: (0, StorageClass::NULL),
        }
    }

    /// Returns the index of the primary symbol whose auxiliary records were cut short by the end
    /// of the table.
    pub fn unfinished_owner(&self) -> Option<u32> {
        (self.aux_remaining != 0).then_some(self.owner.0)
    }

    /// Decodes `slot` as a primary symbol and makes it the owner of the records that follow.
    fn decode_primary(&mut self, index: u32, slot: &[u8]) -> Option<Symbol> {
        let raw = raw::Symbol::parse(slot)?;

        let name_field = NameField::new(raw.name);
        let name = match name_field.resolve(self.strings) {
            Some(name) => name.to_vec(),
            None => {
                warn!(index, ?name_field, "symbol name is outside of the string table");
                Vec::new()
            }
        };

        self.owner = (index, StorageClass(raw.storage_class));
        self.aux_remaining = raw.number_of_aux_symbols;
        trace!(index, name = %name.escape_ascii(), aux = raw.number_of_aux_symbols, "primary symbol");

        Some(Symbol { index, raw, name })
    }
}

impl Iterator for SymbolRecords<'_> {
    type Item = SymbolRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        let index = self.index;
        self.index = self.index.wrapping_add(1);

        if self.aux_remaining == 0 {
            return self.decode_primary(index, slot).map(SymbolRecord::Primary);
        }

        self.aux_remaining -= 1;
        let (owner_index, owner_class) = self.owner;
        let bytes = <[u8; SYMBOL_SIZE]>::try_from(slot).ok()?;
        Some(SymbolRecord::Auxiliary(AuxiliaryRecord {
            index,
            owner_index,
            owner_class,
            bytes,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

/// Returns the bytes of `bytes` up to its first NUL, or all of them if there is none.
fn c_string(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|&byte| byte == 0)
        .unwrap_or(bytes.len());
    &bytes[..end]
}
