//! Errors produced while decoding PE/COFF files.

use core::{error, fmt};
use std::io;

use crate::medium::{BoundsError, MediumError};

/// Various errors that can occur while decoding a PE image or COFF object.
#[derive(Debug)]
pub enum PeError {
    /// The file could not be opened, seeked, or read.
    IoFailure(io::Error),
    /// One of the headers is unrecognized or inconsistent with the file.
    MalformedHeader {
        /// The header that failed to decode.
        header: Header,
        /// What is wrong with the header.
        defect: HeaderDefect,
    },
    /// A table declared by the headers does not fit inside of the file.
    MalformedTable {
        /// The table that failed to decode.
        table: Table,
        /// The region the headers declared for the table.
        bounds: BoundsError,
    },
}

impl PeError {
    /// Converts a [`MediumError`] raised while reading `header`.
    pub(crate) fn header(header: Header, error: MediumError) -> Self {
        match error {
            MediumError::BoundsError(bounds) => Self::MalformedHeader {
                header,
                defect: HeaderDefect::OutOfBounds(bounds),
            },
            MediumError::UnderlyingError(error) => Self::IoFailure(error),
        }
    }

    /// Converts a [`MediumError`] raised while reading `table`.
    pub(crate) fn table(table: Table, error: MediumError) -> Self {
        match error {
            MediumError::BoundsError(bounds) => Self::MalformedTable { table, bounds },
            MediumError::UnderlyingError(error) => Self::IoFailure(error),
        }
    }
}

impl From<io::Error> for PeError {
    fn from(value: io::Error) -> Self {
        Self::IoFailure(value)
    }
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoFailure(error) => write!(f, "{error}"),
            Self::MalformedHeader { header, defect } => write!(f, "malformed {header}: {defect}"),
            Self::MalformedTable { table, bounds } => write!(f, "malformed {table}: {bounds}"),
        }
    }
}

impl error::Error for PeError {}

/// The headers located at the start of a PE image or COFF object.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Header {
    /// The MS-DOS stub header and the `PE\0\0` signature it points to.
    Dos,
    /// The COFF file header.
    File,
    /// The optional header.
    Optional,
    /// The section table.
    SectionTable,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dos => f.pad("DOS stub"),
            Self::File => f.pad("file header"),
            Self::Optional => f.pad("optional header"),
            Self::SectionTable => f.pad("section table"),
        }
    }
}

/// The ways in which a [`Header`] can be malformed.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum HeaderDefect {
    /// The header extends past the end of the file.
    OutOfBounds(BoundsError),
    /// The signature pointed to by the DOS stub is not `PE\0\0`.
    InvalidSignature([u8; 4]),
    /// The optional header magic is neither PE32 nor PE32+.
    UnknownMagic(u16),
    /// The declared optional header size is too small for its fixed fields.
    TooSmall {
        /// The declared size.
        size: u16,
        /// The minimum size for the variant selected by the magic.
        expected: usize,
    },
    /// The number of data directories does not fit inside of the declared size.
    DataDirectoryCount {
        /// The declared number of data directories.
        count: u32,
        /// The number of bytes left for data directories.
        available: usize,
    },
}

impl fmt::Display for HeaderDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds(bounds) => write!(f, "{bounds}"),
            Self::InvalidSignature(signature) => {
                write!(f, "invalid PE signature {signature:02x?}")
            }
            Self::UnknownMagic(magic) => write!(f, "unrecognized magic {magic:#x}"),
            Self::TooSmall { size, expected } => write!(
                f,
                "declared size of {size} bytes is smaller than the {expected} bytes required"
            ),
            Self::DataDirectoryCount { count, available } => write!(
                f,
                "{count} data directories do not fit inside of the remaining {available} bytes"
            ),
        }
    }
}

/// The variable-length tables referenced by the headers.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Table {
    /// The raw bytes of a section.
    SectionData,
    /// The relocation array of a section.
    Relocations,
    /// The COFF symbol table.
    Symbols,
    /// The string table following the COFF symbol table.
    Strings,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectionData => f.pad("section data"),
            Self::Relocations => f.pad("relocations"),
            Self::Symbols => f.pad("symbol table"),
            Self::Strings => f.pad("string table"),
        }
    }
}
