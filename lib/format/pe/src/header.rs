//! Location and decoding of the COFF file header and the optional header.

use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    error::{Header, HeaderDefect, PeError},
    medium::{Medium, MediumError},
    raw::{DataDirectory, FileHeader, OptionalHeader32, OptionalHeader64, Record},
    usize_to_u64,
};

/// The magic at the start of an MS-DOS stub.
pub const DOS_MAGIC: [u8; 2] = *b"MZ";
/// The offset of the field in the MS-DOS stub holding the offset of the PE signature.
pub const PE_POINTER_OFFSET: u64 = 0x3C;
/// The signature preceding the COFF file header in a PE image.
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

/// The optional header magic of a PE32 image.
pub const PE32_MAGIC: u16 = 0x10B;
/// The optional header magic of a PE32+ image.
pub const PE32_PLUS_MAGIC: u16 = 0x20B;

/// Whether the file is a bare COFF object or a PE image wrapping one.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ImageKind {
    /// A COFF object; the file header starts at offset 0.
    Object,
    /// A PE image; the file header follows the `PE\0\0` signature.
    Image {
        /// The offset of the `PE\0\0` signature.
        signature_offset: u32,
    },
}

/// The decoded headers that precede the section table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Headers {
    /// Whether the file is an object or an image.
    pub kind: ImageKind,
    /// The COFF file header.
    pub file_header: FileHeader,
    /// The optional header, if present.
    pub optional_header: OptionalHeader,
    /// The offset of the first section header.
    pub section_table_offset: u64,
}

impl Headers {
    /// Locates and decodes the file header and the optional header.
    ///
    /// # Errors
    ///
    /// - [`PeError::MalformedHeader`]: A header is truncated, the PE signature is wrong, or the
    ///   optional header is not PE32 or PE32+.
    /// - [`PeError::IoFailure`]: The underlying file failed.
    pub fn read<R: Read + Seek>(medium: &mut Medium<R>) -> Result<Self, PeError> {
        let (kind, file_header_offset) = locate_file_header(medium)?;
        debug!(?kind, file_header_offset, "located file header");

        let file_header = medium
            .read_records::<FileHeader>(file_header_offset, 1)
            .map_err(|error| PeError::header(Header::File, error))?
            .pop()
            .ok_or(PeError::MalformedHeader {
                header: Header::File,
                defect: HeaderDefect::TooSmall {
                    size: 0,
                    expected: FileHeader::SIZE,
                },
            })?;

        let optional_header_offset = file_header_offset + usize_to_u64(FileHeader::SIZE);
        let optional_header_size = file_header.size_of_optional_header;
        let optional_header_bytes = medium
            .read_bytes_at(optional_header_offset, u64::from(optional_header_size))
            .map_err(|error| PeError::header(Header::Optional, error))?;
        let optional_header =
            OptionalHeader::parse(&optional_header_bytes).map_err(|defect| {
                PeError::MalformedHeader {
                    header: Header::Optional,
                    defect,
                }
            })?;
        debug!(
            magic = ?optional_header.magic(),
            size = optional_header_size,
            "decoded optional header"
        );

        Ok(Self {
            kind,
            file_header,
            optional_header,
            section_table_offset: optional_header_offset + u64::from(optional_header_size),
        })
    }
}

/// Determines whether the file is a PE image and returns the offset of the COFF file header.
fn locate_file_header<R: Read + Seek>(
    medium: &mut Medium<R>,
) -> Result<(ImageKind, u64), PeError> {
    // Anything too short to carry the DOS magic is treated as an object and fails on the file
    // header bounds check instead.
    if medium.check_bounds(0, 2).is_err() {
        return Ok((ImageKind::Object, 0));
    }

    medium.seek(0)?;
    if medium.read_array::<2>()? != DOS_MAGIC {
        return Ok((ImageKind::Object, 0));
    }

    medium
        .check_bounds(PE_POINTER_OFFSET, 4)
        .map_err(|bounds| PeError::header(Header::Dos, MediumError::BoundsError(bounds)))?;
    medium.seek(PE_POINTER_OFFSET)?;
    let signature_offset = medium.read_u32()?;

    let signature = medium
        .read_bytes_at(u64::from(signature_offset), 4)
        .map_err(|error| PeError::header(Header::Dos, error))?;
    if signature != PE_SIGNATURE {
        let mut found = [0; 4];
        found.copy_from_slice(&signature);
        return Err(PeError::MalformedHeader {
            header: Header::Dos,
            defect: HeaderDefect::InvalidSignature(found),
        });
    }

    Ok((
        ImageKind::Image { signature_offset },
        u64::from(signature_offset) + 4,
    ))
}

/// The optional header, selected by its magic.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum OptionalHeader {
    /// The file declares an optional header size of zero.
    Absent,
    /// A PE32 optional header.
    Pe32 {
        /// The fixed fields.
        header: OptionalHeader32,
        /// The data directories following the fixed fields.
        data_directories: Vec<DataDirectory>,
    },
    /// A PE32+ optional header.
    Pe32Plus {
        /// The fixed fields.
        header: OptionalHeader64,
        /// The data directories following the fixed fields.
        data_directories: Vec<DataDirectory>,
    },
}

impl OptionalHeader {
    /// Decodes the optional header occupying all of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a [`HeaderDefect`] if the magic is unrecognized or the fields do not fit inside of
    /// `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderDefect> {
        let declared_size = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
        let Some(magic) = bytes.first_chunk::<2>() else {
            return match bytes.len() {
                0 => Ok(Self::Absent),
                _ => Err(HeaderDefect::TooSmall {
                    size: declared_size,
                    expected: 2,
                }),
            };
        };

        let too_small = |expected| HeaderDefect::TooSmall {
            size: declared_size,
            expected,
        };
        match u16::from_le_bytes(*magic) {
            PE32_MAGIC => {
                let header = OptionalHeader32::parse(bytes)
                    .ok_or(too_small(OptionalHeader32::SIZE))?;
                let data_directories = parse_data_directories(
                    &bytes[OptionalHeader32::SIZE..],
                    header.number_of_rva_and_sizes,
                )?;

                Ok(Self::Pe32 {
                    header,
                    data_directories,
                })
            }
            PE32_PLUS_MAGIC => {
                let header = OptionalHeader64::parse(bytes)
                    .ok_or(too_small(OptionalHeader64::SIZE))?;
                let data_directories = parse_data_directories(
                    &bytes[OptionalHeader64::SIZE..],
                    header.number_of_rva_and_sizes,
                )?;

                Ok(Self::Pe32Plus {
                    header,
                    data_directories,
                })
            }
            magic => Err(HeaderDefect::UnknownMagic(magic)),
        }
    }

    /// Returns the magic of the optional header, or [`None`] if it is absent.
    pub fn magic(&self) -> Option<u16> {
        match self {
            Self::Absent => None,
            Self::Pe32 { header, .. } => Some(header.magic),
            Self::Pe32Plus { header, .. } => Some(header.magic),
        }
    }

    /// Returns the alignment of sections loaded into memory.
    pub fn section_alignment(&self) -> Option<u32> {
        match self {
            Self::Absent => None,
            Self::Pe32 { header, .. } => Some(header.section_alignment),
            Self::Pe32Plus { header, .. } => Some(header.section_alignment),
        }
    }

    /// Returns the alignment of raw section data in the file.
    pub fn file_alignment(&self) -> Option<u32> {
        match self {
            Self::Absent => None,
            Self::Pe32 { header, .. } => Some(header.file_alignment),
            Self::Pe32Plus { header, .. } => Some(header.file_alignment),
        }
    }

    /// Returns the data directories, which are empty when the optional header is absent.
    pub fn data_directories(&self) -> &[DataDirectory] {
        match self {
            Self::Absent => &[],
            Self::Pe32 {
                data_directories, ..
            }
            | Self::Pe32Plus {
                data_directories, ..
            } => data_directories,
        }
    }
}

/// Decodes `count` data directories from the start of `bytes`.
fn parse_data_directories(bytes: &[u8], count: u32) -> Result<Vec<DataDirectory>, HeaderDefect> {
    let defect = HeaderDefect::DataDirectoryCount {
        count,
        available: bytes.len(),
    };

    let count = usize::try_from(count).map_err(|_| defect)?;
    let length = count.checked_mul(DataDirectory::SIZE).ok_or(defect)?;
    let directories = bytes.get(..length).ok_or(defect)?;

    Ok(directories
        .chunks_exact(DataDirectory::SIZE)
        .filter_map(DataDirectory::parse)
        .collect())
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::{Headers, ImageKind, OptionalHeader, PE32_MAGIC, PE32_PLUS_MAGIC};
    use crate::{
        error::{Header, HeaderDefect, PeError},
        medium::Medium,
        raw::{DataDirectory, FileHeader, OptionalHeader32, OptionalHeader64, Record},
    };

    fn pe32(directories: u32) -> Vec<u8> {
        let header = OptionalHeader32 {
            magic: PE32_MAGIC,
            section_alignment: 0x1000,
            file_alignment: 0x200,
            number_of_rva_and_sizes: directories,
            ..Default::default()
        };
        header.to_bytes()
    }

    #[test]
    fn empty_optional_header_is_absent() {
        let header = OptionalHeader::parse(&[]).unwrap();
        assert_eq!(header, OptionalHeader::Absent);
        assert_eq!(header.section_alignment(), None);
        assert_eq!(header.file_alignment(), None);
        assert!(header.data_directories().is_empty());
    }

    #[test]
    fn pe32_alignments() {
        let mut bytes = pe32(2);
        DataDirectory {
            virtual_address: 0x2000,
            size: 0x40,
        }
        .write(&mut bytes);
        DataDirectory::default().write(&mut bytes);

        let header = OptionalHeader::parse(&bytes).unwrap();
        assert_eq!(header.magic(), Some(PE32_MAGIC));
        assert_eq!(header.section_alignment(), Some(0x1000));
        assert_eq!(header.file_alignment(), Some(0x200));
        assert_eq!(header.data_directories().len(), 2);
        assert_eq!(header.data_directories()[0].virtual_address, 0x2000);
    }

    #[test]
    fn pe32_plus_alignments() {
        let bytes = OptionalHeader64 {
            magic: PE32_PLUS_MAGIC,
            image_base: 0x1_4000_0000,
            section_alignment: 0x2000,
            file_alignment: 0x400,
            ..Default::default()
        }
        .to_bytes();

        let header = OptionalHeader::parse(&bytes).unwrap();
        assert!(matches!(header, OptionalHeader::Pe32Plus { .. }));
        assert_eq!(header.section_alignment(), Some(0x2000));
        assert_eq!(header.file_alignment(), Some(0x400));
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let mut bytes = pe32(0);
        bytes[..2].copy_from_slice(&0x107u16.to_le_bytes());

        assert_eq!(
            OptionalHeader::parse(&bytes),
            Err(HeaderDefect::UnknownMagic(0x107))
        );
    }

    #[test]
    fn truncated_optional_header_is_rejected() {
        let bytes = pe32(0);
        assert_eq!(
            OptionalHeader::parse(&bytes[..40]),
            Err(HeaderDefect::TooSmall {
                size: 40,
                expected: OptionalHeader32::SIZE
            })
        );
        assert!(OptionalHeader::parse(&[0x0B]).is_err());
    }

    #[test]
    fn too_many_data_directories_are_rejected() {
        let bytes = pe32(16);
        assert_eq!(
            OptionalHeader::parse(&bytes),
            Err(HeaderDefect::DataDirectoryCount {
                count: 16,
                available: 0
            })
        );
    }

    #[test]
    fn object_header_starts_at_zero() {
        let bytes = FileHeader {
            machine: 0x8664,
            number_of_sections: 3,
            ..Default::default()
        }
        .to_bytes();

        let mut medium = Medium::new(Cursor::new(bytes)).unwrap();
        let headers = Headers::read(&mut medium).unwrap();
        assert_eq!(headers.kind, ImageKind::Object);
        assert_eq!(headers.file_header.number_of_sections, 3);
        assert_eq!(headers.optional_header, OptionalHeader::Absent);
        assert_eq!(headers.section_table_offset, 20);
    }

    #[test]
    fn image_header_follows_signature() {
        let mut bytes = vec![0; 0x80];
        bytes[..2].copy_from_slice(b"MZ");
        bytes[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        bytes.extend_from_slice(b"PE\0\0");

        let optional_header = pe32(0);
        FileHeader {
            machine: 0x14C,
            size_of_optional_header: u16::try_from(optional_header.len()).unwrap(),
            ..Default::default()
        }
        .write(&mut bytes);
        bytes.extend_from_slice(&optional_header);

        let mut medium = Medium::new(Cursor::new(bytes)).unwrap();
        let headers = Headers::read(&mut medium).unwrap();
        assert_eq!(
            headers.kind,
            ImageKind::Image {
                signature_offset: 0x80
            }
        );
        assert_eq!(headers.file_header.machine, 0x14C);
        assert_eq!(headers.optional_header.section_alignment(), Some(0x1000));
        assert_eq!(headers.section_table_offset, 0x84 + 20 + 96);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut bytes = vec![0; 0x48];
        bytes[..2].copy_from_slice(b"MZ");
        bytes[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        bytes[0x40..0x44].copy_from_slice(b"NE\0\0");

        let mut medium = Medium::new(Cursor::new(bytes)).unwrap();
        let error = Headers::read(&mut medium).unwrap_err();
        assert!(matches!(
            error,
            PeError::MalformedHeader {
                header: Header::Dos,
                defect: HeaderDefect::InvalidSignature(signature),
            } if &signature == b"NE\0\0"
        ));
    }

    #[test]
    fn truncated_file_header_is_rejected() {
        let mut medium = Medium::new(Cursor::new(vec![0x4C, 0x01, 0x00])).unwrap();
        let error = Headers::read(&mut medium).unwrap_err();
        assert!(matches!(
            error,
            PeError::MalformedHeader {
                header: Header::File,
                defect: HeaderDefect::OutOfBounds(_),
            }
        ));
    }

    #[test]
    fn optional_header_past_end_of_file_is_rejected() {
        let bytes = FileHeader {
            size_of_optional_header: 224,
            ..Default::default()
        }
        .to_bytes();

        let mut medium = Medium::new(Cursor::new(bytes)).unwrap();
        let error = Headers::read(&mut medium).unwrap_err();
        assert!(matches!(
            error,
            PeError::MalformedHeader {
                header: Header::Optional,
                ..
            }
        ));
    }
}
