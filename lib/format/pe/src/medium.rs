//! Positioned little-endian reads over a seekable byte source.

use core::{error, fmt};
use std::io::{self, Read, Seek, SeekFrom};

use crate::{raw::Record, u64_to_usize, usize_to_u64};

/// A seekable byte source with a fixed size, read in little-endian.
///
/// The size is captured once when the [`Medium`] is created. The underlying source must not
/// change size while it is being read.
#[derive(Debug)]
pub struct Medium<R> {
    /// The underlying source of bytes.
    inner: R,
    /// The number of bytes available in `inner`.
    size: u64,
}

impl<R: Read + Seek> Medium<R> {
    /// Wraps `inner`, recording the number of bytes it contains.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if seeking `inner` fails.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.rewind()?;

        Ok(Self { inner, size })
    }

    /// The number of bytes available to be read.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Checks that the region of `length` bytes at `offset` lies inside of the [`Medium`].
    ///
    /// # Errors
    ///
    /// Returns a [`BoundsError`] if `offset + length` overflows or exceeds [`Medium::size()`].
    pub fn check_bounds(&self, offset: u64, length: u64) -> Result<(), BoundsError> {
        check_bounds(self.size, offset, length)
    }

    /// Moves the read position to the absolute `offset`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the underlying source cannot be seeked.
    pub fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Fills `buf` from the current position.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the underlying source fails or ends before `buf` is filled.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact(buf)
    }

    /// Reads `N` bytes from the current position.
    ///
    /// # Errors
    ///
    /// See [`Medium::read_exact()`].
    pub fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a little-endian `u16` from the current position.
    ///
    /// # Errors
    ///
    /// See [`Medium::read_exact()`].
    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32` from the current position.
    ///
    /// # Errors
    ///
    /// See [`Medium::read_exact()`].
    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads the `length` bytes located at `offset`.
    ///
    /// The region is bounds checked before anything is allocated, so a corrupt length cannot
    /// trigger an oversized allocation.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: The region does not fit inside the [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying source failed.
    pub fn read_bytes_at(&mut self, offset: u64, length: u64) -> Result<Vec<u8>, MediumError> {
        self.check_bounds(offset, length)?;

        let mut bytes = vec![0; u64_to_usize(length)];
        self.seek(offset)?;
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads `count` contiguous, packed [`Record`]s located at `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: The array does not fit inside the [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying source failed.
    pub fn read_records<T: Record>(
        &mut self,
        offset: u64,
        count: u64,
    ) -> Result<Vec<T>, MediumError> {
        let record_size = usize_to_u64(T::SIZE);
        let length = count.checked_mul(record_size).ok_or(BoundsError {
            offset,
            length: u64::MAX,
            size: self.size,
        })?;

        let bytes = self.read_bytes_at(offset, length)?;
        let records = bytes
            .chunks_exact(T::SIZE)
            .filter_map(T::parse)
            .collect::<Vec<_>>();

        Ok(records)
    }
}

/// Various errors that can occur when reading from a [`Medium`].
#[derive(Debug)]
pub enum MediumError {
    /// The requested region is outside of the bounds of the [`Medium`].
    BoundsError(BoundsError),
    /// The underlying source returned an error.
    UnderlyingError(io::Error),
}

impl From<BoundsError> for MediumError {
    fn from(value: BoundsError) -> Self {
        Self::BoundsError(value)
    }
}

impl From<io::Error> for MediumError {
    fn from(value: io::Error) -> Self {
        Self::UnderlyingError(value)
    }
}

impl fmt::Display for MediumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundsError(error) => fmt::Display::fmt(error, f),
            Self::UnderlyingError(error) => write!(f, "error reading file: {error}"),
        }
    }
}

impl error::Error for MediumError {}

/// A requested region does not fit inside of a [`Medium`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct BoundsError {
    /// The offset, in bytes, of the start of the requested region.
    pub offset: u64,
    /// The size, in bytes, of the requested region.
    pub length: u64,
    /// The actual size of the [`Medium`].
    pub size: u64,
}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            offset,
            length,
            size,
        } = self;
        write!(
            f,
            "region at offset {offset:#x} with a length of {length} bytes \
            does not fit inside file of {size} bytes"
        )
    }
}

impl error::Error for BoundsError {}

/// Utility function to centralize bounds checking.
///
/// # Errors
///
/// Returns a [`BoundsError`] if `offset + length` overflows or exceeds `size`.
pub fn check_bounds(size: u64, offset: u64, length: u64) -> Result<(), BoundsError> {
    let error = BoundsError {
        offset,
        length,
        size,
    };

    let max_offset = offset.checked_add(length).ok_or(error)?;
    if max_offset > size {
        return Err(error);
    }

    Ok(())
}
