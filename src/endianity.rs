//! Types for compile-time endianity.

use byteorder::ByteOrder;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Deref, Index, Range, RangeFrom, RangeTo};

use crate::parser::{Error, Result};

/// A trait describing the endianity of some buffer.
///
/// All methods are static. You shouldn't instantiate concrete objects that
/// implement this trait, it is just used as compile-time phantom data.
pub trait Endianity: Debug + Default + Clone + Copy + PartialEq + Eq {
    /// Return true for big endian byte order.
    fn is_big_endian() -> bool;

    /// Return true for little endian byte order.
    fn is_little_endian() -> bool {
        !Self::is_big_endian()
    }

    /// Read an unsigned 16 bit integer from the start of the buffer.
    fn read_u16(buf: &[u8]) -> u16 {
        if Self::is_big_endian() {
            byteorder::BigEndian::read_u16(buf)
        } else {
            byteorder::LittleEndian::read_u16(buf)
        }
    }

    /// Read an unsigned 32 bit integer from the start of the buffer.
    fn read_u32(buf: &[u8]) -> u32 {
        if Self::is_big_endian() {
            byteorder::BigEndian::read_u32(buf)
        } else {
            byteorder::LittleEndian::read_u32(buf)
        }
    }

    /// Read an unsigned 64 bit integer from the start of the buffer.
    fn read_u64(buf: &[u8]) -> u64 {
        if Self::is_big_endian() {
            byteorder::BigEndian::read_u64(buf)
        } else {
            byteorder::LittleEndian::read_u64(buf)
        }
    }
}

/// Little endian byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LittleEndian {}

impl Default for LittleEndian {
    fn default() -> LittleEndian {
        unreachable!()
    }
}

impl Endianity for LittleEndian {
    fn is_big_endian() -> bool {
        false
    }
}

/// Big endian byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BigEndian {}

impl Default for BigEndian {
    fn default() -> BigEndian {
        unreachable!()
    }
}

impl Endianity for BigEndian {
    fn is_big_endian() -> bool {
        true
    }
}

/// The native endianity for the target platform.
#[cfg(target_endian = "little")]
pub type NativeEndian = LittleEndian;
#[cfg(target_endian = "big")]
pub type NativeEndian = BigEndian;

/// A `&[u8]` slice with compile-time endianity metadata.
///
/// Parsers advance an `EndianBuf` in place; all slicing is bounds checked, so
/// a cursor can never point outside the section it was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndianBuf<'input, Endian>
where
    Endian: Endianity,
{
    buf: &'input [u8],
    endian: PhantomData<Endian>,
}

impl<'input, Endian> EndianBuf<'input, Endian>
where
    Endian: Endianity,
{
    /// Construct a new `EndianBuf` with the given buffer.
    pub fn new(buf: &'input [u8]) -> EndianBuf<'input, Endian> {
        EndianBuf {
            buf,
            endian: PhantomData,
        }
    }

    /// Return a reference to the raw buffer.
    pub fn buf(&self) -> &'input [u8] {
        self.buf
    }

    /// The number of bytes remaining in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Return true if the buffer has no bytes remaining.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Find the first occurence of a byte in the buffer, and return its index.
    #[inline]
    pub fn find(&self, byte: u8) -> Option<usize> {
        self.buf.iter().position(|ch| *ch == byte)
    }

    /// Advance the buffer by `len` bytes.
    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<()> {
        if self.buf.len() < len {
            Err(Error::UnexpectedEof)
        } else {
            self.buf = &self.buf[len..];
            Ok(())
        }
    }

    #[inline]
    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'input [u8]> {
        if self.buf.len() < len {
            Err(Error::UnexpectedEof)
        } else {
            let val = &self.buf[..len];
            self.buf = &self.buf[len..];
            Ok(val)
        }
    }

    #[inline]
    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let slice = self.read_slice(1)?;
        Ok(slice[0])
    }

    #[inline]
    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let slice = self.read_slice(2)?;
        Ok(Endian::read_u16(slice))
    }

    #[inline]
    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let slice = self.read_slice(4)?;
        Ok(Endian::read_u32(slice))
    }

    #[inline]
    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let slice = self.read_slice(8)?;
        Ok(Endian::read_u64(slice))
    }
}

/// # Range Methods
///
/// Unfortunately, `std::ops::Index` *must* return a reference, so we can't
/// implement `Index<Range<usize>>` to return a new `EndianBuf` the way we would
/// like to. Instead, we abandon fancy indexing operators and have these plain
/// old methods.
impl<'input, Endian> EndianBuf<'input, Endian>
where
    Endian: Endianity,
{
    /// Take the given `start..end` range of the underlying buffer and return a
    /// new `EndianBuf`.
    pub fn range(&self, idx: Range<usize>) -> EndianBuf<'input, Endian> {
        EndianBuf {
            buf: &self.buf[idx],
            endian: self.endian,
        }
    }

    /// Take the given `start..` range of the underlying buffer and return a new
    /// `EndianBuf`.
    pub fn range_from(&self, idx: RangeFrom<usize>) -> EndianBuf<'input, Endian> {
        EndianBuf {
            buf: &self.buf[idx],
            endian: self.endian,
        }
    }

    /// Take the given `..end` range of the underlying buffer and return a new
    /// `EndianBuf`.
    pub fn range_to(&self, idx: RangeTo<usize>) -> EndianBuf<'input, Endian> {
        EndianBuf {
            buf: &self.buf[idx],
            endian: self.endian,
        }
    }
}

impl<'input, Endian> Index<usize> for EndianBuf<'input, Endian>
where
    Endian: Endianity,
{
    type Output = u8;
    fn index(&self, idx: usize) -> &Self::Output {
        &self.buf[idx]
    }
}

impl<'input, Endian> Deref for EndianBuf<'input, Endian>
where
    Endian: Endianity,
{
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.buf
    }
}

impl<'input, Endian> From<EndianBuf<'input, Endian>> for &'input [u8]
where
    Endian: Endianity,
{
    fn from(buf: EndianBuf<'input, Endian>) -> &'input [u8] {
        buf.buf
    }
}
