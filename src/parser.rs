//! The error type, primitive parsers, and the DWARF format (32- vs 64-bit)
//! shared by the rest of the crate.

use std::error;
use std::fmt;
use std::result;

use crate::constants;
use crate::endianity::{EndianBuf, Endianity};
use crate::leb128;

/// An error that occurred when parsing or navigating debugging information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An error parsing an unsigned LEB128 value.
    BadUnsignedLeb128,
    /// An error parsing a signed LEB128 value.
    BadSignedLeb128,
    /// Hit the end of input before it was expected.
    UnexpectedEof,
    /// Found a length within the range of reserved values, but whose specific
    /// value we do not know.
    UnknownReservedLength,
    /// Found a compilation unit version that is not 2, 3 or 4.
    UnknownVersion,
    /// A compilation unit's length is too small to hold the mandatory header
    /// fields it is required to cover.
    UnitHeaderTooShort,
    /// A compilation unit's claimed extent runs off the end of the
    /// `.debug_info` section.
    UnitOutOfBounds,
    /// The address size in a compilation unit header does not match the
    /// address size the session was configured with. The mismatched size is
    /// attached.
    AddressSizeMismatch(u8),
    /// A compilation unit header's `.debug_abbrev` offset lies outside the
    /// `.debug_abbrev` section.
    AbbrevOffsetOutOfBounds,
    /// Found an abbreviation with a tag of zero.
    AbbreviationTagZero,
    /// Found an abbreviation whose has-children byte is neither
    /// `DW_CHILDREN_yes` nor `DW_CHILDREN_no`.
    BadHasChildren,
    /// Found an attribute specification with a form of zero.
    AttributeFormZero,
    /// Expected a zero, found something else.
    ExpectedZero,
    /// Found two abbreviations with the same code.
    DuplicateAbbreviationCode,
    /// An entry's abbreviation code has no match in the unit's abbreviation
    /// table.
    UnknownAbbreviation,
    /// A form we do not know how to measure, so the entry cannot be skipped
    /// over.
    UnknownForm(constants::DwForm),
    /// A `DW_AT_sibling` attribute whose form is not one of the unit-relative
    /// reference forms.
    UnsupportedSiblingForm(constants::DwForm),
    /// A `DW_AT_sibling` attribute that points beyond the end of its
    /// compilation unit.
    SiblingOutOfBounds,
    /// The first entry of a compilation unit is not `DW_TAG_compile_unit`.
    FirstEntryNotCompileUnit,
    /// A root entry was requested, but no compilation unit header has been
    /// consumed yet.
    NoCurrentUnit,
    /// An offset into the `.debug_info` section that no compilation unit
    /// covers.
    OffsetOutOfBounds,
    /// The section loader did not provide the named section.
    MissingSection(&'static str),
}

impl Error {
    /// A short description of the error.
    pub fn description(&self) -> &str {
        match *self {
            Error::BadUnsignedLeb128 => "An error parsing an unsigned LEB128 value",
            Error::BadSignedLeb128 => "An error parsing a signed LEB128 value",
            Error::UnexpectedEof => "Hit the end of input before it was expected",
            Error::UnknownReservedLength => "Found a reserved length value",
            Error::UnknownVersion => "Found a compilation unit version that is not 2, 3 or 4",
            Error::UnitHeaderTooShort => {
                "A compilation unit's length is too small to hold its mandatory header fields"
            }
            Error::UnitOutOfBounds => {
                "A compilation unit's claimed extent runs off the end of the .debug_info section"
            }
            Error::AddressSizeMismatch(_) => {
                "The address size in a compilation unit header does not match the configured \
                 address size"
            }
            Error::AbbrevOffsetOutOfBounds => {
                "A compilation unit header's .debug_abbrev offset lies outside the .debug_abbrev \
                 section"
            }
            Error::AbbreviationTagZero => "Found an abbreviation with a tag of zero",
            Error::BadHasChildren => {
                "Found an abbreviation whose has-children byte is not a valid value"
            }
            Error::AttributeFormZero => "Found an attribute specification with a form of zero",
            Error::ExpectedZero => "Expected a zero, found something else",
            Error::DuplicateAbbreviationCode => "Found two abbreviations with the same code",
            Error::UnknownAbbreviation => {
                "An entry's abbreviation code has no match in the unit's abbreviation table"
            }
            Error::UnknownForm(_) => "A form we do not know how to measure",
            Error::UnsupportedSiblingForm(_) => {
                "A DW_AT_sibling attribute whose form is not a unit-relative reference form"
            }
            Error::SiblingOutOfBounds => {
                "A DW_AT_sibling attribute that points beyond the end of its compilation unit"
            }
            Error::FirstEntryNotCompileUnit => {
                "The first entry of a compilation unit is not DW_TAG_compile_unit"
            }
            Error::NoCurrentUnit => "No compilation unit header has been consumed yet",
            Error::OffsetOutOfBounds => {
                "An offset into the .debug_info section that no compilation unit covers"
            }
            Error::MissingSection(_) => "The section loader did not provide the named section",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match *self {
            Error::AddressSizeMismatch(size) => {
                write!(f, "{} (found {})", self.description(), size)
            }
            Error::UnknownForm(form) | Error::UnsupportedSiblingForm(form) => {
                write!(f, "{}: {}", self.description(), form)
            }
            Error::MissingSection(name) => write!(f, "{}: {}", self.description(), name),
            _ => f.write_str(self.description()),
        }
    }
}

impl error::Error for Error {}

/// The result of a parse or navigation operation.
pub type Result<T> = result::Result<T, Error>;

/// Whether the data is the 32-bit or 64-bit flavor of DWARF.
///
/// This is a property of each compilation unit, not of the whole file; the
/// initial length field of a unit header chooses the format for that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// 64-bit DWARF
    Dwarf64,
    /// 32-bit DWARF
    Dwarf32,
}

impl Format {
    /// The size in bytes of offsets and lengths for this format.
    pub fn word_size(self) -> u8 {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 8,
        }
    }

    /// The number of bytes the initial length field occupies in this format.
    pub fn initial_length_size(self) -> u8 {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 12,
        }
    }
}

const MAX_DWARF_32_UNIT_LENGTH: u64 = 0xffff_fff0;

const DWARF_64_INITIAL_UNIT_LENGTH: u64 = 0xffff_ffff;

#[inline]
pub(crate) fn parse_u8<Endian>(input: &mut EndianBuf<Endian>) -> Result<u8>
where
    Endian: Endianity,
{
    input.read_u8()
}

#[inline]
pub(crate) fn parse_u16<Endian>(input: &mut EndianBuf<Endian>) -> Result<u16>
where
    Endian: Endianity,
{
    input.read_u16()
}

#[inline]
pub(crate) fn parse_u32<Endian>(input: &mut EndianBuf<Endian>) -> Result<u32>
where
    Endian: Endianity,
{
    input.read_u32()
}

#[inline]
pub(crate) fn parse_u64<Endian>(input: &mut EndianBuf<Endian>) -> Result<u64>
where
    Endian: Endianity,
{
    input.read_u64()
}

/// Parse an unsigned LEB128 encoded integer, advancing the buffer past it.
pub(crate) fn parse_unsigned_leb<Endian>(input: &mut EndianBuf<Endian>) -> Result<u64>
where
    Endian: Endianity,
{
    let mut buf = input.buf();
    let val = leb128::read::unsigned(&mut buf)?;
    let bytes_read = input.len() - buf.len();
    input.skip(bytes_read)?;
    Ok(val)
}

/// Parse a signed LEB128 encoded integer, advancing the buffer past it.
pub(crate) fn parse_signed_leb<Endian>(input: &mut EndianBuf<Endian>) -> Result<i64>
where
    Endian: Endianity,
{
    let mut buf = input.buf();
    let val = leb128::read::signed(&mut buf)?;
    let bytes_read = input.len() - buf.len();
    input.skip(bytes_read)?;
    Ok(val)
}

/// Parse an offset or length whose size depends on the DWARF format.
pub(crate) fn parse_word<Endian>(input: &mut EndianBuf<Endian>, format: Format) -> Result<u64>
where
    Endian: Endianity,
{
    match format {
        Format::Dwarf32 => parse_u32(input).map(u64::from),
        Format::Dwarf64 => parse_u64(input),
    }
}

/// Parse the "initial length" field found at the start of a compilation unit
/// header.
///
/// The first four bytes are either a 32-bit length, the 64-bit escape value
/// `0xffff_ffff` (in which case the next eight bytes carry the real length),
/// or a value in the reserved range `0xffff_fff0..0xffff_ffff`, which is an
/// error.
pub(crate) fn parse_initial_length<Endian>(input: &mut EndianBuf<Endian>) -> Result<(u64, Format)>
where
    Endian: Endianity,
{
    let val = u64::from(parse_u32(input)?);
    if val < MAX_DWARF_32_UNIT_LENGTH {
        Ok((val, Format::Dwarf32))
    } else if val == DWARF_64_INITIAL_UNIT_LENGTH {
        let val = parse_u64(input)?;
        Ok((val, Format::Dwarf64))
    } else {
        Err(Error::UnknownReservedLength)
    }
}

/// Convert a `u64` length read from the data into a `usize`, failing if it
/// does not fit on this platform.
#[inline]
pub(crate) fn u64_to_offset(len: u64) -> Result<usize> {
    if len <= std::usize::MAX as u64 {
        Ok(len as usize)
    } else {
        Err(Error::UnitOutOfBounds)
    }
}
