//! Compilation unit headers and the registry of parsed units.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::abbrev::{Abbreviations, DebugAbbrev, DebugAbbrevOffset};
use crate::endianity::{EndianBuf, Endianity};
use crate::lazy::LazyArc;
use crate::parser::{
    parse_initial_length, parse_u16, parse_u8, parse_word, Error, Format, Result,
};

/// An offset into the `.debug_info` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DebugInfoOffset(pub usize);

/// The `DebugInfo` struct represents the DWARF debugging information found in
/// the `.debug_info` section.
#[derive(Debug, Clone, Copy)]
pub struct DebugInfo<'input, Endian>
where
    Endian: Endianity,
{
    debug_info_section: EndianBuf<'input, Endian>,
}

impl<'input, Endian> DebugInfo<'input, Endian>
where
    Endian: Endianity,
{
    /// Construct a new `DebugInfo` instance from the data in the `.debug_info`
    /// section.
    ///
    /// It is the caller's responsibility to read the `.debug_info` section and
    /// present it as a `&[u8]` slice. That means using some ELF loader on
    /// Linux, a Mach-O loader on OSX, etc.
    pub fn new(debug_info_section: &'input [u8]) -> DebugInfo<'input, Endian> {
        DebugInfo {
            debug_info_section: EndianBuf::new(debug_info_section),
        }
    }

    pub(crate) fn section(&self) -> EndianBuf<'input, Endian> {
        self.debug_info_section
    }
}

impl<'input, Endian> From<&'input [u8]> for DebugInfo<'input, Endian>
where
    Endian: Endianity,
{
    fn from(section: &'input [u8]) -> Self {
        DebugInfo::new(section)
    }
}

/// The parsed header of a compilation unit, along with the unit's lazily
/// decoded abbreviations.
///
/// A `CuContext` is created at most once per unit per session; every entry
/// handle within a unit shares the same `Arc<CuContext>`.
#[derive(Debug)]
pub struct CuContext {
    offset: DebugInfoOffset,
    unit_length: u64,
    format: Format,
    version: u16,
    debug_abbrev_offset: DebugAbbrevOffset,
    address_size: u8,
    abbrevs: LazyArc<Abbreviations>,
}

impl CuContext {
    /// Parse and validate the unit header at `offset` in the `.debug_info`
    /// section.
    ///
    /// `address_size` is the pointer width the session was configured with,
    /// and `debug_abbrev_len` is the size of the `.debug_abbrev` section,
    /// which bounds the header's abbreviations offset.
    pub(crate) fn parse<Endian>(
        section: EndianBuf<Endian>,
        offset: DebugInfoOffset,
        address_size: u8,
        debug_abbrev_len: u64,
    ) -> Result<CuContext>
    where
        Endian: Endianity,
    {
        let input = &mut section.range_from(offset.0..);
        let (unit_length, format) = parse_initial_length(input)?;
        let version = parse_u16(input)?;
        let debug_abbrev_offset = DebugAbbrevOffset(parse_word(input, format)?);
        let unit_address_size = parse_u8(input)?;

        // The claimed length must cover the version, abbreviations offset and
        // address size fields, and the whole unit must lie within the section.
        let sizeof_fields = 2 + u64::from(format.word_size()) + 1;
        if unit_length < sizeof_fields {
            return Err(Error::UnitHeaderTooShort);
        }
        let end = (offset.0 as u64)
            .checked_add(u64::from(format.initial_length_size()))
            .and_then(|n| n.checked_add(unit_length))
            .ok_or(Error::UnitOutOfBounds)?;
        if end > section.len() as u64 {
            return Err(Error::UnitOutOfBounds);
        }

        if unit_address_size != address_size {
            return Err(Error::AddressSizeMismatch(unit_address_size));
        }

        if version < 2 || version > 4 {
            return Err(Error::UnknownVersion);
        }

        if debug_abbrev_offset.0 >= debug_abbrev_len {
            return Err(Error::AbbrevOffsetOutOfBounds);
        }

        Ok(CuContext {
            offset,
            unit_length,
            format,
            version,
            debug_abbrev_offset,
            address_size,
            abbrevs: LazyArc::default(),
        })
    }

    /// The offset of this unit's header within the `.debug_info` section.
    pub fn offset(&self) -> DebugInfoOffset {
        self.offset
    }

    /// Get the length of the debugging info for this compilation unit, not
    /// including the initial length field itself.
    pub fn unit_length(&self) -> u64 {
        self.unit_length
    }

    /// Whether this unit is encoded in 32- or 64-bit DWARF.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Get the DWARF version stamp for this compilation unit.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The offset into the `.debug_abbrev` section for this compilation unit's
    /// abbreviations.
    pub fn debug_abbrev_offset(&self) -> DebugAbbrevOffset {
        self.debug_abbrev_offset
    }

    /// The size of addresses (in bytes) in this compilation unit.
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// Get the length of the debugging info for this compilation unit,
    /// including the byte length of the encoded length itself.
    pub fn length_including_self(&self) -> u64 {
        u64::from(self.format.initial_length_size()) + self.unit_length
    }

    /// The number of bytes the header itself occupies, up to the first entry.
    pub fn header_size(&self) -> usize {
        usize::from(self.format.initial_length_size())
            + 2
            + usize::from(self.format.word_size())
            + 1
    }

    /// Return the number of bytes a header occupies at minimum in the given
    /// format. Anything shorter cannot be a unit header at all.
    pub(crate) fn size_of_header(format: Format) -> usize {
        match format {
            // initial length + version + abbrev offset + address size
            Format::Dwarf32 => 4 + 2 + 4 + 1,
            Format::Dwarf64 => 12 + 2 + 8 + 1,
        }
    }

    /// The offset one past the last byte of this unit, which is also the
    /// offset of the next unit's header, if any.
    pub fn end_offset(&self) -> DebugInfoOffset {
        // Validated against the section length at parse time, so the sum
        // cannot overflow.
        DebugInfoOffset(self.offset.0 + self.length_including_self() as usize)
    }

    /// The offset of this unit's first entry, the root of its tree.
    pub fn first_entry_offset(&self) -> DebugInfoOffset {
        DebugInfoOffset(self.offset.0 + self.header_size())
    }

    /// Whether the given `.debug_info` offset falls within this unit's extent
    /// (header included).
    pub fn contains(&self, offset: DebugInfoOffset) -> bool {
        self.offset <= offset && offset < self.end_offset()
    }

    /// Get this unit's abbreviations, decoding them on first use.
    pub fn abbreviations<'input, Endian>(
        &self,
        debug_abbrev: &DebugAbbrev<'input, Endian>,
    ) -> Result<Arc<Abbreviations>>
    where
        Endian: Endianity,
    {
        self.abbrevs
            .get(|| debug_abbrev.abbreviations(self.debug_abbrev_offset))
    }
}

/// All compilation units parsed so far, keyed by their starting offset in the
/// `.debug_info` section.
///
/// One map serves both sequential iteration and offset lookup; a unit parsed
/// by either path is found by the other, and a given offset can never be
/// registered twice. `current` is the cursor for sequential iteration, and
/// `last_offset` is the end of the furthest unit parsed so far, the point
/// where a forward scan for an uncovered offset must resume.
#[derive(Debug, Default)]
pub(crate) struct UnitRegistry {
    units: BTreeMap<usize, Arc<CuContext>>,
    current: Option<usize>,
    last_offset: usize,
}

impl UnitRegistry {
    /// Find the already-parsed unit covering `offset`, if any.
    pub(crate) fn find(&self, offset: DebugInfoOffset) -> Option<Arc<CuContext>> {
        self.units
            .range(..=offset.0)
            .next_back()
            .map(|(_, cu)| cu)
            .filter(|cu| cu.contains(offset))
            .cloned()
    }

    pub(crate) fn insert(&mut self, cu: &Arc<CuContext>) {
        let end = cu.end_offset().0;
        self.units.insert(cu.offset().0, cu.clone());
        if end > self.last_offset {
            self.last_offset = end;
        }
    }

    /// The unit sequential iteration is currently positioned on.
    pub(crate) fn current(&self) -> Option<Arc<CuContext>> {
        self.current.and_then(|offset| self.units.get(&offset).cloned())
    }

    pub(crate) fn set_current(&mut self, cu: &Arc<CuContext>) {
        self.current = Some(cu.offset().0);
    }

    /// Reset the sequential cursor so iteration restarts from the first unit.
    pub(crate) fn clear_current(&mut self) {
        self.current = None;
    }

    /// One past the end of the furthest unit parsed so far.
    pub(crate) fn last_offset(&self) -> usize {
        self.last_offset
    }
}
