//! Functions for parsing DWARF debugging abbreviations.

use std::collections::hash_map;
use std::sync::Arc;

use crate::constants;
use crate::endianity::{EndianBuf, Endianity};
use crate::parser::{parse_u8, parse_unsigned_leb, Error, Result};

/// An offset into the `.debug_abbrev` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugAbbrevOffset(pub u64);

/// The `DebugAbbrev` struct represents the abbreviations describing
/// debugging information entries' attribute names and forms found in the
/// `.debug_abbrev` section.
#[derive(Debug, Clone, Copy)]
pub struct DebugAbbrev<'input, Endian>
where
    Endian: Endianity,
{
    debug_abbrev_section: EndianBuf<'input, Endian>,
}

impl<'input, Endian> DebugAbbrev<'input, Endian>
where
    Endian: Endianity,
{
    /// Construct a new `DebugAbbrev` instance from the data in the `.debug_abbrev`
    /// section.
    ///
    /// It is the caller's responsibility to read the `.debug_abbrev` section and
    /// present it as a `&[u8]` slice. That means using some ELF loader on
    /// Linux, a Mach-O loader on OSX, etc.
    pub fn new(debug_abbrev_section: &'input [u8]) -> DebugAbbrev<'input, Endian> {
        DebugAbbrev {
            debug_abbrev_section: EndianBuf::new(debug_abbrev_section),
        }
    }

    /// Parse the abbreviations at the given `offset` within this
    /// `.debug_abbrev` section.
    ///
    /// The `offset` should generally be retrieved from a unit header.
    pub fn abbreviations(&self, debug_abbrev_offset: DebugAbbrevOffset) -> Result<Abbreviations> {
        if debug_abbrev_offset.0 > self.debug_abbrev_section.len() as u64 {
            return Err(Error::AbbrevOffsetOutOfBounds);
        }
        let input = &mut self
            .debug_abbrev_section
            .range_from(debug_abbrev_offset.0 as usize..);
        Abbreviations::parse(input)
    }

    pub(crate) fn section(&self) -> EndianBuf<'input, Endian> {
        self.debug_abbrev_section
    }
}

impl<'input, Endian> From<&'input [u8]> for DebugAbbrev<'input, Endian>
where
    Endian: Endianity,
{
    fn from(section: &'input [u8]) -> Self {
        DebugAbbrev::new(section)
    }
}

/// A set of type abbreviations.
///
/// Construct an `Abbreviations` instance with the
/// [`abbreviations()`](struct.DebugAbbrev.html#method.abbreviations)
/// method.
#[derive(Debug, Default, Clone)]
pub struct Abbreviations {
    abbrevs: hash_map::HashMap<u64, Arc<Abbreviation>>,
}

impl Abbreviations {
    /// Construct a new, empty set of abbreviations.
    fn empty() -> Abbreviations {
        Abbreviations {
            abbrevs: hash_map::HashMap::new(),
        }
    }

    /// Insert an abbreviation into the set.
    ///
    /// Returns `Ok` if it is the first abbreviation in the set with its code,
    /// `Err` if the code is a duplicate and there already exists an
    /// abbreviation in the set with the given abbreviation's code.
    fn insert(&mut self, abbrev: Abbreviation) -> ::std::result::Result<(), ()> {
        match self.abbrevs.entry(abbrev.code) {
            hash_map::Entry::Occupied(_) => Err(()),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(Arc::new(abbrev));
                Ok(())
            }
        }
    }

    /// Get the abbreviation associated with the given code.
    #[inline]
    pub fn get(&self, code: u64) -> Option<&Arc<Abbreviation>> {
        self.abbrevs.get(&code)
    }

    /// Parse a series of abbreviations, terminated by a null abbreviation.
    fn parse<Endian>(input: &mut EndianBuf<Endian>) -> Result<Abbreviations>
    where
        Endian: Endianity,
    {
        let mut abbrevs = Abbreviations::empty();

        while let Some(abbrev) = Abbreviation::parse(input)? {
            if abbrevs.insert(abbrev).is_err() {
                return Err(Error::DuplicateAbbreviationCode);
            }
        }

        Ok(abbrevs)
    }
}

/// An abbreviation describes the shape of a debugging information entry's
/// type: its code, tag type, whether it has children, and its set of
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    code: u64,
    tag: constants::DwTag,
    has_children: constants::DwChildren,
    attributes: Vec<AttributeSpecification>,
}

impl Abbreviation {
    /// Construct a new `Abbreviation`.
    ///
    /// ### Panics
    ///
    /// Panics if `code` is `0`.
    pub fn new(
        code: u64,
        tag: constants::DwTag,
        has_children: constants::DwChildren,
        attributes: Vec<AttributeSpecification>,
    ) -> Abbreviation {
        assert!(code != 0);
        Abbreviation {
            code,
            tag,
            has_children,
            attributes,
        }
    }

    /// Get this abbreviation's code.
    #[inline]
    pub fn code(&self) -> u64 {
        self.code
    }

    /// Get this abbreviation's tag.
    #[inline]
    pub fn tag(&self) -> constants::DwTag {
        self.tag
    }

    /// Return true if this abbreviation's type has children, false otherwise.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children == constants::DW_CHILDREN_yes
    }

    /// Get this abbreviation's attributes.
    #[inline]
    pub fn attributes(&self) -> &[AttributeSpecification] {
        &self.attributes[..]
    }

    /// Parse an abbreviation's tag.
    fn parse_tag<Endian>(input: &mut EndianBuf<Endian>) -> Result<constants::DwTag>
    where
        Endian: Endianity,
    {
        let val = parse_unsigned_leb(input)?;
        if val == 0 {
            Err(Error::AbbreviationTagZero)
        } else {
            Ok(constants::DwTag(val))
        }
    }

    /// Parse an abbreviation's "does the type have children?" byte.
    fn parse_has_children<Endian>(input: &mut EndianBuf<Endian>) -> Result<constants::DwChildren>
    where
        Endian: Endianity,
    {
        let val = constants::DwChildren(parse_u8(input)?);
        if val == constants::DW_CHILDREN_no || val == constants::DW_CHILDREN_yes {
            Ok(val)
        } else {
            Err(Error::BadHasChildren)
        }
    }

    /// Parse a series of attribute specifications, terminated by a null attribute
    /// specification.
    fn parse_attributes<Endian>(
        input: &mut EndianBuf<Endian>,
    ) -> Result<Vec<AttributeSpecification>>
    where
        Endian: Endianity,
    {
        let mut attrs = Vec::new();

        while let Some(attr) = AttributeSpecification::parse(input)? {
            attrs.push(attr);
        }

        Ok(attrs)
    }

    /// Parse an abbreviation. Returns `None` for the null abbreviation that
    /// terminates a series.
    fn parse<Endian>(input: &mut EndianBuf<Endian>) -> Result<Option<Abbreviation>>
    where
        Endian: Endianity,
    {
        let code = parse_unsigned_leb(input)?;
        if code == 0 {
            return Ok(None);
        }

        let tag = Self::parse_tag(input)?;
        let has_children = Self::parse_has_children(input)?;
        let attributes = Self::parse_attributes(input)?;
        Ok(Some(Abbreviation::new(code, tag, has_children, attributes)))
    }
}

/// The description of an attribute in an abbreviated type. It is a pair of name
/// and form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpecification {
    name: constants::DwAt,
    form: constants::DwForm,
}

impl AttributeSpecification {
    /// Construct a new `AttributeSpecification` from the given name and form.
    pub fn new(name: constants::DwAt, form: constants::DwForm) -> AttributeSpecification {
        AttributeSpecification { name, form }
    }

    /// Get the attribute's name.
    #[inline]
    pub fn name(&self) -> constants::DwAt {
        self.name
    }

    /// Get the attribute's form.
    #[inline]
    pub fn form(&self) -> constants::DwForm {
        self.form
    }

    /// Parse an attribute specification. Returns `None` for the null
    /// specification that terminates an abbreviation's attribute list.
    fn parse<Endian>(input: &mut EndianBuf<Endian>) -> Result<Option<AttributeSpecification>>
    where
        Endian: Endianity,
    {
        let name = parse_unsigned_leb(input)?;
        let form = parse_unsigned_leb(input)?;
        match (name, form) {
            (0, 0) => Ok(None),
            (0, _) => Err(Error::ExpectedZero),
            (_, 0) => Err(Error::AttributeFormZero),
            _ => Ok(Some(AttributeSpecification::new(
                constants::DwAt(name),
                constants::DwForm(form),
            ))),
        }
    }
}
