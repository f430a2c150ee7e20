//! Debugging information entry handles and the single-entry navigation step.

use std::sync::Arc;

use crate::abbrev::{Abbreviation, Abbreviations, AttributeSpecification};
use crate::constants;
use crate::endianity::{EndianBuf, Endianity};
use crate::parser::{
    parse_signed_leb, parse_u16, parse_u32, parse_u64, parse_u8, parse_unsigned_leb, u64_to_offset,
    Error, Result,
};
use crate::unit::{CuContext, DebugInfoOffset};

/// A handle to a debugging information entry in the `.debug_info` section.
///
/// A `Die` owns shared references to its compilation unit's context and its
/// abbreviation, so it stays valid for as long as the caller keeps it, and
/// every entry of a unit resolves to the identical `Arc<CuContext>`.
#[derive(Debug, Clone)]
pub struct Die {
    offset: DebugInfoOffset,
    cu: Arc<CuContext>,
    abbrev: Arc<Abbreviation>,
}

impl Die {
    pub(crate) fn new(
        offset: DebugInfoOffset,
        cu: Arc<CuContext>,
        abbrev: Arc<Abbreviation>,
    ) -> Die {
        Die { offset, cu, abbrev }
    }

    /// The offset of this entry within the `.debug_info` section.
    pub fn offset(&self) -> DebugInfoOffset {
        self.offset
    }

    /// This entry's tag.
    pub fn tag(&self) -> constants::DwTag {
        self.abbrev.tag()
    }

    /// Whether this entry declares children.
    pub fn has_children(&self) -> bool {
        self.abbrev.has_children()
    }

    /// This entry's abbreviation code.
    pub fn code(&self) -> u64 {
        self.abbrev.code()
    }

    /// The attribute specifications describing this entry's attributes.
    pub fn attributes(&self) -> &[AttributeSpecification] {
        self.abbrev.attributes()
    }

    /// The compilation unit this entry belongs to.
    pub fn cu(&self) -> &CuContext {
        &self.cu
    }

    pub(crate) fn cu_arc(&self) -> &Arc<CuContext> {
        &self.cu
    }
}

/// Decode the entry at `offset` far enough to step past it.
///
/// Returns `None` if the entry is a null entry, and otherwise the offset just
/// past the entry's attribute values together with its has-children flag.
///
/// When `honor_sibling` is set and the entry carries a `DW_AT_sibling`
/// attribute, the returned offset is the sibling target instead, with the
/// has-children flag forced to false since the target is already past any
/// children. Sibling targets must use a unit-relative reference form and may
/// not point beyond the unit's extent; landing exactly on the extent's end is
/// legal and means the chain is exhausted.
pub(crate) fn next_die_offset<Endian>(
    section: EndianBuf<Endian>,
    cu: &CuContext,
    abbrevs: &Abbreviations,
    offset: DebugInfoOffset,
    honor_sibling: bool,
) -> Result<Option<(DebugInfoOffset, bool)>>
where
    Endian: Endianity,
{
    let die_end = cu.end_offset().0;
    let input = &mut section.range(offset.0..die_end);

    let code = parse_unsigned_leb(input)?;
    if code == 0 {
        return Ok(None);
    }
    let abbrev = abbrevs.get(code).ok_or(Error::UnknownAbbreviation)?;
    let has_children = abbrev.has_children();

    for spec in abbrev.attributes() {
        let mut form = spec.form();
        if form == constants::DW_FORM_indirect {
            form = constants::DwForm(parse_unsigned_leb(input)?);
        }

        if honor_sibling && spec.name() == constants::DW_AT_sibling {
            let sibling = match form {
                constants::DW_FORM_ref1 => u64::from(parse_u8(input)?),
                constants::DW_FORM_ref2 => u64::from(parse_u16(input)?),
                constants::DW_FORM_ref4 => u64::from(parse_u32(input)?),
                constants::DW_FORM_ref8 => parse_u64(input)?,
                constants::DW_FORM_ref_udata => parse_unsigned_leb(input)?,
                otherwise => return Err(Error::UnsupportedSiblingForm(otherwise)),
            };
            // Sibling targets are relative to the start of the unit's header.
            let target = (cu.offset().0 as u64)
                .checked_add(sibling)
                .ok_or(Error::SiblingOutOfBounds)?;
            if target > die_end as u64 {
                return Err(Error::SiblingOutOfBounds);
            }
            return Ok(Some((DebugInfoOffset(target as usize), false)));
        }

        skip_form_value(input, form, cu)?;
    }

    Ok(Some((DebugInfoOffset(die_end - input.len()), has_children)))
}

/// Skip over a single attribute value of the given form.
fn skip_form_value<Endian>(
    input: &mut EndianBuf<Endian>,
    form: constants::DwForm,
    cu: &CuContext,
) -> Result<()>
where
    Endian: Endianity,
{
    match form {
        constants::DW_FORM_flag_present => Ok(()),

        constants::DW_FORM_data1 | constants::DW_FORM_ref1 | constants::DW_FORM_flag => {
            input.skip(1)
        }
        constants::DW_FORM_data2 | constants::DW_FORM_ref2 => input.skip(2),
        constants::DW_FORM_data4 | constants::DW_FORM_ref4 => input.skip(4),
        constants::DW_FORM_data8 | constants::DW_FORM_ref8 | constants::DW_FORM_ref_sig8 => {
            input.skip(8)
        }

        constants::DW_FORM_addr => input.skip(usize::from(cu.address_size())),

        constants::DW_FORM_strp | constants::DW_FORM_sec_offset | constants::DW_FORM_ref_addr => {
            input.skip(usize::from(cu.format().word_size()))
        }

        constants::DW_FORM_block1 => {
            let len = usize::from(parse_u8(input)?);
            input.skip(len)
        }
        constants::DW_FORM_block2 => {
            let len = usize::from(parse_u16(input)?);
            input.skip(len)
        }
        constants::DW_FORM_block4 => {
            let len = u64_to_offset(u64::from(parse_u32(input)?))?;
            input.skip(len)
        }
        constants::DW_FORM_block | constants::DW_FORM_exprloc => {
            let len = u64_to_offset(parse_unsigned_leb(input)?)?;
            input.skip(len)
        }

        constants::DW_FORM_string => match input.find(0) {
            Some(idx) => input.skip(idx + 1),
            None => Err(Error::UnexpectedEof),
        },

        constants::DW_FORM_sdata => parse_signed_leb(input).map(|_| ()),
        constants::DW_FORM_udata | constants::DW_FORM_ref_udata => {
            parse_unsigned_leb(input).map(|_| ())
        }

        otherwise => Err(Error::UnknownForm(otherwise)),
    }
}
