//! The navigation session: section loading, unit iteration, and entry
//! navigation.

use std::result;
use std::sync::Arc;

use fallible_iterator::FallibleIterator;
use log::debug;

use crate::abbrev::DebugAbbrev;
use crate::constants;
use crate::die::{next_die_offset, Die};
use crate::endianity::Endianity;
use crate::parser::{parse_unsigned_leb, Error, Format, Result};
use crate::unit::{CuContext, DebugInfo, DebugInfoOffset, UnitRegistry};
use crate::Section;

/// A source of section data, so a `Session` can pull in sections on first
/// use rather than having every section read up front.
///
/// Return `Ok(None)` when the named section does not exist; the session turns
/// that into a `MissingSection` error only when the section is actually
/// needed.
pub trait SectionLoader<'input> {
    /// Load the named section's data.
    fn load_section(&mut self, name: &'static str) -> Result<Option<&'input [u8]>>;
}

/// A `SectionLoader` over sections that have already been read into memory.
#[derive(Debug, Clone, Copy)]
pub struct PreloadedSections<'input> {
    debug_info: &'input [u8],
    debug_abbrev: &'input [u8],
}

impl<'input> PreloadedSections<'input> {
    /// Construct a loader serving the given `.debug_info` and `.debug_abbrev`
    /// section contents.
    pub fn new(debug_info: &'input [u8], debug_abbrev: &'input [u8]) -> PreloadedSections<'input> {
        PreloadedSections {
            debug_info,
            debug_abbrev,
        }
    }
}

impl<'input> SectionLoader<'input> for PreloadedSections<'input> {
    fn load_section(&mut self, name: &'static str) -> Result<Option<&'input [u8]>> {
        match name {
            ".debug_info" => Ok(Some(self.debug_info)),
            ".debug_abbrev" => Ok(Some(self.debug_abbrev)),
            _ => Ok(None),
        }
    }
}

/// A navigation session over the compilation units and debugging information
/// entries of a `.debug_info` section.
///
/// The session lazily loads sections, parses unit headers on demand, and
/// remembers every unit it has seen, so revisiting a unit never re-parses it.
/// All iteration state lives here; two sessions over the same sections are
/// fully independent.
#[derive(Debug)]
pub struct Session<'input, Endian, L = PreloadedSections<'input>>
where
    Endian: Endianity,
    L: SectionLoader<'input>,
{
    loader: L,
    address_size: u8,
    debug_info: Option<DebugInfo<'input, Endian>>,
    debug_abbrev: Option<DebugAbbrev<'input, Endian>>,
    units: UnitRegistry,
}

impl<'input, Endian> Session<'input, Endian, PreloadedSections<'input>>
where
    Endian: Endianity,
{
    /// Construct a session directly over in-memory section contents.
    ///
    /// `address_size` is the pointer width, in bytes, that every unit header
    /// is expected to declare.
    pub fn from_sections(
        debug_info: &'input [u8],
        debug_abbrev: &'input [u8],
        address_size: u8,
    ) -> Session<'input, Endian, PreloadedSections<'input>> {
        Session::new(PreloadedSections::new(debug_info, debug_abbrev), address_size)
    }
}

impl<'input, Endian, L> Session<'input, Endian, L>
where
    Endian: Endianity,
    L: SectionLoader<'input>,
{
    /// Construct a session that pulls section data from the given loader on
    /// first use.
    pub fn new(loader: L, address_size: u8) -> Session<'input, Endian, L> {
        Session {
            loader,
            address_size,
            debug_info: None,
            debug_abbrev: None,
            units: UnitRegistry::default(),
        }
    }

    fn load<S>(loader: &mut L) -> Result<S>
    where
        S: Section<'input>,
    {
        let name = S::section_name();
        match loader.load_section(name)? {
            Some(data) => {
                debug!("loaded {} ({} bytes)", name, data.len());
                Ok(S::from(data))
            }
            None => Err(Error::MissingSection(name)),
        }
    }

    /// Both sections, loading them on the first call.
    fn sections(&mut self) -> Result<(DebugInfo<'input, Endian>, DebugAbbrev<'input, Endian>)> {
        let debug_info = match self.debug_info {
            Some(debug_info) => debug_info,
            None => {
                let debug_info = Self::load::<DebugInfo<Endian>>(&mut self.loader)?;
                self.debug_info = Some(debug_info);
                debug_info
            }
        };
        let debug_abbrev = match self.debug_abbrev {
            Some(debug_abbrev) => debug_abbrev,
            None => {
                let debug_abbrev = Self::load::<DebugAbbrev<Endian>>(&mut self.loader)?;
                self.debug_abbrev = Some(debug_abbrev);
                debug_abbrev
            }
        };
        Ok((debug_info, debug_abbrev))
    }

    fn find_or_register_cu(
        &mut self,
        debug_info: DebugInfo<'input, Endian>,
        debug_abbrev: DebugAbbrev<'input, Endian>,
        offset: DebugInfoOffset,
    ) -> Result<Arc<CuContext>> {
        if let Some(cu) = self.units.find(offset) {
            return Ok(cu);
        }
        let cu = Arc::new(CuContext::parse(
            debug_info.section(),
            offset,
            self.address_size,
            debug_abbrev.section().len() as u64,
        )?);
        debug!(
            "registered compilation unit at {:#x} (length {:#x}, version {})",
            offset.0,
            cu.unit_length(),
            cu.version()
        );
        self.units.insert(&cu);
        Ok(cu)
    }

    /// Advance to the next compilation unit and return its parsed header.
    ///
    /// Returns `Ok(None)` when no units remain; the sequential cursor then
    /// resets, so the next call starts over from the first unit. A unit
    /// already registered by [`die_at_offset`](Session::die_at_offset) is
    /// reused rather than re-parsed.
    pub fn next_cu_header(&mut self) -> Result<Option<Arc<CuContext>>> {
        let (debug_info, debug_abbrev) = self.sections()?;

        let next_offset = match self.units.current() {
            Some(cu) => cu.end_offset().0,
            None => 0,
        };
        let remaining = debug_info.section().len().checked_sub(next_offset);
        if remaining.map_or(true, |n| n < CuContext::size_of_header(Format::Dwarf32)) {
            self.units.clear_current();
            return Ok(None);
        }

        let cu = self.find_or_register_cu(debug_info, debug_abbrev, DebugInfoOffset(next_offset))?;
        self.units.set_current(&cu);
        Ok(Some(cu))
    }

    /// An iterator over the compilation unit headers, starting from the
    /// session's current position.
    pub fn cu_headers<'session>(&'session mut self) -> CuHeaders<'session, 'input, Endian, L> {
        CuHeaders { session: self }
    }

    /// The entry following `die` at the same depth of its unit's tree,
    /// skipping over any children of `die`.
    ///
    /// With `None`, returns the root entry of the unit most recently returned
    /// by [`next_cu_header`](Session::next_cu_header); it is an error if no
    /// unit has been consumed yet (`NoCurrentUnit`) or if the root entry is
    /// not a `DW_TAG_compile_unit` (`FirstEntryNotCompileUnit`).
    ///
    /// Returns `Ok(None)` when `die` is the last entry among its siblings.
    pub fn sibling_of(&mut self, die: Option<&Die>) -> Result<Option<Die>> {
        let (debug_info, debug_abbrev) = self.sections()?;

        let die = match die {
            None => {
                let cu = self.units.current().ok_or(Error::NoCurrentUnit)?;
                let offset = cu.first_entry_offset();
                return self.entry_at(&cu, offset, true);
            }
            Some(die) => die,
        };

        let section = debug_info.section();
        let cu = die.cu_arc().clone();
        let abbrevs = cu.abbreviations(&debug_abbrev)?;
        let cu_end = cu.end_offset().0;

        // Walk forward one entry at a time, tracking how far below the
        // starting depth we are. Entries with children push us down a level;
        // each null entry in a run pops one level. When the depth returns to
        // zero we have arrived at the starting entry's next sibling, or at
        // the end of its chain.
        let mut offset = die.offset().0;
        let mut depth: isize = 0;
        loop {
            let (next, mut has_children) =
                match next_die_offset(section, &cu, &abbrevs, DebugInfoOffset(offset), true)? {
                    Some(step) => step,
                    None => return Ok(None),
                };
            let mut pos = next.0;

            // An entry that declares children but is immediately followed by
            // a null entry has no children in fact; consume the null and
            // leave the depth alone.
            if has_children && pos < cu_end && section[pos] == 0 {
                pos += 1;
                has_children = false;
            }

            if pos >= cu_end || section[pos] == 0 {
                while depth > 0 && pos < cu_end && section[pos] == 0 {
                    depth -= 1;
                    pos += 1;
                }
            } else if has_children {
                depth += 1;
            }

            offset = pos;
            if depth == 0 {
                break;
            }
        }

        if offset >= cu_end || section[offset] == 0 {
            return Ok(None);
        }
        self.entry_at(&cu, DebugInfoOffset(offset), false)
    }

    /// The first child of `die`, or `Ok(None)` if it has none.
    pub fn child_of(&mut self, die: &Die) -> Result<Option<Die>> {
        let (debug_info, debug_abbrev) = self.sections()?;

        let cu = die.cu_arc().clone();
        let abbrevs = cu.abbreviations(&debug_abbrev)?;
        match next_die_offset(
            debug_info.section(),
            &cu,
            &abbrevs,
            die.offset(),
            false,
        )? {
            Some((next, true)) if next.0 < cu.end_offset().0 => {
                self.entry_at(&cu, next, false)
            }
            _ => Ok(None),
        }
    }

    /// The entry at the given `.debug_info` offset.
    ///
    /// Any unit headers between the furthest unit parsed so far and the
    /// requested offset are parsed and registered along the way, without
    /// disturbing the sequential cursor. Returns `Ok(None)` if the offset
    /// holds a null entry, and `OffsetOutOfBounds` if it lies beyond the
    /// section or past the last unit.
    pub fn die_at_offset(&mut self, offset: DebugInfoOffset) -> Result<Option<Die>> {
        let (debug_info, debug_abbrev) = self.sections()?;

        if offset.0 >= debug_info.section().len() {
            return Err(Error::OffsetOutOfBounds);
        }

        let cu = match self.units.find(offset) {
            Some(cu) => cu,
            None => {
                // Parse forward from the furthest unit seen until one covers
                // the requested offset.
                let mut next_offset = self.units.last_offset();
                loop {
                    let remaining = debug_info.section().len().checked_sub(next_offset);
                    if remaining.map_or(true, |n| n < CuContext::size_of_header(Format::Dwarf32)) {
                        return Err(Error::OffsetOutOfBounds);
                    }
                    let cu = self.find_or_register_cu(
                        debug_info,
                        debug_abbrev,
                        DebugInfoOffset(next_offset),
                    )?;
                    next_offset = cu.end_offset().0;
                    if offset.0 < next_offset {
                        break cu;
                    }
                }
            }
        };

        self.entry_at(&cu, offset, false)
    }

    /// Decode the entry at `offset`, which must lie within `cu`'s extent.
    ///
    /// Returns `Ok(None)` for a null entry. A root entry must be a
    /// `DW_TAG_compile_unit`.
    fn entry_at(
        &mut self,
        cu: &Arc<CuContext>,
        offset: DebugInfoOffset,
        is_root: bool,
    ) -> Result<Option<Die>> {
        let (debug_info, debug_abbrev) = self.sections()?;

        let input = &mut debug_info.section().range(offset.0..cu.end_offset().0);
        let code = parse_unsigned_leb(input)?;
        if code == 0 {
            return Ok(None);
        }

        let abbrevs = cu.abbreviations(&debug_abbrev)?;
        let abbrev = abbrevs
            .get(code)
            .cloned()
            .ok_or(Error::UnknownAbbreviation)?;
        if is_root && abbrev.tag() != constants::DW_TAG_compile_unit {
            return Err(Error::FirstEntryNotCompileUnit);
        }

        Ok(Some(Die::new(offset, cu.clone(), abbrev)))
    }
}

/// An iterator over the compilation unit headers of a session's
/// `.debug_info` section.
///
/// Constructed with [`Session::cu_headers`].
#[derive(Debug)]
pub struct CuHeaders<'session, 'input, Endian, L>
where
    Endian: Endianity,
    L: SectionLoader<'input>,
{
    session: &'session mut Session<'input, Endian, L>,
}

impl<'session, 'input, Endian, L> FallibleIterator for CuHeaders<'session, 'input, Endian, L>
where
    Endian: Endianity,
    L: SectionLoader<'input>,
{
    type Item = Arc<CuContext>;
    type Error = Error;

    fn next(&mut self) -> result::Result<Option<Arc<CuContext>>, Error> {
        self.session.next_cu_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endianity::LittleEndian;
    use std::cell::Cell;

    // Abbreviations used throughout:
    //   1: compile_unit, children, [name/string]
    //   2: subprogram, children, [name/string]
    //   3: variable, no children, [name/string]
    #[cfg_attr(rustfmt, rustfmt_skip)]
    const ABBREV_BUF: &[u8] = &[
        0x01, 0x11, 0x01, 0x03, 0x08, 0x00, 0x00,
        0x02, 0x2e, 0x01, 0x03, 0x08, 0x00, 0x00,
        0x03, 0x34, 0x00, 0x03, 0x08, 0x00, 0x00,
        0x00,
    ];

    // Two compilation units:
    //
    //   CU 1 at offset 0 (header 11 bytes):
    //     11: DW_TAG_compile_unit "a", children
    //     14:   DW_TAG_variable "b"
    //     17:   null
    //   CU 2 at offset 18 (header 11 bytes):
    //     29: DW_TAG_compile_unit "c", children
    //     32:   DW_TAG_variable "d"
    //     35:   null
    #[cfg_attr(rustfmt, rustfmt_skip)]
    const INFO_BUF: &[u8] = &[
        // CU 1 header: unit length 14, version 4, abbrev offset 0, address size 4
        0x0e, 0x00, 0x00, 0x00,
        0x04, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x04,
        0x01, b'a', 0x00,
        0x03, b'b', 0x00,
        0x00,
        // CU 2 header: unit length 14, version 4, abbrev offset 0, address size 4
        0x0e, 0x00, 0x00, 0x00,
        0x04, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x04,
        0x01, b'c', 0x00,
        0x03, b'd', 0x00,
        0x00,
    ];

    fn session() -> Session<'static, LittleEndian> {
        Session::from_sections(INFO_BUF, ABBREV_BUF, 4)
    }

    #[test]
    fn test_next_cu_header_sequence() {
        let mut session = session();

        let first = session
            .next_cu_header()
            .expect("Should parse the first header")
            .expect("Should have a first unit");
        assert_eq!(first.offset(), DebugInfoOffset(0));
        assert_eq!(first.unit_length(), 14);
        assert_eq!(first.version(), 4);
        assert_eq!(first.address_size(), 4);
        assert_eq!(first.end_offset(), DebugInfoOffset(18));

        let second = session
            .next_cu_header()
            .expect("Should parse the second header")
            .expect("Should have a second unit");
        assert_eq!(second.offset(), DebugInfoOffset(18));
        assert_eq!(second.end_offset(), DebugInfoOffset(36));

        assert!(session.next_cu_header().expect("Should hit the end").is_none());

        // Iteration starts over after reporting the end, reusing the
        // contexts registered the first time around.
        let again = session
            .next_cu_header()
            .expect("Should parse the first header again")
            .expect("Should have a first unit again");
        assert!(Arc::ptr_eq(&again, &first));
    }

    #[test]
    fn test_cu_headers_iterator() {
        let mut session = session();
        let offsets: Vec<_> = session
            .cu_headers()
            .map(|cu| Ok(cu.offset()))
            .collect()
            .expect("Should iterate all units");
        assert_eq!(offsets, [DebugInfoOffset(0), DebugInfoOffset(18)]);
    }

    #[test]
    fn test_sibling_of_none_returns_root() {
        let mut session = session();
        session.next_cu_header().expect("Should parse header");

        let root = session
            .sibling_of(None)
            .expect("Should find the root entry")
            .expect("Root should not be null");
        assert_eq!(root.offset(), DebugInfoOffset(11));
        assert_eq!(root.tag(), constants::DW_TAG_compile_unit);
        assert!(root.has_children());
    }

    #[test]
    fn test_sibling_of_none_without_unit() {
        let mut session = session();
        match session.sibling_of(None) {
            Err(Error::NoCurrentUnit) => {}
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_child_and_sibling() {
        let mut session = session();
        session.next_cu_header().expect("Should parse header");

        let root = session
            .sibling_of(None)
            .expect("Should find the root entry")
            .expect("Root should not be null");
        let child = session
            .child_of(&root)
            .expect("Should find the child")
            .expect("Child should not be null");
        assert_eq!(child.offset(), DebugInfoOffset(14));
        assert_eq!(child.tag(), constants::DW_TAG_variable);

        // "b" is the last of its siblings.
        assert!(session.sibling_of(Some(&child)).expect("Should walk").is_none());
        // And the variable has no children of its own.
        assert!(session
            .child_of(&child)
            .expect("Should look for children")
            .is_none());
    }

    #[test]
    fn test_root_not_compile_unit() {
        #[cfg_attr(rustfmt, rustfmt_skip)]
        let info = [
            // Unit length 10, version 4, abbrev offset 0, address size 4
            0x0a, 0x00, 0x00, 0x00,
            0x04, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04,
            // Root is DW_TAG_variable, not DW_TAG_compile_unit.
            0x03, b'v', 0x00,
        ];
        let mut session = Session::<LittleEndian>::from_sections(&info, ABBREV_BUF, 4);
        session.next_cu_header().expect("Should parse header");

        match session.sibling_of(None) {
            Err(Error::FirstEntryNotCompileUnit) => {}
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_die_at_offset_without_sequential_iteration() {
        let mut session = session();

        let die = session
            .die_at_offset(DebugInfoOffset(32))
            .expect("Should find the entry")
            .expect("Entry should not be null");
        assert_eq!(die.offset(), DebugInfoOffset(32));
        assert_eq!(die.tag(), constants::DW_TAG_variable);
        assert_eq!(die.cu().offset(), DebugInfoOffset(18));

        // Random access must not move the sequential cursor.
        let first = session
            .next_cu_header()
            .expect("Should parse the first header")
            .expect("Should have a first unit");
        assert_eq!(first.offset(), DebugInfoOffset(0));
    }

    #[test]
    fn test_die_at_offset_idempotent() {
        let mut session = session();

        let first = session
            .die_at_offset(DebugInfoOffset(32))
            .expect("Should find the entry")
            .expect("Entry should not be null");
        let second = session
            .die_at_offset(DebugInfoOffset(32))
            .expect("Should find the entry")
            .expect("Entry should not be null");
        assert!(Arc::ptr_eq(first.cu_arc(), second.cu_arc()));
    }

    #[test]
    fn test_die_at_offset_null_entry() {
        let mut session = session();
        let die = session
            .die_at_offset(DebugInfoOffset(17))
            .expect("Should decode the entry");
        assert!(die.is_none());
    }

    #[test]
    fn test_die_at_offset_out_of_bounds() {
        let mut session = session();
        match session.die_at_offset(DebugInfoOffset(100)) {
            Err(Error::OffsetOutOfBounds) => {}
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_declared_children_but_null_follows() {
        #[cfg_attr(rustfmt, rustfmt_skip)]
        let info = [
            // Unit length 18, version 4, abbrev offset 0, address size 4
            0x12, 0x00, 0x00, 0x00,
            0x04, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04,
            // 11: root "u", children
            0x01, b'u', 0x00,
            // 14: subprogram "a" declares children...
            0x02, b'a', 0x00,
            // 17: ...but is immediately followed by a null entry.
            0x00,
            // 18: variable "d"
            0x03, b'd', 0x00,
            // 21: end of the root's children
            0x00,
        ];
        let mut session = Session::<LittleEndian>::from_sections(&info, ABBREV_BUF, 4);
        session.next_cu_header().expect("Should parse header");

        let root = session
            .sibling_of(None)
            .expect("Should find the root entry")
            .expect("Root should not be null");
        let a = session
            .child_of(&root)
            .expect("Should find the child")
            .expect("Child should not be null");
        assert_eq!(a.offset(), DebugInfoOffset(14));

        // "a" promises children but has none; its sibling is "d", not
        // something conjured from the null entry.
        let d = session
            .sibling_of(Some(&a))
            .expect("Should find the sibling")
            .expect("Sibling should not be null");
        assert_eq!(d.offset(), DebugInfoOffset(18));
        assert_eq!(d.tag(), constants::DW_TAG_variable);
    }

    struct CountingLoader<'a> {
        count: &'a Cell<usize>,
    }

    impl<'a> SectionLoader<'static> for CountingLoader<'a> {
        fn load_section(&mut self, name: &'static str) -> Result<Option<&'static [u8]>> {
            self.count.set(self.count.get() + 1);
            match name {
                ".debug_info" => Ok(Some(INFO_BUF)),
                ".debug_abbrev" => Ok(Some(ABBREV_BUF)),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_sections_loaded_once() {
        let count = Cell::new(0);
        let loader = CountingLoader { count: &count };
        let mut session = Session::<LittleEndian, _>::new(loader, 4);

        assert_eq!(count.get(), 0);
        session.next_cu_header().expect("Should parse header");
        assert_eq!(count.get(), 2);
        session.next_cu_header().expect("Should parse header");
        session
            .die_at_offset(DebugInfoOffset(11))
            .expect("Should find the entry");
        assert_eq!(count.get(), 2);
    }

    struct EmptyLoader;

    impl SectionLoader<'static> for EmptyLoader {
        fn load_section(&mut self, _name: &'static str) -> Result<Option<&'static [u8]>> {
            Ok(None)
        }
    }

    #[test]
    fn test_missing_section() {
        let mut session = Session::<LittleEndian, _>::new(EmptyLoader, 4);
        match session.next_cu_header() {
            Err(Error::MissingSection(".debug_info")) => {}
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_empty_section_has_no_units() {
        let mut session = Session::<LittleEndian>::from_sections(&[], ABBREV_BUF, 4);
        assert!(session.next_cu_header().expect("Should hit the end").is_none());
    }
}
