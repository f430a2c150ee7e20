//! A lazy, zero-copy navigator for the compilation units and debugging
//! information entries of the DWARF `.debug_info` section.
//!
//! * **Zero-copy:** everything is just a reference to the original input
//!   buffer. No copies of the input data ever get made.
//!
//! * **Lazy:** sections are loaded on first use, unit headers are parsed as
//!   iteration reaches them, and abbreviation tables are decoded once per
//!   unit, on demand. Entries you never visit never get decoded.
//!
//! * **Cross-platform:** this crate isn't coupled to any platform or object
//!   file format. Use your own ELF parser on Linux or a Mach-O parser on OSX
//!   and hand the section bytes to a [`Session`].
//!
//! This library targets the second through fourth editions of the DWARF
//! standard.
//!
//! ## Example Usage
//!
//! Walk the top-level entries of every compilation unit:
//!
//! ```rust,no_run
//! # fn example() -> Result<(), dwarf_nav::Error> {
//! # let debug_info_buf = [];
//! # let debug_abbrev_buf = [];
//! # let read_debug_info = || &debug_info_buf;
//! # let read_debug_abbrev = || &debug_abbrev_buf;
//! // Read the .debug_info and .debug_abbrev sections with whatever object
//! // loader you're using.
//! let mut session = dwarf_nav::Session::<dwarf_nav::LittleEndian>::from_sections(
//!     read_debug_info(),
//!     read_debug_abbrev(),
//!     8,
//! );
//!
//! // Iterate over all compilation units.
//! while let Some(unit) = session.next_cu_header()? {
//!     println!("Unit at {:#x}, version {}", unit.offset().0, unit.version());
//!
//!     // The root entry, then its children, one sibling at a time.
//!     let root = session.sibling_of(None)?.expect("unit has a root entry");
//!     let mut child = session.child_of(&root)?;
//!     while let Some(entry) = child {
//!         println!("  {} at {:#x}", entry.tag(), entry.offset().0);
//!         child = session.sibling_of(Some(&entry))?;
//!     }
//! }
//! # unreachable!()
//! # }
//! ```
//!
//! ## Using with `FallibleIterator`
//!
//! The standard library's `Iterator` trait and related APIs do not play well
//! with iterators where the `next` operation is fallible. The
//! [`fallible-iterator`](https://crates.io/crates/fallible-iterator) crate
//! provides the helpers you have come to expect (eg `map`, `filter`, etc)
//! for iterators that can fail, and [`Session::cu_headers`] returns one:
//!
//! ```
//! use dwarf_nav::{LittleEndian, Session};
//! use fallible_iterator::FallibleIterator;
//!
//! fn count_units(debug_info: &[u8], debug_abbrev: &[u8]) -> dwarf_nav::Result<usize> {
//!     let mut session = Session::<LittleEndian>::from_sections(debug_info, debug_abbrev, 8);
//!     session.cu_headers().count()
//! }
//! # fn main() {}
//! ```

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

mod constants;
pub use crate::constants::*;

mod endianity;
pub use crate::endianity::{BigEndian, EndianBuf, Endianity, LittleEndian, NativeEndian};

pub mod leb128;

mod parser;
pub use crate::parser::{Error, Format, Result};

mod lazy;

mod abbrev;
pub use crate::abbrev::{
    Abbreviation, Abbreviations, AttributeSpecification, DebugAbbrev, DebugAbbrevOffset,
};

mod unit;
pub use crate::unit::{CuContext, DebugInfo, DebugInfoOffset};

mod die;
pub use crate::die::Die;

mod session;
pub use crate::session::{CuHeaders, PreloadedSections, SectionLoader, Session};

#[cfg(test)]
mod test_util;

/// A convenience trait for loading DWARF sections from object files.
///
/// A [`SectionLoader`] is handed the name this trait reports, and the data it
/// returns is wrapped in the implementing section type.
pub trait Section<'input>: From<&'input [u8]> {
    /// Returns the ELF section name for this type.
    fn section_name() -> &'static str;
}

impl<'input, Endian> Section<'input> for DebugInfo<'input, Endian>
where
    Endian: Endianity,
{
    fn section_name() -> &'static str {
        ".debug_info"
    }
}

impl<'input, Endian> Section<'input> for DebugAbbrev<'input, Endian>
where
    Endian: Endianity,
{
    fn section_name() -> &'static str {
        ".debug_abbrev"
    }
}
