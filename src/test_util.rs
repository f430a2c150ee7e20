#![allow(missing_docs)]

use test_assembler::Section;

use crate::leb128;

/// Extension methods for building DWARF encodings with `test_assembler`.
pub trait SectionMethods {
    fn uleb(self, val: u64) -> Self;
    fn initial_length_32(self, length: u32) -> Self;
    fn initial_length_64(self, length: u64) -> Self;
}

impl SectionMethods for Section {
    fn uleb(self, val: u64) -> Self {
        let mut buf = Vec::new();
        let written = leb128::write::unsigned(&mut buf, val);
        self.append_bytes(&buf[0..written])
    }

    fn initial_length_32(self, length: u32) -> Self {
        self.L32(length)
    }

    fn initial_length_64(self, length: u64) -> Self {
        // The escape value, then the real 64-bit length.
        self.L32(0xffff_ffff).L64(length)
    }
}
