//! End-to-end navigation over hand-assembled `.debug_info` images.

use dwarf_nav::{
    DebugInfoOffset, Die, Error, Format, LittleEndian, Session, DW_TAG_compile_unit,
    DW_TAG_subprogram, DW_TAG_variable,
};

// Abbreviations shared by every image below:
//   1: DW_TAG_compile_unit, children, [DW_AT_name/DW_FORM_string]
//   2: DW_TAG_subprogram, children, [DW_AT_name/DW_FORM_string]
//   3: DW_TAG_variable, no children, [DW_AT_name/DW_FORM_string]
//   4: DW_TAG_subprogram, children, [DW_AT_sibling/DW_FORM_ref4,
//                                    DW_AT_name/DW_FORM_string]
#[cfg_attr(rustfmt, rustfmt_skip)]
const ABBREV_BUF: &[u8] = &[
    0x01, 0x11, 0x01, 0x03, 0x08, 0x00, 0x00,
    0x02, 0x2e, 0x01, 0x03, 0x08, 0x00, 0x00,
    0x03, 0x34, 0x00, 0x03, 0x08, 0x00, 0x00,
    0x04, 0x2e, 0x01, 0x01, 0x13, 0x03, 0x08, 0x00, 0x00,
    0x00,
];

// One compilation unit holding the tree [A(B, C), D]:
//
//   11: DW_TAG_compile_unit "unit"
//   17:   A: DW_TAG_subprogram "A"
//   20:     B: DW_TAG_variable "B"
//   23:     C: DW_TAG_variable "C"
//   26:     null (end of A's children)
//   27:   D: DW_TAG_variable "D"
//   30:   null (end of the root's children)
#[cfg_attr(rustfmt, rustfmt_skip)]
const TREE_BUF: &[u8] = &[
    // Unit length 27, version 4, abbrev offset 0, address size 4
    0x1b, 0x00, 0x00, 0x00,
    0x04, 0x00,
    0x00, 0x00, 0x00, 0x00,
    0x04,
    0x01, b'u', b'n', b'i', b't', 0x00,
    0x02, b'A', 0x00,
    0x03, b'B', 0x00,
    0x03, b'C', 0x00,
    0x00,
    0x03, b'D', 0x00,
    0x00,
];

fn tree_session() -> Session<'static, LittleEndian> {
    let mut session = Session::from_sections(TREE_BUF, ABBREV_BUF, 4);
    session
        .next_cu_header()
        .expect("Should parse the unit header")
        .expect("Should have a unit");
    session
}

fn root(session: &mut Session<'static, LittleEndian>) -> Die {
    session
        .sibling_of(None)
        .expect("Should find the root entry")
        .expect("Root should not be null")
}

#[test]
fn walk_the_tree() {
    let mut session = tree_session();

    let root = root(&mut session);
    assert_eq!(root.offset(), DebugInfoOffset(11));
    assert_eq!(root.tag(), DW_TAG_compile_unit);

    let a = session
        .child_of(&root)
        .expect("Should find A")
        .expect("A should not be null");
    assert_eq!(a.offset(), DebugInfoOffset(17));
    assert_eq!(a.tag(), DW_TAG_subprogram);

    let b = session
        .child_of(&a)
        .expect("Should find B")
        .expect("B should not be null");
    assert_eq!(b.offset(), DebugInfoOffset(20));
    assert_eq!(b.tag(), DW_TAG_variable);

    let c = session
        .sibling_of(Some(&b))
        .expect("Should find C")
        .expect("C should not be null");
    assert_eq!(c.offset(), DebugInfoOffset(23));

    // C is the last of A's children; the null that ends A's children must
    // not leak D into the chain.
    assert!(session.sibling_of(Some(&c)).expect("Should walk").is_none());

    // The sibling of A skips over B and C entirely.
    let d = session
        .sibling_of(Some(&a))
        .expect("Should find D")
        .expect("D should not be null");
    assert_eq!(d.offset(), DebugInfoOffset(27));
    assert_eq!(d.tag(), DW_TAG_variable);

    // D ends the root's children.
    assert!(session.sibling_of(Some(&d)).expect("Should walk").is_none());
    // And the root has no siblings at all.
    assert!(session
        .sibling_of(Some(&root))
        .expect("Should walk")
        .is_none());
}

#[test]
fn every_entry_shares_the_unit_context() {
    let mut session = tree_session();

    let root = root(&mut session);
    let a = session
        .child_of(&root)
        .expect("Should find A")
        .expect("A should not be null");
    assert!(std::ptr::eq(root.cu(), a.cu()));
}

// The same shape as TREE_BUF, but A carries a DW_AT_sibling attribute
// pointing at D, so walking from A never decodes B or C.
//
//   11: DW_TAG_compile_unit "u"
//   14:   A: DW_TAG_subprogram, sibling -> 28, "A"
//   21:     B: DW_TAG_variable "B"
//   24:     C: DW_TAG_variable "C"
//   27:     null (end of A's children)
//   28:   D: DW_TAG_variable "D"
//   31:   null (end of the root's children)
#[cfg_attr(rustfmt, rustfmt_skip)]
const SIBLING_BUF: &[u8] = &[
    // Unit length 28, version 4, abbrev offset 0, address size 4
    0x1c, 0x00, 0x00, 0x00,
    0x04, 0x00,
    0x00, 0x00, 0x00, 0x00,
    0x04,
    // 11: root "u"
    0x01, b'u', 0x00,
    // 14: A with sibling = unit-relative offset 28
    0x04, 0x1c, 0x00, 0x00, 0x00, b'A', 0x00,
    // 21: B
    0x03, b'B', 0x00,
    // 24: C
    0x03, b'C', 0x00,
    // 27: null, end of A's children
    0x00,
    // 28: D
    0x03, b'D', 0x00,
    // 31: null, end of the root's children
    0x00,
];

#[test]
fn sibling_attribute_skips_children() {
    let mut session = Session::<LittleEndian>::from_sections(SIBLING_BUF, ABBREV_BUF, 4);
    session
        .next_cu_header()
        .expect("Should parse the unit header")
        .expect("Should have a unit");

    let root = session
        .sibling_of(None)
        .expect("Should find the root entry")
        .expect("Root should not be null");
    let a = session
        .child_of(&root)
        .expect("Should find A")
        .expect("A should not be null");
    assert_eq!(a.offset(), DebugInfoOffset(14));

    let d = session
        .sibling_of(Some(&a))
        .expect("Should find D")
        .expect("D should not be null");
    assert_eq!(d.offset(), DebugInfoOffset(28));
    assert_eq!(d.tag(), DW_TAG_variable);
}

#[test]
fn sibling_attribute_out_of_bounds() {
    let mut buf = SIBLING_BUF.to_vec();
    // Rewrite A's sibling offset to point past the end of the unit.
    buf[15] = 0x40;
    let mut session = Session::<LittleEndian>::from_sections(&buf, ABBREV_BUF, 4);
    session
        .next_cu_header()
        .expect("Should parse the unit header")
        .expect("Should have a unit");

    let root = session
        .sibling_of(None)
        .expect("Should find the root entry")
        .expect("Root should not be null");
    let a = session
        .child_of(&root)
        .expect("Should find A")
        .expect("A should not be null");

    match session.sibling_of(Some(&a)) {
        Err(Error::SiblingOutOfBounds) => {}
        otherwise => panic!("Unexpected result: {:?}", otherwise),
    };
}

#[test]
fn oversized_unit_length_is_rejected() {
    let mut buf = TREE_BUF.to_vec();
    // Claim a unit length far past the end of the section.
    buf[0] = 0xff;
    let mut session = Session::<LittleEndian>::from_sections(&buf, ABBREV_BUF, 4);

    match session.next_cu_header() {
        Err(Error::UnitOutOfBounds) => {}
        otherwise => panic!("Unexpected result: {:?}", otherwise),
    };
    // Nothing was registered, so random access scans from the start and
    // fails the same way.
    match session.die_at_offset(DebugInfoOffset(11)) {
        Err(Error::UnitOutOfBounds) => {}
        otherwise => panic!("Unexpected result: {:?}", otherwise),
    };
}

#[test]
fn unsupported_version_is_rejected() {
    let mut buf = TREE_BUF.to_vec();
    // Version 5.
    buf[4] = 0x05;
    let mut session = Session::<LittleEndian>::from_sections(&buf, ABBREV_BUF, 4);
    match session.next_cu_header() {
        Err(Error::UnknownVersion) => {}
        otherwise => panic!("Unexpected result: {:?}", otherwise),
    };
}

#[test]
fn address_size_mismatch_is_rejected() {
    let mut session = Session::<LittleEndian>::from_sections(TREE_BUF, ABBREV_BUF, 8);
    match session.next_cu_header() {
        Err(Error::AddressSizeMismatch(4)) => {}
        otherwise => panic!("Unexpected result: {:?}", otherwise),
    };
}

#[test]
fn random_access_agrees_with_traversal() {
    let mut session = tree_session();

    let root = root(&mut session);
    let a = session
        .child_of(&root)
        .expect("Should find A")
        .expect("A should not be null");
    let b = session
        .child_of(&a)
        .expect("Should find B")
        .expect("B should not be null");

    let b_again = session
        .die_at_offset(b.offset())
        .expect("Should find the entry")
        .expect("Entry should not be null");
    assert_eq!(b_again.offset(), b.offset());
    assert_eq!(b_again.tag(), b.tag());
    assert!(std::ptr::eq(b.cu(), b_again.cu()));
}

#[test]
fn dwarf64_unit_round_trip() {
    #[cfg_attr(rustfmt, rustfmt_skip)]
    let info = [
        // 64-bit escape, then unit length 18
        0xff, 0xff, 0xff, 0xff,
        0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Version 4
        0x04, 0x00,
        // debug_abbrev_offset 0
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Address size 4
        0x04,
        // 23: root "u"
        0x01, b'u', 0x00,
        // 26: variable "v"
        0x03, b'v', 0x00,
        // 29: null
        0x00,
    ];
    let mut session = Session::<LittleEndian>::from_sections(&info, ABBREV_BUF, 4);

    let unit = session
        .next_cu_header()
        .expect("Should parse the unit header")
        .expect("Should have a unit");
    assert_eq!(unit.format(), Format::Dwarf64);
    assert_eq!(unit.unit_length(), 18);
    assert_eq!(unit.end_offset(), DebugInfoOffset(30));

    let root = session
        .sibling_of(None)
        .expect("Should find the root entry")
        .expect("Root should not be null");
    assert_eq!(root.offset(), DebugInfoOffset(23));
    let v = session
        .child_of(&root)
        .expect("Should find the child")
        .expect("Child should not be null");
    assert_eq!(v.offset(), DebugInfoOffset(26));
    assert!(session.sibling_of(Some(&v)).expect("Should walk").is_none());
}

#[test]
fn second_unit_reachable_both_ways() {
    // TREE_BUF twice in a row, with the second unit's entries shifted by 31.
    let mut info = TREE_BUF.to_vec();
    info.extend_from_slice(TREE_BUF);
    let mut session = Session::<LittleEndian>::from_sections(&info, ABBREV_BUF, 4);

    // Random access into the second unit first.
    let d = session
        .die_at_offset(DebugInfoOffset(31 + 27))
        .expect("Should find the entry")
        .expect("Entry should not be null");
    assert_eq!(d.tag(), DW_TAG_variable);
    assert_eq!(d.cu().offset(), DebugInfoOffset(31));

    // Sequential iteration then reuses the registered context.
    let first = session
        .next_cu_header()
        .expect("Should parse the first header")
        .expect("Should have a first unit");
    assert_eq!(first.offset(), DebugInfoOffset(0));
    let second = session
        .next_cu_header()
        .expect("Should parse the second header")
        .expect("Should have a second unit");
    assert!(std::ptr::eq(&*second, d.cu()));
}
