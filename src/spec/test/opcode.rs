#![cfg(test)]

use crate::{
    spec::opcode::{format_path, Opcode},
    trie::EntryKind,
};

#[test]
pub fn single_path() {
    let opcode = Opcode::parse("NP.0f10").unwrap();
    let paths = opcode.paths();

    assert_eq!(
        paths,
        vec![vec![
            (EntryKind::Root, 1),
            (EntryKind::Table256, 0x10),
            (EntryKind::Prefix, 0),
        ]]
    );
}

#[test]
pub fn extended_opcode_fans_out_eight() {
    let opcode = Opcode::parse("50+").unwrap();
    let paths = opcode.paths();

    assert_eq!(paths.len(), 8);
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(
            path,
            &vec![(EntryKind::Root, 0), (EntryKind::Table256, 0x50 + i as u16)]
        );
    }
}

#[test]
pub fn nfx_fans_out_two() {
    let opcode = Opcode::parse("NFx.90").unwrap();
    let paths = opcode.paths();

    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0][2], (EntryKind::Prefix, 0));
    assert_eq!(paths[1][2], (EntryKind::Prefix, 1));
}

#[test]
pub fn ignored_wl_fans_out_four() {
    let opcode = Opcode::parse("VEX.66.WIG.LIG.0f58").unwrap();
    let paths = opcode.paths();

    assert_eq!(paths.len(), 4);
    let vex_slots: Vec<u16> = paths.iter().map(|p| p[3].1).collect();
    assert_eq!(vex_slots, vec![0, 2, 1, 3]);
    for path in &paths {
        assert_eq!(path[0], (EntryKind::Root, 1 | 1 << 2));
        assert_eq!(path[1], (EntryKind::Table256, 0x58));
        assert_eq!(path[2], (EntryKind::Prefix, 1));
        assert_eq!(path[3].0, EntryKind::Vex);
    }
}

#[test]
pub fn each_unresolved_wl_attribute_doubles() {
    // W pinned, L absent: only the L leg doubles.
    let opcode = Opcode::parse("VEX.66.W0.0f58").unwrap();
    assert_eq!(opcode.paths().len(), 2);

    // Both pinned: single path.
    let opcode = Opcode::parse("VEX.66.W0.L1.0f58").unwrap();
    assert_eq!(opcode.paths().len(), 1);
}

#[test]
pub fn modreg_digit_selects_both_modes() {
    let opcode = Opcode::parse("81/0").unwrap();
    let paths = opcode.paths();

    // reg is fixed, mod fans out over memory and register forms.
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0][2], (EntryKind::Table16, 0));
    assert_eq!(paths[1][2], (EntryKind::Table16, 1 << 3));
}

#[test]
pub fn modreg_wildcard_fans_out_reg_field() {
    let opcode = Opcode::parse("d8/r").unwrap();
    let paths = opcode.paths();

    assert_eq!(paths.len(), 8);
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(path[2], (EntryKind::Table16, (1 << 3) | i as u16));
    }
}

#[test]
pub fn opcode_extension_byte_splits_into_two_steps() {
    let opcode = Opcode::parse("d9e8").unwrap();
    let paths = opcode.paths();

    assert_eq!(
        paths,
        vec![vec![
            (EntryKind::Root, 0),
            (EntryKind::Table256, 0xd9),
            (EntryKind::Table16, ((0xe8 - 0xc0) >> 3) | 8),
            (EntryKind::Table8E, 0xe8 & 7),
        ]]
    );
}

#[test]
pub fn escape_byte_backtracking() {
    // "0f38" alone is escape 0f with opcode byte 38, not the 0f38 escape.
    let opcode = Opcode::parse("0f38").unwrap();
    assert_eq!(opcode.escape, 1);
    assert_eq!(opcode.opc, 0x38);

    let opcode = Opcode::parse("0f3812").unwrap();
    assert_eq!(opcode.escape, 2);
    assert_eq!(opcode.opc, 0x12);
}

#[test]
pub fn every_valid_pattern_produces_a_path() {
    struct TestCase {
        name: &'static str,
        pattern: &'static str,
        path_count: usize,
    }

    let cases = vec![
        TestCase { name: "plain byte", pattern: "c3", path_count: 1 },
        TestCase { name: "escape 0f", pattern: "0f0b", path_count: 1 },
        TestCase { name: "escape 0f3a", pattern: "66.0f3a63", path_count: 1 },
        TestCase { name: "extended", pattern: "b8+", path_count: 8 },
        TestCase { name: "prefix nfx", pattern: "NFx.0fc7/1", path_count: 4 },
        TestCase { name: "modreg wildcard mem", pattern: "ff/m", path_count: 8 },
        TestCase { name: "modreg digit reg", pattern: "0fae/0r", path_count: 1 },
        TestCase { name: "opcext", pattern: "0f01f8", path_count: 1 },
        TestCase { name: "vex wig", pattern: "VEX.66.WIG.0f2e", path_count: 4 },
        TestCase { name: "vex both ig", pattern: "VEX.NP.WIG.LIG.0f10", path_count: 4 },
        TestCase { name: "vex pinned", pattern: "VEX.F2.W1.L0.0f2a", path_count: 1 },
    ];

    for case in cases {
        let opcode = Opcode::parse(case.pattern)
            .unwrap_or_else(|e| panic!("{}: {:?}", case.name, e));
        assert_eq!(opcode.paths().len(), case.path_count, "{}", case.name);
    }
}

#[test]
pub fn malformed_patterns_are_rejected() {
    let bad = [
        "", "NP", "0f", "g0", "0F10", "VEX.0f10", "66.W0", "10.66", "66.L0.W0.0f10",
        "10+x", "10/8", "10/rm", "10bf", "VEX.66.WX.0f10",
    ];
    for pattern in bad {
        assert!(Opcode::parse(pattern).is_err(), "{}", pattern);
    }
}

#[test]
pub fn format_path_round_trips_canonical_patterns() {
    for pattern in ["c3", "NP.0f10", "66.0f3a63", "VEX.66.W1.L0.0f58"] {
        let opcode = Opcode::parse(pattern).unwrap();
        let paths = opcode.paths();
        assert_eq!(paths.len(), 1, "{}", pattern);
        assert_eq!(format_path(&paths[0]), pattern);
    }
}
