#![cfg(test)]

use std::collections::BTreeMap;

use crate::codegen::{bytes_to_table, decode_mnemonic_list, decode_table_text};
use crate::encoding::encode_desc;
use crate::spec::parse_spec;
use crate::trie::Table;

#[test]
pub fn hex_words_break_at_annotated_offsets() {
    let data = vec![0x12u16, 0, 0xabcd, 7];
    let mut notes = BTreeMap::new();
    notes.insert(0usize, "root0(-1)".to_string());
    notes.insert(2usize, "t0,(2)".to_string());

    let text = bytes_to_table(&data, &notes);
    assert_eq!(
        text,
        "\n\
         //0000 root0(-1)\n\
         0x12,0x00,\n\
         //0002 t0,(2)\n\
         0xabcd,0x07,\n\
         //0004 "
    );
}

#[test]
pub fn decode_mnemonic_lines() {
    let mnemonics = vec!["ADD".to_string(), "MOV".to_string()];
    assert_eq!(
        decode_mnemonic_list(&mnemonics),
        "FD_MNEMONIC(ADD,0)\nFD_MNEMONIC(MOV,1)\n"
    );
}

#[test]
pub fn decode_table_fragment_has_all_branches() {
    let entries = parse_spec(
        "NP.0f10 RM - XMM XMM128 - MOVUPS\n\
         c3 NP - - - - RET DEF64\n",
        false,
    )
    .unwrap();

    let mut table = Table::new(1);
    for entry in &entries {
        let packed = encode_desc(&entry.desc, entry.opcode.prefix.is_some()).unwrap();
        for path in entry.opcode.paths() {
            table.add_pattern(&path, packed.clone(), 0).unwrap();
        }
    }
    table.deduplicate();
    let compiled = table.compile().unwrap();

    let mut mnemonics: Vec<String> =
        entries.iter().map(|e| e.desc.mnemonic.clone()).collect();
    mnemonics.sort();

    let text = decode_table_text(&compiled, &[64], &mnemonics);

    assert!(text.starts_with("// Auto-generated file -- do not modify!\n"));
    for marker in [
        "#if defined(FD_DECODE_TABLE_DATA)",
        "#elif defined(FD_DECODE_TABLE_DESCS)",
        "#elif defined(FD_DECODE_TABLE_STRTAB1)",
        "#elif defined(FD_DECODE_TABLE_STRTAB2)",
        "#elif defined(FD_DECODE_TABLE_DEFINES)",
        "#else",
        "#error \"unspecified decode table\"",
        "#endif",
    ] {
        assert!(text.contains(marker), "{}", marker);
    }

    // Descriptor records keep their FDI_ mnemonic and three data words.
    assert!(text.contains("{FDI_MOVUPS,"));
    assert!(text.contains("{FDI_RET,"));

    // Mnemonic string table is Intel-cased and null-separated.
    assert!(text.contains("movups"));
    assert!(text.contains("ret"));

    assert!(text.contains("#define FD_TABLE_OFFSET_64 0"));
}

#[test]
pub fn separate_roots_get_separate_defines() {
    let entries = parse_spec("c3 NP - - - - RET DEF64\n", false).unwrap();

    let mut table = Table::new(2);
    for entry in &entries {
        let packed = encode_desc(&entry.desc, false).unwrap();
        for path in entry.opcode.paths() {
            table.add_pattern(&path, packed.clone(), 0).unwrap();
            table.add_pattern(&path, packed.clone(), 1).unwrap();
        }
    }
    table.deduplicate();
    let compiled = table.compile().unwrap();

    let mnemonics = vec!["RET".to_string()];
    let text = decode_table_text(&compiled, &[32, 64], &mnemonics);

    assert!(text.contains("#define FD_TABLE_OFFSET_32 0"));
    // root1 sits after root0's 8 slots.
    assert!(text.contains("#define FD_TABLE_OFFSET_64 8"));
}
