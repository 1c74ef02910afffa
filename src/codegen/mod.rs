pub mod encoder;
pub mod strtab;

pub(crate) mod test;

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::trie::CompiledTable;

/// Skeleton of the decode-table fragment. The consuming C file selects one
/// branch by defining the matching FD_DECODE_TABLE_* macro.
const TEMPLATE: &str = r#"// Auto-generated file -- do not modify!
#if defined(FD_DECODE_TABLE_DATA)
{hex_table}
#elif defined(FD_DECODE_TABLE_DESCS)
{descs}
#elif defined(FD_DECODE_TABLE_STRTAB1)
{strtab1}
#elif defined(FD_DECODE_TABLE_STRTAB2)
{strtab2}
#elif defined(FD_DECODE_TABLE_DEFINES)
{defines}
#else
#error "unspecified decode table"
#endif
"#;

/// Formats the table words as comma-separated hex constants, breaking the
/// line and emitting a `//offset name(kind)` comment at every node
/// boundary recorded in `notes`.
pub fn bytes_to_table(data: &[u16], notes: &BTreeMap<usize, String>) -> String {
    let strdata: Vec<String> = data.iter().map(|word| format!("{:#04x},", word)).collect();

    let mut offsets: Vec<usize> = vec![0];
    offsets.extend(notes.keys());
    offsets.push(data.len());

    let empty = String::new();
    let lines: Vec<String> = offsets
        .windows(2)
        .map(|pair| {
            let (prev, current) = (pair[0], pair[1]);
            format!(
                "{}\n//{:04x} {}",
                strdata[prev..current].concat(),
                current,
                notes.get(&current).unwrap_or(&empty)
            )
        })
        .collect();
    lines.join("\n")
}

/// The decode-side mnemonic list, one `FD_MNEMONIC` invocation per line.
pub fn decode_mnemonic_list(mnemonics: &[String]) -> String {
    let mut out = String::new();
    for (i, mnemonic) in mnemonics.iter().enumerate() {
        let _ = writeln!(out, "FD_MNEMONIC({},{})", mnemonic, i);
    }
    out
}

/// Assembles the complete decode-table C fragment.
pub fn decode_table_text(compiled: &CompiledTable, modes: &[u32], mnemonics: &[String]) -> String {
    let hex_table = bytes_to_table(&compiled.data, &compiled.annotations);

    let descs: Vec<String> = compiled
        .descs
        .iter()
        .map(|desc| {
            format!(
                "{{{},{},{},{}}},",
                desc.mnemonic, desc.words[0], desc.words[1], desc.words[2]
            )
        })
        .collect();

    let intel = strtab::intel_mnemonics(mnemonics);
    let (strtab1, strtab2) = strtab::merge_mnemonics(&intel);

    let defines: Vec<String> = modes
        .iter()
        .zip(&compiled.root_offsets)
        .map(|(mode, offset)| format!("#define FD_TABLE_OFFSET_{} {}", mode, offset))
        .collect();

    TEMPLATE
        .replace("{hex_table}", &hex_table)
        .replace("{descs}", &descs.join("\n"))
        .replace("{strtab1}", &strtab1)
        .replace("{strtab2}", &strtab2)
        .replace("{defines}", &defines.join("\n"))
}
