use std::collections::HashMap;

/// Rewrites decoder mnemonics into their Intel-syntax spellings for the
/// user-visible string table.
pub fn intel_mnemonics(mnemonics: &[String]) -> Vec<String> {
    mnemonics
        .iter()
        .map(|m| {
            m.replace("SSE_", "")
                .replace("MMX_", "")
                .replace("MOVABS", "MOV")
                .replace("JMPF", "JMP FAR")
                .replace("CALLF", "CALL FAR")
                .replace("_S2G", "")
                .replace("_G2S", "")
                .replace("_CR", "")
                .replace("_DR", "")
                .to_lowercase()
        })
        .collect()
}

#[derive(Debug, Default)]
struct SuffixNode {
    children: HashMap<char, SuffixNode>,
}

fn walk(node: &SuffixNode, suffix: String, leaves: &mut Vec<String>) {
    if node.children.is_empty() {
        leaves.push(suffix);
        return;
    }
    for (c, child) in &node.children {
        walk(child, format!("{}{}", c, suffix), leaves);
    }
}

/// Merges all mnemonics into one null-separated blob with shared suffixes.
///
/// Mnemonics are inserted back to front into a trie, so strings ending the
/// same way collapse onto one leaf and the shorter one becomes a tail of
/// the longer. Returns the blob as a C string literal plus the
/// comma-separated start offset of every mnemonic.
pub fn merge_mnemonics(mnemonics: &[String]) -> (String, String) {
    let mut root = SuffixNode::default();
    for mnemonic in mnemonics {
        let mut node = &mut root;
        for c in mnemonic.chars().rev() {
            node = node.children.entry(c).or_default();
        }
    }

    let mut leaves = Vec::new();
    walk(&root, "\0".to_string(), &mut leaves);
    leaves.sort();
    let merged = leaves.concat();

    let cstr = format!("\"{}\"", merged[..merged.len() - 1].replace('\0', "\\0"));
    let offsets: Vec<String> = mnemonics
        .iter()
        .map(|m| {
            merged
                .find(&format!("{}\0", m))
                .expect("mnemonic not in merged table")
                .to_string()
        })
        .collect();
    (cstr, offsets.join(","))
}
