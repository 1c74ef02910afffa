use std::collections::BTreeSet;

use crate::{
    codegen, command::action::generate, encoding, error::Errors, spec,
    spec::opcode::Prefix, trie::Table,
};

/// Runs the whole generator pipeline for one spec file.
///
/// All four output texts are assembled in memory first; files are only
/// written once the entire pipeline has succeeded.
pub(crate) async fn execute_generate(action: generate::Action) -> Result<String, Errors> {
    let options = action.value;

    // Mode roots are emitted in fixed 32-then-64 order; the generated
    // FD_TABLE_OFFSET defines name the mode explicitly.
    let mut modes: Vec<u32> = Vec::new();
    if options.mode_32 {
        modes.push(32);
    }
    if options.mode_64 {
        modes.push(64);
    }
    if modes.is_empty() {
        return Err(Errors::UsageError(
            "at least one of --32/--64 is required".to_string(),
        ));
    }

    let text = if let Ok(text) = tokio::fs::read_to_string(&options.spec).await {
        text
    } else {
        return Err(Errors::FileNotFound(options.spec));
    };

    let entries = spec::parse_spec(&text, options.with_undoc)?;

    let mnemonics: Vec<String> = entries
        .iter()
        .map(|entry| entry.desc.mnemonic.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let decode_mnems = codegen::decode_mnemonic_list(&mnemonics);

    let mut table = Table::new(modes.len());
    for entry in &entries {
        for (root_idx, mode) in modes.iter().enumerate() {
            // ONLY64 keeps an entry out of the 32-bit root and vice versa.
            if entry.desc.has_flag(&format!("ONLY{}", 96 - mode)) {
                continue;
            }
            // A pattern that already selects on a legacy prefix makes a
            // runtime 66 prefix meaningless for operand sizing.
            let ign66 = matches!(
                entry.opcode.prefix,
                Some(Prefix::Np | Prefix::P66 | Prefix::F2 | Prefix::F3)
            );
            let packed = encoding::encode_desc(&entry.desc, ign66)?;
            for path in entry.opcode.paths() {
                table.add_pattern(&path, packed.clone(), root_idx)?;
            }
        }
    }

    table.deduplicate();
    let compiled = table.compile()?;

    let decode_table = codegen::decode_table_text(&compiled, &modes, &mnemonics);
    let (encode_mnems, encode_table) = codegen::encoder::encode_table(&entries)?;

    write(&options.decode_mnems, decode_mnems).await?;
    write(&options.decode_table, decode_table).await?;
    write(&options.encode_mnems, encode_mnems).await?;
    write(&options.encode_table, encode_table).await?;

    Ok(format!(
        "decode table: {} bytes, {} descriptors, {} mnemonics",
        2 * compiled.data.len(),
        compiled.descs.len(),
        mnemonics.len()
    ))
}

async fn write(path: &str, contents: String) -> Result<(), Errors> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|error| Errors::IOError(format!("{}: {}", path, error)))
}
