use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::encoding::encoding_preset;
use crate::spec::descriptor::{RegKind, SZ_OP, SZ_VEC};
use crate::spec::opcode::{AttrBit, Prefix};
use crate::spec::SpecEntry;
use crate::trie::error::{TableError, TableErrorKind};

/// One concrete encodable form of a mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Variant {
    enc: String,
    imm_size: i64,
    tys: i64,
    opc: String,
}

/// Mnemonic groups in first-seen order, so emitted records are stable
/// across runs regardless of hashing.
#[derive(Debug, Default)]
struct MnemonicGroups {
    order: Vec<String>,
    index: HashMap<String, usize>,
    variants: Vec<Vec<Variant>>,
}

impl MnemonicGroups {
    fn push(&mut self, name: String, variant: Variant) {
        match self.index.get(&name) {
            Some(&i) => self.variants[i].push(variant),
            None => {
                self.index.insert(name.clone(), self.variants.len());
                self.order.push(name);
                self.variants.push(vec![variant]);
            }
        }
    }
}

fn signed_hex(value: i64) -> String {
    if value < 0 {
        format!("-{:#x}", -value)
    } else {
        format!("{:#x}", value)
    }
}

/// Appends an operand/vector size to a synthesized mnemonic name, with an
/// underscore separator only when the name already ends in a digit.
fn append_size(name: &mut String, size: i64) {
    if name.ends_with(|c: char| c.is_ascii_digit()) {
        name.push('_');
    }
    name.push_str(&size.to_string());
}

fn unspecified(mnemonic: &str) -> TableError {
    TableError::new(TableErrorKind::UnspecifiedSize, mnemonic)
}

/// Builds the encoder-side tables: every legal concrete variant of each
/// mnemonic (operand size x vector size x prefix x operand forms), deduped
/// and chained through `alt` links.
///
/// Returns the sorted `FE_MNEMONIC` list and the designated-initializer
/// descriptor records.
pub fn encode_table(entries: &[SpecEntry]) -> Result<(String, String), TableError> {
    let mut groups = MnemonicGroups::default();
    // XCHG with itself claims opcode 0x90, so NOP is seeded by hand.
    groups.push(
        "FE_NOP".to_string(),
        Variant {
            enc: "NP".to_string(),
            imm_size: 0,
            tys: 0,
            opc: "0x90".to_string(),
        },
    );

    for entry in entries {
        let opcode = &entry.opcode;
        let desc = &entry.desc;
        if desc.mnemonic.starts_with("RESERVED_") {
            continue;
        }
        // The encoder targets 64-bit mode only.
        if desc.has_flag("ONLY32") {
            continue;
        }

        let mut opsizes: BTreeSet<i64> = if desc.has_flag("SIZE_8") {
            [8].into()
        } else {
            [16, 32, 64].into()
        };
        let mut hasvex = false;
        let mut vecsizes: BTreeSet<i64> = [128].into();

        let mut opc_i: i64 = opcode.opc as i64;
        if let Some(opcext) = opcode.opcext {
            opc_i |= (opcext as i64) << 8;
        }
        if let Some((Some(reg), _)) = opcode.modreg {
            opc_i |= (reg as i64) << 8;
        }

        let mut opc_flags = String::new();
        opc_flags += ["", "|OPC_0F", "|OPC_0F38", "|OPC_0F3A"][opcode.escape as usize];
        if opcode.vex {
            hasvex = true;
            vecsizes = [128, 256].into();
            opc_flags += "|OPC_VEX";
        }
        if let Some(prefix) = opcode.prefix {
            match prefix {
                Prefix::P66 => opc_flags += "|OPC_66",
                Prefix::F2 => opc_flags += "|OPC_F2",
                Prefix::F3 => opc_flags += "|OPC_F3",
                _ => {}
            }
            if !desc.has_flag("USE66") && prefix != Prefix::NFx {
                opsizes.remove(&16);
            }
        }
        match opcode.vexl {
            Some(AttrBit::Ignored) => {
                vecsizes = [0].into();
            }
            Some(AttrBit::Set) => {
                vecsizes.remove(&128);
                opc_flags += "|OPC_VEXL";
            }
            Some(AttrBit::Clear) => {
                vecsizes.remove(&256);
            }
            None => {}
        }
        match opcode.rexw {
            Some(AttrBit::Ignored) => {
                opsizes = [0].into();
            }
            Some(AttrBit::Set) => {
                opsizes.remove(&32);
                opc_flags += "|OPC_REXW";
            }
            Some(AttrBit::Clear) => {
                opsizes.remove(&64);
            }
            None => {}
        }

        if desc.has_flag("DEF64") {
            opsizes.remove(&32);
        }
        if !desc.has_flag("INSTR_WIDTH") && desc.operands.iter().all(|op| op.size != SZ_OP) {
            opsizes = [0].into();
        }
        // VEX-encoded general-purpose instructions have no vector length.
        if !desc.has_flag("VSIB") && desc.operands.iter().all(|op| op.size != SZ_VEC) {
            vecsizes = [0].into();
        }
        if desc.has_flag("ENC_NOSZ") {
            opsizes = [0].into();
            vecsizes = [0].into();
        }

        // Whether sizes land in the mnemonic name or after each operand.
        let separate_opsize = desc.has_flag("ENC_SEPSZ");
        let mut prepend_opsize =
            opsizes.iter().max().copied().unwrap_or(0) > 0 && !separate_opsize;
        let prepend_vecsize =
            hasvex && vecsizes.iter().max().copied().unwrap_or(0) > 0 && !separate_opsize;

        if desc.has_flag("FORCE64") {
            opsizes = [64].into();
            prepend_opsize = false;
        }

        let preset = encoding_preset(&desc.encoding).ok_or_else(|| {
            TableError::new(TableErrorKind::UnknownEncoding, &desc.encoding)
        })?;

        let mut optypes: [String; 4] = Default::default();
        if preset.modrm_idx != 0 {
            let letters = match opcode.modreg {
                Some((_, mode)) => mode.letters(),
                None => "rm",
            };
            optypes[(preset.modrm_idx ^ 3) as usize] = letters.to_string();
        }
        if preset.modreg_idx != 0 {
            optypes[(preset.modreg_idx ^ 3) as usize] = "r".to_string();
        }
        if preset.vexreg_idx != 0 {
            optypes[(preset.vexreg_idx ^ 3) as usize] = "r".to_string();
        }
        if preset.zeroreg_idx != 0 {
            optypes[(preset.zeroreg_idx ^ 3) as usize] = "r".to_string();
        }
        if preset.imm_control != 0 {
            let letter = [' ', 'i', 'a', 'r', 'i', 'i', 'o', 'o'][preset.imm_control as usize];
            optypes[(preset.imm_idx ^ 3) as usize] = letter.to_string();
        }

        let ots_product: Vec<Vec<char>> = {
            let slots: Vec<Vec<char>> = optypes
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| s.chars().collect())
                .collect();
            let mut acc: Vec<Vec<char>> = vec![Vec::new()];
            for letters in &slots {
                let mut next = Vec::with_capacity(acc.len() * letters.len());
                for combo in &acc {
                    for &letter in letters {
                        let mut extended = combo.clone();
                        extended.push(letter);
                        next.push(extended);
                    }
                }
                acc = next;
            }
            acc
        };

        let mut prefixes: Vec<(&str, &str)> = vec![("", "")];
        if desc.has_flag("LOCK") {
            prefixes.push(("LOCK_", "|OPC_LOCK"));
        }
        if desc.has_flag("ENC_REP") {
            prefixes.push(("REP_", "|OPC_F3"));
        }
        if desc.has_flag("ENC_REPCC") {
            prefixes.push(("REPNZ_", "|OPC_F2"));
            prefixes.push(("REPZ_", "|OPC_F3"));
        }

        for &opsize in &opsizes {
            for &vecsize in &vecsizes {
                for &(prefix_name, prefix_flag) in &prefixes {
                    for ots in &ots_product {
                        // LOCK requires a memory destination.
                        if prefix_flag == "|OPC_LOCK" && ots.first() != Some(&'m') {
                            continue;
                        }

                        let mut imm_size: i64 = 0;
                        if preset.imm_control >= 4 {
                            if desc.mnemonic == "ENTER" {
                                imm_size = 3;
                            } else if desc.has_flag("IMM_8") {
                                imm_size = 1;
                            } else {
                                let max_imm: i64 =
                                    if desc.mnemonic == "MOVABS" { 8 } else { 4 };
                                let imm_op = desc
                                    .operands
                                    .get((preset.imm_idx ^ 3) as usize)
                                    .ok_or_else(|| {
                                        TableError::new(
                                            TableErrorKind::MissingImmediate,
                                            &desc.mnemonic,
                                        )
                                    })?;
                                let imm_opsize = imm_op
                                    .abssize(Some(opsize / 8), None)
                                    .ok_or_else(|| unspecified(&desc.mnemonic))?;
                                imm_size = max_imm.min(imm_opsize);
                            }
                        }

                        let mut tys: Vec<i64> = Vec::new();
                        for (ot, op) in ots.iter().zip(&desc.operands) {
                            let ty = if *ot == 'm' {
                                0xf
                            } else if op.kind == RegKind::Gp {
                                // 8-bit GP registers need their own code so
                                // the encoder can reject high-byte forms.
                                if desc.mnemonic == "MOVSX"
                                    || desc.mnemonic == "MOVZX"
                                    || opsize == 8
                                {
                                    let abs = op
                                        .abssize(Some(opsize / 8), None)
                                        .ok_or_else(|| unspecified(&desc.mnemonic))?;
                                    if abs == 1 {
                                        2
                                    } else {
                                        1
                                    }
                                } else {
                                    1
                                }
                            } else {
                                match op.kind {
                                    RegKind::Imm => 0,
                                    RegKind::Seg => 3,
                                    RegKind::Fpu => 4,
                                    RegKind::Mmx => 5,
                                    RegKind::Xmm => 6,
                                    RegKind::Bnd => 8,
                                    RegKind::Cr => 9,
                                    RegKind::Dr => 10,
                                    _ => -1,
                                }
                            };
                            tys.push(ty);
                        }
                        let tys_i: i64 =
                            tys.iter().enumerate().map(|(i, ty)| ty << (4 * i)).sum();

                        let mut opc_s = format!("{:#x}", opc_i);
                        opc_s += &opc_flags;
                        opc_s += prefix_flag;
                        if opsize == 16 {
                            opc_s += "|OPC_66";
                        }
                        if opsize == 64
                            && !desc.has_flag("DEF64")
                            && !desc.has_flag("FORCE64")
                        {
                            opc_s += "|OPC_REXW";
                        }

                        let mnem_name = match desc.mnemonic.as_str() {
                            "MOVABS" => "MOV",
                            "XCHG_NOP" => "XCHG",
                            name => name,
                        };
                        let mut name = format!("FE_{}{}", prefix_name, mnem_name);
                        if prepend_opsize && !(desc.has_flag("DEF64") && opsize == 64) {
                            append_size(&mut name, opsize);
                        }
                        if prepend_vecsize {
                            append_size(&mut name, vecsize);
                        }
                        for (ot, op) in ots.iter().zip(&desc.operands) {
                            if *ot != 'o' {
                                name.push(*ot);
                            }
                            if separate_opsize {
                                let abs = op
                                    .abssize(Some(opsize / 8), Some(vecsize / 8))
                                    .ok_or_else(|| unspecified(&desc.mnemonic))?;
                                name += &(abs * 8).to_string();
                            }
                        }

                        groups.push(
                            name,
                            Variant {
                                enc: desc.encoding.clone(),
                                imm_size,
                                tys: tys_i,
                                opc: opc_s,
                            },
                        );
                    }
                }
            }
        }
    }

    let mut descs = String::new();
    let mut alt_index = 0usize;
    for (group, mnem) in groups.order.iter().enumerate() {
        let variants = &groups.variants[group];

        let mut dedup: Vec<&Variant> = Vec::new();
        for variant in variants {
            let seen = dedup.iter().any(|v| {
                v.enc == variant.enc && v.imm_size == variant.imm_size && v.tys == variant.tys
            });
            if !seen {
                dedup.push(variant);
            }
        }

        // Short immediates first; within a size, prefer the cheaper
        // register-in-opcode encodings over ModR/M forms.
        let priority = ["O", "OA", "OI", "IA", "M", "MI", "MR", "RM"];
        dedup.sort_by_key(|v| {
            (
                v.imm_size,
                priority.iter().position(|p| *p == v.enc).unwrap_or(0),
            )
        });

        let mut indices = vec![mnem.clone()];
        for i in 0..dedup.len() - 1 {
            indices.push(format!("FE_MNEM_MAX+{}", alt_index + i));
        }
        let mut alts: Vec<String> = indices[1..].to_vec();
        alts.push("0".to_string());
        alt_index += alts.len() - 1;

        for i in 0..dedup.len() {
            let _ = writeln!(
                descs,
                "[{}] = {{ .enc = ENC_{}, .immsz = {}, .tys = {}, .opc = {}, .alt = {} }},",
                indices[i],
                dedup[i].enc,
                dedup[i].imm_size,
                signed_hex(dedup[i].tys),
                dedup[i].opc,
                alts[i]
            );
        }
    }

    let mut mnem_list: Vec<&String> = groups.order.iter().collect();
    mnem_list.sort();
    let mut mnem_tab = String::new();
    for (i, mnem) in mnem_list.iter().enumerate() {
        let _ = writeln!(mnem_tab, "FE_MNEMONIC({},{})", mnem, i);
    }

    Ok((mnem_tab, descs))
}
