pub mod fields;

use crate::spec::descriptor::{InstrDesc, RegKind, SZ_OP, SZ_VEC};
use crate::trie::error::{TableError, TableErrorKind};

use self::fields::*;

/// Unpacked descriptor record fields, one per bitfield of the packed
/// 48-bit form. Encoding presets fill the role slots and `imm_control`;
/// the encoder derives the rest from the operand list and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstrFlags {
    pub modrm_idx: u8,
    pub modreg_idx: u8,
    pub vexreg_idx: u8,
    pub zeroreg_idx: u8,
    pub imm_idx: u8,
    pub zeroreg_val: u8,
    pub lock: u8,
    pub imm_control: u8,
    pub vsib: u8,
    pub op0_size: u8,
    pub op1_size: u8,
    pub op2_size: u8,
    pub op3_size: u8,
    pub opsize: u8,
    pub size_fix1: u8,
    pub size_fix2: u8,
    pub instr_width: u8,
    pub op0_regty: u8,
    pub op1_regty: u8,
    pub op2_regty: u8,
    pub ign66: u8,
}

impl InstrFlags {
    /// Packs every field into the 48-bit record with explicit shifts.
    pub fn encode(&self) -> u64 {
        field(self.modrm_idx, MODRM_IDX_SHIFT, MODRM_IDX_BITS)
            | field(self.modreg_idx, MODREG_IDX_SHIFT, MODREG_IDX_BITS)
            | field(self.vexreg_idx, VEXREG_IDX_SHIFT, VEXREG_IDX_BITS)
            | field(self.zeroreg_idx, ZEROREG_IDX_SHIFT, ZEROREG_IDX_BITS)
            | field(self.imm_idx, IMM_IDX_SHIFT, IMM_IDX_BITS)
            | field(self.zeroreg_val, ZEROREG_VAL_SHIFT, ZEROREG_VAL_BITS)
            | field(self.lock, LOCK_SHIFT, LOCK_BITS)
            | field(self.imm_control, IMM_CONTROL_SHIFT, IMM_CONTROL_BITS)
            | field(self.vsib, VSIB_SHIFT, VSIB_BITS)
            | field(self.op0_size, OP0_SIZE_SHIFT, OP_SIZE_BITS)
            | field(self.op1_size, OP1_SIZE_SHIFT, OP_SIZE_BITS)
            | field(self.op2_size, OP2_SIZE_SHIFT, OP_SIZE_BITS)
            | field(self.op3_size, OP3_SIZE_SHIFT, OP_SIZE_BITS)
            | field(self.opsize, OPSIZE_SHIFT, OPSIZE_BITS)
            | field(self.size_fix1, SIZE_FIX1_SHIFT, SIZE_FIX1_BITS)
            | field(self.size_fix2, SIZE_FIX2_SHIFT, SIZE_FIX2_BITS)
            | field(self.instr_width, INSTR_WIDTH_SHIFT, INSTR_WIDTH_BITS)
            | field(self.op0_regty, OP0_REGTY_SHIFT, OP_REGTY_BITS)
            | field(self.op1_regty, OP1_REGTY_SHIFT, OP_REGTY_BITS)
            | field(self.op2_regty, OP2_REGTY_SHIFT, OP_REGTY_BITS)
            | field(self.ign66, IGN66_SHIFT, IGN66_BITS)
    }
}

/// Preset descriptor fields for an encoding tag: which operand slot is
/// ModR/M r/m, ModR/M reg, VEX.vvvv, the implicit zero register or the
/// immediate, and the base immediate-control code.
///
/// Slot indices are stored XOR 3 so unset means unused.
pub fn encoding_preset(tag: &str) -> Option<InstrFlags> {
    let d = InstrFlags::default();
    let preset = match tag {
        "NP" => d,
        "M" => InstrFlags { modrm_idx: 0 ^ 3, ..d },
        "M1" => InstrFlags { modrm_idx: 0 ^ 3, imm_idx: 1 ^ 3, imm_control: 1, ..d },
        "MI" => InstrFlags { modrm_idx: 0 ^ 3, imm_idx: 1 ^ 3, imm_control: 4, ..d },
        "MC" => InstrFlags { modrm_idx: 0 ^ 3, zeroreg_idx: 1 ^ 3, zeroreg_val: 1, ..d },
        "MR" => InstrFlags { modrm_idx: 0 ^ 3, modreg_idx: 1 ^ 3, ..d },
        "RM" => InstrFlags { modrm_idx: 1 ^ 3, modreg_idx: 0 ^ 3, ..d },
        "RMA" => InstrFlags { modrm_idx: 1 ^ 3, modreg_idx: 0 ^ 3, zeroreg_idx: 2 ^ 3, ..d },
        "MRI" => InstrFlags { modrm_idx: 0 ^ 3, modreg_idx: 1 ^ 3, imm_idx: 2 ^ 3, imm_control: 4, ..d },
        "RMI" => InstrFlags { modrm_idx: 1 ^ 3, modreg_idx: 0 ^ 3, imm_idx: 2 ^ 3, imm_control: 4, ..d },
        "MRC" => InstrFlags { modrm_idx: 0 ^ 3, modreg_idx: 1 ^ 3, zeroreg_idx: 2 ^ 3, zeroreg_val: 1, ..d },
        "AM" => InstrFlags { modrm_idx: 1 ^ 3, zeroreg_idx: 0 ^ 3, ..d },
        "MA" => InstrFlags { modrm_idx: 0 ^ 3, zeroreg_idx: 1 ^ 3, ..d },
        "I" => InstrFlags { imm_idx: 0 ^ 3, imm_control: 4, ..d },
        "IA" => InstrFlags { zeroreg_idx: 0 ^ 3, imm_idx: 1 ^ 3, imm_control: 4, ..d },
        "O" => InstrFlags { modreg_idx: 0 ^ 3, ..d },
        "OI" => InstrFlags { modreg_idx: 0 ^ 3, imm_idx: 1 ^ 3, imm_control: 4, ..d },
        "OA" => InstrFlags { modreg_idx: 0 ^ 3, zeroreg_idx: 1 ^ 3, ..d },
        // Segment register encoded in ModR/M reg bits 3..5.
        "S" => InstrFlags { modreg_idx: 0 ^ 3, vsib: 1, ..d },
        "A" => InstrFlags { zeroreg_idx: 0 ^ 3, ..d },
        "D" => InstrFlags { imm_idx: 0 ^ 3, imm_control: 6, ..d },
        "FD" => InstrFlags { zeroreg_idx: 0 ^ 3, imm_idx: 1 ^ 3, imm_control: 2, ..d },
        "TD" => InstrFlags { zeroreg_idx: 1 ^ 3, imm_idx: 0 ^ 3, imm_control: 2, ..d },
        "RVM" => InstrFlags { modrm_idx: 2 ^ 3, modreg_idx: 0 ^ 3, vexreg_idx: 1 ^ 3, ..d },
        "RVMI" => InstrFlags { modrm_idx: 2 ^ 3, modreg_idx: 0 ^ 3, vexreg_idx: 1 ^ 3, imm_idx: 3 ^ 3, imm_control: 4, ..d },
        "RVMR" => InstrFlags { modrm_idx: 2 ^ 3, modreg_idx: 0 ^ 3, vexreg_idx: 1 ^ 3, imm_idx: 3 ^ 3, imm_control: 3, ..d },
        "RMV" => InstrFlags { modrm_idx: 1 ^ 3, modreg_idx: 0 ^ 3, vexreg_idx: 2 ^ 3, ..d },
        "VM" => InstrFlags { modrm_idx: 1 ^ 3, vexreg_idx: 0 ^ 3, ..d },
        "VMI" => InstrFlags { modrm_idx: 1 ^ 3, vexreg_idx: 0 ^ 3, imm_idx: 2 ^ 3, imm_control: 4, ..d },
        "MVR" => InstrFlags { modrm_idx: 0 ^ 3, modreg_idx: 2 ^ 3, vexreg_idx: 1 ^ 3, ..d },
        _ => return None,
    };
    Some(preset)
}

/// A fully packed descriptor: the mnemonic enum member plus three
/// little-endian 16-bit words of bitfields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackedDesc {
    pub mnemonic: String,
    pub words: [u16; 3],
}

/// Size codes used by the packed record: log2-of-bytes for fixed sizes,
/// -2 for "effective operand size", -3 for "effective vector size".
/// The ten-byte x87 form carries code 0 like a size-less operand.
pub fn size_code(size: i8) -> i8 {
    match size {
        0 => 0,
        1 => 1,
        2 => 2,
        4 => 3,
        8 => 4,
        16 => 5,
        32 => 6,
        64 => 7,
        10 => 0,
        SZ_OP => -2,
        SZ_VEC => -3,
        _ => unreachable!("operand sizes come from the closed kind table"),
    }
}

pub fn regty_code(kind: RegKind) -> u8 {
    match kind {
        RegKind::Gp => 0,
        RegKind::Fpu => 1,
        RegKind::Xmm => 2,
        RegKind::Mask => 3,
        RegKind::Mmx => 4,
        RegKind::Bnd => 5,
        _ => 7,
    }
}

/// Bit-packs a parsed descriptor into its 48-bit record.
///
/// `ign66` is set when the opcode pattern already consumed a legacy-prefix
/// selector, in which case a runtime 66 prefix must not change the operand
/// size (unless the descriptor opts back in with USE66).
pub fn encode_desc(desc: &InstrDesc, ign66: bool) -> Result<PackedDesc, TableError> {
    let mut flags = encoding_preset(&desc.encoding).ok_or_else(|| {
        TableError::new(TableErrorKind::UnknownEncoding, &desc.encoding)
    })?;

    let size_codes: std::collections::BTreeSet<i8> =
        desc.operands.iter().map(|op| size_code(op.size)).collect();

    // At most two distinct fixed sizes fit in the record; the second lives
    // in the narrow size_fix2 field and must be in 1..=4.
    let mut fixed: Vec<i8> = size_codes.iter().copied().filter(|&c| c >= 0).collect();
    fixed.sort_by_key(|&c| (1..=4).contains(&c));
    if fixed.len() > 2 || (fixed.len() == 2 && !(1..=4).contains(&fixed[1])) {
        return Err(TableError::new(
            TableErrorKind::InvalidFixedSizes,
            format!("{:?} for {}", fixed, desc.mnemonic),
        ));
    }
    let sizes: [i8; 4] = [
        fixed.first().copied().unwrap_or(1),
        fixed.get(1).copied().unwrap_or(1),
        -2,
        -3,
    ];
    flags.size_fix1 = sizes[0] as u8;
    flags.size_fix2 = (sizes[1] - 1) as u8;

    for (i, op) in desc.operands.iter().enumerate() {
        let code = size_code(op.size);
        let size_index = sizes.iter().position(|&s| s == code).ok_or_else(|| {
            TableError::new(
                TableErrorKind::InvalidFixedSizes,
                format!("size {} unplaced for {}", code, desc.mnemonic),
            )
        })? as u8;
        let reg_type = regty_code(op.kind);
        match i {
            0 => {
                flags.op0_size = size_index;
                flags.op0_regty = reg_type;
            }
            1 => {
                flags.op1_size = size_index;
                flags.op1_regty = reg_type;
            }
            2 => {
                flags.op2_size = size_index;
                flags.op2_regty = reg_type;
            }
            _ => {
                flags.op3_size = size_index;
                // No regty field for operand 3; only vector registers
                // (or typeless operands) may sit there.
                if reg_type != 7 && reg_type != 2 {
                    return Err(TableError::new(
                        TableErrorKind::InvalidOperand3,
                        format!("operand 3 of {} must be VEC", desc.mnemonic),
                    ));
                }
            }
        }
    }

    if desc.has_flag("SIZE_8") {
        flags.opsize = 1;
    }
    if desc.has_flag("DEF64") {
        flags.opsize = 2;
    }
    if desc.has_flag("FORCE64") {
        flags.opsize = 3;
    }
    if desc.has_flag("INSTR_WIDTH") {
        flags.instr_width = 1;
    }
    if desc.has_flag("LOCK") {
        flags.lock = 1;
    }
    if desc.has_flag("VSIB") {
        flags.vsib = 1;
    }

    if !desc.has_flag("USE66") && (ign66 || desc.has_flag("IGN66")) {
        flags.ign66 = 1;
    }

    // Plain immediates that always reduce to one byte switch to the byte
    // variant of the control code.
    if flags.imm_control >= 4 {
        let imm_op = desc
            .operands
            .iter()
            .find(|op| op.kind == RegKind::Imm)
            .ok_or_else(|| {
                TableError::new(TableErrorKind::MissingImmediate, &desc.mnemonic)
            })?;
        if desc.has_flag("IMM_8")
            || imm_op.size == 1
            || (imm_op.size == SZ_OP && desc.has_flag("SIZE_8"))
        {
            flags.imm_control |= 1;
        }
    }

    let enc = flags.encode();
    Ok(PackedDesc {
        mnemonic: format!("FDI_{}", desc.mnemonic),
        words: [enc as u16, (enc >> 16) as u16, (enc >> 32) as u16],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::descriptor::InstrDesc;

    fn unpack(enc: u64, shift: u64, bits: u64) -> u8 {
        ((enc >> shift) & ((1 << bits) - 1)) as u8
    }

    fn words_to_u64(words: [u16; 3]) -> u64 {
        words[0] as u64 | (words[1] as u64) << 16 | (words[2] as u64) << 32
    }

    #[test]
    fn test_pack_round_trip() {
        let flags = InstrFlags {
            modrm_idx: 2,
            modreg_idx: 3,
            imm_idx: 1,
            imm_control: 5,
            lock: 1,
            op0_size: 2,
            op1_size: 0,
            opsize: 2,
            size_fix1: 6,
            size_fix2: 1,
            op0_regty: 2,
            op1_regty: 0,
            ign66: 1,
            ..Default::default()
        };
        let enc = flags.encode();
        assert_eq!(unpack(enc, MODRM_IDX_SHIFT, MODRM_IDX_BITS), 2);
        assert_eq!(unpack(enc, MODREG_IDX_SHIFT, MODREG_IDX_BITS), 3);
        assert_eq!(unpack(enc, IMM_IDX_SHIFT, IMM_IDX_BITS), 1);
        assert_eq!(unpack(enc, IMM_CONTROL_SHIFT, IMM_CONTROL_BITS), 5);
        assert_eq!(unpack(enc, LOCK_SHIFT, LOCK_BITS), 1);
        assert_eq!(unpack(enc, OP0_SIZE_SHIFT, OP_SIZE_BITS), 2);
        assert_eq!(unpack(enc, OPSIZE_SHIFT, OPSIZE_BITS), 2);
        assert_eq!(unpack(enc, SIZE_FIX1_SHIFT, SIZE_FIX1_BITS), 6);
        assert_eq!(unpack(enc, SIZE_FIX2_SHIFT, SIZE_FIX2_BITS), 1);
        assert_eq!(unpack(enc, OP0_REGTY_SHIFT, OP_REGTY_BITS), 2);
        assert_eq!(unpack(enc, IGN66_SHIFT, IGN66_BITS), 1);
        // 48 bits total; nothing may spill past the third word.
        assert_eq!(enc >> 48, 0);
    }

    #[test]
    fn test_encode_movups() {
        // NP.0f.10 RM - XMM XMM128 - MOVUPS
        let desc = InstrDesc::parse("RM - XMM XMM128 - MOVUPS").unwrap();
        let packed = encode_desc(&desc, true).unwrap();
        assert_eq!(packed.mnemonic, "FDI_MOVUPS");

        let enc = words_to_u64(packed.words);
        assert_eq!(unpack(enc, MODRM_IDX_SHIFT, MODRM_IDX_BITS), 1 ^ 3);
        assert_eq!(unpack(enc, MODREG_IDX_SHIFT, MODREG_IDX_BITS), 0 ^ 3);
        assert_eq!(unpack(enc, IMM_CONTROL_SHIFT, IMM_CONTROL_BITS), 0);
        // Operand 0 follows the vector size, operand 1 is fixed 16 bytes.
        assert_eq!(unpack(enc, OP0_SIZE_SHIFT, OP_SIZE_BITS), 3);
        assert_eq!(unpack(enc, OP1_SIZE_SHIFT, OP_SIZE_BITS), 0);
        assert_eq!(unpack(enc, SIZE_FIX1_SHIFT, SIZE_FIX1_BITS), 5);
        assert_eq!(unpack(enc, OP0_REGTY_SHIFT, OP_REGTY_BITS), 2);
        assert_eq!(unpack(enc, OP1_REGTY_SHIFT, OP_REGTY_BITS), 2);
        assert_eq!(unpack(enc, IGN66_SHIFT, IGN66_BITS), 1);
    }

    #[test]
    fn test_encode_ret_def64() {
        // c3 NP - - - - RET DEF64
        let desc = InstrDesc::parse("NP - - - - RET DEF64").unwrap();
        let packed = encode_desc(&desc, false).unwrap();

        let enc = words_to_u64(packed.words);
        assert_eq!(unpack(enc, OPSIZE_SHIFT, OPSIZE_BITS), 2);
        assert_eq!(unpack(enc, MODRM_IDX_SHIFT, MODRM_IDX_BITS), 0);
        assert_eq!(unpack(enc, MODREG_IDX_SHIFT, MODREG_IDX_BITS), 0);
        assert_eq!(unpack(enc, IMM_IDX_SHIFT, IMM_IDX_BITS), 0);
        assert_eq!(unpack(enc, ZEROREG_IDX_SHIFT, ZEROREG_IDX_BITS), 0);
    }

    #[test]
    fn test_imm_control_byte_variant() {
        // 8-bit immediate flips the low imm_control bit.
        let desc = InstrDesc::parse("MI GP8 IMM8 - - MOV SIZE_8").unwrap();
        let packed = encode_desc(&desc, false).unwrap();
        let enc = words_to_u64(packed.words);
        assert_eq!(unpack(enc, IMM_CONTROL_SHIFT, IMM_CONTROL_BITS), 4 | 1);

        // Operand-size immediate stays at the word/dword variant.
        let desc = InstrDesc::parse("MI GP IMM - - MOV").unwrap();
        let packed = encode_desc(&desc, false).unwrap();
        let enc = words_to_u64(packed.words);
        assert_eq!(unpack(enc, IMM_CONTROL_SHIFT, IMM_CONTROL_BITS), 4);
    }

    #[test]
    fn test_too_many_fixed_sizes() {
        let desc = InstrDesc::parse("MR GP16 GP32 GP64 - BAD").unwrap();
        assert!(encode_desc(&desc, false).is_err());
    }

    #[test]
    fn test_interned_descriptors_compare_equal() {
        let a = InstrDesc::parse("RM - XMM XMM128 - MOVUPS").unwrap();
        let b = InstrDesc::parse("RM - XMM XMM128 - MOVUPS").unwrap();
        assert_eq!(encode_desc(&a, true).unwrap(), encode_desc(&b, true).unwrap());
    }
}
