//! Bit layout of the packed 48-bit instruction descriptor record.
//!
//! The decoder runtime reads these exact positions; changing anything here
//! changes the on-disk table format. The whole layout is kept in this one
//! module so a build against a different runtime revision is a single swap.

// Operand-role slot indices. Stored as the slot number XOR 3 so that an
// all-zero field means "role unused" and 3 means "slot 0".
/// ModR/M r/m operand slot (XOR 3)
pub const MODRM_IDX_SHIFT: u64 = 0;
pub const MODRM_IDX_BITS: u64 = 2;

/// ModR/M reg operand slot (XOR 3)
pub const MODREG_IDX_SHIFT: u64 = 2;
pub const MODREG_IDX_BITS: u64 = 2;

/// VEX.vvvv operand slot (XOR 3)
pub const VEXREG_IDX_SHIFT: u64 = 4;
pub const VEXREG_IDX_BITS: u64 = 2;

/// Implicit zero-register operand slot (XOR 3)
pub const ZEROREG_IDX_SHIFT: u64 = 6;
pub const ZEROREG_IDX_BITS: u64 = 2;

/// Immediate operand slot (XOR 3)
pub const IMM_IDX_SHIFT: u64 = 8;
pub const IMM_IDX_BITS: u64 = 2;

/// Zero-register selector: 0 = AX, 1 = CX
pub const ZEROREG_VAL_SHIFT: u64 = 10;
pub const ZEROREG_VAL_BITS: u64 = 1;

/// Instruction is LOCK-able
pub const LOCK_SHIFT: u64 = 11;
pub const LOCK_BITS: u64 = 1;

/// How the immediate is sourced: 0 none, 1 constant 1, 2 memory offset,
/// 3 register in immediate high bits, 4+ plain/8-bit/sign-extended/offset
/// (low bit = reduced to one byte)
pub const IMM_CONTROL_SHIFT: u64 = 12;
pub const IMM_CONTROL_BITS: u64 = 3;

/// Memory operand uses a VSIB addressing form
pub const VSIB_SHIFT: u64 = 15;
pub const VSIB_BITS: u64 = 1;

// Per-operand size selector: an index into
// [size_fix1, size_fix2 + 1, opsize, vecsize].
pub const OP0_SIZE_SHIFT: u64 = 16;
pub const OP1_SIZE_SHIFT: u64 = 18;
pub const OP2_SIZE_SHIFT: u64 = 20;
pub const OP3_SIZE_SHIFT: u64 = 22;
pub const OP_SIZE_BITS: u64 = 2;

/// Operand-size class: 0 default, 1 byte, 2 default-64, 3 forced-64
pub const OPSIZE_SHIFT: u64 = 24;
pub const OPSIZE_BITS: u64 = 2;

/// First fixed operand size (log2 of bytes)
pub const SIZE_FIX1_SHIFT: u64 = 26;
pub const SIZE_FIX1_BITS: u64 = 3;

/// Second fixed operand size minus one (log2 of bytes, range 1..4)
pub const SIZE_FIX2_SHIFT: u64 = 29;
pub const SIZE_FIX2_BITS: u64 = 2;

/// Immediate operand encodes the instruction width
pub const INSTR_WIDTH_SHIFT: u64 = 31;
pub const INSTR_WIDTH_BITS: u64 = 1;

// Per-operand register type: GP=0 FPU=1 XMM=2 MASK=3 MMX=4 BND=5 other=7.
pub const OP0_REGTY_SHIFT: u64 = 32;
pub const OP1_REGTY_SHIFT: u64 = 35;
pub const OP2_REGTY_SHIFT: u64 = 38;
pub const OP_REGTY_BITS: u64 = 3;

// Bits 41..46 are reserved.

/// Ignore a runtime 66 prefix (it is part of the opcode pattern)
pub const IGN66_SHIFT: u64 = 47;
pub const IGN66_BITS: u64 = 1;

/// Places `value` into a bitfield, masking it to `bits`.
pub const fn field(value: u8, shift: u64, bits: u64) -> u64 {
    ((value as u64) & ((1 << bits) - 1)) << shift
}
