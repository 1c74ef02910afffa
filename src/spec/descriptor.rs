use std::collections::HashSet;

use crate::error::parse_error::ParseError;
use crate::utils::logger::Logger;

/// Operand size follows the effective operand size (16/32/64).
pub const SZ_OP: i8 = -1;
/// Operand size follows the effective vector length (128/256).
pub const SZ_VEC: i8 = -2;

/// Register file (or non-register form) an operand lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    Imm,
    Mem,
    Gp,
    Xmm,
    Mmx,
    Fpu,
    Seg,
    Mask,
    Bnd,
    Cr,
    Dr,
}

/// One operand slot: a byte size (or a size placeholder) plus a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpKind {
    pub size: i8,
    pub kind: RegKind,
}

impl OpKind {
    const fn new(size: i8, kind: RegKind) -> Self {
        Self { size, kind }
    }

    /// Resolves the operand size in bytes against the effective operand and
    /// vector sizes. `None` when the needed effective size is unavailable.
    pub fn abssize(&self, opsz: Option<i64>, vecsz: Option<i64>) -> Option<i64> {
        match self.size {
            SZ_OP => opsz,
            SZ_VEC => vecsz,
            size => Some(size as i64),
        }
    }

    /// Looks up an operand-kind token from the spec grammar.
    pub fn lookup(name: &str) -> Option<OpKind> {
        use RegKind::*;
        let kind = match name {
            "IMM" => Self::new(SZ_OP, Imm),
            "IMM8" => Self::new(1, Imm),
            "IMM16" => Self::new(2, Imm),
            "IMM32" => Self::new(4, Imm),
            "IMM64" => Self::new(8, Imm),
            "GP" => Self::new(SZ_OP, Gp),
            "GP8" => Self::new(1, Gp),
            "GP16" => Self::new(2, Gp),
            "GP32" => Self::new(4, Gp),
            "GP64" => Self::new(8, Gp),
            "MMX" => Self::new(8, Mmx),
            "XMM" => Self::new(SZ_VEC, Xmm),
            "XMM8" => Self::new(1, Xmm),
            "XMM16" => Self::new(2, Xmm),
            "XMM32" => Self::new(4, Xmm),
            "XMM64" => Self::new(8, Xmm),
            "XMM128" => Self::new(16, Xmm),
            "XMM256" => Self::new(32, Xmm),
            "SEG" => Self::new(SZ_OP, Seg),
            "SEG16" => Self::new(2, Seg),
            "FPU" => Self::new(10, Fpu),
            "MEM" => Self::new(SZ_OP, Mem),
            "MEMV" => Self::new(SZ_VEC, Mem),
            "MEMZ" => Self::new(0, Mem),
            "MEM8" => Self::new(1, Mem),
            "MEM16" => Self::new(2, Mem),
            "MEM32" => Self::new(4, Mem),
            "MEM64" => Self::new(8, Mem),
            "MEM128" => Self::new(16, Mem),
            "MEM256" => Self::new(32, Mem),
            "MEM512" => Self::new(64, Mem),
            "MASK8" => Self::new(1, Mask),
            "MASK16" => Self::new(2, Mask),
            "MASK32" => Self::new(4, Mask),
            "MASK64" => Self::new(8, Mask),
            "BND" => Self::new(0, Bnd),
            "CR" => Self::new(0, Cr),
            "DR" => Self::new(0, Dr),
            _ => return None,
        };
        Some(kind)
    }
}

/// Flag tokens the descriptor grammar understands. Anything else is
/// accepted with a warning so new table revisions fail soft.
const KNOWN_FLAGS: &[&str] = &[
    "DEF64",
    "FORCE64",
    "SIZE_8",
    "INSTR_WIDTH",
    "IMM_8",
    "LOCK",
    "VSIB",
    "USE66",
    "IGN66",
    "NFx",
    "ONLY32",
    "ONLY64",
    "UNDOC",
    "ENC_REP",
    "ENC_REPCC",
    "ENC_SEPSZ",
    "ENC_NOSZ",
];

/// Parsed instruction descriptor: encoding tag, operand kinds, mnemonic
/// and flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrDesc {
    pub mnemonic: String,
    pub encoding: String,
    pub operands: Vec<OpKind>,
    pub flags: HashSet<String>,
}

impl InstrDesc {
    pub fn parse(desc: &str) -> Result<Self, ParseError> {
        let words: Vec<&str> = desc.split_whitespace().collect();
        if words.len() < 6 {
            return Err(ParseError::MalformedLine(desc.to_string()));
        }

        if crate::encoding::encoding_preset(words[0]).is_none() {
            return Err(ParseError::UnknownEncoding(words[0].to_string()));
        }

        // Operand slots are positional but "-" placeholders are dropped.
        let mut operands = Vec::new();
        for word in &words[1..5] {
            if *word == "-" {
                continue;
            }
            let operand = OpKind::lookup(word)
                .ok_or_else(|| ParseError::UnknownOperandKind(word.to_string()))?;
            operands.push(operand);
        }

        for flag in &words[6..] {
            if !KNOWN_FLAGS.contains(flag) {
                Logger::warn(format!("unknown flag {} for {}", flag, words[5]));
            }
        }
        let flags: HashSet<String> = words[6..].iter().map(|w| w.to_string()).collect();

        Ok(Self {
            mnemonic: words[5].to_string(),
            encoding: words[0].to_string(),
            operands,
            flags,
        })
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}
