#![cfg(test)]

use crate::error::parse_error::ParseError;
use crate::spec::descriptor::{InstrDesc, OpKind, RegKind, SZ_OP, SZ_VEC};

#[test]
pub fn parse_movups() {
    let desc = InstrDesc::parse("RM - XMM XMM128 - MOVUPS").unwrap();

    assert_eq!(desc.encoding, "RM");
    assert_eq!(desc.mnemonic, "MOVUPS");
    assert_eq!(
        desc.operands,
        vec![
            OpKind { size: SZ_VEC, kind: RegKind::Xmm },
            OpKind { size: 16, kind: RegKind::Xmm },
        ]
    );
    assert!(desc.flags.is_empty());
}

#[test]
pub fn parse_no_operands_with_flags() {
    let desc = InstrDesc::parse("NP - - - - RET DEF64").unwrap();

    assert_eq!(desc.encoding, "NP");
    assert_eq!(desc.mnemonic, "RET");
    assert!(desc.operands.is_empty());
    assert!(desc.has_flag("DEF64"));
}

#[test]
pub fn dash_placeholders_do_not_shift_following_operands() {
    let desc = InstrDesc::parse("MI GP - IMM - SHIFTY").unwrap();

    // Placeholders are dropped; remaining kinds keep their relative order.
    assert_eq!(
        desc.operands,
        vec![
            OpKind { size: SZ_OP, kind: RegKind::Gp },
            OpKind { size: SZ_OP, kind: RegKind::Imm },
        ]
    );
}

#[test]
pub fn parse_multiple_flags() {
    let desc = InstrDesc::parse("MI GP IMM - - ADD LOCK USE66").unwrap();

    assert!(desc.has_flag("LOCK"));
    assert!(desc.has_flag("USE66"));
    assert!(!desc.has_flag("DEF64"));
}

#[test]
pub fn unknown_operand_kind_is_fatal() {
    let result = InstrDesc::parse("RM - GP GP99 - BAD");
    assert_eq!(
        result,
        Err(ParseError::UnknownOperandKind("GP99".to_string()))
    );
}

#[test]
pub fn unknown_encoding_is_fatal() {
    let result = InstrDesc::parse("QQ - - - - BAD");
    assert_eq!(result, Err(ParseError::UnknownEncoding("QQ".to_string())));
}

#[test]
pub fn short_line_is_fatal() {
    assert!(InstrDesc::parse("RM - - -").is_err());
}

#[test]
pub fn abssize_resolution() {
    let gp = OpKind::lookup("GP").unwrap();
    assert_eq!(gp.abssize(Some(4), None), Some(4));
    assert_eq!(gp.abssize(None, Some(16)), None);

    let xmm = OpKind::lookup("XMM").unwrap();
    assert_eq!(xmm.abssize(None, Some(32)), Some(32));

    let fixed = OpKind::lookup("MEM64").unwrap();
    assert_eq!(fixed.abssize(None, None), Some(8));
}

#[test]
pub fn spec_file_parsing_skips_comments_and_undoc() {
    let text = "# comment line\n\
                \n\
                c3 NP - - - - RET DEF64\n\
                d6 NP - - - - SALC UNDOC\n";

    let entries = crate::spec::parse_spec(text, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].desc.mnemonic, "RET");

    let entries = crate::spec::parse_spec(text, true).unwrap();
    assert_eq!(entries.len(), 2);
}
