#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseError {
    #[error("malformed opcode pattern: {0}")]
    MalformedOpcode(String),
    #[error("malformed spec line: {0}")]
    MalformedLine(String),
    #[error("unknown operand kind: {0}")]
    UnknownOperandKind(String),
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}
