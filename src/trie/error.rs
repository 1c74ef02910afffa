#[derive(Debug)]
pub struct TableError {
    pub kind: TableErrorKind,
    pub message: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TableErrorKind {
    UnknownEncoding,
    InvalidFixedSizes,
    InvalidOperand3,
    MissingImmediate,
    UnspecifiedSize,
    KindMismatch,
    DuplicateLeaf,
    SizeExceeded,
}

impl TableError {
    pub fn new<T: ToString>(kind: TableErrorKind, message: T) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TableError: {:?} = {} ", self.kind, self.message)
    }
}
