pub mod descriptor;
pub mod opcode;
pub use descriptor::InstrDesc;
pub use opcode::Opcode;

pub(crate) mod test;

use crate::error::parse_error::ParseError;

/// One spec line: an opcode pattern paired with an instruction descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntry {
    pub opcode: Opcode,
    pub desc: InstrDesc,
}

/// Parses the whole instruction spec file.
///
/// Empty lines and `#` comments are skipped. `UNDOC`-flagged entries are
/// dropped unless `with_undoc` is set.
pub fn parse_spec(text: &str, with_undoc: bool) -> Result<Vec<SpecEntry>, ParseError> {
    let mut entries = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (opcode_string, desc_string) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;

        let opcode = Opcode::parse(opcode_string)?;
        let desc = InstrDesc::parse(desc_string)?;
        if !desc.has_flag("UNDOC") || with_undoc {
            entries.push(SpecEntry { opcode, desc });
        }
    }

    Ok(entries)
}
