use crate::error::parse_error::ParseError;
use crate::trie::EntryKind;

/// Mandatory legacy prefix class of an opcode pattern.
///
/// The decode table selects on this with a 4-entry prefix node.
/// `NFx` means "neither F2 nor F3" and fans out over the NP and 66 slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Np,
    P66,
    F3,
    F2,
    NFx,
}

impl Prefix {
    /// Prefix node slot index: NP=0, 66=1, F3=2, F2=3.
    pub fn table_index(self) -> Option<u16> {
        match self {
            Prefix::Np => Some(0),
            Prefix::P66 => Some(1),
            Prefix::F3 => Some(2),
            Prefix::F2 => Some(3),
            Prefix::NFx => None,
        }
    }
}

/// A declared VEX.W or VEX.L attribute bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrBit {
    Clear,
    Set,
    /// `IG`: the bit is ignored, both settings select the same entry.
    Ignored,
}

/// ModR/M mode class of a `/..` opcode suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeClass {
    /// mod = 11 only
    Reg,
    /// mod != 11 only
    Mem,
    /// both register and memory forms
    RegMem,
}

impl ModeClass {
    pub fn letters(self) -> &'static str {
        match self {
            ModeClass::Reg => "r",
            ModeClass::Mem => "m",
            ModeClass::RegMem => "rm",
        }
    }
}

/// An abstract opcode pattern, covering a family of concrete byte sequences.
///
/// Grammar (one token, no whitespace):
///
/// ```text
/// [ [VEX.] (NP|66|F2|F3|NFx) . [W(0|1|IG).] [L(0|1|IG).] ]
/// (0f | 0f38 | 0f3a | "") XX
/// [ + | /(0-7|r|m|(0-7)r|(0-7)m) | c0..ff ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub prefix: Option<Prefix>,
    /// Escape index: 0 = none, 1 = 0f, 2 = 0f38, 3 = 0f3a.
    pub escape: u8,
    pub opc: u8,
    /// `+` suffix: the low 3 opcode bits encode a register, fan out over
    /// `opc..opc+7`.
    pub extended: bool,
    /// `/..` suffix: (reg digit or wildcard, mode class).
    pub modreg: Option<(Option<u8>, ModeClass)>,
    /// A fixed 0xc0..0xff ModR/M byte acting as a second opcode byte.
    pub opcext: Option<u8>,
    pub vex: bool,
    pub vexl: Option<AttrBit>,
    pub rexw: Option<AttrBit>,
}

fn is_lower_hex(c: char) -> bool {
    c.is_ascii_digit() || ('a'..='f').contains(&c)
}

fn parse_hex_byte(text: &str) -> Option<u8> {
    if text.len() == 2 && text.chars().all(is_lower_hex) {
        u8::from_str_radix(text, 16).ok()
    } else {
        None
    }
}

fn parse_attr_bit(text: &str) -> Option<AttrBit> {
    match text {
        "0" => Some(AttrBit::Clear),
        "1" => Some(AttrBit::Set),
        "IG" => Some(AttrBit::Ignored),
        _ => None,
    }
}

impl Opcode {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedOpcode(text.to_string());

        let segments: Vec<&str> = text.split('.').collect();
        let mut index = 0;

        let mut vex = false;
        let mut prefix = None;
        let mut rexw = None;
        let mut vexl = None;

        // The dotted prefix group. When present it must carry a legacy
        // prefix class; VEX and the W/L attributes are optional around it.
        if segments.len() > 1 {
            if segments[index] == "VEX" {
                vex = true;
                index += 1;
            }

            prefix = Some(match segments.get(index).copied() {
                Some("NP") => Prefix::Np,
                Some("66") => Prefix::P66,
                Some("F3") => Prefix::F3,
                Some("F2") => Prefix::F2,
                Some("NFx") => Prefix::NFx,
                _ => return Err(malformed()),
            });
            index += 1;

            if let Some(rest) = segments.get(index).and_then(|s| s.strip_prefix('W')) {
                rexw = Some(parse_attr_bit(rest).ok_or_else(malformed)?);
                index += 1;
            }
            if let Some(rest) = segments.get(index).and_then(|s| s.strip_prefix('L')) {
                vexl = Some(parse_attr_bit(rest).ok_or_else(malformed)?);
                index += 1;
            }
        }

        // Exactly one segment must remain: escape + opcode byte + suffix.
        if index + 1 != segments.len() {
            return Err(malformed());
        }
        let body = segments[index];

        // "0f38" is both a valid escape and escape 0f with opcode 38, so an
        // escape candidate only matches when the remainder parses as well.
        for (escape_str, escape) in [("0f38", 2u8), ("0f3a", 3), ("0f", 1), ("", 0)] {
            let rest = match body.strip_prefix(escape_str) {
                Some(rest) => rest,
                None => continue,
            };
            let opc = match rest.get(..2).and_then(parse_hex_byte) {
                Some(opc) => opc,
                None => continue,
            };
            let suffix = &rest[2..];

            let mut extended = false;
            let mut modreg = None;
            let mut opcext = None;
            if suffix == "+" {
                extended = true;
            } else if let Some(spec) = suffix.strip_prefix('/') {
                modreg = Some(Self::parse_modreg(spec).ok_or_else(malformed)?);
            } else if !suffix.is_empty() {
                let ext = parse_hex_byte(suffix).ok_or_else(malformed)?;
                if ext < 0xc0 {
                    return Err(malformed());
                }
                opcext = Some(ext);
            }

            return Ok(Self {
                prefix,
                escape,
                opc,
                extended,
                modreg,
                opcext,
                vex,
                vexl,
                rexw,
            });
        }

        Err(malformed())
    }

    fn parse_modreg(spec: &str) -> Option<(Option<u8>, ModeClass)> {
        let mut chars = spec.chars();
        let first = chars.next()?;
        match first {
            'r' if spec.len() == 1 => Some((None, ModeClass::Reg)),
            'm' if spec.len() == 1 => Some((None, ModeClass::Mem)),
            '0'..='7' => {
                let reg = first as u8 - b'0';
                match chars.next() {
                    None => Some((Some(reg), ModeClass::RegMem)),
                    Some('r') if spec.len() == 2 => Some((Some(reg), ModeClass::Reg)),
                    Some('m') if spec.len() == 2 => Some((Some(reg), ModeClass::Mem)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Expands the pattern into every concrete trie path it denotes.
    ///
    /// Each step of a path is the node kind entered plus the slot index
    /// within it. Wildcards multiply: `+` contributes 8 opcode bytes, `NFx`
    /// 2 prefix slots, a reg wildcard 8 (or 16 with both mode classes)
    /// ModR/M slots, and each unresolved W/L attribute doubles the VEX leg.
    pub fn paths(&self) -> Vec<Vec<(EntryKind, u16)>> {
        let mut stages: Vec<(EntryKind, Vec<u16>)> = Vec::new();

        stages.push((
            EntryKind::Root,
            vec![self.escape as u16 | (self.vex as u16) << 2],
        ));

        if !self.extended {
            stages.push((EntryKind::Table256, vec![self.opc as u16]));
        } else {
            let bytes = (0..8).map(|i| self.opc as u16 + i).collect();
            stages.push((EntryKind::Table256, bytes));
        }

        if let Some(prefix) = self.prefix {
            let slots = match prefix.table_index() {
                Some(index) => vec![index],
                None => vec![0, 1],
            };
            stages.push((EntryKind::Prefix, slots));
        }

        if let Some(opcext) = self.opcext {
            let high = ((opcext as u16 - 0xc0) >> 3) | 8;
            stages.push((EntryKind::Table16, vec![high]));
            stages.push((EntryKind::Table8E, vec![opcext as u16 & 7]));
        }

        if let Some((reg, mode)) = self.modreg {
            let mods: &[u16] = match mode {
                ModeClass::Mem => &[0],
                ModeClass::Reg => &[1 << 3],
                ModeClass::RegMem => &[0, 1 << 3],
            };
            let regs: Vec<u16> = match reg {
                Some(reg) => vec![reg as u16],
                None => (0..8).collect(),
            };
            let slots = mods
                .iter()
                .flat_map(|m| regs.iter().map(move |r| m + r))
                .collect();
            stages.push((EntryKind::Table16, slots));
        }

        if self.vexl.is_some() || self.rexw.is_some() {
            let expand = |attr: Option<AttrBit>, bit: u16| -> Vec<u16> {
                match attr.unwrap_or(AttrBit::Ignored) {
                    AttrBit::Clear => vec![0],
                    AttrBit::Set => vec![bit],
                    AttrBit::Ignored => vec![0, bit],
                }
            };
            let rexw = expand(self.rexw, 1 << 0);
            let vexl = expand(self.vexl, 1 << 1);
            let slots = rexw
                .iter()
                .flat_map(|w| vexl.iter().map(move |l| w + l))
                .collect();
            stages.push((EntryKind::Vex, slots));
        }

        let mut paths: Vec<Vec<(EntryKind, u16)>> = vec![Vec::new()];
        for (kind, values) in &stages {
            let mut next = Vec::with_capacity(paths.len() * values.len());
            for path in &paths {
                for value in values {
                    let mut extended_path = path.clone();
                    extended_path.push((*kind, *value));
                    next.push(extended_path);
                }
            }
            paths = next;
        }
        paths
    }
}

/// Renders a concrete trie path back into opcode-pattern notation.
///
/// Used to derive the canonical debug name of every trie node.
pub fn format_path(path: &[(EntryKind, u16)]) -> String {
    use std::fmt::Write;

    let mut opcode = String::new();
    let mut prefix = String::new();
    for &(kind, byte) in path {
        match kind {
            EntryKind::Root => {
                opcode += ["", "0f", "0f38", "0f3a"][(byte & 3) as usize];
                prefix += ["", "VEX."][(byte >> 2) as usize];
            }
            EntryKind::Table256 => {
                let _ = write!(opcode, "{:02x}", byte);
            }
            EntryKind::Table16 => {
                let _ = write!(opcode, "/{:x}{}", byte & 7, ["m", "r"][(byte >> 3) as usize]);
            }
            EntryKind::Table8E => {
                let _ = write!(opcode, "+rm={:x}", byte);
            }
            EntryKind::Prefix => {
                if byte & 4 != 0 {
                    prefix += "VEX.";
                }
                prefix += ["NP.", "66.", "F3.", "F2."][(byte & 3) as usize];
            }
            EntryKind::Vex => {
                let _ = write!(prefix, "W{}.L{}.", byte & 1, byte >> 1);
            }
            EntryKind::Instr => unreachable!("instruction leaves do not appear in paths"),
        }
    }
    prefix + &opcode
}
