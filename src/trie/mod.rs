pub mod dedup;
pub mod error;
pub mod layout;
pub use layout::CompiledTable;

pub(crate) mod test;

use std::collections::HashMap;

use crate::encoding::PackedDesc;
use crate::spec::opcode::format_path;

use self::error::{TableError, TableErrorKind};

/// Decode-trie node kinds. The discriminant is the 3-bit tag stored in the
/// low bits of an encoded table link; the root is never linked to and uses
/// an out-of-band value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum EntryKind {
    Instr = 1,
    Table256 = 2,
    Table16 = 3,
    Table8E = 4,
    Prefix = 5,
    Vex = 6,
    Root = -1,
}

impl EntryKind {
    pub fn tag(self) -> i8 {
        self as i8
    }
}

/// A trie node. One variant per table kind, each with its fixed arity, so
/// a node can never hold the wrong number of children; leaves carry the
/// interned descriptor index instead.
///
/// Children are referenced by node name. Names are derived from the opcode
/// path and only serve as stable handles and debug labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrieEntry {
    Instr(usize),
    Root(Box<[Option<String>; 8]>),
    Table256(Box<[Option<String>; 256]>),
    Table16(Box<[Option<String>; 16]>),
    Table8E(Box<[Option<String>; 8]>),
    Prefix(Box<[Option<String>; 4]>),
    Vex(Box<[Option<String>; 4]>),
}

fn empty_items<const N: usize>() -> Box<[Option<String>; N]> {
    Box::new(std::array::from_fn(|_| None))
}

impl TrieEntry {
    pub fn table(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Root => TrieEntry::Root(empty_items()),
            EntryKind::Table256 => TrieEntry::Table256(empty_items()),
            EntryKind::Table16 => TrieEntry::Table16(empty_items()),
            EntryKind::Table8E => TrieEntry::Table8E(empty_items()),
            EntryKind::Prefix => TrieEntry::Prefix(empty_items()),
            EntryKind::Vex => TrieEntry::Vex(empty_items()),
            EntryKind::Instr => unreachable!("instruction leaves carry no child table"),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            TrieEntry::Instr(_) => EntryKind::Instr,
            TrieEntry::Root(_) => EntryKind::Root,
            TrieEntry::Table256(_) => EntryKind::Table256,
            TrieEntry::Table16(_) => EntryKind::Table16,
            TrieEntry::Table8E(_) => EntryKind::Table8E,
            TrieEntry::Prefix(_) => EntryKind::Prefix,
            TrieEntry::Vex(_) => EntryKind::Vex,
        }
    }

    pub fn items(&self) -> &[Option<String>] {
        match self {
            TrieEntry::Instr(_) => &[],
            TrieEntry::Root(items) => &items[..],
            TrieEntry::Table256(items) => &items[..],
            TrieEntry::Table16(items) => &items[..],
            TrieEntry::Table8E(items) => &items[..],
            TrieEntry::Prefix(items) => &items[..],
            TrieEntry::Vex(items) => &items[..],
        }
    }

    pub fn items_mut(&mut self) -> &mut [Option<String>] {
        match self {
            TrieEntry::Instr(_) => &mut [],
            TrieEntry::Root(items) => &mut items[..],
            TrieEntry::Table256(items) => &mut items[..],
            TrieEntry::Table16(items) => &mut items[..],
            TrieEntry::Table8E(items) => &mut items[..],
            TrieEntry::Prefix(items) => &mut items[..],
            TrieEntry::Vex(items) => &mut items[..],
        }
    }
}

/// The decode trie under construction: named nodes in insertion order,
/// one root per emitted decoder mode, and the interned descriptor list.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Insertion order of node names; names deleted by deduplication stay
    /// in this list and are skipped via the `data` lookup.
    order: Vec<String>,
    data: HashMap<String, TrieEntry>,
    roots: Vec<String>,
    descs: Vec<PackedDesc>,
    descs_map: HashMap<PackedDesc, usize>,
    offsets: HashMap<String, usize>,
    annotations: std::collections::BTreeMap<usize, String>,
}

impl Table {
    pub fn new(root_count: usize) -> Self {
        let mut table = Self::default();
        for i in 0..root_count {
            let name = format!("root{}", i);
            table.roots.push(name.clone());
            table.insert_entry(name, TrieEntry::table(EntryKind::Root));
        }
        table
    }

    fn insert_entry(&mut self, name: String, entry: TrieEntry) {
        self.order.push(name.clone());
        self.data.insert(name, entry);
    }

    /// Node names still alive, in insertion order.
    fn live_order(&self) -> impl Iterator<Item = &String> {
        self.order.iter().filter(|name| self.data.contains_key(*name))
    }

    /// Installs `entry_val` under `entry_name` and links it into slot `idx`
    /// of `name`. An already occupied slot means the spec defined the same
    /// concrete opcode twice.
    fn update_table(
        &mut self,
        name: &str,
        idx: usize,
        entry_name: String,
        entry_val: TrieEntry,
    ) -> Result<(), TableError> {
        let old = &self.data[name];
        if old.items()[idx].is_some() {
            return Err(TableError::new(
                TableErrorKind::DuplicateLeaf,
                format!("{}/{} set, not overriding to {}", name, idx, entry_name),
            ));
        }
        self.insert_entry(entry_name.clone(), entry_val);
        if let Some(entry) = self.data.get_mut(name) {
            entry.items_mut()[idx] = Some(entry_name);
        }
        Ok(())
    }

    fn intern_desc(&mut self, desc: PackedDesc) -> usize {
        if let Some(&index) = self.descs_map.get(&desc) {
            return index;
        }
        let index = self.descs.len();
        self.descs_map.insert(desc.clone(), index);
        self.descs.push(desc);
        index
    }

    /// Walks one concrete opcode path from the chosen mode root, allocating
    /// intermediate tables as needed, and installs the descriptor leaf at
    /// the terminal slot.
    pub fn add_pattern(
        &mut self,
        path: &[(EntryKind, u16)],
        desc: PackedDesc,
        root_idx: usize,
    ) -> Result<(), TableError> {
        let name = format!("t{},{}", root_idx, format_path(path));

        let mut tn = format!("root{}", root_idx);
        for i in 0..path.len() - 1 {
            // The step kind declares what the child table must be; the
            // current step's byte selects the slot holding it.
            let kind = path[i + 1].0;
            let byte = path[i].1 as usize;

            let prev_tn = tn;
            tn = match self.data[&prev_tn].items()[byte].clone() {
                Some(child) => child,
                None => {
                    let child = format!("t{},{}", root_idx, format_path(&path[..i + 1]));
                    self.update_table(&prev_tn, byte, child.clone(), TrieEntry::table(kind))?;
                    child
                }
            };

            if self.data[&tn].kind() != kind {
                return Err(TableError::new(
                    TableErrorKind::KindMismatch,
                    format!("{}, have {:?}, want {:?}", name, self.data[&tn].kind(), kind),
                ));
            }
        }

        let desc_idx = self.intern_desc(desc);
        let last_byte = path[path.len() - 1].1 as usize;
        self.update_table(&tn, last_byte, name, TrieEntry::Instr(desc_idx))
    }

    #[cfg(test)]
    pub(crate) fn descs(&self) -> &[PackedDesc] {
        &self.descs
    }

    #[cfg(test)]
    pub(crate) fn entry(&self, name: &str) -> Option<&TrieEntry> {
        self.data.get(name)
    }

    #[cfg(test)]
    pub(crate) fn live_count(&self) -> usize {
        self.live_order().count()
    }

    #[cfg(test)]
    pub(crate) fn live_values(&self) -> Vec<TrieEntry> {
        self.live_order().map(|name| self.data[name].clone()).collect()
    }
}
