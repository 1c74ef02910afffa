use std::collections::BTreeMap;

use crate::encoding::PackedDesc;
use crate::utils::logger::Logger;

use super::error::{TableError, TableErrorKind};
use super::{EntryKind, Table, TrieEntry};

/// Serialized decode trie: the flat 16-bit word array, node annotations
/// keyed by word offset, the word offset of each mode root, and the
/// interned descriptor list backing the leaf links.
#[derive(Debug, Clone)]
pub struct CompiledTable {
    pub data: Vec<u16>,
    pub annotations: BTreeMap<usize, String>,
    pub root_offsets: Vec<usize>,
    pub descs: Vec<PackedDesc>,
}

impl Table {
    /// Assigns a word offset to every live node, in declaration order.
    ///
    /// Table nodes are padded to 4-word alignment so links keep their low
    /// bits free for the kind tag. Instruction leaves are not placed; their
    /// synthesized offset is `descidx << 2`, which the runtime shifts back
    /// down after stripping the tag.
    fn calc_offsets(&mut self) -> Result<(), TableError> {
        let mut current = 0usize;
        let names: Vec<String> = self.live_order().cloned().collect();
        for name in names {
            match &self.data[&name] {
                TrieEntry::Instr(descidx) => {
                    self.offsets.insert(name, descidx << 2);
                }
                entry => {
                    self.annotations
                        .insert(current, format!("{}({})", name, entry.kind().tag()));
                    let length = entry.items().len();
                    self.offsets.insert(name, current);
                    current += (length + 3) & !3;
                }
            }
        }
        // Links hold a 15-bit word offset; beyond that the table format
        // cannot address the node.
        let max_offset = self.offsets.values().max().copied().unwrap_or(0);
        if current >= 0x8000 || max_offset >= 0x8000 {
            return Err(TableError::new(
                TableErrorKind::SizeExceeded,
                format!("maximum table size exceeded: {:x}", current.max(max_offset)),
            ));
        }
        Ok(())
    }

    fn encode_item(&self, name: &str) -> u16 {
        let offset = self.offsets[name] as u16;
        (offset << 1) | self.data[name].kind().tag() as u16
    }

    /// Lays the trie out and serializes it into the flat word array.
    pub fn compile(&mut self) -> Result<CompiledTable, TableError> {
        self.calc_offsets()?;

        let mut ordered: Vec<(usize, &TrieEntry)> = self
            .live_order()
            .filter(|name| !self.data[*name].items().is_empty())
            .map(|name| (self.offsets[name], &self.data[name]))
            .collect();
        ordered.sort_by_key(|(offset, _)| *offset);

        let data_len = match ordered.last() {
            Some((offset, entry)) => offset + entry.items().len(),
            None => 0,
        };
        let mut data = vec![0u16; data_len];
        for (offset, entry) in &ordered {
            for (i, item) in entry.items().iter().enumerate() {
                if let Some(child) = item {
                    data[offset + i] = self.encode_item(child);
                }
            }
        }

        let mut stats: BTreeMap<&'static str, usize> = BTreeMap::new();
        for name in self.live_order() {
            let kind = match self.data[name].kind() {
                EntryKind::Instr => "INSTR",
                EntryKind::Table256 => "TABLE256",
                EntryKind::Table16 => "TABLE16",
                EntryKind::Table8E => "TABLE8E",
                EntryKind::Prefix => "TABLE_PREFIX",
                EntryKind::Vex => "TABLE_VEX",
                EntryKind::Root => "TABLE_ROOT",
            };
            *stats.entry(kind).or_default() += 1;
        }
        Logger::info(format!("{} bytes {:?}", 2 * data.len(), stats));

        Ok(CompiledTable {
            data,
            annotations: self.annotations.clone(),
            root_offsets: self.roots.iter().map(|root| self.offsets[root]).collect(),
            descs: self.descs.clone(),
        })
    }
}
