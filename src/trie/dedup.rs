use std::collections::{BTreeSet, HashMap, HashSet};

use super::{Table, TrieEntry};

impl Table {
    /// Collapses structurally identical sub-tries onto one representative.
    ///
    /// Bottom-up fixed point: a pass maps every queued node value to its
    /// first-seen name, deletes later duplicates, then rewrites the child
    /// links of their parents. Rewritten parents form the next queue, since
    /// the rewrite may have made them equal to an existing node. Terminates
    /// when a pass renames nothing.
    ///
    /// Roots are entry points and are never renamed away.
    pub fn deduplicate(&mut self) {
        let mut parents: HashMap<String, HashSet<String>> = HashMap::new();
        for name in self.live_order() {
            for child in self.data[name].items().iter().flatten() {
                parents.entry(child.clone()).or_default().insert(name.clone());
            }
        }

        let roots: HashSet<String> = self.roots.iter().cloned().collect();

        let mut queue: Vec<String> = self.live_order().cloned().collect();
        let mut canonical: HashMap<TrieEntry, String> = HashMap::new();
        while !queue.is_empty() {
            let mut synonyms: HashMap<String, String> = HashMap::new();
            for name in &queue {
                let entry = match self.data.get(name) {
                    Some(entry) => entry.clone(),
                    None => continue,
                };
                if let Some(unique) = canonical.get(&entry).cloned() {
                    if unique != *name && !roots.contains(name) {
                        synonyms.insert(name.clone(), unique);
                        self.data.remove(name);
                    }
                } else {
                    canonical.insert(entry, name.clone());
                }
            }

            // Parents of renamed nodes must be rewritten and re-examined.
            let affected: BTreeSet<String> = synonyms
                .keys()
                .filter_map(|name| parents.get(name))
                .flatten()
                .cloned()
                .collect();

            queue = Vec::new();
            for name in affected {
                let entry = match self.data.get_mut(&name) {
                    Some(entry) => entry,
                    None => continue,
                };
                for item in entry.items_mut() {
                    if let Some(child) = item {
                        if let Some(unique) = synonyms.get(child) {
                            *item = Some(unique.clone());
                        }
                    }
                }
                for child in self.data[&name].items().iter().flatten() {
                    parents.entry(child.clone()).or_default().insert(name.clone());
                }
                queue.push(name);
            }
        }
    }
}
