//! The location index (§3.3): `file_path -> scope_id -> offset -> node`,
//! plus `file_path -> node[]` for iteration. Process-wide, protected by a
//! single `RwLock` per §5 ("the location index ... protected by mutex").

use std::collections::BTreeMap;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ir::{FileId, NodeId};

#[derive(Default)]
struct FileEntry {
    /// scope_id -> (offset -> node)
    by_scope: FxHashMap<String, BTreeMap<u32, NodeId>>,
    /// insertion order, used for `nodes_for_file`.
    all: Vec<NodeId>,
}

/// The process-wide location index.
#[derive(Default)]
pub struct LocationIndex {
    files: RwLock<FxHashMap<FileId, FileEntry>>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything recorded for `file` (called once per
    /// re-lowering; per-file IR is otherwise immutable between
    /// re-lowerings, §5).
    pub fn clear_file(&self, file: &FileId) {
        self.files.write().remove(file);
    }

    /// Records that `node` lives at `offset` within `scope_id` in `file`.
    pub fn register(&self, file: &FileId, scope_id: &str, offset: u32, node: NodeId) {
        let mut files = self.files.write();
        let entry = files.entry(file.clone()).or_default();
        entry
            .by_scope
            .entry(scope_id.to_string())
            .or_default()
            .insert(offset, node);
        entry.all.push(node);
    }

    /// All nodes registered for `file`, in registration order.
    pub fn nodes_for_file(&self, file: &FileId) -> Vec<NodeId> {
        self.files
            .read()
            .get(file)
            .map(|e| e.all.clone())
            .unwrap_or_default()
    }

    /// Locates the IR node at `offset` in `file`: the node whose offset is
    /// the closest one at or before `offset`, preferring the most specific
    /// (innermost) scope. Returns `None` if `file` has no nodes at or
    /// before `offset`.
    pub fn node_at(&self, file: &FileId, offset: u32) -> Option<NodeId> {
        let files = self.files.read();
        let entry = files.get(file)?;
        let mut best: Option<(u32, NodeId)> = None;
        for scope in entry.by_scope.values() {
            if let Some((&found_offset, &node)) = scope.range(..=offset).next_back() {
                match best {
                    Some((best_offset, _)) if best_offset >= found_offset => {}
                    _ => best = Some((found_offset, node)),
                }
            }
        }
        best.map(|(_, node)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_looks_up_nodes() {
        let index = LocationIndex::new();
        let file: FileId = "a.rb".into();
        index.register(&file, "Outer#method", 10, NodeId(0));
        index.register(&file, "Outer#method", 20, NodeId(1));

        assert_eq!(index.node_at(&file, 20), Some(NodeId(1)));
        assert_eq!(index.node_at(&file, 15), Some(NodeId(0)));
        assert_eq!(index.node_at(&file, 5), None);
        assert_eq!(index.nodes_for_file(&file).len(), 2);
    }

    #[test]
    fn clearing_a_file_drops_its_nodes() {
        let index = LocationIndex::new();
        let file: FileId = "a.rb".into();
        index.register(&file, "Outer", 0, NodeId(0));
        index.clear_file(&file);
        assert!(index.nodes_for_file(&file).is_empty());
    }
}
