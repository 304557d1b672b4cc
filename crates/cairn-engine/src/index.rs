//! Content index — this node's belief of file name → (size, hash).

use std::sync::Arc;

use dashmap::DashMap;

use cairn_core::wire::InventoryEntry;

/// One fully-verified file. Always replaced as a unit, never partially
/// updated: an index entry must never describe a half-received file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub size: u64,
    /// Whole-file content hash, lowercase hex.
    pub hash: String,
}

/// The shared index — touched by the transport loop (verified receives,
/// remote deletes), the scanner (local changes), and the announcer
/// (snapshots). DashMap keeps each read-modify-write behind its own guard.
pub type NodeIndex = Arc<DashMap<String, FileRecord>>;

/// Create a new empty index.
pub fn new_index() -> NodeIndex {
    Arc::new(DashMap::new())
}

/// Sorted inventory view for INVENTORY broadcasts.
pub fn snapshot(index: &NodeIndex) -> Vec<InventoryEntry> {
    let mut entries: Vec<InventoryEntry> = index
        .iter()
        .map(|e| InventoryEntry {
            name: e.key().clone(),
            size: e.value().size,
            hash: e.value().hash.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
