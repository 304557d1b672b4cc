//! Directory scanner — polls the sync root and propagates local changes.
//!
//! Polling rather than OS notification: responsiveness is bounded by the
//! scan interval, in exchange for one code path on every platform.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use cairn_core::{hash, wire};

use crate::announce::broadcast_inventory;
use crate::index::{FileRecord, NodeIndex};

/// One pass over the sync root: top-level regular files only, each with
/// size and content hash. A file that cannot be read or stat'ed during
/// the pass is omitted from the result — never an error, and never
/// grounds for dropping an existing index entry.
pub fn scan(root: &Path) -> HashMap<String, FileRecord> {
    let mut found = HashMap::new();
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "sync root unreadable this pass");
            return found;
        }
    };
    for entry in entries.flatten() {
        match entry.file_type() {
            Ok(t) if t.is_file() => {}
            _ => continue,
        }
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if !wire::valid_name(&name) {
            tracing::debug!(name, "file name not representable on the wire, skipping");
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let Ok(digest) = hash::digest_file(&entry.path()) else { continue };
        found.insert(
            name,
            FileRecord {
                size: meta.len(),
                hash: digest,
            },
        );
    }
    found
}

/// Periodic scanner task. Diffs each pass's name set against the previous
/// one: new names enter the index and trigger an immediate inventory
/// broadcast; vanished names trigger a delete intent to every peer and
/// leave the index.
pub struct Scanner {
    pub socket: Arc<UdpSocket>,
    pub peers: Arc<Vec<SocketAddr>>,
    pub index: NodeIndex,
    pub root: PathBuf,
    pub interval: Duration,
    pub shutdown: broadcast::Receiver<()>,
}

impl Scanner {
    pub async fn run(mut self) {
        let mut prev: HashSet<String> = self.index.iter().map(|e| e.key().clone()).collect();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => return,
                _ = ticker.tick() => {}
            }

            let current = scan(&self.root);

            for (name, record) in &current {
                if !prev.contains(name) {
                    tracing::info!(name, size = record.size, "local file added");
                    self.index.insert(name.clone(), record.clone());
                    broadcast_inventory(&self.socket, &self.peers, &self.index).await;
                }
            }

            let removed: Vec<String> = prev
                .iter()
                .filter(|name| !current.contains_key(*name))
                .cloned()
                .collect();
            for name in removed {
                let last_hash = self
                    .index
                    .get(&name)
                    .map(|r| r.hash.clone())
                    .unwrap_or_default();
                let msg = wire::encode_delete(&name, &last_hash);
                for peer in self.peers.iter() {
                    if let Err(e) = self.socket.send_to(&msg, peer).await {
                        tracing::debug!(peer = %peer, error = %e, "delete intent send failed");
                    }
                }
                self.index.remove(&name);
                tracing::info!(name, "local file removed, delete intent propagated");
            }

            // Re-derive from the index so files committed by the assembler
            // since the last pass do not re-trigger an add next time.
            prev = self.index.iter().map(|e| e.key().clone()).collect();
        }
    }
}
