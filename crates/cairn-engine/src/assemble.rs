//! Receiver assembler — accumulates DATA chunks, verifies, commits.
//!
//! Commit is all-or-nothing at the verified-hash boundary: a file and its
//! index entry appear only after every chunk is present and the whole
//! reconstruction matches the advertised hash. A mismatch discards the
//! buffer and writes nothing; recovery is the next reconciliation round.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use cairn_core::{hash, wire, wire::DataFrame};

use crate::index::{FileRecord, NodeIndex};

/// Transient receive state for one file name. Sequence indices form a
/// dense range [0, total); at most one buffer per name.
struct Assembly {
    chunks: HashMap<u32, Bytes>,
    total: u32,
    expected_hash: String,
}

/// Tracks files being reassembled from incoming chunks.
pub struct Assembler {
    active: Mutex<HashMap<String, Assembly>>,
    root: PathBuf,
    index: NodeIndex,
}

impl Assembler {
    pub fn new(root: PathBuf, index: NodeIndex) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            root,
            index,
        }
    }

    /// Handle one DATA frame. Always acknowledges (name, seq) back to the
    /// sender, duplicates included — the ack is at-least-once and
    /// idempotent. Returns the committed path when this frame completed
    /// and verified a file.
    pub async fn handle_frame(
        &self,
        socket: &UdpSocket,
        from: SocketAddr,
        frame: DataFrame,
    ) -> Result<Option<PathBuf>> {
        let ack = wire::encode_ack(&frame.name, frame.seq);
        if let Err(e) = socket.send_to(&ack, from).await {
            tracing::debug!(peer = %from, error = %e, "ack send failed");
        }

        // A frame outside the dense [0, total) range cannot belong to a
        // well-formed transfer; the ack above still went out.
        if frame.total == 0 || frame.seq >= frame.total {
            return Ok(None);
        }

        let mut active = self.active.lock().await;
        let assembly = active.entry(frame.name.clone()).or_insert_with(|| Assembly {
            chunks: HashMap::new(),
            total: frame.total,
            expected_hash: frame.hash.clone(),
        });
        // The sender never changes these mid-transfer; refresh regardless.
        assembly.total = frame.total;
        assembly.expected_hash = frame.hash.clone();
        // Retransmitted duplicates are dropped, first payload wins.
        assembly.chunks.entry(frame.seq).or_insert(frame.payload);

        if assembly.chunks.len() as u32 != assembly.total {
            return Ok(None);
        }

        // Complete: every seq in [0, total) is present exactly once.
        let assembly = active
            .remove(&frame.name)
            .context("assembly vanished mid-completion")?;
        drop(active);

        let mut content = Vec::new();
        for seq in 0..assembly.total {
            content.extend_from_slice(&assembly.chunks[&seq]);
        }

        let computed = hash::digest(&content);
        if computed != assembly.expected_hash {
            tracing::warn!(
                name = %frame.name,
                expected = %assembly.expected_hash,
                got = %computed,
                "content hash mismatch, buffer discarded"
            );
            return Ok(None);
        }

        let path = self.root.join(&frame.name);
        std::fs::write(&path, &content)
            .with_context(|| format!("failed to commit {}", path.display()))?;
        self.index.insert(
            frame.name.clone(),
            FileRecord {
                size: content.len() as u64,
                hash: computed,
            },
        );
        tracing::info!(
            name = %frame.name,
            bytes = content.len(),
            chunks = assembly.total,
            "file received and verified"
        );
        Ok(Some(path))
    }

    /// Names with an in-flight receive buffer.
    pub async fn in_progress(&self) -> Vec<String> {
        self.active.lock().await.keys().cloned().collect()
    }
}
