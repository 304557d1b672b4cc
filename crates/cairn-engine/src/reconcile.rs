//! Reconciliation — interprets INVENTORY / PULL / DELETE and closes the
//! gap between this node's index and a peer's.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use cairn_core::wire::{self, ControlMessage, InventoryEntry};

use crate::index::NodeIndex;
use crate::send::{send_file, SendTuning};
use crate::transport::AckRouter;

/// Control-plane handler. Cheap to clone; one clone rides along with each
/// spawned transfer task.
#[derive(Clone)]
pub struct Reconciler {
    socket: Arc<UdpSocket>,
    index: NodeIndex,
    root: PathBuf,
    acks: AckRouter,
    tuning: SendTuning,
}

impl Reconciler {
    pub fn new(
        socket: Arc<UdpSocket>,
        index: NodeIndex,
        root: PathBuf,
        acks: AckRouter,
        tuning: SendTuning,
    ) -> Self {
        Self {
            socket,
            index,
            root,
            acks,
            tuning,
        }
    }

    pub async fn handle(&self, from: SocketAddr, msg: ControlMessage) {
        match msg {
            ControlMessage::Inventory(entries) => self.handle_inventory(from, entries).await,
            ControlMessage::Pull { name, hash, size } => self.handle_pull(from, name, hash, size),
            ControlMessage::Delete { name, hash } => self.handle_delete(name, hash),
            // Acks are demultiplexed by the transport; one landing here has
            // no registered waiter and is noise.
            ControlMessage::Ack { .. } => {}
        }
    }

    /// Pull-on-any-mismatch: absent locally, or size or hash differs —
    /// request the advertised version from the sender. No causal ordering
    /// is tracked, so two peers holding genuinely different content under
    /// one name will pull from each other every round without converging.
    async fn handle_inventory(&self, from: SocketAddr, entries: Vec<InventoryEntry>) {
        for entry in entries {
            let mismatch = match self.index.get(&entry.name) {
                Some(have) => have.size != entry.size || have.hash != entry.hash,
                None => true,
            };
            if !mismatch {
                continue;
            }
            tracing::debug!(name = %entry.name, peer = %from, "index mismatch, pulling");
            let msg = wire::encode_pull(&entry.name, &entry.hash, entry.size);
            if let Err(e) = self.socket.send_to(&msg, from).await {
                tracing::debug!(peer = %from, error = %e, "pull send failed");
            }
        }
    }

    /// Serve a pull only when the local record matches the requested hash.
    /// Anything else is ignored silently; the requester's next inventory
    /// cycle retries. The transfer runs as its own task so the transport
    /// loop keeps receiving while chunks await acknowledgment.
    fn handle_pull(&self, from: SocketAddr, name: String, hash: String, _size: u64) {
        match self.index.get(&name) {
            Some(have) if have.hash == hash => {}
            _ => {
                tracing::debug!(name, peer = %from, "pull for version we do not hold, ignoring");
                return;
            }
        }

        let Some(mut acks) = self.acks.register(from, &name) else {
            tracing::debug!(name, peer = %from, "transfer already active, dropping pull");
            return;
        };

        let this = self.clone();
        tokio::spawn(async move {
            let result = this.serve(from, &name, &hash, &mut acks).await;
            this.acks.unregister(from, &name);
            if let Err(e) = result {
                tracing::warn!(name, peer = %from, error = %e, "transfer abandoned");
            }
        });
    }

    async fn serve(
        &self,
        dest: SocketAddr,
        name: &str,
        hash: &str,
        acks: &mut tokio::sync::mpsc::UnboundedReceiver<u32>,
    ) -> Result<()> {
        let path = self.root.join(name);
        let content =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        send_file(&self.socket, dest, name, hash, &content, acks, self.tuning).await?;
        tracing::info!(name, peer = %dest, bytes = content.len(), "file served");
        Ok(())
    }

    /// A delete intent removes only the content it actually describes.
    /// A hash mismatch means this name was independently updated after the
    /// delete was issued; the stale intent is ignored and the content kept.
    fn handle_delete(&self, name: String, hash: String) {
        match self.index.get(&name) {
            Some(have) if have.hash == hash => {}
            _ => {
                tracing::debug!(name, "stale or unknown delete intent, ignoring");
                return;
            }
        }

        let path = self.root.join(&name);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(name, error = %e, "delete failed, keeping record");
                return;
            }
        }
        self.index.remove(&name);
        tracing::info!(name, "removed by peer delete intent");
    }
}
