//! Announcer — periodic full-inventory broadcast.
//!
//! Ordinary change broadcasts carry no delivery guarantee, so this is the
//! convergence backstop: once changes stop, enough announce rounds bring
//! every reachable peer to the same index.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use cairn_core::wire;

use crate::index::{self, NodeIndex};

/// Send the complete current inventory to every peer.
pub async fn broadcast_inventory(socket: &UdpSocket, peers: &[SocketAddr], index: &NodeIndex) {
    let msg = wire::encode_inventory(&index::snapshot(index));
    for peer in peers {
        if let Err(e) = socket.send_to(&msg, peer).await {
            tracing::debug!(peer = %peer, error = %e, "inventory send failed");
        }
    }
}

pub struct Announcer {
    pub socket: Arc<UdpSocket>,
    pub peers: Arc<Vec<SocketAddr>>,
    pub index: NodeIndex,
    pub interval: Duration,
    pub shutdown: broadcast::Receiver<()>,
}

impl Announcer {
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => return,
                _ = ticker.tick() => {}
            }
            broadcast_inventory(&self.socket, &self.peers, &self.index).await;
        }
    }
}
