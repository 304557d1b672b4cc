//! Inbound transport — one task owns the socket's receive side.
//!
//! Every datagram lands here and is demultiplexed: ACKs route to the
//! transfer waiting on them, DATA feeds the assembler, remaining control
//! messages go to reconciliation. The sender tasks wait on their own ack
//! queues, so a transfer in flight never blocks inbound processing.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};

use cairn_core::wire::{self, ControlMessage, Frame};

use crate::assemble::Assembler;
use crate::reconcile::Reconciler;

/// Routes ACKs to the transfer waiting on them, keyed by
/// (destination address, file name) — at most one active transfer per key.
#[derive(Clone, Default)]
pub struct AckRouter {
    routes: Arc<DashMap<(SocketAddr, String), mpsc::UnboundedSender<u32>>>,
}

impl AckRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transfer's ack queue. Returns `None` when a transfer to
    /// the same destination for the same name is already active.
    pub fn register(
        &self,
        dest: SocketAddr,
        name: &str,
    ) -> Option<mpsc::UnboundedReceiver<u32>> {
        use dashmap::mapref::entry::Entry;
        match self.routes.entry((dest, name.to_string())) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::unbounded_channel();
                slot.insert(tx);
                Some(rx)
            }
        }
    }

    pub fn unregister(&self, dest: SocketAddr, name: &str) {
        self.routes.remove(&(dest, name.to_string()));
    }

    /// Route an ack to its waiter. Acks with no registered transfer are
    /// dropped — they are retransmission echoes of a finished exchange.
    pub fn route(&self, from: SocketAddr, name: &str, seq: u32) -> bool {
        match self.routes.get(&(from, name.to_string())) {
            Some(tx) => tx.send(seq).is_ok(),
            None => false,
        }
    }
}

pub struct Transport {
    pub socket: Arc<UdpSocket>,
    pub assembler: Assembler,
    pub reconciler: Reconciler,
    pub acks: AckRouter,
    pub shutdown: broadcast::Receiver<()>,
}

impl Transport {
    pub async fn run(mut self) {
        let mut buf = vec![0u8; wire::MAX_DATAGRAM];
        loop {
            let (len, from) = tokio::select! {
                _ = self.shutdown.recv() => return,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::debug!(error = %e, "recv failed");
                        continue;
                    }
                },
            };

            // Malformed datagrams are dropped silently: no reply, no crash.
            let Ok(frame) = wire::decode(&buf[..len]) else {
                tracing::trace!(len, peer = %from, "undecodable datagram dropped");
                continue;
            };

            match frame {
                Frame::Data(data) => {
                    if let Err(e) = self.assembler.handle_frame(&self.socket, from, data).await {
                        tracing::warn!(error = %e, "chunk assembly failed");
                    }
                }
                Frame::Control(ControlMessage::Ack { name, seq }) => {
                    self.acks.route(from, &name, seq);
                }
                Frame::Control(msg) => self.reconciler.handle(from, msg).await,
            }
        }
    }
}
