//! Node composition — binds the socket, seeds the index, runs the tasks.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use cairn_core::config::CairnConfig;

use crate::announce::Announcer;
use crate::assemble::Assembler;
use crate::index::{new_index, NodeIndex};
use crate::reconcile::Reconciler;
use crate::scan::{scan, Scanner};
use crate::send::SendTuning;
use crate::transport::{AckRouter, Transport};

/// A running sync node: one transport loop, one scanner, one announcer,
/// plus a short-lived task per outbound transfer.
pub struct Node {
    local_addr: SocketAddr,
    index: NodeIndex,
    root: PathBuf,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Bind the socket and start all tasks. A bind failure is fatal —
    /// the node does not start.
    pub async fn start(config: &CairnConfig) -> Result<Node> {
        let listen: SocketAddr = config
            .node
            .listen
            .parse()
            .with_context(|| format!("invalid listen address '{}'", config.node.listen))?;
        let socket = Arc::new(
            UdpSocket::bind(listen)
                .await
                .with_context(|| format!("failed to bind {listen}"))?,
        );
        let local_addr = socket.local_addr()?;

        let root = config.node.root.clone();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create sync root {}", root.display()))?;

        // Static peer set, fixed for the process lifetime. Our own address
        // is excluded so a shared config file works unchanged on every node.
        let mut peers = Vec::new();
        for peer in &config.node.peers {
            let addr: SocketAddr = peer
                .parse()
                .with_context(|| format!("invalid peer address '{peer}'"))?;
            if addr != local_addr {
                peers.push(addr);
            }
        }
        let peers = Arc::new(peers);

        let index = new_index();
        for (name, record) in scan(&root) {
            index.insert(name, record);
        }
        tracing::info!(
            addr = %local_addr,
            peers = peers.len(),
            files = index.len(),
            root = %root.display(),
            "node started"
        );

        let tuning = SendTuning::from_settings(&config.sync);
        let acks = AckRouter::new();
        let (shutdown_tx, _) = broadcast::channel(1);

        let transport = Transport {
            socket: socket.clone(),
            assembler: Assembler::new(root.clone(), index.clone()),
            reconciler: Reconciler::new(
                socket.clone(),
                index.clone(),
                root.clone(),
                acks.clone(),
                tuning,
            ),
            acks,
            shutdown: shutdown_tx.subscribe(),
        };
        let scanner = Scanner {
            socket: socket.clone(),
            peers: peers.clone(),
            index: index.clone(),
            root: root.clone(),
            interval: Duration::from_millis(config.sync.scan_interval_ms),
            shutdown: shutdown_tx.subscribe(),
        };
        let announcer = Announcer {
            socket,
            peers,
            index: index.clone(),
            interval: Duration::from_millis(config.sync.announce_interval_ms),
            shutdown: shutdown_tx.subscribe(),
        };

        let tasks = vec![
            tokio::spawn(transport.run()),
            tokio::spawn(scanner.run()),
            tokio::spawn(announcer.run()),
        ];

        Ok(Node {
            local_addr,
            index,
            root,
            shutdown: shutdown_tx,
            tasks,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cooperative shutdown. Tasks observe the signal at their next loop
    /// iteration; a chunk retry in flight bounds the latency by
    /// ack_timeout × (max_retries + 1).
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
