//! Cairn integration test harness.
//!
//! Tests run pairs of real nodes in-process over loopback UDP with
//! shortened protocol intervals. Each test owns its own temp roots and
//! ports; tests must not share directories.

use std::path::PathBuf;
use std::time::Duration;

use cairn_core::config::CairnConfig;

mod convergence;
mod deletion;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Reserve a loopback port by binding and immediately releasing it.
/// A small race window exists but is acceptable for tests.
pub fn free_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind for port probe");
    socket.local_addr().unwrap().port()
}

/// A fresh, empty sync root under the system temp dir.
pub fn temp_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cairn-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Node config with aggressive timing so tests finish in seconds.
/// chunk_size 6 forces the 17-byte scenario file into 3 chunks.
pub fn fast_config(root: PathBuf, port: u16, peer_ports: &[u16]) -> CairnConfig {
    let mut config = CairnConfig::default();
    config.node.listen = format!("127.0.0.1:{port}");
    config.node.peers = peer_ports
        .iter()
        .map(|p| format!("127.0.0.1:{p}"))
        .collect();
    config.node.root = root;
    config.sync.chunk_size = 6;
    config.sync.ack_timeout_ms = 200;
    config.sync.max_retries = 3;
    config.sync.scan_interval_ms = 100;
    config.sync.announce_interval_ms = 200;
    config
}

/// Poll `check` every 25 ms until it passes or the timeout elapses.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
