use crate::*;

use std::time::Duration;

use cairn_core::hash;
use cairn_engine::Node;

/// Removing a file on one node removes it everywhere the hash matches.
#[tokio::test]
async fn local_delete_propagates_to_peer() {
    let (port_a, port_b) = (free_port(), free_port());
    let root_a = temp_root("del-a");
    let root_b = temp_root("del-b");

    // Both nodes start already holding the same version.
    let content = b"shared content, soon gone";
    std::fs::write(root_a.join("victim.txt"), content).unwrap();
    std::fs::write(root_b.join("victim.txt"), content).unwrap();

    let node_a = Node::start(&fast_config(root_a.clone(), port_a, &[port_b]))
        .await
        .unwrap();
    let node_b = Node::start(&fast_config(root_b.clone(), port_b, &[port_a]))
        .await
        .unwrap();
    assert!(node_b.index().get("victim.txt").is_some());

    std::fs::remove_file(root_a.join("victim.txt")).unwrap();

    let removed = wait_until(Duration::from_secs(10), || {
        !root_b.join("victim.txt").exists() && node_b.index().get("victim.txt").is_none()
    })
    .await;
    assert!(removed, "delete intent never took effect on B");
    assert!(node_a.index().get("victim.txt").is_none());

    node_a.stop().await;
    node_b.stop().await;
    let _ = std::fs::remove_dir_all(&root_a);
    let _ = std::fs::remove_dir_all(&root_b);
}

/// A delete intent for an older version must not destroy content that was
/// independently updated: B's newer bytes survive A's stale intent.
#[tokio::test]
async fn stale_delete_does_not_remove_updated_content() {
    let (port_a, port_b) = (free_port(), free_port());
    let root_b = temp_root("stale-b");

    let newer = b"b updated this file after a issued its delete";
    std::fs::write(root_b.join("contested.txt"), newer).unwrap();

    let node_b = Node::start(&fast_config(root_b.clone(), port_b, &[port_a]))
        .await
        .unwrap();

    // Fake A: send a delete intent naming an older version's hash.
    let socket = tokio::net::UdpSocket::bind(format!("127.0.0.1:{port_a}"))
        .await
        .unwrap();
    let stale_hash = hash::digest(b"the old version");
    let intent = cairn_core::wire::encode_delete("contested.txt", &stale_hash);
    socket
        .send_to(&intent, format!("127.0.0.1:{port_b}"))
        .await
        .unwrap();

    // Give the node ample time to (not) act.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(root_b.join("contested.txt").exists());
    assert_eq!(
        node_b.index().get("contested.txt").unwrap().hash,
        hash::digest(newer)
    );

    node_b.stop().await;
    let _ = std::fs::remove_dir_all(&root_b);
}
