use crate::*;

use std::time::Duration;

use cairn_core::hash;
use cairn_engine::Node;

/// The end-to-end scenario: a file appears on A, B learns of it from A's
/// inventory, pulls it in 3 chunks, verifies, and commits an identical
/// record.
#[tokio::test]
async fn new_file_propagates_to_peer() {
    let (port_a, port_b) = (free_port(), free_port());
    let root_a = temp_root("prop-a");
    let root_b = temp_root("prop-b");

    let node_a = Node::start(&fast_config(root_a.clone(), port_a, &[port_b]))
        .await
        .unwrap();
    let node_b = Node::start(&fast_config(root_b.clone(), port_b, &[port_a]))
        .await
        .unwrap();

    // 17 bytes — three chunks at the test chunk size of 6.
    let content = b"report body 17 b!";
    assert_eq!(content.len(), 17);
    std::fs::write(root_a.join("report.txt"), content).unwrap();

    let arrived = wait_until(Duration::from_secs(10), || {
        std::fs::read(root_b.join("report.txt"))
            .map(|bytes| bytes == content)
            .unwrap_or(false)
    })
    .await;
    assert!(arrived, "report.txt never arrived intact on B");

    // Records agree on both sides: name, size, hash.
    let digest = hash::digest(content);
    let indexed = wait_until(Duration::from_secs(2), || {
        node_b
            .index()
            .get("report.txt")
            .map(|r| r.size == 17 && r.hash == digest)
            .unwrap_or(false)
    })
    .await;
    assert!(indexed, "B's index record does not match A's");
    let record_a = node_a.index().get("report.txt").unwrap().value().clone();
    assert_eq!(record_a.size, 17);
    assert_eq!(record_a.hash, digest);

    node_a.stop().await;
    node_b.stop().await;
    let _ = std::fs::remove_dir_all(&root_a);
    let _ = std::fs::remove_dir_all(&root_b);
}

/// Two nodes with disjoint file sets end up holding the union.
#[tokio::test]
async fn disjoint_sets_converge_to_union() {
    let (port_a, port_b) = (free_port(), free_port());
    let root_a = temp_root("union-a");
    let root_b = temp_root("union-b");

    let alpha = b"alpha lives on node a";
    let beta = b"beta lives on node b, and is a bit longer";
    std::fs::write(root_a.join("alpha.txt"), alpha).unwrap();
    std::fs::write(root_b.join("beta.txt"), beta).unwrap();

    let node_a = Node::start(&fast_config(root_a.clone(), port_a, &[port_b]))
        .await
        .unwrap();
    let node_b = Node::start(&fast_config(root_b.clone(), port_b, &[port_a]))
        .await
        .unwrap();

    let converged = wait_until(Duration::from_secs(10), || {
        let a_has_beta = std::fs::read(root_a.join("beta.txt"))
            .map(|b| b == beta)
            .unwrap_or(false);
        let b_has_alpha = std::fs::read(root_b.join("alpha.txt"))
            .map(|b| b == alpha)
            .unwrap_or(false);
        a_has_beta && b_has_alpha
    })
    .await;
    assert!(converged, "nodes never converged on the union");

    assert_eq!(node_a.index().len(), 2);
    assert_eq!(node_b.index().len(), 2);
    assert_eq!(
        node_a.index().get("beta.txt").unwrap().hash,
        hash::digest(beta)
    );
    assert_eq!(
        node_b.index().get("alpha.txt").unwrap().hash,
        hash::digest(alpha)
    );

    node_a.stop().await;
    node_b.stop().await;
    let _ = std::fs::remove_dir_all(&root_a);
    let _ = std::fs::remove_dir_all(&root_b);
}

/// A file large enough for many chunks survives the trip bit-for-bit.
#[tokio::test]
async fn multi_chunk_payload_arrives_intact() {
    let (port_a, port_b) = (free_port(), free_port());
    let root_a = temp_root("big-a");
    let root_b = temp_root("big-b");

    // 1000 bytes of non-repeating content at chunk size 6 — 167 chunks.
    let content: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
    std::fs::write(root_a.join("payload.bin"), &content).unwrap();

    let node_a = Node::start(&fast_config(root_a.clone(), port_a, &[port_b]))
        .await
        .unwrap();
    let node_b = Node::start(&fast_config(root_b.clone(), port_b, &[port_a]))
        .await
        .unwrap();

    let arrived = wait_until(Duration::from_secs(30), || {
        std::fs::read(root_b.join("payload.bin"))
            .map(|bytes| bytes == content)
            .unwrap_or(false)
    })
    .await;
    assert!(arrived, "payload.bin never arrived intact");

    node_a.stop().await;
    node_b.stop().await;
    let _ = std::fs::remove_dir_all(&root_a);
    let _ = std::fs::remove_dir_all(&root_b);
}
