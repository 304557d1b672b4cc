//! Reliable sender — stop-and-wait chunk transfer over UDP.
//!
//! At most one unacknowledged chunk is in flight, so total transfer
//! latency is bounded below by chunk count × round-trip time. The wait
//! happens on a per-transfer ack queue fed by the transport demultiplexer,
//! never on the raw socket, so an in-progress send does not block other
//! inbound traffic.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use cairn_core::config::SyncSettings;
use cairn_core::wire::DataFrame;

/// Transfer knobs, fixed process-wide and never negotiated on the wire.
#[derive(Debug, Clone, Copy)]
pub struct SendTuning {
    pub chunk_size: usize,
    pub ack_timeout: Duration,
    pub max_retries: u32,
}

impl SendTuning {
    pub fn from_settings(s: &SyncSettings) -> Self {
        Self {
            chunk_size: s.chunk_size,
            ack_timeout: Duration::from_millis(s.ack_timeout_ms),
            max_retries: s.max_retries,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("no ack for chunk {seq}/{total} of '{name}' after {attempts} attempts")]
    RetriesExhausted {
        name: String,
        seq: u32,
        total: u32,
        attempts: u32,
    },
    #[error("ack queue closed mid-transfer")]
    AckQueueClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Send `content` to `dest` as an ordered sequence of acknowledged chunks.
///
/// Per chunk: transmit a DATA frame, then wait on `acks` for the matching
/// sequence number up to the timeout. A timeout or a non-matching entry
/// (a stale ack from an earlier chunk) counts as a failed attempt and the
/// chunk is retransmitted. More than `max_retries` failures abandons the
/// whole file — nothing partial was committed remotely, and the requester
/// gets no error reply; its next reconciliation cycle retries. No chunk
/// is ever transmitted more than `max_retries + 1` times.
pub async fn send_file(
    socket: &UdpSocket,
    dest: SocketAddr,
    name: &str,
    hash: &str,
    content: &[u8],
    acks: &mut mpsc::UnboundedReceiver<u32>,
    tuning: SendTuning,
) -> Result<(), SendError> {
    let total = content.len().div_ceil(tuning.chunk_size) as u32;

    for (seq, chunk) in content.chunks(tuning.chunk_size).enumerate() {
        let seq = seq as u32;
        let frame = DataFrame {
            name: name.to_string(),
            hash: hash.to_string(),
            seq,
            total,
            payload: Bytes::copy_from_slice(chunk),
        }
        .encode();

        let mut failures = 0u32;
        loop {
            socket.send_to(&frame, dest).await?;
            match tokio::time::timeout(tuning.ack_timeout, acks.recv()).await {
                Ok(Some(acked)) if acked == seq => break,
                Ok(Some(stale)) => {
                    tracing::trace!(name, seq, stale, "non-matching ack");
                    failures += 1;
                }
                Ok(None) => return Err(SendError::AckQueueClosed),
                Err(_elapsed) => failures += 1,
            }
            if failures > tuning.max_retries {
                return Err(SendError::RetriesExhausted {
                    name: name.to_string(),
                    seq,
                    total,
                    attempts: failures,
                });
            }
        }
    }

    tracing::debug!(name, bytes = content.len(), total, peer = %dest, "all chunks acknowledged");
    Ok(())
}
