//! Cairn wire format — on-wire messages for all peer communication.
//!
//! Every message occupies exactly one UDP datagram. Control messages are
//! UTF-8 text with `|`-separated fields. DATA is the one frame carrying a
//! binary payload: a newline-terminated text header followed by the raw
//! chunk bytes, delimited by the datagram boundary rather than a length
//! prefix.
//!
//! ```text
//! INVENTORY|<n>|<name>:<size>:<hex_hash>;...
//! PULL|<name>|<hex_hash>|<size>
//! DELETE|<name>|<hex_hash>
//! ACK|<name>|<seq>
//! DATA|<name>|<hex_hash>|<seq>|<total>\n<raw bytes>
//! ```

use bytes::Bytes;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Payload bytes per DATA frame. The receiver trusts the chunk count the
/// sender derives from size / chunk size, so both sides must be configured
/// with the same value — it is never negotiated on the wire.
pub const CHUNK_SIZE: usize = 8192;

/// How long the sender waits for an ACK before retransmitting a chunk.
pub const ACK_TIMEOUT_MS: u64 = 800;

/// Failed attempts tolerated per chunk before the whole transfer is abandoned.
pub const MAX_RETRIES: u32 = 6;

/// Directory poll interval.
pub const SCAN_INTERVAL_MS: u64 = 2_000;

/// Full-inventory broadcast interval — the convergence backstop.
pub const ANNOUNCE_INTERVAL_MS: u64 = 5_000;

/// Largest datagram ever sent or accepted.
pub const MAX_DATAGRAM: usize = 65_535;

// ── Messages ──────────────────────────────────────────────────────────────────

/// One advertised file in an INVENTORY message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub name: String,
    pub size: u64,
    /// 256-bit content hash, lowercase hex.
    pub hash: String,
}

/// Control-plane messages — everything except DATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// A peer's complete inventory. Receivers pull anything missing or mismatched.
    Inventory(Vec<InventoryEntry>),
    /// Request for one file at a specific version.
    Pull { name: String, hash: String, size: u64 },
    /// Delete intent. Only removes content whose hash matches.
    Delete { name: String, hash: String },
    /// Acknowledges receipt of chunk `seq` of `name`.
    Ack { name: String, seq: u32 },
}

/// One chunk of file content plus the header that routes and verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub name: String,
    /// Expected hash of the *whole* file, not this chunk.
    pub hash: String,
    pub seq: u32,
    pub total: u32,
    pub payload: Bytes,
}

/// Any datagram on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Control(ControlMessage),
    Data(DataFrame),
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire data. Callers drop the
/// offending datagram silently — no reply is ever sent for a bad message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("datagram is not valid UTF-8 where text was expected")]
    NotText,
    #[error("unknown message tag")]
    UnknownTag,
    #[error("malformed {0} message")]
    Malformed(&'static str),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// A file name that can appear on the wire and be joined to the sync root.
/// Rejects the field separators and anything that could escape the root.
pub fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '|', ':', ';', '\n'])
}

pub fn encode_inventory(entries: &[InventoryEntry]) -> Vec<u8> {
    let body: Vec<String> = entries
        .iter()
        .map(|e| format!("{}:{}:{}", e.name, e.size, e.hash))
        .collect();
    format!("INVENTORY|{}|{}", entries.len(), body.join(";")).into_bytes()
}

pub fn encode_pull(name: &str, hash: &str, size: u64) -> Vec<u8> {
    format!("PULL|{name}|{hash}|{size}").into_bytes()
}

pub fn encode_delete(name: &str, hash: &str) -> Vec<u8> {
    format!("DELETE|{name}|{hash}").into_bytes()
}

pub fn encode_ack(name: &str, seq: u32) -> Vec<u8> {
    format!("ACK|{name}|{seq}").into_bytes()
}

impl DataFrame {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!(
            "DATA|{}|{}|{}|{}\n",
            self.name, self.hash, self.seq, self.total
        )
        .into_bytes();
        out.extend_from_slice(&self.payload);
        out
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode one datagram. DATA is recognized by its prefix; everything else
/// must be a UTF-8 control message.
pub fn decode(datagram: &[u8]) -> Result<Frame, WireError> {
    if datagram.starts_with(b"DATA|") {
        return decode_data(datagram).map(Frame::Data);
    }
    let text = std::str::from_utf8(datagram).map_err(|_| WireError::NotText)?;
    decode_control(text).map(Frame::Control)
}

fn decode_data(datagram: &[u8]) -> Result<DataFrame, WireError> {
    let newline = datagram
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(WireError::Malformed("DATA"))?;
    let header =
        std::str::from_utf8(&datagram[..newline]).map_err(|_| WireError::NotText)?;
    let payload = Bytes::copy_from_slice(&datagram[newline + 1..]);

    let mut fields = header.splitn(5, '|');
    let _tag = fields.next();
    let name = fields.next().ok_or(WireError::Malformed("DATA"))?;
    let hash = fields.next().ok_or(WireError::Malformed("DATA"))?;
    let seq = fields.next().and_then(|s| s.parse().ok());
    let total = fields.next().and_then(|s| s.parse().ok());
    let (Some(seq), Some(total)) = (seq, total) else {
        return Err(WireError::Malformed("DATA"));
    };
    if !valid_name(name) {
        return Err(WireError::Malformed("DATA"));
    }
    Ok(DataFrame {
        name: name.to_string(),
        hash: hash.to_string(),
        seq,
        total,
        payload,
    })
}

fn decode_control(text: &str) -> Result<ControlMessage, WireError> {
    if let Some(rest) = text.strip_prefix("INVENTORY|") {
        let (count, body) = rest.split_once('|').ok_or(WireError::Malformed("INVENTORY"))?;
        count
            .parse::<usize>()
            .map_err(|_| WireError::Malformed("INVENTORY"))?;
        let mut entries = Vec::new();
        for part in body.split(';').filter(|p| !p.is_empty()) {
            let mut fields = part.splitn(3, ':');
            let name = fields.next().unwrap_or_default();
            let size = fields.next().and_then(|s| s.parse().ok());
            let hash = fields.next();
            let (Some(size), Some(hash)) = (size, hash) else {
                return Err(WireError::Malformed("INVENTORY"));
            };
            if !valid_name(name) {
                return Err(WireError::Malformed("INVENTORY"));
            }
            entries.push(InventoryEntry {
                name: name.to_string(),
                size,
                hash: hash.to_string(),
            });
        }
        return Ok(ControlMessage::Inventory(entries));
    }

    if let Some(rest) = text.strip_prefix("PULL|") {
        let mut fields = rest.splitn(3, '|');
        let name = fields.next().unwrap_or_default();
        let hash = fields.next().ok_or(WireError::Malformed("PULL"))?;
        let size = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(WireError::Malformed("PULL"))?;
        if !valid_name(name) {
            return Err(WireError::Malformed("PULL"));
        }
        return Ok(ControlMessage::Pull {
            name: name.to_string(),
            hash: hash.to_string(),
            size,
        });
    }

    if let Some(rest) = text.strip_prefix("DELETE|") {
        let (name, hash) = rest.split_once('|').ok_or(WireError::Malformed("DELETE"))?;
        if !valid_name(name) {
            return Err(WireError::Malformed("DELETE"));
        }
        return Ok(ControlMessage::Delete {
            name: name.to_string(),
            hash: hash.to_string(),
        });
    }

    if let Some(rest) = text.strip_prefix("ACK|") {
        let (name, seq) = rest.split_once('|').ok_or(WireError::Malformed("ACK"))?;
        let seq = seq.parse().map_err(|_| WireError::Malformed("ACK"))?;
        if !valid_name(name) {
            return Err(WireError::Malformed("ACK"));
        }
        return Ok(ControlMessage::Ack {
            name: name.to_string(),
            seq,
        });
    }

    Err(WireError::UnknownTag)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
