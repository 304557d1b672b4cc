//! Content hashing — 256-bit BLAKE3, rendered lowercase hex.
//!
//! The same digest serves both change detection (inventory comparison)
//! and end-to-end integrity verification after reassembly.

use std::io::Read;
use std::path::Path;

/// Digest of an in-memory buffer.
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Streaming digest of a file, read in 1 MiB blocks so large files never
/// land in memory whole.
pub fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut block = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
