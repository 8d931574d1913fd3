//! Incremental state: load, gate, persist
//!
//! The state file is read once at run start and rewritten once at run end.
//! Persist goes through a temp file in the same directory followed by a
//! rename, so a crash mid-run leaves the previous run's state intact.
//!
//! The change gate compares recorded mtime and size exactly. Hashing every
//! file on every run is the dominant cost on large trees; the gate keeps
//! the hash off the unchanged path entirely.

use super::error::Result;
use super::types::{StateEntry, StateSnapshot};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

const HASH_BLOCK_SIZE: usize = 1024 * 1024;

/// Length of the artifact id derived from an identity hash.
const DOC_ID_HEX_LEN: usize = 16;

impl StateSnapshot {
    /// Load a snapshot, tolerating a missing or malformed file.
    pub fn load(path: &Path) -> StateSnapshot {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(snap) => snap,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "State file unreadable, starting fresh");
                    StateSnapshot::default()
                }
            },
            Err(_) => StateSnapshot::default(),
        }
    }

    /// Persist atomically: write a sibling temp file, then rename over.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// The gate: a prior entry whose mtime and size match exactly means the
    /// file is unchanged and the expensive path can be skipped.
    pub fn unchanged(&self, identity: &str, path: &str, mtime_ms: i64, size: u64) -> Option<&StateEntry> {
        let entry = self
            .files
            .get(identity)
            .or_else(|| self.files.get(path))?;
        if entry.mtime_ms == mtime_ms && entry.size == size {
            Some(entry)
        } else {
            None
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Stream a file through SHA-256 in fixed-size blocks.
pub fn hash_file_streaming(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_string(&hasher.finalize()))
}

/// Derive the stable artifact id for an identity.
///
/// Hashes the identity string, not the content, so the id survives edits
/// to the document.
pub fn doc_id_for_identity(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let mut hex = hex_string(&digest);
    hex.truncate(DOC_ID_HEX_LEN);
    hex
}
