//! Core types for the catalog engine
//!
//! A document is identified by its normalized absolute path. Everything
//! derived from it (artifact id, state entry, latest-map membership) keys
//! off that identity, so a document keeps its id across content changes.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One catalogued document: normalized metadata plus extracted content.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// Stable identifier derived from the normalized path, not the content
    pub doc_id: String,
    /// Title, taken from the filename stem unless recovered from a prior artifact
    pub title: String,
    /// Canonical path
    pub path: String,
    /// Path relative to the nearest configured root
    pub rel_path: String,
    /// Lower-cased extension including the leading dot
    pub ext: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Human-readable modification timestamp (local ISO-8601, seconds)
    pub updated_at: String,
    /// Last modification time (Unix timestamp milliseconds)
    pub mtime_ms: i64,
    /// Streamed content hash, empty when unavailable
    pub sha256: String,
    /// Classification: owning system, inferred from the path
    pub system: Option<String>,
    /// Classification: screen/section id, inferred from text
    pub screen_id: Option<String>,
    /// Classification: document type, inferred from text
    pub doc_type: Option<String>,
    /// Lexicographically sortable revision key
    pub version_key: String,
    /// Bounded heading list from content extraction
    pub headings: Vec<String>,
    /// Bounded preview text from content extraction
    pub preview: String,
    /// Extractive summary
    pub summary: String,
    /// Ranked keywords
    pub keywords: Vec<String>,
    /// Paths of link files currently resolving to this document, sorted and deduplicated
    pub aliases: Vec<String>,
}

/// A discovered file: the resolved target plus the link file that led to
/// it, if any. Multiple candidates may collapse onto one identity.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    pub path: PathBuf,
    pub alias_from: Option<PathBuf>,
}

/// Persisted per-identity state used for change detection on the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    /// Last-seen modification time (Unix milliseconds)
    pub mtime_ms: i64,
    /// Last-seen size in bytes
    pub size: u64,
    /// Content hash at last full processing, empty when unavailable
    pub sha256: String,
    /// Artifact id
    pub doc_id: String,
    /// Canonical path at last sighting
    pub path: String,
}

/// The full persisted state: one entry per identity, rewritten at run end.
///
/// Entries for files that have since disappeared are never purged. They are
/// harmless and keep the save cheap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub files: BTreeMap<String, StateEntry>,
}

/// Statistics from a catalog run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Candidates yielded by discovery, alias duplicates included
    pub candidates: u64,
    /// Distinct identities after deduplication
    pub identities: u64,
    /// Identities gated out by the mtime+size check
    pub unchanged: u64,
    /// Identities fully reprocessed
    pub reprocessed: u64,
    /// Existing artifacts that received an alias merge
    pub alias_merges: u64,
    /// Identities skipped (stat failure or similar)
    pub skipped: u64,
    /// Soft errors (hashing, artifact write)
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Format a millisecond timestamp as local ISO-8601 with seconds precision.
pub fn iso_local_seconds(mtime_ms: i64) -> String {
    match Local.timestamp_millis_opt(mtime_ms) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%Y-%m-%dT%H:%M:%S").to_string()
        }
        chrono::LocalResult::None => String::new(),
    }
}

/// Current local time in the same format used for document timestamps.
pub fn iso_local_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
