//! Latest-revision index
//!
//! Groups records by their classification triple and names the newest
//! record per group, judged by version key first and modification time
//! second. Groups are emitted in sorted key order so consecutive runs
//! diff cleanly.

use super::types::DocumentRecord;
use std::collections::BTreeMap;

pub const NO_SYSTEM: &str = "__NO_SYSTEM__";
pub const NO_SCREEN: &str = "__NO_SCREEN__";
pub const NO_TYPE: &str = "__NO_TYPE__";

type GroupKey = (String, String, String);

/// The grouping key for a record, or `None` when classification is
/// incomplete and fallback keys are disabled.
///
/// Fallback substitutes sentinels for missing fields instead of dropping
/// the record: a known system with an unknown screen still groups
/// meaningfully by system and type.
fn group_key(doc: &DocumentRecord, allow_fallback: bool) -> Option<GroupKey> {
    let system = doc.system.clone().unwrap_or_default();
    let screen = doc.screen_id.clone().unwrap_or_default();
    let dtype = doc.doc_type.clone().unwrap_or_default();

    if !system.is_empty() && !screen.is_empty() && !dtype.is_empty() {
        return Some((system, screen, dtype));
    }
    if !allow_fallback {
        return None;
    }
    if !system.is_empty() && !dtype.is_empty() {
        Some((system, NO_SCREEN.to_string(), dtype))
    } else if !system.is_empty() {
        Some((system, NO_SCREEN.to_string(), NO_TYPE.to_string()))
    } else {
        Some((
            NO_SYSTEM.to_string(),
            NO_SCREEN.to_string(),
            NO_TYPE.to_string(),
        ))
    }
}

/// Pick the winner per group: greatest version key, ties broken by
/// greatest modification time, further ties by earliest arrival.
pub fn build_latest_map<'a>(
    docs: &'a [DocumentRecord],
    allow_fallback: bool,
) -> BTreeMap<GroupKey, &'a DocumentRecord> {
    let mut latest: BTreeMap<GroupKey, &DocumentRecord> = BTreeMap::new();
    for doc in docs {
        let Some(key) = group_key(doc, allow_fallback) else {
            continue;
        };
        match latest.get(&key) {
            Some(current)
                if (doc.version_key.as_str(), doc.mtime_ms)
                    > (current.version_key.as_str(), current.mtime_ms) =>
            {
                latest.insert(key, doc);
            }
            None => {
                latest.insert(key, doc);
            }
            _ => {}
        }
    }
    latest
}

/// Render the index as markdown, one section per group.
pub fn render_latest_map(docs: &[DocumentRecord], allow_fallback: bool) -> String {
    let latest = build_latest_map(docs, allow_fallback);

    let mut out = String::new();
    out.push_str("# latest_map\n\n");
    out.push_str("Estimated newest revision per classification group. Evidence: `version_key`, then `updated_at`.\n\n");
    for ((system, screen, dtype), doc) in &latest {
        out.push_str(&format!("## {system} / {screen} / {dtype}\n"));
        out.push_str(&format!("- latest_title: {}\n", doc.title));
        out.push_str(&format!("- latest_path: {}\n", doc.path));
        out.push_str(&format!("- updated_at: {}\n", doc.updated_at));
        out.push_str(&format!("- version_key: {}\n\n", doc.version_key));
    }
    format!("{}\n", out.trim_end())
}
