//! Classification heuristics
//!
//! Three independent, best-effort classifiers. Absence of a match is a
//! valid terminal state, not an error; every caller treats `None` as
//! "unclassified" and moves on.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A document-type rule: the first rule with any matching keyword wins.
#[derive(Debug, Clone, Deserialize)]
pub struct DocTypeRule {
    #[serde(default)]
    pub contains_any: Vec<String>,
    pub doc_type: String,
}

/// Infer the owning system from the path: the segment at `depth_from_root`
/// (1-based) below the nearest configured root.
pub fn infer_system(file_path: &Path, roots: &[PathBuf], depth_from_root: usize) -> Option<String> {
    if depth_from_root == 0 {
        return None;
    }
    for root in roots {
        if let Ok(rel) = file_path.strip_prefix(root) {
            let parts: Vec<_> = rel.components().collect();
            if parts.len() >= depth_from_root {
                return Some(parts[depth_from_root - 1].as_os_str().to_string_lossy().into_owned());
            }
            // not deep enough under this root, another may still match
        }
    }
    None
}

/// Infer a screen/section id: the first capture group of the first pattern
/// that matches. Patterns without a capture group never match.
pub fn infer_screen_id(text: &str, patterns: &[Regex]) -> Option<String> {
    for rx in patterns {
        if let Some(caps) = rx.captures(text) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// Infer a document type from ordered keyword rules, matched as lower-cased
/// substrings.
pub fn infer_doc_type(text: &str, rules: &[DocTypeRule]) -> Option<String> {
    let t = text.to_lowercase();
    for rule in rules {
        for word in &rule.contains_any {
            let w = word.to_lowercase();
            if !w.is_empty() && t.contains(&w) {
                return Some(rule.doc_type.clone());
            }
        }
    }
    None
}

/// Compile screen-id patterns, skipping invalid ones.
///
/// An invalid pattern in the configuration costs one warning, never the run.
pub fn compile_screen_patterns(raw: &[String]) -> Vec<Regex> {
    raw.iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(rx) => Some(rx),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "Skipping invalid screen_id pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_from_nearest_root_segment() {
        let roots = vec![PathBuf::from("/kb")];
        let path = Path::new("/kb/billing/screens/invoice.md");
        assert_eq!(infer_system(path, &roots, 1), Some("billing".to_string()));
        assert_eq!(infer_system(path, &roots, 2), Some("screens".to_string()));
    }

    #[test]
    fn system_depth_beyond_segments() {
        let roots = vec![PathBuf::from("/kb")];
        let path = Path::new("/kb/top.md");
        assert_eq!(infer_system(path, &roots, 2), None);
    }

    #[test]
    fn system_no_matching_root() {
        let roots = vec![PathBuf::from("/kb")];
        assert_eq!(infer_system(Path::new("/elsewhere/a.md"), &roots, 1), None);
    }

    #[test]
    fn screen_id_first_pattern_first_group() {
        let patterns = compile_screen_patterns(&[
            r"SCR-(\d{3})".to_string(),
            r"screen[ _]([A-Z]\d+)".to_string(),
        ]);
        assert_eq!(
            infer_screen_id("spec for SCR-042 login", &patterns),
            Some("042".to_string())
        );
        assert_eq!(
            infer_screen_id("spec for screen B12", &patterns),
            Some("B12".to_string())
        );
        assert_eq!(infer_screen_id("no id here", &patterns), None);
    }

    #[test]
    fn invalid_screen_pattern_is_skipped() {
        let patterns =
            compile_screen_patterns(&["[unclosed".to_string(), r"OK-(\d+)".to_string()]);
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            infer_screen_id("ref OK-7", &patterns),
            Some("7".to_string())
        );
    }

    #[test]
    fn doc_type_first_rule_wins() {
        let rules = vec![
            DocTypeRule {
                contains_any: vec!["design".to_string(), "仕様".to_string()],
                doc_type: "design".to_string(),
            },
            DocTypeRule {
                contains_any: vec!["test".to_string()],
                doc_type: "test_plan".to_string(),
            },
        ];
        assert_eq!(
            infer_doc_type("Design and test notes", &rules),
            Some("design".to_string())
        );
        assert_eq!(
            infer_doc_type("画面仕様書", &rules),
            Some("design".to_string())
        );
        assert_eq!(
            infer_doc_type("test matrix", &rules),
            Some("test_plan".to_string())
        );
        assert_eq!(infer_doc_type("meeting minutes", &rules), None);
    }
}
