//! File discovery across roots
//!
//! Breadth-first over a work queue seeded with the configured roots. Link
//! targets that resolve to directories are pushed onto the same queue, so
//! each directory tree is visited at most once per run regardless of how
//! many links point into it. Name and path-pattern exclusions are applied
//! before descending into a directory.
//!
//! The iterator is single-pass and finite. Callers that need more than one
//! pass must materialize it.
//!
//! A link file is a text file carrying the configured link extension whose
//! first non-empty line names the target path. Chains of links are
//! followed up to a hop bound; a chain that does not reach a concrete path
//! within the bound yields nothing. Targets outside every configured root
//! are rejected unless the policy explicitly allows them.

use super::scan_path::{ext_of, is_within_any_root, normalized_identity};
use super::types::ScanCandidate;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Link-file resolution policy.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    pub enabled: bool,
    pub follow_dir_targets: bool,
    pub allow_outside_roots: bool,
    pub max_chain: usize,
    /// Lower-cased extension including the leading dot
    pub extension: String,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            follow_dir_targets: true,
            allow_outside_roots: false,
            max_chain: 2,
            extension: ".lnk".to_string(),
        }
    }
}

/// Compiled inclusion/exclusion policy for a run.
#[derive(Debug, Default)]
pub struct DiscoveryPolicy {
    /// Allowed extensions, lower-cased with leading dot
    pub include_ext: HashSet<String>,
    /// Directory names to skip, lower-cased exact matches
    pub exclude_dirs: HashSet<String>,
    /// Directory-name substrings to skip, lower-cased
    pub exclude_dir_keywords: Vec<String>,
    /// Full-path exclusion patterns
    pub exclude_path_patterns: Vec<Regex>,
    pub links: LinkPolicy,
}

impl DiscoveryPolicy {
    fn is_excluded_dir_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if self.exclude_dirs.contains(&lower) {
            return true;
        }
        self.exclude_dir_keywords
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
    }

    fn matches_excluded_path(&self, path: &Path) -> bool {
        let s = path.to_string_lossy();
        self.exclude_path_patterns.iter().any(|rx| rx.is_match(&s))
    }
}

/// Read a link file's target: the first non-empty line, resolved relative
/// to the link's directory when not absolute.
fn read_link_target(link: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(link).ok()?;
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let target = PathBuf::from(line);
    if target.is_absolute() {
        Some(target)
    } else {
        link.parent().map(|p| p.join(target))
    }
}

/// Lazy breadth-first discovery over the configured roots.
pub struct Discovery<'a> {
    policy: &'a DiscoveryPolicy,
    roots: Vec<PathBuf>,
    queue: VecDeque<PathBuf>,
    visited: HashSet<String>,
    walker: Option<walkdir::IntoIter>,
}

impl<'a> Discovery<'a> {
    pub fn new(roots: &[PathBuf], policy: &'a DiscoveryPolicy) -> Self {
        Self {
            policy,
            roots: roots.to_vec(),
            queue: roots.iter().cloned().collect(),
            visited: HashSet::new(),
            walker: None,
        }
    }

    fn should_prune_dir(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.policy.is_excluded_dir_name(&name.to_string_lossy()) {
                return true;
            }
        }
        self.policy.matches_excluded_path(path)
    }

    /// Follow a link chain up to the hop bound. `None` when any hop is
    /// unreadable or the chain does not terminate within the bound.
    fn resolve_link_chain(&self, link: &Path) -> Option<PathBuf> {
        let mut cur = link.to_path_buf();
        for _ in 0..self.policy.links.max_chain.max(1) {
            if ext_of(&cur) != self.policy.links.extension {
                return Some(cur);
            }
            cur = read_link_target(&cur)?;
        }
        if ext_of(&cur) != self.policy.links.extension {
            Some(cur)
        } else {
            None
        }
    }

    fn follow_link(&mut self, link: &Path) -> Option<ScanCandidate> {
        let target = self.resolve_link_chain(link)?;

        if !self.policy.links.allow_outside_roots && !is_within_any_root(&target, &self.roots) {
            tracing::debug!(
                link = %link.display(),
                target = %target.display(),
                "Link target outside configured roots, skipped"
            );
            return None;
        }

        if target.is_dir() {
            if self.policy.links.follow_dir_targets && !self.should_prune_dir(&target) {
                self.queue.push_back(target);
            }
            return None;
        }

        if target.is_file() && self.policy.include_ext.contains(&ext_of(&target)) {
            return Some(ScanCandidate {
                path: target,
                alias_from: Some(link.to_path_buf()),
            });
        }
        None
    }
}

impl<'a> Iterator for Discovery<'a> {
    type Item = ScanCandidate;

    fn next(&mut self) -> Option<ScanCandidate> {
        loop {
            let Some(mut walker) = self.walker.take() else {
                // next pending root, each visited at most once
                let root = self.queue.pop_front()?;
                if !root.is_dir() {
                    continue;
                }
                if !self.visited.insert(normalized_identity(&root)) {
                    continue;
                }
                self.walker = Some(WalkDir::new(&root).follow_links(false).into_iter());
                continue;
            };

            let entry = match walker.next() {
                None => continue, // root exhausted
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    self.walker = Some(walker);
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            if entry.file_type().is_dir() {
                if entry.depth() > 0 && self.should_prune_dir(entry.path()) {
                    walker.skip_current_dir();
                }
                self.walker = Some(walker);
                continue;
            }
            self.walker = Some(walker);

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if self.policy.matches_excluded_path(&path) {
                continue;
            }

            if self.policy.links.enabled && ext_of(&path) == self.policy.links.extension {
                if let Some(candidate) = self.follow_link(&path) {
                    return Some(candidate);
                }
                continue;
            }

            if self.policy.include_ext.contains(&ext_of(&path)) {
                return Some(ScanCandidate {
                    path,
                    alias_from: None,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn policy(links_enabled: bool) -> DiscoveryPolicy {
        DiscoveryPolicy {
            include_ext: [".md".to_string(), ".txt".to_string()].into_iter().collect(),
            exclude_dirs: ["node_modules".to_string()].into_iter().collect(),
            exclude_dir_keywords: vec!["backup".to_string()],
            exclude_path_patterns: vec![],
            links: LinkPolicy {
                enabled: links_enabled,
                ..LinkPolicy::default()
            },
        }
    }

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn collect(roots: &[PathBuf], policy: &DiscoveryPolicy) -> Vec<ScanCandidate> {
        Discovery::new(roots, policy).collect()
    }

    #[test]
    fn discovers_allowed_extensions_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "x");
        write(dir.path(), "sub/b.txt", "x");
        write(dir.path(), "c.bin", "x");

        let found = collect(&[dir.path().to_path_buf()], &policy(false));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.alias_from.is_none()));
    }

    #[test]
    fn excluded_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep/a.md", "x");
        write(dir.path(), "node_modules/skip.md", "x");
        write(dir.path(), "old_backup_2020/skip.md", "x");

        let found = collect(&[dir.path().to_path_buf()], &policy(false));
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("keep/a.md"));
    }

    #[test]
    fn path_pattern_excludes_files_and_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.md", "x");
        write(dir.path(), "drafts/wip.md", "x");
        write(dir.path(), "notes_draft.md", "x");

        let mut pol = policy(false);
        pol.exclude_path_patterns = vec![Regex::new("draft").unwrap()];
        let found = collect(&[dir.path().to_path_buf()], &pol);
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("keep.md"));
    }

    #[test]
    fn link_to_file_yields_alias_candidate() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "docs/spec.md", "content");
        write(
            dir.path(),
            "shortcuts/spec.lnk",
            &format!("{}\n", target.display()),
        );

        let found = collect(&[dir.path().to_path_buf()], &policy(true));
        // the target itself plus the link-resolved candidate
        assert_eq!(found.len(), 2);
        let aliased: Vec<_> = found.iter().filter(|c| c.alias_from.is_some()).collect();
        assert_eq!(aliased.len(), 1);
        assert_eq!(aliased[0].path, target);
    }

    #[test]
    fn links_ignored_when_disabled() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "docs/spec.md", "content");
        write(
            dir.path(),
            "spec.lnk",
            &format!("{}\n", target.display()),
        );

        let found = collect(&[dir.path().to_path_buf()], &policy(false));
        assert_eq!(found.len(), 1);
        assert!(found[0].alias_from.is_none());
    }

    #[test]
    fn link_chain_within_bound_resolves() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "docs/spec.md", "content");
        let hop = write(
            dir.path(),
            "hop.lnk",
            &format!("{}\n", target.display()),
        );
        write(dir.path(), "entry.lnk", &format!("{}\n", hop.display()));

        let found = collect(&[dir.path().to_path_buf()], &policy(true));
        let aliased: Vec<_> = found.iter().filter(|c| c.alias_from.is_some()).collect();
        // both links resolve to the same target (chain bound is 2)
        assert_eq!(aliased.len(), 2);
        assert!(aliased.iter().all(|c| c.path == target));
    }

    #[test]
    fn link_chain_beyond_bound_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "docs/spec.md", "content");
        let hop2 = write(dir.path(), "hop2.lnk", &format!("{}\n", target.display()));
        let hop1 = write(dir.path(), "hop1.lnk", &format!("{}\n", hop2.display()));
        write(dir.path(), "entry.lnk", &format!("{}\n", hop1.display()));

        let mut pol = policy(true);
        pol.links.max_chain = 2;
        let found = collect(&[dir.path().to_path_buf()], &pol);
        // entry.lnk needs three hops and resolves to nothing; the two
        // shorter chains still make it
        let from_entry: Vec<_> = found
            .iter()
            .filter(|c| {
                c.alias_from
                    .as_ref()
                    .is_some_and(|a| a.ends_with("entry.lnk"))
            })
            .collect();
        assert!(from_entry.is_empty());
    }

    #[test]
    fn broken_link_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dangling.lnk", "/nonexistent/target.md\n");
        write(dir.path(), "empty.lnk", "\n\n");

        let found = collect(&[dir.path().to_path_buf()], &policy(true));
        assert!(found.is_empty());
    }

    #[test]
    fn outside_roots_target_rejected_by_default() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let target = write(outside.path(), "doc.md", "content");
        write(
            root.path(),
            "escape.lnk",
            &format!("{}\n", target.display()),
        );

        let found = collect(&[root.path().to_path_buf()], &policy(true));
        assert!(found.is_empty());

        let mut pol = policy(true);
        pol.links.allow_outside_roots = true;
        let found = collect(&[root.path().to_path_buf()], &pol);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, target);
    }

    #[test]
    fn dir_target_is_scanned_as_additional_root() {
        // the target subtree is reachable only through the link
        let root = TempDir::new().unwrap();
        write(root.path(), "docs/inner/deep.md", "content");
        let scan_root = root.path().join("scans");
        fs::create_dir_all(&scan_root).unwrap();
        write(
            &scan_root,
            "jump.lnk",
            &format!("{}\n", root.path().join("docs/inner").display()),
        );

        let mut pol = policy(true);
        pol.links.allow_outside_roots = true;
        let found = collect(&[scan_root], &pol);
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("deep.md"));
        assert!(found[0].alias_from.is_none());
    }

    #[test]
    fn dir_target_not_followed_when_disabled() {
        let root = TempDir::new().unwrap();
        write(root.path(), "docs/inner/deep.md", "content");
        let scan_root = root.path().join("scans");
        fs::create_dir_all(&scan_root).unwrap();
        write(
            &scan_root,
            "jump.lnk",
            &format!("{}\n", root.path().join("docs/inner").display()),
        );

        let mut pol = policy(true);
        pol.links.allow_outside_roots = true;
        pol.links.follow_dir_targets = false;
        let found = collect(&[scan_root], &pol);
        assert!(found.is_empty());
    }

    #[test]
    fn looped_dir_links_terminate() {
        let root = TempDir::new().unwrap();
        write(root.path(), "a.md", "content");
        // link pointing back at the root itself
        write(
            root.path(),
            "loop.lnk",
            &format!("{}\n", root.path().display()),
        );

        let found = collect(&[root.path().to_path_buf()], &policy(true));
        assert_eq!(found.len(), 1);
    }
}
