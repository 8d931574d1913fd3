//! End-to-end pipeline tests: discovery, incremental gating, alias
//! accumulation, and latest-map selection against real temp directories.

use filetime::{set_file_mtime, FileTime};
use shelfmark::catalog::classify::DocTypeRule;
use shelfmark::catalog::{ContentExtractor, ExtractLimits, Extracted, PlainTextExtractor};
use shelfmark::{run_scan, Config, RunOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Wraps the real extractor and counts invocations, to prove the
/// unchanged path never re-extracts.
struct CountingExtractor {
    inner: PlainTextExtractor,
    count: AtomicUsize,
}

impl CountingExtractor {
    fn new() -> Self {
        Self {
            inner: PlainTextExtractor,
            count: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ContentExtractor for CountingExtractor {
    fn extract(&self, path: &Path, limits: &ExtractLimits) -> Extracted {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(path, limits)
    }
}

fn write_file(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn base_config(root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.roots = vec![root.to_string_lossy().into_owned()];
    cfg.include_ext = vec![".md".to_string(), ".txt".to_string(), ".docx".to_string()];
    cfg.links.enabled = true;
    cfg.concurrency = 2;
    cfg
}

fn run_opts(out: &Path) -> RunOptions {
    RunOptions {
        out_dir: out.to_path_buf(),
        state_path: None,
        dry_run: false,
        progress: false,
    }
}

fn read_artifacts(out: &Path) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let docs = out.join("docs");
    for entry in fs::read_dir(docs).unwrap() {
        let entry = entry.unwrap();
        map.insert(
            entry.file_name().to_string_lossy().into_owned(),
            fs::read_to_string(entry.path()).unwrap(),
        );
    }
    map
}

#[test]
fn full_run_writes_artifacts_state_and_latest_map() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(root.path(), "billing/invoice design.md", "# Invoice\n\nSpec body.\n");
    write_file(root.path(), "billing/export notes.txt", "plain notes with enough text.\n");

    let cfg = base_config(root.path());
    let report = run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();

    assert_eq!(report.docs, 2);
    assert_eq!(report.stats.identities, 2);
    assert_eq!(report.stats.reprocessed, 2);

    let artifacts = read_artifacts(out.path());
    assert_eq!(artifacts.len(), 2);
    for (name, text) in &artifacts {
        assert!(name.ends_with(".md"));
        assert!(text.starts_with("---\n"), "front matter missing");
        assert!(text.contains("## PATH"));
        assert!(text.contains("## METADATA"));
    }
    assert!(out.path().join("state.json").exists());
    assert!(out.path().join("latest_map.md").exists());
}

#[test]
fn second_run_is_idempotent_and_skips_extraction() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let a = write_file(
        root.path(),
        "sys/design doc.md",
        "# Design\n\nThe design covers the export flow in detail.\n",
    );
    let b = write_file(root.path(), "sys/readme.txt", "readme body with some length.\n");
    set_file_mtime(&a, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    set_file_mtime(&b, FileTime::from_unix_time(1_100_000, 0)).unwrap();

    let cfg = base_config(root.path());

    let ex1 = CountingExtractor::new();
    run_scan(&cfg, &ex1, &run_opts(out.path())).unwrap();
    assert_eq!(ex1.calls(), 2);

    let first_artifacts = read_artifacts(out.path());
    let first_latest = fs::read_to_string(out.path().join("latest_map.md")).unwrap();

    let ex2 = CountingExtractor::new();
    let report = run_scan(&cfg, &ex2, &run_opts(out.path())).unwrap();
    assert_eq!(ex2.calls(), 0, "unchanged files must not re-extract");
    assert_eq!(report.stats.unchanged, 2);
    assert_eq!(report.stats.reprocessed, 0);
    // records still appear in the report, recovered from front matter
    assert_eq!(report.docs, 2);

    let second_artifacts = read_artifacts(out.path());
    let second_latest = fs::read_to_string(out.path().join("latest_map.md")).unwrap();
    assert_eq!(first_artifacts, second_artifacts, "artifacts must be byte-identical");
    assert_eq!(first_latest, second_latest);
}

#[test]
fn changed_file_is_reprocessed() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let doc = write_file(root.path(), "sys/doc.md", "# One\n\nOriginal body text.\n");
    set_file_mtime(&doc, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let cfg = base_config(root.path());
    run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();

    fs::write(&doc, "# One\n\nRewritten body text entirely.\n").unwrap();
    set_file_mtime(&doc, FileTime::from_unix_time(2_000_000, 0)).unwrap();

    let ex = CountingExtractor::new();
    let report = run_scan(&cfg, &ex, &run_opts(out.path())).unwrap();
    assert_eq!(ex.calls(), 1);
    assert_eq!(report.stats.reprocessed, 1);

    let artifacts = read_artifacts(out.path());
    let text = artifacts.values().next().unwrap();
    assert!(text.contains("Rewritten body text"));
    assert!(!text.contains("Original body text"));
}

#[test]
fn alias_accumulation_across_runs() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let target = write_file(
        root.path(),
        "docs/spec.md",
        "# Spec\n\nA body that is long enough to preview.\n",
    );
    write_file(
        root.path(),
        "links/a_spec.lnk",
        &format!("{}\n", target.display()),
    );

    let cfg = base_config(root.path());
    run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();

    let artifacts = read_artifacts(out.path());
    assert_eq!(artifacts.len(), 1);
    let first = artifacts.values().next().unwrap().clone();
    assert!(first.contains("## ALIASES"));
    assert!(first.contains("a_spec.lnk"));

    // a second link appears; the target itself is untouched
    write_file(
        root.path(),
        "links/b_spec.lnk",
        &format!("{}\n", target.display()),
    );

    let ex = CountingExtractor::new();
    let report = run_scan(&cfg, &ex, &run_opts(out.path())).unwrap();
    assert_eq!(ex.calls(), 0, "alias merge must not trigger extraction");
    assert_eq!(report.stats.alias_merges, 1);

    let merged = read_artifacts(out.path());
    let text = merged.values().next().unwrap();
    assert!(text.contains("a_spec.lnk"));
    assert!(text.contains("b_spec.lnk"));
    let a_at = text.find("a_spec.lnk").unwrap();
    let b_at = text.find("b_spec.lnk").unwrap();
    assert!(a_at < b_at, "alias list must be sorted");
    assert_eq!(text.matches("## ALIASES").count(), 1);

    // unrelated sections survive the merge byte-for-byte
    let first_preview = first.split("## PREVIEW").nth(1).unwrap();
    let merged_preview = text.split("## PREVIEW").nth(1).unwrap();
    assert_eq!(first_preview, merged_preview);
}

#[test]
fn dry_run_writes_nothing() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(root.path(), "sys/doc.md", "# Doc\n\nBody for the dry run.\n");

    let cfg = base_config(root.path());
    let mut opts = run_opts(out.path());
    opts.dry_run = true;
    let report = run_scan(&cfg, &PlainTextExtractor, &opts).unwrap();

    assert_eq!(report.docs, 1);
    assert!(read_artifacts(out.path()).is_empty());
    assert!(!out.path().join("state.json").exists());
    assert!(!out.path().join("latest_map.md").exists());
}

#[test]
fn latest_map_prefers_dated_filename_over_newer_mtime() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let dated = write_file(root.path(), "billing/Spec_v2.1_2024-03-01.docx", "x");
    let revised = write_file(root.path(), "billing/Spec_r5.docx", "y");
    set_file_mtime(&dated, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    set_file_mtime(&revised, FileTime::from_unix_time(2_000_000_000, 0)).unwrap();

    let mut cfg = base_config(root.path());
    cfg.doc_type_rules = vec![DocTypeRule {
        contains_any: vec!["spec".to_string()],
        doc_type: "spec".to_string(),
    }];

    run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();

    let latest = fs::read_to_string(out.path().join("latest_map.md")).unwrap();
    assert!(latest.contains("## billing / __NO_SCREEN__ / spec"));
    assert!(latest.contains("- latest_title: Spec_v2.1_2024-03-01"));
    assert!(!latest.contains("- latest_title: Spec_r5"));
}

#[test]
fn state_survives_for_next_run_and_ids_are_stable() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let doc = write_file(root.path(), "sys/doc.md", "# Doc\n\nStable identity body.\n");
    set_file_mtime(&doc, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let cfg = base_config(root.path());
    run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();
    let first: Vec<String> = read_artifacts(out.path()).keys().cloned().collect();

    // content changes, identity (and thus artifact name) does not
    fs::write(&doc, "# Doc\n\nCompletely different body now.\n").unwrap();
    set_file_mtime(&doc, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    run_scan(&cfg, &PlainTextExtractor, &run_opts(out.path())).unwrap();
    let second: Vec<String> = read_artifacts(out.path()).keys().cloned().collect();

    assert_eq!(first, second);
}
