//! End-to-end catalog run
//!
//! discover -> deduplicate by identity -> gate each identity against the
//! previous state -> unchanged: merge any new aliases into the existing
//! artifact; changed: hash, extract, classify, summarize, write the
//! artifact -> persist the new state once -> emit the latest-revision
//! index.
//!
//! Alias aggregation completes before any processing starts, so workers
//! only ever read shared data. Each identity owns exactly one artifact
//! file; the full-reprocess path fans out over a bounded thread pool while
//! the cheap unchanged path stays inline.

use super::artifact::{self, ArtifactDoc};
use super::classify::{infer_doc_type, infer_screen_id, infer_system, DocTypeRule};
use super::discovery::{Discovery, DiscoveryPolicy};
use super::error::{CatalogError, Result};
use super::extract::{truncate_chars, ContentExtractor, ExtractLimits};
use super::latest::render_latest_map;
use super::redact::{redact_text, RedactRule};
use super::scan_path::{ext_of, normalized_identity, safe_relpath, validate_scan_path};
use super::state::{doc_id_for_identity, hash_file_streaming};
use super::summarize::{extract_keywords, make_extract_summary};
use super::types::{
    iso_local_now, iso_local_seconds, DocumentRecord, RunStats, StateEntry, StateSnapshot,
};
use super::version::infer_version_key;
use crate::config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-run options from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub out_dir: PathBuf,
    /// Defaults to `<out_dir>/state.json`
    pub state_path: Option<PathBuf>,
    /// Full decision pipeline, no artifact or state writes
    pub dry_run: bool,
    pub progress: bool,
}

/// What a completed run reports back.
#[derive(Debug)]
pub struct RunReport {
    pub docs: usize,
    pub stats: RunStats,
    pub out_dir: PathBuf,
}

/// One identity scheduled for full reprocessing.
struct WorkItem {
    identity: String,
    path: PathBuf,
    mtime_ms: i64,
    size: u64,
    aliases: Vec<String>,
}

/// Result of handling one identity, either path.
struct Processed {
    record: Option<DocumentRecord>,
    entry: StateEntry,
    soft_errors: u64,
    alias_merged: bool,
}

/// Read-only context shared by the reprocess workers.
struct ProcessContext<'a> {
    roots: &'a [PathBuf],
    limits: &'a ExtractLimits,
    redact_rules: &'a [RedactRule],
    screen_patterns: &'a [Regex],
    doc_type_rules: &'a [DocTypeRule],
    system_enabled: bool,
    system_depth: usize,
    summary_sentences: usize,
    keywords_topk: usize,
    out_docs: &'a Path,
    dry_run: bool,
    extractor: &'a dyn ContentExtractor,
}

fn mtime_millis(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn effective_concurrency(configured: usize, work: usize) -> usize {
    let auto = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let n = if configured == 0 { auto } else { configured };
    n.clamp(1, work.max(1))
}

/// Run the whole catalog pipeline.
pub fn run_scan(
    cfg: &Config,
    extractor: &dyn ContentExtractor,
    opts: &RunOptions,
) -> Result<RunReport> {
    let start = Instant::now();
    let mut stats = RunStats::default();

    let out_docs = opts.out_dir.join("docs");
    fs::create_dir_all(&out_docs).map_err(|e| {
        CatalogError::OutputDir(format!("{}: {e}", out_docs.display()))
    })?;
    let state_path = opts
        .state_path
        .clone()
        .unwrap_or_else(|| opts.out_dir.join("state.json"));

    let prev = StateSnapshot::load(&state_path);

    let roots = cfg.expanded_roots();
    for root in &roots {
        if let Err(e) = validate_scan_path(root) {
            warn!(%e, "Configured root is not scannable");
        }
    }

    let policy: DiscoveryPolicy = cfg.discovery_policy();
    let limits = cfg.extract_limits();
    let redact_rules = cfg.redact_rules();
    let screen_patterns = cfg.screen_patterns();

    info!(roots = roots.len(), "Starting catalog run");

    let candidates: Vec<_> = Discovery::new(&roots, &policy).collect();
    stats.candidates = candidates.len() as u64;

    // Aggregate aliases per identity before any processing; workers only
    // read the result.
    let mut order: Vec<String> = Vec::new();
    let mut targets: HashMap<String, PathBuf> = HashMap::new();
    let mut alias_map: HashMap<String, Vec<String>> = HashMap::new();
    for cand in candidates {
        let identity = normalized_identity(&cand.path);
        if !targets.contains_key(&identity) {
            order.push(identity.clone());
            targets.insert(identity.clone(), cand.path);
        }
        if let Some(alias) = cand.alias_from {
            alias_map
                .entry(identity)
                .or_default()
                .push(alias.to_string_lossy().into_owned());
        }
    }
    stats.identities = order.len() as u64;

    let bar = if opts.progress {
        let bar = ProgressBar::new(order.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Cataloguing");
        bar
    } else {
        ProgressBar::hidden()
    };

    // Gate every identity; unchanged ones are handled inline, the rest
    // are queued for the worker pool.
    let mut processed: HashMap<String, Processed> = HashMap::new();
    let mut work: Vec<WorkItem> = Vec::new();
    for identity in &order {
        let path = &targets[identity];
        let meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Stat failed, skipping");
                stats.skipped += 1;
                bar.inc(1);
                continue;
            }
        };
        let size = meta.len();
        let mtime_ms = mtime_millis(&meta);

        let mut aliases = alias_map.get(identity).cloned().unwrap_or_default();
        aliases.sort();
        aliases.dedup();

        let path_str = path.to_string_lossy().into_owned();
        if let Some(prev_entry) = prev.unchanged(identity, &path_str, mtime_ms, size) {
            let outcome = process_unchanged(
                identity, path, &path_str, mtime_ms, size, &aliases, prev_entry, &roots,
                &out_docs, opts.dry_run,
            );
            stats.unchanged += 1;
            if outcome.alias_merged {
                stats.alias_merges += 1;
            }
            stats.errors += outcome.soft_errors;
            processed.insert(identity.clone(), outcome);
            bar.inc(1);
        } else {
            work.push(WorkItem {
                identity: identity.clone(),
                path: path.clone(),
                mtime_ms,
                size,
                aliases,
            });
        }
    }

    // Fan the expensive path out over a bounded pool.
    stats.reprocessed = work.len() as u64;
    if !work.is_empty() {
        let ctx = ProcessContext {
            roots: &roots,
            limits: &limits,
            redact_rules: &redact_rules,
            screen_patterns: &screen_patterns,
            doc_type_rules: &cfg.doc_type_rules,
            system_enabled: cfg.system_from_path.enabled,
            system_depth: cfg.system_from_path.depth_from_root,
            summary_sentences: cfg.summary_sentences,
            keywords_topk: cfg.keywords_topk,
            out_docs: &out_docs,
            dry_run: opts.dry_run,
            extractor,
        };
        let workers = effective_concurrency(cfg.concurrency, work.len());
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(String, Processed)>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                let work = &work;
                let ctx = &ctx;
                scope.spawn(move || loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    if i >= work.len() {
                        break;
                    }
                    let item = &work[i];
                    let outcome = process_changed(ctx, item);
                    if tx.send((item.identity.clone(), outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);
            for (identity, outcome) in rx {
                stats.errors += outcome.soft_errors;
                processed.insert(identity, outcome);
                bar.inc(1);
            }
        });
    }
    bar.finish_and_clear();

    // Fold in first-seen order so artifact-independent outputs are
    // deterministic regardless of worker completion order.
    let mut docs: Vec<DocumentRecord> = Vec::new();
    let mut new_files: BTreeMap<String, StateEntry> = BTreeMap::new();
    for identity in &order {
        if let Some(p) = processed.remove(identity) {
            new_files.insert(identity.clone(), p.entry);
            if let Some(record) = p.record {
                docs.push(record);
            }
        }
    }

    let snapshot = StateSnapshot {
        generated_at: iso_local_now(),
        files: new_files,
    };
    if !opts.dry_run {
        snapshot.save(&state_path)?;
    }

    if cfg.latest_map.enabled && !opts.dry_run {
        let text = render_latest_map(&docs, cfg.latest_map.allow_fallback_keys);
        fs::write(opts.out_dir.join("latest_map.md"), text)?;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        candidates = stats.candidates,
        identities = stats.identities,
        unchanged = stats.unchanged,
        reprocessed = stats.reprocessed,
        alias_merges = stats.alias_merges,
        skipped = stats.skipped,
        errors = stats.errors,
        duration_ms = stats.duration_ms,
        dry_run = opts.dry_run,
        "Catalog run complete"
    );

    Ok(RunReport {
        docs: docs.len(),
        stats,
        out_dir: opts.out_dir.clone(),
    })
}

/// Unchanged path: no hashing, no extraction. Merge any newly observed
/// aliases into the existing artifact and recover the record for the
/// latest map from its front matter.
#[allow(clippy::too_many_arguments)]
fn process_unchanged(
    identity: &str,
    path: &Path,
    path_str: &str,
    mtime_ms: i64,
    size: u64,
    aliases: &[String],
    prev_entry: &StateEntry,
    roots: &[PathBuf],
    out_docs: &Path,
    dry_run: bool,
) -> Processed {
    let doc_id = if prev_entry.doc_id.is_empty() {
        doc_id_for_identity(identity)
    } else {
        prev_entry.doc_id.clone()
    };
    let md_path = out_docs.join(format!("{doc_id}.md"));

    let mut soft_errors = 0;
    let mut alias_merged = false;
    let mut current_text = fs::read_to_string(&md_path).ok();

    if !dry_run && !aliases.is_empty() {
        if let Some(text) = &current_text {
            if let Some(new_text) = artifact::merge_aliases(text, aliases) {
                if new_text != *text {
                    match fs::write(&md_path, &new_text) {
                        Ok(()) => {
                            alias_merged = true;
                            current_text = Some(new_text);
                        }
                        Err(e) => {
                            warn!(path = %md_path.display(), error = %e, "Alias merge write failed");
                            soft_errors += 1;
                        }
                    }
                }
            }
        }
    }

    // Latest-map membership comes from the artifact written last time; a
    // missing or unparseable artifact just drops this identity from the
    // index until its next full reprocess.
    let record = current_text
        .as_deref()
        .and_then(ArtifactDoc::parse)
        .map(|doc| {
            let fm = doc.front_matter;
            DocumentRecord {
                doc_id: if fm.doc_id.is_empty() {
                    doc_id.clone()
                } else {
                    fm.doc_id
                },
                title: if fm.title.is_empty() {
                    file_stem(path)
                } else {
                    fm.title
                },
                path: if fm.path.is_empty() {
                    path_str.to_string()
                } else {
                    fm.path
                },
                rel_path: if fm.rel_path.is_empty() {
                    safe_relpath(path, roots)
                } else {
                    fm.rel_path
                },
                ext: if fm.ext.is_empty() {
                    ext_of(path)
                } else {
                    fm.ext
                },
                size_bytes: if fm.size_bytes == 0 { size } else { fm.size_bytes },
                updated_at: if fm.updated_at.is_empty() {
                    iso_local_seconds(mtime_ms)
                } else {
                    fm.updated_at
                },
                mtime_ms,
                sha256: if fm.sha256.is_empty() {
                    prev_entry.sha256.clone()
                } else {
                    fm.sha256
                },
                system: fm.system,
                screen_id: fm.screen_id,
                doc_type: fm.doc_type,
                version_key: if fm.version_key.is_empty() {
                    infer_version_key(&file_name(path), mtime_ms)
                } else {
                    fm.version_key
                },
                headings: Vec::new(),
                preview: String::new(),
                summary: String::new(),
                keywords: fm.keywords,
                aliases: if aliases.is_empty() {
                    fm.aliases
                } else {
                    aliases.to_vec()
                },
            }
        });

    Processed {
        record,
        entry: StateEntry {
            mtime_ms,
            size,
            sha256: prev_entry.sha256.clone(),
            doc_id,
            path: path_str.to_string(),
        },
        soft_errors,
        alias_merged,
    }
}

/// Changed path: hash, extract, redact, classify, summarize, version, and
/// rewrite the artifact.
fn process_changed(ctx: &ProcessContext<'_>, item: &WorkItem) -> Processed {
    let mut soft_errors = 0;
    let path = &item.path;
    let path_str = path.to_string_lossy().into_owned();

    let sha256 = match hash_file_streaming(path) {
        Ok(h) => h,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Hashing failed");
            soft_errors += 1;
            String::new()
        }
    };

    let title = file_stem(path);
    let extracted = ctx.extractor.extract(path, ctx.limits);
    let mut headings: Vec<String> = extracted
        .headings
        .into_iter()
        .take(ctx.limits.max_headings)
        .collect();
    let mut preview =
        truncate_chars(&extracted.preview, ctx.limits.max_extract_chars).to_string();

    if !ctx.redact_rules.is_empty() {
        preview = redact_text(&preview, ctx.redact_rules);
        headings = headings
            .iter()
            .map(|h| redact_text(h, ctx.redact_rules))
            .collect();
    }

    let alias_stems: Vec<String> = item
        .aliases
        .iter()
        .map(|a| file_stem(Path::new(a)))
        .collect();
    let classify_text = format!("{}\n{}\n{}", title, alias_stems.join("\n"), preview);

    let system = if ctx.system_enabled {
        infer_system(path, ctx.roots, ctx.system_depth)
    } else {
        None
    };
    let screen_id = infer_screen_id(&classify_text, ctx.screen_patterns);
    let doc_type = infer_doc_type(&classify_text, ctx.doc_type_rules);
    let version_key = infer_version_key(&file_name(path), item.mtime_ms);
    let summary = make_extract_summary(&preview, ctx.summary_sentences);
    let keywords = extract_keywords(&classify_text, ctx.keywords_topk);

    let doc_id = doc_id_for_identity(&item.identity);
    let record = DocumentRecord {
        doc_id: doc_id.clone(),
        title,
        path: path_str.clone(),
        rel_path: safe_relpath(path, ctx.roots),
        ext: ext_of(path),
        size_bytes: item.size,
        updated_at: iso_local_seconds(item.mtime_ms),
        mtime_ms: item.mtime_ms,
        sha256: sha256.clone(),
        system,
        screen_id,
        doc_type,
        version_key,
        headings,
        preview,
        summary,
        keywords,
        aliases: item.aliases.clone(),
    };

    if !ctx.dry_run {
        let md_path = ctx.out_docs.join(format!("{doc_id}.md"));
        match artifact::render(&record) {
            Ok(text) => {
                if let Err(e) = fs::write(&md_path, text) {
                    warn!(path = %md_path.display(), error = %e, "Artifact write failed");
                    soft_errors += 1;
                }
            }
            Err(e) => {
                warn!(path = %md_path.display(), error = %e, "Artifact render failed");
                soft_errors += 1;
            }
        }
    }

    Processed {
        record: Some(record),
        entry: StateEntry {
            mtime_ms: item.mtime_ms,
            size: item.size,
            sha256,
            doc_id,
            path: path_str,
        },
        soft_errors,
        alias_merged: false,
    }
}
