//! Run configuration
//!
//! A single YAML file drives a run. Every key has a default, unknown keys
//! are ignored, and rule lists (screen patterns, redaction patterns, path
//! exclusions) are compiled once at load with invalid entries skipped.
//! An unreadable or syntactically invalid file is the one configuration
//! failure that aborts the run.

use crate::catalog::classify::{compile_screen_patterns, DocTypeRule};
use crate::catalog::discovery::{DiscoveryPolicy, LinkPolicy};
use crate::catalog::error::{CatalogError, Result};
use crate::catalog::extract::ExtractLimits;
use crate::catalog::redact::{compile_rules, RedactPattern, RedactRule};
use crate::catalog::scan_path::{absolute_lexical, expand_scan_path};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Link-file resolution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub follow_dir_targets: bool,
    #[serde(default)]
    pub allow_outside_roots: bool,
    #[serde(default = "default_max_chain")]
    pub max_chain: usize,
    #[serde(default = "default_link_extension")]
    pub extension: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            follow_dir_targets: true,
            allow_outside_roots: false,
            max_chain: default_max_chain(),
            extension: default_link_extension(),
        }
    }
}

/// Redaction settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedactSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub patterns: Vec<RedactPattern>,
}

/// Path-based system classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemFromPath {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_depth_from_root")]
    pub depth_from_root: usize,
}

impl Default for SystemFromPath {
    fn default() -> Self {
        Self {
            enabled: true,
            depth_from_root: default_depth_from_root(),
        }
    }
}

/// Latest-map settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestMapSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub allow_fallback_keys: bool,
}

impl Default for LatestMapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_fallback_keys: true,
        }
    }
}

/// The full run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub include_ext: Vec<String>,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub exclude_dir_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_path_regex: Vec<String>,
    #[serde(default)]
    pub links: LinkSettings,

    #[serde(default = "default_max_extract_chars")]
    pub max_extract_chars: usize,
    #[serde(default = "default_max_headings")]
    pub max_headings: usize,
    #[serde(default = "default_max_preview_paragraphs")]
    pub max_preview_paragraphs: usize,
    #[serde(default = "default_max_preview_cells")]
    pub max_preview_cells: usize,
    #[serde(default = "default_max_preview_slides")]
    pub max_preview_slides: usize,

    #[serde(default)]
    pub redact: RedactSettings,
    #[serde(default)]
    pub system_from_path: SystemFromPath,
    #[serde(default)]
    pub screen_id_regex: Vec<String>,
    #[serde(default)]
    pub doc_type_rules: Vec<DocTypeRule>,
    #[serde(default)]
    pub latest_map: LatestMapSettings,

    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,
    #[serde(default = "default_keywords_topk")]
    pub keywords_topk: usize,

    /// Worker threads for full reprocessing; 0 means auto-detect.
    #[serde(default)]
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            include_ext: Vec::new(),
            exclude_dirs: Vec::new(),
            exclude_dir_keywords: Vec::new(),
            exclude_path_regex: Vec::new(),
            links: LinkSettings::default(),
            max_extract_chars: default_max_extract_chars(),
            max_headings: default_max_headings(),
            max_preview_paragraphs: default_max_preview_paragraphs(),
            max_preview_cells: default_max_preview_cells(),
            max_preview_slides: default_max_preview_slides(),
            redact: RedactSettings::default(),
            system_from_path: SystemFromPath::default(),
            screen_id_regex: Vec::new(),
            doc_type_rules: Vec::new(),
            latest_map: LatestMapSettings::default(),
            summary_sentences: default_summary_sentences(),
            keywords_topk: default_keywords_topk(),
            concurrency: 0,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_chain() -> usize {
    2
}
fn default_link_extension() -> String {
    ".lnk".to_string()
}
fn default_depth_from_root() -> usize {
    1
}
fn default_max_extract_chars() -> usize {
    8000
}
fn default_max_headings() -> usize {
    40
}
fn default_max_preview_paragraphs() -> usize {
    12
}
fn default_max_preview_cells() -> usize {
    80
}
fn default_max_preview_slides() -> usize {
    30
}
fn default_summary_sentences() -> usize {
    3
}
fn default_keywords_topk() -> usize {
    15
}

/// Normalize an extension to lower case with a leading dot.
fn normalize_ext(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

impl Config {
    /// Load from a YAML file. Failure here is whole-run fatal.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("Cannot read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Config> {
        serde_yaml::from_str(text)
            .map_err(|e| CatalogError::Config(format!("Invalid configuration: {e}")))
    }

    /// Configured roots, tilde-expanded and lexically absolute.
    pub fn expanded_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|r| absolute_lexical(&expand_scan_path(Path::new(r))))
            .collect()
    }

    /// Compile the discovery policy: normalized extension set, lower-cased
    /// exclusions, compiled path patterns (invalid ones skipped).
    pub fn discovery_policy(&self) -> DiscoveryPolicy {
        let exclude_path_patterns = self
            .exclude_path_regex
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(rx) => Some(rx),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Skipping invalid exclude_path_regex");
                    None
                }
            })
            .collect();

        DiscoveryPolicy {
            include_ext: self.include_ext.iter().map(|e| normalize_ext(e)).collect(),
            exclude_dirs: self
                .exclude_dirs
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            exclude_dir_keywords: self
                .exclude_dir_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            exclude_path_patterns,
            links: LinkPolicy {
                enabled: self.links.enabled,
                follow_dir_targets: self.links.follow_dir_targets,
                allow_outside_roots: self.links.allow_outside_roots,
                max_chain: self.links.max_chain,
                extension: normalize_ext(&self.links.extension),
            },
        }
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_extract_chars: self.max_extract_chars,
            max_headings: self.max_headings,
            max_preview_paragraphs: self.max_preview_paragraphs,
            max_preview_cells: self.max_preview_cells,
            max_preview_slides: self.max_preview_slides,
        }
    }

    /// Compiled redaction rules; empty when redaction is disabled.
    pub fn redact_rules(&self) -> Vec<RedactRule> {
        if !self.redact.enabled {
            return Vec::new();
        }
        compile_rules(&self.redact.patterns)
    }

    /// Compiled screen-id patterns, invalid ones skipped.
    pub fn screen_patterns(&self) -> Vec<Regex> {
        compile_screen_patterns(&self.screen_id_regex)
    }
}
