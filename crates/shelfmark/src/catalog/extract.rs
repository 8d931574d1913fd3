//! Content extraction boundary
//!
//! The catalog never parses binary office or PDF formats itself; it
//! consumes a `ContentExtractor` that returns a bounded heading list and a
//! bounded preview, and that never fails: any error becomes empty output.
//! The built-in extractor covers plain-text formats. Richer extractors
//! plug in behind the same trait, which is also where tests hook in to
//! observe extraction counts.

use std::path::Path;

/// Bounds applied to extraction output.
///
/// The paragraph/cell/slide bounds only matter to format-specific
/// extractors; the plain-text extractor honors the character and heading
/// caps.
#[derive(Debug, Clone)]
pub struct ExtractLimits {
    pub max_extract_chars: usize,
    pub max_headings: usize,
    pub max_preview_paragraphs: usize,
    pub max_preview_cells: usize,
    pub max_preview_slides: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_extract_chars: 8000,
            max_headings: 40,
            max_preview_paragraphs: 12,
            max_preview_cells: 80,
            max_preview_slides: 30,
        }
    }
}

/// Extraction output: both fields empty when nothing could be read.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub headings: Vec<String>,
    pub preview: String,
}

/// The extraction seam. Implementations must not fail; return
/// `Extracted::default()` instead.
pub trait ContentExtractor: Sync {
    fn extract(&self, path: &Path, limits: &ExtractLimits) -> Extracted;
}

/// Truncate to a character count on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Extractor for plain-text formats. Markdown-style `#` lines become
/// headings. Unknown formats and read errors yield empty output.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

const TEXT_EXTENSIONS: &[&str] = &["md", "txt", "sql"];

impl ContentExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path, limits: &ExtractLimits) -> Extracted {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Extracted::default();
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => return Extracted::default(),
        };
        let text = String::from_utf8_lossy(&bytes);
        let preview = truncate_chars(&text, limits.max_extract_chars).to_string();

        let mut headings = Vec::new();
        for line in preview.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                headings.push(trimmed.trim_start_matches('#').trim().to_string());
            }
            if headings.len() >= limits.max_headings {
                break;
            }
        }

        Extracted { headings, preview }
    }
}
