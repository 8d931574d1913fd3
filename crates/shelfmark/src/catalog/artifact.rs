//! Per-document artifact: render, parse, alias merge
//!
//! An artifact is a YAML front-matter block followed by labeled markdown
//! sections. The front matter is the machine-readable surface; downstream
//! tools may parse it without reading the body. Section labels are
//! repeated in the body because heading structure does not always survive
//! downstream chunking.
//!
//! In-place alias merging treats the artifact as a parsed document
//! (front matter + ordered sections) and re-serializes it, so unrelated
//! sections are carried through byte-for-byte. If the front matter does
//! not parse, the merge is a no-op; a malformed artifact is left alone
//! rather than risk corrupting it further.

use super::error::Result;
use super::types::DocumentRecord;
use serde::{Deserialize, Serialize};

pub const ALIAS_HEADING: &str = "ALIASES (shortcuts / links)";
const MAX_ALIAS_LINES: usize = 200;

/// Machine-readable header block. Field order here is emission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub doc_id: String,
    pub title: String,
    pub path: String,
    pub rel_path: String,
    pub ext: String,
    pub size_bytes: u64,
    pub updated_at: String,
    pub sha256: String,
    pub system: Option<String>,
    pub screen_id: Option<String>,
    pub doc_type: Option<String>,
    pub version_key: String,
    pub keywords: Vec<String>,
    pub aliases: Vec<String>,
}

impl From<&DocumentRecord> for FrontMatter {
    fn from(doc: &DocumentRecord) -> Self {
        Self {
            doc_id: doc.doc_id.clone(),
            title: doc.title.clone(),
            path: doc.path.clone(),
            rel_path: doc.rel_path.clone(),
            ext: doc.ext.clone(),
            size_bytes: doc.size_bytes,
            updated_at: doc.updated_at.clone(),
            sha256: doc.sha256.clone(),
            system: doc.system.clone(),
            screen_id: doc.screen_id.clone(),
            doc_type: doc.doc_type.clone(),
            version_key: doc.version_key.clone(),
            keywords: doc.keywords.clone(),
            aliases: doc.aliases.clone(),
        }
    }
}

/// Collapse all line-ending variants so the header block stays parseable.
pub fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn alias_block(aliases: &[String]) -> String {
    let mut out = format!("## {ALIAS_HEADING}\n\n");
    for a in aliases.iter().take(MAX_ALIAS_LINES) {
        out.push_str("- ");
        out.push_str(&normalize_newlines(a));
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Render a full artifact for a document record. Byte-stable for equal
/// input.
pub fn render(doc: &DocumentRecord) -> Result<String> {
    let fm = FrontMatter::from(doc);
    let yaml = serde_yaml::to_string(&fm)?;

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(yaml.trim_end());
    out.push_str("\n---\n\n");
    out.push_str(&format!("# {}\n\n", normalize_newlines(&doc.title)));

    out.push_str("## PATH\n\n");
    out.push_str(&format!("- {}\n\n", normalize_newlines(&doc.path)));

    if !doc.aliases.is_empty() {
        out.push_str(&alias_block(&doc.aliases));
    }

    out.push_str("## METADATA\n\n");
    out.push_str(&format!("- system: {}\n", doc.system.as_deref().unwrap_or("")));
    out.push_str(&format!(
        "- screen_id: {}\n",
        doc.screen_id.as_deref().unwrap_or("")
    ));
    out.push_str(&format!(
        "- doc_type: {}\n",
        doc.doc_type.as_deref().unwrap_or("")
    ));
    out.push_str(&format!("- updated_at: {}\n", doc.updated_at));
    out.push_str(&format!("- version_key: {}\n", doc.version_key));
    out.push_str(&format!("- sha256: {}\n\n", doc.sha256));

    if !doc.headings.is_empty() {
        out.push_str("## HEADINGS\n\n");
        for h in &doc.headings {
            out.push_str(&format!("- {}\n", normalize_newlines(h)));
        }
        out.push('\n');
    }

    if !doc.preview.is_empty() {
        out.push_str("## PREVIEW (limited)\n\n");
        out.push_str(&normalize_newlines(&doc.preview));
        out.push_str("\n\n");
    }

    if !doc.summary.is_empty() {
        out.push_str("## SUMMARY\n\n");
        out.push_str(&normalize_newlines(&doc.summary));
        out.push_str("\n\n");
    }

    if !doc.keywords.is_empty() {
        out.push_str("## KEYWORDS\n\n");
        out.push_str(&doc.keywords.join(", "));
        out.push('\n');
    }

    Ok(format!("{}\n", out.trim_end()))
}

/// One body section: the `## ` heading line plus everything up to the next
/// heading, kept verbatim.
#[derive(Debug, Clone)]
struct Block {
    heading: String,
    raw: String,
}

/// A parsed artifact: front matter plus the body split at section
/// headings. Serializing an unmodified document reproduces its input.
#[derive(Debug)]
pub struct ArtifactDoc {
    pub front_matter: FrontMatter,
    preamble: String,
    blocks: Vec<Block>,
}

impl ArtifactDoc {
    pub fn parse(text: &str) -> Option<ArtifactDoc> {
        let rest = text.strip_prefix("---\n")?;
        let end = rest.find("\n---\n")?;
        let front_matter: FrontMatter = serde_yaml::from_str(&rest[..end]).ok()?;
        let body = &rest[end + 5..];

        let mut preamble = String::new();
        let mut blocks: Vec<Block> = Vec::new();
        for line in body.split_inclusive('\n') {
            if line.starts_with("## ") {
                let heading = line[3..].trim_end().to_string();
                blocks.push(Block {
                    heading,
                    raw: line.to_string(),
                });
            } else if let Some(block) = blocks.last_mut() {
                block.raw.push_str(line);
            } else {
                preamble.push_str(line);
            }
        }

        Some(ArtifactDoc {
            front_matter,
            preamble,
            blocks,
        })
    }

    pub fn serialize(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.front_matter)?;
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(yaml.trim_end());
        out.push_str("\n---\n");
        out.push_str(&self.preamble);
        for block in &self.blocks {
            out.push_str(&block.raw);
        }
        Ok(out)
    }
}

/// Merge a new alias set into an existing artifact.
///
/// Replaces the front-matter alias list, then replaces the ALIASES section
/// or inserts one directly after PATH. Returns `None` when there is
/// nothing to merge or the artifact cannot be parsed safely.
pub fn merge_aliases(text: &str, aliases: &[String]) -> Option<String> {
    if aliases.is_empty() {
        return None;
    }
    let mut doc = ArtifactDoc::parse(text)?;
    doc.front_matter.aliases = aliases.to_vec();

    let block_raw = alias_block(aliases);
    if let Some(block) = doc
        .blocks
        .iter_mut()
        .find(|b| b.heading.starts_with("ALIASES"))
    {
        block.raw = block_raw;
    } else if let Some(pos) = doc.blocks.iter().position(|b| b.heading == "PATH") {
        doc.blocks.insert(
            pos + 1,
            Block {
                heading: ALIAS_HEADING.to_string(),
                raw: block_raw,
            },
        );
    }

    doc.serialize().ok()
}
