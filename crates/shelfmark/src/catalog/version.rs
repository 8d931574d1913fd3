//! Revision key inference from filenames
//!
//! Produces a lexicographically sortable key (higher sorts newer). Markers
//! found in the filename confer a priority tier:
//! explicit date > version tag > revision number > modification time only.
//! A dated file always outranks an undated one regardless of mtime; authors
//! who put a date in the name are trusted over filesystem metadata.
//!
//! Key layout: `P{tier}-D{yyyymmdd}-V{4x3-digit version}-R{rev}-M{mtime}`,
//! every field fixed-width so string comparison equals field-by-field
//! numeric comparison.

use once_cell::sync::Lazy;
use regex::Regex;

static RX_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:19|20)\d{2})[./_-]?(0[1-9]|1[0-2])[./_-]?(0[1-9]|[12]\d|3[01])")
        .expect("date regex")
});

// Day/month/year ideogram notation, e.g. 2024年3月1日
static RX_DATE_CJK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:19|20)\d{2})年(0?[1-9]|1[0-2])月(0?[1-9]|[12]\d|3[01])日")
        .expect("cjk date regex")
});

static RX_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:v|ver|version)[-_ ]?(\d+(?:\.\d+){0,3})\b").expect("version regex")
});

static RX_REV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:rev|r)[-_ ]?(\d{1,3})\b").expect("rev regex"));

fn version_tuple(v: &str) -> [u32; 4] {
    let mut nums = [0u32; 4];
    for (i, part) in v.split('.').take(4).enumerate() {
        nums[i] = part.parse().unwrap_or(0);
    }
    nums
}

fn embedded_date(name: &str) -> u32 {
    if let Some(c) = RX_DATE.captures(name) {
        let (y, mo, d) = (&c[1], &c[2], &c[3]);
        return format!("{y}{mo}{d}").parse().unwrap_or(0);
    }
    if let Some(c) = RX_DATE_CJK.captures(name) {
        let y: u32 = c[1].parse().unwrap_or(0);
        let mo: u32 = c[2].parse().unwrap_or(0);
        let d: u32 = c[3].parse().unwrap_or(0);
        return y * 10_000 + mo * 100 + d;
    }
    0
}

/// Infer the sortable revision key for a filename and its mtime.
pub fn infer_version_key(filename: &str, mtime_ms: i64) -> String {
    let date_int = embedded_date(filename);

    let version = RX_VERSION
        .captures(filename)
        .map(|c| version_tuple(&c[1]))
        .unwrap_or([0; 4]);

    let rev: u32 = RX_REV
        .captures(filename)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);

    let mtime_secs = (mtime_ms / 1000).max(0);

    let tier = if date_int > 0 {
        3
    } else if version != [0; 4] {
        2
    } else if rev > 0 {
        1
    } else {
        0
    };

    format!(
        "P{tier}-D{date_int:08}-V{:03}{:03}{:03}{:03}-R{rev:03}-M{mtime_secs:010}",
        version[0], version[1], version[2], version[3]
    )
}
