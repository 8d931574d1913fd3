//! Extractive summarization and keyword ranking
//!
//! No model, no external knowledge: sentences are scored by the log term
//! frequency of their tokens, normalized so very long sentences do not win
//! on bulk. Selection is by score, output order is original position, which
//! keeps the summary readable as narrative.
//!
//! Tokenization handles mixed CJK/Latin text: ideogram and kana runs of
//! length two or more, Latin runs of three or more, digit runs of two or
//! more, case-folded.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static RX_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

// Sentence-final punctuation (wide and narrow) followed by whitespace.
static RX_SENT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。！？!?.]\s+").expect("sentence regex"));

static RX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{3040}-\u{30ff}\u{4e00}-\u{9fff}]{2,}|[A-Za-z]{3,}|[0-9]{2,}")
        .expect("token regex")
});

const MIN_SENTENCE_CHARS: usize = 10;
const MAX_SCORED_SENTENCES: usize = 80;

fn normalize_ws(text: &str) -> String {
    RX_WS.replace_all(text, " ").trim().to_string()
}

/// Split text into candidate sentences.
///
/// Splits after terminal punctuation; if that produces at most one
/// sentence (punctuation-free text), falls back to line splitting. Short
/// fragments are dropped.
fn sentences(text: &str) -> Vec<String> {
    let t = normalize_ws(text);
    if t.is_empty() {
        return Vec::new();
    }

    let mut sents: Vec<String> = Vec::new();
    let mut start = 0;
    for m in RX_SENT_END.find_iter(&t) {
        // keep the terminator, drop the whitespace
        let punct_end = m.start()
            + t[m.start()..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(1);
        sents.push(t[start..punct_end].to_string());
        start = m.end();
    }
    if start < t.len() {
        sents.push(t[start..].to_string());
    }

    if sents.len() <= 1 {
        sents = text
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }

    sents
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    RX_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Produce a short extractive summary of at most `max_sentences` sentences.
pub fn make_extract_summary(text: &str, max_sentences: usize) -> String {
    let sents = sentences(text);
    if sents.is_empty() {
        return String::new();
    }

    let mut tf: HashMap<String, u32> = HashMap::new();
    for tok in tokens(text) {
        *tf.entry(tok).or_insert(0) += 1;
    }

    let mut scored: Vec<(f64, usize, &str)> = Vec::new();
    for (i, s) in sents.iter().take(MAX_SCORED_SENTENCES).enumerate() {
        let toks = tokens(s);
        if toks.is_empty() {
            continue;
        }
        let score: f64 = toks
            .iter()
            .map(|t| f64::from(1 + tf.get(t).copied().unwrap_or(0)).ln())
            .sum::<f64>()
            / (1.0 + (toks.len() as f64).sqrt());
        scored.push((score, i, s.as_str()));
    }

    if scored.is_empty() {
        return sents
            .iter()
            .take(max_sentences)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" / ");
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut top: Vec<(usize, &str)> = scored
        .into_iter()
        .take(max_sentences)
        .map(|(_, i, s)| (i, s))
        .collect();
    top.sort_by_key(|&(i, _)| i);

    top.into_iter()
        .map(|(_, s)| s)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rank keywords by (frequency, token length) descending.
///
/// First occurrence breaks remaining ties, which keeps output stable for
/// identical input.
pub fn extract_keywords(text: &str, topk: usize) -> Vec<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for tok in tokens(text) {
        if tok.chars().count() <= 2 {
            continue;
        }
        match counts.get_mut(&tok) {
            Some(c) => *c += 1,
            None => {
                counts.insert(tok.clone(), 1);
                order.push(tok);
            }
        }
    }

    let mut ranked: Vec<(u32, usize, String)> = order
        .into_iter()
        .map(|tok| {
            let freq = counts.get(&tok).copied().unwrap_or(0);
            let len = tok.chars().count();
            (freq, len, tok)
        })
        .collect();
    ranked.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

    ranked
        .into_iter()
        .take(topk)
        .map(|(_, _, tok)| tok)
        .collect()
}
