//! Regex-based text redaction
//!
//! Rules are compiled once at configuration load; invalid patterns are
//! dropped with a warning. Application is a no-op on empty input or an
//! empty rule list.

use regex::Regex;
use serde::Deserialize;

/// Raw redaction rule as it appears in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactPattern {
    pub regex: String,
    #[serde(default = "default_replace")]
    pub replace: String,
}

fn default_replace() -> String {
    "[REDACTED]".to_string()
}

/// A compiled redaction rule.
#[derive(Debug, Clone)]
pub struct RedactRule {
    pub pattern: Regex,
    pub replace: String,
}

/// Compile configured rules, skipping invalid patterns.
pub fn compile_rules(patterns: &[RedactPattern]) -> Vec<RedactRule> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&p.regex) {
            Ok(rx) => Some(RedactRule {
                pattern: rx,
                replace: p.replace.clone(),
            }),
            Err(e) => {
                tracing::warn!(pattern = %p.regex, error = %e, "Skipping invalid redaction pattern");
                None
            }
        })
        .collect()
}

/// Apply rules in order. Identity on empty input or no rules.
pub fn redact_text(text: &str, rules: &[RedactRule]) -> String {
    if text.is_empty() || rules.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for rule in rules {
        out = rule
            .pattern
            .replace_all(&out, rule.replace.as_str())
            .into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(specs: &[(&str, &str)]) -> Vec<RedactRule> {
        let raw: Vec<RedactPattern> = specs
            .iter()
            .map(|(rx, rep)| RedactPattern {
                regex: rx.to_string(),
                replace: rep.to_string(),
            })
            .collect();
        compile_rules(&raw)
    }

    #[test]
    fn redacts_in_order() {
        let rules = rules(&[(r"\d{4}-\d{4}", "[ACCT]"), ("secret", "[X]")]);
        let out = redact_text("acct 1234-5678 is secret", &rules);
        assert_eq!(out, "acct [ACCT] is [X]");
    }

    #[test]
    fn empty_input_is_identity() {
        let rules = rules(&[("a", "b")]);
        assert_eq!(redact_text("", &rules), "");
    }

    #[test]
    fn no_rules_is_identity() {
        assert_eq!(redact_text("keep me", &[]), "keep me");
    }

    #[test]
    fn invalid_pattern_skipped() {
        let rules = rules(&[("[bad", "[X]"), ("ok", "[OK]")]);
        assert_eq!(rules.len(), 1);
        assert_eq!(redact_text("ok then", &rules), "[OK] then");
    }
}
