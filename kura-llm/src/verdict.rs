//! Keyword extraction of a verdict from free-text model answers.
//!
//! Search-grounded generation cannot be forced into a schema, so the verdict
//! is recovered from prose. Markers are checked in a fixed order and the
//! first hit wins; text with no marker is `Unverified`. The plain lowercased
//! text is searched first, and markdown-normalized text only when that
//! finds nothing.

use crate::types::Verdict;

const RULES: &[(&[&str], Verdict)] = &[
    (&["verdict: true", "verdict: correct"], Verdict::True),
    (&["verdict: false", "verdict: incorrect"], Verdict::False),
    (&["verdict: misleading"], Verdict::Misleading),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FreeTextVerdictParser;

impl FreeTextVerdictParser {
    pub fn new() -> Self {
        Self
    }

    /// ```
    /// use kura_llm::types::Verdict;
    /// use kura_llm::verdict::FreeTextVerdictParser;
    ///
    /// let parser = FreeTextVerdictParser::new();
    /// assert_eq!(parser.parse("**Verdict:** False. No evidence found."), Verdict::False);
    /// assert_eq!(parser.parse("no markers here"), Verdict::Unverified);
    /// ```
    pub fn parse(&self, text: &str) -> Verdict {
        match_rules(&text.to_lowercase())
            .or_else(|| match_rules(&normalize(text)))
            .unwrap_or(Verdict::Unverified)
    }
}

fn match_rules(haystack: &str) -> Option<Verdict> {
    RULES
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| haystack.contains(m)))
        .map(|(_, verdict)| *verdict)
}

/// Lowercase, drop markdown emphasis, and collapse whitespace runs.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch == '*' || ch == '_' {
            continue;
        }
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}
