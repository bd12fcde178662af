//! Citation Pattern Cleaner
//!
//! Removes citation markup the assistant left in the text without a structured
//! annotation. The rules are data: an ordered table applied front to back and
//! repeated until a full pass changes nothing, then whitespace is collapsed.
//! Every rule deletes at least one character per match, so the loop terminates,
//! and the result is a fixpoint, so cleaning twice equals cleaning once.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// One named `(pattern, replacement)` rule.
pub struct CitationRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl CitationRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("citation rule regex is valid"),
            replacement,
        }
    }
}

// Pre-compiled rules, compiled once, reused on every call.
static DEFAULT_RULES: LazyLock<Vec<CitationRule>> = LazyLock::new(|| {
    vec![
        // 【4:0†source】
        CitationRule::new("lenticular_source", r"【\d+:\d+†source】", ""),
        // anything else inside the same brackets
        CitationRule::new("lenticular_any", r"【[^】]*】", ""),
        // [1]
        CitationRule::new("numeric", r"\[\d+\]", ""),
        // [citation:2]
        CitationRule::new("citation_tag", r"\[citation:\d+\]", ""),
        // [3:1†label]
        CitationRule::new("numeric_pair_label", r"\[\d+:\d+†[^\]]+\]", ""),
        // escaped-codepoint spelling of the first rule
        CitationRule::new("lenticular_escaped", r"\x{3010}\d+:\d+\x{2020}[^\x{3011}]+\x{3011}", ""),
        // [ 3 : 1 anything ]
        CitationRule::new("loose_numeric_pair", r"\[\s*\d+\s*:\s*\d+\s*[^\]]*\]", ""),
    ]
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Ordered citation rule table.
pub struct CitationCleaner {
    rules: &'static [CitationRule],
}

impl Default for CitationCleaner {
    fn default() -> Self {
        Self { rules: DEFAULT_RULES.as_slice() }
    }
}

impl CitationCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[CitationRule] {
        self.rules
    }

    pub fn clean(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let mut changed = false;
            for rule in self.rules {
                let replaced = match rule.pattern.replace_all(&current, rule.replacement) {
                    Cow::Owned(replaced) => Some(replaced),
                    Cow::Borrowed(_) => None,
                };
                if let Some(replaced) = replaced {
                    tracing::trace!(rule = rule.name, "Citation rule matched");
                    current = replaced;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        WHITESPACE_RE.replace_all(&current, " ").trim().to_string()
    }
}

/// Clean `text` with the default rule table.
pub fn clean_citations(text: &str) -> String {
    CitationCleaner::default().clean(text)
}
