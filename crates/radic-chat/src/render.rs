//! Message Renderer
//!
//! Turns cleaned answer text into display segments in one left-to-right scan.
//! This is deliberately not a markdown engine: emphasis/code delimiters are
//! dropped, newlines become explicit breaks, and `http(s)://` tokens become links.

use serde::{Deserialize, Serialize};
use url::Url;

/// Longest link label shown before it is cut and suffixed with [`ELLIPSIS`].
pub const MAX_LABEL_CHARS: usize = 40;
pub const ELLIPSIS: &str = "...";

/// Delimiters removed outside links, longest first.
const EMPHASIS_DELIMITERS: [&str; 4] = ["**", "__", "*", "`"];

const URL_SCHEMES: [&str; 2] = ["https://", "http://"];

/// Characters that end a sentence rather than a URL.
const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '*', '`'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderSegment {
    Text { text: String },
    LineBreak,
    Link { url: String, label: String },
}

impl RenderSegment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn link(url: impl Into<String>) -> Self {
        let url = url.into();
        let label = link_label(&url);
        Self::Link { url, label }
    }
}

/// Split `text` into ordered display segments. Empty input yields no segments.
pub fn render(text: &str) -> Vec<RenderSegment> {
    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if let Some(len) = url_len(rest) {
            flush_text(&mut pending, &mut segments);
            segments.push(RenderSegment::link(&rest[..len]));
            rest = &rest[len..];
            continue;
        }

        match ch {
            '\r' if rest[1..].starts_with('\n') => {
                rest = &rest[1..];
                continue;
            }
            '\n' | '\r' => {
                flush_text(&mut pending, &mut segments);
                segments.push(RenderSegment::LineBreak);
                rest = &rest[1..];
                continue;
            }
            _ => {}
        }

        if let Some(delimiter) = EMPHASIS_DELIMITERS.iter().find(|d| rest.starts_with(*d)) {
            rest = &rest[delimiter.len()..];
            continue;
        }

        pending.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush_text(&mut pending, &mut segments);
    segments
}

fn flush_text(pending: &mut String, segments: &mut Vec<RenderSegment>) {
    if !pending.is_empty() {
        segments.push(RenderSegment::Text { text: std::mem::take(pending) });
    }
}

/// Byte length of the URL starting at the head of `rest`, if there is one.
fn url_len(rest: &str) -> Option<usize> {
    let scheme = URL_SCHEMES
        .iter()
        .find(|scheme| rest.get(..scheme.len()).is_some_and(|head| head.eq_ignore_ascii_case(scheme)))?;

    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .unwrap_or(rest.len());
    let candidate = rest[..end].trim_end_matches(URL_TRAILING_PUNCTUATION);

    (candidate.len() > scheme.len()).then_some(candidate.len())
}

/// Short human label for a link: host + path, no scheme, no leading `www.`.
/// Unparseable URLs fall back to the raw string.
pub fn link_label(raw: &str) -> String {
    let parsed = Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|host| (host.to_string(), url.path().to_string())));

    match parsed {
        Some((host, path)) => {
            let host = host.strip_prefix("www.").unwrap_or(&host);
            if path == "/" {
                truncate_label(host)
            } else {
                truncate_label(&format!("{}{}", host, path))
            }
        }
        None => truncate_label(raw),
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS).collect();
    short.push_str(ELLIPSIS);
    short
}
