//! Annotation Stripper
//!
//! Annotation indices are Unicode scalar offsets into the text block they came
//! with. Every span is resolved against that original text in one builder pass,
//! so deleting one span can never shift another; callers may pass spans in any
//! order. Overlapping spans remove their union.

use crate::assistant::Annotation;

/// Remove every annotated span from `text`.
pub fn strip_annotations(text: &str, annotations: &[Annotation]) -> String {
    if annotations.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<(usize, usize)> = annotations
        .iter()
        .filter_map(|a| {
            let start = a.start_index.min(len);
            let end = a.end_index.min(len);
            if end <= start {
                tracing::debug!(start = a.start_index, end = a.end_index, len, "Ignoring empty or inverted annotation span");
                None
            } else {
                Some((start, end))
            }
        })
        .collect();
    spans.sort_unstable_by_key(|&(start, _)| start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in spans {
        if start > cursor {
            out.extend(&chars[cursor..start]);
        }
        cursor = cursor.max(end);
    }
    if cursor < len {
        out.extend(&chars[cursor..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spans(pairs: &[(usize, usize)]) -> Vec<Annotation> {
        pairs.iter().map(|&(s, e)| Annotation::span(s, e)).collect()
    }

    /// Splice spans out one at a time, highest start first.
    fn splice_descending(text: &str, pairs: &[(usize, usize)]) -> String {
        let mut sorted = pairs.to_vec();
        sorted.sort_by(|a, b| b.0.cmp(&a.0));
        let mut chars: Vec<char> = text.chars().collect();
        for (start, end) in sorted {
            chars.drain(start..end);
        }
        chars.into_iter().collect()
    }

    #[test]
    fn no_annotations_is_identity() {
        assert_eq!(strip_annotations("plain answer", &[]), "plain answer");
        assert_eq!(strip_annotations("", &[]), "");
    }

    #[test]
    fn removes_inline_citation_marker() {
        let text = "Fees are 10000【4:0†source】.";
        assert_eq!(strip_annotations(text, &spans(&[(14, 26)])), "Fees are 10000.");
    }

    #[test]
    fn input_order_does_not_matter() {
        let text = "A【1】B【2】C";
        let ascending = strip_annotations(text, &spans(&[(1, 4), (5, 8)]));
        let descending = strip_annotations(text, &spans(&[(5, 8), (1, 4)]));
        assert_eq!(ascending, "ABC");
        assert_eq!(descending, "ABC");
    }

    #[test]
    fn ascending_splicing_would_corrupt() {
        let text = "A【1】B【2】C";
        let mut chars: Vec<char> = text.chars().collect();
        chars.drain(1..4);
        chars.drain(5..8.min(chars.len()));
        let naive: String = chars.into_iter().collect();
        assert_ne!(naive, "ABC");
        assert_eq!(strip_annotations(text, &spans(&[(1, 4), (5, 8)])), "ABC");
    }

    #[test]
    fn indices_count_characters_not_bytes() {
        let text = "é【1】ü";
        assert_eq!(strip_annotations(text, &spans(&[(1, 4)])), "éü");
    }

    #[test]
    fn out_of_range_and_inverted_spans() {
        assert_eq!(strip_annotations("abcdef", &spans(&[(4, 100)])), "abcd");
        assert_eq!(strip_annotations("abcdef", &spans(&[(50, 60)])), "abcdef");
        assert_eq!(strip_annotations("abcdef", &spans(&[(4, 2)])), "abcdef");
    }

    #[test]
    fn overlapping_spans_remove_union() {
        assert_eq!(strip_annotations("0123456789", &spans(&[(2, 6), (4, 8)])), "0189");
    }

    fn text_and_spans() -> impl Strategy<Value = (String, Vec<(usize, usize)>)> {
        (
            prop::collection::vec(prop_oneof![any::<char>(), Just('【'), Just('a')], 0..48),
            prop::collection::vec(0usize..48, 0..12),
        )
            .prop_map(|(chars, mut cuts)| {
                let len = chars.len();
                cuts.iter_mut().for_each(|c| *c = (*c).min(len));
                cuts.sort_unstable();
                cuts.dedup();
                let pairs: Vec<(usize, usize)> = cuts.chunks_exact(2).map(|p| (p[0], p[1])).collect();
                let text: String = chars.into_iter().collect();
                (text, pairs)
            })
    }

    proptest! {
        #[test]
        fn keeps_exactly_the_characters_outside_spans((text, pairs) in text_and_spans()) {
            let mut shuffled = pairs.clone();
            shuffled.reverse();
            let stripped = strip_annotations(&text, &spans(&shuffled));

            let removed: usize = pairs.iter().map(|(s, e)| e - s).sum();
            prop_assert_eq!(stripped.chars().count(), text.chars().count() - removed);

            let expected: String = text
                .chars()
                .enumerate()
                .filter(|(i, _)| !pairs.iter().any(|(s, e)| (*s..*e).contains(i)))
                .map(|(_, c)| c)
                .collect();
            prop_assert_eq!(&stripped, &expected);
            prop_assert_eq!(stripped, splice_descending(&text, &pairs));
        }
    }
}
