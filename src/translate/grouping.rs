//! Sentence grouping (§4.2.1): partition contiguous transcript Segments into
//! Groups that approximate complete sentences, so the translator gets
//! linguistic context instead of acoustic fragments.

use crate::project::{Segment, Word};

#[derive(Debug, Clone)]
pub struct GroupingConfig {
    pub max_gap_sec: f64,
    pub max_group_size: usize,
    pub max_chars: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_gap_sec: 1.5,
            max_group_size: 10,
            max_chars: 400,
        }
    }
}

const TERMINAL_PUNCTUATION: &[char] = &['.', '?', '!', '。', '？', '！', '…'];

/// A contiguous run of segments treated as one sentence for translation.
#[derive(Debug, Clone)]
pub struct Group {
    /// Inclusive `[first, last]` indices into the original segment slice.
    pub segment_range: (usize, usize),
    pub text: String,
    pub words: Vec<Word>,
    pub start_sec: f64,
    pub end_sec: f64,
}

fn ends_with_terminal_punctuation(text: &str) -> bool {
    text.trim_end().ends_with(TERMINAL_PUNCTUATION)
}

/// Group segments greedily left-to-right per the rules in §4.2.1. Every
/// segment belongs to exactly one group; group boundaries partition the
/// sequence (Testable Property 2 depends on this holding for word coverage
/// too, since groups are the unit the redistribution step operates on).
pub fn group_segments(segments: &[Segment], config: &GroupingConfig) -> Vec<Group> {
    let mut groups = Vec::new();
    if segments.is_empty() {
        return groups;
    }

    let mut start = 0;
    while start < segments.len() {
        let mut end = start;
        loop {
            let candidate_ends_sentence = ends_with_terminal_punctuation(&segments[end].text);
            let group_size = end - start + 1;
            let char_count: usize = segments[start..=end].iter().map(|s| s.text.len()).sum();

            let can_extend = !candidate_ends_sentence
                && end + 1 < segments.len()
                && group_size < config.max_group_size
                && char_count < config.max_chars
                && (segments[end + 1].start_sec - segments[end].end_sec) <= config.max_gap_sec;

            if can_extend {
                end += 1;
            } else {
                break;
            }
        }

        groups.push(build_group(segments, start, end));
        start = end + 1;
    }

    groups
}

fn build_group(segments: &[Segment], start: usize, end: usize) -> Group {
    let slice = &segments[start..=end];
    let text = slice
        .iter()
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let words = slice.iter().flat_map(|s| s.words.clone()).collect();
    Group {
        segment_range: (start, end),
        text,
        words,
        start_sec: slice.first().unwrap().start_sec,
        end_sec: slice.last().unwrap().end_sec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Segment;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, text, vec![]).unwrap()
    }

    #[test]
    fn test_splits_on_terminal_punctuation() {
        let segments = vec![seg(0.0, 1.2, "Hello."), seg(1.3, 2.0, "How are you?")];
        let groups = group_segments(&segments, &GroupingConfig::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].segment_range, (0, 0));
        assert_eq!(groups[1].segment_range, (1, 1));
    }

    #[test]
    fn test_merges_fragments_without_terminal_punctuation() {
        // E1: "How are" + "you?" share no terminal punctuation until the end.
        let segments = vec![seg(1.3, 2.4, "How are"), seg(2.4, 2.9, "you?")];
        let groups = group_segments(&segments, &GroupingConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].segment_range, (0, 1));
        assert_eq!(groups[0].text, "How are you?");
    }

    #[test]
    fn test_splits_on_large_gap() {
        let segments = vec![seg(0.0, 1.0, "Hello"), seg(5.0, 6.0, "world")];
        let config = GroupingConfig::default();
        let groups = group_segments(&segments, &config);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_splits_on_max_group_size() {
        let segments: Vec<Segment> = (0..5)
            .map(|i| seg(i as f64, i as f64 + 0.5, "word"))
            .collect();
        let config = GroupingConfig {
            max_group_size: 2,
            ..GroupingConfig::default()
        };
        let groups = group_segments(&segments, &config);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].segment_range, (0, 1));
        assert_eq!(groups[1].segment_range, (2, 3));
        assert_eq!(groups[2].segment_range, (4, 4));
    }

    #[test]
    fn test_every_segment_covered_exactly_once() {
        let segments = vec![
            seg(0.0, 1.0, "a"),
            seg(1.0, 2.0, "b."),
            seg(2.0, 3.0, "c"),
            seg(3.0, 4.0, "d!"),
        ];
        let groups = group_segments(&segments, &GroupingConfig::default());
        let mut covered = Vec::new();
        for g in &groups {
            for i in g.segment_range.0..=g.segment_range.1 {
                covered.push(i);
            }
        }
        assert_eq!(covered, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        assert!(group_segments(&[], &GroupingConfig::default()).is_empty());
    }
}
