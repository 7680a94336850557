//! Word-aligned redistribution (§4.2.3): splits a group's translated text
//! back across the source words it covers, so downstream subtitle cues keep
//! the original timing grain instead of collapsing to one cue per group.
//!
//! The LLM is asked to mark, for each translated fragment, the index of the
//! last source word it covers. Those indices must be strictly increasing and
//! no greater than the word count; any violation falls back to a single
//! segment spanning the whole group. Any source words left uncovered by the
//! last fragment are appended as a trailing segment — the coverage
//! guarantee holds regardless of what the LLM actually returns.

use super::grouping::Group;
use crate::error::Result;
use crate::llm::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::project::{Segment, Word};

fn build_messages(group: &Group, translated_text: &str) -> Vec<ChatMessage> {
    let numbered_words = group
        .words
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{}: {}", i + 1, w.text))
        .collect::<Vec<_>>()
        .join(" ");

    let system = "Split the translated text into fragments aligned to the numbered source \
        words below. Reply with one line per fragment, in order, in the form \
        \"N: fragment text\", where N is the index of the LAST source word that fragment \
        covers. N must strictly increase and the final N must equal the total word count. \
        Reply with nothing else."
        .to_string();

    let user = format!(
        "Source words:\n{numbered_words}\n\nTranslated text:\n{translated_text}"
    );

    vec![
        ChatMessage {
            role: ChatRole::System,
            content: system,
        },
        ChatMessage {
            role: ChatRole::User,
            content: user,
        },
    ]
}

fn validate_fragments(pairs: &[(usize, String)], word_count: usize) -> bool {
    if pairs.is_empty() {
        return false;
    }
    let mut last = 0;
    for (j, _) in pairs {
        if *j <= last || *j > word_count {
            return false;
        }
        last = *j;
    }
    true
}

fn span_of(words: &[Word], group: &Group) -> (f64, f64) {
    match (words.first(), words.last()) {
        (Some(first), Some(last)) => (first.start_sec, last.end_sec),
        _ => (group.start_sec, group.end_sec),
    }
}

fn source_text_of(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn whole_group_fallback(group: &Group, translated_text: &str) -> Result<Vec<Segment>> {
    let mut segment = Segment::new(
        group.start_sec,
        group.end_sec,
        group.text.clone(),
        group.words.clone(),
    )?;
    segment.translated = Some(translated_text.to_string());
    Ok(vec![segment])
}

/// Redistribute one group's translation across its source words, returning
/// one `Segment` per fragment (plus a trailing coverage segment if the LLM
/// left words uncovered).
pub async fn redistribute_group(
    group: &Group,
    translated_text: &str,
    llm: &dyn LlmClient,
) -> Result<Vec<Segment>> {
    let word_count = group.words.len();
    if word_count == 0 {
        return whole_group_fallback(group, translated_text);
    }

    let messages = build_messages(group, translated_text);
    let response = match llm.chat(&messages, &ChatParams::default()).await {
        Ok(text) => text,
        Err(_) => return whole_group_fallback(group, translated_text),
    };

    let pairs = crate::llm::response::parse_indexed_pairs(&response);
    if !validate_fragments(&pairs, word_count) {
        return whole_group_fallback(group, translated_text);
    }

    let mut segments = Vec::with_capacity(pairs.len() + 1);
    let mut prev_j = 0usize;
    let mut search_from = 0usize;

    for (j, fragment_text) in &pairs {
        let words = &group.words[prev_j..*j];
        let (start_sec, end_sec) = span_of(words, group);
        let mut segment = Segment::new(start_sec, end_sec, source_text_of(words), words.to_vec())?;
        segment.translated = Some(fragment_text.clone());
        segments.push(segment);

        if let Some(pos) = translated_text[search_from..].find(fragment_text.as_str()) {
            search_from += pos + fragment_text.len();
        }
        prev_j = *j;
    }

    if prev_j < word_count {
        let words = &group.words[prev_j..word_count];
        let (start_sec, end_sec) = span_of(words, group);
        let remainder = translated_text
            .get(search_from..)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| translated_text.to_string());
        let mut segment =
            Segment::new(start_sec, end_sec, source_text_of(words), words.to_vec())?;
        segment.translated = Some(remainder);
        segments.push(segment);
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Segment as SourceSegment;
    use crate::translate::grouping::{group_segments, GroupingConfig};
    use async_trait::async_trait;

    struct FakeLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn chat(&self, _messages: &[ChatMessage], _params: &ChatParams) -> Result<String> {
            Ok(self.response.clone())
        }
        fn name(&self) -> &'static str {
            "fake"
        }
        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn five_word_group() -> Group {
        let words = vec![
            Word::new("Hola", 0.0, 0.3).unwrap(),
            Word::new("como", 0.3, 0.6).unwrap(),
            Word::new("estas", 0.6, 0.9).unwrap(),
            Word::new("mi", 0.9, 1.1).unwrap(),
            Word::new("amigo", 1.1, 1.4).unwrap(),
        ];
        let segment = SourceSegment::new(0.0, 1.4, "Hola como estas mi amigo", words).unwrap();
        group_segments(&[segment], &GroupingConfig::default())
            .into_iter()
            .next()
            .unwrap()
    }

    #[tokio::test]
    async fn test_splits_on_valid_word_aligned_response() {
        let group = five_word_group();
        let llm = FakeLlm {
            response: "3: Hi there\n5: my friend".to_string(),
        };
        let segments = redistribute_group(&group, "Hi there, my friend", &llm)
            .await
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].words.len(), 3);
        assert_eq!(segments[1].words.len(), 2);
        assert_eq!(segments[0].translated.as_deref(), Some("Hi there"));
    }

    #[tokio::test]
    async fn test_e6_trailing_words_appended_when_llm_undercovers() {
        // LLM only accounts for the first 3 of 5 words.
        let group = five_word_group();
        let llm = FakeLlm {
            response: "3: Hi there".to_string(),
        };
        let segments = redistribute_group(&group, "Hi there, my friend", &llm)
            .await
            .unwrap();
        let total_words: usize = segments.iter().map(|s| s.words.len()).sum();
        assert_eq!(total_words, 5);
        assert_eq!(segments.last().unwrap().words.len(), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_whole_group_on_non_increasing_indices() {
        let group = five_word_group();
        let llm = FakeLlm {
            response: "3: Hi there\n2: broken".to_string(),
        };
        let segments = redistribute_group(&group, "Hi there, my friend", &llm)
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].words.len(), 5);
    }

    #[tokio::test]
    async fn test_falls_back_to_whole_group_on_unparseable_response() {
        let group = five_word_group();
        let llm = FakeLlm {
            response: "nonsense response".to_string(),
        };
        let segments = redistribute_group(&group, "Hi there, my friend", &llm)
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].translated.as_deref(), Some("Hi there, my friend"));
    }
}
