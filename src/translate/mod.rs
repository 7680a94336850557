//! Sentence-Aware Translator (§4.2): groups transcript segments into
//! sentence-sized units, translates them in batches with rolling context,
//! then redistributes each group's translation back across its source
//! words. `SentenceTranslator` is the single entry point the pipeline calls.

pub mod batch;
pub mod grouping;
pub mod redistribute;
pub mod rules;

use crate::error::Result;
use crate::llm::LlmClient;
use crate::progress::ProgressCallback;
use crate::project::{Project, Segment};
use batch::BatchConfig;
use grouping::GroupingConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub grouping: GroupingConfig,
    pub batch: BatchConfig,
    pub rules_dir: PathBuf,
}

/// Composes grouping, batched translation, rules loading and word-aligned
/// redistribution behind one call that takes a transcribed `Project` and
/// returns its segments re-split and translated.
pub struct SentenceTranslator<'a> {
    llm: &'a dyn LlmClient,
    config: TranslatorConfig,
}

impl<'a> SentenceTranslator<'a> {
    pub fn new(llm: &'a dyn LlmClient, config: TranslatorConfig) -> Self {
        Self { llm, config }
    }

    /// Translate every segment in `project` to `target_lang`, replacing
    /// `project.segments` with the redistributed, translated result.
    pub async fn translate_project(
        &self,
        project: &mut Project,
        target_lang: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let groups = grouping::group_segments(&project.segments, &self.config.grouping);
        let rules_text = rules::load_rules(&self.config.rules_dir, target_lang)?;

        let translations = batch::translate_groups(
            &groups,
            self.llm,
            &rules_text,
            target_lang,
            &self.config.batch,
            progress,
        )
        .await?;

        let mut segments: Vec<Segment> = Vec::new();
        for (group, translated) in groups.iter().zip(translations.iter()) {
            let mut redistributed =
                redistribute::redistribute_group(group, translated, self.llm).await?;
            segments.append(&mut redistributed);
        }

        project.segments = segments;
        project.metadata.target_lang = Some(target_lang.to_string());
        project.state.is_translated = true;
        project.state.is_proofread = false;
        project.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatParams};
    use crate::project::Word;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeLlm {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn chat(&self, _messages: &[ChatMessage], _params: &ChatParams) -> Result<String> {
            Ok(self.responses.lock().unwrap().remove(0))
        }
        fn name(&self) -> &'static str {
            "fake"
        }
        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[tokio::test]
    async fn test_translate_project_marks_state_and_covers_words() {
        let words = vec![
            Word::new("Hello", 0.0, 0.3).unwrap(),
            Word::new("world", 0.3, 0.6).unwrap(),
        ];
        let mut project = Project::new("clip.mp4", now());
        project
            .segments
            .push(Segment::new(0.0, 0.6, "Hello world", words).unwrap());
        project.state.is_transcribed = true;

        let llm = FakeLlm {
            responses: Mutex::new(vec![
                "1: Hola mundo".to_string(), // batch translation
                "2: Hola mundo".to_string(), // redistribution: no split, whole group
            ]),
        };

        let dir = tempfile::tempdir().unwrap();
        let translator = SentenceTranslator::new(
            &llm,
            TranslatorConfig {
                grouping: GroupingConfig::default(),
                batch: BatchConfig::default(),
                rules_dir: dir.path().to_path_buf(),
            },
        );

        translator
            .translate_project(&mut project, "es", None)
            .await
            .unwrap();

        assert!(project.state.is_translated);
        let total_words: usize = project.segments.iter().map(|s| s.words.len()).sum();
        assert_eq!(total_words, 2);
    }
}
