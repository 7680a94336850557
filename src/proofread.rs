//! Proofreader (§4.3): a second LLM pass over a fully translated `Project`
//! that polishes translations for consistency, windowed so long transcripts
//! don't blow a single context budget. Parsing mirrors batched translation
//! (`translate::batch`) via the shared "N: text" parser; corrections are
//! written back by index, with the original translation kept (and logged)
//! for any index the LLM didn't return.

use crate::error::{Result, SubgenError};
use crate::llm::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::progress::{ProgressCallback, ProgressStage};
use crate::project::Project;

#[derive(Debug, Clone)]
pub struct ProofreadConfig {
    pub window_size: usize,
    pub context_chars: usize,
}

impl Default for ProofreadConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            context_chars: 15_000,
        }
    }
}

fn build_messages(rules_text: &str, context: &str, window: &[(&str, &str)]) -> Vec<ChatMessage> {
    let mut system = format!(
        "You are proofreading subtitle translations for consistency of names, terms and tone. \
         Reply with exactly one corrected translation per input, in the form \"N: text\", in \
         order, with nothing else.\n\n{rules_text}"
    );
    if !context.is_empty() {
        system.push_str("\n\nPreviously finalized pairs, for consistency:\n");
        system.push_str(context);
    }

    let user = window
        .iter()
        .enumerate()
        .map(|(i, (source, translated))| format!("{}: [{source}] {translated}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

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

/// Proofread every translated segment in `project`, replacing each
/// `segment.translated` with the corrected text. Sets `is_proofread = true`
/// only once every window has been processed; a failure midway leaves the
/// project untouched by the failing window's corrections but correct and
/// still internally consistent (earlier windows already applied stand).
pub async fn proofread_project(
    project: &mut Project,
    llm: &dyn LlmClient,
    rules_text: &str,
    config: &ProofreadConfig,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    if !project.state.is_translated {
        return Err(SubgenError::InvalidProject(
            "proofreading requires a translated project".to_string(),
        ));
    }

    let total = project.segments.len() as u64;
    let mut completed: u64 = 0;
    let mut rolling_context = String::new();

    for window_start in (0..project.segments.len()).step_by(config.window_size.max(1)) {
        let window_end = (window_start + config.window_size).min(project.segments.len());

        let pairs: Vec<(&str, &str)> = project.segments[window_start..window_end]
            .iter()
            .map(|s| (s.text.as_str(), s.translated.as_deref().unwrap_or("")))
            .collect();

        let messages = build_messages(rules_text, &rolling_context, &pairs);
        let response = llm.chat(&messages, &ChatParams::default()).await?;
        let parsed = crate::llm::response::parse_numbered_lines(&response, pairs.len());

        for (i, maybe) in parsed.into_iter().enumerate() {
            let idx = window_start + i;
            match maybe {
                Some(corrected) => project.segments[idx].translated = Some(corrected),
                None => {
                    tracing::warn!(
                        "proofreading returned no correction for segment {idx}, keeping original"
                    );
                }
            }
        }

        for seg in &project.segments[window_start..window_end] {
            let pair = format!(
                "{} | {}\n",
                seg.text,
                seg.translated.as_deref().unwrap_or("")
            );
            rolling_context.push_str(&pair);
        }
        if rolling_context.len() > config.context_chars {
            let excess = rolling_context.len() - config.context_chars;
            let cut = rolling_context
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| i >= excess)
                .unwrap_or(rolling_context.len());
            rolling_context.drain(..cut);
        }

        completed += (window_end - window_start) as u64;
        if let Some(cb) = &progress {
            cb(ProgressStage::Proofreading, completed, total);
        }
    }

    project.state.is_proofread = true;
    project.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Segment;
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

    fn translated_project() -> Project {
        let mut project = Project::new("clip.mp4", now());
        let mut seg1 = Segment::new(0.0, 1.0, "Hello", vec![]).unwrap();
        seg1.translated = Some("Hola".to_string());
        let mut seg2 = Segment::new(1.0, 2.0, "World", vec![]).unwrap();
        seg2.translated = Some("Mundo".to_string());
        project.segments = vec![seg1, seg2];
        project.state.is_transcribed = true;
        project.state.is_translated = true;
        project
    }

    #[tokio::test]
    async fn test_proofread_rewrites_translations_and_sets_state() {
        let mut project = translated_project();
        let llm = FakeLlm {
            responses: Mutex::new(vec!["1: Hola!\n2: Mundo!".to_string()]),
        };
        proofread_project(&mut project, &llm, "", &ProofreadConfig::default(), None)
            .await
            .unwrap();
        assert!(project.state.is_proofread);
        assert_eq!(project.segments[0].translated.as_deref(), Some("Hola!"));
        assert_eq!(project.segments[1].translated.as_deref(), Some("Mundo!"));
    }

    #[tokio::test]
    async fn test_missing_correction_keeps_original() {
        let mut project = translated_project();
        let llm = FakeLlm {
            responses: Mutex::new(vec!["1: Hola!".to_string()]),
        };
        proofread_project(&mut project, &llm, "", &ProofreadConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(project.segments[0].translated.as_deref(), Some("Hola!"));
        assert_eq!(project.segments[1].translated.as_deref(), Some("Mundo"));
    }

    #[tokio::test]
    async fn test_rejects_untranslated_project() {
        let mut project = Project::new("clip.mp4", now());
        let llm = FakeLlm {
            responses: Mutex::new(vec![]),
        };
        let result =
            proofread_project(&mut project, &llm, "", &ProofreadConfig::default(), None).await;
        assert!(result.is_err());
    }
}
