//! Batched LLM translation (§4.2.2): groups are translated `B` at a time
//! with a rolling window of `C` already-translated groups as context, plus
//! the rules text loaded for the target language. Missing tail lines are
//! retried up to `R` times before falling back to pass-through.

use super::grouping::Group;
use crate::error::Result;
use crate::llm::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::progress::{ProgressCallback, ProgressStage};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub context_groups: usize,
    pub max_retries: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            context_groups: 5,
            max_retries: 2,
        }
    }
}

fn build_messages(
    rules: &str,
    target_lang: &str,
    context: &[(String, String)],
    batch: &[Group],
) -> Vec<ChatMessage> {
    let mut system = format!(
        "You are a subtitle translator. Translate each numbered source line to {target_lang}. \
         Reply with exactly one line per input, in the form \"N: translated text\", in order, \
         with nothing else before or after.\n\n{rules}"
    );
    if !context.is_empty() {
        system.push_str("\n\nPreviously translated context, for consistent names/terms/tone:\n");
        for (source, target) in context {
            system.push_str(&format!("{source} | {target}\n"));
        }
    }

    let user = batch
        .iter()
        .enumerate()
        .map(|(i, g)| format!("{}: {}", i + 1, g.text))
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

/// Translate all groups in order, returning one translated string per group.
/// `progress` receives cumulative `(groups_completed, total_groups)` only,
/// per §4.2.4 — never a per-batch delta.
pub async fn translate_groups(
    groups: &[Group],
    llm: &dyn LlmClient,
    rules_text: &str,
    target_lang: &str,
    config: &BatchConfig,
    progress: Option<ProgressCallback>,
) -> Result<Vec<String>> {
    let mut results = Vec::with_capacity(groups.len());
    let mut context: Vec<(String, String)> = Vec::new();
    let total = groups.len() as u64;
    let mut completed: u64 = 0;

    for batch in groups.chunks(config.batch_size.max(1)) {
        let mut slots: Vec<Option<String>> = vec![None; batch.len()];
        let mut remaining_start = 0usize;

        for attempt in 0..=config.max_retries {
            let to_request = &batch[remaining_start..];
            if to_request.is_empty() {
                break;
            }

            let messages = build_messages(rules_text, target_lang, &context, to_request);
            let response = llm.chat(&messages, &ChatParams::default()).await?;
            let parsed = crate::llm::response::parse_numbered_lines(&response, to_request.len());

            for (i, maybe) in parsed.into_iter().enumerate() {
                if let Some(text) = maybe {
                    slots[remaining_start + i] = Some(text);
                }
            }

            match slots.iter().position(|s| s.is_none()) {
                None => break,
                Some(idx) => {
                    if attempt == config.max_retries {
                        break;
                    }
                    remaining_start = idx;
                }
            }
        }

        for (i, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() {
                tracing::warn!(
                    "translation missing for group after retries, using pass-through source text"
                );
                *slot = Some(batch[i].text.clone());
            }
        }

        for (group, translated) in batch.iter().zip(slots.into_iter()) {
            let translated = translated.expect("filled above");
            context.push((group.text.clone(), translated.clone()));
            if context.len() > config.context_groups {
                context.remove(0);
            }
            results.push(translated);
        }

        completed += batch.len() as u64;
        if let Some(cb) = &progress {
            cb(ProgressStage::Translating, completed, total);
        }
    }

    Ok(results)
}
