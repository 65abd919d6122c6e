//! One batch of units against the model, with reconciliation.
//!
//! The model is asked for every pending key; whatever valid strings come back are kept and only
//! the keys still missing are asked for again, up to `max_attempts` requests per batch.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::TranslateError;
use crate::ir::TranslationUnit;
use crate::models::{ChatMessage, ChatModel};
use crate::pipeline::fewshot::FewShotExample;
use crate::pipeline::prompts::{build_instructions, LanguagePair};
use crate::pipeline::trace::TraceWriter;
use crate::progress::Reporter;

/// Everything about a request that does not depend on the batch contents.
pub struct BatchContext<'a> {
    pub system_prompt: &'a str,
    pub glossary: &'a str,
    pub examples: &'a [FewShotExample],
    pub locale: &'a str,
    pub language_name: &'a str,
    pub langs: LanguagePair<'a>,
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_seconds: f64,
}

pub(crate) fn pause(seconds: f64) {
    if seconds <= 0.0 {
        return;
    }
    if let Ok(delay) = Duration::try_from_secs_f64(seconds) {
        std::thread::sleep(delay);
    }
}

/// Accepted protected translations, keyed by unit key.
pub type BatchResult = HashMap<String, String>;

pub fn make_messages(units: &[&TranslationUnit], ctx: &BatchContext<'_>) -> Vec<ChatMessage> {
    let payload = build_request_payload(units, ctx);
    vec![
        ChatMessage::system(ctx.system_prompt),
        ChatMessage::user(payload.to_string()),
    ]
}

pub fn build_request_payload(units: &[&TranslationUnit], ctx: &BatchContext<'_>) -> Value {
    let mut intent_summary = Map::new();
    for unit in units {
        let count = intent_summary
            .get(unit.intent.as_str())
            .and_then(Value::as_u64)
            .unwrap_or(0);
        intent_summary.insert(unit.intent.as_str().to_string(), Value::from(count + 1));
    }

    let batch: Vec<Value> = units
        .iter()
        .map(|unit| {
            let mut item = Map::new();
            item.insert("key".to_string(), Value::String(unit.key.clone()));
            item.insert("intent".to_string(), Value::String(unit.intent.to_string()));
            item.insert(
                ctx.langs.source_code.to_string(),
                Value::String(unit.source_protected.clone()),
            );
            if unit.has_reference() {
                item.insert(
                    ctx.langs.reference_code.to_string(),
                    Value::String(unit.reference_protected.clone()),
                );
            }
            if let Some(hint) = unit.hint.as_deref().filter(|h| !h.is_empty()) {
                item.insert(
                    "existing_translation".to_string(),
                    Value::String(hint.to_string()),
                );
            }
            Value::Object(item)
        })
        .collect();

    let with_reference = units.iter().any(|u| u.has_reference());
    let examples: Vec<Value> = ctx
        .examples
        .iter()
        .map(|ex| ex.to_payload(ctx.langs.source_code))
        .collect();

    let mut context = Map::new();
    context.insert("target_locale".to_string(), Value::String(ctx.locale.to_string()));
    context.insert(
        "target_language_name".to_string(),
        Value::String(ctx.language_name.to_string()),
    );
    context.insert("intent_summary".to_string(), Value::Object(intent_summary));
    context.insert("glossary".to_string(), Value::String(ctx.glossary.to_string()));
    context.insert("examples".to_string(), Value::Array(examples));
    context.insert("batch".to_string(), Value::Array(batch));
    context.insert(
        "instructions".to_string(),
        Value::String(build_instructions(ctx.language_name, &ctx.langs, with_reference)),
    );
    Value::Object(context)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn sorted_keys(units: &[&TranslationUnit]) -> Vec<String> {
    let mut keys: Vec<String> = units.iter().map(|u| u.key.clone()).collect();
    keys.sort();
    keys
}

/// Runs the reconciliation loop for one batch.
///
/// Returns a map covering every unit key. Once `max_attempts` requests have been spent the error
/// names the keys still missing: `Unresolved` after incomplete answers, `BatchFailed` when the
/// last attempt itself failed. Fatal model errors end the batch immediately.
pub fn translate_batch<M: ChatModel + ?Sized>(
    model: &mut M,
    units: &[TranslationUnit],
    ctx: &BatchContext<'_>,
    policy: RetryPolicy,
    reporter: &dyn Reporter,
    trace: &TraceWriter,
    batch_index: usize,
) -> Result<BatchResult, TranslateError> {
    let mut pending: Vec<&TranslationUnit> = units.iter().collect();
    let mut collected = BatchResult::new();
    let mut attempt: u32 = 0;

    while !pending.is_empty() {
        attempt += 1;
        if attempt > policy.max_attempts {
            return Err(TranslateError::Unresolved(sorted_keys(&pending)));
        }
        reporter.debug(&format!(
            "Batch {batch_index} attempt {attempt}/{}, {} keys pending",
            policy.max_attempts,
            pending.len()
        ));

        let messages = make_messages(&pending, ctx);
        if trace.is_enabled() {
            let text = serde_json::to_string_pretty(&messages).unwrap_or_default();
            if let Err(e) = trace.write_batch_text(batch_index, attempt, "request", &text) {
                reporter.warn(&format!("{e:#}"));
            }
        }

        let response = match model.complete(&messages) {
            Ok(v) => v,
            Err(e) if e.is_transient() => {
                reporter.error(&format!("Error during batch translation: {e}"));
                if attempt < policy.max_attempts {
                    pause(policy.retry_delay_seconds);
                    continue;
                }
                return Err(TranslateError::BatchFailed {
                    keys: sorted_keys(&pending),
                    cause: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if trace.is_enabled() {
            let text = serde_json::to_string_pretty(&response).unwrap_or_default();
            if let Err(e) = trace.write_batch_text(batch_index, attempt, "response", &text) {
                reporter.warn(&format!("{e:#}"));
            }
        }

        let answers = match response {
            Value::Object(answers) => answers,
            other => {
                reporter.error(&format!(
                    "Model returned a non-object response: {}",
                    value_kind(&other)
                ));
                if attempt < policy.max_attempts {
                    pause(policy.retry_delay_seconds);
                    continue;
                }
                return Err(TranslateError::BatchFailed {
                    keys: sorted_keys(&pending),
                    cause: format!("invalid response after {attempt} attempts"),
                });
            }
        };

        let wanted: HashSet<&str> = pending.iter().map(|u| u.key.as_str()).collect();
        for (key, value) in answers {
            if !wanted.contains(key.as_str()) {
                reporter.debug(&format!("Model returned unexpected key: {key}"));
                continue;
            }
            match value {
                Value::String(text) => {
                    collected.insert(key, text);
                }
                other => reporter.warn(&format!(
                    "Model returned non-string value for {key}: {}",
                    value_kind(&other)
                )),
            }
        }
        pending.retain(|u| !collected.contains_key(&u.key));

        if !pending.is_empty() && attempt < policy.max_attempts {
            reporter.debug(&format!(
                "Still missing {} translations, retrying...",
                pending.len()
            ));
            pause(policy.retry_delay_seconds);
        }
    }

    Ok(collected)
}
