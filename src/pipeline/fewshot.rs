use std::path::Path;

use serde_json::{Map, Value};

use crate::error::TranslateError;
use crate::intent::{infer_intent, Intent};
use crate::structure::{get_value, parse_key};

/// One worked example shown to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FewShotExample {
    pub key: String,
    pub intent: Intent,
    pub source: String,
    pub target: String,
}

impl FewShotExample {
    /// `{"key", "intent", <source_lang>, "target"}` as sent to the model.
    pub fn to_payload(&self, source_lang: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("key".to_string(), Value::String(self.key.clone()));
        obj.insert("intent".to_string(), Value::String(self.intent.to_string()));
        obj.insert(source_lang.to_string(), Value::String(self.source.clone()));
        obj.insert("target".to_string(), Value::String(self.target.clone()));
        Value::Object(obj)
    }
}

pub struct FewShotContext<'a> {
    pub locale: &'a str,
    pub language_name: &'a str,
    pub source_lang: &'a str,
    pub reference_lang: &'a str,
    /// Top-level source catalog, used when an entry carries only the target text.
    pub source: &'a Value,
}

/// Reads few-shot examples. A missing file yields no examples.
pub fn load_fewshot(
    path: &Path,
    ctx: &FewShotContext<'_>,
) -> Result<Vec<FewShotExample>, TranslateError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| TranslateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&text).map_err(|e| TranslateError::FewShot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_fewshot(&raw, ctx).map_err(|message| TranslateError::FewShot {
        path: path.to_path_buf(),
        message,
    })
}

/// Accepts a list of entries, or a mapping keyed by locale whose value is such a block.
/// A block is a list or a `key -> payload` mapping. Entries without usable text are dropped.
pub fn parse_fewshot(
    raw: &Value,
    ctx: &FewShotContext<'_>,
) -> Result<Vec<FewShotExample>, String> {
    let block = match raw {
        Value::Object(by_locale) => match by_locale.get(ctx.locale) {
            Some(b) => b,
            None => return Ok(Vec::new()),
        },
        Value::Array(_) => raw,
        _ => return Err("few-shot payload must be a mapping or a list".to_string()),
    };

    let entries: Vec<(String, Option<&str>, &Value)> = match block {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), Some(k.as_str()), v))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), None, v))
            .collect(),
        _ => return Ok(Vec::new()),
    };

    let mut examples = Vec::new();
    for (position, named_key, payload) in entries {
        let (key, source, target) = match payload {
            Value::Object(fields) => {
                let key = named_key
                    .map(str::to_string)
                    .or_else(|| non_empty(fields, "key").map(str::to_string))
                    .unwrap_or(position);
                let source = non_empty(fields, ctx.source_lang)
                    .or_else(|| non_empty(fields, "source"))
                    .map(str::to_string)
                    .or_else(|| lookup_source(ctx.source, &key));
                let target = non_empty(fields, ctx.locale)
                    .or_else(|| non_empty(fields, &ctx.language_name.to_lowercase()))
                    .or_else(|| non_empty(fields, ctx.reference_lang))
                    .or_else(|| non_empty(fields, "target"))
                    .map(str::to_string);
                (key, source, target)
            }
            Value::String(target) => {
                let Some(key) = named_key else { continue };
                (
                    key.to_string(),
                    lookup_source(ctx.source, key),
                    Some(target.clone()),
                )
            }
            _ => continue,
        };
        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };
        examples.push(FewShotExample {
            intent: infer_intent(&key, &source),
            key,
            source,
            target,
        });
    }
    Ok(examples)
}

fn non_empty<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Flat top-level key first, then the canonical nested path (`auth.login.title`).
fn lookup_source(source: &Value, key: &str) -> Option<String> {
    source
        .get(key)
        .or_else(|| parse_key(key).and_then(|path| get_value(source, &path)))
        .and_then(Value::as_str)
        .map(str::to_string)
}
