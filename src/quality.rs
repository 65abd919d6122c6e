use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::freezer::token_counts;
use crate::intent::{infer_intent, Intent};
use crate::structure::{get_value, iter_string_nodes, path_to_key};

pub const KEY_DIFF_LIMIT: usize = 20;
pub const TOKEN_DIFF_LIMIT: usize = 5;
pub const CTA_MAX_WORDS: usize = 4;
const CTA_TRAILING_PUNCT: [char; 4] = ['.', '?', ';', ','];
const TITLE_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Result of one validation pass: `ok` plus human-readable `[fail]`/`[warn]` lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub ok: bool,
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

fn string_keys(tree: &Value) -> BTreeSet<String> {
    iter_string_nodes(tree).map(|(p, _)| path_to_key(&p)).collect()
}

pub fn key_diff(src: &Value, dst: &Value) -> KeyDiff {
    let src_keys = string_keys(src);
    let dst_keys = string_keys(dst);
    KeyDiff {
        missing: src_keys.difference(&dst_keys).cloned().collect(),
        extra: dst_keys.difference(&src_keys).cloned().collect(),
    }
}

fn push_capped(messages: &mut Vec<String>, header: &str, keys: &[String]) {
    messages.push(header.to_string());
    for key in keys.iter().take(KEY_DIFF_LIMIT) {
        messages.push(format!("  - {key}"));
    }
    if keys.len() > KEY_DIFF_LIMIT {
        messages.push(format!("  …and {} more", keys.len() - KEY_DIFF_LIMIT));
    }
}

/// Key-set parity over string leaves.
pub fn check_keys(src: &Value, dst: &Value) -> CheckOutcome {
    let diff = key_diff(src, dst);
    let mut messages = Vec::new();
    if !diff.missing.is_empty() {
        push_capped(&mut messages, "[fail] Missing keys in target:", &diff.missing);
    }
    if !diff.extra.is_empty() {
        push_capped(&mut messages, "[fail] Unexpected extra keys in target:", &diff.extra);
    }
    CheckOutcome {
        ok: diff.is_empty(),
        messages,
    }
}

fn format_token_diffs(
    expected: &BTreeMap<String, usize>,
    actual: &BTreeMap<String, usize>,
) -> Vec<String> {
    let mut diffs = Vec::new();
    for (token, count) in expected {
        let got = actual.get(token).copied().unwrap_or(0);
        if *count > got {
            diffs.push(format!("missing {token} ×{}", count - got));
        }
    }
    for (token, count) in actual {
        let want = expected.get(token).copied().unwrap_or(0);
        if *count > want {
            diffs.push(format!("unexpected {token} ×{}", count - want));
        }
    }
    diffs.truncate(TOKEN_DIFF_LIMIT);
    diffs
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Placeholder multiset parity for every source string leaf.
pub fn check_tokens(src: &Value, dst: &Value) -> CheckOutcome {
    let mut out = CheckOutcome {
        ok: true,
        messages: Vec::new(),
    };
    for (path, expected_text) in iter_string_nodes(src) {
        let key = path_to_key(&path);
        let produced = get_value(dst, &path);
        let Some(Value::String(produced_text)) = produced else {
            out.messages.push(format!(
                "[fail] {key}: expected string translation, got {}",
                type_name(produced)
            ));
            out.ok = false;
            continue;
        };
        let expected = token_counts(expected_text);
        let actual = token_counts(produced_text);
        if expected != actual {
            let mut details = format_token_diffs(&expected, &actual).join(", ");
            if details.is_empty() {
                details = "token counts differ".to_string();
            }
            out.messages
                .push(format!("[fail] {key}: placeholder mismatch ({details})"));
            out.ok = false;
        }
    }
    out
}

/// Lightweight tone heuristics per intent. Missing or blank output fails; style issues warn.
pub fn check_intent_style(src: &Value, dst: &Value) -> CheckOutcome {
    let mut out = CheckOutcome {
        ok: true,
        messages: Vec::new(),
    };
    for (path, source_text) in iter_string_nodes(src) {
        let key = path_to_key(&path);
        let produced = get_value(dst, &path);
        let normalized = match produced {
            None | Some(Value::Null) => {
                out.messages.push(format!("[fail] {key}: translation missing"));
                out.ok = false;
                continue;
            }
            Some(Value::String(s)) => s.trim(),
            Some(other) => {
                out.messages.push(format!(
                    "[fail] {key}: translation is {}, expected string",
                    type_name(Some(other))
                ));
                out.ok = false;
                continue;
            }
        };
        if normalized.is_empty() {
            out.messages.push(format!("[fail] {key}: translation is empty"));
            out.ok = false;
            continue;
        }
        let intent = infer_intent(&key, source_text);
        out.messages.extend(intent_messages(intent, &key, normalized));
    }
    out
}

fn intent_messages(intent: Intent, key: &str, text: &str) -> Vec<String> {
    match intent {
        Intent::Button => validate_button(key, text),
        Intent::Title => validate_title(key, text),
        Intent::Error => validate_error(key, text),
        _ => Vec::new(),
    }
}

fn validate_button(key: &str, text: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let word_count = text.split_whitespace().count();
    if word_count > CTA_MAX_WORDS {
        issues.push(format!("[warn] {key}: CTA is {word_count} words → '{text}'"));
    }
    if text.ends_with(CTA_TRAILING_PUNCT) {
        issues.push(format!("[warn] {key}: CTA ends with punctuation → '{text}'"));
    }
    issues
}

fn validate_title(key: &str, text: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if text.chars().next().is_some_and(char::is_lowercase) {
        issues.push(format!("[warn] {key}: title starts with lowercase → '{text}'"));
    }
    if text.ends_with(TITLE_PUNCTUATION) {
        issues.push(format!(
            "[warn] {key}: title ends with sentence punctuation → '{text}'"
        ));
    }
    issues
}

fn validate_error(key: &str, text: &str) -> Vec<String> {
    if text.ends_with('!') {
        return vec![format!("[warn] {key}: error message ends with '!' → '{text}'")];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_identical_nested_and_arrays() {
        assert!(check_keys(&json!({"a": "v1", "b": "v2"}), &json!({"a": "t1", "b": "t2"})).ok);
        assert!(check_keys(&json!({"l1": {"l2": "v"}}), &json!({"l1": {"l2": "t"}})).ok);
        assert!(check_keys(&json!({"items": ["1", "2"]}), &json!({"items": ["a", "b"]})).ok);
    }

    #[test]
    fn keys_missing_and_extra_are_listed() {
        let out = check_keys(&json!({"a": "1", "b": "2", "c": "3"}), &json!({"a": "x"}));
        assert!(!out.ok);
        assert_eq!(out.messages[0], "[fail] Missing keys in target:");
        assert!(out.messages.contains(&"  - b".to_string()));
        assert!(out.messages.contains(&"  - c".to_string()));

        let out = check_keys(&json!({"a": "1"}), &json!({"a": "x", "b": "y"}));
        assert!(!out.ok);
        assert!(out.messages[0].contains("extra keys"));
    }

    #[test]
    fn key_listing_is_capped() {
        let mut src = serde_json::Map::new();
        for i in 0..25 {
            src.insert(format!("k{i:02}"), json!("v"));
        }
        let out = check_keys(&Value::Object(src), &json!({}));
        assert_eq!(out.messages.len(), 1 + KEY_DIFF_LIMIT + 1);
        assert_eq!(out.messages.last().map(String::as_str), Some("  …and 5 more"));
    }

    #[test]
    fn tokens_match_across_kinds() {
        for (src, dst) in [
            ("Hello world", "Hola mundo"),
            ("Hello {name}, you have {count} items", "Hola {name}, tienes {count} elementos"),
            ("Click <b>here</b>", "Haz clic <b>aquí</b>"),
            ("Welcome {{user}}", "Bienvenido {{user}}"),
            ("User %s has %d items", "Usuario %s tiene %d elementos"),
        ] {
            assert!(check_tokens(&json!({"k": src}), &json!({"k": dst})).ok, "{src}");
        }
    }

    #[test]
    fn tokens_missing_unexpected_and_wrong_count() {
        let out = check_tokens(&json!({"m": "Hello {name}"}), &json!({"m": "Hola"}));
        assert!(!out.ok);
        assert!(out.messages[0].contains("placeholder mismatch"));
        assert!(out.messages[0].contains("missing {name} ×1"));

        let out = check_tokens(&json!({"m": "Hello"}), &json!({"m": "Hola {name}"}));
        assert!(!out.ok);
        assert!(out.messages[0].contains("unexpected {name}"));

        assert!(!check_tokens(&json!({"t": "{a} and {b}"}), &json!({"t": "{a} solamente"})).ok);
    }

    #[test]
    fn tokens_require_string_output() {
        let out = check_tokens(&json!({"key": "value"}), &json!({"key": 123}));
        assert!(!out.ok);
        assert!(out.messages[0].contains("expected string"));
    }

    #[test]
    fn style_warnings_do_not_fail() {
        let src = json!({
            "cta.submit": "Submit",
            "page.title": "Settings",
            "errors.network": "Network failed"
        });
        let dst = json!({
            "cta.submit": "Please submit this form right now.",
            "page.title": "настройки.",
            "errors.network": "Сеть недоступна!"
        });
        let out = check_intent_style(&src, &dst);
        assert!(out.ok);
        assert_eq!(out.messages.len(), 5);
        assert!(out.messages.iter().all(|m| m.starts_with("[warn]")));
    }

    #[test]
    fn style_fails_on_missing_or_blank() {
        let src = json!({"a": "x", "b": "y", "c": "z"});
        let dst = json!({"b": "   ", "c": 5});
        let out = check_intent_style(&src, &dst);
        assert!(!out.ok);
        assert_eq!(
            out.messages,
            vec![
                "[fail] a: translation missing",
                "[fail] b: translation is empty",
                "[fail] c: translation is number, expected string",
            ]
        );
    }
}
