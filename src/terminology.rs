use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::TranslateError;

/// Term list injected into every request as `term => translation` lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Glossary {
    terms: BTreeMap<String, String>,
}

impl Glossary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn insert(&mut self, term: impl Into<String>, translation: impl Into<String>) {
        self.terms.insert(term.into(), translation.into());
    }

    /// Loads a flat YAML (`.yml`/`.yaml`) or JSON mapping. A path that does not exist yields an
    /// empty glossary.
    pub fn load(path: &Path) -> Result<Self, TranslateError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| TranslateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "yml" | "yaml"))
            .unwrap_or(false);
        let glossary_err = |message: String| TranslateError::Glossary {
            path: path.to_path_buf(),
            message,
        };
        let data: Value = if is_yaml {
            if text.trim().is_empty() {
                return Ok(Self::new());
            }
            serde_yaml::from_str(&text).map_err(|e| glossary_err(e.to_string()))?
        } else {
            serde_json::from_str(&text).map_err(|e| glossary_err(e.to_string()))?
        };
        Self::from_value(&data).map_err(glossary_err)
    }

    pub fn from_value(data: &Value) -> Result<Self, String> {
        let map = match data {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "glossary must be a mapping, got {}",
                    value_kind(other)
                ))
            }
        };
        let mut glossary = Self::new();
        for (term, translation) in map {
            glossary.insert(term.clone(), scalar_text(translation));
        }
        Ok(glossary)
    }

    /// Sorted `term => translation` lines joined by newlines.
    pub fn render(&self) -> String {
        self.terms
            .iter()
            .map(|(k, v)| format!("{k} => {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_sorted() {
        let mut g = Glossary::new();
        g.insert("wallet", "кошелёк");
        g.insert("Account", "Аккаунт");
        assert_eq!(g.render(), "Account => Аккаунт\nwallet => кошелёк");
        assert_eq!(Glossary::new().render(), "");
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yml = dir.path().join("ru.yml");
        std::fs::write(&yml, "token: токен\nfee: комиссия\nlimit: 10\n").expect("write");
        let g = Glossary::load(&yml).expect("yaml");
        assert_eq!(g.render(), "fee => комиссия\nlimit => 10\ntoken => токен");

        let json = dir.path().join("ru.json");
        std::fs::write(&json, r#"{"b": "2", "a": "1"}"#).expect("write");
        assert_eq!(Glossary::load(&json).expect("json").render(), "a => 1\nb => 2");
    }

    #[test]
    fn missing_or_empty_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Glossary::load(&dir.path().join("none.yml")).expect("missing").is_empty());
        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "").expect("write");
        assert!(Glossary::load(&empty).expect("empty").is_empty());
    }

    #[test]
    fn non_mapping_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p = dir.path().join("list.yml");
        std::fs::write(&p, "- a\n- b\n").expect("write");
        let err = Glossary::load(&p).expect_err("list");
        assert!(err.to_string().contains("must be a mapping"));
    }
}
