use std::path::PathBuf;

use thiserror::Error;

use crate::models::ModelError;
use crate::structure::StructureError;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} must contain a JSON object at the root")]
    NotAnObject(PathBuf),
    #[error("glossary {path}: {message}")]
    Glossary { path: PathBuf, message: String },
    #[error("few-shot examples {path}: {message}")]
    FewShot { path: PathBuf, message: String },
    #[error("system prompt template not found: {0}")]
    SystemPromptMissing(PathBuf),
    #[error("Model did not return translations for: {}", .0.join(", "))]
    Unresolved(Vec<String>),
    #[error("Model did not return translations for: {} ({cause})", keys.join(", "))]
    BatchFailed { keys: Vec<String>, cause: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Missing translation for key: {0}")]
    MissingTranslation(String),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("key mismatch between source and output ({} missing, {} extra)", missing.len(), extra.len())]
    KeyMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize output: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_lists_keys() {
        let err = TranslateError::Unresolved(vec!["a.b".into(), "c".into()]);
        assert_eq!(err.to_string(), "Model did not return translations for: a.b, c");
    }

    #[test]
    fn batch_failure_lists_keys_and_cause() {
        let err = TranslateError::BatchFailed {
            keys: vec!["a".into(), "b".into()],
            cause: "transient model failure: down".into(),
        };
        assert_eq!(
            err.to_string(),
            "Model did not return translations for: a, b (transient model failure: down)"
        );
    }

    #[test]
    fn model_errors_pass_through() {
        let err: TranslateError = ModelError::Fatal("quota".into()).into();
        assert_eq!(err.to_string(), "model failure: quota");
    }
}
