use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ir::TranslationUnit;
use crate::progress::Reporter;

const FINGERPRINT_HEX_LEN: usize = 16;

/// `"<model>:v1"`. A file written under another tag is discarded on load.
pub fn cache_version(model: &str) -> String {
    format!("{model}:v1")
}

/// First 16 hex chars of SHA-256 over `key|source|reference|intent`.
pub fn fingerprint(unit: &TranslationUnit) -> String {
    let mut hasher = Sha256::new();
    hasher.update(unit.key.as_bytes());
    hasher.update(b"|");
    hasher.update(unit.source_text.as_bytes());
    hasher.update(b"|");
    hasher.update(unit.reference_or_empty().as_bytes());
    hasher.update(b"|");
    hasher.update(unit.intent.as_str().as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(FINGERPRINT_HEX_LEN);
    hex
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    cache: BTreeMap<String, String>,
}

/// Fingerprint -> accepted protected translation, persisted as one JSON file.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    version: String,
    entries: BTreeMap<String, String>,
}

impl CacheStore {
    pub fn empty(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Never fails: a missing file is an empty cache; unreadable, malformed or
    /// foreign-version files are reported and ignored.
    pub fn load(path: &Path, version: &str, reporter: &dyn Reporter) -> Self {
        let mut store = Self::empty(path, version);
        if !path.exists() {
            return store;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<CacheFile>(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(file) if file.version == version => store.entries = file.cache,
            Ok(file) => reporter.warn(&format!(
                "Cache version mismatch (cache: {}, current: {version}). Invalidating cache.",
                file.version
            )),
            Err(e) => reporter.warn(&format!(
                "Failed to load cache: {e}. Starting with empty cache."
            )),
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    pub fn insert(&mut self, fingerprint: String, translation: String) {
        self.entries.insert(fingerprint, translation);
    }

    /// Rewrites the whole file. Failures are reported, never returned.
    pub fn save(&self, reporter: &dyn Reporter) {
        if let Err(e) = self.try_save() {
            reporter.warn(&format!("Failed to save cache: {e}"));
        }
    }

    fn try_save(&self) -> anyhow::Result<()> {
        #[derive(Serialize)]
        struct CacheFileRef<'a> {
            version: &'a str,
            cache: &'a BTreeMap<String, String>,
        }
        let mut text = serde_json::to_string_pretty(&CacheFileRef {
            version: &self.version,
            cache: &self.entries,
        })?;
        text.push('\n');
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
