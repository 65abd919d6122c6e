use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "catalog-translator.toml";
pub const CONFIG_ENV: &str = "CATALOG_TRANSLATOR_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub provider: ProviderSection,
    /// Extra or overriding language display names, keyed by locale code.
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub reference_lang: Option<String>,

    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub batch_max_attempts: Option<u32>,
    #[serde(default)]
    pub min_delay_seconds: Option<f64>,
    #[serde(default)]
    pub retry_delay_seconds: Option<f64>,

    #[serde(default)]
    pub glossary: Option<PathBuf>,
    #[serde(default)]
    pub system_prompt: Option<PathBuf>,
    #[serde(default)]
    pub fewshot: Option<PathBuf>,

    #[serde(default)]
    pub cache_file: Option<PathBuf>,
    #[serde(default)]
    pub use_cache: Option<bool>,
    #[serde(default)]
    pub single_reference_mode: Option<bool>,
    #[serde(default)]
    pub show_progress: Option<bool>,

    /// When set, every request and raw response is dumped here per batch attempt.
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProviderSection {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AppConfig {
    /// Makes every relative path in `[pipeline]` relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let p = &mut self.pipeline;
        for slot in [
            &mut p.glossary,
            &mut p.system_prompt,
            &mut p.fewshot,
            &mut p.cache_file,
            &mut p.trace_dir,
        ] {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let mut cfg: AppConfig = toml::from_str(&text)
        .with_context(|| format!("parse config toml: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    cfg.resolve_paths(base);
    Ok(cfg)
}

/// Environment lookup; blank values count as unset.
pub type EnvLookup = dyn Fn(&str) -> Option<String>;

pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn parse_env<T>(env: &EnvLookup, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| anyhow!("environment variable {name} is invalid ({e}), got: {raw}"))
}

const DEFAULT_LANGUAGE_NAMES: [(&str, &str); 8] = [
    ("ru", "Russian"),
    ("en", "English"),
    ("es", "Spanish"),
    ("de", "German"),
    ("fr", "French"),
    ("pt-br", "Brazilian Portuguese"),
    ("tr", "Turkish"),
    ("zh-cn", "Simplified Chinese"),
];

/// Display names for locale codes: built-in table, then `[languages]` overrides.
#[derive(Clone, Debug)]
pub struct LanguageNames {
    names: BTreeMap<String, String>,
}

impl Default for LanguageNames {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl LanguageNames {
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut names: BTreeMap<String, String> = DEFAULT_LANGUAGE_NAMES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (code, name) in overrides {
            names.insert(code.to_lowercase(), name.clone());
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Unknown codes fall back to the title-cased code (`pt-br` -> `Pt-Br`).
    pub fn name_for(&self, code: &str) -> String {
        self.names
            .get(&code.to_lowercase())
            .cloned()
            .unwrap_or_else(|| title_case(code))
    }
}

fn title_case(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut at_word_start = true;
    for ch in code.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
