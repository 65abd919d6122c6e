use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{
    env_lookup, find_default_config, load_config, parse_env, AppConfig, EnvLookup,
    LanguageNames, CONFIG_ENV, CONFIG_FILENAME,
};
use crate::pipeline::prompts::{
    DEFAULT_PROMPTS_DIR, DEFAULT_SYSTEM_PROMPT_FILE, DEFAULT_SYSTEM_PROMPT_TEXT,
};

pub const DEFAULT_LOCALE: &str = "ru";
pub const DEFAULT_SOURCE_LANG: &str = "en";
pub const DEFAULT_REFERENCE_LANG: &str = "ru";
pub const DEFAULT_BATCH_SIZE: usize = 40;
pub const DEFAULT_BATCH_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_MIN_DELAY_SECONDS: f64 = 1.5;
pub const DEFAULT_RETRY_DELAY_SECONDS: f64 = 2.0;
pub const DEFAULT_CACHE_FILE: &str = ".translation_cache.json";

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub locale: String,
    pub source_lang: String,
    pub reference_lang: String,

    pub batch_size: usize,
    pub batch_max_attempts: u32,
    pub min_delay_seconds: f64,
    pub retry_delay_seconds: f64,

    pub glossary_path: Option<PathBuf>,
    /// `None` selects the built-in template.
    pub system_prompt_path: Option<PathBuf>,
    pub fewshot_path: Option<PathBuf>,

    pub show_progress: bool,
    pub cache_file: PathBuf,
    pub use_cache: bool,
    pub single_reference_mode: bool,
    pub trace_dir: Option<PathBuf>,

    pub language_names: LanguageNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            reference_lang: DEFAULT_REFERENCE_LANG.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_max_attempts: DEFAULT_BATCH_MAX_ATTEMPTS,
            min_delay_seconds: DEFAULT_MIN_DELAY_SECONDS,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
            glossary_path: None,
            system_prompt_path: None,
            fewshot_path: None,
            show_progress: true,
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            use_cache: true,
            single_reference_mode: false,
            trace_dir: None,
            language_names: LanguageNames::default(),
        }
    }
}

/// Command-line values; `None` and `false` defer to the lower layers.
#[derive(Clone, Debug, Default)]
pub struct PipelineOverrides {
    pub locale: Option<String>,
    pub source_lang: Option<String>,
    pub reference_lang: Option<String>,
    pub batch_size: Option<usize>,
    pub batch_max_attempts: Option<u32>,
    pub min_delay_seconds: Option<f64>,
    pub retry_delay_seconds: Option<f64>,
    pub glossary_path: Option<PathBuf>,
    pub system_prompt_path: Option<PathBuf>,
    pub fewshot_path: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    pub trace_dir: Option<PathBuf>,
    pub no_progress: bool,
    pub no_cache: bool,
    pub single_reference_mode: bool,
}

/// Finds and loads the TOML file: explicit path, then `CATALOG_TRANSLATOR_CONFIG`, then an
/// upward search from `workdir`. Returns the default config when none is found.
pub fn load_app_config(
    explicit: Option<&Path>,
    workdir: &Path,
    env: &EnvLookup,
) -> anyhow::Result<(Option<PathBuf>, AppConfig)> {
    let cfg_file = explicit
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| find_default_config(workdir, CONFIG_FILENAME));
    match cfg_file {
        Some(p) if p.exists() => {
            let cfg = load_config(&p)?;
            Ok((Some(p), cfg))
        }
        Some(p) if explicit.is_some() => {
            anyhow::bail!("config file not found: {}", p.display())
        }
        _ => Ok((None, AppConfig::default())),
    }
}

impl PipelineConfig {
    pub fn resolve(
        cli: &PipelineOverrides,
        file: &AppConfig,
        workdir: &Path,
    ) -> anyhow::Result<Self> {
        Self::resolve_with(cli, file, workdir, &env_lookup)
    }

    /// Layers CLI over environment over the config file over defaults.
    pub fn resolve_with(
        cli: &PipelineOverrides,
        file: &AppConfig,
        workdir: &Path,
        env: &EnvLookup,
    ) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let fp = &file.pipeline;
        let in_workdir = |p: PathBuf| if p.is_relative() { workdir.join(p) } else { p };

        let locale = cli
            .locale
            .clone()
            .or_else(|| env("TRANSLATION_LOCALE"))
            .or_else(|| fp.locale.clone())
            .unwrap_or(defaults.locale);
        let source_lang = cli
            .source_lang
            .clone()
            .or_else(|| fp.source_lang.clone())
            .unwrap_or(defaults.source_lang);
        let reference_lang = cli
            .reference_lang
            .clone()
            .or_else(|| fp.reference_lang.clone())
            .unwrap_or(defaults.reference_lang);

        let batch_size = match cli.batch_size {
            Some(v) => v,
            None => parse_env(env, "TRANSLATION_BATCH_SIZE")?
                .or(fp.batch_size)
                .unwrap_or(defaults.batch_size),
        };
        let batch_max_attempts = match cli.batch_max_attempts {
            Some(v) => v,
            None => parse_env(env, "TRANSLATION_BATCH_MAX_ATTEMPTS")?
                .or(fp.batch_max_attempts)
                .unwrap_or(defaults.batch_max_attempts),
        };
        let min_delay_seconds = match cli.min_delay_seconds {
            Some(v) => v,
            None => parse_env(env, "TRANSLATION_MIN_DELAY_SECONDS")?
                .or(fp.min_delay_seconds)
                .unwrap_or(defaults.min_delay_seconds),
        };
        let retry_delay_seconds = match cli.retry_delay_seconds {
            Some(v) => v,
            None => parse_env(env, "TRANSLATION_RETRY_DELAY_SECONDS")?
                .or(fp.retry_delay_seconds)
                .unwrap_or(defaults.retry_delay_seconds),
        };
        anyhow::ensure!(batch_size > 0, "batch size must be at least 1");
        anyhow::ensure!(batch_max_attempts > 0, "batch max attempts must be at least 1");
        anyhow::ensure!(
            is_valid_delay(min_delay_seconds) && is_valid_delay(retry_delay_seconds),
            "delays must be finite and not negative"
        );

        let glossary_path = cli
            .glossary_path
            .clone()
            .or_else(|| env("TRANSLATION_GLOSSARY_PATH").map(PathBuf::from))
            .or_else(|| fp.glossary.clone())
            .map(in_workdir)
            .or_else(|| {
                first_existing(&[
                    workdir.join("glossary").join(format!("{locale}.yml")),
                    workdir.join("glossary").join("default.yml"),
                ])
            });
        let system_prompt_path = cli
            .system_prompt_path
            .clone()
            .or_else(|| env("TRANSLATION_SYSTEM_PROMPT_PATH").map(PathBuf::from))
            .or_else(|| fp.system_prompt.clone())
            .map(in_workdir)
            .or_else(|| {
                first_existing(&[workdir
                    .join(DEFAULT_PROMPTS_DIR)
                    .join(DEFAULT_SYSTEM_PROMPT_FILE)])
            });
        let fewshot_path = cli
            .fewshot_path
            .clone()
            .or_else(|| env("TRANSLATION_FEWSHOT_PATH").map(PathBuf::from))
            .or_else(|| fp.fewshot.clone())
            .map(in_workdir)
            .or_else(|| {
                first_existing(&[
                    workdir
                        .join(DEFAULT_PROMPTS_DIR)
                        .join("fewshot")
                        .join(format!("{locale}.json")),
                    workdir.join(DEFAULT_PROMPTS_DIR).join("fewshot.json"),
                ])
            });

        let cache_file = in_workdir(
            cli.cache_file
                .clone()
                .or_else(|| fp.cache_file.clone())
                .unwrap_or(defaults.cache_file),
        );
        let trace_dir = cli
            .trace_dir
            .clone()
            .or_else(|| fp.trace_dir.clone())
            .map(in_workdir);

        Ok(Self {
            locale,
            source_lang,
            reference_lang,
            batch_size,
            batch_max_attempts,
            min_delay_seconds,
            retry_delay_seconds,
            glossary_path,
            system_prompt_path,
            fewshot_path,
            show_progress: !cli.no_progress && fp.show_progress.unwrap_or(true),
            cache_file,
            use_cache: !cli.no_cache && fp.use_cache.unwrap_or(true),
            single_reference_mode: cli.single_reference_mode
                || fp.single_reference_mode.unwrap_or(false),
            trace_dir,
            language_names: LanguageNames::with_overrides(&file.languages),
        })
    }

    pub fn target_language_name(&self) -> String {
        self.language_names.name_for(&self.locale)
    }
}

fn is_valid_delay(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= 0.0
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

/// Writes `catalog-translator.toml` and `prompts/system.txt` into `dir`. Existing files are kept
/// unless `force` is set.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;
    let prompt_path = prompts_dir.join(DEFAULT_SYSTEM_PROMPT_FILE);
    if !prompt_path.exists() || force {
        std::fs::write(&prompt_path, DEFAULT_SYSTEM_PROMPT_TEXT)
            .with_context(|| format!("write prompt: {}", prompt_path.display()))?;
    }

    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"# catalog-translator config
#
# Precedence: command-line flags > environment variables > this file > built-in defaults.
# Relative paths are resolved against the directory of this file.

[pipeline]
locale = "ru"
source_lang = "en"
reference_lang = "ru"

batch_size = 40
batch_max_attempts = 2
min_delay_seconds = 1.5
retry_delay_seconds = 2.0

system_prompt = "prompts/system.txt"
# glossary = "glossary/ru.yml"
# fewshot = "prompts/fewshot.json"

cache_file = ".translation_cache.json"
use_cache = true
single_reference_mode = false
show_progress = true

# Dump every request/response per batch attempt.
# trace_dir = "trace"

[provider]
# The API key is read from OPENAI_API_KEY only.
model = "gpt-4.1-mini"
# base_url = "https://api.openai.com/v1"
max_retries = 5
timeout_seconds = 60
# temperature = 0.2

[languages]
# uk = "Ukrainian"
"#;
