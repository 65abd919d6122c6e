use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::fmt::SubscriberBuilder;

use catalog_translator::config::env_lookup;
use catalog_translator::models::openai::{OpenAiChatClient, OpenAiSettings};
use catalog_translator::pipeline::{
    init_default_config, lint_catalogs, load_app_config, PipelineConfig, PipelineOverrides,
    TranslatorPipeline,
};
use catalog_translator::progress::TracingReporter;

const EXIT_USAGE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "catalog-translator")]
#[command(
    about = "Translate nested JSON UI string catalogs with an LLM, keeping keys and placeholders intact",
    long_about = None
)]
struct Args {
    /// Generate default config + system prompt, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Only validate --dst against --source (keys, placeholders, tone); no model calls
    #[arg(long)]
    lint: bool,

    /// Source-language catalog (JSON)
    #[arg(long, value_name = "JSON")]
    source: Option<PathBuf>,

    /// Verified reference-language catalog (JSON)
    #[arg(long, value_name = "JSON")]
    reference: Option<PathBuf>,

    /// Output catalog; an existing file also supplies hints
    #[arg(long, value_name = "JSON")]
    dst: Option<PathBuf>,

    /// Draft translation used as hints
    #[arg(long, value_name = "JSON")]
    draft: Option<PathBuf>,

    /// Target locale code (e.g. ru, es, pt-br)
    #[arg(long)]
    locale: Option<String>,

    /// Language code of --source (default: en)
    #[arg(long)]
    source_lang: Option<String>,

    /// Language code of --reference (default: ru)
    #[arg(long)]
    reference_lang: Option<String>,

    /// Glossary file (YAML/JSON); defaults to glossary/<locale>.yml
    #[arg(long, value_name = "FILE")]
    glossary: Option<PathBuf>,

    /// System prompt template
    #[arg(long, value_name = "FILE")]
    system_prompt: Option<PathBuf>,

    /// Few-shot examples JSON
    #[arg(long, value_name = "FILE")]
    fewshot: Option<PathBuf>,

    /// Number of keys per model request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Requests per batch before giving up on missing keys
    #[arg(long)]
    batch_max_attempts: Option<u32>,

    /// Seconds to wait between batches
    #[arg(long)]
    min_delay: Option<f64>,

    /// Seconds to wait before retrying an incomplete batch
    #[arg(long)]
    retry_delay: Option<f64>,

    /// Disable progress output
    #[arg(long)]
    no_progress: bool,

    /// Translation cache file (default: .translation_cache.json)
    #[arg(long, value_name = "FILE")]
    cache_file: Option<PathBuf>,

    /// Ignore and do not update the translation cache
    #[arg(long)]
    no_cache: bool,

    /// Translate from --source alone; --reference becomes optional
    #[arg(long)]
    single_reference_mode: bool,

    /// Config file path (default: search for catalog-translator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every request/response per batch attempt into this directory
    #[arg(long, value_name = "DIR")]
    trace_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> PipelineOverrides {
        PipelineOverrides {
            locale: self.locale.clone(),
            source_lang: self.source_lang.clone(),
            reference_lang: self.reference_lang.clone(),
            batch_size: self.batch_size,
            batch_max_attempts: self.batch_max_attempts,
            min_delay_seconds: self.min_delay,
            retry_delay_seconds: self.retry_delay,
            glossary_path: self.glossary.clone(),
            system_prompt_path: self.system_prompt.clone(),
            fewshot_path: self.fewshot.clone(),
            cache_file: self.cache_file.clone(),
            trace_dir: self.trace_dir.clone(),
            no_progress: self.no_progress,
            no_cache: self.no_cache,
            single_reference_mode: self.single_reference_mode,
        }
    }
}

enum Failure {
    Usage(anyhow::Error),
    Run(anyhow::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Usage(e)) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_USAGE)
        }
        Err(Failure::Run(e)) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: Args) -> Result<(), Failure> {
    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if args.init_config {
        let dir = args.init_config_dir.clone().unwrap_or_else(|| workdir.clone());
        let cfg_path = init_default_config(&dir, args.force)
            .context("init default config")
            .map_err(Failure::Run)?;
        tracing::info!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let (source, dst) = match (args.source.as_deref(), args.dst.as_deref()) {
        (Some(s), Some(d)) => (s.to_path_buf(), d.to_path_buf()),
        _ => {
            return Err(Failure::Usage(anyhow::anyhow!(
                "--source and --dst are required (or use --init-config)"
            )))
        }
    };

    if args.lint {
        return lint(&source, &dst);
    }

    if args.reference.is_none() && !args.single_reference_mode {
        return Err(Failure::Usage(anyhow::anyhow!(
            "--reference is required unless --single-reference-mode is set"
        )));
    }

    let (cfg_path, app_cfg) =
        load_app_config(args.config.as_deref(), &workdir, &env_lookup).map_err(Failure::Usage)?;
    if let Some(p) = cfg_path.as_ref() {
        tracing::info!("Config: {}", p.display());
    }
    let cfg = PipelineConfig::resolve(&args.overrides(), &app_cfg, &workdir)
        .map_err(Failure::Usage)?;
    let settings = OpenAiSettings::resolve(&app_cfg.provider).map_err(Failure::Usage)?;
    let client = OpenAiChatClient::new(settings).map_err(Failure::Usage)?;
    tracing::info!("Model: {}", client.settings().model);

    let reporter = TracingReporter::new(cfg.show_progress);
    let mut pipeline = TranslatorPipeline::new(cfg, client, reporter);
    let run = pipeline
        .run(&source, args.reference.as_deref(), &dst, args.draft.as_deref())
        .map_err(|e| Failure::Run(e.into()))?;
    tracing::info!(
        "Done: {} units, {} auto-copied, {} from cache, {} translated in {} batches",
        run.stats.units,
        run.stats.auto_copied,
        run.stats.cache_hits,
        run.stats.translated,
        run.stats.batches
    );
    Ok(())
}

fn lint(source: &Path, dst: &Path) -> Result<(), Failure> {
    let reporter = TracingReporter::new(false);
    let report = lint_catalogs(source, dst, &reporter).map_err(|e| Failure::Run(e.into()))?;
    if report.ok() {
        Ok(())
    } else {
        Err(Failure::Run(anyhow::anyhow!("lint failed")))
    }
}
