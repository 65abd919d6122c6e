pub mod batch;
pub mod cache;
mod config;
pub mod fewshot;
mod lint;
pub mod prompts;
mod trace;
mod translator;
pub mod units;

pub use config::{
    init_default_config, load_app_config, PipelineConfig, PipelineOverrides, DEFAULT_CACHE_FILE,
};
pub use lint::{lint_catalogs, LintReport};
pub use trace::TraceWriter;
pub use translator::{load_json_tree, write_json_tree, RunStats, TranslationRun, TranslatorPipeline};
pub use units::UnitSources;
