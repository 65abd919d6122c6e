use std::collections::HashMap;
use std::path::Path;

use encoding_rs::UTF_8;
use serde_json::Value;

use crate::error::TranslateError;
use crate::freezer::unprotect;
use crate::ir::TranslationUnit;
use crate::models::ChatModel;
use crate::progress::Reporter;
use crate::quality::{check_intent_style, check_keys, check_tokens, key_diff, CheckOutcome};
use crate::structure::set_value;
use crate::terminology::Glossary;

use super::batch::{pause, translate_batch, BatchContext, RetryPolicy};
use super::cache::{cache_version, fingerprint, CacheStore};
use super::fewshot::{load_fewshot, FewShotContext, FewShotExample};
use super::prompts::{load_system_prompt, LanguagePair};
use super::trace::TraceWriter;
use super::units::{build_units, UnitSources};
use super::PipelineConfig;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub units: usize,
    pub auto_copied: usize,
    pub cache_hits: usize,
    pub translated: usize,
    pub batches: usize,
}

/// Output tree plus the non-blocking validation results.
#[derive(Clone, Debug)]
pub struct TranslationRun {
    pub output: Value,
    pub stats: RunStats,
    pub tokens: CheckOutcome,
    pub style: CheckOutcome,
}

pub struct TranslatorPipeline<M: ChatModel, R: Reporter> {
    cfg: PipelineConfig,
    model: M,
    reporter: R,
    trace: TraceWriter,
}

impl<M: ChatModel, R: Reporter> TranslatorPipeline<M, R> {
    pub fn new(cfg: PipelineConfig, model: M, reporter: R) -> Self {
        let trace = match TraceWriter::new(cfg.trace_dir.clone()) {
            Ok(t) => t,
            Err(e) => {
                reporter.warn(&format!("tracing disabled: {e:#}"));
                TraceWriter::disabled()
            }
        };
        if trace.is_enabled() {
            reporter.info(&format!("Writing request traces to {}", trace.dir().display()));
        }
        if !cfg.language_names.is_empty() {
            reporter.info(&format!(
                "Loaded {} language definitions",
                cfg.language_names.len()
            ));
        }
        Self {
            cfg,
            model,
            reporter,
            trace,
        }
    }

    pub fn client(&self) -> &M {
        &self.model
    }

    /// Translates `source` into `destination`.
    ///
    /// The existing destination file, when present, and the optional draft only provide hints.
    /// Both must still hold a JSON object; a malformed destination aborts the run untouched.
    /// The file is written only when the output has exactly the source's key set.
    pub fn run(
        &mut self,
        source: &Path,
        reference: Option<&Path>,
        destination: &Path,
        draft: Option<&Path>,
    ) -> Result<TranslationRun, TranslateError> {
        self.reporter.info("Loading source files...");
        let source_tree = load_json_tree(source)?;
        let reference_tree = match reference {
            Some(p) => load_json_tree(p)?,
            None => empty_tree(),
        };
        let draft_tree = match draft {
            Some(p) if p.exists() => load_json_tree(p)?,
            Some(p) => {
                self.reporter
                    .warn(&format!("Draft file not found: {}", p.display()));
                empty_tree()
            }
            None => empty_tree(),
        };
        let existing_tree = if destination.exists() {
            load_json_tree(destination)?
        } else {
            empty_tree()
        };

        let run = self.translate_trees(&UnitSources {
            source: &source_tree,
            reference: &reference_tree,
            draft: &draft_tree,
            existing: &existing_tree,
        })?;

        write_json_tree(destination, &run.output)?;
        self.reporter
            .info(&format!("Wrote {}", destination.display()));
        Ok(run)
    }

    /// Everything but file I/O on the catalogs themselves; the cache file is still read and
    /// written when enabled.
    pub fn translate_trees(
        &mut self,
        trees: &UnitSources<'_>,
    ) -> Result<TranslationRun, TranslateError> {
        let mut cache = if self.cfg.use_cache {
            let store = CacheStore::load(
                &self.cfg.cache_file,
                &cache_version(self.model.model()),
                &self.reporter,
            );
            self.reporter
                .info(&format!("Loaded {} cached translations", store.len()));
            store
        } else {
            CacheStore::empty(&self.cfg.cache_file, cache_version(self.model.model()))
        };

        self.reporter.info("Building translation units...");
        let units = build_units(trees, self.cfg.single_reference_mode, &self.reporter);
        self.reporter
            .info(&format!("Total units to process: {}", units.len()));

        let glossary = match self.cfg.glossary_path.as_deref() {
            Some(p) => Glossary::load(p)?,
            None => Glossary::new(),
        };
        if !glossary.is_empty() {
            self.reporter
                .info(&format!("Loaded glossary with {} terms", glossary.len()));
        }
        let language_name = self.cfg.target_language_name();
        self.reporter.info(&format!(
            "Target language: {language_name} ({})",
            self.cfg.locale
        ));
        let system_prompt = load_system_prompt(
            self.cfg.system_prompt_path.as_deref(),
            &self.cfg.locale,
            &language_name,
        )?;
        let examples = match self.cfg.fewshot_path.as_deref() {
            Some(p) => load_fewshot(
                p,
                &FewShotContext {
                    locale: &self.cfg.locale,
                    language_name: &language_name,
                    source_lang: &self.cfg.source_lang,
                    reference_lang: &self.cfg.reference_lang,
                    source: trees.source,
                },
            )?,
            None => Vec::new(),
        };

        let (translations, stats) = self.process_batches(
            &units,
            &mut cache,
            &system_prompt,
            &glossary.render(),
            &examples,
            &language_name,
        )?;

        if self.cfg.use_cache {
            cache.save(&self.reporter);
            self.reporter
                .info(&format!("Saved {} translations to cache", cache.len()));
        }

        self.reporter.info("Building final output...");
        let mut output = trees.source.clone();
        for unit in &units {
            let raw = translations
                .get(&unit.key)
                .ok_or_else(|| TranslateError::MissingTranslation(unit.key.clone()))?;
            let text = unprotect(raw, &unit.source_ph_map);
            set_value(&mut output, &unit.path, Value::String(text))?;
        }

        self.reporter.info("Validating translations...");
        let keys = check_keys(trees.source, &output);
        if !keys.ok {
            self.report_outcome(&keys);
            let diff = key_diff(trees.source, &output);
            return Err(TranslateError::KeyMismatch {
                missing: diff.missing,
                extra: diff.extra,
            });
        }
        let tokens = check_tokens(trees.source, &output);
        self.report_outcome(&tokens);
        let style = check_intent_style(trees.source, &output);
        self.report_outcome(&style);

        Ok(TranslationRun {
            output,
            stats,
            tokens,
            style,
        })
    }

    fn report_outcome(&self, outcome: &CheckOutcome) {
        for message in &outcome.messages {
            if message.starts_with("[fail]") && !outcome.ok {
                self.reporter.error(message);
            } else {
                self.reporter.warn(message);
            }
        }
    }

    /// Splits units into auto-copied values, cache hits and units the model must translate.
    fn separate_units<'u>(
        &self,
        units: &'u [TranslationUnit],
        cache: &CacheStore,
    ) -> (HashMap<String, String>, Vec<&'u TranslationUnit>, usize, usize) {
        let mut translated = HashMap::new();
        let mut uncached = Vec::new();
        let mut special = 0;
        for unit in units {
            if unit.auto_copy {
                translated.insert(unit.key.clone(), unit.source_protected.clone());
                special += 1;
                continue;
            }
            let hit = if self.cfg.use_cache {
                cache.get(&fingerprint(unit))
            } else {
                None
            };
            match hit {
                Some(t) => {
                    translated.insert(unit.key.clone(), t.to_string());
                }
                None => uncached.push(unit),
            }
        }
        let cache_hits = units.len() - uncached.len() - special;
        (translated, uncached, special, cache_hits)
    }

    fn process_batches(
        &mut self,
        units: &[TranslationUnit],
        cache: &mut CacheStore,
        system_prompt: &str,
        glossary: &str,
        examples: &[FewShotExample],
        language_name: &str,
    ) -> Result<(HashMap<String, String>, RunStats), TranslateError> {
        let (mut translated, uncached, special, cache_hits) = self.separate_units(units, cache);
        let mut stats = RunStats {
            units: units.len(),
            auto_copied: special,
            cache_hits,
            ..RunStats::default()
        };

        if special > 0 {
            self.reporter.info(&format!(
                "Auto-copied {special} special values (placeholders/empty strings)"
            ));
        }
        if cache_hits > 0 {
            self.reporter
                .info(&format!("Cache hits: {cache_hits}/{} units", units.len()));
        }
        if uncached.is_empty() {
            self.reporter.info("All translations found in cache");
            return Ok((translated, stats));
        }

        self.reporter.info(&format!(
            "Translating {} uncached units...",
            uncached.len()
        ));
        let pending: Vec<TranslationUnit> = uncached.into_iter().cloned().collect();
        let batches: Vec<&[TranslationUnit]> = pending.chunks(self.cfg.batch_size.max(1)).collect();

        let source_name = self.cfg.language_names.name_for(&self.cfg.source_lang);
        let reference_name = self.cfg.language_names.name_for(&self.cfg.reference_lang);
        let ctx = BatchContext {
            system_prompt,
            glossary,
            examples,
            locale: &self.cfg.locale,
            language_name,
            langs: LanguagePair {
                source_code: &self.cfg.source_lang,
                source_name: &source_name,
                reference_code: &self.cfg.reference_lang,
                reference_name: &reference_name,
            },
        };
        let policy = RetryPolicy {
            max_attempts: self.cfg.batch_max_attempts,
            retry_delay_seconds: self.cfg.retry_delay_seconds,
        };

        let total = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            let index = index + 1;
            let result = translate_batch(
                &mut self.model,
                batch,
                &ctx,
                policy,
                &self.reporter,
                &self.trace,
                index,
            )?;
            if self.cfg.use_cache {
                for unit in batch {
                    if let Some(text) = result.get(&unit.key) {
                        cache.insert(fingerprint(unit), text.clone());
                    }
                }
                cache.save(&self.reporter);
            }
            stats.translated += result.len();
            stats.batches += 1;
            translated.extend(result);
            self.reporter.progress("Translating", index, total);

            if self.cfg.min_delay_seconds > 0.0 && index < total {
                pause(self.cfg.min_delay_seconds);
            }
        }
        Ok((translated, stats))
    }
}

fn empty_tree() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Reads a JSON catalog; the root must be an object. A UTF-8 BOM is tolerated.
pub fn load_json_tree(path: &Path) -> Result<Value, TranslateError> {
    let bytes = std::fs::read(path).map_err(|source| TranslateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (text, _, _) = UTF_8.decode(&bytes);
    let value: Value = serde_json::from_str(&text).map_err(|source| TranslateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(TranslateError::NotAnObject(path.to_path_buf()));
    }
    Ok(value)
}

/// Pretty JSON with a trailing newline; parent directories are created.
pub fn write_json_tree(path: &Path, tree: &Value) -> Result<(), TranslateError> {
    let write_err = |source| TranslateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut text = serde_json::to_string_pretty(tree).map_err(TranslateError::Serialize)?;
    text.push('\n');
    std::fs::write(path, text).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, ModelError};
    use crate::progress::MemoryReporter;
    use serde_json::json;

    struct Echo {
        calls: usize,
    }

    impl ChatModel for Echo {
        fn model(&self) -> &str {
            "echo"
        }

        fn complete(&mut self, messages: &[ChatMessage]) -> Result<Value, ModelError> {
            self.calls += 1;
            let payload: Value = serde_json::from_str(&messages[1].content)
                .map_err(|e| ModelError::Fatal(e.to_string()))?;
            let mut out = serde_json::Map::new();
            for item in payload["batch"].as_array().into_iter().flatten() {
                let key = item["key"].as_str().unwrap_or_default().to_string();
                let text = item["en"].as_str().unwrap_or_default();
                out.insert(key, Value::String(format!("{text} [es]")));
            }
            Ok(Value::Object(out))
        }
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            locale: "es".into(),
            min_delay_seconds: 0.0,
            retry_delay_seconds: 0.0,
            show_progress: false,
            cache_file: dir.join("cache.json"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn load_json_tree_accepts_bom_and_rejects_arrays() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bom = dir.path().join("bom.json");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"{"a": "b"}"#);
        std::fs::write(&bom, bytes).expect("write");
        assert_eq!(load_json_tree(&bom).expect("load"), json!({"a": "b"}));

        let arr = dir.path().join("arr.json");
        std::fs::write(&arr, "[1]").expect("write");
        assert!(matches!(load_json_tree(&arr), Err(TranslateError::NotAnObject(_))));
        assert!(matches!(
            load_json_tree(&dir.path().join("missing.json")),
            Err(TranslateError::Read { .. })
        ));
    }

    #[test]
    fn write_json_tree_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("nested/out/es.json");
        write_json_tree(&out, &json!({"k": "ñ"})).expect("write");
        let text = std::fs::read_to_string(&out).expect("read");
        assert_eq!(text, "{\n  \"k\": \"ñ\"\n}\n");
    }

    #[test]
    fn separates_special_cached_and_pending() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = MemoryReporter::new();
        let source = json!({"common.ok": "common.ok", "empty": "", "a": "A", "b": "B"});
        let reference = json!({"common.ok": "common.ok", "empty": "", "a": "А", "b": "Б"});
        let empty = json!({});
        let trees = UnitSources {
            source: &source,
            reference: &reference,
            draft: &empty,
            existing: &empty,
        };
        let mut pipeline =
            TranslatorPipeline::new(config(dir.path()), Echo { calls: 0 }, &reporter);
        let units = build_units(&trees, false, &reporter);
        let mut cache = CacheStore::empty(dir.path().join("c.json"), "echo:v1");
        cache.insert(fingerprint(&units[2]), "cached A".into());

        let (translated, pending, special, hits) = pipeline.separate_units(&units, &cache);
        assert_eq!(special, 2);
        assert_eq!(hits, 1);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, "b");
        assert_eq!(translated["a"], "cached A");
        assert_eq!(translated["common.ok"], "common.ok");

        let run = pipeline.translate_trees(&trees).expect("run");
        assert_eq!(run.output["b"], "B [es]");
        assert_eq!(run.output["empty"], "");
        assert_eq!(pipeline.client().calls, 1);
    }

    #[test]
    fn batches_respect_size_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = MemoryReporter::new();
        let mut cfg = config(dir.path());
        cfg.batch_size = 2;
        cfg.use_cache = false;
        let source = json!({"a": "1", "b": "2", "c": "3", "d": "4", "e": "5"});
        let empty = json!({});
        let mut pipeline = TranslatorPipeline::new(cfg, Echo { calls: 0 }, &reporter);
        let run = pipeline
            .translate_trees(&UnitSources {
                source: &source,
                reference: &source,
                draft: &empty,
                existing: &empty,
            })
            .expect("run");
        assert_eq!(run.stats.batches, 3);
        assert_eq!(run.stats.translated, 5);
        assert_eq!(pipeline.client().calls, 3);
        assert!(!dir.path().join("cache.json").exists());
        assert!(reporter.contains("Translating 3/3"));
    }
}
