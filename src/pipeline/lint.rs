use std::path::Path;

use crate::error::TranslateError;
use crate::progress::Reporter;
use crate::quality::{check_intent_style, check_keys, check_tokens, CheckOutcome};

use super::translator::load_json_tree;

#[derive(Clone, Debug)]
pub struct LintReport {
    pub keys: CheckOutcome,
    pub tokens: CheckOutcome,
    pub style: CheckOutcome,
}

impl LintReport {
    pub fn ok(&self) -> bool {
        self.keys.ok && self.tokens.ok && self.style.ok
    }
}

/// Checks an already translated catalog against its source without calling any model.
pub fn lint_catalogs(
    source: &Path,
    target: &Path,
    reporter: &dyn Reporter,
) -> Result<LintReport, TranslateError> {
    let src = load_json_tree(source)?;
    let dst = load_json_tree(target)?;

    let report = LintReport {
        keys: check_keys(&src, &dst),
        tokens: check_tokens(&src, &dst),
        style: check_intent_style(&src, &dst),
    };
    for outcome in [&report.keys, &report.tokens, &report.style] {
        for message in &outcome.messages {
            if message.starts_with("[fail]") {
                reporter.error(message);
            } else {
                reporter.warn(message);
            }
        }
    }
    if report.ok() {
        reporter.info("[ok] lint passed");
    } else {
        reporter.error("[fail] lint failed");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryReporter;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, body).expect("write");
        p
    }

    #[test]
    fn clean_catalog_passes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = write(dir.path(), "en.json", r#"{"home": {"title": "Hi {name}"}}"#);
        let dst = write(dir.path(), "es.json", r#"{"home": {"title": "Hola {name}"}}"#);
        let reporter = MemoryReporter::new();
        let report = lint_catalogs(&src, &dst, &reporter).expect("lint");
        assert!(report.ok());
        assert!(reporter.contains("[ok] lint passed"));
    }

    #[test]
    fn any_failed_check_fails_the_lint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = write(dir.path(), "en.json", r#"{"a": "Hi {name}", "b": "x"}"#);
        let dst = write(dir.path(), "es.json", r#"{"a": "Hola", "b": " "}"#);
        let reporter = MemoryReporter::new();
        let report = lint_catalogs(&src, &dst, &reporter).expect("lint");
        assert!(report.keys.ok);
        assert!(!report.tokens.ok);
        assert!(!report.style.ok);
        assert!(!report.ok());
        assert!(reporter.contains("[fail] lint failed"));
    }
}
