use std::path::{Path, PathBuf};

use anyhow::Context;

/// Dumps model requests and raw responses, one file per batch attempt.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let enabled = dir.is_some();
        let dir = dir.unwrap_or_default();
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_named_text(&self, name: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.dir.join(sanitize_filename(name));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }

    pub fn write_batch_text(
        &self,
        batch: usize,
        attempt: u32,
        kind: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!("batch_{batch:04}.attempt_{attempt}.{kind}.json");
        self.write_named_text(&name, text)
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => ch,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_only_when_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let trace_dir = dir.path().join("trace");
        let writer = TraceWriter::new(Some(trace_dir.clone())).expect("writer");
        writer.write_batch_text(3, 2, "request", "{}").expect("write");
        assert!(trace_dir.join("batch_0003.attempt_2.request.json").exists());

        let off = TraceWriter::disabled();
        off.write_batch_text(1, 1, "request", "{}").expect("noop");
        assert!(!off.is_enabled());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_filename("a/b:c?.json"), "a_b_c_.json");
    }
}
