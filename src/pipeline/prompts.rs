use std::path::Path;

use crate::error::TranslateError;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";
pub const DEFAULT_SYSTEM_PROMPT_FILE: &str = "system.txt";

pub const DEFAULT_SYSTEM_PROMPT_TEXT: &str = r#"You are a professional software localizer translating user interface strings into <<TARGET_LANGUAGE_NAME>> (locale: <<TARGET_LOCALE>>).

Rules:
- The user message is a JSON object. Translate every item of `batch`; each item has a `key`, an `intent` and the source text.
- Return ONLY a JSON object mapping each `key` to its translation. No comments, no extra keys.
- Keep every placeholder marker such as __PH_0__ exactly as written, once per occurrence.
- Match the UI role given by `intent`: buttons are short imperative verbs, titles use title-style capitalization without a trailing period, error messages stay calm and never end with an exclamation mark.
- When `existing_translation` is present, keep it unless it is wrong or inconsistent with the glossary.
- Follow the glossary (`term => translation`) and stay consistent with `examples`.
"#;

/// Substitutes `<<NAME>>` variables in a prompt template.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("<<{k}>>");
        out = out.replace(&pat, v);
    }
    out
}

/// Reads the system prompt template, or falls back to the built-in one when `path` is `None`.
pub fn load_system_prompt(
    path: Option<&Path>,
    locale: &str,
    language_name: &str,
) -> Result<String, TranslateError> {
    let template = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TranslateError::SystemPromptMissing(p.to_path_buf()));
            }
            std::fs::read_to_string(p).map_err(|source| TranslateError::Read {
                path: p.to_path_buf(),
                source,
            })?
        }
        None => DEFAULT_SYSTEM_PROMPT_TEXT.to_string(),
    };
    Ok(render_template(
        &template,
        &[
            ("TARGET_LOCALE", locale),
            ("TARGET_LANGUAGE_NAME", language_name),
        ],
    ))
}

pub struct LanguagePair<'a> {
    pub source_code: &'a str,
    pub source_name: &'a str,
    pub reference_code: &'a str,
    pub reference_name: &'a str,
}

pub fn build_instructions(
    target_name: &str,
    langs: &LanguagePair<'_>,
    with_reference: bool,
) -> String {
    let LanguagePair {
        source_code,
        source_name,
        reference_code,
        reference_name,
    } = langs;
    let parts: Vec<String> = if with_reference {
        vec![
            format!(
                "Translate to {target_name} using BOTH the {source_name} (`{source_code}`) and \
                 {reference_name} (`{reference_code}`) references."
            ),
            format!(
                "The {reference_name} translation is verified and high-quality; use it to \
                 understand UI context and tone."
            ),
            "Return a JSON object that maps the same keys to translations.".to_string(),
            "Keep placeholders such as __PH_0__ exactly as provided in the source.".to_string(),
        ]
    } else {
        vec![
            format!("Translate to {target_name} using the {source_name} (`{source_code}`) reference."),
            "Return a JSON object that maps the same keys to translations.".to_string(),
            "Keep placeholders such as __PH_0__ exactly as provided in the source.".to_string(),
        ]
    };
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGS: LanguagePair<'static> = LanguagePair {
        source_code: "en",
        source_name: "English",
        reference_code: "ru",
        reference_name: "Russian",
    };

    #[test]
    fn template_substitution() {
        let out = render_template(
            "Target <<TARGET_LANGUAGE_NAME>> (<<TARGET_LOCALE>>), again <<TARGET_LOCALE>>",
            &[("TARGET_LOCALE", "es"), ("TARGET_LANGUAGE_NAME", "Spanish")],
        );
        assert_eq!(out, "Target Spanish (es), again es");
    }

    #[test]
    fn builtin_prompt_when_no_path() {
        let prompt = load_system_prompt(None, "de", "German").expect("prompt");
        assert!(prompt.contains("into German (locale: de)"));
        assert!(!prompt.contains("<<"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.txt");
        let err = load_system_prompt(Some(&missing), "de", "German").expect_err("missing");
        assert!(matches!(err, TranslateError::SystemPromptMissing(_)));

        let file = dir.path().join("system.txt");
        std::fs::write(&file, "Locale=<<TARGET_LOCALE>>").expect("write");
        assert_eq!(
            load_system_prompt(Some(&file), "tr", "Turkish").expect("read"),
            "Locale=tr"
        );
    }

    #[test]
    fn instructions_depend_on_reference() {
        let with_ref = build_instructions("Spanish", &LANGS, true);
        assert!(with_ref.starts_with(
            "Translate to Spanish using BOTH the English (`en`) and Russian (`ru`) references."
        ));
        assert!(with_ref.contains("The Russian translation is verified"));
        assert!(with_ref.ends_with("exactly as provided in the source."));

        let without = build_instructions("Spanish", &LANGS, false);
        assert!(without.starts_with("Translate to Spanish using the English (`en`) reference."));
        assert!(!without.contains("Russian"));
    }
}
