use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use crate::sentinels::{ph_token, PH_PREFIX, PH_RE};

/// Marker -> original substring for one protected string.
pub type PlaceholderMap = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeResult {
    pub text: String,
    pub ph_map: PlaceholderMap,
}

// Earlier alternatives win when several match at the same offset.
pub static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    let double_brace = r"\{\{[^}]+\}\}";
    let single_brace = r"\{[a-zA-Z0-9_]+\}";
    let printf_numbered = r"%\d+\$s";
    let printf = r"%s|%d|%f";
    let colon_param = r":[a-zA-Z_]\w*";
    let dollar_const = r"\$[A-Z_]+";
    let html_tag = r"</?[0-9a-zA-Z]+[^>]*>";
    let icu_block = r"\{[^{}]*,\s*(?:plural|select)[^{}]*\{[^{}]*\}[^{}]*\}";

    let pat = format!(
        "{double_brace}|{single_brace}|{printf_numbered}|{printf}|{colon_param}|{dollar_const}|{html_tag}|{icu_block}"
    );
    Regex::new(&pat).expect("token regex")
});

// Literal marker prefixes already in the text are frozen too, so no restored marker can be
// confused with source text.
static FREEZE_RE: Lazy<Regex> = Lazy::new(|| {
    let pat = format!("{}|{}", TOKEN_RE.as_str(), regex::escape(PH_PREFIX));
    Regex::new(&pat).expect("freeze regex")
});

/// Replaces every format token with a `__PH_<n>__` marker, numbered by ascending offset.
pub fn freeze_text(text: &str) -> FreezeResult {
    let mut ph_map = PlaceholderMap::new();
    if text.is_empty() {
        return FreezeResult {
            text: String::new(),
            ph_map,
        };
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0usize;
    for m in FREEZE_RE.find_iter(text) {
        out.push_str(&text[pos..m.start()]);
        let token = ph_token(ph_map.len());
        ph_map.insert(token.clone(), m.as_str().to_string());
        out.push_str(&token);
        pos = m.end();
    }
    out.push_str(&text[pos..]);

    FreezeResult { text: out, ph_map }
}

/// Restores the originals behind every known marker; unknown markers are left untouched.
pub fn unfreeze_text(text: &str, ph_map: &PlaceholderMap) -> String {
    if ph_map.is_empty() || text.is_empty() {
        return text.to_string();
    }
    PH_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let tok = &caps[0];
            ph_map.get(tok).cloned().unwrap_or_else(|| tok.to_string())
        })
        .into_owned()
}

pub fn protect(text: &str) -> (String, PlaceholderMap) {
    let fr = freeze_text(text);
    (fr.text, fr.ph_map)
}

pub fn unprotect(text: &str, ph_map: &PlaceholderMap) -> String {
    unfreeze_text(text, ph_map)
}

/// Multiset of raw token matches, independent of marker substitution.
pub fn token_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for m in TOKEN_RE.find_iter(text) {
        *counts.entry(m.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}
