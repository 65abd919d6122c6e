use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// UI role of a string, inferred from its canonical key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Button,
    Title,
    Error,
    Label,
    Tooltip,
    Text,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Title => "title",
            Self::Error => "error",
            Self::Label => "label",
            Self::Tooltip => "tooltip",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static BUTTON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(button|btn|cta|action|submit|next|prev)$").expect("button regex"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(title|header|headline|modal_title)$").expect("title regex"));
static ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(error|validation|failed|required)").expect("error regex"));
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(label|placeholder|hint)$").expect("label regex"));
static TOOLTIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(tooltip|helper|description)$").expect("tooltip regex"));

pub fn infer_intent(key: &str, _value: &str) -> Intent {
    let k = key.to_lowercase();
    if BUTTON_RE.is_match(&k) {
        Intent::Button
    } else if TITLE_RE.is_match(&k) {
        Intent::Title
    } else if ERROR_RE.is_match(&k) {
        Intent::Error
    } else if LABEL_RE.is_match(&k) {
        Intent::Label
    } else if TOOLTIP_RE.is_match(&k) {
        Intent::Tooltip
    } else {
        Intent::Text
    }
}
