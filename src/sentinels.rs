use once_cell::sync::Lazy;
use regex::Regex;

pub const PH_PREFIX: &str = "__PH_";
pub const PH_SUFFIX: &str = "__";

/// Marker substituted for the `n`-th protected token of a string.
pub fn ph_token(n: usize) -> String {
    format!("{PH_PREFIX}{n}{PH_SUFFIX}")
}

pub static PH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__PH_\d+__").expect("ph regex"));

pub fn ph_tokens_from_text(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    PH_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ph_token, ph_tokens_from_text};

    #[test]
    fn markers_are_distinct_substrings() {
        assert_eq!(ph_token(0), "__PH_0__");
        assert_eq!(ph_token(10), "__PH_10__");
        assert!(!ph_token(10).contains(&ph_token(1)));
    }

    #[test]
    fn finds_markers_in_order() {
        let found = ph_tokens_from_text("__PH_1__ is before __PH_0__");
        assert_eq!(found, vec!["__PH_1__", "__PH_0__"]);
        assert!(ph_tokens_from_text("").is_empty());
    }
}
