use serde_json::Value;

use crate::freezer::{protect, PlaceholderMap};
use crate::intent::infer_intent;
use crate::ir::TranslationUnit;
use crate::progress::Reporter;
use crate::structure::{get_value, iter_string_nodes, path_to_key, PathStep};

const NAMESPACE_PREFIXES: [&str; 3] = ["common.", "pages.", "components."];

/// Input trees for unit construction. `draft` and `existing` only contribute hints.
pub struct UnitSources<'a> {
    pub source: &'a Value,
    pub reference: &'a Value,
    pub draft: &'a Value,
    pub existing: &'a Value,
}

/// One unit per source string leaf, in traversal order.
///
/// A leaf without a string at the same reference path is skipped with a warning, unless
/// `single_reference_mode` is set, in which case the unit carries no reference.
pub fn build_units(
    trees: &UnitSources<'_>,
    single_reference_mode: bool,
    reporter: &dyn Reporter,
) -> Vec<TranslationUnit> {
    let mut units = Vec::new();
    for (path, source_text) in iter_string_nodes(trees.source) {
        let key = path_to_key(&path);

        let reference_text = match get_value(trees.reference, &path) {
            Some(Value::String(s)) => Some(s.clone()),
            _ if single_reference_mode => None,
            _ => {
                reporter.warn(&format!("Missing reference translation for {key}, skipping"));
                continue;
            }
        };

        let (source_protected, source_ph_map) = protect(source_text);
        let (reference_protected, reference_ph_map) = match reference_text.as_deref() {
            Some(r) if !r.is_empty() => protect(r),
            _ => (String::new(), PlaceholderMap::new()),
        };

        let hint = pick_hint(&path, &[trees.draft, trees.existing]);
        units.push(TranslationUnit {
            intent: infer_intent(&key, source_text),
            auto_copy: is_special_value(&key, source_text),
            path,
            key,
            source_text: source_text.to_string(),
            reference_text,
            source_protected,
            reference_protected,
            source_ph_map,
            reference_ph_map,
            hint,
        });
    }
    units
}

/// Values copied through without translation: empty strings, a value equal to its own key,
/// and namespace references such as `common.ok`.
pub fn is_special_value(key: &str, value: &str) -> bool {
    value.is_empty() || value == key || NAMESPACE_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// First non-blank string found at `path` across `pools`, in order.
pub fn pick_hint(path: &[PathStep], pools: &[&Value]) -> Option<String> {
    pools.iter().find_map(|pool| match get_value(pool, path) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}
