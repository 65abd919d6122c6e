use crate::freezer::PlaceholderMap;
use crate::intent::Intent;
use crate::structure::TreePath;

/// One string leaf of the source catalog, ready to be sent to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationUnit {
    pub path: TreePath,
    pub key: String,
    pub source_text: String,
    pub reference_text: Option<String>,
    pub source_protected: String,
    pub reference_protected: String,
    pub source_ph_map: PlaceholderMap,
    pub reference_ph_map: PlaceholderMap,
    pub intent: Intent,
    pub hint: Option<String>,
    /// Copied through in protected form without a model call.
    pub auto_copy: bool,
}

impl TranslationUnit {
    pub fn reference_or_empty(&self) -> &str {
        self.reference_text.as_deref().unwrap_or("")
    }

    pub fn has_reference(&self) -> bool {
        !self.reference_or_empty().is_empty()
    }
}
