//! Fixed label catalog collaborator.
//!
//! The classifier emits raw codes (`LABEL_0` .. `LABEL_30`); the catalog
//! translates them into human-readable knowledge-unit names and supplies
//! the denominator for coverage scoring. Codes without a mapping are
//! unrecognizable and get dropped by the classification merge.

use std::collections::BTreeMap;

/// Code → name table of the reference deployment. 31 knowledge units.
const DEFAULT_LABELS: [(&str, &str); 31] = [
    ("LABEL_0", "DOM"),
    ("LABEL_1", "Network"),
    ("LABEL_2", "Async"),
    ("LABEL_3", "Promises"),
    ("LABEL_4", "Closures"),
    ("LABEL_5", "Prototypes"),
    ("LABEL_6", "Classes"),
    ("LABEL_7", "Modules"),
    ("LABEL_8", "Events"),
    ("LABEL_9", "ErrorHandling"),
    ("LABEL_10", "Regex"),
    ("LABEL_11", "Storage"),
    ("LABEL_12", "Canvas"),
    ("LABEL_13", "WebAPIs"),
    ("LABEL_14", "JSON"),
    ("LABEL_15", "Timers"),
    ("LABEL_16", "Iterators"),
    ("LABEL_17", "Generators"),
    ("LABEL_18", "Functional"),
    ("LABEL_19", "Arrays"),
    ("LABEL_20", "Strings"),
    ("LABEL_21", "Numbers"),
    ("LABEL_22", "Dates"),
    ("LABEL_23", "Objects"),
    ("LABEL_24", "Scope"),
    ("LABEL_25", "Hoisting"),
    ("LABEL_26", "TypeCoercion"),
    ("LABEL_27", "Recursion"),
    ("LABEL_28", "Testing"),
    ("LABEL_29", "Security"),
    ("LABEL_30", "Performance"),
];

/// Immutable classifier-code → label-name table.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    entries: BTreeMap<String, String>,
}

impl LabelCatalog {
    /// Build a catalog from explicit `(code, name)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Number of recognizable labels; the score denominator.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Translate a raw classifier code into its label name.
    pub fn translate(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_LABELS
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string())),
        )
    }
}
