//! Per-document options and style registries
//!
//! Everything a conversion run needs to remember between blocks lives here
//! and is owned by the [`Document`](super::Document), so independent
//! conversions never share state.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Prefix of VTT identifiers after rewriting
pub const VTT_IDENTIFIER_PREFIX: &str = "style";

/// Prefix of classes holding unclassified MicroDVD control codes
pub const MICRO_DVD_CLASS_PREFIX: &str = "micro_dvd_";

/// Bidirectional map between source VTT identifiers and rewritten ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct VttIdentifiers {
    /// Rewritten id to the id found in the source
    pub identifier_to_original: BTreeMap<String, String>,
    /// Source id to its rewritten id
    pub identifier_to_new: BTreeMap<String, String>,
    /// Last number handed out
    pub counter: usize,
}

impl VttIdentifiers {
    /// Rewritten id for `original`, allocating a fresh one on first use
    ///
    /// Fresh ids skip any name already taken, so two different source ids
    /// never share a rewritten id.
    pub fn rewrite(&mut self, original: &str) -> String {
        if let Some(existing) = self.identifier_to_new.get(original) {
            return existing.clone();
        }
        let fresh = loop {
            self.counter += 1;
            let candidate = format!("{VTT_IDENTIFIER_PREFIX}{}", self.counter);
            if !self.identifier_to_original.contains_key(&candidate) {
                break candidate;
            }
        };
        self.identifier_to_original
            .insert(fresh.clone(), original.to_string());
        self.identifier_to_new
            .insert(original.to_string(), fresh.clone());
        fresh
    }

    /// Source id for a rewritten id; unknown ids are returned unchanged
    #[must_use]
    pub fn original<'a>(&'a self, rewritten: &'a str) -> &'a str {
        self.identifier_to_original
            .get(rewritten)
            .map_or(rewritten, String::as_str)
    }

    /// Rewritten id for a source id, if one was allocated
    #[must_use]
    pub fn rewritten(&self, original: &str) -> Option<&str> {
        self.identifier_to_new.get(original).map(String::as_str)
    }
}

/// Unclassified MicroDVD control codes keyed by synthetic class id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct MicroDvdCodes {
    /// `micro_dvd_N` to the raw `(code, value)` pairs in source order
    pub classes: BTreeMap<String, Vec<(String, String)>>,
    /// Last number handed out
    pub counter: usize,
}

impl MicroDvdCodes {
    /// Store `codes` under a fresh class id and return it
    ///
    /// Identical code sets share one id.
    pub fn register(&mut self, codes: Vec<(String, String)>) -> String {
        if let Some((class, _)) = self.classes.iter().find(|(_, stored)| **stored == codes) {
            return class.clone();
        }
        let class = loop {
            let candidate = format!("{MICRO_DVD_CLASS_PREFIX}{}", self.counter);
            self.counter += 1;
            if !self.classes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.classes.insert(class.clone(), codes);
        class
    }

    /// Codes stored under `class`
    #[must_use]
    pub fn codes(&self, class: &str) -> Option<&[(String, String)]> {
        self.classes.get(class).map(Vec::as_slice)
    }
}

/// File level options of a document
///
/// The `style`, `layout` and `metadata` maps index blocks by id. They are
/// maintained by [`Document`](super::Document) and always point at a block
/// of the matching kind.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DocumentOptions {
    /// Frame rate established by the first frame based read
    pub frame_rate: Option<f64>,
    pub(crate) style: BTreeMap<String, usize>,
    pub(crate) layout: BTreeMap<String, usize>,
    pub(crate) metadata: BTreeMap<String, usize>,
    /// VTT identifier rewriting state
    pub vtt: VttIdentifiers,
    /// MicroDVD unclassified control codes
    pub micro_dvd: MicroDvdCodes,
    /// Format specific file level values, such as TTML `ttp:*` parameters
    pub extra: BTreeMap<String, String>,
}

impl DocumentOptions {
    /// Style index: id to block position
    #[must_use]
    pub const fn style_index(&self) -> &BTreeMap<String, usize> {
        &self.style
    }

    /// Layout index: id to block position
    #[must_use]
    pub const fn layout_index(&self) -> &BTreeMap<String, usize> {
        &self.layout
    }

    /// Metadata index: id to block position
    #[must_use]
    pub const fn metadata_index(&self) -> &BTreeMap<String, usize> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_is_stable_and_reversible() {
        let mut ids = VttIdentifiers::default();
        let a = ids.rewrite("speaker");
        let b = ids.rewrite("narrator");
        assert_eq!(a, "style1");
        assert_eq!(b, "style2");
        assert_eq!(ids.rewrite("speaker"), a);
        assert_eq!(ids.original(&a), "speaker");
        assert_eq!(ids.original("unknown"), "unknown");
    }

    #[test]
    fn rewrite_never_merges_colliding_ids() {
        let mut ids = VttIdentifiers::default();
        let first = ids.rewrite("style2");
        let second = ids.rewrite("other");
        let third = ids.rewrite("style1");
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_ne!(first, third);
        assert_eq!(ids.original(&first), "style2");
        assert_eq!(ids.original(&third), "style1");
    }

    #[test]
    fn micro_dvd_codes_share_identical_sets() {
        let mut codes = MicroDvdCodes::default();
        let p = vec![("P".to_string(), "1".to_string())];
        let first = codes.register(p.clone());
        assert_eq!(first, "micro_dvd_0");
        assert_eq!(codes.register(p), first);
        let second = codes.register(vec![("O".to_string(), "x".to_string())]);
        assert_eq!(second, "micro_dvd_1");
        assert_eq!(codes.codes(&second).unwrap().len(), 1);
    }
}
