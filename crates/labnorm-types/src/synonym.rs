//! Analyte synonym type.

use crate::AnalyteId;

/// An alternate spelling of a canonical analyte's name.
///
/// Represents a row of the `synonyms` relation. `text_lower` is unique across
/// the catalog, so one free-text name resolves to at most one analyte.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Synonym {
    /// The analyte this synonym names.
    pub analyte_id: AnalyteId,
    /// The spelling as entered by the catalog maintainer.
    pub text: String,
    /// Lowercased lookup key.
    pub text_lower: String,
    /// True when this synonym equals the canonical name.
    pub is_primary: bool,
}

impl Synonym {
    /// Creates a synonym, deriving its lookup key.
    pub fn new(analyte_id: impl Into<AnalyteId>, text: impl Into<String>) -> Self {
        let text = text.into();
        let text_lower = Self::lookup_key(&text);
        Self {
            analyte_id: analyte_id.into(),
            text,
            text_lower,
            is_primary: false,
        }
    }

    /// Normalizes free text into a synonym index key (trimmed, lowercased).
    pub fn lookup_key(text: &str) -> String {
        text.trim().to_lowercase()
    }
}
