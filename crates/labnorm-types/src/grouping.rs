//! Category grouping types.

/// An analyte name with the number of results recorded under it.
///
/// The input of category aggregation. `name` may be a raw test name or an
/// already-canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyteCount {
    /// Test name.
    pub name: String,
    /// Number of results.
    pub count: u64,
}

impl AnalyteCount {
    /// Creates a count entry.
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// One analyte inside a [`CategoryGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupedAnalyte {
    /// Canonical name, or the trimmed raw name when unresolved.
    pub canonical_name: String,
    /// Standard unit when the analyte is in the catalog.
    pub standard_unit: Option<String>,
    /// Summed count across every name that resolved here.
    pub count: u64,
}

/// A display category with its analytes sorted by canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryGroup {
    /// Category name.
    pub name: String,
    /// Category icon.
    pub icon: String,
    /// Analytes, sorted by canonical name.
    pub analytes: Vec<GroupedAnalyte>,
}

impl CategoryGroup {
    /// Flattens groups back into count entries keyed by canonical name.
    pub fn flatten(groups: &[CategoryGroup]) -> Vec<AnalyteCount> {
        groups
            .iter()
            .flat_map(|g| g.analytes.iter())
            .map(|a| AnalyteCount::new(a.canonical_name.clone(), a.count))
            .collect()
    }

    /// Total count across the group's analytes.
    pub fn total_count(&self) -> u64 {
        self.analytes.iter().map(|a| a.count).sum()
    }
}

/// Catalog details of one canonical analyte.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyteDetails {
    /// Canonical name.
    pub canonical_name: String,
    /// Standard unit.
    pub standard_unit: String,
    /// Category name.
    pub category: String,
    /// Every registered spelling, in load order.
    pub synonyms: Vec<String>,
}

/// A category with the catalog details of every analyte in it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryOverview {
    /// Category name.
    pub name: String,
    /// Category icon.
    pub icon: String,
    /// Analytes, sorted by canonical name.
    pub analytes: Vec<AnalyteDetails>,
}
