//! Canonical analyte type.
//!
//! This module provides the `CanonicalAnalyte` struct representing one
//! standardized lab measurement, and the percentage/absolute classification
//! used to pair dual analytes.

use crate::{well_known, AnalyteId, CategoryId};

/// One standardized lab measurement type.
///
/// Represents a row of the `analytes` relation of the reference catalog.
///
/// # Examples
///
/// ```
/// use labnorm_types::CanonicalAnalyte;
///
/// let analyte = CanonicalAnalyte {
///     id: "a-hgb".to_string(),
///     canonical_name: "Гемоглобин".to_string(),
///     category_id: "c-cbc".to_string(),
///     standard_unit: "г/л".to_string(),
///     sort_order: 1,
///     active: true,
/// };
///
/// assert!(analyte.dual_class().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalAnalyte {
    /// Unique identifier of this analyte.
    pub id: AnalyteId,
    /// The standardized display name (e.g. "Гемоглобин").
    pub canonical_name: String,
    /// The category this analyte belongs to.
    pub category_id: CategoryId,
    /// The unit all values of this analyte are normalized into.
    pub standard_unit: String,
    /// Position within its category.
    pub sort_order: i32,
    /// Whether this analyte is active in the catalog.
    pub active: bool,
}

impl CanonicalAnalyte {
    /// Returns the dual class of this analyte, if its name marks it as one
    /// half of a percentage/absolute pair.
    pub fn dual_class(&self) -> Option<DualClass> {
        well_known::dual_class_of(&self.canonical_name)
    }

    /// Returns the canonical name the paired variant would carry.
    ///
    /// The partner is not guaranteed to exist in the catalog.
    pub fn dual_partner_name(&self) -> Option<String> {
        well_known::dual_partner_name(&self.canonical_name)
    }
}

/// Which half of a dual analyte pair a canonical analyte is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DualClass {
    /// Percentage of a total (e.g. "Лимфоциты (%)").
    Percentage,
    /// Absolute count (e.g. "Лимфоциты (абс)").
    Absolute,
}

impl DualClass {
    /// Classifies a unit label: anything containing `%` is a percentage.
    ///
    /// A missing unit counts as absolute.
    pub fn of_unit(unit: Option<&str>) -> Self {
        match unit {
            Some(u) if well_known::is_percentage_unit(u) => Self::Percentage,
            _ => Self::Absolute,
        }
    }

    /// Returns true for the percentage variant.
    pub fn is_percentage(self) -> bool {
        self == Self::Percentage
    }

    /// Returns the other class.
    pub fn opposite(self) -> Self {
        match self {
            Self::Percentage => Self::Absolute,
            Self::Absolute => Self::Percentage,
        }
    }
}

/// An explicit percentage/absolute pairing row.
///
/// Catalogs may list pairs explicitly; the name-suffix convention still
/// applies to analytes no pair row mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualPair {
    /// The percentage variant.
    pub percent_analyte_id: AnalyteId,
    /// The absolute-count variant.
    pub absolute_analyte_id: AnalyteId,
}

impl DualPair {
    /// Returns the partner of `id` within this pair.
    pub fn partner_of(&self, id: &str) -> Option<&AnalyteId> {
        if self.percent_analyte_id == id {
            Some(&self.absolute_analyte_id)
        } else if self.absolute_analyte_id == id {
            Some(&self.percent_analyte_id)
        } else {
            None
        }
    }
}
