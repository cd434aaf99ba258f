//! Unit conversion coefficient type.

use crate::AnalyteId;

/// A coefficient converting one raw unit into an analyte's standard unit.
///
/// `value_std = value_raw × coefficient`. The standard unit itself always
/// converts with coefficient 1.0.
///
/// # Examples
///
/// ```
/// use labnorm_types::UnitConversion;
///
/// let conversion = UnitConversion::new("a-hgb", "г/дл", 10.0);
/// assert_eq!(conversion.from_unit_lower, "г/дл");
/// assert_eq!(conversion.coefficient, 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitConversion {
    /// The analyte this coefficient applies to.
    pub analyte_id: AnalyteId,
    /// Source unit as written by labs.
    pub from_unit: String,
    /// Lowercased source unit.
    pub from_unit_lower: String,
    /// Multiplier into the standard unit.
    pub coefficient: f64,
}

impl UnitConversion {
    /// Creates a conversion, deriving the lowercased unit.
    pub fn new(analyte_id: impl Into<AnalyteId>, from_unit: impl Into<String>, coefficient: f64) -> Self {
        let from_unit = from_unit.into();
        let from_unit_lower = from_unit.trim().to_lowercase();
        Self {
            analyte_id: analyte_id.into(),
            from_unit,
            from_unit_lower,
            coefficient,
        }
    }
}
