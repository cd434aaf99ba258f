//! Well-known catalog conventions.
//!
//! The percentage and absolute forms of a differential count are stored as
//! two canonical analytes whose names differ only by a suffix:
//!
//! ```
//! use labnorm_types::well_known;
//!
//! assert_eq!(
//!     well_known::dual_partner_name("Нейтрофилы (абс)").as_deref(),
//!     Some("Нейтрофилы (%)")
//! );
//! assert_eq!(well_known::dual_partner_name("Гемоглобин"), None);
//! ```

use crate::DualClass;

/// Canonical-name suffix of the percentage variant of a dual analyte.
pub const PERCENT_SUFFIX: &str = "(%)";

/// Canonical-name suffix of the absolute-count variant of a dual analyte.
pub const ABSOLUTE_SUFFIX: &str = "(абс)";

/// Marker that classifies a unit as a percentage.
pub const PERCENT_MARKER: char = '%';

/// Category assigned to names the catalog cannot resolve.
pub const UNCATEGORIZED: &str = "Другое";

/// Icon used for categories stored without one.
pub const DEFAULT_CATEGORY_ICON: &str = "📋";

/// Returns true if a unit label denotes a percentage.
pub fn is_percentage_unit(unit: &str) -> bool {
    unit.contains(PERCENT_MARKER)
}

/// Classifies a canonical name by its dual suffix.
pub fn dual_class_of(canonical_name: &str) -> Option<DualClass> {
    let name = canonical_name.trim_end();
    if name.ends_with(PERCENT_SUFFIX) {
        Some(DualClass::Percentage)
    } else if name.ends_with(ABSOLUTE_SUFFIX) {
        Some(DualClass::Absolute)
    } else {
        None
    }
}

/// Returns the name without its dual suffix, if it carries one.
pub fn dual_base_name(canonical_name: &str) -> Option<&str> {
    let name = canonical_name.trim_end();
    name.strip_suffix(PERCENT_SUFFIX)
        .or_else(|| name.strip_suffix(ABSOLUTE_SUFFIX))
        .map(str::trim_end)
}

/// Builds the canonical name of the other variant of a dual analyte.
///
/// Returns `None` when the name carries neither suffix.
pub fn dual_partner_name(canonical_name: &str) -> Option<String> {
    let base = dual_base_name(canonical_name)?;
    let suffix = match dual_class_of(canonical_name)? {
        DualClass::Percentage => ABSOLUTE_SUFFIX,
        DualClass::Absolute => PERCENT_SUFFIX,
    };
    Some(format!("{base} {suffix}"))
}
