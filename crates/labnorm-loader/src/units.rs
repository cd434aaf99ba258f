//! Lab value parsing and unit conversion.
//!
//! Conversion is a pure lookup over a snapshot's per-analyte coefficient
//! table: `value_std = value_raw × coefficient`. It never fails; unparseable
//! values and unknown units are reported through [`Converted`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use labnorm_types::CanonicalAnalyte;
use regex::Regex;
use tracing::debug;

use crate::snapshot::{CatalogSnapshot, ConversionTable};

/// Parses a lab value as printed on a document.
///
/// Accepts a comma decimal separator and surrounding whitespace. Returns
/// `None` for non-numeric text (`"<5"`, `"отр."`) and for non-finite numbers.
///
/// # Example
///
/// ```
/// use labnorm_loader::parse_lab_value;
///
/// assert_eq!(parse_lab_value(" 4,5 "), Some(4.5));
/// assert_eq!(parse_lab_value("отр."), None);
/// ```
pub fn parse_lab_value(value: &str) -> Option<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// The outcome of converting one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// The value in the standard unit; `None` if the input was not numeric.
    pub value: Option<f64>,
    /// The analyte's standard unit.
    pub standard_unit: String,
    /// The coefficient applied; `None` when the value passed through unconverted.
    pub coefficient: Option<f64>,
}

/// Converts lab values into an analyte's standard unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> UnitConverter<'a> {
    /// Creates a converter over a snapshot.
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Converts `value` given in `from_unit` to the analyte's standard unit.
    ///
    /// A missing or blank unit, or one with no known coefficient, passes the
    /// parsed value through unconverted.
    pub fn convert(
        &self,
        value: &str,
        from_unit: Option<&str>,
        analyte: &CanonicalAnalyte,
    ) -> Converted {
        let standard_unit = analyte.standard_unit.clone();
        let Some(raw) = parse_lab_value(value) else {
            return Converted {
                value: None,
                standard_unit,
                coefficient: None,
            };
        };

        let coefficient = from_unit
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .and_then(|unit| self.coefficient(analyte, unit));

        match coefficient {
            Some(c) => Converted {
                value: Some(raw * c),
                standard_unit,
                coefficient: Some(c),
            },
            None => {
                if let Some(unit) = from_unit.filter(|u| !u.trim().is_empty()) {
                    debug!(
                        "No coefficient for '{}' -> '{}' ({}); passing value through",
                        unit, analyte.standard_unit, analyte.canonical_name
                    );
                }
                Converted {
                    value: Some(raw),
                    standard_unit,
                    coefficient: None,
                }
            }
        }
    }

    /// Converts a value for an analyte named by its canonical name.
    ///
    /// Returns `None` if the name is not a canonical analyte.
    pub fn convert_by_name(
        &self,
        value: &str,
        from_unit: Option<&str>,
        canonical_name: &str,
    ) -> Option<Converted> {
        let analyte = self.snapshot.analyte_by_name(canonical_name)?;
        Some(self.convert(value, from_unit, analyte))
    }

    /// Finds the coefficient for a trimmed, non-empty unit.
    ///
    /// Lookup order: exact spelling, case-insensitive, then canonical label.
    pub fn coefficient(&self, analyte: &CanonicalAnalyte, unit: &str) -> Option<f64> {
        let table = self.snapshot.conversions_for(&analyte.id)?;
        table
            .exact(unit)
            .or_else(|| table.case_insensitive(unit))
            .or_else(|| by_unit_label(table, unit))
    }
}

fn by_unit_label(table: &ConversionTable, unit: &str) -> Option<f64> {
    table.by_label(&normalize_unit_label(Some(unit))?)
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit labels
// ═══════════════════════════════════════════════════════════════════════════

/// Variant spellings mapped to their canonical label.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("п/зр", "п/зр"),
    ("мм/ч", "мм/час"),
    ("ед. pH", "pH"),
    ("ед.pH", "pH"),
    ("г/ дл", "г/дл"),
    ("г/ л", "г/л"),
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// "10*9/л", "х10^9/л", "x10^9/л", "×10^9/л", "10^9/л"
static POWER_OF_TEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[хx×]\s?)?10\s?[*^]\s?(\d+)\s?/\s?л$").expect("valid regex")
});

fn superscript(digits: &str) -> String {
    digits
        .chars()
        .map(|c| match c {
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            other => other,
        })
        .collect()
}

/// Returns the canonical spelling of a unit label.
///
/// Trims, collapses internal whitespace, strips trailing dots and maps known
/// variant spellings. Blank input yields `None`.
///
/// ```
/// use labnorm_loader::normalize_unit_label;
///
/// assert_eq!(normalize_unit_label(Some("10*9/л")).as_deref(), Some("×10⁹/л"));
/// assert_eq!(normalize_unit_label(Some("мм/ч.")).as_deref(), Some("мм/час"));
/// assert_eq!(normalize_unit_label(Some("  ")), None);
/// ```
pub fn normalize_unit_label(unit: Option<&str>) -> Option<String> {
    let unit = unit?.trim();
    if unit.is_empty() {
        return None;
    }

    let collapsed = WHITESPACE.replace_all(unit, " ");
    let mut label = collapsed.trim_end_matches('.').trim_end();
    if label.is_empty() {
        label = collapsed.as_ref();
    }

    if let Some(caps) = POWER_OF_TEN.captures(label) {
        return Some(format!("×10{}/л", superscript(&caps[1])));
    }

    let canonical = UNIT_ALIASES
        .iter()
        .find(|(variant, _)| *variant == label)
        .map_or(label, |(_, canonical)| canonical);
    Some(canonical.to_string())
}

/// Groups raw unit spellings by their canonical label.
///
/// Each group lists distinct spellings in first-seen order; blank units are
/// ignored.
pub fn unit_groups<'u, I>(units: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = Option<&'u str>>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for unit in units {
        let (Some(raw), Some(label)) = (unit, normalize_unit_label(unit)) else {
            continue;
        };
        let members = groups.entry(label).or_default();
        if !members.iter().any(|m| m == raw) {
            members.push(raw.to_string());
        }
    }
    groups
}
