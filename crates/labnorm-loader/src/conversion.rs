//! Unit conversion export parser.
//!
//! Parses the `unit_conversions` relation:
//! `analyte_id, from_unit, from_unit_lower, coefficient`.

use csv::StringRecord;
use labnorm_types::UnitConversion;

use crate::parser::{parse, CatalogRecord};
use crate::types::CatalogResult;

/// Expected columns in a unit conversions export.
const CONVERSION_COLUMNS: &[&str] = &["analyte_id", "from_unit", "from_unit_lower", "coefficient"];

impl CatalogRecord for UnitConversion {
    const EXPECTED_COLUMNS: &'static [&'static str] = CONVERSION_COLUMNS;

    fn from_record(record: &StringRecord) -> CatalogResult<Self> {
        // An empty unit is legal: it is the identity row of unitless analytes.
        let from_unit = parse::optional(parse::field(record, 1)).unwrap_or_default();
        let from_unit_lower = parse::optional(parse::field(record, 2))
            .map(|u| u.to_lowercase())
            .unwrap_or_else(|| from_unit.to_lowercase());

        Ok(UnitConversion {
            analyte_id: parse::required(parse::field(record, 0), "analyte_id")?,
            from_unit,
            from_unit_lower,
            coefficient: parse::coefficient(parse::field(record, 3))?,
        })
    }
}
