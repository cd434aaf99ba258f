//! Analyte export parser.
//!
//! Parses the `analytes` relation:
//! `id, category_id, canonical_name, standard_unit[, sort_order, is_active]`.

use csv::StringRecord;
use labnorm_types::CanonicalAnalyte;

use crate::parser::{parse, CatalogRecord};
use crate::types::{CatalogConfig, CatalogResult};

/// Expected columns in an analytes export.
const ANALYTE_COLUMNS: &[&str] = &["id", "category_id", "canonical_name", "standard_unit"];

impl CatalogRecord for CanonicalAnalyte {
    const EXPECTED_COLUMNS: &'static [&'static str] = ANALYTE_COLUMNS;

    fn from_record(record: &StringRecord) -> CatalogResult<Self> {
        Ok(CanonicalAnalyte {
            id: parse::required(parse::field(record, 0), "id")?,
            category_id: parse::required(parse::field(record, 1), "category_id")?,
            canonical_name: parse::required(parse::field(record, 2), "canonical_name")?,
            // Qualitative tests (serology, cultures) have no unit.
            standard_unit: parse::optional(parse::field(record, 3)).unwrap_or_default(),
            sort_order: parse::sort_order(parse::field(record, 4))?,
            active: parse::boolean_or(parse::field(record, 5), true)?,
        })
    }

    fn passes_filter(&self, config: &CatalogConfig) -> bool {
        !config.active_only || self.active
    }
}
