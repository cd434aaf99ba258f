//! Synonym export parser.
//!
//! Parses the `synonyms` relation: `analyte_id, synonym, synonym_lower[, is_primary]`.

use csv::StringRecord;
use labnorm_types::Synonym;

use crate::parser::{parse, CatalogRecord};
use crate::types::CatalogResult;

/// Expected columns in a synonyms export.
const SYNONYM_COLUMNS: &[&str] = &["analyte_id", "synonym", "synonym_lower"];

impl CatalogRecord for Synonym {
    const EXPECTED_COLUMNS: &'static [&'static str] = SYNONYM_COLUMNS;

    fn from_record(record: &StringRecord) -> CatalogResult<Self> {
        let text = parse::required(parse::field(record, 1), "synonym")?;
        // The stored key is trusted but re-normalized; blank keys are derived.
        let text_lower = match parse::optional(parse::field(record, 2)) {
            Some(lower) => Synonym::lookup_key(&lower),
            None => Synonym::lookup_key(&text),
        };

        Ok(Synonym {
            analyte_id: parse::required(parse::field(record, 0), "analyte_id")?,
            text,
            text_lower,
            is_primary: parse::boolean_or(parse::field(record, 3), false)?,
        })
    }
}
