//! Dual pair export parser.
//!
//! Parses the optional `dual_pairs` relation: `percent_analyte_id, absolute_analyte_id`.

use csv::StringRecord;
use labnorm_types::DualPair;

use crate::parser::{parse, CatalogRecord};
use crate::types::CatalogResult;

/// Expected columns in a dual pairs export.
const DUAL_PAIR_COLUMNS: &[&str] = &["percent_analyte_id", "absolute_analyte_id"];

impl CatalogRecord for DualPair {
    const EXPECTED_COLUMNS: &'static [&'static str] = DUAL_PAIR_COLUMNS;

    fn from_record(record: &StringRecord) -> CatalogResult<Self> {
        Ok(DualPair {
            percent_analyte_id: parse::required(parse::field(record, 0), "percent_analyte_id")?,
            absolute_analyte_id: parse::required(parse::field(record, 1), "absolute_analyte_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CatalogParser;
    use crate::types::CatalogConfig;

    #[test]
    fn test_parse_dual_pairs() {
        let data = "percent_analyte_id\tabsolute_analyte_id\n\
                    a-lym-pct\ta-lym-abs\n\
                    a-neu-pct\t\n";
        let parser =
            CatalogParser::<_, DualPair>::from_reader(data.as_bytes(), CatalogConfig::default())
                .unwrap();
        let (pairs, stats) = parser.parse_all();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].absolute_analyte_id, "a-lym-abs");
        assert_eq!(stats.error_count, 1);
    }
}
