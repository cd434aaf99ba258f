//! Category export parser.
//!
//! Parses the `categories` relation: `id, name, icon, sort_order[, is_active]`.

use csv::StringRecord;
use labnorm_types::Category;

use crate::parser::{parse, CatalogRecord};
use crate::types::{CatalogConfig, CatalogResult};

/// Expected columns in a categories export.
const CATEGORY_COLUMNS: &[&str] = &["id", "name", "icon", "sort_order"];

impl CatalogRecord for Category {
    const EXPECTED_COLUMNS: &'static [&'static str] = CATEGORY_COLUMNS;

    fn from_record(record: &StringRecord) -> CatalogResult<Self> {
        Ok(Category {
            id: parse::required(parse::field(record, 0), "id")?,
            name: parse::required(parse::field(record, 1), "name")?,
            icon: parse::optional(parse::field(record, 2)),
            sort_order: parse::sort_order(parse::field(record, 3))?,
            active: parse::boolean_or(parse::field(record, 4), true)?,
        })
    }

    fn passes_filter(&self, config: &CatalogConfig) -> bool {
        !config.active_only || self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CatalogParser;

    fn make_record(fields: &[&str]) -> StringRecord {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field);
        }
        record
    }

    #[test]
    fn test_parse_category_record() {
        let record = make_record(&["c-cbc", "Общий анализ крови", "🩸", "1", "t"]);

        let category = Category::from_record(&record).unwrap();
        assert_eq!(category.id, "c-cbc");
        assert_eq!(category.name, "Общий анализ крови");
        assert_eq!(category.icon.as_deref(), Some("🩸"));
        assert_eq!(category.sort_order, 1);
        assert!(category.active);
    }

    #[test]
    fn test_missing_active_column_defaults_to_active() {
        let record = make_record(&["c-bio", "Биохимия крови", "", "2"]);
        let category = Category::from_record(&record).unwrap();
        assert!(category.active);
        assert_eq!(category.icon, None);
    }

    #[test]
    fn test_inactive_categories_filtered() {
        let data = "id\tname\ticon\tsort_order\tis_active\n\
                    c-1\tГормоны\t🧬\t5\t1\n\
                    c-2\tАрхив\t\t99\t0\n";
        let parser =
            CatalogParser::<_, Category>::from_reader(data.as_bytes(), CatalogConfig::default())
                .unwrap();
        let (categories, stats) = parser.parse_all();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Гормоны");
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.skipped_records, 1);
    }

    #[test]
    fn test_unexpected_header_rejected() {
        let data = "id\ttitle\ticon\tsort_order\n";
        let result =
            CatalogParser::<_, Category>::from_reader(data.as_bytes(), CatalogConfig::default());
        assert!(matches!(
            result,
            Err(crate::CatalogError::UnexpectedColumn { position: 1, .. })
        ));
    }
}
