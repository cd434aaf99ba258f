//! # labnorm-loader
//!
//! Reference catalog loading and the lab analyte normalization engine.
//!
//! The catalog (categories, canonical analytes, synonyms and unit conversion
//! coefficients) is read from a [`CatalogSource`] into an immutable
//! [`CatalogSnapshot`]. Every query runs synchronously over a snapshot:
//!
//! - [`SynonymResolver`] maps free-text test names to canonical analytes,
//!   using the unit to pick the percentage or absolute variant of a
//!   differential count.
//! - [`UnitConverter`] converts values into an analyte's standard unit.
//! - [`TimeSeriesBuilder`] turns one user's results into an ordered,
//!   unit-consistent series for one analyte.
//! - [`CategoryAggregator`] groups analytes into display categories.
//!
//! [`ReferenceCatalog`] publishes the current snapshot and replaces it
//! atomically on reload.
//!
//! ## Features
//!
//! - `parallel` (default): Reads the catalog exports concurrently via rayon.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use labnorm_loader::{CatalogConfig, ReferenceCatalog, SynonymResolver, TsvCatalogSource};
//!
//! # async fn run() -> labnorm_loader::CatalogResult<()> {
//! let source = Arc::new(TsvCatalogSource::new("./catalog"));
//! let catalog = ReferenceCatalog::new(source, CatalogConfig::default());
//! let snapshot = catalog.reload().await?;
//!
//! let resolver = SynonymResolver::new(&snapshot);
//! assert_eq!(resolver.resolve("Лимфоциты", Some("%")), Some("Лимфоциты (%)"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregate;
mod analyte;
mod catalog;
mod category;
mod conversion;
mod dual_pair;
pub mod loader;
mod matcher;
pub mod parser;
mod resolver;
mod series;
mod snapshot;
mod source;
mod synonym;
pub mod types;
mod units;

pub use aggregate::CategoryAggregator;
pub use catalog::{CatalogState, CatalogStats, ReferenceCatalog};
pub use loader::discover_catalog_files;
pub use matcher::{build_synonym_matcher, SynonymMatcher};
pub use parser::{CatalogParser, CatalogRecord};
pub use resolver::SynonymResolver;
pub use series::TimeSeriesBuilder;
pub use snapshot::{BuildStats, CatalogSnapshot, ConversionTable};
pub use source::{CatalogRecords, CatalogSource, StaticCatalogSource, TsvCatalogSource};
pub use types::{
    CatalogConfig, CatalogError, CatalogFiles, CatalogResult, MatcherError, ParseStats, DEFAULT_TTL,
};
pub use units::{normalize_unit_label, parse_lab_value, unit_groups, Converted, UnitConverter};

// Re-export labnorm-types for convenience
pub use labnorm_types;

#[cfg(test)]
pub(crate) mod fixtures {
    //! A small catalog shared by the unit tests.

    use labnorm_types::{CanonicalAnalyte, Category, Synonym, UnitConversion};

    use crate::snapshot::CatalogSnapshot;
    use crate::source::CatalogRecords;
    use crate::types::CatalogConfig;

    pub fn make_category(id: &str, name: &str, sort_order: i32) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            icon: None,
            sort_order,
            active: true,
        }
    }

    pub fn make_analyte(
        id: &str,
        category_id: &str,
        name: &str,
        unit: &str,
        sort_order: i32,
    ) -> CanonicalAnalyte {
        CanonicalAnalyte {
            id: id.to_string(),
            canonical_name: name.to_string(),
            category_id: category_id.to_string(),
            standard_unit: unit.to_string(),
            sort_order,
            active: true,
        }
    }

    pub fn sample_records() -> CatalogRecords {
        let mut cbc = make_category("c-cbc", "Общий анализ крови", 1);
        cbc.icon = Some("🩸".to_string());
        let mut infections = make_category("c-inf", "Инфекции", 3);
        infections.icon = Some("🦠".to_string());

        let mut retired = make_analyte("a-old", "c-bio", "Тимоловая проба", "ед", 9);
        retired.active = false;

        let synonyms = [
            ("a-hgb", "Гемоглобин"),
            ("a-hgb", "HGB"),
            ("a-hgb", "Hb"),
            ("a-lym-pct", "Лимфоциты"),
            ("a-lym-pct", "LYM%"),
            ("a-lym-abs", "LYM#"),
            ("a-lym-abs", "Лимфоциты абс."),
            ("a-neu-pct", "Нейтрофилы"),
            ("a-neu-pct", "NEU%"),
            ("a-neu-abs", "NEU#"),
            ("a-esr", "СОЭ"),
            ("a-esr", "ESR"),
            ("a-glu", "Глюкоза"),
            ("a-glu", "GLU"),
            // Collides with hemoglobin's "HGB".
            ("a-glu", "hgb"),
            ("a-alt", "АЛТ"),
            ("a-alt", "ALT"),
        ];

        CatalogRecords {
            // Store order differs from display order on purpose.
            categories: vec![
                make_category("c-bio", "Биохимия", 2),
                infections,
                cbc,
            ],
            analytes: vec![
                make_analyte("a-hgb", "c-cbc", "Гемоглобин", "г/л", 1),
                make_analyte("a-lym-pct", "c-cbc", "Лимфоциты (%)", "%", 2),
                make_analyte("a-glu", "c-bio", "Глюкоза", "ммоль/л", 1),
                make_analyte("a-lym-abs", "c-cbc", "Лимфоциты (абс)", "10^9/л", 3),
                make_analyte("a-neu-pct", "c-cbc", "Нейтрофилы (%)", "%", 4),
                make_analyte("a-neu-abs", "c-cbc", "Нейтрофилы (абс)", "10^9/л", 5),
                make_analyte("a-esr", "c-cbc", "СОЭ", "мм/час", 6),
                make_analyte("a-alt", "c-bio", "АЛТ", "Ед/л", 2),
                retired,
            ],
            synonyms: synonyms
                .iter()
                .map(|(id, text)| Synonym::new(*id, *text))
                .collect(),
            conversions: vec![
                UnitConversion::new("a-hgb", "г/дл", 10.0),
                UnitConversion::new("a-glu", "мг/дл", 0.0555),
                UnitConversion::new("a-lym-abs", "тыс/мкл", 1.0),
                UnitConversion::new("a-neu-abs", "тыс/мкл", 1.0),
            ],
            ..Default::default()
        }
    }

    pub fn sample_snapshot() -> CatalogSnapshot {
        CatalogSnapshot::build(sample_records(), &CatalogConfig::default())
    }
}
