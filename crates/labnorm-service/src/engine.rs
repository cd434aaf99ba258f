//! The embedding facade.

use std::sync::Arc;

use chrono::NaiveDate;
use labnorm_loader::{
    CatalogError, CatalogSnapshot, CatalogSource, CatalogStats, CategoryAggregator, MatcherError,
    ReferenceCatalog, SynonymResolver, TimeSeriesBuilder, TsvCatalogSource,
};
use labnorm_types::{
    AnalyteCount, AnalyteDetails, Category, CategoryGroup, CategoryOverview, DocumentLabResult, LabSeries,
    NormalizedLabResult, RawLabResult,
};
use thiserror::Error;

use crate::config::EngineConfig;

/// Errors returned by engine queries.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The reference catalog is unavailable.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A series matcher could not be built.
    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Result type for engine queries.
pub type EngineResult<T> = Result<T, EngineError>;

/// Query surface of the normalization engine.
///
/// Every query runs over the currently published catalog snapshot; a stale
/// snapshot is served while a refresh runs in the background.
#[derive(Debug, Clone)]
pub struct LabEngine {
    catalog: Arc<ReferenceCatalog>,
}

impl LabEngine {
    /// Creates an engine over an existing catalog handle.
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog }
    }

    /// Creates an engine reading catalog exports from the configured directory.
    ///
    /// The catalog is not loaded until [`LabEngine::load`] is called.
    pub fn from_config(config: &EngineConfig) -> Self {
        let source: Arc<dyn CatalogSource> = Arc::new(
            TsvCatalogSource::new(&config.catalog_path).with_config(config.catalog_config()),
        );
        Self::new(Arc::new(ReferenceCatalog::new(source, config.catalog_config())))
    }

    /// Returns the catalog handle.
    pub fn catalog(&self) -> &Arc<ReferenceCatalog> {
        &self.catalog
    }

    /// Loads (or reloads) the catalog.
    pub async fn load(&self) -> EngineResult<CatalogStats> {
        self.catalog.reload().await?;
        Ok(self.catalog.stats())
    }

    fn snapshot(&self) -> EngineResult<Arc<CatalogSnapshot>> {
        Ok(self
            .catalog
            .current_or_refresh()
            .ok_or(CatalogError::NotLoaded)?)
    }

    /// Builds the series of one analyte from a user's results.
    pub fn build_series<F>(
        &self,
        analyte_name: &str,
        results: &[DocumentLabResult],
        resolve_date: F,
    ) -> EngineResult<LabSeries>
    where
        F: Fn(&str) -> Option<NaiveDate>,
    {
        let snapshot = self.snapshot()?;
        Ok(TimeSeriesBuilder::new(&snapshot).build(analyte_name, results, resolve_date)?)
    }

    /// Returns categories (id, name, icon, sort order) in display order.
    pub fn list_categories(&self) -> EngineResult<Vec<Category>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.categories().to_vec())
    }

    /// Returns the standard unit, category and synonyms of an analyte.
    ///
    /// `name` may be a canonical name or any synonym.
    pub fn get_analyte(&self, name: &str) -> EngineResult<Option<AnalyteDetails>> {
        let snapshot = self.snapshot()?;
        let details = SynonymResolver::new(&snapshot)
            .find(name)
            .and_then(|analyte| snapshot.analyte_details(&analyte.canonical_name));
        Ok(details)
    }

    /// Groups named counts by display category.
    pub fn group_analytes(&self, counts: &[AnalyteCount]) -> EngineResult<Vec<CategoryGroup>> {
        let snapshot = self.snapshot()?;
        Ok(CategoryAggregator::new(&snapshot).group(counts))
    }

    /// Annotates raw results with canonical names and converted values.
    pub fn normalize_results(&self, raws: &[RawLabResult]) -> EngineResult<Vec<NormalizedLabResult>> {
        let snapshot = self.snapshot()?;
        Ok(SynonymResolver::new(&snapshot).normalize_all(raws))
    }

    /// Returns the canonical name a free-text name resolves to.
    pub fn resolve(&self, name: &str, unit_hint: Option<&str>) -> EngineResult<Option<String>> {
        let snapshot = self.snapshot()?;
        Ok(SynonymResolver::new(&snapshot)
            .resolve(name, unit_hint)
            .map(str::to_string))
    }

    /// Returns every catalog analyte grouped by category.
    pub fn catalog_overview(&self) -> EngineResult<Vec<CategoryOverview>> {
        let snapshot = self.snapshot()?;
        Ok(CategoryAggregator::new(&snapshot).catalog_overview())
    }

    /// Returns the sorted canonical names in one category.
    pub fn analytes_in_category(&self, category_name: &str) -> EngineResult<Vec<String>> {
        let snapshot = self.snapshot()?;
        Ok(CategoryAggregator::new(&snapshot)
            .analytes_in_category(category_name)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Returns counts and state of the catalog.
    pub fn stats(&self) -> CatalogStats {
        self.catalog.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use labnorm_loader::CatalogState;

    use super::*;

    fn write_catalog(dir: &Path) {
        fs::write(
            dir.join("categories.tsv"),
            "id\tname\ticon\tsort_order\tis_active\n\
             c-cbc\tОбщий анализ крови\t🩸\t1\t1\n\
             c-bio\tБиохимия\t🧪\t2\t1\n",
        )
        .unwrap();
        fs::write(
            dir.join("analytes.tsv"),
            "id\tcategory_id\tcanonical_name\tstandard_unit\tsort_order\tis_active\n\
             a-hgb\tc-cbc\tГемоглобин\tг/л\t1\t1\n\
             a-lym-pct\tc-cbc\tЛимфоциты (%)\t%\t2\t1\n\
             a-lym-abs\tc-cbc\tЛимфоциты (абс)\t10^9/л\t3\t1\n\
             a-glu\tc-bio\tГлюкоза\tммоль/л\t1\t1\n",
        )
        .unwrap();
        fs::write(
            dir.join("synonyms.tsv"),
            "analyte_id\tsynonym\tsynonym_lower\tis_primary\n\
             a-hgb\tГемоглобин\tгемоглобин\t1\n\
             a-hgb\tHGB\thgb\t0\n\
             a-lym-pct\tЛимфоциты\tлимфоциты\t0\n\
             a-lym-abs\tLYM#\tlym#\t0\n\
             a-glu\tГлюкоза\tглюкоза\t1\n",
        )
        .unwrap();
        fs::write(
            dir.join("unit_conversions.tsv"),
            "analyte_id\tfrom_unit\tfrom_unit_lower\tcoefficient\n\
             a-hgb\tг/дл\tг/дл\t10\n\
             a-glu\tмг/дл\tмг/дл\t0.0555\n",
        )
        .unwrap();
    }

    async fn make_engine() -> (tempfile::TempDir, LabEngine) {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path());
        let config = EngineConfig {
            catalog_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let engine = LabEngine::from_config(&config);
        engine.load().await.unwrap();
        (dir, engine)
    }

    #[tokio::test]
    async fn test_queries_fail_before_load() {
        let config = EngineConfig {
            catalog_path: "/no/such/catalog".into(),
            ..Default::default()
        };
        let engine = LabEngine::from_config(&config);

        assert!(matches!(
            engine.list_categories(),
            Err(EngineError::Catalog(CatalogError::NotLoaded))
        ));
        assert!(engine.load().await.is_err());
    }

    #[tokio::test]
    async fn test_load_reports_stats() {
        let (_dir, engine) = make_engine().await;
        let stats = engine.stats();
        assert_eq!(stats.state, CatalogState::Ready);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.analytes, 4);
    }

    #[tokio::test]
    async fn test_list_categories_and_get_analyte() {
        let (_dir, engine) = make_engine().await;

        let categories = engine.list_categories().unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Общий анализ крови", "Биохимия"]);
        assert_eq!(categories[0].id, "c-cbc");
        assert_eq!(categories[0].icon.as_deref(), Some("🩸"));
        assert_eq!(categories[1].sort_order, 2);

        let details = engine.get_analyte("hgb").unwrap().unwrap();
        assert_eq!(details.canonical_name, "Гемоглобин");
        assert_eq!(details.standard_unit, "г/л");
        assert_eq!(details.category, "Общий анализ крови");
        assert_eq!(details.synonyms, vec!["Гемоглобин", "HGB"]);
        assert!(engine.get_analyte("Ферритин").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_build_series() {
        let (_dir, engine) = make_engine().await;
        let results = vec![
            DocumentLabResult::new("doc-2", RawLabResult::new("HGB", "130", Some("г/л"))),
            DocumentLabResult::new("doc-1", RawLabResult::new("Гемоглобин", "14,5", Some("г/дл"))),
        ];

        let series = engine
            .build_series("Гемоглобин", &results, |doc| match doc {
                "doc-1" => NaiveDate::from_ymd_opt(2024, 1, 10),
                "doc-2" => NaiveDate::from_ymd_opt(2024, 5, 2),
                _ => None,
            })
            .unwrap();

        let values: Vec<f64> = series.points.iter().map(|p| p.value_num).collect();
        assert_eq!(values, vec![145.0, 130.0]);
        assert_eq!(series.standard_unit.as_deref(), Some("г/л"));
    }

    #[tokio::test]
    async fn test_normalize_and_group() {
        let (_dir, engine) = make_engine().await;

        let normalized = engine
            .normalize_results(&[
                RawLabResult::new("Лимфоциты", "1,9", Some("10^9/л")),
                RawLabResult::new("Лимфоциты", "31", Some("%")),
                RawLabResult::new("Глюкоза", "90", Some("мг/дл")),
            ])
            .unwrap();
        assert_eq!(normalized[0].canonical_name.as_deref(), Some("Лимфоциты (абс)"));
        assert_eq!(normalized[1].canonical_name.as_deref(), Some("Лимфоциты (%)"));
        assert!((normalized[2].converted_value.unwrap() - 4.995).abs() < 1e-9);

        let groups = engine
            .group_analytes(&[
                AnalyteCount::new("Глюкоза", 2),
                AnalyteCount::new("HGB", 1),
                AnalyteCount::new("Гемоглобин", 1),
            ])
            .unwrap();
        assert_eq!(groups[0].name, "Общий анализ крови");
        assert_eq!(groups[0].analytes[0].count, 2);
        assert_eq!(groups[1].icon, "🧪");
    }

    #[tokio::test]
    async fn test_overview_and_category_listing() {
        let (_dir, engine) = make_engine().await;

        let overview = engine.catalog_overview().unwrap();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].analytes.len(), 3);

        assert_eq!(
            engine.analytes_in_category("Общий анализ крови").unwrap(),
            vec!["Гемоглобин", "Лимфоциты (%)", "Лимфоциты (абс)"]
        );
        assert_eq!(
            engine.resolve("LYM#", Some("%")).unwrap().as_deref(),
            Some("Лимфоциты (%)")
        );
    }
}
