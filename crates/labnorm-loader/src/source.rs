//! Backing stores for the reference catalog.
//!
//! A [`CatalogSource`] produces the raw relations of the catalog; the
//! snapshot builder turns them into indexed, immutable lookups.

use std::path::{Path, PathBuf};

use labnorm_types::{CanonicalAnalyte, Category, DualPair, Synonym, UnitConversion};
use tracing::{debug, info};

use crate::loader::discover_catalog_files;
use crate::parser::{CatalogParser, CatalogRecord};
use crate::types::{CatalogConfig, CatalogError, CatalogResult, ParseStats};

/// The raw relations of the reference catalog, as read from a store.
#[derive(Debug, Clone, Default)]
pub struct CatalogRecords {
    /// Display categories.
    pub categories: Vec<Category>,
    /// Canonical analytes.
    pub analytes: Vec<CanonicalAnalyte>,
    /// Synonyms, in store order.
    pub synonyms: Vec<Synonym>,
    /// Unit conversion coefficients.
    pub conversions: Vec<UnitConversion>,
    /// Explicit percentage/absolute pairs (may be empty).
    pub dual_pairs: Vec<DualPair>,
    /// Combined parse counters across every relation.
    pub stats: ParseStats,
    /// Export date of the store, when known.
    pub export_date: Option<String>,
}

/// A persistent store the catalog can be read from.
///
/// `fetch` is blocking; the catalog handle runs it on the blocking pool.
pub trait CatalogSource: Send + Sync {
    /// Reads every relation of the catalog.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached or a relation cannot
    /// be read at all. Individual malformed rows are skipped, not fatal.
    fn fetch(&self) -> CatalogResult<CatalogRecords>;
}

/// A catalog stored as a directory of tab-separated exports.
#[derive(Debug, Clone)]
pub struct TsvCatalogSource {
    dir: PathBuf,
    config: CatalogConfig,
}

impl TsvCatalogSource {
    /// Creates a source reading exports from `dir`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            config: CatalogConfig::default(),
        }
    }

    /// Sets the parse configuration.
    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the export directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CatalogSource for TsvCatalogSource {
    fn fetch(&self) -> CatalogResult<CatalogRecords> {
        let files = discover_catalog_files(&self.dir)?;
        let missing = |relation: &str| CatalogError::RequiredFileMissing {
            relation: relation.to_string(),
            directory: self.dir.display().to_string(),
        };

        let categories_path = files.categories_file.as_deref().ok_or_else(|| missing("categories"))?;
        let analytes_path = files.analytes_file.as_deref().ok_or_else(|| missing("analytes"))?;
        let synonyms_path = files.synonyms_file.as_deref().ok_or_else(|| missing("synonyms"))?;
        let conversions_path = files
            .conversions_file
            .as_deref()
            .ok_or_else(|| missing("unit_conversions"))?;
        let dual_pairs_path = files.dual_pairs_file.as_deref();

        let (categories, analytes, synonyms, conversions, dual_pairs) = read_relations(
            &self.config,
            categories_path,
            analytes_path,
            synonyms_path,
            conversions_path,
            dual_pairs_path,
        );

        let (categories, category_stats) = categories?;
        let (analytes, analyte_stats) = analytes?;
        let (synonyms, synonym_stats) = synonyms?;
        let (conversions, conversion_stats) = conversions?;
        let (dual_pairs, dual_pair_stats) = match dual_pairs {
            Some(result) => result?,
            None => (Vec::new(), ParseStats::default()),
        };

        let mut stats = ParseStats::default();
        for s in [
            &category_stats,
            &analyte_stats,
            &synonym_stats,
            &conversion_stats,
            &dual_pair_stats,
        ] {
            stats.merge(s);
        }

        info!(
            "Read catalog exports from {}: {} categories, {} analytes, {} synonyms, {} conversions, {} dual pairs ({} rows skipped, {} malformed)",
            self.dir.display(),
            categories.len(),
            analytes.len(),
            synonyms.len(),
            conversions.len(),
            dual_pairs.len(),
            stats.skipped_records,
            stats.error_count
        );

        Ok(CatalogRecords {
            categories,
            analytes,
            synonyms,
            conversions,
            dual_pairs,
            stats,
            export_date: files.export_date,
        })
    }
}

type Parsed<T> = CatalogResult<(Vec<T>, ParseStats)>;

/// Parses one relation export completely.
fn parse_relation<T: CatalogRecord>(path: &Path, config: &CatalogConfig) -> Parsed<T> {
    let parser = CatalogParser::<_, T>::from_path(path, config.clone())?;
    let (records, stats) = parser.parse_all();
    debug!(
        "Parsed {}: {} kept, {} skipped, {} malformed",
        path.display(),
        stats.filtered_records,
        stats.skipped_records,
        stats.error_count
    );
    Ok((records, stats))
}

/// Reads every relation, each export concurrently.
#[cfg(feature = "parallel")]
fn read_relations(
    config: &CatalogConfig,
    categories: &Path,
    analytes: &Path,
    synonyms: &Path,
    conversions: &Path,
    dual_pairs: Option<&Path>,
) -> (
    Parsed<Category>,
    Parsed<CanonicalAnalyte>,
    Parsed<Synonym>,
    Parsed<UnitConversion>,
    Option<Parsed<DualPair>>,
) {
    let ((categories, analytes), ((synonyms, conversions), dual_pairs)) = rayon::join(
        || {
            rayon::join(
                || parse_relation::<Category>(categories, config),
                || parse_relation::<CanonicalAnalyte>(analytes, config),
            )
        },
        || {
            rayon::join(
                || {
                    rayon::join(
                        || parse_relation::<Synonym>(synonyms, config),
                        || parse_relation::<UnitConversion>(conversions, config),
                    )
                },
                || dual_pairs.map(|p| parse_relation::<DualPair>(p, config)),
            )
        },
    );

    (categories, analytes, synonyms, conversions, dual_pairs)
}

/// Reads every relation sequentially.
#[cfg(not(feature = "parallel"))]
fn read_relations(
    config: &CatalogConfig,
    categories: &Path,
    analytes: &Path,
    synonyms: &Path,
    conversions: &Path,
    dual_pairs: Option<&Path>,
) -> (
    Parsed<Category>,
    Parsed<CanonicalAnalyte>,
    Parsed<Synonym>,
    Parsed<UnitConversion>,
    Option<Parsed<DualPair>>,
) {
    (
        parse_relation::<Category>(categories, config),
        parse_relation::<CanonicalAnalyte>(analytes, config),
        parse_relation::<Synonym>(synonyms, config),
        parse_relation::<UnitConversion>(conversions, config),
        dual_pairs.map(|p| parse_relation::<DualPair>(p, config)),
    )
}

/// A catalog held in memory.
///
/// Useful for embedding a fixed catalog and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    records: CatalogRecords,
}

impl StaticCatalogSource {
    /// Creates a source serving `records` on every fetch.
    pub fn new(records: CatalogRecords) -> Self {
        Self { records }
    }
}

impl CatalogSource for StaticCatalogSource {
    fn fetch(&self) -> CatalogResult<CatalogRecords> {
        Ok(self.records.clone())
    }
}
