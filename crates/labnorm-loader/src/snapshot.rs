//! Immutable in-memory reference catalog.
//!
//! A [`CatalogSnapshot`] is built in one pass from the raw relations of a
//! [`CatalogSource`] and never mutated afterwards. Reloading builds a new
//! snapshot and swaps the published reference (see [`crate::ReferenceCatalog`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use labnorm_types::{
    AnalyteDetails, AnalyteId, CanonicalAnalyte, Category, CategoryId, DualClass, Synonym,
};
use tracing::{debug, info, warn};

use crate::source::{CatalogRecords, CatalogSource};
use crate::types::{CatalogConfig, CatalogResult, ParseStats};
use crate::units::normalize_unit_label;

/// Conversion coefficients of one analyte, keyed by source unit.
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    exact: HashMap<String, f64>,
    lower: HashMap<String, f64>,
    /// Keyed by [`normalize_unit_label`]; the first stored spelling wins.
    labels: HashMap<String, f64>,
}

impl ConversionTable {
    fn insert(&mut self, unit: &str, unit_lower: &str, coefficient: f64) {
        self.exact.entry(unit.trim().to_string()).or_insert(coefficient);
        self.lower
            .entry(unit_lower.trim().to_lowercase())
            .or_insert(coefficient);
        if let Some(label) = normalize_unit_label(Some(unit)) {
            self.labels.entry(label).or_insert(coefficient);
        }
    }

    /// Forces the identity coefficient for the analyte's standard unit.
    fn ensure_identity(&mut self, standard_unit: &str) -> bool {
        let unit = standard_unit.trim();
        let previous = self.exact.insert(unit.to_string(), 1.0);
        self.lower.insert(unit.to_lowercase(), 1.0);
        if let Some(label) = normalize_unit_label(Some(unit)) {
            self.labels.insert(label, 1.0);
        }
        matches!(previous, Some(c) if c != 1.0)
    }

    /// Looks up a unit spelled exactly as stored.
    pub fn exact(&self, unit: &str) -> Option<f64> {
        self.exact.get(unit).copied()
    }

    /// Looks up a unit ignoring case.
    pub fn case_insensitive(&self, unit: &str) -> Option<f64> {
        self.lower.get(&unit.to_lowercase()).copied()
    }

    /// Looks up a canonical unit label (see [`normalize_unit_label`]).
    pub fn by_label(&self, label: &str) -> Option<f64> {
        self.labels.get(label).copied()
    }

    /// Returns the number of distinct spellings.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Returns true if the table holds no coefficients.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Data-quality counters collected while building a snapshot.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Parse counters reported by the source.
    pub parse: ParseStats,
    /// Inactive rows dropped by the builder.
    pub inactive_skipped: usize,
    /// Analytes dropped because their category is not in the snapshot.
    pub orphan_analytes: usize,
    /// Synonyms whose key was already taken by an earlier row.
    pub duplicate_synonyms: usize,
    /// Synonyms and conversions referring to unknown analytes.
    pub dangling_rows: usize,
    /// Stored standard-unit coefficients that were not 1.0.
    pub corrected_identities: usize,
}

/// An immutable, indexed view of the reference catalog.
pub struct CatalogSnapshot {
    /// Categories ordered by sort order.
    categories: Vec<Category>,
    category_by_id: HashMap<CategoryId, usize>,
    /// Analytes ordered by category sort order, then analyte sort order.
    analytes: Vec<CanonicalAnalyte>,
    analyte_by_id: HashMap<AnalyteId, usize>,
    analyte_by_name: HashMap<String, usize>,
    /// Lowercased, trimmed text to analyte.
    synonym_index: HashMap<String, usize>,
    synonyms_by_analyte: HashMap<AnalyteId, Vec<String>>,
    conversions: HashMap<AnalyteId, ConversionTable>,
    /// Percentage/absolute partners, both directions.
    dual_partners: HashMap<AnalyteId, (DualClass, usize)>,
    loaded_at: DateTime<Utc>,
    export_date: Option<String>,
    stats: BuildStats,
}

impl std::fmt::Debug for CatalogSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSnapshot")
            .field("categories", &self.categories.len())
            .field("analytes", &self.analytes.len())
            .field("synonym_index", &self.synonym_index.len())
            .field("conversions", &self.conversions.len())
            .field("dual_partners", &self.dual_partners.len())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl CatalogSnapshot {
    /// Reads the store and builds a snapshot.
    ///
    /// # Errors
    /// Returns the source's error if the store cannot be read.
    pub fn load(source: &dyn CatalogSource, config: &CatalogConfig) -> CatalogResult<Self> {
        let records = source.fetch()?;
        Ok(Self::build(records, config))
    }

    /// Builds a snapshot from raw relations.
    ///
    /// Rows that violate catalog invariants are dropped and counted; building
    /// never fails.
    pub fn build(records: CatalogRecords, config: &CatalogConfig) -> Self {
        let CatalogRecords {
            mut categories,
            analytes,
            synonyms,
            conversions,
            dual_pairs,
            stats: parse_stats,
            export_date,
        } = records;

        let mut stats = BuildStats {
            parse: parse_stats,
            ..Default::default()
        };

        if config.active_only {
            let before = categories.len();
            categories.retain(|c| c.active);
            stats.inactive_skipped += before - categories.len();
        }
        categories.sort_by_key(|c| c.sort_order);

        let category_by_id: HashMap<CategoryId, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        // Keyed by (category position, analyte sort order); stable sort keeps
        // store order for ties.
        let mut keyed: Vec<(usize, CanonicalAnalyte)> = Vec::with_capacity(analytes.len());
        for analyte in analytes {
            if config.active_only && !analyte.active {
                stats.inactive_skipped += 1;
                continue;
            }
            match category_by_id.get(&analyte.category_id) {
                Some(&position) => keyed.push((position, analyte)),
                None => {
                    stats.orphan_analytes += 1;
                    warn!(
                        "Skipping analyte '{}' ({}): category {} is not in the catalog",
                        analyte.canonical_name, analyte.id, analyte.category_id
                    );
                }
            }
        }
        keyed.sort_by_key(|(position, a)| (*position, a.sort_order));
        let analytes: Vec<CanonicalAnalyte> = keyed.into_iter().map(|(_, a)| a).collect();

        let mut analyte_by_id = HashMap::with_capacity(analytes.len());
        let mut analyte_by_name = HashMap::with_capacity(analytes.len());
        for (i, analyte) in analytes.iter().enumerate() {
            analyte_by_id.insert(analyte.id.clone(), i);
            analyte_by_name.entry(analyte.canonical_name.clone()).or_insert(i);
        }

        let mut synonym_index: HashMap<String, usize> = HashMap::with_capacity(synonyms.len());
        let mut synonyms_by_analyte: HashMap<AnalyteId, Vec<String>> = HashMap::new();
        for synonym in synonyms {
            let Some(&target) = analyte_by_id.get(&synonym.analyte_id) else {
                stats.dangling_rows += 1;
                debug!(
                    "Ignoring synonym '{}' of unknown analyte {}",
                    synonym.text, synonym.analyte_id
                );
                continue;
            };
            if let Some(&existing) = synonym_index.get(&synonym.text_lower) {
                stats.duplicate_synonyms += 1;
                warn!(
                    "Duplicate synonym '{}' for analyte {}; keeping mapping to {}",
                    synonym.text, synonym.analyte_id, analytes[existing].id
                );
                continue;
            }
            synonym_index.insert(synonym.text_lower, target);
            synonyms_by_analyte
                .entry(synonym.analyte_id)
                .or_default()
                .push(synonym.text);
        }

        // Canonical names resolve to themselves unless a synonym already claimed them.
        for (i, analyte) in analytes.iter().enumerate() {
            synonym_index
                .entry(Synonym::lookup_key(&analyte.canonical_name))
                .or_insert(i);
        }

        let mut conversion_tables: HashMap<AnalyteId, ConversionTable> = HashMap::new();
        for conversion in conversions {
            if !analyte_by_id.contains_key(&conversion.analyte_id) {
                stats.dangling_rows += 1;
                debug!(
                    "Ignoring conversion from '{}' for unknown analyte {}",
                    conversion.from_unit, conversion.analyte_id
                );
                continue;
            }
            conversion_tables
                .entry(conversion.analyte_id)
                .or_default()
                .insert(
                    &conversion.from_unit,
                    &conversion.from_unit_lower,
                    conversion.coefficient,
                );
        }
        for analyte in &analytes {
            let table = conversion_tables.entry(analyte.id.clone()).or_default();
            if table.ensure_identity(&analyte.standard_unit) {
                stats.corrected_identities += 1;
                warn!(
                    "Coefficient for standard unit '{}' of '{}' was not 1.0; using 1.0",
                    analyte.standard_unit, analyte.canonical_name
                );
            }
        }

        let mut dual_partners: HashMap<AnalyteId, (DualClass, usize)> = HashMap::new();
        for pair in &dual_pairs {
            match (
                analyte_by_id.get(&pair.percent_analyte_id),
                analyte_by_id.get(&pair.absolute_analyte_id),
            ) {
                (Some(&pct), Some(&abs)) => {
                    dual_partners.insert(pair.percent_analyte_id.clone(), (DualClass::Percentage, abs));
                    dual_partners.insert(pair.absolute_analyte_id.clone(), (DualClass::Absolute, pct));
                }
                _ => {
                    stats.dangling_rows += 1;
                    warn!(
                        "Ignoring dual pair {} / {}: analyte not in the catalog",
                        pair.percent_analyte_id, pair.absolute_analyte_id
                    );
                }
            }
        }
        for (i, analyte) in analytes.iter().enumerate() {
            if dual_partners.contains_key(&analyte.id) {
                continue;
            }
            let (Some(class), Some(partner_name)) =
                (analyte.dual_class(), analyte.dual_partner_name())
            else {
                continue;
            };
            if let Some(&partner) = analyte_by_name.get(&partner_name) {
                if !dual_partners.contains_key(&analytes[partner].id) {
                    dual_partners.insert(analyte.id.clone(), (class, partner));
                    dual_partners.insert(analytes[partner].id.clone(), (class.opposite(), i));
                }
            }
        }

        let snapshot = Self {
            categories,
            category_by_id,
            analytes,
            analyte_by_id,
            analyte_by_name,
            synonym_index,
            synonyms_by_analyte,
            conversions: conversion_tables,
            dual_partners,
            loaded_at: Utc::now(),
            export_date,
            stats,
        };

        info!(
            "Built catalog snapshot: {} categories, {} analytes, {} synonyms, {} conversion units, {} dual analytes",
            snapshot.category_count(),
            snapshot.analyte_count(),
            snapshot.synonym_count(),
            snapshot.conversion_count(),
            snapshot.dual_partners.len()
        );
        if snapshot.stats.duplicate_synonyms > 0 || snapshot.stats.orphan_analytes > 0 {
            warn!(
                "Catalog data issues: {} duplicate synonyms, {} orphan analytes, {} dangling rows",
                snapshot.stats.duplicate_synonyms,
                snapshot.stats.orphan_analytes,
                snapshot.stats.dangling_rows
            );
        }

        snapshot
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Categories
    // ═══════════════════════════════════════════════════════════════════════

    /// Returns categories in display order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns category names in display order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Gets a category by id.
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.category_by_id.get(id).map(|&i| &self.categories[i])
    }

    /// Gets a category by display name.
    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Returns the position of a category name in display order.
    pub fn category_position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Analytes
    // ═══════════════════════════════════════════════════════════════════════

    /// Returns analytes in display order.
    pub fn analytes(&self) -> &[CanonicalAnalyte] {
        &self.analytes
    }

    /// Gets an analyte by id.
    pub fn analyte(&self, id: &str) -> Option<&CanonicalAnalyte> {
        self.analyte_by_id.get(id).map(|&i| &self.analytes[i])
    }

    /// Gets an analyte by its exact canonical name (surrounding whitespace ignored).
    pub fn analyte_by_name(&self, canonical_name: &str) -> Option<&CanonicalAnalyte> {
        self.analyte_by_name
            .get(canonical_name.trim())
            .map(|&i| &self.analytes[i])
    }

    /// Returns the category an analyte belongs to.
    pub fn category_of(&self, analyte: &CanonicalAnalyte) -> Option<&Category> {
        self.category(&analyte.category_id)
    }

    /// Looks up a normalized synonym key (see [`Synonym::lookup_key`]).
    pub fn lookup_synonym(&self, key: &str) -> Option<&CanonicalAnalyte> {
        self.synonym_index.get(key).map(|&i| &self.analytes[i])
    }

    /// Returns the registered synonyms of an analyte, in load order.
    pub fn synonyms_of(&self, analyte_id: &str) -> &[String] {
        self.synonyms_by_analyte
            .get(analyte_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the conversion table of an analyte.
    pub fn conversions_for(&self, analyte_id: &str) -> Option<&ConversionTable> {
        self.conversions.get(analyte_id)
    }

    /// Returns the dual class of an analyte that has a partner in the catalog.
    pub fn dual_class(&self, analyte_id: &str) -> Option<DualClass> {
        self.dual_partners.get(analyte_id).map(|(class, _)| *class)
    }

    /// Returns the other variant of a dual analyte.
    pub fn dual_partner(&self, analyte_id: &str) -> Option<&CanonicalAnalyte> {
        self.dual_partners
            .get(analyte_id)
            .map(|(_, i)| &self.analytes[*i])
    }

    /// Returns the standard unit, category and synonyms of an analyte.
    pub fn analyte_details(&self, canonical_name: &str) -> Option<AnalyteDetails> {
        let analyte = self.analyte_by_name(canonical_name)?;
        Some(AnalyteDetails {
            canonical_name: analyte.canonical_name.clone(),
            standard_unit: analyte.standard_unit.clone(),
            category: self
                .category_of(analyte)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            synonyms: self.synonyms_of(&analyte.id).to_vec(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statistics
    // ═══════════════════════════════════════════════════════════════════════

    /// Returns the number of categories.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Returns the number of analytes.
    pub fn analyte_count(&self) -> usize {
        self.analytes.len()
    }

    /// Returns the number of indexed synonym keys, canonical names included.
    pub fn synonym_count(&self) -> usize {
        self.synonym_index.len()
    }

    /// Returns the number of stored unit spellings across all analytes.
    pub fn conversion_count(&self) -> usize {
        self.conversions.values().map(ConversionTable::len).sum()
    }

    /// Returns when this snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Returns the export date of the store, when known.
    pub fn export_date(&self) -> Option<&str> {
        self.export_date.as_deref()
    }

    /// Returns data-quality counters from the build.
    pub fn build_stats(&self) -> &BuildStats {
        &self.stats
    }
}
