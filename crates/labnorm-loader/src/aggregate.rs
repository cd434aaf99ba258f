//! Category grouping of analytes.

use std::collections::HashMap;

use labnorm_types::{
    well_known, AnalyteCount, CategoryGroup, CategoryOverview, GroupedAnalyte,
};
use tracing::debug;

use crate::resolver::SynonymResolver;
use crate::snapshot::CatalogSnapshot;

/// Groups analytes into display categories.
#[derive(Debug, Clone, Copy)]
pub struct CategoryAggregator<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> CategoryAggregator<'a> {
    /// Creates an aggregator over a snapshot.
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Groups named counts by category.
    ///
    /// Names resolving to the same canonical analyte are merged and their
    /// counts summed. Names the catalog does not know keep their trimmed text
    /// and land in the uncategorized bucket. Catalog categories come first in
    /// catalog order; any others follow in first-seen order.
    pub fn group(&self, entries: &[AnalyteCount]) -> Vec<CategoryGroup> {
        let resolver = SynonymResolver::new(self.snapshot);

        let mut groups: Vec<CategoryGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut analyte_index: HashMap<(usize, String), usize> = HashMap::new();

        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                continue;
            }

            let (canonical_name, standard_unit, category) = match resolver.find(name) {
                Some(analyte) => (
                    analyte.canonical_name.clone(),
                    Some(analyte.standard_unit.clone()).filter(|u| !u.is_empty()),
                    self.snapshot
                        .category_of(analyte)
                        .map_or(well_known::UNCATEGORIZED, |c| c.name.as_str()),
                ),
                None => {
                    debug!("'{}' is not in the catalog; grouping as uncategorized", name);
                    (name.to_string(), None, well_known::UNCATEGORIZED)
                }
            };

            let group = *group_index.entry(category.to_string()).or_insert_with(|| {
                groups.push(CategoryGroup {
                    name: category.to_string(),
                    icon: self.icon_for(category),
                    analytes: Vec::new(),
                });
                groups.len() - 1
            });

            match analyte_index.get(&(group, canonical_name.clone())) {
                Some(&i) => groups[group].analytes[i].count += entry.count,
                None => {
                    let analytes = &mut groups[group].analytes;
                    analyte_index.insert((group, canonical_name.clone()), analytes.len());
                    analytes.push(GroupedAnalyte {
                        canonical_name,
                        standard_unit,
                        count: entry.count,
                    });
                }
            }
        }

        for group in &mut groups {
            group
                .analytes
                .sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        }
        // Stable: categories outside the catalog keep first-seen order.
        groups.sort_by_key(|g| self.snapshot.category_position(&g.name).unwrap_or(usize::MAX));

        groups
    }

    /// Returns every catalog analyte grouped by category.
    ///
    /// Categories without analytes are omitted.
    pub fn catalog_overview(&self) -> Vec<CategoryOverview> {
        self.snapshot
            .categories()
            .iter()
            .filter_map(|category| {
                let mut analytes: Vec<_> = self
                    .snapshot
                    .analytes()
                    .iter()
                    .filter(|a| a.category_id == category.id)
                    .filter_map(|a| self.snapshot.analyte_details(&a.canonical_name))
                    .collect();
                if analytes.is_empty() {
                    return None;
                }
                analytes.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
                Some(CategoryOverview {
                    name: category.name.clone(),
                    icon: category.icon_or_default().to_string(),
                    analytes,
                })
            })
            .collect()
    }

    /// Returns the sorted canonical names of a category's analytes.
    pub fn analytes_in_category(&self, category_name: &str) -> Vec<&'a str> {
        let Some(category) = self.snapshot.category_by_name(category_name) else {
            return Vec::new();
        };
        let mut names: Vec<&'a str> = self
            .snapshot
            .analytes()
            .iter()
            .filter(|a| a.category_id == category.id)
            .map(|a| a.canonical_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    fn icon_for(&self, category_name: &str) -> String {
        self.snapshot
            .category_by_name(category_name)
            .map_or(well_known::DEFAULT_CATEGORY_ICON, |c| c.icon_or_default())
            .to_string()
    }
}
