//! Free-text test name resolution.

use labnorm_types::{well_known, CanonicalAnalyte, NormalizedLabResult, RawLabResult, Synonym};
use tracing::debug;

use crate::snapshot::CatalogSnapshot;
use crate::units::UnitConverter;

/// Maps free-text test names to canonical analytes.
///
/// A bare name such as "Лимфоциты" is registered for one half of a dual
/// pair; the unit hint picks the percentage or absolute variant.
#[derive(Debug, Clone, Copy)]
pub struct SynonymResolver<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> SynonymResolver<'a> {
    /// Creates a resolver over a snapshot.
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Resolves a name to its canonical name.
    ///
    /// Matching ignores case and surrounding whitespace. Returns `None` when
    /// the name is not in the catalog.
    pub fn resolve(&self, name: &str, unit_hint: Option<&str>) -> Option<&'a str> {
        self.resolve_analyte(name, unit_hint)
            .map(|a| a.canonical_name.as_str())
    }

    /// Resolves a name to its canonical analyte.
    pub fn resolve_analyte(&self, name: &str, unit_hint: Option<&str>) -> Option<&'a CanonicalAnalyte> {
        let matched = self.snapshot.lookup_synonym(&Synonym::lookup_key(name))?;

        let hint = unit_hint.map(str::trim).filter(|u| !u.is_empty());
        let (Some(hint), Some(class)) = (hint, self.snapshot.dual_class(&matched.id)) else {
            return Some(matched);
        };

        if well_known::is_percentage_unit(hint) == class.is_percentage() {
            return Some(matched);
        }

        match self.snapshot.dual_partner(&matched.id) {
            Some(partner) => {
                debug!(
                    "Unit '{}' switches '{}' to '{}'",
                    hint, matched.canonical_name, partner.canonical_name
                );
                Some(partner)
            }
            None => Some(matched),
        }
    }

    /// Finds an analyte by canonical name first, then as a synonym.
    pub fn find(&self, name: &str) -> Option<&'a CanonicalAnalyte> {
        self.snapshot
            .analyte_by_name(name)
            .or_else(|| self.resolve_analyte(name, None))
    }

    /// Returns true if the name resolves to any analyte.
    pub fn is_known(&self, name: &str) -> bool {
        self.snapshot
            .lookup_synonym(&Synonym::lookup_key(name))
            .is_some()
    }

    /// Annotates a raw result with its canonical identity and converted value.
    ///
    /// The result's unit doubles as the resolution hint.
    pub fn normalize(&self, raw: &RawLabResult) -> NormalizedLabResult {
        let Some(analyte) = self.resolve_analyte(&raw.test_name, raw.unit.as_deref()) else {
            debug!("Unresolved test name '{}'", raw.test_name);
            return NormalizedLabResult::unresolved(raw.clone());
        };

        let converted = UnitConverter::new(self.snapshot).convert(&raw.value, raw.unit.as_deref(), analyte);

        NormalizedLabResult {
            raw: raw.clone(),
            canonical_name: Some(analyte.canonical_name.clone()),
            converted_value: converted.value,
            standard_unit: Some(converted.standard_unit).filter(|u| !u.is_empty()),
            category: self.snapshot.category_of(analyte).map(|c| c.name.clone()),
        }
    }

    /// Normalizes a batch of raw results, preserving order.
    pub fn normalize_all(&self, raws: &[RawLabResult]) -> Vec<NormalizedLabResult> {
        raws.iter().map(|raw| self.normalize(raw)).collect()
    }
}
