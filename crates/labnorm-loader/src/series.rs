//! Longitudinal series for one analyte.

use std::collections::HashMap;

use chrono::NaiveDate;
use labnorm_types::{CanonicalAnalyte, DocumentLabResult, DualClass, LabSeries, TimeSeriesPoint};
use tracing::{debug, warn};

use crate::matcher::build_synonym_matcher;
use crate::snapshot::CatalogSnapshot;
use crate::types::MatcherError;
use crate::units::{parse_lab_value, UnitConverter};

/// Builds clean, ordered, unit-consistent series from raw lab results.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesBuilder<'a> {
    snapshot: &'a CatalogSnapshot,
}

impl<'a> TimeSeriesBuilder<'a> {
    /// Creates a builder over a snapshot.
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Returns every name a result may carry to count toward `target`.
    ///
    /// For a dual variant this includes the partner's names: documents print
    /// "Лимфоциты" for both, and the unit decides which one was measured.
    pub fn expanded_names(&self, target: &CanonicalAnalyte) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut push = |analyte: &'a CanonicalAnalyte| {
            names.push(analyte.canonical_name.as_str());
            names.extend(self.snapshot.synonyms_of(&analyte.id).iter().map(String::as_str));
        };

        if let Some(own) = self.snapshot.analyte(&target.id) {
            push(own);
        }
        if let Some(partner) = self.snapshot.dual_partner(&target.id) {
            push(partner);
        }
        names
    }

    /// Builds the series of `analyte_name` from one user's results.
    ///
    /// `resolve_date` maps a document id to the document's date; it is called
    /// at most once per document.
    ///
    /// # Errors
    /// Returns [`MatcherError`] if the name set is too large to compile.
    pub fn build<F>(
        &self,
        analyte_name: &str,
        results: &[DocumentLabResult],
        resolve_date: F,
    ) -> Result<LabSeries, MatcherError>
    where
        F: Fn(&str) -> Option<NaiveDate>,
    {
        let target = self.snapshot.analyte_by_name(analyte_name);

        let matcher = match target {
            Some(target) => build_synonym_matcher(self.expanded_names(target))?,
            None => {
                debug!("'{}' is not a canonical analyte; matching it literally", analyte_name);
                build_synonym_matcher([analyte_name])?
            }
        };

        let unit_class: Option<DualClass> =
            target.and_then(|t| self.snapshot.dual_class(&t.id).or_else(|| t.dual_class()));
        let converter = UnitConverter::new(self.snapshot);
        let series_unit = target
            .map(|t| t.standard_unit.clone())
            .filter(|u| !u.is_empty());

        let mut dates: HashMap<&str, Option<NaiveDate>> = HashMap::new();
        let mut points = Vec::new();
        let mut dropped = 0usize;

        for entry in results {
            let raw = &entry.result;
            if !matcher.is_match(&raw.test_name) {
                continue;
            }

            if let Some(class) = unit_class {
                if DualClass::of_unit(raw.unit.as_deref()) != class {
                    debug!(
                        "Skipping '{}' {:?} in document {}: unit belongs to the other variant",
                        raw.test_name, raw.unit, entry.document_id
                    );
                    continue;
                }
            }

            let value = match target {
                Some(target) => converter.convert(&raw.value, raw.unit.as_deref(), target).value,
                None => parse_lab_value(&raw.value),
            };
            let Some(value_num) = value else {
                dropped += 1;
                debug!(
                    "Dropping non-numeric value '{}' for '{}' in document {}",
                    raw.value, raw.test_name, entry.document_id
                );
                continue;
            };

            let date = *dates
                .entry(entry.document_id.as_str())
                .or_insert_with(|| resolve_date(&entry.document_id));

            points.push(TimeSeriesPoint {
                document_id: entry.document_id.clone(),
                date,
                value_num,
                unit: match target {
                    Some(_) => series_unit.clone(),
                    None => raw.unit.clone(),
                },
                original_value: raw.value.clone(),
                original_unit: raw.unit.clone(),
                reference_range: raw.reference_range.clone(),
                flag: raw.flag,
            });
        }

        // Stable: undated points keep encounter order after every dated one.
        points.sort_by_key(|p| (p.date.is_none(), p.date));

        if dropped > 0 {
            warn!(
                "Dropped {} non-numeric result(s) from the '{}' series",
                dropped, analyte_name
            );
        }

        Ok(LabSeries {
            analyte: analyte_name.to_string(),
            standard_unit: series_unit,
            category: target
                .and_then(|t| self.snapshot.category_of(t))
                .map(|c| c.name.clone()),
            points,
            dropped_unparseable: dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use labnorm_types::{LabFlag, RawLabResult};

    use super::*;
    use crate::fixtures::sample_snapshot;

    fn make_result(doc: &str, name: &str, value: &str, unit: Option<&str>) -> DocumentLabResult {
        DocumentLabResult::new(doc, RawLabResult::new(name, value, unit))
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn make_dates(doc: &str) -> Option<NaiveDate> {
        match doc {
            "doc-1" => date(2024, 3, 1),
            "doc-2" => date(2023, 11, 20),
            "doc-3" => date(2024, 7, 15),
            _ => None,
        }
    }

    #[test]
    fn test_hemoglobin_series_converted_and_sorted() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-1", "Гемоглобин", "14.5", Some("г/дл")),
            make_result("doc-2", "HGB", "132", Some("г/л")),
            make_result("doc-3", "hb", "128", None),
            make_result("doc-3", "Глюкоза", "5.1", Some("ммоль/л")),
        ];

        let series = builder.build("Гемоглобин", &results, make_dates).unwrap();
        assert_eq!(series.standard_unit.as_deref(), Some("г/л"));
        assert_eq!(series.category.as_deref(), Some("Общий анализ крови"));

        let values: Vec<f64> = series.points.iter().map(|p| p.value_num).collect();
        assert_eq!(values, vec![132.0, 145.0, 128.0]);
        assert!(series.points.iter().all(|p| p.unit.as_deref() == Some("г/л")));
        assert_eq!(series.points[1].original_unit.as_deref(), Some("г/дл"));
        assert_eq!(series.points[1].original_value, "14.5");
    }

    #[test]
    fn test_dual_series_excludes_other_unit_class() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-1", "Нейтрофилы", "3.2", Some("10^9/л")),
            make_result("doc-1", "Нейтрофилы", "55", Some("%")),
            // No unit counts as the absolute variant.
            make_result("doc-9", "Нейтрофилы", "2.9", None),
        ];

        let series = builder.build("Нейтрофилы (абс)", &results, make_dates).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].value_num, 3.2);
        assert_eq!(series.points[0].unit.as_deref(), Some("10^9/л"));
        assert_eq!(series.points[1].value_num, 2.9);

        let percent = builder.build("Нейтрофилы (%)", &results, make_dates).unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent.points[0].value_num, 55.0);
    }

    #[test]
    fn test_dual_series_collects_partner_synonyms() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-1", "LYM%", "30", Some("%")),
            make_result("doc-2", "Лимфоциты", "28", Some("%")),
            make_result("doc-3", "LYM#", "33", Some("%")),
            make_result("doc-3", "LYM#", "2.0", Some("10^9/л")),
        ];

        let series = builder.build("Лимфоциты (%)", &results, make_dates).unwrap();
        let values: Vec<f64> = series.points.iter().map(|p| p.value_num).collect();
        assert_eq!(values, vec![28.0, 30.0, 33.0]);
        assert!(series
            .points
            .iter()
            .all(|p| p.original_unit.as_deref() == Some("%")));
    }

    #[test]
    fn test_undated_points_follow_in_encounter_order() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-x", "Глюкоза", "5.0", None),
            make_result("doc-3", "Глюкоза", "5.5", None),
            make_result("doc-y", "Глюкоза", "4.9", None),
            make_result("doc-2", "Глюкоза", "6.1", None),
        ];

        let series = builder.build("Глюкоза", &results, make_dates).unwrap();
        let docs: Vec<&str> = series.points.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(docs, vec!["doc-2", "doc-3", "doc-x", "doc-y"]);
        assert_eq!(series.latest().unwrap().document_id, "doc-3");
    }

    #[test]
    fn test_unparseable_values_are_counted() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-1", "СОЭ", "<2", Some("мм/час")),
            make_result("doc-2", "СОЭ", "12", Some("мм/ч")),
            make_result("doc-3", "ESR", "не определено", None),
        ];

        let series = builder.build("СОЭ", &results, make_dates).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.dropped_unparseable, 2);
    }

    #[test]
    fn test_unknown_analyte_matches_literally() {
        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let mut flagged = make_result("doc-1", "ферритин", "80", Some("нг/мл"));
        flagged.result.flag = Some(LabFlag::Normal);
        let results = vec![
            flagged,
            make_result("doc-2", "Ферритин (сыворотка)", "75", Some("нг/мл")),
        ];

        let series = builder.build("Ферритин", &results, make_dates).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.standard_unit, None);
        assert_eq!(series.category, None);
        assert_eq!(series.points[0].unit.as_deref(), Some("нг/мл"));
        assert_eq!(series.points[0].flag, Some(LabFlag::Normal));
    }

    #[test]
    fn test_date_resolver_called_once_per_document() {
        use std::cell::Cell;

        let snapshot = sample_snapshot();
        let builder = TimeSeriesBuilder::new(&snapshot);
        let results = vec![
            make_result("doc-1", "Гемоглобин", "140", None),
            make_result("doc-1", "HGB", "141", None),
            make_result("doc-1", "Hb", "142", None),
        ];

        let calls = Cell::new(0);
        let series = builder
            .build("Гемоглобин", &results, |doc| {
                calls.set(calls.get() + 1);
                make_dates(doc)
            })
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_empty_input() {
        let snapshot = sample_snapshot();
        let series = TimeSeriesBuilder::new(&snapshot)
            .build("Гемоглобин", &[], make_dates)
            .unwrap();
        assert!(series.is_empty());
        assert_eq!(series.dropped_unparseable, 0);
    }
}
