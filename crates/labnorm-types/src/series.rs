//! Lab time-series types.

use chrono::NaiveDate;

use crate::{DocumentId, LabFlag};

/// One entry of a lab time series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSeriesPoint {
    /// The document the measurement came from.
    pub document_id: DocumentId,
    /// The document's date, when known.
    pub date: Option<NaiveDate>,
    /// Value in the series unit.
    pub value_num: f64,
    /// The series unit (the analyte's standard unit when known).
    pub unit: Option<String>,
    /// Value as printed on the document.
    pub original_value: String,
    /// Unit as printed on the document.
    pub original_unit: Option<String>,
    /// Reference range as printed.
    pub reference_range: Option<String>,
    /// Abnormality flag.
    pub flag: Option<LabFlag>,
}

/// A clean, ordered, unit-consistent series for one analyte.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabSeries {
    /// The requested analyte name.
    pub analyte: String,
    /// The unit of every point; `None` when the analyte is not in the catalog.
    pub standard_unit: Option<String>,
    /// The analyte's category name.
    pub category: Option<String>,
    /// Points, dated ones ascending, then undated in encounter order.
    pub points: Vec<TimeSeriesPoint>,
    /// Matching results dropped because their value was not numeric.
    pub dropped_unparseable: usize,
}

impl LabSeries {
    /// Returns the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the most recent dated point.
    pub fn latest(&self) -> Option<&TimeSeriesPoint> {
        self.points.iter().rev().find(|p| p.date.is_some())
    }
}
