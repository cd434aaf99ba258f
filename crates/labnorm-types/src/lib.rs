//! # labnorm-types
//!
//! Type definitions for the lab analyte reference catalog.
//!
//! This crate provides the plain data types shared by the loader and the
//! service: catalog entities (categories, canonical analytes, synonyms,
//! unit conversions), raw and normalized lab results as produced by
//! document extraction, and the shapes of built time series and category
//! groupings.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use labnorm_types::{CanonicalAnalyte, DualClass};
//!
//! let analyte = CanonicalAnalyte {
//!     id: "a-lym-pct".to_string(),
//!     canonical_name: "Лимфоциты (%)".to_string(),
//!     category_id: "c-cbc".to_string(),
//!     standard_unit: "%".to_string(),
//!     sort_order: 12,
//!     active: true,
//! };
//!
//! assert_eq!(analyte.dual_class(), Some(DualClass::Percentage));
//! assert_eq!(analyte.dual_partner_name().as_deref(), Some("Лимфоциты (абс)"));
//! ```

#![warn(missing_docs)]

mod analyte;
mod category;
mod conversion;
mod grouping;
mod ids;
mod lab_result;
mod series;
mod synonym;
pub mod well_known;

// Re-export all public types at crate root
pub use analyte::{CanonicalAnalyte, DualClass, DualPair};
pub use category::Category;
pub use conversion::UnitConversion;
pub use grouping::{AnalyteCount, AnalyteDetails, CategoryGroup, CategoryOverview, GroupedAnalyte};
pub use ids::{AnalyteId, CategoryId, DocumentId};
pub use lab_result::{DocumentLabResult, LabFlag, NormalizedLabResult, RawLabResult};
pub use series::{LabSeries, TimeSeriesPoint};
pub use synonym::Synonym;
