//! Identifier types.
//!
//! Catalog rows are keyed by the opaque string identifiers the backing store
//! assigns (UUIDs in the relational store). The engine never interprets them.

/// Identifier of a [`CanonicalAnalyte`](crate::CanonicalAnalyte) row.
pub type AnalyteId = String;

/// Identifier of a [`Category`](crate::Category) row.
pub type CategoryId = String;

/// Identifier of the source document a lab result was extracted from.
pub type DocumentId = String;
