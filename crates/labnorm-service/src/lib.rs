//! # labnorm-service
//!
//! Embedding facade for the lab analyte normalization engine.
//!
//! [`LabEngine`] exposes the query surface (series building, category
//! listing, analyte lookup, result normalization) over a
//! [`ReferenceCatalog`](labnorm_loader::ReferenceCatalog) loaded from a
//! directory of catalog exports. [`spawn_refresher`] keeps the catalog fresh
//! in the background.

#![warn(missing_docs)]

mod config;
mod engine;
mod refresher;

pub use config::{ConfigError, EngineConfig, DEFAULT_CATALOG_PATH, DEFAULT_REFRESH_INTERVAL};
pub use engine::{EngineError, EngineResult, LabEngine};
pub use refresher::{spawn_refresher, MIN_REFRESH_INTERVAL};
