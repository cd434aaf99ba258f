//! Loader-specific types: errors, configuration and statistics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading or serving the reference catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// I/O error reading a catalog export.
    #[error("IO error reading catalog export: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid numeric value.
    #[error("Invalid number: {value}")]
    InvalidNumber {
        /// The invalid value that was encountered.
        value: String,
    },

    /// Invalid boolean value.
    #[error("Invalid boolean value: {value} (expected 0/1, t/f or true/false)")]
    InvalidBoolean {
        /// The invalid boolean value.
        value: String,
    },

    /// Missing required field.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The name of the empty field.
        field: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Directory not found.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Required export missing from the catalog directory.
    #[error("Required catalog export not found: {relation} in {directory}")]
    RequiredFileMissing {
        /// The relations that were missing.
        relation: String,
        /// The directory that was searched.
        directory: String,
    },

    /// Invalid header - column count mismatch.
    #[error("Invalid header: expected {expected} columns, found {found}")]
    InvalidHeader {
        /// Expected column count.
        expected: usize,
        /// Found column count.
        found: usize,
    },

    /// Unexpected column name.
    #[error("Unexpected column '{found}' at position {position}, expected '{expected}'")]
    UnexpectedColumn {
        /// The column position.
        position: usize,
        /// Expected column name.
        expected: String,
        /// Found column name.
        found: String,
    },

    /// The backing store could not be reached.
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),

    /// No snapshot has been published yet.
    #[error("Reference catalog has not been loaded")]
    NotLoaded,

    /// A reload this caller waited on failed.
    #[error("Concurrent catalog reload failed: {message}")]
    CoalescedReloadFailed {
        /// The error reported by the reload that was awaited.
        message: String,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while compiling a synonym matcher.
#[derive(Error, Debug)]
pub enum MatcherError {
    /// The combined pattern could not be compiled (typically size limits).
    #[error("Could not compile synonym matcher: {0}")]
    Compile(#[from] regex::Error),
}

/// Default time a snapshot stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Configuration for loading and caching the reference catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Whether to drop rows marked inactive in the store.
    pub active_only: bool,
    /// How long a published snapshot stays fresh.
    pub ttl: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            active_only: true,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CatalogConfig {
    /// Returns a copy with a different TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Statistics from parsing one catalog export.
#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    /// Total records read from file.
    pub total_records: usize,
    /// Records that passed filters.
    pub filtered_records: usize,
    /// Records skipped (inactive).
    pub skipped_records: usize,
    /// Parse errors encountered (non-fatal).
    pub error_count: usize,
}

impl ParseStats {
    /// Returns the percentage of records that passed filters.
    pub fn filter_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.filtered_records as f64 / self.total_records as f64) * 100.0
        }
    }

    /// Adds another file's counters to this one.
    pub fn merge(&mut self, other: &ParseStats) {
        self.total_records += other.total_records;
        self.filtered_records += other.filtered_records;
        self.skipped_records += other.skipped_records;
        self.error_count += other.error_count;
    }
}

/// Discovered catalog exports in a directory.
#[derive(Debug, Clone, Default)]
pub struct CatalogFiles {
    /// Path to the categories export.
    pub categories_file: Option<PathBuf>,
    /// Path to the analytes export.
    pub analytes_file: Option<PathBuf>,
    /// Path to the synonyms export.
    pub synonyms_file: Option<PathBuf>,
    /// Path to the unit conversions export.
    pub conversions_file: Option<PathBuf>,
    /// Path to the optional explicit dual pair export.
    pub dual_pairs_file: Option<PathBuf>,
    /// Export date extracted from file names (YYYYMMDD).
    pub export_date: Option<String>,
}

impl CatalogFiles {
    /// Creates a new empty CatalogFiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if all four required relations are present.
    pub fn has_required_files(&self) -> bool {
        self.categories_file.is_some()
            && self.analytes_file.is_some()
            && self.synonyms_file.is_some()
            && self.conversions_file.is_some()
    }

    /// Returns a list of missing required relations.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.categories_file.is_none() {
            missing.push("categories");
        }
        if self.analytes_file.is_none() {
            missing.push("analytes");
        }
        if self.synonyms_file.is_none() {
            missing.push("synonyms");
        }
        if self.conversions_file.is_none() {
            missing.push("unit_conversions");
        }
        missing
    }
}
