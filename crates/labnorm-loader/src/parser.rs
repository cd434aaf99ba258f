//! Generic catalog export parser.
//!
//! Provides a streaming parser for the tab-separated exports of the catalog
//! relations (one header row, one record per line, no quoting).

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::types::{CatalogConfig, CatalogError, CatalogResult, ParseStats};

/// Trait for types that can be parsed from catalog export records.
pub trait CatalogRecord: Sized {
    /// Expected leading column names for this record type.
    const EXPECTED_COLUMNS: &'static [&'static str];

    /// Parse a record from a CSV StringRecord.
    fn from_record(record: &StringRecord) -> CatalogResult<Self>;

    /// Returns true if this record passes the given filter config.
    fn passes_filter(&self, _config: &CatalogConfig) -> bool {
        true
    }
}

/// A streaming parser for catalog exports.
///
/// Rows that fail to parse are yielded as errors so callers can decide
/// whether to skip or abort; filtered rows are skipped silently.
pub struct CatalogParser<R: Read, T: CatalogRecord> {
    reader: Reader<R>,
    config: CatalogConfig,
    stats: ParseStats,
    _marker: PhantomData<T>,
}

impl<T: CatalogRecord> CatalogParser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or has invalid headers.
    pub fn from_path<P: AsRef<Path>>(path: P, config: CatalogConfig) -> CatalogResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CatalogError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read, T: CatalogRecord> CatalogParser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R, config: CatalogConfig) -> CatalogResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::None)
            .from_reader(reader);

        Self::validate_headers(&mut csv_reader)?;

        Ok(Self {
            reader: csv_reader,
            config,
            stats: ParseStats::default(),
            _marker: PhantomData,
        })
    }

    /// Validates that the export starts with the expected column headers.
    fn validate_headers(reader: &mut Reader<R>) -> CatalogResult<()> {
        let headers = reader.headers()?;
        let expected = T::EXPECTED_COLUMNS;

        if headers.len() < expected.len() {
            return Err(CatalogError::InvalidHeader {
                expected: expected.len(),
                found: headers.len(),
            });
        }

        for (i, expected_col) in expected.iter().enumerate() {
            let found = headers.get(i).unwrap_or("");
            // Handle UTF-8 BOM at start of file
            let found = found.trim_start_matches('\u{feff}').trim();
            if found != *expected_col {
                return Err(CatalogError::UnexpectedColumn {
                    position: i,
                    expected: expected_col.to_string(),
                    found: found.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parses all records into a Vec, skipping and counting malformed rows.
    pub fn parse_all(mut self) -> (Vec<T>, ParseStats) {
        let mut results = Vec::new();
        while let Some(item) = self.next() {
            match item {
                Ok(record) => results.push(record),
                Err(e) => {
                    self.stats.error_count += 1;
                    tracing::warn!(
                        "Skipping malformed catalog row {}: {}",
                        self.stats.total_records,
                        e
                    );
                }
            }
        }
        (results, self.stats)
    }
}

impl<R: Read, T: CatalogRecord> Iterator for CatalogParser<R, T> {
    type Item = CatalogResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    // Skip empty records
                    if record.is_empty() || record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }
                    self.stats.total_records += 1;

                    match T::from_record(&record) {
                        Ok(parsed) => {
                            if parsed.passes_filter(&self.config) {
                                self.stats.filtered_records += 1;
                                return Some(Ok(parsed));
                            }
                            self.stats.skipped_records += 1;
                            continue;
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Helper functions for parsing export field values.
pub mod parse {
    use super::{CatalogError, CatalogResult, StringRecord};

    /// Returns the field at `index`, or an empty string past the end.
    pub fn field(record: &StringRecord, index: usize) -> &str {
        record.get(index).unwrap_or("")
    }

    /// Parses a field that must not be blank.
    pub fn required(value: &str, name: &str) -> CatalogResult<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::MissingField {
                field: name.to_string(),
            });
        }
        Ok(trimmed.to_string())
    }

    /// Parses an optional text field; blank and `\N` (NULL) become `None`.
    pub fn optional(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "\\N" {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Parses a boolean from 0/1, t/f or true/false.
    pub fn boolean(value: &str) -> CatalogResult<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" => Ok(true),
            "0" | "f" | "false" => Ok(false),
            _ => Err(CatalogError::InvalidBoolean {
                value: value.to_string(),
            }),
        }
    }

    /// Parses a boolean, treating a blank or missing field as `default`.
    pub fn boolean_or(value: &str, default: bool) -> CatalogResult<bool> {
        if value.trim().is_empty() || value.trim() == "\\N" {
            Ok(default)
        } else {
            boolean(value)
        }
    }

    /// Parses a sort order; blank means 0.
    pub fn sort_order(value: &str) -> CatalogResult<i32> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "\\N" {
            return Ok(0);
        }
        trimmed.parse::<i32>().map_err(|_| CatalogError::InvalidNumber {
            value: value.to_string(),
        })
    }

    /// Parses a conversion coefficient; it must be finite.
    pub fn coefficient(value: &str) -> CatalogResult<f64> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .ok_or_else(|| CatalogError::InvalidNumber {
                value: value.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boolean() {
        assert!(parse::boolean("1").unwrap());
        assert!(parse::boolean("t").unwrap());
        assert!(parse::boolean("TRUE").unwrap());
        assert!(!parse::boolean("0").unwrap());
        assert!(!parse::boolean("f").unwrap());
        assert!(parse::boolean("yes").is_err());
        assert!(parse::boolean_or("", true).unwrap());
        assert!(!parse::boolean_or("\\N", false).unwrap());
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse::optional(" 🩸 "), Some("🩸".to_string()));
        assert_eq!(parse::optional(""), None);
        assert_eq!(parse::optional("\\N"), None);
    }

    #[test]
    fn test_parse_sort_order() {
        assert_eq!(parse::sort_order("12").unwrap(), 12);
        assert_eq!(parse::sort_order("").unwrap(), 0);
        assert!(parse::sort_order("first").is_err());
    }

    #[test]
    fn test_parse_coefficient() {
        assert_eq!(parse::coefficient("10.0").unwrap(), 10.0);
        assert_eq!(parse::coefficient(" 0.0555 ").unwrap(), 0.0555);
        assert!(parse::coefficient("NaN").is_err());
        assert!(parse::coefficient("ten").is_err());
    }

    #[test]
    fn test_parse_required() {
        assert_eq!(parse::required(" a-1 ", "id").unwrap(), "a-1");
        assert!(matches!(
            parse::required("  ", "id"),
            Err(CatalogError::MissingField { .. })
        ));
    }
}
