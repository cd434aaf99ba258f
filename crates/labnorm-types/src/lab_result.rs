//! Raw and normalized lab result types.
//!
//! `RawLabResult` is the shape produced by upstream document extraction.
//! Every field except the name is free text, including the value.

use std::fmt;
use std::str::FromStr;

use crate::DocumentId;

/// Abnormality flag attached to a lab result by the extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabFlag {
    /// Below the reference range ("L").
    Low,
    /// Within the reference range ("N").
    Normal,
    /// Above the reference range ("H").
    High,
    /// Abnormal without direction ("A").
    Abnormal,
}

impl LabFlag {
    /// Returns the single-letter code.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Normal => "N",
            Self::High => "H",
            Self::Abnormal => "A",
        }
    }
}

impl FromStr for LabFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::Low),
            "N" => Ok(Self::Normal),
            "H" => Ok(Self::High),
            "A" => Ok(Self::Abnormal),
            other => Err(format!("unknown lab flag: {other}")),
        }
    }
}

impl fmt::Display for LabFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LabFlag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for LabFlag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// Extraction emits stray flag strings ("", "*", "high") often enough that an
/// unknown flag must not reject the whole result.
#[cfg(feature = "serde")]
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<LabFlag>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let code: Option<String> = Option::deserialize(deserializer)?;
    Ok(code.and_then(|c| c.parse().ok()))
}

/// One measurement as produced by upstream extraction.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawLabResult {
    /// Free-text test name as printed on the document.
    pub test_name: String,
    /// Value as printed (may use a comma decimal separator, or be non-numeric).
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: String,
    /// Unit as printed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unit: Option<String>,
    /// Reference range as printed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_range: Option<String>,
    /// Abnormality flag.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "lenient_flag"))]
    pub flag: Option<LabFlag>,
}

impl RawLabResult {
    /// Creates a result with the given name, value and unit.
    pub fn new(test_name: impl Into<String>, value: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            test_name: test_name.into(),
            value: value.into(),
            unit: unit.map(str::to_string),
            reference_range: None,
            flag: None,
        }
    }
}

/// A raw lab result tagged with the document it was extracted from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentLabResult {
    /// The source document.
    pub document_id: DocumentId,
    /// The extracted measurement.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub result: RawLabResult,
}

impl DocumentLabResult {
    /// Tags a raw result with its document.
    pub fn new(document_id: impl Into<DocumentId>, result: RawLabResult) -> Self {
        Self {
            document_id: document_id.into(),
            result,
        }
    }
}

/// A raw lab result annotated with its canonical identity.
///
/// The four added fields are `None` when the name does not resolve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedLabResult {
    /// The original measurement.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub raw: RawLabResult,
    /// Resolved canonical analyte name.
    pub canonical_name: Option<String>,
    /// Value in the standard unit.
    pub converted_value: Option<f64>,
    /// The analyte's standard unit.
    pub standard_unit: Option<String>,
    /// The analyte's category name.
    pub category: Option<String>,
}

impl NormalizedLabResult {
    /// Wraps a result whose name did not resolve.
    pub fn unresolved(raw: RawLabResult) -> Self {
        Self {
            raw,
            canonical_name: None,
            converted_value: None,
            standard_unit: None,
            category: None,
        }
    }

    /// Returns true if the name resolved to a canonical analyte.
    pub fn is_resolved(&self) -> bool {
        self.canonical_name.is_some()
    }
}
