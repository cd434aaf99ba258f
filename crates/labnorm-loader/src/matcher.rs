//! Whole-string synonym matching.

use regex::{Regex, RegexBuilder};

use crate::types::MatcherError;

/// A case-insensitive, whole-string matcher over a set of names.
#[derive(Debug, Clone)]
pub struct SynonymMatcher {
    pattern: Option<Regex>,
}

impl SynonymMatcher {
    /// Returns true if the trimmed `name` equals one of the names, ignoring case.
    pub fn is_match(&self, name: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|re| re.is_match(name.trim()))
    }

    /// Returns true if the matcher was built from an empty set.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Builds a matcher for a set of names.
///
/// Every name is escaped, so catalog spellings such as `"Лимфоциты (%)"` or
/// `"Na+"` match literally. An empty set matches nothing.
///
/// # Errors
/// Returns [`MatcherError::Compile`] if the combined pattern exceeds the
/// regex size limits.
///
/// ```
/// use labnorm_loader::build_synonym_matcher;
///
/// let matcher = build_synonym_matcher(["Лимфоциты (%)", "LYM%"]).unwrap();
/// assert!(matcher.is_match(" лимфоциты (%) "));
/// assert!(!matcher.is_match("Лимфоциты"));
/// ```
pub fn build_synonym_matcher<I, S>(names: I) -> Result<SynonymMatcher, MatcherError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let alternatives: Vec<String> = names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .map(|n| regex::escape(&n))
        .collect();

    if alternatives.is_empty() {
        return Ok(SynonymMatcher { pattern: None });
    }

    let pattern = RegexBuilder::new(&format!("^(?:{})$", alternatives.join("|")))
        .case_insensitive(true)
        .build()?;

    Ok(SynonymMatcher {
        pattern: Some(pattern),
    })
}
