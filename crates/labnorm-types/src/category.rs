//! Analyte category type.

use crate::{well_known, CategoryId};

/// A display grouping of analytes (e.g. "Общий анализ крови").
///
/// Represents a row of the `categories` relation of the reference catalog.
///
/// # Examples
///
/// ```
/// use labnorm_types::Category;
///
/// let category = Category {
///     id: "c-cbc".to_string(),
///     name: "Общий анализ крови".to_string(),
///     icon: None,
///     sort_order: 1,
///     active: true,
/// };
///
/// assert_eq!(category.icon_or_default(), "📋");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Category {
    /// Unique identifier of this category.
    pub id: CategoryId,
    /// Display name, unique across the catalog.
    pub name: String,
    /// Emoji icon shown next to the name.
    pub icon: Option<String>,
    /// Display position; lower sorts first.
    pub sort_order: i32,
    /// Whether this category is active in the catalog.
    pub active: bool,
}

impl Category {
    /// Returns the icon, falling back to the catalog default.
    pub fn icon_or_default(&self) -> &str {
        match self.icon.as_deref() {
            Some(icon) if !icon.trim().is_empty() => icon,
            _ => well_known::DEFAULT_CATEGORY_ICON,
        }
    }
}
