//! Catalog export discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{CatalogError, CatalogFiles, CatalogResult};

/// Discovers catalog exports in a directory.
///
/// Exports are recognised by file-name prefix (`categories`, `analytes`,
/// `synonyms`, `unit_conversions`, `dual_pairs`) with a `.tsv` or `.txt`
/// extension, so dated exports such as `analytes_20250301.tsv` are found too.
/// If the directory itself holds no categories export, its immediate
/// subdirectories are searched.
pub fn discover_catalog_files<P: AsRef<Path>>(path: P) -> CatalogResult<CatalogFiles> {
    let path = path.as_ref();

    if !path.is_dir() {
        return Err(CatalogError::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }

    let export_dir = find_export_dir(path)?;
    let mut files = CatalogFiles::new();

    for entry in fs::read_dir(&export_dir)? {
        let entry = entry?;
        let filename = entry.file_name();
        let filename_str = filename.to_string_lossy();

        if !is_export_file(&filename_str) {
            continue;
        }

        if filename_str.starts_with("categories") {
            files.categories_file = Some(entry.path());
            if let Some(date) = extract_export_date(&filename_str) {
                files.export_date = Some(date);
            }
        } else if filename_str.starts_with("analytes") {
            files.analytes_file = Some(entry.path());
        } else if filename_str.starts_with("synonyms") {
            files.synonyms_file = Some(entry.path());
        } else if filename_str.starts_with("unit_conversions") {
            files.conversions_file = Some(entry.path());
        } else if filename_str.starts_with("dual_pairs") {
            files.dual_pairs_file = Some(entry.path());
        }
    }

    if !files.has_required_files() {
        let missing = files.missing_files();
        return Err(CatalogError::RequiredFileMissing {
            relation: missing.join(", "),
            directory: export_dir.display().to_string(),
        });
    }

    Ok(files)
}

fn is_export_file(filename: &str) -> bool {
    filename.ends_with(".tsv") || filename.ends_with(".txt")
}

fn has_categories_export(dir: &Path) -> CatalogResult<bool> {
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("categories") && is_export_file(&name) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Finds the directory holding the exports.
fn find_export_dir(base: &Path) -> CatalogResult<PathBuf> {
    if has_categories_export(base)? {
        return Ok(base.to_path_buf());
    }

    // Search one level deep
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && has_categories_export(&entry.path())? {
            return Ok(entry.path());
        }
    }

    Err(CatalogError::RequiredFileMissing {
        relation: "categories".to_string(),
        directory: base.display().to_string(),
    })
}

/// Extracts an export date from a file name.
///
/// Exports may be named like `categories_20250301.tsv`.
fn extract_export_date(filename: &str) -> Option<String> {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let last = stem.rsplit('_').next()?;

    if last.len() == 8 && last.chars().all(|c| c.is_ascii_digit()) {
        Some(last.to_string())
    } else {
        None
    }
}
