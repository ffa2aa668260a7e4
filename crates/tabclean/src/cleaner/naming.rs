//! Column label normalization.

use crate::error::Result;
use crate::utils::column_names;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

static NON_ALPHANUMERIC_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-z]+").expect("Invalid regex: non-alphanumeric run"));

/// Name given to a column whose label normalizes to nothing.
pub const EMPTY_NAME_PLACEHOLDER: &str = "column";

/// Rewrites column labels to lowercase ASCII with `_` separators.
pub struct ColumnNormalizer;

impl ColumnNormalizer {
    /// Normalize every column label of `df`.
    ///
    /// Labels that collide after normalization are disambiguated in column
    /// order by appending `_1`, `_2`, ... to the later ones. Returns the
    /// renamed frame and the `(old, new)` pairs that actually changed.
    pub fn normalize(mut df: DataFrame) -> Result<(DataFrame, Vec<(String, String)>)> {
        let original = column_names(&df);
        let normalized = normalize_column_names(&original);

        let renames: Vec<(String, String)> = original
            .iter()
            .zip(&normalized)
            .filter(|(old, new)| old != new)
            .map(|(old, new)| (old.clone(), new.clone()))
            .collect();

        for (old, new) in &renames {
            debug!("Renamed column '{}' -> '{}'", old, new);
        }

        df.set_column_names(normalized.iter().map(String::as_str))?;
        Ok((df, renames))
    }
}

/// Normalize one column label.
///
/// Trims, lowercases, decomposes (NFKD) and drops everything non-ASCII, which
/// removes diacritics, then collapses each run of non-alphanumeric characters
/// into a single `_`. Leading/trailing underscores are kept.
pub fn normalize_column_name(name: &str) -> String {
    let ascii: String = name
        .trim()
        .to_lowercase()
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();

    NON_ALPHANUMERIC_RUN.replace_all(&ascii, "_").into_owned()
}

/// Normalize a list of labels, keeping the result unique.
pub fn normalize_column_names(names: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut result = Vec::with_capacity(names.len());

    for name in names {
        let mut base = normalize_column_name(name);
        if base.is_empty() {
            base = EMPTY_NAME_PLACEHOLDER.to_string();
        }

        let mut candidate = base.clone();
        let mut count = 0;
        while seen.contains(&candidate) {
            count += 1;
            candidate = format!("{}_{}", base, count);
        }

        seen.insert(candidate.clone());
        result.push(candidate);
    }

    result
}
