//! Recipe extraction from the data tree.
//!
//! Recipe prototypes come in several shapes depending on the package that
//! defined them:
//!
//! - ingredients at the top level, or only inside a `normal` difficulty block
//! - `results` (a list) or `result` (a single item name, with an optional
//!   `result_count`)
//! - list entries with named fields `{name = .., amount = ..}` or positional
//!   pairs `{"iron-plate", 2}`
//! - a bare item name in place of a list, meaning one of that item
//!
//! [`extract_recipes`] folds all of them into [`Recipe`]. Malformed entries
//! are skipped and reported, never fatal.

use crate::locale::{LocaleCategory, LocaleTable};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, warn};

/// Key of the recipe category under `data.raw`.
pub const RECIPE_CATEGORY: &str = "recipe";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A recipe with its quantities, independent of how it was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub name: String,
    /// Item or fluid name to quantity consumed.
    pub ingredients: BTreeMap<String, f64>,
    /// Item or fluid name to quantity produced.
    pub results: BTreeMap<String, f64>,
}

/// Why a recipe entry was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("recipe entry '{key}' has no name")]
    MissingName { key: String },

    #[error("recipe '{recipe}' has invalid {field}: {detail}")]
    InvalidItemShape {
        recipe: String,
        field: &'static str,
        detail: String,
    },
}

/// A recipe entry that did not produce a [`Recipe`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecipe {
    /// The entry's key in the recipe category.
    pub key: String,
    pub reason: NormalizeError,
}

/// The result of extracting one recipe category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub recipes: Vec<Recipe>,
    pub skipped: Vec<SkippedRecipe>,
}

impl Recipe {
    /// Multi-line listing with display names from `locale`:
    ///
    /// ```text
    /// Iron gear wheel:
    ///     Iron plate x 2
    /// results:
    ///     Iron gear wheel x 1
    /// ```
    ///
    /// Entries are indented with a tab.
    pub fn describe(&self, locale: &LocaleTable) -> String {
        let mut out = format!("{}:\n", locale.display(LocaleCategory::Recipe, &self.name));
        for (name, amount) in &self.ingredients {
            let _ = writeln!(out, "\t{} x {amount}", locale.display_product(name));
        }
        out.push_str("results:\n");
        for (name, amount) in &self.results {
            let _ = writeln!(out, "\t{} x {amount}", locale.display_product(name));
        }
        out
    }
}

impl Extraction {
    pub fn find(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the recipe category of a `data.raw` tree.
pub fn extract_from_raw(raw: &Value) -> Extraction {
    match raw.get(RECIPE_CATEGORY) {
        Some(recipes) => extract_recipes(recipes),
        None => {
            debug!("data tree has no recipe category");
            Extraction::default()
        }
    }
}

/// Extract one [`Recipe`] per well-formed entry of a recipe category.
pub fn extract_recipes(recipes: &Value) -> Extraction {
    let mut extraction = Extraction::default();

    let keyed: Vec<(String, &Value)> = match recipes {
        Value::Mapping(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v))
            .collect(),
        _ => Vec::new(),
    };

    for (key, entry) in keyed {
        match normalize_recipe(&key, entry) {
            Ok(recipe) => extraction.recipes.push(recipe),
            Err(reason) => {
                warn!("skipping recipe: {reason}");
                extraction.skipped.push(SkippedRecipe { key, reason });
            }
        }
    }

    debug!(
        recipes = extraction.recipes.len(),
        skipped = extraction.skipped.len(),
        "recipes extracted"
    );
    extraction
}

/// Normalize a single recipe entry.
pub fn normalize_recipe(key: &str, entry: &Value) -> Result<Recipe, NormalizeError> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::MissingName {
            key: key.to_string(),
        })?;

    let normal = entry.get("normal");
    let (ingredients, consulted_normal) = match entry.get("ingredients") {
        Some(ingredients) => (Some(ingredients), false),
        None => (normal.and_then(|n| n.get("ingredients")), normal.is_some()),
    };

    let results = result_field(entry).or_else(|| {
        if consulted_normal {
            normal.and_then(result_field)
        } else {
            None
        }
    });

    let ingredients = match ingredients {
        Some(value) => parse_items(name, "ingredients", value, 1.0)?,
        None => return Err(missing(name, "ingredients")),
    };
    let results = match results {
        Some((value, implicit)) => parse_items(name, "results", value, implicit)?,
        None => return Err(missing(name, "results")),
    };

    Ok(Recipe {
        name: name.to_string(),
        ingredients,
        results,
    })
}

/// `results` if present, else `result` with the quantity a bare name implies.
fn result_field(block: &Value) -> Option<(&Value, f64)> {
    if let Some(results) = block.get("results") {
        return Some((results, 1.0));
    }
    let result = block.get("result")?;
    let count = block
        .get("result_count")
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    Some((result, count))
}

fn missing(recipe: &str, field: &'static str) -> NormalizeError {
    NormalizeError::InvalidItemShape {
        recipe: recipe.to_string(),
        field,
        detail: "missing".to_string(),
    }
}

/// Parse an ingredients/results field. A bare name stands for `implicit` of
/// that item; a list is parsed entry by entry, later duplicates winning.
fn parse_items(
    recipe: &str,
    field: &'static str,
    value: &Value,
    implicit: f64,
) -> Result<BTreeMap<String, f64>, NormalizeError> {
    let invalid = |detail: String| NormalizeError::InvalidItemShape {
        recipe: recipe.to_string(),
        field,
        detail,
    };

    match value {
        Value::String(name) => Ok(BTreeMap::from([(name.clone(), implicit)])),
        // A single structured entry in place of a list, e.g.
        // `result = {name = "x", amount = 3}`. List elements are never
        // strings, so a string at the name position marks one entry.
        single if is_single_item(single) => {
            let (name, amount) = parse_item(single).map_err(invalid)?;
            Ok(BTreeMap::from([(name, amount)]))
        }
        Value::Sequence(_) | Value::Mapping(_) => {
            let mut items = BTreeMap::new();
            for item in value.entries() {
                let (name, amount) = parse_item(item).map_err(&invalid)?;
                items.insert(name, amount);
            }
            Ok(items)
        }
        other => Err(invalid(format!(
            "expected an item name or list, found a {}",
            other.kind()
        ))),
    }
}

fn is_single_item(value: &Value) -> bool {
    value.get("name").and_then(Value::as_str).is_some()
        || value.index(1).and_then(Value::as_str).is_some()
}

/// One list entry: named `name`/`amount` first, positions 1 and 2 otherwise.
/// An entry with neither amount falls back to its `amount_min`/`amount_max`
/// range.
fn parse_item(item: &Value) -> Result<(String, f64), String> {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| item.index(1).and_then(Value::as_str))
        .ok_or_else(|| format!("entry without an item name ({})", item.kind()))?;
    let amount = item
        .get("amount")
        .and_then(Value::as_f64)
        .or_else(|| item.index(2).and_then(Value::as_f64))
        .or_else(|| range_amount(item))
        .ok_or_else(|| format!("'{name}' has no amount"))?;
    if amount.is_nan() || amount < 0.0 {
        return Err(format!("'{name}' has invalid amount {amount}"));
    }
    Ok((name.to_string(), amount))
}

/// Midpoint of `amount_min` and `amount_max`. A lone bound is used as is.
/// `probability` is not applied.
fn range_amount(item: &Value) -> Option<f64> {
    let min = item.get("amount_min").and_then(Value::as_f64);
    let max = item.get("amount_max").and_then(Value::as_f64);
    match (min, max) {
        (Some(min), Some(max)) => Some((min + max) / 2.0),
        (bound, None) | (None, bound) => bound,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
