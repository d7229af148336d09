//! Display names from package locale files.
//!
//! Locale files use a flat section format:
//!
//! ```text
//! [item-name]
//! iron-gear-wheel=Iron gear wheel
//! ; comment
//! ```
//!
//! Files are overlaid in package load order, so a later package can rename
//! an earlier package's entries.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocaleCategory {
    Entity,
    Item,
    Fluid,
    Recipe,
}

impl LocaleCategory {
    pub const ALL: [LocaleCategory; 4] = [
        LocaleCategory::Entity,
        LocaleCategory::Item,
        LocaleCategory::Fluid,
        LocaleCategory::Recipe,
    ];

    /// The locale file section holding this category's names.
    pub fn section(self) -> &'static str {
        match self {
            LocaleCategory::Entity => "entity-name",
            LocaleCategory::Item => "item-name",
            LocaleCategory::Fluid => "fluid-name",
            LocaleCategory::Recipe => "recipe-name",
        }
    }
}

impl fmt::Display for LocaleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

// ---------------------------------------------------------------------------
// Locale files
// ---------------------------------------------------------------------------

/// One parsed locale file: section name to key/value table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocaleFile {
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl LocaleFile {
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(name)
    }
}

/// Parse the text of a locale file.
///
/// Lines outside any section are ignored, as are blank lines, comments
/// (`;` or `#`), and lines without `=`. Keys and values are trimmed; the
/// value is everything after the first `=`. Repeated keys keep the last value.
pub fn parse_cfg(text: &str) -> LocaleFile {
    let mut file = LocaleFile::default();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            let header = header.trim().to_string();
            file.sections.entry(header.clone()).or_default();
            current = Some(header);
            continue;
        }
        let (Some(section), Some((key, value))) = (&current, line.split_once('=')) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        file.sections
            .entry(section.clone())
            .or_default()
            .insert(key.to_string(), value.trim().to_string());
    }

    file
}

// ---------------------------------------------------------------------------
// Locale table
// ---------------------------------------------------------------------------

/// Internal name to display string, per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocaleTable {
    names: HashMap<LocaleCategory, HashMap<String, String>>,
}

impl LocaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every category section of `file` into the table, overwriting
    /// existing entries.
    pub fn overlay(&mut self, file: &LocaleFile) {
        for category in LocaleCategory::ALL {
            let Some(section) = file.section(category.section()) else {
                continue;
            };
            let names = self.names.entry(category).or_default();
            for (key, value) in section {
                names.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn insert(&mut self, category: LocaleCategory, name: impl Into<String>, display: impl Into<String>) {
        self.names
            .entry(category)
            .or_default()
            .insert(name.into(), display.into());
    }

    pub fn get(&self, category: LocaleCategory, name: &str) -> Option<&str> {
        self.names
            .get(&category)
            .and_then(|names| names.get(name))
            .map(String::as_str)
    }

    /// The display string for `name`, or `name` itself if none is known.
    pub fn display<'a>(&'a self, category: LocaleCategory, name: &'a str) -> &'a str {
        self.get(category, name).unwrap_or(name)
    }

    /// Display string for a recipe ingredient or result, which may be an
    /// item or a fluid.
    pub fn display_product<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(LocaleCategory::Item, name)
            .or_else(|| self.get(LocaleCategory::Fluid, name))
            .unwrap_or(name)
    }

    /// Number of entries in `category`.
    pub fn len(&self, category: LocaleCategory) -> usize {
        self.names.get(&category).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.names.values().all(HashMap::is_empty)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
