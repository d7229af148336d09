//! Packages (mods) and the manifest dependency grammar.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the engine package that is always loaded first.
pub const CORE: &str = "core";

/// Name of the base game package, loaded right after [`CORE`].
pub const BASE: &str = "base";

/// The two packages that exist in every run, in load order.
pub const BASE_PACKAGES: [&str; 2] = [CORE, BASE];

/// Whether a dependency must be present for its dependent to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Declared as `"name"`. Missing target aborts resolution.
    Required,
    /// Declared as `"?name"`. Missing target is dropped; present target
    /// still constrains the load order.
    Optional,
}

/// A content package discovered on disk (or one of the base packages).
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    /// Directory holding the package's scripts and locale files.
    pub location: PathBuf,
    pub version: Option<String>,
    pub dependencies: BTreeMap<String, DependencyKind>,
}

impl Package {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            version: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// One of the always-present packages. They have no dependencies.
    pub fn base(name: &str, location: impl Into<PathBuf>) -> Self {
        Self::new(name, location)
    }

    /// Add dependencies parsed from raw manifest declarations. Unparseable
    /// (empty) declarations are ignored; a repeated name keeps the last kind.
    pub fn with_declarations<'a, I>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for raw in declarations {
            if let Some((name, kind)) = parse_dependency(raw) {
                self.dependencies.insert(name, kind);
            }
        }
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Path of a script resource inside this package.
    pub fn resource(&self, file_name: &str) -> PathBuf {
        self.location.join(file_name)
    }

    pub fn is_base(&self) -> bool {
        BASE_PACKAGES.contains(&self.name.as_str())
    }
}

/// Parse one dependency declaration from a package manifest.
///
/// `"name"` is required and `"?name"` / `"? name"` optional. Only the first
/// whitespace-separated token after the marker is the package name, so a
/// trailing version constraint (`"base >= 0.17"`) is ignored.
pub fn parse_dependency(raw: &str) -> Option<(String, DependencyKind)> {
    let raw = raw.trim();
    let (kind, rest) = match raw.strip_prefix('?') {
        Some(rest) => (DependencyKind::Optional, rest),
        None => (DependencyKind::Required, raw),
    };
    let name = rest.split_whitespace().next()?;
    Some((name.to_string(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_plain_name() {
        assert_eq!(
            parse_dependency("bobplates"),
            Some(("bobplates".to_string(), DependencyKind::Required))
        );
    }

    #[test]
    fn optional_with_and_without_space() {
        let expected = Some(("angelsrefining".to_string(), DependencyKind::Optional));
        assert_eq!(parse_dependency("?angelsrefining"), expected);
        assert_eq!(parse_dependency("? angelsrefining"), expected);
    }

    #[test]
    fn version_constraint_is_ignored() {
        assert_eq!(
            parse_dependency("base >= 0.17.0"),
            Some(("base".to_string(), DependencyKind::Required))
        );
        assert_eq!(
            parse_dependency("? boblibrary >= 0.17.0"),
            Some(("boblibrary".to_string(), DependencyKind::Optional))
        );
    }

    #[test]
    fn empty_declaration_is_rejected() {
        assert_eq!(parse_dependency(""), None);
        assert_eq!(parse_dependency("   "), None);
        assert_eq!(parse_dependency("?"), None);
    }

    #[test]
    fn with_declarations_builds_map() {
        let pkg = Package::new("mod-a", "/mods/mod-a")
            .with_declarations(["base >= 1.0", "?mod-b", "mod-c", ""]);
        assert_eq!(pkg.dependencies.len(), 3);
        assert_eq!(pkg.dependencies["base"], DependencyKind::Required);
        assert_eq!(pkg.dependencies["mod-b"], DependencyKind::Optional);
        assert_eq!(pkg.dependencies["mod-c"], DependencyKind::Required);
    }

    #[test]
    fn base_packages_are_recognized() {
        assert!(Package::base(CORE, "/game/core").is_base());
        assert!(Package::base(BASE, "/game/base").is_base());
        assert!(!Package::new("mod-a", "/mods/mod-a").is_base());
    }

    #[test]
    fn resource_joins_location() {
        let pkg = Package::new("mod-a", "/mods/mod-a");
        assert_eq!(pkg.resource("data.lua"), PathBuf::from("/mods/mod-a/data.lua"));
    }
}
