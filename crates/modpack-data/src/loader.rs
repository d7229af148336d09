//! Filesystem loading: package discovery, manifests, locale files and data
//! tree snapshots.
//!
//! Snapshot files may be RON, JSON or TOML; the format is detected from the
//! file extension.

use crate::schema::ManifestData;
use modpack_core::locale::{LocaleFile, LocaleTable, parse_cfg};
use modpack_core::package::Package;
use modpack_core::value::Value;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File every package directory must contain to be discovered.
pub const DATA_SCRIPT: &str = "data.lua";

/// Manifest file inside a package directory.
pub const MANIFEST: &str = "info.json";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while reading package data from disk.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A manifest lacks a field the loader needs.
    #[error("manifest {file} has no '{field}'")]
    MissingManifestField { file: PathBuf, field: &'static str },

    /// An I/O error occurred.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataLoadError + '_ {
    move |source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported snapshot file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path).map_err(io_error(path))?;

    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Load a previously captured data tree (typically `data.raw`) instead of
/// executing package scripts.
pub fn load_tree_snapshot(path: &Path) -> Result<Value, DataLoadError> {
    let value: Value = deserialize_file(path)?;
    debug!(path = %path.display(), kind = %value.kind(), "loaded tree snapshot");
    Ok(value)
}

// ===========================================================================
// Manifests and discovery
// ===========================================================================

/// Read `info.json` in `dir` into a [`Package`] located at `dir`.
pub fn read_manifest(dir: &Path) -> Result<Package, DataLoadError> {
    let file = dir.join(MANIFEST);
    let content = std::fs::read_to_string(&file).map_err(io_error(&file))?;
    let manifest: ManifestData = serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
        file: file.clone(),
        detail: e.to_string(),
    })?;

    let name = manifest
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or(DataLoadError::MissingManifestField { file, field: "name" })?;

    let mut package = Package::new(name, dir)
        .with_declarations(manifest.dependencies.iter().map(String::as_str));
    if let Some(version) = manifest.version {
        package = package.with_version(version);
    }
    Ok(package)
}

/// Result of scanning a mods directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Packages sorted by directory name.
    pub packages: Vec<Package>,
    /// Directories that looked like packages but whose manifest could not
    /// be used.
    pub skipped: Vec<(PathBuf, DataLoadError)>,
}

/// Find every package under `mods_dir`.
///
/// A package is an immediate sub-directory holding a `data.lua`. Other
/// directories are ignored. A package whose manifest is missing or broken is
/// skipped with a warning instead of failing the scan.
pub fn discover_packages(mods_dir: &Path) -> Result<Discovery, DataLoadError> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(mods_dir).map_err(io_error(mods_dir))? {
        let entry = entry.map_err(io_error(mods_dir))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut discovery = Discovery::default();
    for dir in dirs {
        if !dir.join(DATA_SCRIPT).is_file() {
            debug!(dir = %dir.display(), "no {DATA_SCRIPT}, not a package");
            continue;
        }
        match read_manifest(&dir) {
            Ok(package) => {
                debug!(package = %package.name, dir = %dir.display(), "discovered package");
                discovery.packages.push(package);
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping package");
                discovery.skipped.push((dir, e));
            }
        }
    }
    Ok(discovery)
}

// ===========================================================================
// Locale
// ===========================================================================

/// Parse every `locale/<language>/*.cfg` file of `package`, sorted by file
/// name. A package without that directory has no locale files; unreadable
/// files are skipped with a warning.
pub fn load_locale(package: &Package, language: &str) -> Vec<LocaleFile> {
    let dir = package.location.join("locale").join(language);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        debug!(package = %package.name, language, "no locale directory");
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("cfg"))
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| match std::fs::read(&path) {
            Ok(bytes) => Some(parse_cfg(&String::from_utf8_lossy(&bytes))),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping locale file");
                None
            }
        })
        .collect()
}

/// Overlay the locale files of `packages`, in the order given, into one
/// table. Pass the base packages first and then the load order so that later
/// packages override earlier ones.
pub fn build_locale_table<'a, I>(packages: I, language: &str) -> LocaleTable
where
    I: IntoIterator<Item = &'a Package>,
{
    let mut table = LocaleTable::new();
    for package in packages {
        for file in load_locale(package, language) {
            table.overlay(&file);
        }
    }
    table
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modpack_core::locale::LocaleCategory;
    use modpack_core::package::DependencyKind;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "modpack_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_package(mods: &Path, dir_name: &str, manifest: &str) -> PathBuf {
        let dir = mods.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DATA_SCRIPT), "").unwrap();
        fs::write(dir.join(MANIFEST), manifest).unwrap();
        dir
    }

    // -----------------------------------------------------------------------
    // Format detection and snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn detect_known_formats() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_unsupported_format() {
        let err = detect_format(Path::new("a.lua")).unwrap_err();
        assert!(matches!(err, DataLoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn snapshot_from_json() {
        let dir = make_test_dir("snapshot_json");
        let path = dir.join("raw.json");
        fs::write(
            &path,
            r#"{"recipe": {"gear": {"name": "gear", "ingredients": [["iron-plate", 2]], "result": "gear"}}}"#,
        )
        .unwrap();

        let tree = load_tree_snapshot(&path).unwrap();
        assert_eq!(
            tree.lookup(&["recipe", "gear", "result"]).and_then(Value::as_str),
            Some("gear")
        );
        let first = tree
            .lookup(&["recipe", "gear", "ingredients"])
            .and_then(|i| i.index(1))
            .and_then(|e| e.index(2))
            .and_then(Value::as_f64);
        assert_eq!(first, Some(2.0));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn snapshot_from_toml_reads_integers_as_numbers() {
        let dir = make_test_dir("snapshot_toml");
        let path = dir.join("raw.toml");
        fs::write(
            &path,
            "[recipe.gear]\nname = \"gear\"\nresult = \"gear\"\nresult_count = 2\n",
        )
        .unwrap();

        let tree = load_tree_snapshot(&path).unwrap();
        assert_eq!(
            tree.lookup(&["recipe", "gear", "result_count"]).and_then(Value::as_f64),
            Some(2.0)
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn snapshot_from_ron() {
        let dir = make_test_dir("snapshot_ron");
        let path = dir.join("raw.ron");
        fs::write(&path, r#"{"fluid": {"water": {"name": "water"}}}"#).unwrap();

        let tree = load_tree_snapshot(&path).unwrap();
        assert_eq!(
            tree.lookup(&["fluid", "water", "name"]).and_then(Value::as_str),
            Some("water")
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn snapshot_parse_error_names_file() {
        let dir = make_test_dir("snapshot_bad");
        let path = dir.join("raw.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_tree_snapshot(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { ref file, .. } if *file == path));
        let _ = fs::remove_dir_all(&dir);
    }

    // -----------------------------------------------------------------------
    // Manifests and discovery
    // -----------------------------------------------------------------------

    #[test]
    fn manifest_dependencies_and_version() {
        let dir = make_test_dir("manifest");
        let pkg_dir = write_package(
            &dir,
            "bobplates_0.17.5",
            r#"{"name": "bobplates", "version": "0.17.5", "dependencies": ["base >= 0.17", "? boblibrary", "bobores"]}"#,
        );

        let package = read_manifest(&pkg_dir).unwrap();
        assert_eq!(package.name, "bobplates");
        assert_eq!(package.location, pkg_dir);
        assert_eq!(package.version.as_deref(), Some("0.17.5"));
        assert_eq!(package.dependencies.get("base"), Some(&DependencyKind::Required));
        assert_eq!(package.dependencies.get("boblibrary"), Some(&DependencyKind::Optional));
        assert_eq!(package.dependencies.get("bobores"), Some(&DependencyKind::Required));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn manifest_without_name_is_rejected() {
        let dir = make_test_dir("manifest_noname");
        let pkg_dir = write_package(&dir, "nameless", r#"{"version": "1.0.0"}"#);

        let err = read_manifest(&pkg_dir).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingManifestField { field: "name", .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn discovery_requires_data_script() {
        let dir = make_test_dir("discover");
        write_package(&dir, "b-mod", r#"{"name": "b"}"#);
        write_package(&dir, "a-mod", r#"{"name": "a"}"#);
        let no_script = dir.join("graphics-only");
        fs::create_dir_all(&no_script).unwrap();
        fs::write(no_script.join(MANIFEST), r#"{"name": "graphics"}"#).unwrap();
        fs::write(dir.join("stray.zip"), "").unwrap();

        let discovery = discover_packages(&dir).unwrap();
        let names: Vec<&str> = discovery.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(discovery.skipped.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn discovery_skips_broken_manifests() {
        let dir = make_test_dir("discover_broken");
        write_package(&dir, "good", r#"{"name": "good"}"#);
        write_package(&dir, "broken", "{");
        let missing = dir.join("missing");
        fs::create_dir_all(&missing).unwrap();
        fs::write(missing.join(DATA_SCRIPT), "").unwrap();

        let discovery = discover_packages(&dir).unwrap();
        assert_eq!(discovery.packages.len(), 1);
        assert_eq!(discovery.packages[0].name, "good");
        assert_eq!(discovery.skipped.len(), 2);
        assert!(matches!(discovery.skipped[0].1, DataLoadError::Parse { .. }));
        assert!(matches!(discovery.skipped[1].1, DataLoadError::Io { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn discovery_of_missing_directory_fails() {
        let dir = make_test_dir("discover_missing");
        let err = discover_packages(&dir.join("nope")).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    // -----------------------------------------------------------------------
    // Locale
    // -----------------------------------------------------------------------

    #[test]
    fn locale_files_load_in_name_order() {
        let dir = make_test_dir("locale_order");
        let locale = dir.join("pkg").join("locale").join("en");
        fs::create_dir_all(&locale).unwrap();
        fs::write(locale.join("b.cfg"), "[item-name]\ngear=Second\n").unwrap();
        fs::write(locale.join("a.cfg"), "[item-name]\ngear=First\n").unwrap();
        fs::write(locale.join("notes.txt"), "[item-name]\ngear=Ignored\n").unwrap();

        let package = Package::new("pkg", dir.join("pkg"));
        let files = load_locale(&package, "en");
        assert_eq!(files.len(), 2);

        let table = build_locale_table([&package], "en");
        assert_eq!(table.display(LocaleCategory::Item, "gear"), "Second");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn locale_for_other_language_is_empty() {
        let dir = make_test_dir("locale_lang");
        let locale = dir.join("pkg").join("locale").join("de");
        fs::create_dir_all(&locale).unwrap();
        fs::write(locale.join("base.cfg"), "[item-name]\ngear=Zahnrad\n").unwrap();

        let package = Package::new("pkg", dir.join("pkg"));
        assert!(load_locale(&package, "en").is_empty());
        assert_eq!(load_locale(&package, "de").len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn later_package_overrides_locale() {
        let dir = make_test_dir("locale_overlay");
        for (name, text) in [
            ("base", "[item-name]\ngear=Iron gear wheel\n[fluid-name]\nwater=Water\n"),
            ("tweaks", "[item-name]\ngear=Cog\n"),
        ] {
            let locale = dir.join(name).join("locale").join("en");
            fs::create_dir_all(&locale).unwrap();
            fs::write(locale.join("strings.cfg"), text).unwrap();
        }

        let base = Package::base("base", dir.join("base"));
        let tweaks = Package::new("tweaks", dir.join("tweaks"));
        let table = build_locale_table([&base, &tweaks], "en");
        assert_eq!(table.display(LocaleCategory::Item, "gear"), "Cog");
        assert_eq!(table.display_product("water"), "Water");
        let _ = fs::remove_dir_all(&dir);
    }
}
