//! Serde structs for on-disk package metadata.

use serde::Deserialize;

/// A package's `info.json` manifest.
///
/// Only the fields the loader uses are declared; everything else in the file
/// is ignored. `name` is optional here so that a missing name can be reported
/// as a manifest error rather than a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Raw declarations such as `"base >= 0.17"` or `"? other-mod"`.
    #[serde(default)]
    pub dependencies: Vec<String>,
}
