//! Run configuration, read from a TOML file.
//!
//! ```toml
//! game_data = "./factorio-data-master"
//! mods_dir = "./mods"
//! language = "en"
//! patch = "./patch.lua"
//! ```
//!
//! Every field is optional.

use crate::loader::DataLoadError;
use modpack_core::package::{BASE_PACKAGES, Package};
use modpack_core::pipeline::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where the game data, mods and optional extras live.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModpackConfig {
    /// Directory holding the `core` and `base` packages.
    pub game_data: PathBuf,
    /// Directory scanned for packages.
    pub mods_dir: PathBuf,
    /// Locale sub-directory used for display names.
    pub language: String,
    /// Script run after the base packages' data stage.
    pub patch: Option<PathBuf>,
    /// Inline chunk run in every context before the data loader.
    pub prelude: Option<String>,
    /// Read `data.raw` from this snapshot instead of executing scripts.
    pub tree_snapshot: Option<PathBuf>,
}

impl Default for ModpackConfig {
    fn default() -> Self {
        Self {
            game_data: PathBuf::from("./factorio-data-master"),
            mods_dir: PathBuf::from("./mods"),
            language: "en".to_string(),
            patch: None,
            prelude: None,
            tree_snapshot: None,
        }
    }
}

impl ModpackConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// `core` and `base` under the game data directory, in load order.
    pub fn base_packages(&self) -> Vec<Package> {
        BASE_PACKAGES
            .iter()
            .map(|name| Package::base(name, self.game_data.join(name)))
            .collect()
    }

    /// The shared Lua library directory of the game data.
    pub fn library_dir(&self) -> PathBuf {
        self.game_data.join("core").join("lualib")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let library = self.library_dir();
        PipelineConfig {
            base_packages: self.base_packages(),
            prelude_scripts: vec![library.join("dataloader.lua")],
            library_dirs: vec![library],
            prelude_source: self.prelude.clone(),
            patch_script: self.patch.clone(),
        }
    }
}
