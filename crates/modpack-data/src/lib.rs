//! Filesystem side of a modpack run: package discovery, manifests, locale
//! files, tree snapshots and the run configuration.

pub mod config;
pub mod loader;
pub mod schema;

pub use config::ModpackConfig;
pub use loader::{DataLoadError, Discovery, build_locale_table, discover_packages, load_tree_snapshot};
