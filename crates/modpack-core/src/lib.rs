//! Modpack Core -- load order, two-phase script execution and recipe
//! extraction for script-defined game content packages.
//!
//! # Pipeline
//!
//! 1. **Resolve** -- [`resolver::resolve_load_order`] validates declared
//!    dependencies and orders the discovered packages.
//! 2. **Settings pass** -- every package's settings scripts run in an
//!    isolated context; the declared defaults become a
//!    [`settings::SettingsSnapshot`].
//! 3. **Data pass** -- a fresh context receives the snapshot, then runs the
//!    base packages and the discovered packages in load order, building the
//!    `data.raw` tree.
//! 4. **Extract** -- [`recipe::extract_from_raw`] normalizes every recipe
//!    prototype into a [`recipe::Recipe`].
//! 5. **Localize** -- [`locale::LocaleTable`] maps internal names to display
//!    strings, falling back to the internal name.
//!
//! The scripting engine stays behind [`script::ScriptEngine`]; the data tree
//! it produces is read as [`value::Value`].
//!
//! # Key Types
//!
//! - [`package::Package`] -- a package and its dependency declarations.
//! - [`resolver::LoadOrder`] -- packages ordered so dependencies come first.
//! - [`pipeline::Pipeline`] -- the two-phase execution coordinator.
//! - [`recipe::Extraction`] -- extracted recipes plus skipped entries.

pub mod locale;
pub mod package;
pub mod pipeline;
pub mod recipe;
pub mod resolver;
pub mod script;
pub mod settings;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
