//! CLI subcommands: order, settings, recipes.

use clap::{Args, Subcommand};
use modpack_core::pipeline::{Pipeline, PipelineOutput};
use modpack_core::recipe::{Extraction, extract_from_raw};
use modpack_core::resolver::{LoadOrder, resolve_load_order};
use modpack_data::{ModpackConfig, build_locale_table, discover_packages, load_tree_snapshot};
use modpack_lua::LuaEngine;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "modpack.toml";

/// Flags shared by every subcommand. Each one overrides the matching field
/// of the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Config file (default: ./modpack.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the core and base packages
    #[arg(long, global = true)]
    pub game_data: Option<PathBuf>,

    /// Directory scanned for packages
    #[arg(long = "mods", global = true)]
    pub mods_dir: Option<PathBuf>,

    /// Locale language for display names
    #[arg(long = "lang", global = true)]
    pub language: Option<String>,

    /// Script run after the base packages' data stage
    #[arg(long, global = true)]
    pub patch: Option<PathBuf>,

    /// Read data.raw from a RON/JSON/TOML snapshot instead of running scripts
    #[arg(long = "tree", global = true)]
    pub tree_snapshot: Option<PathBuf>,
}

impl Overrides {
    /// The config file (explicit, or the default one if it exists) with
    /// these flags applied on top.
    pub fn resolve(&self) -> Result<ModpackConfig, String> {
        let mut config = match &self.config {
            Some(path) => ModpackConfig::load(path).map_err(|e| e.to_string())?,
            None if Path::new(DEFAULT_CONFIG).is_file() => {
                ModpackConfig::load(Path::new(DEFAULT_CONFIG)).map_err(|e| e.to_string())?
            }
            None => ModpackConfig::default(),
        };

        if let Some(dir) = &self.game_data {
            config.game_data.clone_from(dir);
        }
        if let Some(dir) = &self.mods_dir {
            config.mods_dir.clone_from(dir);
        }
        if let Some(language) = &self.language {
            config.language.clone_from(language);
        }
        if self.patch.is_some() {
            config.patch.clone_from(&self.patch);
        }
        if self.tree_snapshot.is_some() {
            config.tree_snapshot.clone_from(&self.tree_snapshot);
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the package load order
    Order,

    /// Run the settings stages and list the startup settings
    Settings,

    /// List every recipe with display names
    Recipes {
        /// Print recipes as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, overrides: &Overrides) -> Result<(), String> {
    let config = overrides.resolve()?;
    match cmd {
        Commands::Order => cmd_order(&config),
        Commands::Settings => cmd_settings(&config),
        Commands::Recipes { json } => cmd_recipes(&config, json),
    }
}

fn cmd_order(config: &ModpackConfig) -> Result<(), String> {
    let order = load_order(config)?;
    let base = config.base_packages();

    println!("Load order ({} packages):", base.len() + order.len());
    for (i, pkg) in base.iter().chain(order.packages()).enumerate() {
        match &pkg.version {
            Some(version) => println!("  {:>3}. {} {}", i + 1, pkg.name, version),
            None => println!("  {:>3}. {}", i + 1, pkg.name),
        }
    }
    Ok(())
}

fn cmd_settings(config: &ModpackConfig) -> Result<(), String> {
    let order = load_order(config)?;
    let output = execute(config, &order)?;
    let settings = &output.settings;

    println!("Startup settings ({}):", settings.len());
    for (name, value) in settings.iter() {
        println!("  {name} = {value}");
    }
    for name in settings.collisions() {
        eprintln!("  WARNING: setting '{name}' defined in more than one category");
    }
    for skip in settings.skipped() {
        eprintln!("  WARNING: {skip}");
    }
    Ok(())
}

fn cmd_recipes(config: &ModpackConfig, json: bool) -> Result<(), String> {
    let start = Instant::now();

    let (raw, order) = match &config.tree_snapshot {
        Some(path) => {
            let raw = load_tree_snapshot(path).map_err(|e| e.to_string())?;
            // Locale still comes from the packages when they can be found.
            let order = load_order(config).unwrap_or_else(|e| {
                warn!("no package locale available: {e}");
                LoadOrder::default()
            });
            (raw, order)
        }
        None => {
            let order = load_order(config)?;
            let output = execute(config, &order)?;
            (output.raw().map_err(|e| e.to_string())?, order)
        }
    };

    let extraction = extract_from_raw(&raw);
    let base = config.base_packages();
    let locale = build_locale_table(base.iter().chain(order.packages()), &config.language);

    if json {
        let text = serde_json::to_string_pretty(&extraction.recipes).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        for recipe in &extraction.recipes {
            print!("{}", recipe.describe(&locale));
        }
    }

    let line = format!("{} in {:.2?}", summary(&extraction), start.elapsed());
    if json {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
    for skipped in &extraction.skipped {
        eprintln!("  skipped {}: {}", skipped.key, skipped.reason);
    }
    Ok(())
}

/// `found N recipes (M skipped)`.
pub fn summary(extraction: &Extraction) -> String {
    format!(
        "found {} recipes ({} skipped)",
        extraction.recipes.len(),
        extraction.skipped.len()
    )
}

/// Discover the packages in the mods directory and resolve their order.
fn load_order(config: &ModpackConfig) -> Result<LoadOrder, String> {
    let discovery = discover_packages(&config.mods_dir).map_err(|e| e.to_string())?;
    let order = resolve_load_order(discovery.packages).map_err(|e| e.to_string())?;
    info!(
        packages = order.len(),
        skipped = discovery.skipped.len(),
        "resolved load order"
    );
    Ok(order)
}

/// Run both script phases in fresh Lua states.
fn execute(config: &ModpackConfig, order: &LoadOrder) -> Result<PipelineOutput<LuaEngine>, String> {
    let pipeline = Pipeline::new(config.pipeline_config());
    let output = pipeline.run(order, LuaEngine::new).map_err(|e| e.to_string())?;
    for failure in &output.report.failures {
        eprintln!(
            "  FAILED: {} ({}): {}",
            failure.package, failure.stage, failure.error
        );
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modpack_core::recipe::{NormalizeError, Recipe, SkippedRecipe};
    use std::collections::BTreeMap;

    #[test]
    fn flags_override_config() {
        let overrides = Overrides {
            game_data: Some(PathBuf::from("/opt/game")),
            language: Some("de".to_string()),
            tree_snapshot: Some(PathBuf::from("raw.json")),
            ..Overrides::default()
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.game_data, PathBuf::from("/opt/game"));
        assert_eq!(config.language, "de");
        assert_eq!(config.tree_snapshot, Some(PathBuf::from("raw.json")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let overrides = Overrides {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Overrides::default()
        };
        assert!(overrides.resolve().is_err());
    }

    #[test]
    fn summary_counts_recipes_and_skips() {
        let extraction = Extraction {
            recipes: vec![Recipe {
                name: "gear".to_string(),
                ingredients: BTreeMap::new(),
                results: BTreeMap::new(),
            }],
            skipped: vec![SkippedRecipe {
                key: "broken".to_string(),
                reason: NormalizeError::MissingName {
                    key: "broken".to_string(),
                },
            }],
        };
        assert_eq!(summary(&extraction), "found 1 recipes (1 skipped)");
    }
}
