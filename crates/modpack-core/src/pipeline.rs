//! Two-phase execution: the settings pass, then the data pass.
//!
//! # Settings pass
//!
//! A fresh, isolated context runs every discovered package's settings stages.
//! The declared defaults under `data.raw` are flattened into a
//! [`SettingsSnapshot`] and the context is dropped.
//!
//! # Data pass
//!
//! A second fresh context gets the snapshot as the `settings` global, then
//! runs the data stages: base packages first, then the optional patch
//! script, then the discovered packages in load order. Later stages repeat
//! the base-then-discovered order.
//!
//! A package whose script fails is recorded in the [`LoadReport`] and skipped
//! for the remaining stages of that pass. Only context setup failures are
//! fatal.

use crate::package::Package;
use crate::resolver::LoadOrder;
use crate::script::{ScriptEngine, ScriptError};
use crate::settings::SettingsSnapshot;
use crate::value::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings scripts, in stage order. The first is the defining resource.
pub const SETTINGS_STAGES: [&str; 3] = [
    "settings.lua",
    "settings-updates.lua",
    "settings-final-fixes.lua",
];

/// Data scripts, in stage order. The first is the defining resource.
pub const DATA_STAGES: [&str; 3] = ["data.lua", "data-updates.lua", "data-final-fixes.lua"];

/// Path from the globals to the accumulated prototype tables.
pub const RAW_PATH: [&str; 2] = ["data", "raw"];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How execution contexts are prepared.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Always-present packages, in load order (normally `core`, `base`).
    pub base_packages: Vec<Package>,
    /// Added to every context's search path and kept for its lifetime.
    pub library_dirs: Vec<PathBuf>,
    /// Inline chunk run before the prelude scripts.
    pub prelude_source: Option<String>,
    /// Scripts run once per context after the globals are installed, e.g.
    /// the loader that defines `data` and `data:extend`.
    pub prelude_scripts: Vec<PathBuf>,
    /// Run in the data pass after the base packages' `data.lua`.
    pub patch_script: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Errors and report
// ---------------------------------------------------------------------------

/// Fatal pipeline failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{phase} context setup failed: {source}")]
    Setup {
        phase: &'static str,
        #[source]
        source: ScriptError,
    },

    #[error("cannot read the {phase} data tree: {source}")]
    Tree {
        phase: &'static str,
        #[source]
        source: ScriptError,
    },
}

/// A package script that failed to run. Non-fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFailure {
    pub package: String,
    pub stage: &'static str,
    pub error: ScriptError,
}

/// What happened to each package during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Packages whose data stages all ran, in execution order.
    pub loaded: Vec<String>,
    pub failures: Vec<PackageFailure>,
}

impl LoadReport {
    fn fail(&mut self, package: &str, stage: &'static str, error: ScriptError) {
        warn!(package, stage, "package script failed: {error}");
        self.failures.push(PackageFailure {
            package: package.to_string(),
            stage,
            error,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The primary context after the data pass, plus what went into it.
pub struct PipelineOutput<E> {
    pub engine: E,
    pub settings: SettingsSnapshot,
    pub report: LoadReport,
}

impl<E: ScriptEngine> PipelineOutput<E> {
    /// The accumulated `data.raw` tree. Empty if no script created it.
    pub fn raw(&self) -> Result<Value, PipelineError> {
        read_raw(&self.engine, "data")
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run both passes over `order`. `new_context` creates a fresh engine
    /// context; it is called once per pass.
    pub fn run<E, F>(&self, order: &LoadOrder, mut new_context: F) -> Result<PipelineOutput<E>, PipelineError>
    where
        E: ScriptEngine,
        F: FnMut() -> Result<E, ScriptError>,
    {
        let mods = self.visibility(order);
        let mut report = LoadReport::default();

        let settings = self.settings_pass(order, &mods, &mut new_context, &mut report)?;
        let engine = self.data_pass(order, &mods, &settings, &mut new_context, &mut report)?;

        info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            settings = settings.len(),
            "data pass complete"
        );
        Ok(PipelineOutput {
            engine,
            settings,
            report,
        })
    }

    /// The `mods` global: every known package name marked present.
    fn visibility(&self, order: &LoadOrder) -> Value {
        Value::from_pairs(
            self.config
                .base_packages
                .iter()
                .chain(order.packages())
                .map(|p| (p.name.clone(), Value::Bool(true))),
        )
    }

    fn settings_pass<E, F>(
        &self,
        order: &LoadOrder,
        mods: &Value,
        new_context: &mut F,
        report: &mut LoadReport,
    ) -> Result<SettingsSnapshot, PipelineError>
    where
        E: ScriptEngine,
        F: FnMut() -> Result<E, ScriptError>,
    {
        let mut engine = self.prepare(new_context, mods, "settings")?;
        let mut failed = HashSet::new();
        for stage in SETTINGS_STAGES {
            run_stage(&mut engine, order.packages(), stage, &mut failed, report);
        }
        let raw = read_raw(&engine, "settings")?;
        Ok(SettingsSnapshot::from_raw(&raw))
    }

    fn data_pass<E, F>(
        &self,
        order: &LoadOrder,
        mods: &Value,
        settings: &SettingsSnapshot,
        new_context: &mut F,
        report: &mut LoadReport,
    ) -> Result<E, PipelineError>
    where
        E: ScriptEngine,
        F: FnMut() -> Result<E, ScriptError>,
    {
        let mut engine = self.prepare(new_context, mods, "data")?;
        engine
            .set_global("settings", &settings.to_value())
            .map_err(|source| PipelineError::Setup {
                phase: "data",
                source,
            })?;

        let mut failed = HashSet::new();
        for (index, stage) in DATA_STAGES.into_iter().enumerate() {
            run_stage(&mut engine, &self.config.base_packages, stage, &mut failed, report);
            if index == 0 {
                self.run_patch(&mut engine);
            }
            run_stage(&mut engine, order.packages(), stage, &mut failed, report);
        }

        for pkg in self.config.base_packages.iter().chain(order.packages()) {
            if !failed.contains(&pkg.name) {
                info!(package = %pkg.name, "loaded package");
                report.loaded.push(pkg.name.clone());
            }
        }
        Ok(engine)
    }

    /// Create a context and install globals, library paths and preludes.
    fn prepare<E, F>(&self, new_context: &mut F, mods: &Value, phase: &'static str) -> Result<E, PipelineError>
    where
        E: ScriptEngine,
        F: FnMut() -> Result<E, ScriptError>,
    {
        let setup = |engine: &mut E| -> Result<(), ScriptError> {
            engine.set_global("defines", &defines())?;
            engine.set_global("mods", mods)?;
            for dir in &self.config.library_dirs {
                engine.extend_search_path(dir)?;
            }
            if let Some(source) = &self.config.prelude_source {
                engine.exec_str("prelude", source)?;
            }
            for script in &self.config.prelude_scripts {
                engine.exec_file(script)?;
            }
            Ok(())
        };

        let mut engine = new_context().map_err(|source| PipelineError::Setup { phase, source })?;
        setup(&mut engine).map_err(|source| PipelineError::Setup { phase, source })?;
        debug!(phase, "context ready");
        Ok(engine)
    }

    fn run_patch<E: ScriptEngine>(&self, engine: &mut E) {
        let Some(patch) = &self.config.patch_script else {
            return;
        };
        if !engine.script_exists(patch) {
            debug!(path = %patch.display(), "no patch script");
            return;
        }
        if let Err(e) = engine.exec_file(patch) {
            warn!(path = %patch.display(), "patch script failed: {e}");
        }
    }
}

/// Run one stage script of every package that has it and has not failed.
fn run_stage<E: ScriptEngine>(
    engine: &mut E,
    packages: &[Package],
    stage: &'static str,
    failed: &mut HashSet<String>,
    report: &mut LoadReport,
) {
    for pkg in packages {
        if failed.contains(&pkg.name) {
            continue;
        }
        let script = pkg.resource(stage);
        if !engine.script_exists(&script) {
            continue;
        }
        debug!(package = %pkg.name, stage, "running");
        if let Err(e) = run_scoped(engine, pkg, &script) {
            failed.insert(pkg.name.clone());
            report.fail(&pkg.name, stage, e);
        }
    }
}

/// Run `script` with the package's directories on the search path, then put
/// the search path and module cache back the way they were.
fn run_scoped<E: ScriptEngine>(engine: &mut E, pkg: &Package, script: &Path) -> Result<(), ScriptError> {
    let saved_path = engine.search_path()?;
    let saved_modules: HashSet<String> = engine.loaded_modules()?.into_iter().collect();

    let result = extend_and_exec(engine, pkg, script);
    let forgotten = forget_new_modules(engine, &saved_modules);
    let restored = engine.set_search_path(&saved_path);
    result.and(forgotten).and(restored)
}

fn forget_new_modules<E: ScriptEngine>(engine: &mut E, saved: &HashSet<String>) -> Result<(), ScriptError> {
    let added: Vec<String> = engine
        .loaded_modules()?
        .into_iter()
        .filter(|m| !saved.contains(m))
        .collect();
    engine.unload_modules(&added)
}

fn extend_and_exec<E: ScriptEngine>(engine: &mut E, pkg: &Package, script: &Path) -> Result<(), ScriptError> {
    for dir in package_dirs(&pkg.location) {
        engine.extend_search_path(&dir)?;
    }
    engine.exec_file(script)
}

/// `root` and every directory below it, depth-first in name order. Hidden
/// directories are skipped; unreadable ones contribute nothing below them.
pub fn package_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    let Ok(entries) = std::fs::read_dir(root) else {
        return dirs;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();
    children.sort();
    for child in children {
        dirs.extend(package_dirs(&child));
    }
    dirs
}

fn read_raw<E: ScriptEngine>(engine: &E, phase: &'static str) -> Result<Value, PipelineError> {
    engine
        .read_tree(&RAW_PATH)
        .map(|raw| raw.unwrap_or_else(Value::mapping))
        .map_err(|source| PipelineError::Tree { phase, source })
}

/// Engine constants that package scripts expect to find.
pub fn defines() -> Value {
    let normal = Value::from_pairs([("normal", Value::Bool(true))]);
    Value::from_pairs([
        (
            "difficulty_settings",
            Value::from_pairs([
                ("recipe_difficulty", normal.clone()),
                ("technology_difficulty", normal),
            ]),
        ),
        (
            "direction",
            Value::from_pairs([
                ("north", Value::Number(0.0)),
                ("east", Value::Number(2.0)),
                ("south", Value::Number(4.0)),
                ("west", Value::Number(6.0)),
            ]),
        ),
    ])
}

// ===========================================================================
// Tests
// ===========================================================================
