//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. The centerpiece
//! is [`MemoryEngine`], a [`ScriptEngine`] whose "scripts" are Rust closures
//! over the global table, registered by path in a [`ScriptLibrary`].

use crate::package::Package;
use crate::script::{ScriptEngine, ScriptError};
use crate::value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

// ===========================================================================
// Package helpers
// ===========================================================================

/// A package at `/mods/<name>` with raw dependency declarations.
pub fn package(name: &str, dependencies: &[&str]) -> Package {
    Package::new(name, format!("/mods/{name}")).with_declarations(dependencies.iter().copied())
}

/// Set `data.raw.<category>.<name>` in a global table.
pub fn define(globals: &mut Value, category: &str, name: &str, prototype: Value) {
    globals.set_path(&["data", "raw", category, name], prototype);
}

// ===========================================================================
// In-memory engine
// ===========================================================================

type ScriptFn = Rc<dyn Fn(&mut Value) -> Result<(), String>>;

/// Scripts by path. Cheap to clone; every engine created from a library
/// sees the same scripts.
#[derive(Clone, Default)]
pub struct ScriptLibrary {
    scripts: HashMap<PathBuf, ScriptFn>,
}

impl ScriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script. It receives the engine's global table.
    pub fn add<F>(&mut self, path: impl Into<PathBuf>, script: F) -> &mut Self
    where
        F: Fn(&mut Value) -> Result<(), String> + 'static,
    {
        self.scripts.insert(path.into(), Rc::new(script));
        self
    }

    /// A fresh context over these scripts.
    pub fn engine(&self) -> MemoryEngine {
        MemoryEngine {
            scripts: self.clone(),
            ..MemoryEngine::default()
        }
    }
}

/// A [`ScriptEngine`] that keeps its globals in a [`Value`] mapping.
///
/// `package.loaded` in the globals plays the module cache.
#[derive(Clone)]
pub struct MemoryEngine {
    globals: Value,
    search_path: String,
    scripts: ScriptLibrary,
    executed: Vec<(PathBuf, String)>,
    chunks: Vec<String>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self {
            globals: Value::mapping(),
            search_path: String::new(),
            scripts: ScriptLibrary::default(),
            executed: Vec::new(),
            chunks: Vec::new(),
        }
    }
}

impl MemoryEngine {
    /// Every `exec_file` call with the search path at the time.
    pub fn executed(&self) -> &[(PathBuf, String)] {
        &self.executed
    }

    /// Names of the inline chunks run so far.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }
}

impl ScriptEngine for MemoryEngine {
    fn set_global(&mut self, name: &str, value: &Value) -> Result<(), ScriptError> {
        self.globals.set_path(&[name], value.clone());
        Ok(())
    }

    fn exec_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        self.executed.push((path.to_path_buf(), self.search_path.clone()));
        let script = self
            .scripts
            .scripts
            .get(path)
            .cloned()
            .ok_or_else(|| ScriptError::File {
                path: path.to_path_buf(),
                message: "cannot open file".to_string(),
            })?;
        (*script)(&mut self.globals).map_err(|message| ScriptError::File {
            path: path.to_path_buf(),
            message,
        })
    }

    fn exec_str(&mut self, chunk: &str, _source: &str) -> Result<(), ScriptError> {
        self.chunks.push(chunk.to_string());
        Ok(())
    }

    fn search_path(&self) -> Result<String, ScriptError> {
        Ok(self.search_path.clone())
    }

    fn set_search_path(&mut self, path: &str) -> Result<(), ScriptError> {
        self.search_path = path.to_string();
        Ok(())
    }

    fn read_tree(&self, path: &[&str]) -> Result<Option<Value>, ScriptError> {
        Ok(self.globals.lookup(path).cloned())
    }

    fn script_exists(&self, path: &Path) -> bool {
        self.scripts.scripts.contains_key(path)
    }

    fn loaded_modules(&self) -> Result<Vec<String>, ScriptError> {
        Ok(self
            .globals
            .lookup(&["package", "loaded"])
            .and_then(Value::as_mapping)
            .map(|loaded| loaded.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn unload_modules(&mut self, names: &[String]) -> Result<(), ScriptError> {
        for name in names {
            if let Value::Mapping(globals) = &mut self.globals
                && let Some(Value::Mapping(package)) = globals.get_mut("package")
                && let Some(Value::Mapping(loaded)) = package.get_mut("loaded")
            {
                loaded.remove(name);
            }
        }
        Ok(())
    }
}
