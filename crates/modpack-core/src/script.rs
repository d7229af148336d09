//! The scripting-engine seam.
//!
//! The pipeline drives package scripts through [`ScriptEngine`] and never
//! sees the engine itself. An engine instance is one execution context:
//! globals, a module search path, and whatever tables the scripts build.

use crate::value::Value;
use std::path::{Path, PathBuf};

/// Errors surfaced by a script engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("script {path} failed: {message}")]
    File { path: PathBuf, message: String },

    #[error("chunk '{chunk}' failed: {message}")]
    Chunk { chunk: String, message: String },

    #[error("cannot set global '{name}': {message}")]
    Global { name: String, message: String },

    #[error("cannot read '{}': {message}", path.join("."))]
    Read { path: Vec<String>, message: String },

    #[error("engine initialization failed: {0}")]
    Init(String),
}

/// One scoped execution context of a scripting engine.
pub trait ScriptEngine {
    /// Define (or replace) a global binding.
    fn set_global(&mut self, name: &str, value: &Value) -> Result<(), ScriptError>;

    /// Execute a script file.
    fn exec_file(&mut self, path: &Path) -> Result<(), ScriptError>;

    /// Execute an inline chunk. `chunk` names it in error messages.
    fn exec_str(&mut self, chunk: &str, source: &str) -> Result<(), ScriptError>;

    /// The current module search path (`;`-separated templates).
    fn search_path(&self) -> Result<String, ScriptError>;

    fn set_search_path(&mut self, path: &str) -> Result<(), ScriptError>;

    /// Read the value reached by following `path` from the globals.
    /// `Ok(None)` when some segment is absent.
    fn read_tree(&self, path: &[&str]) -> Result<Option<Value>, ScriptError>;

    /// Whether `path` names a script this engine can execute.
    fn script_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Names of the modules currently cached by `require`.
    fn loaded_modules(&self) -> Result<Vec<String>, ScriptError> {
        Ok(Vec::new())
    }

    /// Drop modules from the `require` cache so the next `require` of the
    /// same name loads it again from the current search path.
    fn unload_modules(&mut self, names: &[String]) -> Result<(), ScriptError> {
        let _ = names;
        Ok(())
    }

    /// Make modules under `dir` resolvable by appending `<dir>/?.lua`.
    fn extend_search_path(&mut self, dir: &Path) -> Result<(), ScriptError> {
        let current = self.search_path()?;
        let dir = dir.to_string_lossy().replace('\\', "/");
        let extended = if current.is_empty() {
            format!("{dir}/?.lua")
        } else {
            format!("{current};{dir}/?.lua")
        };
        self.set_search_path(&extended)
    }
}
