//! [`ScriptEngine`] over an embedded Lua 5.2 state.

use crate::convert::{from_lua, to_lua};
use mlua::{Lua, Table, Value as LuaValue};
use modpack_core::script::{ScriptEngine, ScriptError};
use modpack_core::value::Value;
use std::path::Path;

/// One Lua state with the safe standard libraries loaded.
///
/// The module search path is the state's `package.path` and the `require`
/// cache is `package.loaded`.
pub struct LuaEngine {
    lua: Lua,
}

impl LuaEngine {
    pub fn new() -> Result<Self, ScriptError> {
        let engine = Self { lua: Lua::new() };
        engine
            .package_table()
            .map_err(|e| ScriptError::Init(format!("no package library: {e}")))?;
        Ok(engine)
    }

    fn package_table(&self) -> mlua::Result<Table> {
        self.lua.globals().get::<Table>("package")
    }

    fn loaded_table(&self) -> mlua::Result<Table> {
        self.package_table()?.get::<Table>("loaded")
    }
}

fn chunk_error(chunk: &str) -> impl FnOnce(mlua::Error) -> ScriptError + '_ {
    move |e| ScriptError::Chunk {
        chunk: chunk.to_string(),
        message: e.to_string(),
    }
}

impl ScriptEngine for LuaEngine {
    fn set_global(&mut self, name: &str, value: &Value) -> Result<(), ScriptError> {
        let global_error = |e: mlua::Error| ScriptError::Global {
            name: name.to_string(),
            message: e.to_string(),
        };
        let value = to_lua(&self.lua, value).map_err(global_error)?;
        self.lua.globals().set(name, value).map_err(global_error)
    }

    fn exec_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        let file_error = |message: String| ScriptError::File {
            path: path.to_path_buf(),
            message,
        };
        let source = std::fs::read(path).map_err(|e| file_error(e.to_string()))?;
        self.lua
            .load(source)
            .set_name(format!("@{}", path.display()))
            .exec()
            .map_err(|e| file_error(e.to_string()))
    }

    fn exec_str(&mut self, chunk: &str, source: &str) -> Result<(), ScriptError> {
        self.lua
            .load(source)
            .set_name(chunk)
            .exec()
            .map_err(chunk_error(chunk))
    }

    fn search_path(&self) -> Result<String, ScriptError> {
        self.package_table()
            .and_then(|package| package.get::<String>("path"))
            .map_err(chunk_error("package.path"))
    }

    fn set_search_path(&mut self, path: &str) -> Result<(), ScriptError> {
        self.package_table()
            .and_then(|package| package.set("path", path))
            .map_err(chunk_error("package.path"))
    }

    fn read_tree(&self, path: &[&str]) -> Result<Option<Value>, ScriptError> {
        let read_error = |e: mlua::Error| ScriptError::Read {
            path: path.iter().map(|s| s.to_string()).collect(),
            message: e.to_string(),
        };
        let mut current = LuaValue::Table(self.lua.globals());
        for segment in path {
            let LuaValue::Table(table) = current else {
                return Ok(None);
            };
            current = table.get::<LuaValue>(*segment).map_err(read_error)?;
        }
        Ok(from_lua(&current))
    }

    fn loaded_modules(&self) -> Result<Vec<String>, ScriptError> {
        let loaded = self.loaded_table().map_err(chunk_error("package.loaded"))?;
        let mut names = Vec::new();
        for pair in loaded.pairs::<LuaValue, LuaValue>() {
            let (key, _) = pair.map_err(chunk_error("package.loaded"))?;
            if let LuaValue::String(name) = key {
                names.push(name.to_string_lossy().to_string());
            }
        }
        Ok(names)
    }

    fn unload_modules(&mut self, names: &[String]) -> Result<(), ScriptError> {
        let loaded = self.loaded_table().map_err(chunk_error("package.loaded"))?;
        for name in names {
            loaded
                .set(name.as_str(), LuaValue::Nil)
                .map_err(chunk_error("package.loaded"))?;
        }
        Ok(())
    }
}
