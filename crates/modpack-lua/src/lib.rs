//! Lua 5.2 backend for the modpack pipeline.
//!
//! [`LuaEngine`] implements [`modpack_core::script::ScriptEngine`] on an
//! embedded, vendored Lua state. Package scripts run unmodified; the data
//! tree they build is read back through [`convert::from_lua`].

pub mod convert;
pub mod engine;

pub use engine::LuaEngine;

// Re-export mlua for callers that drive the state directly.
pub use mlua;
