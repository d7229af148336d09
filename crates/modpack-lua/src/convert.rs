//! Conversion between Lua values and [`Value`] trees.

use mlua::{Lua, Table, Value as LuaValue};
use modpack_core::value::Value;
use std::collections::HashSet;
use tracing::debug;

/// Tables nested deeper than this are cut off when read back.
pub const MAX_DEPTH: usize = 64;

/// Build the Lua equivalent of `value`. Sequences become 1-based arrays.
pub fn to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Number(n) => LuaValue::Number(*n),
        Value::String(s) => LuaValue::String(lua.create_string(s)?),
        Value::Sequence(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        Value::Mapping(fields) => {
            let table = lua.create_table()?;
            for (key, field) in fields {
                table.raw_set(key.as_str(), to_lua(lua, field)?)?;
            }
            LuaValue::Table(table)
        }
    })
}

/// Read a Lua value as a [`Value`].
///
/// `nil`, functions, userdata and threads have no counterpart and yield
/// `None`; inside a table they are left out along with their key. A table
/// whose keys are exactly `1..=n` becomes a sequence, any other table a
/// mapping with numeric keys written in decimal. A table that contains
/// itself is cut at the point of recursion.
pub fn from_lua(value: &LuaValue) -> Option<Value> {
    let mut visiting = HashSet::new();
    convert(value, 0, &mut visiting)
}

fn convert(value: &LuaValue, depth: usize, visiting: &mut HashSet<usize>) -> Option<Value> {
    match value {
        LuaValue::Boolean(b) => Some(Value::Bool(*b)),
        LuaValue::Integer(i) => Some(Value::Number(*i as f64)),
        LuaValue::Number(n) => Some(Value::Number(*n)),
        LuaValue::String(s) => Some(Value::String(s.to_string_lossy().to_string())),
        LuaValue::Table(table) => convert_table(table, depth, visiting),
        _ => None,
    }
}

enum Key {
    Index(i64),
    Name(String),
}

impl Key {
    fn of(value: &LuaValue) -> Option<Key> {
        match value {
            LuaValue::Integer(i) => Some(Key::Index(*i)),
            LuaValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(Key::Index(*n as i64)),
            LuaValue::Number(n) => Some(Key::Name(n.to_string())),
            LuaValue::String(s) => Some(Key::Name(s.to_string_lossy().to_string())),
            _ => None,
        }
    }

    fn into_name(self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => name,
        }
    }
}

fn convert_table(table: &Table, depth: usize, visiting: &mut HashSet<usize>) -> Option<Value> {
    if depth >= MAX_DEPTH {
        debug!(depth, "table nesting too deep, truncated");
        return None;
    }
    let id = table.to_pointer() as usize;
    if !visiting.insert(id) {
        debug!("self-referencing table cut");
        return None;
    }

    let mut entries = Vec::new();
    for pair in table.clone().pairs::<LuaValue, LuaValue>() {
        let Ok((key, value)) = pair else {
            continue;
        };
        if let (Some(key), Some(value)) = (Key::of(&key), convert(&value, depth + 1, visiting)) {
            entries.push((key, value));
        }
    }

    visiting.remove(&id);
    Some(shape(entries))
}

fn shape(mut entries: Vec<(Key, Value)>) -> Value {
    let mut indices: Vec<i64> = entries
        .iter()
        .filter_map(|(key, _)| match key {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        })
        .collect();

    if !entries.is_empty() && indices.len() == entries.len() {
        indices.sort_unstable();
        let dense = indices.iter().enumerate().all(|(pos, &i)| i == pos as i64 + 1);
        if dense {
            entries.sort_by_key(|(key, _)| match key {
                Key::Index(i) => *i,
                Key::Name(_) => 0,
            });
            return Value::Sequence(entries.into_iter().map(|(_, value)| value).collect());
        }
    }

    Value::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (key.into_name(), value))
            .collect(),
    )
}
