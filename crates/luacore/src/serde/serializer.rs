/// Serializer for converting Lua values to serde_json::Value
///
/// - nil -> null
/// - boolean -> boolean
/// - integer -> integer number, float -> float number
/// - string -> string (lossy UTF-8)
/// - table with keys exactly `1..n` -> array
/// - any other table -> object keyed by the string form of each key
/// - functions, userdata and threads are rejected
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::{Map, Number, Value as JsonValue};

use crate::lua_value::lua_number::fmt_float;
use crate::lua_value::{LuaTable, LuaValue};
use crate::lua_vm::{LuaError, LuaResult};

/// Convert a Lua value to a serde_json::Value
pub fn to_value(lua_value: &LuaValue) -> LuaResult<JsonValue> {
    let mut visited = HashSet::new();
    to_value_internal(lua_value, &mut visited)
}

/// Convert a Lua value to a JSON string
pub fn to_string(lua_value: &LuaValue, pretty: bool) -> LuaResult<String> {
    let json_value = to_value(lua_value)?;
    let text = if pretty {
        serde_json::to_string_pretty(&json_value)
    } else {
        serde_json::to_string(&json_value)
    };
    text.map_err(|e| LuaError::runtime(format!("failed to serialize to JSON: {}", e)))
}

fn to_value_internal(lua_value: &LuaValue, visited: &mut HashSet<usize>) -> LuaResult<JsonValue> {
    match lua_value {
        LuaValue::Nil => Ok(JsonValue::Null),
        LuaValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
        LuaValue::Integer(i) => Ok(JsonValue::Number(Number::from(*i))),
        LuaValue::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| LuaError::runtime(format!("cannot serialize {} to JSON", fmt_float(*f)))),
        LuaValue::String(s) => Ok(JsonValue::String(s.to_str_lossy().into_owned())),
        LuaValue::Table(t) => {
            let addr = Rc::as_ptr(t) as *const u8 as usize;
            if !visited.insert(addr) {
                return Err(LuaError::runtime("circular reference detected in table"));
            }
            // Snapshot first so no borrow is held while nested tables convert
            let (array, entries): (Vec<LuaValue>, Vec<(LuaValue, LuaValue)>) = {
                let table = t.borrow();
                match array_length(&table) {
                    Some(n) => ((1..=n as i64).map(|i| table.raw_get_int(i)).collect(), Vec::new()),
                    None => (Vec::new(), table.iter().collect()),
                }
            };
            let result = if entries.is_empty() {
                array
                    .iter()
                    .map(|v| to_value_internal(v, visited))
                    .collect::<LuaResult<Vec<_>>>()
                    .map(JsonValue::Array)
            } else {
                entries_to_object(&entries, visited)
            };
            visited.remove(&addr);
            result
        }
        other => Err(LuaError::runtime(format!(
            "cannot serialize a {} value to JSON",
            other.type_name()
        ))),
    }
}

// Some(n) when the keys are exactly 1..n; the empty table counts as an array
fn array_length(table: &LuaTable) -> Option<usize> {
    let n = table.length();
    if table.key_count() != n {
        return None;
    }
    (1..=n as i64)
        .all(|i| !table.raw_get_int(i).is_nil())
        .then_some(n)
}

fn entries_to_object(
    entries: &[(LuaValue, LuaValue)],
    visited: &mut HashSet<usize>,
) -> LuaResult<JsonValue> {
    let mut object = Map::new();
    for (key, value) in entries {
        let key_str = match key {
            LuaValue::String(s) => s.to_str_lossy().into_owned(),
            LuaValue::Integer(_) | LuaValue::Float(_) | LuaValue::Boolean(_) => key.to_string(),
            // Skip keys JSON cannot name
            _ => continue,
        };
        object.insert(key_str, to_value_internal(value, visited)?);
    }
    Ok(JsonValue::Object(object))
}
