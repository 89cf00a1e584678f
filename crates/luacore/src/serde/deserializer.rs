/// Deserializer for converting serde_json::Value to Lua values
///
/// - null -> nil
/// - numbers -> integer when they fit in i64, float otherwise
/// - arrays -> tables with keys `1..n`, objects -> tables keyed by string
use serde_json::Value as JsonValue;

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

/// Convert a serde_json::Value to a Lua value
pub fn from_value(json_value: &JsonValue, vm: &LuaVM) -> LuaResult<LuaValue> {
    match json_value {
        JsonValue::Null => Ok(LuaValue::nil()),
        JsonValue::Bool(b) => Ok(LuaValue::boolean(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(vm.integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(LuaValue::float(f))
            } else {
                Err(LuaError::runtime("invalid JSON number"))
            }
        }
        JsonValue::String(s) => Ok(vm.create_string(s)),
        JsonValue::Array(arr) => json_array_to_lua_table(arr, vm),
        JsonValue::Object(obj) => json_object_to_lua_table(obj, vm),
    }
}

/// Convert a JSON string to a Lua value
pub fn from_str(json_str: &str, vm: &LuaVM) -> LuaResult<LuaValue> {
    let json_value: JsonValue = serde_json::from_str(json_str)
        .map_err(|e| LuaError::runtime(format!("failed to parse JSON: {}", e)))?;
    from_value(&json_value, vm)
}

fn json_array_to_lua_table(arr: &[JsonValue], vm: &LuaVM) -> LuaResult<LuaValue> {
    let table = vm.create_table(arr.len(), 0);
    for (i, item) in arr.iter().enumerate() {
        let value = from_value(item, vm)?;
        // null elements leave holes
        vm.raw_set(&table, LuaValue::Integer(i as i64 + 1), value)?;
    }
    Ok(table)
}

fn json_object_to_lua_table(
    obj: &serde_json::Map<String, JsonValue>,
    vm: &LuaVM,
) -> LuaResult<LuaValue> {
    let table = vm.create_table(0, obj.len());
    for (key_str, value_json) in obj {
        let key = vm.create_string(key_str);
        let value = from_value(value_json, vm)?;
        vm.raw_set(&table, key, value)?;
    }
    Ok(table)
}
