/// JSON conversion for Lua values
///
/// Conversions go through free functions taking the runtime instance, so
/// strings created on import are interned like any other.
mod deserializer;
mod serializer;

pub use deserializer::{from_str as deserialize_from_json_str, from_value as deserialize_from_json};
pub use serializer::{to_string as serialize_to_json_string, to_value as serialize_to_json};

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaResult, LuaVM};

/// Convert a Lua value to a serde_json::Value
pub fn lua_to_json(lua_value: &LuaValue) -> LuaResult<serde_json::Value> {
    serialize_to_json(lua_value)
}

/// Convert a Lua value to a JSON string
pub fn lua_to_json_string(lua_value: &LuaValue, pretty: bool) -> LuaResult<String> {
    serialize_to_json_string(lua_value, pretty)
}

/// Convert a serde_json::Value to a Lua value
pub fn json_to_lua(json_value: &serde_json::Value, vm: &LuaVM) -> LuaResult<LuaValue> {
    deserialize_from_json(json_value, vm)
}

/// Convert a JSON string to a Lua value
pub fn json_string_to_lua(json_str: &str, vm: &LuaVM) -> LuaResult<LuaValue> {
    deserialize_from_json_str(json_str, vm)
}
