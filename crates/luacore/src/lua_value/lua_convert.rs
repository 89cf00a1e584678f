//! Conversions between Rust types and `LuaValue`.
//!
//! `From<T> for LuaValue` builds values from native types; [`FromLua`]
//! goes the other way with the same coercions as the `check_*` family.
//!
//! # Built-in impls
//! - `()`, `bool`, `i8`..`i64`, `u8`..`u32`, `f32`, `f64`
//! - `String`, `&str`, `Vec<u8>`, `&[u8]`
//! - `Option<T>` (nil maps to `None`)
//! - `LuaValue` (identity)

use crate::lua_value::{
    FunctionPtr, LuaFunction, LuaTable, LuaUserdata, LuaValue, StringPtr, TablePtr, UserdataPtr,
};
use crate::lua_vm::{LuaError, LuaResult};

/// Convert a `LuaValue` into a Rust type.
pub trait FromLua: Sized {
    fn from_lua(value: &LuaValue) -> LuaResult<Self>;
}

// ==================== Identity ====================

impl FromLua for LuaValue {
    #[inline]
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        Ok(value.clone())
    }
}

impl FromLua for () {
    #[inline]
    fn from_lua(_value: &LuaValue) -> LuaResult<Self> {
        Ok(())
    }
}

impl From<()> for LuaValue {
    fn from(_: ()) -> Self {
        LuaValue::Nil
    }
}

// ==================== Booleans ====================

impl FromLua for bool {
    /// Truthiness, like a condition in script code.
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        Ok(value.is_truthy())
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

// ==================== Numbers ====================

macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl FromLua for $t {
                fn from_lua(value: &LuaValue) -> LuaResult<Self> {
                    let i = value.check_integer()?;
                    <$t>::try_from(i).map_err(|_| {
                        LuaError::TypeError(format!(
                            "integer {} out of range for {}",
                            i,
                            stringify!($t)
                        ))
                    })
                }
            }

            impl From<$t> for LuaValue {
                fn from(i: $t) -> Self {
                    LuaValue::Integer(i as i64)
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32);

impl FromLua for f64 {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_number()
    }
}

impl FromLua for f32 {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_number().map(|n| n as f32)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Float(n)
    }
}

impl From<f32> for LuaValue {
    fn from(n: f32) -> Self {
        LuaValue::Float(n as f64)
    }
}

// ==================== Strings ====================

impl FromLua for String {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_string().map(|s| s.to_str_lossy().into_owned())
    }
}

impl FromLua for Vec<u8> {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_string().map(|s| s.as_bytes().to_vec())
    }
}

impl FromLua for StringPtr {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_string()
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::string(s)
    }
}

impl From<String> for LuaValue {
    fn from(s: String) -> Self {
        LuaValue::string(s)
    }
}

impl From<&[u8]> for LuaValue {
    fn from(bytes: &[u8]) -> Self {
        LuaValue::string(bytes)
    }
}

impl From<Vec<u8>> for LuaValue {
    fn from(bytes: Vec<u8>) -> Self {
        LuaValue::string(bytes)
    }
}

impl From<StringPtr> for LuaValue {
    fn from(s: StringPtr) -> Self {
        LuaValue::String(s)
    }
}

// ==================== Reference kinds ====================

impl FromLua for TablePtr {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_table()
    }
}

impl FromLua for FunctionPtr {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_function()
    }
}

impl FromLua for UserdataPtr {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        value.check_userdata()
    }
}

impl From<TablePtr> for LuaValue {
    fn from(t: TablePtr) -> Self {
        LuaValue::Table(t)
    }
}

impl From<LuaTable> for LuaValue {
    fn from(t: LuaTable) -> Self {
        LuaValue::table(t)
    }
}

impl From<FunctionPtr> for LuaValue {
    fn from(f: FunctionPtr) -> Self {
        LuaValue::Function(f)
    }
}

impl From<LuaFunction> for LuaValue {
    fn from(f: LuaFunction) -> Self {
        LuaValue::function(f)
    }
}

impl From<UserdataPtr> for LuaValue {
    fn from(u: UserdataPtr) -> Self {
        LuaValue::Userdata(u)
    }
}

impl From<LuaUserdata> for LuaValue {
    fn from(u: LuaUserdata) -> Self {
        LuaValue::userdata(u)
    }
}

// ==================== Option<T> ====================

impl<T: FromLua> FromLua for Option<T> {
    fn from_lua(value: &LuaValue) -> LuaResult<Self> {
        if value.is_nil() {
            Ok(None)
        } else {
            T::from_lua(value).map(Some)
        }
    }
}

impl<T: Into<LuaValue>> From<Option<T>> for LuaValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => LuaValue::Nil,
        }
    }
}
