// Lua value core
// Dynamic values, the numeric tower and hybrid array/hash tables

#[cfg(test)]
mod test;

pub mod gc;
pub mod lua_value;
pub mod lua_vm;

#[cfg(feature = "serde")]
pub mod serde;

pub use gc::StringInterner;
pub use lua_value::{
    ArithOp, FromLua, FunctionPtr, LuaFunction, LuaString, LuaTable, LuaThread, LuaUserdata,
    LuaValue, LuaValueKind, MultiValue, StringPtr, TablePtr, ThreadPtr, UserdataPtr, WeakMode,
};
pub use lua_vm::{
    IntegerWidth, LuaError, LuaResult, LuaVM, MetamethodCaller, NativeCaller, TmKind, VmOption,
};
