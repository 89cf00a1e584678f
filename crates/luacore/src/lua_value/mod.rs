// Runtime value representation
// Closed set of kinds; reference kinds are shared through Rc and compared by identity
mod lua_convert;
mod lua_function;
pub mod lua_number;
mod lua_string;
pub mod lua_table;
mod lua_thread;
mod lua_userdata;
mod lua_value;

use std::cell::RefCell;
use std::rc::Rc;

pub use lua_convert::FromLua;
pub use lua_function::{FunctionBody, LuaFunction, NativeFunction};
pub use lua_number::ArithOp;
pub use lua_string::LuaString;
pub use lua_table::{LuaTable, WeakMode};
pub use lua_thread::{CoroutineStatus, LuaThread};
pub use lua_userdata::LuaUserdata;
pub use lua_value::{LuaValue, LuaValueKind};

pub type StringPtr = Rc<LuaString>;
pub type TablePtr = Rc<RefCell<LuaTable>>;
pub type FunctionPtr = Rc<LuaFunction>;
pub type UserdataPtr = Rc<LuaUserdata>;
pub type ThreadPtr = Rc<LuaThread>;

/// Multi-return values from functions and metamethods
/// - Empty: no return values
/// - Single: one value (no heap allocation, most common case)
/// - Many: 2+ values stored in Vec (heap allocation only when needed)
#[derive(Debug, Clone, Default)]
pub enum MultiValue {
    #[default]
    Empty,
    Single(LuaValue),
    Many(Vec<LuaValue>),
}

impl MultiValue {
    #[inline(always)]
    pub fn empty() -> Self {
        MultiValue::Empty
    }

    #[inline(always)]
    pub fn single(value: LuaValue) -> Self {
        MultiValue::Single(value)
    }

    #[inline(always)]
    pub fn two(v1: LuaValue, v2: LuaValue) -> Self {
        MultiValue::Many(vec![v1, v2])
    }

    pub fn multiple(mut values: Vec<LuaValue>) -> Self {
        match values.len() {
            0 => MultiValue::Empty,
            1 => MultiValue::Single(values.pop().unwrap_or_default()),
            _ => MultiValue::Many(values),
        }
    }

    pub fn all_values(self) -> Vec<LuaValue> {
        match self {
            MultiValue::Empty => Vec::new(),
            MultiValue::Single(v) => vec![v],
            MultiValue::Many(v) => v,
        }
    }

    /// Get count of return values (no allocation)
    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            MultiValue::Empty => 0,
            MultiValue::Single(_) => 1,
            MultiValue::Many(v) => v.len(),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First value, the only one a metamethod result contributes
    pub fn first(&self) -> Option<LuaValue> {
        self.get(0)
    }

    /// Get value at index (0-based)
    pub fn get(&self, index: usize) -> Option<LuaValue> {
        match self {
            MultiValue::Empty => None,
            MultiValue::Single(v) => (index == 0).then(|| v.clone()),
            MultiValue::Many(v) => v.get(index).cloned(),
        }
    }

    /// First value, or nil when there is none
    pub fn into_first(self) -> LuaValue {
        match self {
            MultiValue::Empty => LuaValue::Nil,
            MultiValue::Single(v) => v,
            MultiValue::Many(v) => v.into_iter().next().unwrap_or_default(),
        }
    }
}
