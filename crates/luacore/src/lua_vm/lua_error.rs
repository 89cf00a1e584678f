use smol_str::SmolStr;
use thiserror::Error;

use crate::lua_value::LuaValue;

/// Errors raised by value and table operations.
///
/// Metamethod errors are carried through unchanged, so a `RuntimeError`
/// raised inside an `__index` handler reaches the caller as-is.
#[derive(Debug, Clone, Error)]
pub enum LuaError {
    /// Operand of the wrong kind ("attempt to index a nil value").
    #[error("{0}")]
    TypeError(String),
    /// A string operand that does not convert to a number.
    #[error("{0}")]
    ArithmeticTypeError(String),
    /// Invalid table key or position.
    #[error("{0}")]
    IndexError(String),
    /// Bad argument to a library function.
    #[error("bad argument #{position} to '{function}' ({message})")]
    ArgumentError {
        position: usize,
        function: SmolStr,
        message: String,
    },
    /// An error value raised by script code.
    #[error("{0}")]
    RuntimeError(LuaValue),
    /// Violated internal invariant.
    #[error("internal error: {0}")]
    InternalError(String),
}

pub type LuaResult<T> = Result<T, LuaError>;

impl LuaError {
    /// Error for a value that is not of the expected kind.
    pub fn type_error(expected: &str, got: &LuaValue) -> Self {
        LuaError::TypeError(format!("{} expected, got {}", expected, got.type_name()))
    }

    /// Runtime error carrying a string message.
    pub fn runtime(message: impl AsRef<str>) -> Self {
        LuaError::RuntimeError(LuaValue::string(message.as_ref()))
    }

    pub fn argument(position: usize, function: &str, message: impl Into<String>) -> Self {
        LuaError::ArgumentError {
            position,
            function: SmolStr::new(function),
            message: message.into(),
        }
    }

    /// The error as a value, for handing back to scripts.
    pub fn to_value(&self) -> LuaValue {
        match self {
            LuaError::RuntimeError(value) => value.clone(),
            other => LuaValue::string(other.to_string()),
        }
    }
}
