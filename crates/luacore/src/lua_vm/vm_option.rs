use crate::lua_vm::lua_limits::{LUAI_MAXSHORTLEN, MAXTAGLOOP};

/// Width used for integer arithmetic results.
///
/// Integers are always stored in 64 bits; with [`IntegerWidth::Bits32`]
/// every integer result is wrapped to the 32-bit two's-complement range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum IntegerWidth {
    Bits32,
    #[default]
    Bits64,
}

impl IntegerWidth {
    /// Wraps an integer result to this width.
    #[inline]
    pub fn wrap(self, i: i64) -> i64 {
        match self {
            IntegerWidth::Bits32 => i as i32 as i64,
            IntegerWidth::Bits64 => i,
        }
    }
}

/// Per-instance runtime options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VmOption {
    pub integer_width: IntegerWidth,
    /// Strings up to this many bytes are interned.
    pub short_string_limit: usize,
    /// Maximum length of an __index / __newindex chain.
    pub max_tag_loop: usize,
    /// Array part hint used by `LuaVM::new_table`.
    pub default_array_size: usize,
    /// Hash part hint used by `LuaVM::new_table`.
    pub default_hash_size: usize,
}

impl Default for VmOption {
    fn default() -> Self {
        Self {
            integer_width: IntegerWidth::Bits64,
            short_string_limit: LUAI_MAXSHORTLEN,
            max_tag_loop: MAXTAGLOOP,
            default_array_size: 0,
            default_hash_size: 0,
        }
    }
}

impl VmOption {
    pub fn with_integer_width(mut self, width: IntegerWidth) -> Self {
        self.integer_width = width;
        self
    }

    pub fn with_short_string_limit(mut self, limit: usize) -> Self {
        self.short_string_limit = limit;
        self
    }

    pub fn with_max_tag_loop(mut self, depth: usize) -> Self {
        self.max_tag_loop = depth.max(1);
        self
    }

    pub fn with_default_table_size(mut self, array: usize, hash: usize) -> Self {
        self.default_array_size = array;
        self.default_hash_size = hash;
        self
    }
}
