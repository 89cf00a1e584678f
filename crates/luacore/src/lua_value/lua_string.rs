use std::borrow::Cow;
use std::fmt;

use crate::gc::hash_bytes;
use crate::lua_vm::lua_limits::LUAI_MAXSHORTLEN;

/// Immutable byte string with its hash computed once at construction.
///
/// Contents are arbitrary bytes, not necessarily UTF-8.
pub struct LuaString {
    hash: u64, // Keep hash first for alignment
    data: Box<[u8]>,
}

impl LuaString {
    pub fn new(bytes: &[u8]) -> Self {
        LuaString {
            hash: hash_bytes(bytes),
            data: bytes.into(),
        }
    }

    /// Create LuaString with pre-computed hash (avoids double hashing)
    #[inline]
    pub(crate) fn with_hash(bytes: &[u8], hash: u64) -> Self {
        LuaString {
            hash,
            data: bytes.into(),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Contents as `&str` when they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn cached_hash(&self) -> u64 {
        self.hash
    }

    /// Short strings are interned and held strongly by tombstones.
    #[inline]
    pub fn is_short(&self) -> bool {
        self.data.len() <= LUAI_MAXSHORTLEN
    }
}

impl PartialEq for LuaString {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: compare hashes first
        if self.hash != other.hash {
            return false;
        }
        self.data == other.data
    }
}

impl Eq for LuaString {}

impl PartialOrd for LuaString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LuaString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.data.cmp(&other.data)
    }
}

impl fmt::Debug for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}
