//! Centralized limits and tuning constants for values and tables.
//!
//! Mirrors the `luaconf.h` / `llimits.h` split of the reference
//! implementation. Values that a host may want to change at runtime are
//! also exposed through [`VmOption`](super::VmOption).

// ===== Strings =====

/// Maximum length for "short" strings (interned per runtime instance).
/// Longer strings are never interned and are held weakly by tombstones.
/// Matches Lua's LUAI_MAXSHORTLEN.
pub const LUAI_MAXSHORTLEN: usize = 40;

/// Number of interner insertions between sweeps of dead weak entries.
pub const INTERNER_SWEEP_INTERVAL: usize = 1024;

// ===== Tables =====

/// Upper bound on `log2` of the array part size considered by a rehash.
/// Integer keys above `2^MAXABITS` always live in the hash part.
pub const MAXABITS: usize = 31;

/// Smallest non-empty hash part (number of buckets).
pub const MIN_HASH_SIZE: usize = 4;

/// Largest hash part a table may grow to, as `log2` of the bucket count.
/// Slot links are `u32`, so the arena can never address more.
pub const MAXHBITS: usize = 30;

// ===== Metamethods =====

/// Maximum depth for __index / __newindex metamethod chains.
/// Prevents infinite loops in metamethod resolution.
/// Matches Lua's MAXTAGLOOP.
pub const MAXTAGLOOP: usize = 2000;
