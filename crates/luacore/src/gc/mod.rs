// Allocation identity and hashing shared by values, tables and the interner.
// Objects are reference counted; nothing here traces or sweeps.

mod string_interner;

use std::hash::{BuildHasher, Hasher};
use std::sync::LazyLock;

use ahash::RandomState;

pub use string_interner::StringInterner;

/// Fixed seeds keep string hashes, and therefore table enumeration order,
/// identical from run to run.
static STRING_HASHER: LazyLock<RandomState> = LazyLock::new(|| {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
});

#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = STRING_HASHER.build_hasher();
    hasher.write(bytes);
    hasher.finish()
}

/// Finalizer from splitmix64; spreads integer and address keys over buckets.
#[inline]
pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Identity hash of a shared allocation, stable for its lifetime.
#[inline]
pub fn identity_hash<T: ?Sized>(ptr: *const T) -> u64 {
    mix64(ptr as *const u8 as usize as u64)
}
