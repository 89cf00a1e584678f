use ahash::RandomState;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::gc::hash_bytes;
use crate::lua_value::{LuaString, StringPtr};
use crate::lua_vm::lua_limits::INTERNER_SWEEP_INTERVAL;

/// Short-string interner owned by one runtime instance.
///
/// - Equal short strings created through the same instance share one allocation
/// - Entries are weak, so an interned string dies with its last user
/// - Long strings are never interned
pub struct StringInterner {
    // Content hash -> weak entries with that hash
    map: HashMap<u64, Vec<Weak<LuaString>>, RandomState>,
    short_limit: usize,
    inserts_since_sweep: usize,
}

impl StringInterner {
    pub fn new(short_limit: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(256, RandomState::new()),
            short_limit,
            inserts_since_sweep: 0,
        }
    }

    /// Intern a byte string - returns the existing allocation if one is alive
    pub fn intern(&mut self, bytes: &[u8]) -> StringPtr {
        let hash = hash_bytes(bytes);

        // Long strings are not interned
        if bytes.len() > self.short_limit {
            return Rc::new(LuaString::with_hash(bytes, hash));
        }

        let entries = self.map.entry(hash).or_default();
        for weak in entries.iter() {
            if let Some(existing) = weak.upgrade() {
                if existing.as_bytes() == bytes {
                    return existing;
                }
            }
        }
        entries.retain(|weak| weak.strong_count() > 0);

        let ptr = Rc::new(LuaString::with_hash(bytes, hash));
        entries.push(Rc::downgrade(&ptr));

        self.inserts_since_sweep += 1;
        if self.inserts_since_sweep >= INTERNER_SWEEP_INTERVAL {
            self.sweep();
        }
        ptr
    }

    /// Drop entries whose strings have been released.
    pub fn sweep(&mut self) {
        let before = self.map.len();
        self.map.retain(|_, entries| {
            entries.retain(|weak| weak.strong_count() > 0);
            !entries.is_empty()
        });
        self.inserts_since_sweep = 0;
        log::trace!(
            "string interner sweep: {} -> {} hash groups",
            before,
            self.map.len()
        );
    }

    /// Number of interned strings still alive.
    pub fn len(&self) -> usize {
        self.map
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
