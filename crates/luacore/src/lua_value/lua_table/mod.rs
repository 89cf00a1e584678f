// LuaTable - hybrid array part + chained hash part
mod slot_chain;
mod weak_ref;

use std::cell::Cell;
use std::fmt;

use crate::gc::hash_bytes;
use crate::lua_value::lua_number::float_to_integer;
use crate::lua_value::{LuaValue, TablePtr};
use crate::lua_vm::lua_limits::{MAXABITS, MAXHBITS, MIN_HASH_SIZE};
use crate::lua_vm::{LuaError, LuaResult, TmKind};
use slot_chain::{SlotArena, SlotIdx};

pub use weak_ref::{Handle, WeakMode, WeakRef};

/// Associative array with an array part for keys `1..n` and a hash part
/// for everything else.
///
/// A key lives in the array part iff it is a positive integer within the
/// array bounds, and never in both parts. Float keys with an integral value
/// are stored as the equal integer.
pub struct LuaTable {
    array: Vec<LuaValue>,
    buckets: Vec<Option<SlotIdx>>,
    arena: SlotArena,
    metatable: Option<TablePtr>,
    mode: WeakMode,
    /// Set once `next` has handed out a hash-part key since the last
    /// rehash. While set, deletions leave tombstones.
    anchored: Cell<bool>,
}

impl LuaTable {
    /// Create an empty table; the hints pre-size both parts.
    pub fn new(array_hint: usize, hash_hint: usize) -> Self {
        let hash_size = if hash_hint == 0 {
            0
        } else {
            hash_hint.next_power_of_two()
        };
        LuaTable {
            array: Vec::with_capacity(array_hint),
            buckets: vec![None; hash_size],
            arena: SlotArena::with_capacity(hash_size),
            metatable: None,
            mode: WeakMode::default(),
            anchored: Cell::new(false),
        }
    }

    // ============ Metatable ============

    #[inline(always)]
    pub fn has_metatable(&self) -> bool {
        self.metatable.is_some()
    }

    pub fn get_metatable(&self) -> Option<TablePtr> {
        self.metatable.clone()
    }

    /// Attach or detach a metatable. The `__mode` field is read here; a
    /// change of weak mode rebuilds the table with the new handles.
    pub fn set_metatable(&mut self, metatable: Option<TablePtr>) -> LuaResult<()> {
        let mode = match &metatable {
            None => WeakMode::default(),
            Some(mt) => match mt.try_borrow() {
                Ok(mt) => WeakMode::from_mode(&mt.raw_get_str(TmKind::Mode.name())),
                // Already mutably borrowed: the table is its own metatable
                Err(_) => WeakMode::from_mode(&self.raw_get_str(TmKind::Mode.name())),
            },
        };
        self.metatable = metatable;
        if mode != self.mode {
            log::debug!("table weak mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.rehash(None)?;
        }
        Ok(())
    }

    pub fn weak_mode(&self) -> WeakMode {
        self.mode
    }

    // ============ Diagnostics ============

    /// Current bounds of the array part.
    pub fn array_capacity(&self) -> usize {
        self.array.len()
    }

    /// Number of buckets in the hash part.
    pub fn hash_capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Tombstones currently linked in the hash part.
    pub fn tombstone_count(&self) -> usize {
        self.arena.dead()
    }

    // ============ Lookup ============

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Value for `key`, nil if absent. Never fails.
    pub fn raw_get(&self, key: &LuaValue) -> LuaValue {
        match key {
            LuaValue::Nil => LuaValue::Nil,
            LuaValue::Integer(i) => self.raw_get_int(*i),
            LuaValue::Float(f) => match float_to_integer(*f) {
                Some(i) => self.raw_get_int(i),
                None if f.is_nan() => LuaValue::Nil,
                None => self.get_from_hash(key),
            },
            _ => self.get_from_hash(key),
        }
    }

    pub fn raw_get_int(&self, key: i64) -> LuaValue {
        if let Some(v) = self.array_slot(key) {
            return v.clone();
        }
        self.get_from_hash(&LuaValue::Integer(key))
    }

    /// Lookup by string contents without building a key value.
    pub fn raw_get_str(&self, key: &str) -> LuaValue {
        if self.buckets.is_empty() {
            return LuaValue::Nil;
        }
        let bytes = key.as_bytes();
        let hash = hash_bytes(bytes);
        let head = self.buckets[self.bucket_of(hash)];
        self.arena
            .find(head, hash, |k| k.as_bytes() == Some(bytes))
            .and_then(|idx| self.arena.value(idx))
            .unwrap_or_default()
    }

    #[inline]
    fn array_slot(&self, key: i64) -> Option<&LuaValue> {
        if key >= 1 {
            self.array.get((key - 1) as usize)
        } else {
            None
        }
    }

    fn find_slot(&self, key: &LuaValue) -> Option<SlotIdx> {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = key.hash_value();
        let head = self.buckets[self.bucket_of(hash)];
        self.arena.find(head, hash, |k| k.raw_equals(key))
    }

    fn get_from_hash(&self, key: &LuaValue) -> LuaValue {
        self.find_slot(key)
            .and_then(|idx| self.arena.value(idx))
            .unwrap_or_default()
    }

    // ============ Update ============

    /// Store `value` under `key`; nil deletes.
    ///
    /// Fails with `IndexError` for nil and NaN keys.
    pub fn raw_set(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let key = match key {
            LuaValue::Nil => return Err(LuaError::IndexError("table index is nil".to_owned())),
            LuaValue::Integer(i) => return self.raw_set_int(i, value),
            LuaValue::Float(f) => match float_to_integer(f) {
                Some(i) => return self.raw_set_int(i, value),
                None if f.is_nan() => {
                    return Err(LuaError::IndexError("table index is NaN".to_owned()));
                }
                None => LuaValue::Float(f),
            },
            other => other,
        };
        self.set_in_hash(key, value)
    }

    pub fn raw_set_int(&mut self, key: i64, value: LuaValue) -> LuaResult<()> {
        let len = self.array.len();
        if key >= 1 && ((key - 1) as u64) < len as u64 {
            self.array[(key - 1) as usize] = value;
            return Ok(());
        }
        let key_value = LuaValue::Integer(key);
        if key >= 1
            && (key - 1) as u64 == len as u64
            && !value.is_nil()
            && !self.mode.values
            && !self.hash_holds(&key_value)
        {
            // Append a new key. Pulling in the integer keys that now continue
            // the array waits for the next rehash while an enumeration may be
            // walking the hash part.
            self.array.push(value);
            if self.anchored.get() {
                return Ok(());
            }
            return self.absorb_hash_tail();
        }
        // A key already in the hash part, live or tombstone, is updated there
        self.set_in_hash(key_value, value)
    }

    // Whether `key` has a slot in the hash part, tombstones included.
    fn hash_holds(&self, key: &LuaValue) -> bool {
        if self.buckets.is_empty() {
            return false;
        }
        let hash = key.hash_value();
        let head = self.buckets[self.bucket_of(hash)];
        self.arena.locate(head, hash, |k| k.raw_equals(key)).is_some()
    }

    pub fn raw_set_str(&mut self, key: &str, value: LuaValue) -> LuaResult<()> {
        self.raw_set(LuaValue::string(key), value)
    }

    fn set_in_hash(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let hash = key.hash_value();
        if !self.buckets.is_empty() {
            let b = self.bucket_of(hash);
            let anchored = self.anchored.get();
            self.arena.prune(&mut self.buckets[b], anchored)?;
            if let Some(idx) = self.arena.locate(self.buckets[b], hash, |k| k.raw_equals(&key)) {
                if value.is_nil() {
                    if self.arena.is_live(idx) {
                        self.arena.remove(&mut self.buckets[b], idx, anchored)?;
                    }
                } else {
                    let key = Handle::entry(key, self.mode.keys);
                    let value = Handle::entry(value, self.mode.values);
                    self.arena.assign(idx, key, value);
                }
                return Ok(());
            }
        }
        if value.is_nil() {
            return Ok(());
        }
        if self.arena.used() >= self.buckets.len() {
            self.rehash(Some(&key))?;
            // the key may now belong to the array part
            return self.raw_set(key, value);
        }
        self.insert_fresh(key, value)
    }

    // Append to the hash part; the caller guarantees room and absence.
    fn insert_fresh(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        if self.buckets.is_empty() {
            return Err(LuaError::InternalError(
                "insert into an empty hash part".to_owned(),
            ));
        }
        let hash = key.hash_value();
        let b = self.bucket_of(hash);
        let key = Handle::entry(key, self.mode.keys);
        let value = Handle::entry(value, self.mode.values);
        self.arena.append(&mut self.buckets[b], hash, key, value)?;
        Ok(())
    }

    fn take_from_hash(&mut self, key: &LuaValue) -> LuaResult<Option<LuaValue>> {
        if self.arena.live() == 0 {
            return Ok(None);
        }
        let hash = key.hash_value();
        let b = self.bucket_of(hash);
        let Some(idx) = self.arena.find(self.buckets[b], hash, |k| k.raw_equals(key)) else {
            return Ok(None);
        };
        let value = self.arena.value(idx);
        self.arena.remove(&mut self.buckets[b], idx, false)?;
        Ok(value)
    }

    // Move keys len+1, len+2, ... from the hash part to the array part.
    fn absorb_hash_tail(&mut self) -> LuaResult<()> {
        let mut moved = 0usize;
        while self.arena.live() > 0 {
            let next_key = LuaValue::Integer(self.array.len() as i64 + 1);
            match self.take_from_hash(&next_key)? {
                Some(v) => {
                    self.array.push(v);
                    moved += 1;
                }
                None => break,
            }
        }
        if moved > 0 {
            log::trace!("migrated {} keys from hash part to array part", moved);
        }
        Ok(())
    }

    // ============ Rehash ============

    /// Recompute both part sizes from the live keys (plus `extra`, the key
    /// about to be inserted) and re-insert everything. Drops tombstones.
    fn rehash(&mut self, extra: Option<&LuaValue>) -> LuaResult<()> {
        // nums[i] = number of integer keys k with 2^(i-1) < k <= 2^i
        let mut nums = [0usize; MAXABITS + 1];
        let mut total_int = 0usize;
        for (i, v) in self.array.iter().enumerate() {
            if !v.is_nil() && count_int_key(i as i64 + 1, &mut nums) {
                total_int += 1;
            }
        }
        let mut total = total_int;
        for &head in &self.buckets {
            for idx in self.arena.chain(head) {
                if let Some((key, _)) = self.arena.entry(idx) {
                    total += 1;
                    if let LuaValue::Integer(k) = key {
                        if count_int_key(k, &mut nums) {
                            total_int += 1;
                        }
                    }
                }
            }
        }
        if let Some(key) = extra {
            total += 1;
            if let LuaValue::Integer(k) = key {
                if count_int_key(*k, &mut nums) {
                    total_int += 1;
                }
            }
        }
        let (array_size, array_count) = if self.mode.values {
            (0, 0)
        } else {
            compute_sizes(&nums, total_int)
        };
        self.resize(array_size, total - array_count)
    }

    fn resize(&mut self, array_size: usize, hash_count: usize) -> LuaResult<()> {
        let hash_size = if hash_count == 0 {
            0
        } else {
            hash_count.next_power_of_two().max(MIN_HASH_SIZE)
        };
        if hash_size > (1 << MAXHBITS) {
            return Err(LuaError::IndexError("table overflow".to_owned()));
        }

        let old_array_size = self.array.len();
        let old_hash_size = self.buckets.len();
        let old_buckets = std::mem::take(&mut self.buckets);
        let old_arena = std::mem::take(&mut self.arena);

        let mut pending = Vec::with_capacity(old_arena.live());
        if array_size < self.array.len() {
            for (offset, v) in self.array.drain(array_size..).enumerate() {
                if !v.is_nil() {
                    let key = LuaValue::Integer((array_size + offset + 1) as i64);
                    pending.push((key, v));
                }
            }
            self.array.shrink_to(array_size);
        } else {
            self.array.resize(array_size, LuaValue::Nil);
        }
        for head in old_buckets {
            pending.extend(old_arena.chain(head).filter_map(|idx| old_arena.entry(idx)));
        }

        self.buckets = vec![None; hash_size];
        self.arena = SlotArena::with_capacity(hash_size);
        self.anchored.set(false);

        for (key, value) in pending {
            if let LuaValue::Integer(k) = key {
                if k >= 1 && ((k - 1) as u64) < self.array.len() as u64 {
                    self.array[(k - 1) as usize] = value;
                    continue;
                }
            }
            self.insert_fresh(key, value)?;
        }
        log::trace!(
            "table rehash: array {} -> {}, hash {} -> {} buckets",
            old_array_size,
            array_size,
            old_hash_size,
            hash_size
        );
        Ok(())
    }

    // ============ Length ============

    /// A border: `t[n] ~= nil` and `t[n+1] == nil`, or 0 when `t[1]` is nil.
    pub fn length(&self) -> usize {
        let n = self.array.len();
        if n > 0 && self.array[n - 1].is_nil() {
            // binary search for a border inside the array part
            let (mut i, mut j) = (0usize, n);
            while j - i > 1 {
                let m = (i + j) / 2;
                if self.array[m - 1].is_nil() {
                    j = m;
                } else {
                    i = m;
                }
            }
            return i;
        }
        if self.arena.live() == 0 {
            return n;
        }
        self.hash_search(n as u64)
    }

    // Unbounded search past the array part; t[j] is non-nil or j is 0.
    fn hash_search(&self, j: u64) -> usize {
        let mut i = j;
        let mut j = j + 1;
        while !self.raw_get_int(j as i64).is_nil() {
            i = j;
            if j > (i64::MAX as u64) / 2 {
                // pathological table: linear search
                let mut k: i64 = 1;
                while !self.raw_get_int(k).is_nil() {
                    k += 1;
                }
                return (k - 1) as usize;
            }
            j *= 2;
        }
        while j - i > 1 {
            let m = (i + j) / 2;
            if self.raw_get_int(m as i64).is_nil() {
                j = m;
            } else {
                i = m;
            }
        }
        i as usize
    }

    // ============ List operations ============

    /// Insert at `pos`, shifting up; `pos == 0` appends.
    pub fn insert(&mut self, pos: i64, value: LuaValue) -> LuaResult<()> {
        let n = self.length() as i64;
        let pos = if pos == 0 { n + 1 } else { pos };
        if pos < 1 || pos > n + 1 {
            return Err(LuaError::IndexError(format!(
                "position {} out of bounds",
                pos
            )));
        }
        if pos == n + 1 {
            return self.raw_set_int(pos, value);
        }
        let len = self.array.len() as i64;
        if n < len {
            // t[n+1] is a hole inside the array part
            self.array[(pos - 1) as usize..=n as usize].rotate_right(1);
            self.array[(pos - 1) as usize] = value;
            return Ok(());
        }
        if n == len && !self.mode.values && !self.anchored.get() {
            self.array.insert((pos - 1) as usize, value);
            return self.absorb_hash_tail();
        }
        // the sequence continues in the hash part
        let mut i = n;
        while i >= pos {
            let v = self.raw_get_int(i);
            self.raw_set_int(i + 1, v)?;
            i -= 1;
        }
        self.raw_set_int(pos, value)
    }

    /// Remove at `pos`, shifting down; `pos == 0` removes the last element.
    /// Returns the removed value.
    pub fn remove(&mut self, pos: i64) -> LuaResult<LuaValue> {
        let n = self.length() as i64;
        if pos == 0 && n == 0 {
            return Ok(LuaValue::Nil);
        }
        let pos = if pos == 0 { n } else { pos };
        if pos != n && (pos < 1 || pos > n + 1) {
            return Err(LuaError::IndexError(format!(
                "position {} out of bounds",
                pos
            )));
        }
        if pos <= n && n <= self.array.len() as i64 {
            let removed = std::mem::take(&mut self.array[(pos - 1) as usize]);
            self.array[(pos - 1) as usize..n as usize].rotate_left(1);
            return Ok(removed);
        }
        let removed = self.raw_get_int(pos);
        let mut i = pos;
        while i < n {
            let v = self.raw_get_int(i + 1);
            self.raw_set_int(i, v)?;
            i += 1;
        }
        self.raw_set_int(i, LuaValue::Nil)?;
        Ok(removed)
    }

    // ============ Iteration ============

    /// Entry following `key`, or `None` at the end; `next(nil)` starts.
    ///
    /// Order: array indices ascending, then bucket order and chain order.
    /// Keys deleted during the enumeration stay valid cursors.
    pub fn next(&self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let (bucket, start) = match key.to_table_key() {
            None if key.is_nil() => return Ok(self.scan_array(0)),
            None => return Err(invalid_next_key()),
            Some(LuaValue::Integer(i)) if i >= 1 && ((i - 1) as u64) < self.array.len() as u64 => {
                return Ok(self.scan_array(i as usize));
            }
            Some(key) => {
                if self.buckets.is_empty() {
                    return Err(invalid_next_key());
                }
                let hash = key.hash_value();
                let b = self.bucket_of(hash);
                let idx = self
                    .arena
                    .locate(self.buckets[b], hash, |k| k.raw_equals(&key))
                    .ok_or_else(invalid_next_key)?;
                (b, self.arena.slot(idx).next)
            }
        };
        Ok(self.scan_hash(bucket, start))
    }

    fn scan_array(&self, from: usize) -> Option<(LuaValue, LuaValue)> {
        for (i, v) in self.array.iter().enumerate().skip(from) {
            if !v.is_nil() {
                return Some((LuaValue::Integer(i as i64 + 1), v.clone()));
            }
        }
        let head = self.buckets.first().copied().flatten();
        self.scan_hash(0, head)
    }

    fn scan_hash(&self, mut bucket: usize, mut start: Option<SlotIdx>) -> Option<(LuaValue, LuaValue)> {
        while bucket < self.buckets.len() {
            for idx in self.arena.chain(start) {
                if let Some(entry) = self.arena.entry(idx) {
                    self.anchored.set(true);
                    return Some(entry);
                }
            }
            bucket += 1;
            start = self.buckets.get(bucket).copied().flatten();
        }
        None
    }

    /// Number of keys with a non-nil value.
    pub fn key_count(&self) -> usize {
        let in_array = self.array.iter().filter(|v| !v.is_nil()).count();
        in_array + self.hash_entries().count()
    }

    pub fn keys(&self) -> Vec<LuaValue> {
        self.iter().map(|(k, _)| k).collect()
    }

    /// All entries in `next` order. Borrows the table for the duration.
    pub fn iter(&self) -> impl Iterator<Item = (LuaValue, LuaValue)> + '_ {
        let array = self
            .array
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nil())
            .map(|(i, v)| (LuaValue::Integer(i as i64 + 1), v.clone()));
        array.chain(self.hash_entries())
    }

    fn hash_entries(&self) -> impl Iterator<Item = (LuaValue, LuaValue)> + '_ {
        self.buckets
            .iter()
            .flat_map(move |&head| self.arena.chain(head))
            .filter_map(move |idx| self.arena.entry(idx))
    }
}

impl Default for LuaTable {
    fn default() -> Self {
        LuaTable::new(0, 0)
    }
}

impl fmt::Debug for LuaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaTable")
            .field("array", &self.array.len())
            .field("hash", &self.buckets.len())
            .field("live", &self.arena.live())
            .field("dead", &self.arena.dead())
            .field("mode", &self.mode)
            .finish()
    }
}

fn invalid_next_key() -> LuaError {
    LuaError::IndexError("invalid key to 'next'".to_owned())
}

#[inline]
fn ceil_log2(x: u64) -> usize {
    if x <= 1 {
        0
    } else {
        (64 - (x - 1).leading_zeros()) as usize
    }
}

// Count an integer key for the array-size computation.
fn count_int_key(k: i64, nums: &mut [usize]) -> bool {
    if k >= 1 && (k as u64) <= (1u64 << MAXABITS) {
        nums[ceil_log2(k as u64)] += 1;
        true
    } else {
        false
    }
}

/// Largest power of two `n` such that more than half of `1..n` are in use.
/// Returns the size and the number of integer keys it will hold.
fn compute_sizes(nums: &[usize], total_int: usize) -> (usize, usize) {
    let mut a = 0usize;
    let mut na = 0usize;
    let mut optimal = 0usize;
    let mut twotoi = 1usize;
    for &count in nums {
        if total_int <= twotoi / 2 {
            break;
        }
        a += count;
        if a > twotoi / 2 {
            optimal = twotoi;
            na = a;
        }
        twotoi *= 2;
    }
    (optimal, na)
}
