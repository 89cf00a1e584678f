// Bucket chains for the hash part of a table.
// Slots live in an arena owned by the table and link to each other by index;
// each bucket stores the index of its first slot.

use crate::lua_value::LuaValue;
use crate::lua_value::lua_table::weak_ref::Handle;
use crate::lua_vm::lua_limits::LUAI_MAXSHORTLEN;
use crate::lua_vm::{LuaError, LuaResult};

pub(crate) type SlotIdx = u32;

pub(crate) enum SlotState {
    Live { key: Handle, value: Handle },
    /// Tombstone: the value was removed while an enumeration could still
    /// resume from this key.
    Dead { key: Handle },
    Free,
}

pub(crate) struct Slot {
    pub hash: u64,
    pub next: Option<SlotIdx>,
    pub state: SlotState,
}

/// Keys a tombstone must not keep alive on its own.
#[inline]
fn is_large_key(key: &LuaValue) -> bool {
    match key {
        LuaValue::String(s) => s.len() > LUAI_MAXSHORTLEN,
        other => other.is_collectable(),
    }
}

#[derive(Default)]
pub(crate) struct SlotArena {
    slots: Vec<Slot>,
    free: Option<SlotIdx>,
    live: usize,
    dead: usize,
}

impl SlotArena {
    pub fn with_capacity(capacity: usize) -> Self {
        SlotArena {
            slots: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Live slots, including ones whose weak key or value has expired.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn dead(&self) -> usize {
        self.dead
    }

    /// Slots that occupy room in the hash part.
    #[inline]
    pub fn used(&self) -> usize {
        self.live + self.dead
    }

    #[inline]
    pub fn slot(&self, idx: SlotIdx) -> &Slot {
        &self.slots[idx as usize]
    }

    /// Slot indices of the chain starting at `head`, in link order.
    pub fn chain(&self, head: Option<SlotIdx>) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            cursor: head,
            budget: self.slots.len(),
        }
    }

    /// Live slot holding `key`; tombstones are skipped.
    pub fn find(
        &self,
        head: Option<SlotIdx>,
        hash: u64,
        eq: impl Fn(&LuaValue) -> bool,
    ) -> Option<SlotIdx> {
        self.chain(head).find(|&idx| {
            let slot = self.slot(idx);
            slot.hash == hash
                && matches!(&slot.state, SlotState::Live { key, .. } if key.matches(&eq))
        })
    }

    /// Live slot or tombstone holding `key`.
    pub fn locate(
        &self,
        head: Option<SlotIdx>,
        hash: u64,
        eq: impl Fn(&LuaValue) -> bool,
    ) -> Option<SlotIdx> {
        self.chain(head).find(|&idx| {
            let slot = self.slot(idx);
            slot.hash == hash
                && match &slot.state {
                    SlotState::Live { key, .. } | SlotState::Dead { key } => key.matches(&eq),
                    SlotState::Free => false,
                }
        })
    }

    #[inline]
    pub fn is_live(&self, idx: SlotIdx) -> bool {
        matches!(self.slot(idx).state, SlotState::Live { .. })
    }

    /// Value of a live slot, `None` for tombstones and expired weak values.
    pub fn value(&self, idx: SlotIdx) -> Option<LuaValue> {
        match &self.slot(idx).state {
            SlotState::Live { value, .. } => value.get(),
            _ => None,
        }
    }

    /// Key and value of a live slot whose handles are both alive.
    pub fn entry(&self, idx: SlotIdx) -> Option<(LuaValue, LuaValue)> {
        match &self.slot(idx).state {
            SlotState::Live { key, value } => Some((key.get()?, value.get()?)),
            _ => None,
        }
    }

    /// Append a new live slot at the tail of the chain.
    pub fn append(
        &mut self,
        head: &mut Option<SlotIdx>,
        hash: u64,
        key: Handle,
        value: Handle,
    ) -> LuaResult<SlotIdx> {
        let tail = self.chain(*head).last();
        let idx = self.alloc(Slot {
            hash,
            next: None,
            state: SlotState::Live { key, value },
        })?;
        match tail {
            Some(tail) => self.link(tail, Some(idx))?,
            None => *head = Some(idx),
        }
        self.live += 1;
        Ok(idx)
    }

    /// Store a value in a live slot or revive a tombstone.
    pub fn assign(&mut self, idx: SlotIdx, key: Handle, value: Handle) {
        let slot = &mut self.slots[idx as usize];
        if matches!(slot.state, SlotState::Dead { .. }) {
            self.dead -= 1;
            self.live += 1;
        }
        slot.state = SlotState::Live { key, value };
    }

    /// Remove the entry in a live slot.
    ///
    /// With `keep_tombstone` the slot stays linked as a tombstone so that an
    /// enumeration can resume from its key; otherwise it is unlinked.
    pub fn remove(
        &mut self,
        head: &mut Option<SlotIdx>,
        idx: SlotIdx,
        keep_tombstone: bool,
    ) -> LuaResult<()> {
        if !keep_tombstone {
            self.unlink(head, idx)?;
            self.release(idx);
            return Ok(());
        }
        let slot = &mut self.slots[idx as usize];
        let state = std::mem::replace(&mut slot.state, SlotState::Free);
        slot.state = match state {
            SlotState::Live { key, .. } => {
                self.live -= 1;
                self.dead += 1;
                match key.get() {
                    Some(k) => {
                        let weak = is_large_key(&k);
                        SlotState::Dead {
                            key: Handle::new(k, weak),
                        }
                    }
                    None => SlotState::Dead { key },
                }
            }
            other => other,
        };
        Ok(())
    }

    /// Unlink tombstones with expired keys and entries whose weak key or
    /// value has expired. Returns the number of slots released.
    pub fn prune(&mut self, head: &mut Option<SlotIdx>, anchored: bool) -> LuaResult<usize> {
        let mut released = Vec::new();
        let mut buried = Vec::new();
        for idx in self.chain(*head) {
            match &self.slot(idx).state {
                SlotState::Dead { key } if key.is_expired() => released.push(idx),
                SlotState::Live { key, .. } if key.is_expired() => released.push(idx),
                SlotState::Live { value, .. } if value.is_expired() => {
                    if anchored {
                        buried.push(idx);
                    } else {
                        released.push(idx);
                    }
                }
                _ => {}
            }
        }
        for idx in buried {
            self.remove(head, idx, true)?;
        }
        for &idx in &released {
            self.unlink(head, idx)?;
            self.release(idx);
        }
        if !released.is_empty() {
            log::debug!("pruned {} expired slots", released.len());
        }
        Ok(released.len())
    }

    fn unlink(&mut self, head: &mut Option<SlotIdx>, idx: SlotIdx) -> LuaResult<()> {
        let next = self.slot(idx).next;
        if *head == Some(idx) {
            *head = next;
            return Ok(());
        }
        let prev = self
            .chain(*head)
            .find(|&p| self.slot(p).next == Some(idx))
            .ok_or_else(|| LuaError::InternalError(format!("slot {} is not in its chain", idx)))?;
        self.link(prev, next)
    }

    fn link(&mut self, from: SlotIdx, to: Option<SlotIdx>) -> LuaResult<()> {
        if to == Some(from) {
            return Err(LuaError::InternalError(format!(
                "slot {} linked to itself",
                from
            )));
        }
        self.slots[from as usize].next = to;
        Ok(())
    }

    fn alloc(&mut self, slot: Slot) -> LuaResult<SlotIdx> {
        if let Some(idx) = self.free {
            self.free = self.slots[idx as usize].next;
            self.slots[idx as usize] = slot;
            return Ok(idx);
        }
        let idx = SlotIdx::try_from(self.slots.len())
            .map_err(|_| LuaError::InternalError("slot arena overflow".to_owned()))?;
        self.slots.push(slot);
        Ok(idx)
    }

    fn release(&mut self, idx: SlotIdx) {
        let slot = &mut self.slots[idx as usize];
        match slot.state {
            SlotState::Live { .. } => self.live -= 1,
            SlotState::Dead { .. } => self.dead -= 1,
            SlotState::Free => return,
        }
        slot.state = SlotState::Free;
        slot.next = self.free;
        self.free = Some(idx);
    }
}

/// Walks a chain. Stops after visiting as many slots as the arena holds,
/// so a malformed chain cannot loop forever.
pub(crate) struct ChainIter<'a> {
    arena: &'a SlotArena,
    cursor: Option<SlotIdx>,
    budget: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = SlotIdx;

    fn next(&mut self) -> Option<SlotIdx> {
        let idx = self.cursor?;
        if self.budget == 0 {
            log::error!("slot chain longer than its arena; traversal stopped");
            self.cursor = None;
            return None;
        }
        self.budget -= 1;
        self.cursor = self.arena.slot(idx).next;
        Some(idx)
    }
}
