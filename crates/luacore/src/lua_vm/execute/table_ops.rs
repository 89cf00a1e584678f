use crate::lua_value::LuaValue;
use crate::lua_vm::execute::metamethod::TmKind;
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

fn index_error(value: &LuaValue) -> LuaError {
    LuaError::TypeError(format!("attempt to index a {} value", value.type_name()))
}

impl LuaVM {
    /// `obj[key]` following the `__index` chain.
    ///
    /// A function handler is called with `(obj, key)`; a table handler is
    /// indexed in turn. Chains longer than `max_tag_loop` fail.
    pub fn index(&self, obj: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
        let mut current = obj.clone();
        for _ in 0..self.option().max_tag_loop {
            let handler = if let LuaValue::Table(t) = &current {
                let (value, mt) = {
                    let t = t.borrow();
                    (t.raw_get(key), t.get_metatable())
                };
                if !value.is_nil() {
                    return Ok(value);
                }
                let handler = mt.map(|mt| {
                    let mt = mt.borrow();
                    mt.raw_get_str(TmKind::Index.name())
                });
                match handler {
                    Some(h) if !h.is_nil() => h,
                    _ => return Ok(LuaValue::Nil),
                }
            } else {
                self.get_metamethod(&current, TmKind::Index)
                    .ok_or_else(|| index_error(&current))?
            };
            if handler.is_function() {
                return self.call_metamethod(&handler, &[current, key.clone()]);
            }
            current = handler;
        }
        Err(LuaError::runtime("'__index' chain too long; possible loop"))
    }

    /// `obj[key] = value` following the `__newindex` chain.
    ///
    /// `__newindex` is only consulted when the key is absent from the
    /// table; present keys are overwritten in place.
    pub fn set_index(&self, obj: &LuaValue, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let mut current = obj.clone();
        for _ in 0..self.option().max_tag_loop {
            let handler = if let LuaValue::Table(t) = &current {
                let handler = {
                    let t = t.borrow();
                    if t.raw_get(&key).is_nil() {
                        t.get_metatable()
                            .map(|mt| {
                                let mt = mt.borrow();
                                mt.raw_get_str(TmKind::NewIndex.name())
                            })
                            .filter(|h| !h.is_nil())
                    } else {
                        None
                    }
                };
                match handler {
                    Some(h) => h,
                    None => return t.borrow_mut().raw_set(key, value),
                }
            } else {
                self.get_metamethod(&current, TmKind::NewIndex)
                    .ok_or_else(|| index_error(&current))?
            };
            if handler.is_function() {
                self.call_metamethod(&handler, &[current, key, value])?;
                return Ok(());
            }
            current = handler;
        }
        Err(LuaError::runtime("'__newindex' chain too long; possible loop"))
    }

    /// Raw read of a table value.
    pub fn raw_get(&self, table: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
        Ok(table.check_table()?.borrow().raw_get(key))
    }

    /// Raw write to a table value.
    pub fn raw_set(&self, table: &LuaValue, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        table.check_table()?.borrow_mut().raw_set(key, value)
    }

    /// `next(table, key)` for table values.
    pub fn next(&self, table: &LuaValue, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        table.check_table()?.borrow().next(key)
    }
}
