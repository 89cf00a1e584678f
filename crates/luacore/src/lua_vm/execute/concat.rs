use crate::lua_value::LuaValue;
use crate::lua_vm::execute::metamethod::TmKind;
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

#[inline]
fn is_concatable(v: &LuaValue) -> bool {
    v.is_string() || v.is_number()
}

impl LuaVM {
    /// `a .. b`: strings and numbers join, anything else tries `__concat`.
    pub fn concat(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        if let (Some(x), Some(y)) = (a.as_lua_string(), b.as_lua_string()) {
            let mut bytes = Vec::with_capacity(x.len() + y.len());
            bytes.extend_from_slice(x.as_bytes());
            bytes.extend_from_slice(y.as_bytes());
            return Ok(self.create_string(bytes));
        }
        match self
            .get_metamethod(a, TmKind::Concat)
            .or_else(|| self.get_metamethod(b, TmKind::Concat))
        {
            Some(handler) => self.call_metamethod(&handler, &[a.clone(), b.clone()]),
            None => {
                let bad = if is_concatable(a) { b } else { a };
                Err(LuaError::TypeError(format!(
                    "attempt to concatenate a {} value",
                    bad.type_name()
                )))
            }
        }
    }

    /// `#v`: byte length of strings, `__len` or the border of tables.
    pub fn len(&self, v: &LuaValue) -> LuaResult<LuaValue> {
        if let LuaValue::String(s) = v {
            return Ok(LuaValue::Integer(s.len() as i64));
        }
        if let Some(handler) = self.get_metamethod(v, TmKind::Len) {
            return self.call_metamethod(&handler, &[v.clone()]);
        }
        match v {
            LuaValue::Table(t) => Ok(LuaValue::Integer(t.borrow().length() as i64)),
            _ => Err(LuaError::TypeError(format!(
                "attempt to get length of a {} value",
                v.type_name()
            ))),
        }
    }

    /// `tostring(v)`: `__tostring`, then `__name`, then the default form.
    pub fn tostring(&self, v: &LuaValue) -> LuaResult<LuaValue> {
        if let Some(handler) = self.get_metamethod(v, TmKind::ToString) {
            let result = self.call_metamethod(&handler, &[v.clone()])?;
            return match result.as_lua_string() {
                Some(s) => Ok(LuaValue::String(s)),
                None => Err(LuaError::TypeError(
                    "'__tostring' must return a string".to_owned(),
                )),
            };
        }
        if let LuaValue::String(_) = v {
            return Ok(v.clone());
        }
        if let Some(addr) = v.raw_ptr_repr() {
            if let Some(mt) = self.get_metatable(v) {
                let name = mt.borrow().raw_get_str(TmKind::Name.name());
                if let LuaValue::String(name) = name {
                    let text = format!("{}: 0x{:x}", name.to_str_lossy(), addr);
                    return Ok(self.create_string(text));
                }
            }
        }
        Ok(self.create_string(v.to_string()))
    }
}
