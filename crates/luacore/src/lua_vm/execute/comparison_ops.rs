use crate::lua_value::LuaValue;
use crate::lua_value::lua_number::{num_le, num_lt};
use crate::lua_vm::execute::metamethod::TmKind;
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

fn order_error(a: &LuaValue, b: &LuaValue) -> LuaError {
    let (t1, t2) = (a.type_name(), b.type_name());
    if t1 == t2 {
        LuaError::TypeError(format!("attempt to compare two {} values", t1))
    } else {
        LuaError::TypeError(format!("attempt to compare {} with {}", t1, t2))
    }
}

impl LuaVM {
    /// `a == b`.
    ///
    /// Raw equality first. Two tables or two userdata that are not the same
    /// object consult `__eq` in the first operand's metatable, or in the
    /// second's when the first has none. Only that metatable is searched: a
    /// metatable without `__eq` means not equal. The handler runs at most once.
    pub fn equals(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if a.raw_equals(b) {
            return Ok(true);
        }
        let both_tables = a.is_table() && b.is_table();
        let both_userdata = a.is_userdata() && b.is_userdata();
        if !both_tables && !both_userdata {
            return Ok(false);
        }
        let Some(mt) = self.get_metatable(a).or_else(|| self.get_metatable(b)) else {
            return Ok(false);
        };
        let handler = mt.borrow().raw_get_str(TmKind::Eq.name());
        if handler.is_nil() {
            return Ok(false);
        }
        Ok(self
            .call_metamethod(&handler, &[a.clone(), b.clone()])?
            .is_truthy())
    }

    /// `a < b`: numbers, strings, else `__lt`.
    pub fn less_than(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if let Some(lt) = num_lt(a, b) {
            return Ok(lt);
        }
        if let (LuaValue::String(x), LuaValue::String(y)) = (a, b) {
            return Ok(x.as_bytes() < y.as_bytes());
        }
        self.order_metamethod(a, b, TmKind::Lt)
    }

    /// `a <= b`: numbers, strings, else `__le`.
    pub fn less_equal(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if let Some(le) = num_le(a, b) {
            return Ok(le);
        }
        if let (LuaValue::String(x), LuaValue::String(y)) = (a, b) {
            return Ok(x.as_bytes() <= y.as_bytes());
        }
        self.order_metamethod(a, b, TmKind::Le)
    }

    fn order_metamethod(&self, a: &LuaValue, b: &LuaValue, event: TmKind) -> LuaResult<bool> {
        let handler = self
            .get_metamethod(a, event)
            .or_else(|| self.get_metamethod(b, event))
            .ok_or_else(|| order_error(a, b))?;
        Ok(self
            .call_metamethod(&handler, &[a.clone(), b.clone()])?
            .is_truthy())
    }
}
