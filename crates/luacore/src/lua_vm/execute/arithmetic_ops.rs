use crate::lua_value::lua_number::{self, to_numeric};
use crate::lua_value::{ArithOp, LuaValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

// Blame the operand that is not a number (p2 when p1 converts, like luaG_opinterror)
fn arith_error(a: &LuaValue, b: &LuaValue) -> LuaError {
    let bad = if to_numeric(a).is_some() { b } else { a };
    let message = format!("attempt to perform arithmetic on a {} value", bad.type_name());
    if bad.is_string() {
        LuaError::ArithmeticTypeError(message)
    } else {
        LuaError::TypeError(message)
    }
}

impl LuaVM {
    /// Binary arithmetic with coercion and metamethod fallback.
    ///
    /// Numbers and numeric strings are computed directly; otherwise the
    /// first operand with a handler for the event wins.
    pub fn arith(&self, op: ArithOp, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        if let Some(v) = lua_number::arith(op, a, b, self.option().integer_width) {
            return Ok(v);
        }
        let event = op.tm();
        match self
            .get_metamethod(a, event)
            .or_else(|| self.get_metamethod(b, event))
        {
            Some(handler) => self.call_metamethod(&handler, &[a.clone(), b.clone()]),
            None => Err(arith_error(a, b)),
        }
    }

    pub fn add(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Add, a, b)
    }

    pub fn sub(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Sub, a, b)
    }

    pub fn mul(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Mul, a, b)
    }

    /// `/` always produces a float.
    pub fn div(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Div, a, b)
    }

    /// Floored modulo; the result takes the sign of `b`.
    pub fn modulo(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Mod, a, b)
    }

    pub fn pow(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Pow, a, b)
    }

    /// Floor division `//`.
    pub fn idiv(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::IDiv, a, b)
    }

    /// Unary minus; the handler receives the operand twice.
    pub fn neg(&self, a: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Unm, a, a)
    }

    /// `tonumber` without a base: numbers pass through, numeric strings
    /// convert, anything else is nil.
    pub fn tonumber(&self, v: &LuaValue) -> LuaValue {
        match to_numeric(v) {
            Some(LuaValue::Integer(i)) => self.integer(i),
            Some(n) => n,
            None => LuaValue::Nil,
        }
    }
}
