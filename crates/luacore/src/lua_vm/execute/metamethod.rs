/// Metamethod names and dispatch
///
/// Based on Lua ltm.c: the event list, and the capability the core uses
/// to run a handler once one is found
use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

/// Tag Method types (TMS from ltm.h), plus the metafields the core reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TmKind {
    Index = 0,
    NewIndex = 1,
    Mode = 2,
    Len = 3,
    Eq = 4,
    Add = 5,
    Sub = 6,
    Mul = 7,
    Mod = 8,
    Pow = 9,
    Div = 10,
    IDiv = 11,
    Unm = 12,
    Lt = 13,
    Le = 14,
    Concat = 15,
    Call = 16,
    ToString = 17,
    Name = 18,
    Metatable = 19,
}

impl TmKind {
    /// Field name in the metatable
    pub const fn name(self) -> &'static str {
        match self {
            TmKind::Index => "__index",
            TmKind::NewIndex => "__newindex",
            TmKind::Mode => "__mode",
            TmKind::Len => "__len",
            TmKind::Eq => "__eq",
            TmKind::Add => "__add",
            TmKind::Sub => "__sub",
            TmKind::Mul => "__mul",
            TmKind::Mod => "__mod",
            TmKind::Pow => "__pow",
            TmKind::Div => "__div",
            TmKind::IDiv => "__idiv",
            TmKind::Unm => "__unm",
            TmKind::Lt => "__lt",
            TmKind::Le => "__le",
            TmKind::Concat => "__concat",
            TmKind::Call => "__call",
            TmKind::ToString => "__tostring",
            TmKind::Name => "__name",
            TmKind::Metatable => "__metatable",
        }
    }
}

/// Runs a metamethod handler.
///
/// The core never interprets bytecode; whoever owns the interpreter
/// installs a caller that can run script functions. Errors raised by the
/// handler must be returned unchanged.
pub trait MetamethodCaller {
    fn call(&self, vm: &LuaVM, handler: &LuaValue, args: &[LuaValue]) -> LuaResult<MultiValue>;
}

/// Default caller: runs native functions and follows `__call` on other
/// values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCaller;

impl MetamethodCaller for NativeCaller {
    fn call(&self, vm: &LuaVM, handler: &LuaValue, args: &[LuaValue]) -> LuaResult<MultiValue> {
        let mut handler = handler.clone();
        let mut args = args.to_vec();
        for _ in 0..vm.option().max_tag_loop {
            let next = match &handler {
                LuaValue::Function(f) => {
                    return match f.as_native() {
                        Some(native) => native(vm, args.as_slice()),
                        None => Err(LuaError::runtime(format!(
                            "cannot call '{}': no interpreter installed",
                            f.name()
                        ))),
                    };
                }
                other => match vm.get_metamethod(other, TmKind::Call) {
                    Some(call) => call,
                    None => {
                        return Err(LuaError::TypeError(format!(
                            "attempt to call a {} value",
                            other.type_name()
                        )));
                    }
                },
            };
            args.insert(0, std::mem::replace(&mut handler, next));
        }
        Err(LuaError::runtime("'__call' chain too long; possible loop"))
    }
}
