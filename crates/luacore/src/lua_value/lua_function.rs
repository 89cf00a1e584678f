use std::any::Any;
use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::{LuaResult, LuaVM};

/// Rust function callable from scripts and metamethod dispatch.
pub type NativeFunction = Rc<dyn Fn(&LuaVM, &[LuaValue]) -> LuaResult<MultiValue>>;

/// What a function value runs.
pub enum FunctionBody {
    Native(NativeFunction),
    /// Compiled chunk owned by the bytecode collaborator.
    Prototype(Box<dyn Any>),
}

/// Function value. Compared and hashed by identity.
pub struct LuaFunction {
    name: SmolStr,
    body: FunctionBody,
}

impl LuaFunction {
    pub fn native<F>(name: &str, f: F) -> Self
    where
        F: Fn(&LuaVM, &[LuaValue]) -> LuaResult<MultiValue> + 'static,
    {
        LuaFunction {
            name: SmolStr::new(name),
            body: FunctionBody::Native(Rc::new(f)),
        }
    }

    pub fn prototype<T: Any>(name: &str, proto: T) -> Self {
        LuaFunction {
            name: SmolStr::new(name),
            body: FunctionBody::Prototype(Box::new(proto)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &FunctionBody {
        &self.body
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native(_))
    }

    /// The native entry point, if this is a Rust function.
    pub fn as_native(&self) -> Option<NativeFunction> {
        match &self.body {
            FunctionBody::Native(f) => Some(f.clone()),
            FunctionBody::Prototype(_) => None,
        }
    }

    pub fn prototype_ref<T: Any>(&self) -> Option<&T> {
        match &self.body {
            FunctionBody::Prototype(proto) => proto.downcast_ref::<T>(),
            FunctionBody::Native(_) => None,
        }
    }
}

impl fmt::Debug for LuaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_native() { "native" } else { "prototype" };
        write!(f, "LuaFunction({}, {})", self.name, kind)
    }
}
