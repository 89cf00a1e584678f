use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;

use smol_str::SmolStr;

use crate::lua_value::TablePtr;

/// Host object exposed to scripts, with an optional per-object metatable.
pub struct LuaUserdata {
    type_name: SmolStr,
    data: RefCell<Box<dyn Any>>,
    metatable: RefCell<Option<TablePtr>>,
}

impl LuaUserdata {
    pub fn new<T: Any>(data: T) -> Self {
        LuaUserdata {
            type_name: SmolStr::new(std::any::type_name::<T>()),
            data: RefCell::new(Box::new(data)),
            metatable: RefCell::new(None),
        }
    }

    /// Override the type name shown in diagnostics.
    pub fn with_type_name(mut self, name: &str) -> Self {
        self.type_name = SmolStr::new(name);
        self
    }

    pub fn with_metatable(self, metatable: TablePtr) -> Self {
        *self.metatable.borrow_mut() = Some(metatable);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get_metatable(&self) -> Option<TablePtr> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, metatable: Option<TablePtr>) {
        *self.metatable.borrow_mut() = metatable;
    }

    pub fn is<T: Any>(&self) -> bool {
        self.data.borrow().is::<T>()
    }

    /// Borrow the payload as `T`.
    pub fn borrow<T: Any>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.data.borrow(), |data| data.downcast_ref::<T>()).ok()
    }

    /// Mutably borrow the payload as `T`.
    pub fn borrow_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.data.borrow_mut(), |data| data.downcast_mut::<T>()).ok()
    }
}

impl fmt::Debug for LuaUserdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaUserdata({})", self.type_name)
    }
}
