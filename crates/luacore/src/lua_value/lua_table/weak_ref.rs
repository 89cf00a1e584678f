use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::lua_value::{LuaFunction, LuaString, LuaTable, LuaThread, LuaUserdata, LuaValue};

/// Non-owning reference to a shared value.
#[derive(Clone)]
pub enum WeakRef {
    String(Weak<LuaString>),
    Table(Weak<RefCell<LuaTable>>),
    Function(Weak<LuaFunction>),
    Userdata(Weak<LuaUserdata>),
    Thread(Weak<LuaThread>),
}

impl WeakRef {
    /// `None` for values held inline.
    pub fn new(value: &LuaValue) -> Option<WeakRef> {
        Some(match value {
            LuaValue::String(s) => WeakRef::String(Rc::downgrade(s)),
            LuaValue::Table(t) => WeakRef::Table(Rc::downgrade(t)),
            LuaValue::Function(f) => WeakRef::Function(Rc::downgrade(f)),
            LuaValue::Userdata(u) => WeakRef::Userdata(Rc::downgrade(u)),
            LuaValue::Thread(t) => WeakRef::Thread(Rc::downgrade(t)),
            _ => return None,
        })
    }

    pub fn upgrade(&self) -> Option<LuaValue> {
        match self {
            WeakRef::String(w) => w.upgrade().map(LuaValue::String),
            WeakRef::Table(w) => w.upgrade().map(LuaValue::Table),
            WeakRef::Function(w) => w.upgrade().map(LuaValue::Function),
            WeakRef::Userdata(w) => w.upgrade().map(LuaValue::Userdata),
            WeakRef::Thread(w) => w.upgrade().map(LuaValue::Thread),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self {
            WeakRef::String(w) => w.strong_count() == 0,
            WeakRef::Table(w) => w.strong_count() == 0,
            WeakRef::Function(w) => w.strong_count() == 0,
            WeakRef::Userdata(w) => w.strong_count() == 0,
            WeakRef::Thread(w) => w.strong_count() == 0,
        }
    }
}

/// A key or value as stored in a slot.
#[derive(Clone)]
pub enum Handle {
    Strong(LuaValue),
    Weak(WeakRef),
}

impl Handle {
    /// Weak when asked and the value is shared, strong otherwise.
    pub fn new(value: LuaValue, weak: bool) -> Handle {
        if weak {
            if let Some(w) = WeakRef::new(&value) {
                return Handle::Weak(w);
            }
        }
        Handle::Strong(value)
    }

    /// The referenced value, `None` once a weak referent is gone.
    pub fn get(&self) -> Option<LuaValue> {
        match self {
            Handle::Strong(v) => Some(v.clone()),
            Handle::Weak(w) => w.upgrade(),
        }
    }

    /// Handle for a table entry under a weak mode. Strings compare by
    /// value and are never cleared from weak tables, so they stay strong.
    pub fn entry(value: LuaValue, weak: bool) -> Handle {
        let weak = weak && !value.is_string();
        Handle::new(value, weak)
    }

    /// Test the referenced value without cloning strong handles.
    pub fn matches(&self, pred: impl Fn(&LuaValue) -> bool) -> bool {
        match self {
            Handle::Strong(v) => pred(v),
            Handle::Weak(w) => w.upgrade().is_some_and(|v| pred(&v)),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self {
            Handle::Strong(_) => false,
            Handle::Weak(w) => w.is_expired(),
        }
    }
}

/// Which parts of a table are weak, from the `__mode` metafield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeakMode {
    pub keys: bool,
    pub values: bool,
}

impl WeakMode {
    pub fn from_mode(mode: &LuaValue) -> WeakMode {
        match mode.as_bytes() {
            Some(bytes) => WeakMode {
                keys: bytes.contains(&b'k'),
                values: bytes.contains(&b'v'),
            },
            None => WeakMode::default(),
        }
    }

    pub fn is_weak(self) -> bool {
        self.keys || self.values
    }
}
