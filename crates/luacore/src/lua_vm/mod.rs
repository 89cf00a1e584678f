// Runtime instance: interner, per-kind metatables, options and the
// metamethod caller. Metatable-aware operations are in execute/.
mod execute;
pub mod lua_error;
pub mod lua_limits;
mod vm_option;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::gc::StringInterner;
use crate::lua_value::{
    LuaFunction, LuaTable, LuaThread, LuaUserdata, LuaValue, LuaValueKind, MultiValue, TablePtr,
};

pub use execute::metamethod::{MetamethodCaller, NativeCaller, TmKind};
pub use lua_error::{LuaError, LuaResult};
pub use vm_option::{IntegerWidth, VmOption};

// Metatables shared by every value of a primitive kind
#[derive(Default)]
struct TypeMetatables {
    slots: [Option<TablePtr>; 6],
}

impl TypeMetatables {
    fn slot(kind: LuaValueKind) -> Option<usize> {
        match kind {
            LuaValueKind::Nil => Some(0),
            LuaValueKind::Boolean => Some(1),
            LuaValueKind::Integer | LuaValueKind::Float => Some(2),
            LuaValueKind::String => Some(3),
            LuaValueKind::Function => Some(4),
            LuaValueKind::Thread => Some(5),
            LuaValueKind::Table | LuaValueKind::Userdata => None,
        }
    }
}

/// One runtime instance.
///
/// Values created through different instances can be mixed freely; only
/// interning and the per-kind metatables are instance-local.
pub struct LuaVM {
    option: VmOption,
    strings: RefCell<StringInterner>,
    type_metatables: RefCell<TypeMetatables>,
    caller: Rc<dyn MetamethodCaller>,
}

impl Default for LuaVM {
    fn default() -> Self {
        LuaVM::new(VmOption::default())
    }
}

impl LuaVM {
    pub fn new(option: VmOption) -> Self {
        LuaVM::with_caller(option, Rc::new(NativeCaller))
    }

    /// Instance whose metamethods run through `caller`.
    pub fn with_caller(option: VmOption, caller: Rc<dyn MetamethodCaller>) -> Self {
        log::debug!(
            "new runtime instance: {:?} integers, short strings <= {} bytes",
            option.integer_width,
            option.short_string_limit
        );
        LuaVM {
            strings: RefCell::new(StringInterner::new(option.short_string_limit)),
            type_metatables: RefCell::new(TypeMetatables::default()),
            caller,
            option,
        }
    }

    pub fn option(&self) -> &VmOption {
        &self.option
    }

    // ============ Construction ============

    /// String value; short strings are interned in this instance.
    pub fn create_string(&self, bytes: impl AsRef<[u8]>) -> LuaValue {
        LuaValue::String(self.strings.borrow_mut().intern(bytes.as_ref()))
    }

    /// Number of interned strings still referenced.
    pub fn interned_string_count(&self) -> usize {
        self.strings.borrow().len()
    }

    /// Integer wrapped to the configured width.
    pub fn integer(&self, i: i64) -> LuaValue {
        LuaValue::Integer(self.option.integer_width.wrap(i))
    }

    /// Table sized with the configured defaults.
    pub fn new_table(&self) -> LuaValue {
        self.create_table(self.option.default_array_size, self.option.default_hash_size)
    }

    pub fn create_table(&self, array_hint: usize, hash_hint: usize) -> LuaValue {
        LuaValue::table(LuaTable::new(array_hint, hash_hint))
    }

    pub fn create_function<F>(&self, name: &str, f: F) -> LuaValue
    where
        F: Fn(&LuaVM, &[LuaValue]) -> LuaResult<MultiValue> + 'static,
    {
        LuaValue::function(LuaFunction::native(name, f))
    }

    pub fn create_userdata<T: Any>(&self, data: T) -> LuaValue {
        LuaValue::userdata(LuaUserdata::new(data))
    }

    pub fn create_thread(&self, name: &str) -> LuaValue {
        LuaValue::thread(LuaThread::new(name))
    }

    // ============ Metatables ============

    /// Metatable of any value: its own for tables and userdata, the
    /// per-kind one otherwise.
    pub fn get_metatable(&self, value: &LuaValue) -> Option<TablePtr> {
        match value {
            LuaValue::Table(_) | LuaValue::Userdata(_) => value.metatable(),
            other => {
                let slot = TypeMetatables::slot(other.kind())?;
                self.type_metatables.borrow().slots[slot].clone()
            }
        }
    }

    /// Set the metatable of a table or userdata, or the shared metatable of
    /// a primitive kind. A metatable carrying `__metatable` is protected.
    pub fn set_metatable(&self, value: &LuaValue, metatable: Option<TablePtr>) -> LuaResult<()> {
        if let Some(current) = self.get_metatable(value) {
            let protected = !current
                .borrow()
                .raw_get_str(TmKind::Metatable.name())
                .is_nil();
            if protected {
                return Err(LuaError::runtime("cannot change a protected metatable"));
            }
        }
        match value {
            LuaValue::Table(t) => t.borrow_mut().set_metatable(metatable),
            LuaValue::Userdata(u) => {
                u.set_metatable(metatable);
                Ok(())
            }
            other => {
                self.set_type_metatable(other.kind(), metatable);
                Ok(())
            }
        }
    }

    /// Shared metatable for every value of `kind`. Ignored for tables and
    /// userdata, which carry their own.
    pub fn set_type_metatable(&self, kind: LuaValueKind, metatable: Option<TablePtr>) {
        if let Some(slot) = TypeMetatables::slot(kind) {
            self.type_metatables.borrow_mut().slots[slot] = metatable;
        }
    }

    /// What scripts see: the `__metatable` field when present, else the
    /// metatable itself, else nil.
    pub fn getmetatable(&self, value: &LuaValue) -> LuaValue {
        match self.get_metatable(value) {
            Some(mt) => {
                let field = mt.borrow().raw_get_str(TmKind::Metatable.name());
                if field.is_nil() {
                    LuaValue::Table(mt)
                } else {
                    field
                }
            }
            None => LuaValue::Nil,
        }
    }

    /// Handler for `event` in the metatable of `value`.
    pub fn get_metamethod(&self, value: &LuaValue, event: TmKind) -> Option<LuaValue> {
        let mt = self.get_metatable(value)?;
        let handler = mt.borrow().raw_get_str(event.name());
        (!handler.is_nil()).then_some(handler)
    }

    // ============ Calls ============

    /// Call a value through the installed caller.
    pub fn call(&self, handler: &LuaValue, args: &[LuaValue]) -> LuaResult<MultiValue> {
        self.caller.call(self, handler, args)
    }

    /// Call a metamethod and keep its first result.
    pub(crate) fn call_metamethod(&self, handler: &LuaValue, args: &[LuaValue]) -> LuaResult<LuaValue> {
        Ok(self.call(handler, args)?.into_first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_string_interns_short() {
        let vm = LuaVM::default();
        let a = vm.create_string("name");
        let b = vm.create_string("name");
        match (&a, &b) {
            (LuaValue::String(x), LuaValue::String(y)) => assert!(Rc::ptr_eq(x, y)),
            _ => panic!("expected strings"),
        }
        assert_eq!(vm.interned_string_count(), 1);
    }

    #[test]
    fn test_integer_width() {
        let vm = LuaVM::new(VmOption::default().with_integer_width(IntegerWidth::Bits32));
        assert!(matches!(vm.integer(1 << 32), LuaValue::Integer(0)));
        let vm = LuaVM::default();
        assert!(matches!(vm.integer(1 << 32), LuaValue::Integer(4294967296)));
    }

    #[test]
    fn test_type_metatables() {
        let vm = LuaVM::default();
        let mt = LuaTable::new(0, 0);
        let mt = Rc::new(RefCell::new(mt));
        vm.set_metatable(&LuaValue::Integer(1), Some(mt.clone())).unwrap();
        // shared by both number representations
        let got = vm.get_metatable(&LuaValue::Float(2.5)).unwrap();
        assert!(Rc::ptr_eq(&got, &mt));
        assert!(vm.get_metatable(&vm.create_string("s")).is_none());
    }

    #[test]
    fn test_protected_metatable() {
        let vm = LuaVM::default();
        let t = vm.new_table();
        let mt = vm.new_table();
        mt.as_table()
            .unwrap()
            .borrow_mut()
            .raw_set_str("__metatable", LuaValue::string("locked"))
            .unwrap();
        vm.set_metatable(&t, mt.as_table().cloned()).unwrap();
        assert_eq!(vm.getmetatable(&t).as_str(), Some("locked"));
        let err = vm.set_metatable(&t, None).unwrap_err();
        assert_eq!(err.to_string(), "cannot change a protected metatable");
    }
}
