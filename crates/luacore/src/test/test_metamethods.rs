// Tests for metamethod dispatch through the runtime instance
use std::cell::Cell;
use std::rc::Rc;

use crate::*;

fn metatable(vm: &LuaVM, fields: &[(&str, LuaValue)]) -> TablePtr {
    let mt = vm.new_table();
    for (k, v) in fields {
        vm.raw_set(&mt, vm.create_string(k), v.clone()).unwrap();
    }
    mt.as_table().unwrap().clone()
}

fn with_metatable(vm: &LuaVM, fields: &[(&str, LuaValue)]) -> LuaValue {
    let t = vm.new_table();
    vm.set_metatable(&t, Some(metatable(vm, fields))).unwrap();
    t
}

fn counter(vm: &LuaVM, name: &str, calls: &Rc<Cell<usize>>, result: LuaValue) -> LuaValue {
    let calls = calls.clone();
    vm.create_function(name, move |_, _| {
        calls.set(calls.get() + 1);
        Ok(MultiValue::single(result.clone()))
    })
}

#[test]
fn test_index_function() {
    let vm = LuaVM::default();
    let handler = vm.create_function("index", |vm, args| {
        Ok(MultiValue::single(vm.concat(&args[1], &vm.create_string("!"))?))
    });
    let t = with_metatable(&vm, &[("__index", handler)]);
    vm.raw_set(&t, vm.create_string("present"), LuaValue::Integer(1)).unwrap();

    assert_eq!(vm.index(&t, &vm.create_string("x")).unwrap().as_str(), Some("x!"));
    assert!(matches!(vm.index(&t, &vm.create_string("present")).unwrap(), LuaValue::Integer(1)));
    // raw access ignores the handler
    assert!(vm.raw_get(&t, &vm.create_string("x")).unwrap().is_nil());
}

#[test]
fn test_index_table_chain() {
    let vm = LuaVM::default();
    let base = vm.new_table();
    vm.raw_set(&base, vm.create_string("greet"), vm.create_string("hi")).unwrap();
    let mid = with_metatable(&vm, &[("__index", base)]);
    let obj = with_metatable(&vm, &[("__index", mid)]);

    assert_eq!(vm.index(&obj, &vm.create_string("greet")).unwrap().as_str(), Some("hi"));
    assert!(vm.index(&obj, &vm.create_string("missing")).unwrap().is_nil());
}

#[test]
fn test_index_loop_is_bounded() {
    let vm = LuaVM::new(VmOption::default().with_max_tag_loop(50));
    let t = vm.new_table();
    let mt = metatable(&vm, &[("__index", t.clone())]);
    vm.set_metatable(&t, Some(mt)).unwrap();

    let err = vm.index(&t, &vm.create_string("x")).unwrap_err();
    assert_eq!(err.to_string(), "'__index' chain too long; possible loop");
    vm.set_metatable(&t, None).unwrap();
}

#[test]
fn test_index_non_table() {
    let vm = LuaVM::default();
    let err = vm.index(&LuaValue::Nil, &vm.create_string("x")).unwrap_err();
    assert!(matches!(err, LuaError::TypeError(_)));
    assert_eq!(err.to_string(), "attempt to index a nil value");
    let err = vm
        .set_index(&LuaValue::Boolean(true), vm.create_string("x"), LuaValue::Nil)
        .unwrap_err();
    assert_eq!(err.to_string(), "attempt to index a boolean value");

    // strings share one metatable
    let methods = vm.new_table();
    vm.raw_set(&methods, vm.create_string("size"), LuaValue::Integer(3)).unwrap();
    let mt = metatable(&vm, &[("__index", methods)]);
    vm.set_metatable(&vm.create_string("any"), Some(mt)).unwrap();
    let got = vm.index(&vm.create_string("abc"), &vm.create_string("size")).unwrap();
    assert!(matches!(got, LuaValue::Integer(3)));
    vm.set_type_metatable(LuaValueKind::String, None);
    assert!(vm.index(&vm.create_string("abc"), &vm.create_string("size")).is_err());
}

#[test]
fn test_newindex_only_for_absent_keys() {
    let vm = LuaVM::default();
    let calls = Rc::new(Cell::new(0));
    let handler = counter(&vm, "newindex", &calls, LuaValue::Nil);
    let t = with_metatable(&vm, &[("__newindex", handler)]);
    let x = vm.create_string("x");

    vm.set_index(&t, x.clone(), LuaValue::Integer(1)).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(vm.raw_get(&t, &x).unwrap().is_nil());

    vm.raw_set(&t, x.clone(), LuaValue::Integer(5)).unwrap();
    vm.set_index(&t, x.clone(), LuaValue::Integer(6)).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(matches!(vm.raw_get(&t, &x).unwrap(), LuaValue::Integer(6)));
}

#[test]
fn test_newindex_table_proxy() {
    let vm = LuaVM::default();
    let backing = vm.new_table();
    let proxy = with_metatable(&vm, &[("__newindex", backing.clone())]);
    let k = vm.create_string("k");

    vm.set_index(&proxy, k.clone(), LuaValue::Integer(1)).unwrap();
    assert!(vm.raw_get(&proxy, &k).unwrap().is_nil());
    assert!(matches!(vm.raw_get(&backing, &k).unwrap(), LuaValue::Integer(1)));
}

#[test]
fn test_eq_called_once() {
    let vm = LuaVM::default();
    let calls = Rc::new(Cell::new(0));
    let eq = counter(&vm, "eq", &calls, LuaValue::Boolean(true));
    let mt = metatable(&vm, &[("__eq", eq)]);
    let a = vm.new_table();
    let b = vm.new_table();
    vm.set_metatable(&a, Some(mt.clone())).unwrap();
    vm.set_metatable(&b, Some(mt)).unwrap();

    assert!(vm.equals(&a, &b).unwrap());
    assert_eq!(calls.get(), 1);
    assert!(!a.raw_equals(&b));
    assert!(vm.equals(&a, &a).unwrap());
    assert!(!vm.equals(&a, &LuaValue::Integer(1)).unwrap());
    assert_eq!(calls.get(), 1);

    // the second operand's handler is used when the first has none
    let plain = vm.new_table();
    assert!(vm.equals(&plain, &a).unwrap());
    assert_eq!(calls.get(), 2);
    assert!(!vm.equals(&plain, &vm.new_table()).unwrap());
}

#[test]
fn test_eq_uses_first_metatable_only() {
    let vm = LuaVM::default();
    let calls = Rc::new(Cell::new(0));
    let eq = counter(&vm, "eq", &calls, LuaValue::Boolean(true));
    let a = with_metatable(&vm, &[("__name", vm.create_string("A"))]);
    let b = with_metatable(&vm, &[("__eq", eq)]);

    // a's metatable wins even though it has no __eq
    assert!(!vm.equals(&a, &b).unwrap());
    assert_eq!(calls.get(), 0);
    assert!(vm.equals(&b, &a).unwrap());
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_userdata_eq() {
    let vm = LuaVM::default();
    let eq = vm.create_function("eq", |_, args| {
        let x = *args[0].as_userdata().unwrap().borrow::<i32>().unwrap();
        let y = *args[1].as_userdata().unwrap().borrow::<i32>().unwrap();
        Ok(MultiValue::single(LuaValue::Boolean(x == y)))
    });
    let mt = metatable(&vm, &[("__eq", eq)]);
    let a = vm.create_userdata(7i32);
    let b = vm.create_userdata(7i32);
    let c = vm.create_userdata(8i32);
    for u in [&a, &b, &c] {
        vm.set_metatable(u, Some(mt.clone())).unwrap();
    }
    assert!(vm.equals(&a, &b).unwrap());
    assert!(!vm.equals(&a, &c).unwrap());
}

#[test]
fn test_lt_without_le_fallback() {
    let vm = LuaVM::default();
    let lt = vm.create_function("lt", |vm, args| {
        let v = vm.create_string("v");
        let a = vm.raw_get(&args[0], &v)?;
        let b = vm.raw_get(&args[1], &v)?;
        Ok(MultiValue::single(LuaValue::Boolean(vm.less_than(&a, &b)?)))
    });
    let mt = metatable(&vm, &[("__lt", lt)]);
    let point = |n: i64| {
        let t = vm.new_table();
        vm.raw_set(&t, vm.create_string("v"), LuaValue::Integer(n)).unwrap();
        vm.set_metatable(&t, Some(mt.clone())).unwrap();
        t
    };
    let (a, b) = (point(1), point(2));
    assert!(vm.less_than(&a, &b).unwrap());
    assert!(!vm.less_than(&b, &a).unwrap());
    let err = vm.less_equal(&a, &b).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare two table values");
}

#[test]
fn test_call_follows_call_chain() {
    let vm = LuaVM::default();
    let double = vm.create_function("double", |vm, args| {
        let x = args.last().cloned().unwrap_or_default();
        Ok(MultiValue::single(vm.mul(&x, &LuaValue::Integer(2))?))
    });
    let callable = with_metatable(&vm, &[("__call", double)]);
    let result = vm.call(&callable, &[LuaValue::Integer(21)]).unwrap();
    assert!(matches!(result.first(), Some(LuaValue::Integer(42))));

    let outer = with_metatable(&vm, &[("__call", callable)]);
    let result = vm.call(&outer, &[LuaValue::Integer(5)]).unwrap();
    assert!(matches!(result.into_first(), LuaValue::Integer(10)));

    let err = vm.call(&LuaValue::Integer(1), &[]).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a number value");
}

#[test]
fn test_concat_len_tostring() {
    let vm = LuaVM::default();
    let concat = vm.create_function("concat", |vm, args| {
        let kinds = format!("{}..{}", args[0].type_name(), args[1].type_name());
        Ok(MultiValue::single(vm.create_string(kinds)))
    });
    let len = vm.create_function("len", |_, _| Ok(MultiValue::single(LuaValue::Integer(99))));
    let tostring = vm.create_function("tostring", |vm, _| {
        Ok(MultiValue::single(vm.create_string("custom")))
    });
    let t = with_metatable(&vm, &[("__concat", concat), ("__len", len), ("__tostring", tostring)]);
    let s = vm.create_string("s");

    assert_eq!(vm.concat(&t, &s).unwrap().as_str(), Some("table..string"));
    assert_eq!(vm.concat(&s, &t).unwrap().as_str(), Some("string..table"));
    assert!(matches!(vm.len(&t).unwrap(), LuaValue::Integer(99)));
    assert_eq!(vm.tostring(&t).unwrap().as_str(), Some("custom"));
    // raw length ignores __len
    assert_eq!(t.raw_len(), Some(0));
}

#[test]
fn test_tostring_checks_result() {
    let vm = LuaVM::default();
    let bad = vm.create_function("tostring", |vm, _| Ok(MultiValue::single(vm.new_table())));
    let t = with_metatable(&vm, &[("__tostring", bad)]);
    let err = vm.tostring(&t).unwrap_err();
    assert_eq!(err.to_string(), "'__tostring' must return a string");

    let named = with_metatable(&vm, &[("__name", vm.create_string("Point"))]);
    let text = vm.tostring(&named).unwrap();
    assert!(text.as_str().unwrap().starts_with("Point: 0x"));

    let ud = vm.create_userdata(());
    vm.set_metatable(&ud, Some(metatable(&vm, &[("__name", vm.create_string("Handle"))])))
        .unwrap();
    assert!(vm.tostring(&ud).unwrap().as_str().unwrap().starts_with("Handle: 0x"));
}

#[test]
fn test_arith_metamethods() {
    let vm = LuaVM::default();
    let add = vm.create_function("add", |vm, args| {
        let order = format!("{}+{}", args[0].type_name(), args[1].type_name());
        Ok(MultiValue::single(vm.create_string(order)))
    });
    let unm = vm.create_function("unm", |_, args| {
        Ok(MultiValue::single(LuaValue::Boolean(args[0].raw_equals(&args[1]))))
    });
    let t = with_metatable(&vm, &[("__add", add), ("__unm", unm)]);

    assert_eq!(vm.add(&t, &LuaValue::Integer(1)).unwrap().as_str(), Some("table+number"));
    assert_eq!(vm.add(&LuaValue::Integer(1), &t).unwrap().as_str(), Some("number+table"));
    assert!(matches!(vm.neg(&t).unwrap(), LuaValue::Boolean(true)));
    let err = vm.sub(&t, &LuaValue::Integer(1)).unwrap_err();
    assert_eq!(err.to_string(), "attempt to perform arithmetic on a table value");
}

#[test]
fn test_handler_mutates_same_table() {
    let vm = LuaVM::default();
    let memo = vm.create_function("memo", |vm, args| {
        let v = vm.concat(&args[1], &vm.create_string("_cached"))?;
        vm.raw_set(&args[0], args[1].clone(), v.clone())?;
        Ok(MultiValue::single(v))
    });
    let store = vm.create_function("store", |vm, args| {
        let scaled = vm.mul(&args[2], &LuaValue::Integer(10))?;
        vm.raw_set(&args[0], args[1].clone(), scaled)?;
        Ok(MultiValue::empty())
    });
    let t = with_metatable(&vm, &[("__index", memo), ("__newindex", store)]);
    let k = vm.create_string("k");

    assert_eq!(vm.index(&t, &k).unwrap().as_str(), Some("k_cached"));
    assert_eq!(vm.raw_get(&t, &k).unwrap().as_str(), Some("k_cached"));

    let z = vm.create_string("z");
    vm.set_index(&t, z.clone(), LuaValue::Integer(1)).unwrap();
    assert!(matches!(vm.raw_get(&t, &z).unwrap(), LuaValue::Integer(10)));
    // now present: stored without the handler
    vm.set_index(&t, z.clone(), LuaValue::Integer(2)).unwrap();
    assert!(matches!(vm.raw_get(&t, &z).unwrap(), LuaValue::Integer(2)));
}

#[test]
fn test_handler_errors_propagate() {
    let vm = LuaVM::default();
    let fail = vm.create_function("fail", |_, _| Err(LuaError::RuntimeError(LuaValue::Integer(7))));
    let t = with_metatable(&vm, &[("__index", fail.clone()), ("__eq", fail)]);
    let err = vm.index(&t, &vm.create_string("x")).unwrap_err();
    assert!(matches!(err, LuaError::RuntimeError(LuaValue::Integer(7))));
    assert!(vm.equals(&t, &vm.new_table()).is_err());
}

#[test]
fn test_metatable_field_hides_metatable() {
    let vm = LuaVM::default();
    let t = with_metatable(&vm, &[("__metatable", LuaValue::Boolean(false))]);
    assert!(matches!(vm.getmetatable(&t), LuaValue::Boolean(false)));
    assert!(vm.set_metatable(&t, None).is_err());
    assert!(vm.getmetatable(&vm.new_table()).is_nil());
}

#[derive(Default)]
struct PrototypeCaller {
    calls: Cell<usize>,
}

impl MetamethodCaller for PrototypeCaller {
    fn call(&self, vm: &LuaVM, handler: &LuaValue, args: &[LuaValue]) -> LuaResult<MultiValue> {
        self.calls.set(self.calls.get() + 1);
        if let Some(answer) = handler.as_function().and_then(|f| f.prototype_ref::<i64>()) {
            return Ok(MultiValue::single(LuaValue::Integer(*answer)));
        }
        NativeCaller.call(vm, handler, args)
    }
}

#[test]
fn test_installed_caller() {
    let caller = Rc::new(PrototypeCaller::default());
    let vm = LuaVM::with_caller(VmOption::default(), caller.clone());
    let compiled = LuaValue::function(LuaFunction::prototype("answer", 42i64));
    let t = with_metatable(&vm, &[("__index", compiled.clone())]);

    assert!(matches!(vm.index(&t, &vm.create_string("x")).unwrap(), LuaValue::Integer(42)));
    assert_eq!(caller.calls.get(), 1);

    let plain = LuaVM::default();
    let t = with_metatable(&plain, &[("__index", compiled)]);
    let err = plain.index(&t, &plain.create_string("x")).unwrap_err();
    assert_eq!(err.to_string(), "cannot call 'answer': no interpreter installed");
}
