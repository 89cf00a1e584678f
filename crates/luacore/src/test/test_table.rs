// Tests for table storage through the runtime instance
use crate::*;

fn s(vm: &LuaVM, text: &str) -> LuaValue {
    vm.create_string(text)
}

#[test]
fn test_hole_in_sequence() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    for (i, v) in ["a", "b", "c"].iter().enumerate() {
        vm.set_index(&t, LuaValue::Integer(i as i64 + 1), s(&vm, v)).unwrap();
    }
    assert!(matches!(vm.len(&t).unwrap(), LuaValue::Integer(3)));

    vm.set_index(&t, LuaValue::Integer(2), LuaValue::Nil).unwrap();
    assert!(vm.index(&t, &LuaValue::Integer(2)).unwrap().is_nil());
    let len = t.raw_len().unwrap();
    assert!(len == 1 || len == 3, "length {} is not a border", len);
    assert_eq!(vm.index(&t, &LuaValue::Integer(1)).unwrap().as_str(), Some("a"));
    assert_eq!(vm.index(&t, &LuaValue::Integer(3)).unwrap().as_str(), Some("c"));
}

#[test]
fn test_delete_field() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    vm.set_index(&t, s(&vm, "x"), LuaValue::Integer(1)).unwrap();
    vm.set_index(&t, s(&vm, "y"), LuaValue::Integer(2)).unwrap();
    vm.set_index(&t, s(&vm, "x"), LuaValue::Nil).unwrap();

    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().key_count(), 1);
    let (k, v) = vm.next(&t, &LuaValue::Nil).unwrap().unwrap();
    assert_eq!(k.as_str(), Some("y"));
    assert!(matches!(v, LuaValue::Integer(2)));
    assert!(vm.next(&t, &k).unwrap().is_none());
}

#[test]
fn test_many_string_keys() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    for i in 0..1000 {
        vm.raw_set(&t, s(&vm, &format!("k{}", i)), LuaValue::Integer(i)).unwrap();
    }
    for i in (0..1000).step_by(2) {
        vm.raw_set(&t, s(&vm, &format!("k{}", i)), LuaValue::Nil).unwrap();
    }
    for i in 0..1000 {
        vm.raw_set(&t, s(&vm, &format!("m{}", i)), LuaValue::Integer(-i)).unwrap();
    }

    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().key_count(), 1500);
    for i in 0..1000 {
        let old = vm.raw_get(&t, &s(&vm, &format!("k{}", i))).unwrap();
        if i % 2 == 0 {
            assert!(old.is_nil(), "k{} should be gone", i);
        } else {
            assert!(matches!(old, LuaValue::Integer(v) if v == i));
        }
        let new = vm.raw_get(&t, &s(&vm, &format!("m{}", i))).unwrap();
        assert!(matches!(new, LuaValue::Integer(v) if v == -i));
    }
    assert!(table.borrow().hash_capacity().is_power_of_two());
}

#[test]
fn test_key_uniqueness() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    vm.raw_set(&t, LuaValue::Float(2.0), s(&vm, "float")).unwrap();
    vm.raw_set(&t, LuaValue::Integer(2), s(&vm, "int")).unwrap();
    vm.raw_set(&t, s(&vm, "2"), s(&vm, "string")).unwrap();

    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().key_count(), 2);
    assert_eq!(vm.raw_get(&t, &LuaValue::Float(2.0)).unwrap().as_str(), Some("int"));
    assert_eq!(vm.raw_get(&t, &s(&vm, "2")).unwrap().as_str(), Some("string"));
}

#[test]
fn test_any_fill_order_gives_border() {
    let vm = LuaVM::default();
    let n = 100i64;
    let t = vm.new_table();
    // 7919 is coprime with n, so this visits every key once
    for step in 0..n {
        let k = (step * 7919) % n + 1;
        vm.raw_set(&t, LuaValue::Integer(k), LuaValue::Boolean(true)).unwrap();
    }
    assert_eq!(t.raw_len(), Some(n as usize));

    for k in [10, 50, 90] {
        vm.raw_set(&t, LuaValue::Integer(k), LuaValue::Nil).unwrap();
    }
    let len = t.raw_len().unwrap() as i64;
    assert!(!vm.raw_get(&t, &LuaValue::Integer(len)).unwrap().is_nil());
    assert!(vm.raw_get(&t, &LuaValue::Integer(len + 1)).unwrap().is_nil());
}

#[test]
fn test_sequential_fill_stays_in_array() {
    let vm = LuaVM::default();
    let t = vm.create_table(0, 0);
    for i in 1..=64 {
        vm.raw_set(&t, LuaValue::Integer(i), LuaValue::Integer(i * i)).unwrap();
    }
    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().array_capacity(), 64);
    assert_eq!(table.borrow().hash_capacity(), 0);
    assert!(matches!(table.borrow().raw_get_int(8), LuaValue::Integer(64)));
}

#[test]
fn test_invalid_keys() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    let err = vm.set_index(&t, LuaValue::Nil, LuaValue::Integer(1)).unwrap_err();
    assert!(matches!(err, LuaError::IndexError(_)));
    assert_eq!(err.to_string(), "table index is nil");
    let err = vm.raw_set(&t, LuaValue::Float(f64::NAN), LuaValue::Integer(1)).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");
    // reads never fail
    assert!(vm.raw_get(&t, &LuaValue::Float(f64::NAN)).unwrap().is_nil());
    assert!(vm.index(&t, &LuaValue::Nil).unwrap().is_nil());
    // non-tables are rejected by the raw accessors
    assert!(vm.raw_get(&LuaValue::Integer(1), &LuaValue::Nil).is_err());
}

#[test]
fn test_table_insert_remove() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    let table = t.as_table().unwrap().clone();
    {
        let mut tb = table.borrow_mut();
        tb.insert(0, s(&vm, "a")).unwrap();
        tb.insert(0, s(&vm, "b")).unwrap();
        tb.insert(1, s(&vm, "c")).unwrap();
    }
    let items: Vec<_> = (1..=3)
        .map(|i| table.borrow().raw_get_int(i).to_string())
        .collect();
    assert_eq!(items, ["c", "a", "b"]);

    let mut tb = table.borrow_mut();
    assert_eq!(tb.remove(0).unwrap().as_str(), Some("b"));
    assert_eq!(tb.remove(1).unwrap().as_str(), Some("c"));
    assert_eq!(tb.length(), 1);
    assert_eq!(tb.raw_get_int(1).as_str(), Some("a"));

    let err = tb.insert(5, LuaValue::Boolean(true)).unwrap_err();
    assert_eq!(err.to_string(), "position 5 out of bounds");
    assert!(tb.remove(5).is_err());
    // n + 1 is accepted and yields nil
    assert!(tb.remove(2).unwrap().is_nil());
    assert_eq!(tb.remove(0).unwrap().as_str(), Some("a"));
    assert!(tb.remove(0).unwrap().is_nil());
}

#[test]
fn test_clear_and_refill() {
    let vm = LuaVM::default();
    let t = vm.new_table();
    for i in 1..=20 {
        vm.raw_set(&t, LuaValue::Integer(i), LuaValue::Integer(i)).unwrap();
        vm.raw_set(&t, s(&vm, &format!("f{}", i)), LuaValue::Integer(i)).unwrap();
    }
    let keys = t.as_table().unwrap().borrow().keys();
    for k in keys {
        vm.raw_set(&t, k, LuaValue::Nil).unwrap();
    }
    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().key_count(), 0);
    assert!(vm.next(&t, &LuaValue::Nil).unwrap().is_none());
    assert_eq!(t.raw_len(), Some(0));

    vm.raw_set(&t, s(&vm, "again"), LuaValue::Boolean(true)).unwrap();
    assert_eq!(table.borrow().key_count(), 1);
}

#[test]
fn test_presized_table() {
    let vm = LuaVM::new(VmOption::default().with_default_table_size(4, 3));
    let t = vm.new_table();
    let table = t.as_table().unwrap().clone();
    assert_eq!(table.borrow().hash_capacity(), 4);
    vm.raw_set(&t, s(&vm, "a"), LuaValue::Integer(1)).unwrap();
    assert_eq!(table.borrow().hash_capacity(), 4);
}
