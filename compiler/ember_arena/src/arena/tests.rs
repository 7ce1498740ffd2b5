use pretty_assertions::assert_eq;

use super::*;
use crate::native::ArgType;

fn arena(capacity: usize) -> Arena {
    Arena::with_capacity(capacity)
}

#[test]
fn literal_round_trip() {
    let arena = arena(16);
    let i = arena.new_int(42).unwrap_or_else(|e| panic!("{e}"));
    let f = arena.new_float(3.14).unwrap_or_else(|e| panic!("{e}"));
    let s = arena.new_string("ab").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(arena.as_int(&i), 42);
    assert_eq!(arena.as_float(&f), 3.14);
    assert_eq!(arena.string_to_string(&s), "ab");
    assert_eq!(i.kind(), VarKind::Int);
}

#[test]
fn guards_release_on_drop() {
    let arena = arena(16);
    {
        let a = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
        let b = a.clone();
        assert_eq!(arena.locks(&a), 2);
        drop(b);
        assert_eq!(arena.locks(&a), 1);
        assert_eq!(arena.stats().used, 1);
    }
    assert_eq!(arena.stats().used, 0);
}

#[test]
fn number_picks_int_when_exact() {
    let arena = arena(8);
    let a = arena.new_number(7.0).unwrap_or_else(|e| panic!("{e}"));
    let b = arena.new_number(7.5).unwrap_or_else(|e| panic!("{e}"));
    let c = arena.new_number(4_294_967_296.0).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(a.kind(), VarKind::Int);
    assert_eq!(b.kind(), VarKind::Float);
    assert_eq!(c.kind(), VarKind::Float);
}

#[test]
fn equality_crosses_numeric_kinds() {
    let arena = arena(16);
    let one = arena.new_int(1).unwrap_or_else(|e| panic!("{e}"));
    let one_f = arena.new_float(1.0).unwrap_or_else(|e| panic!("{e}"));
    let yes = arena.new_bool(true).unwrap_or_else(|e| panic!("{e}"));
    let text = arena.new_string("1").unwrap_or_else(|e| panic!("{e}"));
    let null = arena.new_null().unwrap_or_else(|e| panic!("{e}"));
    let o1 = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    let o2 = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    assert!(arena.equals(&one, &one_f));
    assert!(arena.equals(&one, &yes));
    assert!(arena.equals(&one, &text));
    assert!(!arena.equals(&one, &null));
    assert!(!arena.equals(&o1, &o2));
    assert!(arena.equals(&o1, &o1.clone()));
}

#[test]
fn members_set_get_remove() {
    let arena = arena(32);
    let obj = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    let v = arena.new_int(5).unwrap_or_else(|e| panic!("{e}"));
    drop(arena.set_child(&obj, "five", Some(&v)).unwrap_or_else(|e| panic!("{e}")));
    drop(v);
    let got = arena.get_child(&obj, "five").unwrap_or_else(|| panic!("missing"));
    assert_eq!(arena.as_int(&got), 5);
    drop(got);
    assert!(arena.remove_child(&obj, "five"));
    assert!(arena.get_child(&obj, "five").is_none());
    assert_eq!(arena.stats().used, 1);
}

#[test]
fn hidden_members_are_not_enumerated() {
    let arena = arena(32);
    let obj = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    arena.set_hidden(&obj, "secret", None).unwrap_or_else(|e| panic!("{e}"));
    for key in ["a", "b"] {
        drop(arena.set_child(&obj, key, None).unwrap_or_else(|e| panic!("{e}")));
    }
    let keys: Vec<String> = arena
        .children(&obj)
        .map(|n| arena.name_key_string(&n))
        .collect();
    assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
    assert!(arena.find_hidden(&obj, "secret").is_some());
}

#[test]
fn removing_during_iteration() {
    let arena = arena(32);
    let obj = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    for key in ["a", "b", "c"] {
        drop(arena.set_child(&obj, key, None).unwrap_or_else(|e| panic!("{e}")));
    }
    for name in arena.children(&obj) {
        arena.remove_name(&obj, &name).unwrap_or_else(|e| panic!("{e}"));
    }
    assert_eq!(arena.child_count(&obj), 0);
    assert_eq!(arena.stats().used, 1);
}

#[test]
fn arrays_index_and_grow() {
    let arena = arena(32);
    let arr = arena.new_array().unwrap_or_else(|e| panic!("{e}"));
    let x = arena.new_string("x").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(arena.array_push(&arr, Some(&x)), Ok(1));
    arena.array_set(&arr, 3, Some(&x)).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(arena.array_len(&arr), 4);
    assert!(arena.array_get(&arr, 1).is_none());
    let third = arena.array_get(&arr, 3).unwrap_or_else(|| panic!("missing"));
    assert!(third.same(&x));
    assert_eq!(arena.to_display_string(Some(&arr)), "x,,,x");
}

#[test]
fn copy_keeps_original_list() {
    let arena = arena(32);
    let obj = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    let inner = arena.new_object().unwrap_or_else(|e| panic!("{e}"));
    drop(arena.set_child(&obj, "inner", Some(&inner)).unwrap_or_else(|e| panic!("{e}")));
    let shallow = arena.copy(&obj, false).unwrap_or_else(|e| panic!("{e}"));
    drop(arena.set_child(&shallow, "extra", None).unwrap_or_else(|e| panic!("{e}")));
    assert_eq!(arena.child_count(&obj), 1);
    assert_eq!(arena.child_count(&shallow), 2);
    let shared = arena.get_child(&shallow, "inner").unwrap_or_else(|| panic!("missing"));
    assert!(shared.same(&inner));

    let deep = arena.copy(&obj, true).unwrap_or_else(|e| panic!("{e}"));
    let fresh = arena.get_child(&deep, "inner").unwrap_or_else(|| panic!("missing"));
    assert!(!fresh.same(&inner));
}

#[test]
fn exhaustion_then_recovery() {
    let arena = arena(8);
    let mut held = Vec::new();
    let err = loop {
        match arena.new_int(1) {
            Ok(v) => held.push(v),
            Err(err) => break err,
        }
    };
    assert_eq!(err, ArenaError::OutOfMemory { capacity: 8 });
    assert_eq!(held.len(), 8);
    held.truncate(5);
    assert!(arena.new_int(2).is_ok());
    assert_eq!(arena.stats().used, 5);
}

#[test]
fn append_display_mixes_kinds() {
    let arena = arena(32);
    let s = arena.new_string("n=").unwrap_or_else(|e| panic!("{e}"));
    let n = arena.new_float(1.5).unwrap_or_else(|e| panic!("{e}"));
    arena.append_display(&s, Some(&n)).unwrap_or_else(|e| panic!("{e}"));
    arena.append_display(&s, None).unwrap_or_else(|e| panic!("{e}"));
    let tail = arena.new_string(" and a long tail").unwrap_or_else(|e| panic!("{e}"));
    arena.append_display(&s, Some(&tail)).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(arena.string_to_string(&s), "n=1.5undefined and a long tail");
    assert!(arena.string_eq_str(&s, "n=1.5undefined and a long tail"));
}

#[test]
fn native_records_carry_descriptor() {
    let arena = arena(4);
    let spec = ArgSpec::returns(ArgType::Int32).param(ArgType::Int32);
    let f = arena.new_native(NativeId(3), spec).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(arena.native_slot(&f), Some((NativeId(3), spec)));
    assert!(f.kind().is_function());
}

#[test]
fn host_references_outlive_guards() {
    let arena = arena(4);
    let v = arena.new_string("kept").unwrap_or_else(|e| panic!("{e}"));
    arena.add_ref(&v);
    let raw = v.var_ref();
    drop(v);
    let again = arena.lock(raw);
    assert!(arena.string_eq_str(&again, "kept"));
    drop(again);
    arena.release(raw);
    assert_eq!(arena.stats().used, 0);
}
