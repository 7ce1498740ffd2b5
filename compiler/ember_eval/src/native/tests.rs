use ember_arena::{Arena, ArgSpec, ArgType};
use pretty_assertions::assert_eq;

use super::*;

fn nothing<'a>(_: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Undefined)
}

fn one<'a>(_: &mut NativeCall<'a, '_>) -> EvalResult<NativeValue<'a>> {
    Ok(NativeValue::Int(1))
}

const VOID: ArgSpec = ArgSpec::returns(ArgType::Void);

#[test]
fn lookup_is_by_owner_and_name() {
    let mut reg = NativeRegistry::new();
    let print = reg.register(GLOBAL_OWNER, "print", VOID, nothing);
    let floor = reg.register("Math", "floor", VOID, nothing);
    let push = reg.register("Array", "push", VOID, nothing);

    assert_eq!(reg.lookup(GLOBAL_OWNER, "print"), print);
    assert_eq!(reg.lookup("Math", "floor"), floor);
    assert_eq!(reg.lookup("Array", "push"), push);
    assert_eq!(reg.lookup("Math", "print"), None);
    assert_eq!(reg.lookup("Array", "pop"), None);
    assert_eq!(reg.len(), 3);
}

#[test]
fn ids_survive_later_registrations() {
    let mut reg = NativeRegistry::new();
    let z = reg.register("Z", "z", VOID, nothing);
    for name in ["c", "b", "a"] {
        reg.register("A", name, VOID, nothing);
    }
    let z = z.unwrap_or_else(|| panic!("registered"));
    assert_eq!(reg.lookup("Z", "z"), Some(z));
    let entry = reg.get(z).unwrap_or_else(|| panic!("entry"));
    assert_eq!((entry.owner.as_str(), entry.name.as_str()), ("Z", "z"));
}

#[test]
fn reregistering_replaces_the_entry() {
    let mut reg = NativeRegistry::new();
    let first = reg.register("Math", "abs", VOID, nothing);
    let spec = ArgSpec::returns(ArgType::Int32).param(ArgType::Int32);
    let second = reg.register("Math", "abs", spec, one);
    assert_eq!(first, second);
    assert_eq!(reg.len(), 1);
    let entry = second.and_then(|id| reg.get(id)).unwrap_or_else(|| panic!("entry"));
    assert_eq!(entry.spec, spec);
}

#[test]
fn owners() {
    let mut reg = NativeRegistry::new();
    assert!(reg.is_empty());
    reg.register("Math", "floor", VOID, nothing);
    reg.register("String", "charAt", VOID, nothing);
    assert!(reg.has_owner("Math"));
    assert!(reg.has_owner("String"));
    assert!(!reg.has_owner("Mat"));
    assert!(!reg.has_owner("Object"));
}

#[test]
fn value_conversions() {
    let arena = Arena::with_capacity(16);
    let three = arena.new_string("3").unwrap_or_else(|e| panic!("{e}"));
    let v = NativeValue::Var(three);
    assert_eq!(v.to_int(&arena), 3);
    assert_eq!(v.to_float(&arena), 3.0);
    assert!(v.to_bool(&arena));

    assert!(NativeValue::Undefined.to_float(&arena).is_nan());
    assert_eq!(NativeValue::Float(2.9).to_int(&arena), 2);
    assert_eq!(NativeValue::Pin(13).to_int(&arena), 13);

    let boxed = NativeValue::Float(0.5)
        .into_var(&arena)
        .unwrap_or_else(|e| panic!("{e}"))
        .unwrap_or_else(|| panic!("record"));
    assert_eq!(arena.as_float(&boxed), 0.5);
    assert!(NativeValue::Undefined
        .into_var(&arena)
        .unwrap_or_else(|e| panic!("{e}"))
        .is_none());
}
