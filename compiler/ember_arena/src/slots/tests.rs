use pretty_assertions::assert_eq;

use super::*;
use crate::var_ref::VarFlags;

#[test]
fn alloc_returns_locked_record() {
    let mut slots = Slots::new(4);
    let r = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(slots.rec(r).locks, 1);
    assert_eq!(slots.rec(r).refs, 0);
    assert_eq!(slots.used(), 1);
}

#[test]
fn unlock_frees_unreferenced_record() {
    let mut slots = Slots::new(4);
    let r = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
    slots.unlock(r);
    assert_eq!(slots.used(), 0);
    assert_eq!(slots.rec(r).kind, VarKind::Free);
}

#[test]
fn referenced_record_survives_unlock() {
    let mut slots = Slots::new(4);
    let r = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
    slots.add_ref(r);
    slots.unlock(r);
    assert_eq!(slots.used(), 1);
    slots.unref(r);
    assert_eq!(slots.used(), 0);
}

#[test]
fn exhaustion_is_an_error_and_recovers() {
    let mut slots = Slots::new(3);
    let a = slots.alloc(VarKind::Null).unwrap_or_else(|e| panic!("{e}"));
    let _b = slots.alloc(VarKind::Null).unwrap_or_else(|e| panic!("{e}"));
    let _c = slots.alloc(VarKind::Null).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(
        slots.alloc(VarKind::Null),
        Err(ArenaError::OutOfMemory { capacity: 3 })
    );
    slots.unlock(a);
    assert!(slots.alloc(VarKind::Null).is_ok());
}

#[test]
fn lock_saturation_pins_and_faults() {
    let mut slots = Slots::new(2);
    let r = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
    for _ in 0..u16::MAX {
        slots.lock(r);
    }
    assert_eq!(slots.rec(r).locks, u16::MAX);
    assert_eq!(slots.take_fault(), Some(ArenaError::LockOverflow));
    assert_eq!(slots.take_fault(), None);
    slots.unlock(r);
    assert_eq!(slots.rec(r).locks, u16::MAX);
    assert_eq!(slots.used(), 1);
}

/// Object holding `name -> value` with the name already linked.
fn link(slots: &mut Slots, parent: VarRef, key: &[u8], value: VarRef) {
    let name = slots
        .new_name_str(key, Some(value), VarFlags::empty())
        .unwrap_or_else(|e| panic!("{e}"));
    slots.add_child(parent, name).unwrap_or_else(|e| panic!("{e}"));
    slots.unlock(name);
}

#[test]
fn teardown_releases_children() {
    let mut slots = Slots::new(16);
    let obj = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    let v = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
    link(&mut slots, obj, b"a", v);
    slots.unlock(v);
    assert_eq!(slots.used(), 3);
    slots.unlock(obj);
    assert_eq!(slots.used(), 0);
}

#[test]
fn long_chain_tears_down_without_recursion() {
    let mut slots = Slots::new(20_000);
    let head = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    let mut tail = head;
    slots.lock(tail);
    for _ in 0..9_000 {
        let next = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
        let name = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
        slots.rec_mut(name).flags = VarFlags::NAME;
        slots.set_name_value(name, Some(next));
        slots.add_child(tail, name).unwrap_or_else(|e| panic!("{e}"));
        slots.unlock(name);
        slots.unlock(tail);
        tail = next;
    }
    slots.unlock(tail);
    slots.unlock(head);
    assert_eq!(slots.used(), 0);
}

#[test]
fn self_cycle_is_collected() {
    let mut slots = Slots::new(8);
    let obj = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    link(&mut slots, obj, b"me", obj);
    assert_eq!(slots.rec(obj).refs, 1);
    slots.unlock(obj);
    assert_eq!(slots.used(), 0);
}

#[test]
fn two_object_cycle_is_collected() {
    let mut slots = Slots::new(16);
    let a = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    let b = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    link(&mut slots, a, b"b", b);
    link(&mut slots, b, b"a", a);
    slots.unlock(b);
    assert_eq!(slots.used(), 6);
    slots.unlock(a);
    assert_eq!(slots.used(), 0);
}

#[test]
fn cycle_with_outside_reference_is_kept() {
    let mut slots = Slots::new(16);
    let holder = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    let a = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    link(&mut slots, a, b"me", a);
    link(&mut slots, holder, b"a", a);
    slots.unlock(a);
    assert_eq!(slots.rec(a).kind, VarKind::Object);
    assert_eq!(slots.rec(a).refs, 2);
    slots.unlock(holder);
    assert_eq!(slots.used(), 0);
}

#[test]
fn locked_member_blocks_collection() {
    let mut slots = Slots::new(16);
    let a = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    let b = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    link(&mut slots, a, b"b", b);
    link(&mut slots, b, b"a", a);
    slots.unlock(a);
    // b is still locked, so nothing in the cycle may go.
    assert_eq!(slots.rec(a).kind, VarKind::Object);
    slots.unlock(b);
    assert_eq!(slots.used(), 0);
}

#[test]
fn cycle_check_gives_up_past_its_budget() {
    let mut slots = Slots::new(1024);
    let big = slots.alloc(VarKind::Object).unwrap_or_else(|e| panic!("{e}"));
    for i in 0..CYCLE_BUDGET {
        let v = slots.alloc(VarKind::Int).unwrap_or_else(|e| panic!("{e}"));
        link(&mut slots, big, format!("k{i}").as_bytes(), v);
        slots.unlock(v);
    }
    link(&mut slots, big, b"me", big);
    slots.unlock(big);
    // Its names alone exceed the budget, so the cycle is left to leak.
    assert_eq!(slots.rec(big).kind, VarKind::Object);
    assert_eq!(slots.rec(big).refs, 1);
    assert_eq!(slots.used(), 1 + 2 * CYCLE_BUDGET + 1);
}
