//! Value copying.
//!
//! Primitive values always get fresh storage. Containers get a fresh child
//! list whose names are new records with the same keys; the values behind
//! those names are shared unless a deep copy is requested.

use crate::errors::ArenaResult;
use crate::slots::Slots;
use crate::var_ref::{VarFlags, VarKind, VarRef};

/// Nesting limit for deep copies; deeper containers are shared.
pub(crate) const MAX_COPY_DEPTH: usize = 64;

impl Slots {
    /// Copy `src` (locked result). A name copies to a new, detached name.
    pub(crate) fn copy_value(&mut self, src: VarRef, deep: bool) -> ArenaResult<VarRef> {
        self.copy_at(src, deep, 0)
    }

    fn copy_at(&mut self, src: VarRef, deep: bool, depth: usize) -> ArenaResult<VarRef> {
        let rec = *self.rec(src);
        if rec.is_name() {
            let value = match rec.first_child {
                Some(v) => Some(self.copy_member_value(v, deep, depth)?),
                None => None,
            };
            let name = self.copy_key(src);
            let name = match name {
                Ok(name) => {
                    self.set_name_value(name, value);
                    self.rec_mut(name).flags = rec.flags - VarFlags::RECURSING;
                    Ok(name)
                }
                Err(err) => Err(err),
            };
            if let Some(v) = value {
                self.unlock(v);
            }
            return name;
        }
        match rec.kind {
            VarKind::String => self.string_from_span(src, 0, usize::MAX),
            kind if kind.is_container() => self.copy_container(src, deep, depth),
            kind => {
                let copy = self.alloc(kind)?;
                self.rec_mut(copy).payload = rec.payload;
                Ok(copy)
            }
        }
    }

    /// Key record of a name, duplicated without the value.
    pub(crate) fn copy_key(&mut self, name: VarRef) -> ArenaResult<VarRef> {
        match self.rec(name).kind {
            VarKind::String => self.string_from_span(name, 0, usize::MAX),
            kind => {
                let copy = self.alloc(kind)?;
                self.rec_mut(copy).payload = self.rec(name).payload;
                Ok(copy)
            }
        }
    }

    /// The value stored under a copied name: shared for shallow copies,
    /// cyclic back-references and over-deep nesting; copied otherwise.
    fn copy_member_value(&mut self, value: VarRef, deep: bool, depth: usize) -> ArenaResult<VarRef> {
        let v = self.rec(value);
        let share = !deep
            || v.flags.contains(VarFlags::RECURSING)
            || v.kind == VarKind::Root
            || (v.kind.is_container() && depth + 1 >= MAX_COPY_DEPTH);
        if share {
            self.lock(value);
            return Ok(value);
        }
        self.copy_at(value, deep, depth + 1)
    }

    fn copy_container(&mut self, src: VarRef, deep: bool, depth: usize) -> ArenaResult<VarRef> {
        let rec = *self.rec(src);
        let copy = self.alloc(rec.kind)?;
        self.rec_mut(copy).payload = rec.payload;
        self.rec_mut(src).flags.insert(VarFlags::RECURSING);
        let filled = self.copy_children(src, copy, deep, depth);
        self.rec_mut(src).flags.remove(VarFlags::RECURSING);
        if let Err(err) = filled {
            self.unlock(copy);
            return Err(err);
        }
        Ok(copy)
    }

    fn copy_children(
        &mut self,
        src: VarRef,
        dst: VarRef,
        deep: bool,
        depth: usize,
    ) -> ArenaResult<()> {
        let mut child = self.rec(src).first_child;
        while let Some(name) = child {
            // The source is locked by the caller, so its list is stable.
            child = self.rec(name).next_sibling;
            let copy = self.copy_at(name, deep, depth)?;
            let added = self.add_child(dst, copy);
            self.unlock(copy);
            added?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::record::Payload;

    fn ok<T>(r: ArenaResult<T>) -> T {
        r.unwrap_or_else(|e| panic!("{e}"))
    }

    fn value_of(slots: &Slots, obj: VarRef, key: &[u8]) -> VarRef {
        let name = slots
            .find_child_str(obj, key, false)
            .unwrap_or_else(|| panic!("missing key"));
        slots.rec(name).first_child.unwrap_or_else(|| panic!("no value"))
    }

    fn object_with_inner(slots: &mut Slots) -> (VarRef, VarRef) {
        let obj = ok(slots.alloc(VarKind::Object));
        let inner = ok(slots.alloc(VarKind::Object));
        let n = ok(slots.set_child_str(obj, b"inner", Some(inner), false));
        slots.unlock(n);
        let num = ok(slots.alloc(VarKind::Int));
        slots.rec_mut(num).payload = Payload::Int(3);
        let n = ok(slots.set_child_str(obj, b"n", Some(num), false));
        slots.unlock(n);
        slots.unlock(num);
        (obj, inner)
    }

    #[test]
    fn primitive_copy_has_own_storage() {
        let mut slots = Slots::new(8);
        let s = ok(slots.new_string(b"hello, world"));
        let c = ok(slots.copy_value(s, false));
        assert!(c != s);
        assert!(slots.strings_eq(s, c));
    }

    #[test]
    fn shallow_copy_shares_values() {
        let mut slots = Slots::new(32);
        let (obj, inner) = object_with_inner(&mut slots);
        let copy = ok(slots.copy_value(obj, false));
        assert_eq!(value_of(&slots, copy, b"inner"), inner);
        assert_eq!(slots.rec(inner).refs, 2);

        // Mutating the copy's list leaves the original alone.
        assert!(slots.remove_child_str(copy, b"n", false));
        assert_eq!(slots.child_count(obj), 2);
        assert_eq!(slots.child_count(copy), 1);
    }

    #[test]
    fn deep_copy_duplicates_containers() {
        let mut slots = Slots::new(32);
        let (obj, inner) = object_with_inner(&mut slots);
        let copy = ok(slots.copy_value(obj, true));
        assert!(value_of(&slots, copy, b"inner") != inner);
        assert_eq!(slots.rec(inner).refs, 1);
    }

    #[test]
    fn deep_copy_shares_cycles() {
        let mut slots = Slots::new(32);
        let obj = ok(slots.alloc(VarKind::Object));
        let n = ok(slots.set_child_str(obj, b"me", Some(obj), false));
        slots.unlock(n);
        let copy = ok(slots.copy_value(obj, true));
        assert_eq!(value_of(&slots, copy, b"me"), obj);
        assert!(!slots.rec(obj).flags.contains(VarFlags::RECURSING));
    }

    #[test]
    fn failed_copy_frees_partial_result() {
        let mut slots = Slots::new(12);
        let (obj, _) = object_with_inner(&mut slots);
        let used = slots.used();
        // Room for the container but not all of its names.
        let mut filler = Vec::new();
        while slots.free_count() > 2 {
            filler.push(ok(slots.alloc(VarKind::Null)));
        }
        let before = slots.used();
        assert!(slots.copy_value(obj, false).is_err());
        assert_eq!(slots.used(), before);
        assert!(before >= used);
    }
}
