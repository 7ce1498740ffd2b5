//! Child lists: the ordered name lists behind objects, arrays, functions
//! and the root.
//!
//! A container's contents are a doubly linked list of name records in
//! insertion order. Lookup is a linear scan comparing keys; objects on the
//! target devices are small enough that this beats any hashed layout.
//! Array indices are names with integer keys, and an array caches its length
//! in its payload.

use crate::errors::{ArenaError, ArenaResult};
use crate::record::Payload;
use crate::slots::Slots;
use crate::var_ref::{VarFlags, VarKind, VarRef};

impl Slots {
    pub(crate) fn ensure_container(&self, r: VarRef) -> ArenaResult<()> {
        if self.rec(r).kind.is_container() && !self.rec(r).is_name() {
            Ok(())
        } else {
            Err(ArenaError::NotAContainer)
        }
    }

    pub(crate) fn ensure_name(&self, r: VarRef) -> ArenaResult<()> {
        if self.rec(r).is_name() {
            Ok(())
        } else {
            Err(ArenaError::NotAName)
        }
    }

    /// New string-keyed name owning `value` (locked).
    pub(crate) fn new_name_str(
        &mut self,
        key: &[u8],
        value: Option<VarRef>,
        flags: VarFlags,
    ) -> ArenaResult<VarRef> {
        let name = self.new_string(key)?;
        self.rec_mut(name).flags = flags | VarFlags::NAME;
        self.set_name_value(name, value);
        Ok(name)
    }

    /// New integer-keyed name owning `value` (locked).
    pub(crate) fn new_name_int(&mut self, key: i32, value: Option<VarRef>) -> ArenaResult<VarRef> {
        let name = self.alloc(VarKind::Int)?;
        let rec = self.rec_mut(name);
        rec.payload = Payload::Int(key);
        rec.flags = VarFlags::NAME;
        self.set_name_value(name, value);
        Ok(name)
    }

    /// New name whose key duplicates `key` (a string or integer record).
    pub(crate) fn new_name_from_key(
        &mut self,
        key: VarRef,
        value: Option<VarRef>,
    ) -> ArenaResult<VarRef> {
        match self.rec(key).kind {
            VarKind::Int => {
                let k = self.rec(key).int();
                self.new_name_int(k, value)
            }
            VarKind::String => {
                let name = self.new_string(&[])?;
                if let Err(err) = self.append_span(name, key, 0, usize::MAX) {
                    self.unlock(name);
                    return Err(err);
                }
                self.rec_mut(name).flags = VarFlags::NAME;
                self.set_name_value(name, value);
                Ok(name)
            }
            _ => Err(ArenaError::NotAString),
        }
    }

    /// Replace the value owned by `name`.
    pub(crate) fn set_name_value(&mut self, name: VarRef, value: Option<VarRef>) {
        if let Some(v) = value {
            self.add_ref(v);
        }
        let old = std::mem::replace(&mut self.rec_mut(name).first_child, value);
        if let Some(old) = old {
            self.unref(old);
        }
    }

    /// Append a detached name to `parent`'s list.
    pub(crate) fn add_child(&mut self, parent: VarRef, name: VarRef) -> ArenaResult<()> {
        self.ensure_container(parent)?;
        self.ensure_name(name)?;
        let last = self.rec(parent).last_child;
        {
            let n = self.rec_mut(name);
            n.prev_sibling = last;
            n.next_sibling = None;
        }
        match last {
            Some(last) => self.rec_mut(last).next_sibling = Some(name),
            None => self.rec_mut(parent).first_child = Some(name),
        }
        self.rec_mut(parent).last_child = Some(name);
        self.add_ref(name);
        if self.rec(parent).kind == VarKind::Array && self.rec(name).kind == VarKind::Int {
            let index = self.rec(name).int();
            self.grow_array_len(parent, index);
        }
        Ok(())
    }

    fn grow_array_len(&mut self, array: VarRef, index: i32) {
        let rec = self.rec_mut(array);
        if let Payload::Int(len) = &mut rec.payload {
            if index >= *len {
                *len = index.saturating_add(1);
            }
        }
    }

    /// Unlink `name` from `parent` and drop the list's reference to it.
    pub(crate) fn remove_child(&mut self, parent: VarRef, name: VarRef) {
        let n = *self.rec(name);
        match n.prev_sibling {
            Some(prev) => self.rec_mut(prev).next_sibling = n.next_sibling,
            None => {
                if self.rec(parent).first_child == Some(name) {
                    self.rec_mut(parent).first_child = n.next_sibling;
                }
            }
        }
        match n.next_sibling {
            Some(next) => self.rec_mut(next).prev_sibling = n.prev_sibling,
            None => {
                if self.rec(parent).last_child == Some(name) {
                    self.rec_mut(parent).last_child = n.prev_sibling;
                }
            }
        }
        let rec = self.rec_mut(name);
        rec.prev_sibling = None;
        rec.next_sibling = None;
        self.unref(name);
    }

    /// Whether `name` is a string-keyed name equal to `key` with the given
    /// visibility.
    pub(crate) fn name_matches_str(&self, name: VarRef, key: &[u8], hidden: bool) -> bool {
        let rec = self.rec(name);
        rec.kind == VarKind::String
            && rec.flags.contains(VarFlags::HIDDEN) == hidden
            && self.string_eq_bytes(name, key)
    }

    /// First name of a container's list; `None` for anything else.
    pub(crate) fn first_name(&self, parent: VarRef) -> Option<VarRef> {
        let rec = self.rec(parent);
        if rec.kind.is_container() {
            rec.first_child
        } else {
            None
        }
    }

    pub(crate) fn find_child_str(&self, parent: VarRef, key: &[u8], hidden: bool) -> Option<VarRef> {
        let mut child = self.first_name(parent);
        while let Some(name) = child {
            if self.name_matches_str(name, key, hidden) {
                return Some(name);
            }
            child = self.rec(name).next_sibling;
        }
        None
    }

    pub(crate) fn find_child_int(&self, parent: VarRef, key: i32) -> Option<VarRef> {
        let mut child = self.first_name(parent);
        while let Some(name) = child {
            let rec = self.rec(name);
            if rec.kind == VarKind::Int && rec.int() == key {
                return Some(name);
            }
            child = rec.next_sibling;
        }
        None
    }

    /// Find a visible child whose key equals the string or integer `key`.
    pub(crate) fn find_child_key(&self, parent: VarRef, key: VarRef) -> Option<VarRef> {
        match self.rec(key).kind {
            VarKind::Int => self.find_child_int(parent, self.rec(key).int()),
            VarKind::String => {
                let mut child = self.first_name(parent);
                while let Some(name) = child {
                    let rec = self.rec(name);
                    if rec.kind == VarKind::String
                        && !rec.flags.contains(VarFlags::HIDDEN)
                        && self.strings_eq(name, key)
                    {
                        return Some(name);
                    }
                    child = rec.next_sibling;
                }
                None
            }
            _ => None,
        }
    }

    /// Set (or create) the string-keyed child `key` of `parent` to `value`.
    /// Returns the name, locked.
    pub(crate) fn set_child_str(
        &mut self,
        parent: VarRef,
        key: &[u8],
        value: Option<VarRef>,
        hidden: bool,
    ) -> ArenaResult<VarRef> {
        self.ensure_container(parent)?;
        if let Some(name) = self.find_child_str(parent, key, hidden) {
            self.set_name_value(name, value);
            self.lock(name);
            return Ok(name);
        }
        let flags = if hidden {
            VarFlags::HIDDEN
        } else {
            VarFlags::empty()
        };
        let name = self.new_name_str(key, value, flags)?;
        self.add_child(parent, name)?;
        Ok(name)
    }

    /// Remove a string-keyed child if present.
    pub(crate) fn remove_child_str(&mut self, parent: VarRef, key: &[u8], hidden: bool) -> bool {
        match self.find_child_str(parent, key, hidden) {
            Some(name) => {
                self.remove_child(parent, name);
                true
            }
            None => false,
        }
    }

    pub(crate) fn child_count(&self, parent: VarRef) -> usize {
        let mut count = 0;
        let mut child = self.first_name(parent);
        while let Some(name) = child {
            count += 1;
            child = self.rec(name).next_sibling;
        }
        count
    }

    // Arrays

    pub(crate) fn array_len(&self, array: VarRef) -> i32 {
        match self.rec(array).kind {
            VarKind::Array => self.rec(array).int(),
            _ => 0,
        }
    }

    /// Set the array length; indices at or past the new length are removed.
    pub(crate) fn set_array_len(&mut self, array: VarRef, len: i32) {
        if self.rec(array).kind != VarKind::Array {
            return;
        }
        let mut child = self.rec(array).first_child;
        while let Some(name) = child {
            let rec = *self.rec(name);
            child = rec.next_sibling;
            if rec.kind == VarKind::Int && rec.int() >= len {
                self.remove_child(array, name);
            }
        }
        self.rec_mut(array).payload = Payload::Int(len.max(0));
    }

    /// Append `value` at index `len` and return the new length.
    pub(crate) fn array_push(&mut self, array: VarRef, value: Option<VarRef>) -> ArenaResult<i32> {
        if self.rec(array).kind != VarKind::Array {
            return Err(ArenaError::NotAContainer);
        }
        let index = self.array_len(array);
        let name = self.new_name_int(index, value)?;
        let added = self.add_child(array, name);
        self.unlock(name);
        added?;
        Ok(self.array_len(array))
    }
}
