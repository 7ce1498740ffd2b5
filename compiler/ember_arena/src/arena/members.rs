//! Named members: child lists, array elements and name records.

use super::{Arena, Var};
use crate::errors::{ArenaError, ArenaResult};
use crate::var_ref::{VarFlags, VarKind, VarRef};

impl Arena {
    // Names

    /// New detached string-keyed name holding `value`.
    pub fn new_name(
        &self,
        key: &str,
        value: Option<&Var<'_>>,
        flags: VarFlags,
    ) -> ArenaResult<Var<'_>> {
        let r = self
            .slots
            .borrow_mut()
            .new_name_str(key.as_bytes(), value.map(|v| v.r), flags)?;
        Ok(self.adopt(r))
    }

    /// New detached integer-keyed name holding `value`.
    pub fn new_name_int(&self, key: i32, value: Option<&Var<'_>>) -> ArenaResult<Var<'_>> {
        let r = self
            .slots
            .borrow_mut()
            .new_name_int(key, value.map(|v| v.r))?;
        Ok(self.adopt(r))
    }

    /// New detached name whose key is the string or integer `key`.
    pub fn new_name_from_key(
        &self,
        key: &Var<'_>,
        value: Option<&Var<'_>>,
    ) -> ArenaResult<Var<'_>> {
        let r = self
            .slots
            .borrow_mut()
            .new_name_from_key(key.r, value.map(|v| v.r))?;
        Ok(self.adopt(r))
    }

    /// The value a name holds. A non-name is returned as itself.
    pub fn name_value(&self, name: &Var<'_>) -> Option<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let value = slots.skip_name(name.r)?;
        slots.lock(value);
        drop(slots);
        Some(self.adopt(value))
    }

    /// Consume a guard and return what it denotes: the value of a name, or
    /// the record itself.
    pub fn skip_name<'a>(&'a self, v: Var<'a>) -> Option<Var<'a>> {
        if self.is_name(&v) {
            self.name_value(&v)
        } else {
            Some(v)
        }
    }

    pub fn set_name_value(&self, name: &Var<'_>, value: Option<&Var<'_>>) -> ArenaResult<()> {
        let mut slots = self.slots.borrow_mut();
        slots.ensure_name(name.r)?;
        slots.set_name_value(name.r, value.map(|v| v.r));
        Ok(())
    }

    /// The key of a name as a fresh plain value (string or integer).
    pub fn name_key(&self, name: &Var<'_>) -> ArenaResult<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        slots.ensure_name(name.r)?;
        let r = slots.copy_key(name.r)?;
        drop(slots);
        Ok(self.adopt(r))
    }

    /// The key of a name as text.
    pub fn name_key_string(&self, name: &Var<'_>) -> String {
        let slots = self.slots.borrow();
        let rec = slots.rec(name.r);
        match rec.kind {
            VarKind::Int => rec.int().to_string(),
            VarKind::String => {
                let mut out = Vec::new();
                slots.string_bytes(name.r, &mut out);
                String::from_utf8_lossy(&out).into_owned()
            }
            _ => String::new(),
        }
    }

    // Child lists

    /// Append a detached name to `parent`.
    pub fn add_child(&self, parent: &Var<'_>, name: &Var<'_>) -> ArenaResult<()> {
        self.slots.borrow_mut().add_child(parent.r, name.r)
    }

    /// The visible name `key` of `parent`.
    pub fn find_child(&self, parent: &Var<'_>, key: &str) -> Option<Var<'_>> {
        self.find_str(parent, key, false)
    }

    /// The hidden (internal) name `key` of `parent`.
    pub fn find_hidden(&self, parent: &Var<'_>, key: &str) -> Option<Var<'_>> {
        self.find_str(parent, key, true)
    }

    fn find_str(&self, parent: &Var<'_>, key: &str, hidden: bool) -> Option<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let name = slots.find_child_str(parent.r, key.as_bytes(), hidden)?;
        slots.lock(name);
        drop(slots);
        Some(self.adopt(name))
    }

    /// The name with integer key `index`.
    pub fn find_child_int(&self, parent: &Var<'_>, index: i32) -> Option<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let name = slots.find_child_int(parent.r, index)?;
        slots.lock(name);
        drop(slots);
        Some(self.adopt(name))
    }

    /// The visible name whose key equals the string or integer `key`.
    pub fn find_child_key(&self, parent: &Var<'_>, key: &Var<'_>) -> Option<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let key = slots.skip_name(key.r)?;
        let name = slots.find_child_key(parent.r, key)?;
        slots.lock(name);
        drop(slots);
        Some(self.adopt(name))
    }

    /// Value of the visible member `key`.
    pub fn get_child(&self, parent: &Var<'_>, key: &str) -> Option<Var<'_>> {
        let name = self.find_child(parent, key)?;
        self.name_value(&name)
    }

    /// Value of the hidden member `key`.
    pub fn get_hidden(&self, parent: &Var<'_>, key: &str) -> Option<Var<'_>> {
        let name = self.find_hidden(parent, key)?;
        self.name_value(&name)
    }

    /// Set (creating if needed) the visible member `key`; returns its name.
    pub fn set_child(
        &self,
        parent: &Var<'_>,
        key: &str,
        value: Option<&Var<'_>>,
    ) -> ArenaResult<Var<'_>> {
        let r = self
            .slots
            .borrow_mut()
            .set_child_str(parent.r, key.as_bytes(), value.map(|v| v.r), false)?;
        Ok(self.adopt(r))
    }

    /// Set (creating if needed) the hidden member `key`.
    pub fn set_hidden(
        &self,
        parent: &Var<'_>,
        key: &str,
        value: Option<&Var<'_>>,
    ) -> ArenaResult<()> {
        let mut slots = self.slots.borrow_mut();
        let name = slots.set_child_str(parent.r, key.as_bytes(), value.map(|v| v.r), true)?;
        slots.unlock(name);
        Ok(())
    }

    /// Remove the visible member `key`. Returns whether it existed.
    pub fn remove_child(&self, parent: &Var<'_>, key: &str) -> bool {
        self.slots
            .borrow_mut()
            .remove_child_str(parent.r, key.as_bytes(), false)
    }

    pub fn remove_hidden(&self, parent: &Var<'_>, key: &str) -> bool {
        self.slots
            .borrow_mut()
            .remove_child_str(parent.r, key.as_bytes(), true)
    }

    /// Unlink a specific name from `parent`.
    pub fn remove_name(&self, parent: &Var<'_>, name: &Var<'_>) -> ArenaResult<()> {
        let mut slots = self.slots.borrow_mut();
        slots.ensure_container(parent.r)?;
        slots.ensure_name(name.r)?;
        slots.remove_child(parent.r, name.r);
        Ok(())
    }

    pub fn child_count(&self, parent: &Var<'_>) -> usize {
        self.slots.borrow().child_count(parent.r)
    }

    /// Iterate the visible names of `parent` in insertion order.
    pub fn children<'a>(&'a self, parent: &Var<'_>) -> Children<'a> {
        let first = self.slots.borrow().first_name(parent.r);
        Children {
            arena: self,
            next: self.lock_visible_from(first),
        }
    }

    /// Lock the first visible name at or after `start`.
    fn lock_visible_from(&self, start: Option<VarRef>) -> Option<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let mut cursor = start;
        while let Some(r) = cursor {
            if !slots.rec(r).flags.contains(VarFlags::HIDDEN) {
                slots.lock(r);
                drop(slots);
                return Some(self.adopt(r));
            }
            cursor = slots.rec(r).next_sibling;
        }
        None
    }

    // Arrays

    pub fn array_len(&self, array: &Var<'_>) -> i32 {
        self.slots.borrow().array_len(array.r)
    }

    /// Set the length, dropping elements at or past it.
    pub fn set_array_len(&self, array: &Var<'_>, len: i32) {
        self.slots.borrow_mut().set_array_len(array.r, len);
    }

    /// Append a value; returns the new length.
    pub fn array_push(&self, array: &Var<'_>, value: Option<&Var<'_>>) -> ArenaResult<i32> {
        self.slots
            .borrow_mut()
            .array_push(array.r, value.map(|v| v.r))
    }

    /// Element `index` of an array (or integer-keyed member of any container).
    pub fn array_get(&self, array: &Var<'_>, index: i32) -> Option<Var<'_>> {
        let name = self.find_child_int(array, index)?;
        self.name_value(&name)
    }

    /// Set element `index`, creating it (and extending the length) if absent.
    pub fn array_set(
        &self,
        array: &Var<'_>,
        index: i32,
        value: Option<&Var<'_>>,
    ) -> ArenaResult<()> {
        if let Some(name) = self.find_child_int(array, index) {
            return self.set_name_value(&name, value);
        }
        if !array.kind().is_container() {
            return Err(ArenaError::NotAContainer);
        }
        let name = self.new_name_int(index, value)?;
        self.add_child(array, &name)
    }
}

/// Iterator over the visible names of a container.
///
/// The next name is locked ahead of time, so removing the current name
/// while iterating is safe.
pub struct Children<'a> {
    arena: &'a Arena,
    next: Option<Var<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Var<'a>;

    fn next(&mut self) -> Option<Var<'a>> {
        let current = self.next.take()?;
        let after = self.arena.slots.borrow().rec(current.r).next_sibling;
        self.next = self.arena.lock_visible_from(after);
        Some(current)
    }
}
