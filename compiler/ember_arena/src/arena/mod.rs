//! The public arena handle and its lock guard.
//!
//! [`Arena`] owns the record pool behind a `RefCell` so that every operation
//! takes `&self` and many [`Var`] guards can be alive at once. A `Var` pins
//! one record: cloning it takes another lock, dropping it releases one.
//!
//! # Borrow discipline
//!
//! Methods borrow the pool only for the duration of a single call and never
//! while a `Var` is created from an outside source or dropped. Guards are
//! constructed from records the pool has already locked, so building one
//! touches nothing.

mod members;
mod text;

use std::cell::RefCell;
use std::fmt;

use tracing::debug;

use crate::errors::{ArenaError, ArenaResult};
use crate::native::{ArgSpec, NativeId};
use crate::record::{NativeSlot, Payload};
use crate::slots::Slots;
use crate::var_ref::{VarFlags, VarKind, VarRef};

pub use members::Children;

/// Arena sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of value records, at most [`crate::MAX_CAPACITY`].
    pub capacity: usize,
}

impl ArenaConfig {
    /// Records allocated when no size is given.
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new(capacity: usize) -> Self {
        ArenaConfig { capacity }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig::new(Self::DEFAULT_CAPACITY)
    }
}

/// Point-in-time usage counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} records used ({} free)",
            self.used, self.capacity, self.free
        )
    }
}

/// Fixed pool of value records.
pub struct Arena {
    slots: RefCell<Slots>,
}

/// A locked record.
///
/// While a `Var` exists its record cannot be freed. `undefined` has no
/// record; APIs model it as `Option<Var>`.
pub struct Var<'a> {
    arena: &'a Arena,
    r: VarRef,
}

impl<'a> Var<'a> {
    /// The arena that owns the record.
    #[inline]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// The raw reference. It stays valid only while some lock or owning
    /// reference keeps the record alive.
    #[inline]
    pub fn var_ref(&self) -> VarRef {
        self.r
    }

    /// Whether both guards pin the same record.
    #[inline]
    pub fn same(&self, other: &Var<'_>) -> bool {
        self.r == other.r
    }

    pub fn kind(&self) -> VarKind {
        self.arena.kind(self)
    }
}

impl Clone for Var<'_> {
    fn clone(&self) -> Self {
        self.arena.slots.borrow_mut().lock(self.r);
        Var {
            arena: self.arena,
            r: self.r,
        }
    }
}

impl Drop for Var<'_> {
    fn drop(&mut self) {
        self.arena.slots.borrow_mut().unlock(self.r);
    }
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({:?}, {:?})", self.r, self.kind())
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena").field("stats", &self.stats()).finish()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new(ArenaConfig::default())
    }
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Self {
        debug!(capacity = config.capacity, "creating value arena");
        Arena {
            slots: RefCell::new(Slots::new(config.capacity)),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Arena::new(ArenaConfig::new(capacity))
    }

    pub fn stats(&self) -> ArenaStats {
        let slots = self.slots.borrow();
        ArenaStats {
            capacity: slots.capacity(),
            used: slots.used(),
            free: slots.free_count(),
        }
    }

    /// Take the sticky fault raised by an operation with no error channel
    /// (lock or reference count saturation).
    pub fn take_fault(&self) -> Option<ArenaError> {
        self.slots.borrow_mut().take_fault()
    }

    /// `Err` if a fault is pending. The fault stays pending.
    pub fn check_fault(&self) -> ArenaResult<()> {
        match self.slots.borrow().fault() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wrap a record the pool has already locked for us.
    #[inline]
    fn adopt(&self, r: VarRef) -> Var<'_> {
        Var { arena: self, r }
    }

    /// Lock a record by raw reference. The record must be alive.
    pub fn lock(&self, r: VarRef) -> Var<'_> {
        let mut slots = self.slots.borrow_mut();
        debug_assert!(slots.rec(r).kind != VarKind::Free, "locking a free record");
        slots.lock(r);
        drop(slots);
        self.adopt(r)
    }

    // Ownership

    /// Take a structural reference on `v`, for hosts that keep a raw
    /// [`VarRef`] beyond the guard's lifetime.
    pub fn add_ref(&self, v: &Var<'_>) {
        self.slots.borrow_mut().add_ref(v.r);
    }

    /// Drop a structural reference taken with [`Arena::add_ref`].
    pub fn release(&self, r: VarRef) {
        self.slots.borrow_mut().unref(r);
    }

    pub fn refs(&self, v: &Var<'_>) -> u16 {
        self.slots.borrow().rec(v.r).refs
    }

    pub fn locks(&self, v: &Var<'_>) -> u16 {
        self.slots.borrow().rec(v.r).locks
    }

    // Construction

    fn alloc_with(&self, kind: VarKind, payload: Payload) -> ArenaResult<Var<'_>> {
        let mut slots = self.slots.borrow_mut();
        let r = slots.alloc(kind)?;
        slots.rec_mut(r).payload = payload;
        drop(slots);
        Ok(self.adopt(r))
    }

    pub fn new_null(&self) -> ArenaResult<Var<'_>> {
        self.alloc_with(VarKind::Null, Payload::None)
    }

    pub fn new_int(&self, value: i32) -> ArenaResult<Var<'_>> {
        self.alloc_with(VarKind::Int, Payload::Int(value))
    }

    pub fn new_float(&self, value: f64) -> ArenaResult<Var<'_>> {
        self.alloc_with(VarKind::Float, Payload::Float(value))
    }

    pub fn new_bool(&self, value: bool) -> ArenaResult<Var<'_>> {
        self.alloc_with(VarKind::Bool, Payload::Bool(value))
    }

    /// Integer record if `value` is integral and fits in 32 bits, float
    /// otherwise. Negative zero stays a float.
    pub fn new_number(&self, value: f64) -> ArenaResult<Var<'_>> {
        let fits = value.fract() == 0.0
            && value >= f64::from(i32::MIN)
            && value <= f64::from(i32::MAX)
            && !(value == 0.0 && value.is_sign_negative());
        if fits {
            self.new_int(value as i32)
        } else {
            self.new_float(value)
        }
    }

    /// Any container kind: object, array, function, arrow or root.
    pub fn new_container(&self, kind: VarKind) -> ArenaResult<Var<'_>> {
        if !kind.is_container() || kind == VarKind::NativeFunction {
            return Err(ArenaError::NotAContainer);
        }
        let payload = if kind == VarKind::Array {
            Payload::Int(0)
        } else {
            Payload::None
        };
        self.alloc_with(kind, payload)
    }

    pub fn new_object(&self) -> ArenaResult<Var<'_>> {
        self.new_container(VarKind::Object)
    }

    pub fn new_array(&self) -> ArenaResult<Var<'_>> {
        self.new_container(VarKind::Array)
    }

    pub fn new_root(&self) -> ArenaResult<Var<'_>> {
        self.new_container(VarKind::Root)
    }

    /// Host function record carrying its registry id and call descriptor.
    pub fn new_native(&self, id: NativeId, spec: ArgSpec) -> ArenaResult<Var<'_>> {
        self.alloc_with(
            VarKind::NativeFunction,
            Payload::Native(NativeSlot { id, spec }),
        )
    }

    /// Copy a value. Containers get a fresh child list; member values are
    /// shared unless `deep`.
    pub fn copy(&self, v: &Var<'_>, deep: bool) -> ArenaResult<Var<'_>> {
        let r = self.slots.borrow_mut().copy_value(v.r, deep)?;
        Ok(self.adopt(r))
    }

    // Inspection

    pub fn kind(&self, v: &Var<'_>) -> VarKind {
        self.slots.borrow().rec(v.r).kind
    }

    pub fn flags(&self, v: &Var<'_>) -> VarFlags {
        self.slots.borrow().rec(v.r).flags
    }

    /// Set or clear flag bits. `NAME` cannot be changed here.
    pub fn set_flags(&self, v: &Var<'_>, flags: VarFlags, on: bool) {
        let flags = flags - VarFlags::NAME - VarFlags::FREEING - VarFlags::RECURSING;
        let mut slots = self.slots.borrow_mut();
        let rec = slots.rec_mut(v.r);
        rec.flags.set(flags, on);
    }

    pub fn is_name(&self, v: &Var<'_>) -> bool {
        self.slots.borrow().rec(v.r).is_name()
    }

    /// Registry id and descriptor of a host function record.
    pub fn native_slot(&self, v: &Var<'_>) -> Option<(NativeId, ArgSpec)> {
        match self.slots.borrow().rec(v.r).payload {
            Payload::Native(slot) => Some((slot.id, slot.spec)),
            _ => None,
        }
    }

    pub fn as_int(&self, v: &Var<'_>) -> i32 {
        self.slots.borrow().as_int(v.r)
    }

    pub fn as_float(&self, v: &Var<'_>) -> f64 {
        self.slots.borrow().as_float(v.r)
    }

    pub fn as_bool(&self, v: &Var<'_>) -> bool {
        self.slots.borrow().as_bool(v.r)
    }

    /// Loose equality between two records: numbers compare across int,
    /// float and boolean; strings compare by content (also against numbers);
    /// `null` equals `null`; containers compare by identity.
    pub fn equals(&self, a: &Var<'_>, b: &Var<'_>) -> bool {
        if a.r == b.r {
            return true;
        }
        let slots = self.slots.borrow();
        let (Some(x), Some(y)) = (slots.skip_name(a.r), slots.skip_name(b.r)) else {
            return slots.skip_name(a.r).is_none() && slots.skip_name(b.r).is_none();
        };
        if x == y {
            return true;
        }
        let (kx, ky) = (slots.rec(x).kind, slots.rec(y).kind);
        match (kx, ky) {
            (VarKind::String, VarKind::String) => slots.strings_eq(x, y),
            (VarKind::Null, VarKind::Null) => true,
            (VarKind::Null, _) | (_, VarKind::Null) => false,
            _ if kx.is_container() || ky.is_container() => false,
            _ => slots.as_float(x) == slots.as_float(y),
        }
    }

    /// Display text: what `print` shows and what `+` concatenates.
    pub fn to_display_string(&self, v: Option<&Var<'_>>) -> String {
        let mut out = Vec::new();
        self.write_display(v, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn write_display(&self, v: Option<&Var<'_>>, out: &mut Vec<u8>) {
        self.slots.borrow_mut().write_display(v.map(|v| v.r), out);
    }
}

#[cfg(test)]
mod tests;
