//! Record storage, free list, and the lock/refcount lifecycle.
//!
//! `Slots` is the single-owner core behind [`crate::Arena`]. All methods work
//! on raw [`VarRef`]s; the public layer wraps them in lock guards.
//!
//! # Lifecycle
//!
//! A record is torn down when both its lock count and its reference count
//! reach zero. Teardown releases (never frees directly) everything the record
//! owns: a name's value, a container's child names. Released records that in
//! turn reach zero are queued on an intrusive worklist threaded through
//! `next_sibling`, so tearing down long chains does not recurse.
//!
//! # Cycles
//!
//! Reference counting alone never frees a cycle. When a release or unlock
//! leaves an unlocked container with references remaining, [`Slots::collect_if_cyclic`]
//! walks a bounded neighbourhood and frees the container if every record in
//! that neighbourhood is referenced only from inside it. Larger or partially
//! pinned cycles leak for the life of the arena.

use tracing::debug;

use crate::errors::{ArenaError, ArenaResult};
use crate::record::Record;
use crate::var_ref::{VarFlags, VarKind, VarRef};

/// Maximum number of records (containers and their names) examined by one
/// cycle check.
pub(crate) const CYCLE_BUDGET: usize = 256;

/// Fixed pool of value records.
pub(crate) struct Slots {
    records: Box<[Record]>,
    free_head: Option<VarRef>,
    used: usize,
    /// Sticky fault raised by operations that cannot return an error.
    fault: Option<ArenaError>,
    /// Records awaiting teardown, linked through `next_sibling`.
    pending_free: Option<VarRef>,
    draining: bool,
    /// Reused buffer for cycle checks.
    scratch: Vec<VarRef>,
}

impl Slots {
    /// Create a pool of `capacity` records, all on the free list.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, crate::MAX_CAPACITY);
        let mut records = vec![Record::FREE; capacity].into_boxed_slice();
        for (i, rec) in records.iter_mut().enumerate() {
            rec.next_sibling = if i + 1 < capacity {
                VarRef::from_index(i + 1)
            } else {
                None
            };
        }
        Slots {
            records,
            free_head: VarRef::from_index(0),
            used: 0,
            fault: None,
            pending_free: None,
            draining: false,
            scratch: Vec::with_capacity(CYCLE_BUDGET),
        }
    }

    #[inline]
    pub(crate) fn rec(&self, r: VarRef) -> &Record {
        &self.records[r.index()]
    }

    #[inline]
    pub(crate) fn rec_mut(&mut self, r: VarRef) -> &mut Record {
        &mut self.records[r.index()]
    }

    pub(crate) fn capacity(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn free_count(&self) -> usize {
        self.records.len() - self.used
    }

    /// Record a fault for operations that have no error channel.
    pub(crate) fn raise(&mut self, err: ArenaError) {
        debug!(%err, "arena fault");
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }

    pub(crate) fn take_fault(&mut self) -> Option<ArenaError> {
        self.fault.take()
    }

    pub(crate) fn fault(&self) -> Option<ArenaError> {
        self.fault
    }

    /// Pop a record off the free list. The record comes back locked once.
    pub(crate) fn alloc(&mut self, kind: VarKind) -> ArenaResult<VarRef> {
        let Some(r) = self.free_head else {
            debug!(capacity = self.capacity(), "arena exhausted");
            return Err(ArenaError::OutOfMemory {
                capacity: self.capacity(),
            });
        };
        self.free_head = self.rec(r).next_sibling;
        let rec = self.rec_mut(r);
        *rec = Record::new(kind);
        rec.locks = 1;
        self.used += 1;
        Ok(r)
    }

    /// Allocate a string extension chunk. Chunks are owned by their chain and
    /// never locked.
    pub(crate) fn alloc_chunk(&mut self) -> ArenaResult<VarRef> {
        let r = self.alloc(VarKind::StringExt)?;
        self.rec_mut(r).locks = 0;
        Ok(r)
    }

    /// Return a record to the free list without looking at what it owns.
    fn release_slot(&mut self, r: VarRef) {
        let free_head = self.free_head;
        let rec = self.rec_mut(r);
        *rec = Record::FREE;
        rec.next_sibling = free_head;
        self.free_head = Some(r);
        self.used -= 1;
    }

    // Locks

    pub(crate) fn lock(&mut self, r: VarRef) {
        let rec = self.rec_mut(r);
        if rec.locks == u16::MAX {
            return;
        }
        rec.locks += 1;
        if rec.locks == u16::MAX {
            self.raise(ArenaError::LockOverflow);
        }
    }

    pub(crate) fn unlock(&mut self, r: VarRef) {
        let rec = self.rec_mut(r);
        if rec.locks == u16::MAX || rec.locks == 0 {
            return;
        }
        rec.locks -= 1;
        if rec.locks != 0 || rec.flags.contains(VarFlags::FREEING) {
            return;
        }
        if rec.refs == 0 {
            self.schedule_free(r);
        } else if rec.kind.is_container() && rec.kind != VarKind::Root {
            self.collect_if_cyclic(r);
        }
    }

    // References

    pub(crate) fn add_ref(&mut self, r: VarRef) {
        let rec = self.rec_mut(r);
        if rec.refs == u16::MAX {
            return;
        }
        rec.refs += 1;
        if rec.refs == u16::MAX {
            self.raise(ArenaError::RefOverflow);
        }
    }

    pub(crate) fn unref(&mut self, r: VarRef) {
        let rec = self.rec_mut(r);
        if rec.flags.contains(VarFlags::FREEING) || rec.refs == u16::MAX || rec.refs == 0 {
            return;
        }
        rec.refs -= 1;
        let (refs, locks, kind) = (rec.refs, rec.locks, rec.kind);
        if refs == 0 {
            if locks == 0 {
                self.schedule_free(r);
            }
        } else if locks == 0 && kind.is_container() && kind != VarKind::Root {
            self.collect_if_cyclic(r);
        }
    }

    // Teardown

    /// Queue `r` for teardown and drain the queue unless a drain is already
    /// running further up the stack.
    fn schedule_free(&mut self, r: VarRef) {
        let pending = self.pending_free;
        let rec = self.rec_mut(r);
        rec.flags.insert(VarFlags::FREEING);
        rec.prev_sibling = None;
        rec.next_sibling = pending;
        self.pending_free = Some(r);
        if !self.draining {
            self.drain();
        }
    }

    fn drain(&mut self) {
        self.draining = true;
        while let Some(r) = self.pending_free {
            self.pending_free = self.rec(r).next_sibling;
            self.teardown(r);
        }
        self.draining = false;
    }

    fn teardown(&mut self, r: VarRef) {
        let rec = *self.rec(r);

        // String heads (including string-keyed names) own their chunk chain.
        if rec.kind == VarKind::String {
            let mut chunk = rec.last_child;
            while let Some(c) = chunk {
                chunk = self.rec(c).last_child;
                self.release_slot(c);
            }
        }

        if rec.is_name() {
            if let Some(value) = rec.first_child {
                self.rec_mut(r).first_child = None;
                self.unref(value);
            }
        } else if rec.kind.is_container() {
            let mut child = rec.first_child;
            let head = self.rec_mut(r);
            head.first_child = None;
            head.last_child = None;
            while let Some(name) = child {
                let n = self.rec_mut(name);
                child = n.next_sibling;
                n.next_sibling = None;
                n.prev_sibling = None;
                self.unref(name);
            }
        }

        self.release_slot(r);
    }

    // Cycle heuristic

    /// Free `target` if it and everything reachable from it (within
    /// [`CYCLE_BUDGET`]) are referenced only from inside that set.
    fn collect_if_cyclic(&mut self, target: VarRef) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let closed = self.gather_closed(target, &mut scratch) && self.all_refs_internal(&scratch);
        for &c in &scratch {
            self.rec_mut(c).flags.remove(VarFlags::RECURSING);
        }
        let visited = scratch.len();
        self.scratch = scratch;
        if closed {
            debug!(?target, visited, "freeing unreachable cycle");
            self.schedule_free(target);
        }
    }

    /// Breadth-first gather of the containers reachable from `target`.
    /// Returns `false` as soon as something pinned is found or the walk
    /// examines more than [`CYCLE_BUDGET`] records.
    fn gather_closed(&mut self, target: VarRef, scratch: &mut Vec<VarRef>) -> bool {
        self.rec_mut(target).flags.insert(VarFlags::RECURSING);
        scratch.push(target);
        let mut examined = 0;
        let mut i = 0;
        while i < scratch.len() {
            let container = scratch[i];
            i += 1;
            examined += 1;
            let c = self.rec(container);
            if c.locks != 0 || c.refs == u16::MAX {
                return false;
            }
            let mut child = c.first_child;
            while let Some(name) = child {
                examined += 1;
                if examined > CYCLE_BUDGET {
                    return false;
                }
                let n = *self.rec(name);
                if n.locks != 0 || n.refs != 1 {
                    return false;
                }
                child = n.next_sibling;
                let Some(value) = n.first_child else {
                    continue;
                };
                let v = self.rec(value);
                if !v.kind.is_container() || v.flags.intersects(VarFlags::RECURSING | VarFlags::FREEING)
                {
                    continue;
                }
                if v.kind == VarKind::Root {
                    return false;
                }
                self.rec_mut(value).flags.insert(VarFlags::RECURSING);
                scratch.push(value);
            }
        }
        true
    }

    /// Trial deletion: subtract every edge internal to `set`, check that no
    /// references remain, then restore the counts.
    fn all_refs_internal(&mut self, set: &[VarRef]) -> bool {
        self.adjust_internal_refs(set, false);
        let closed = set.iter().all(|&c| self.rec(c).refs == 0);
        self.adjust_internal_refs(set, true);
        closed
    }

    fn adjust_internal_refs(&mut self, set: &[VarRef], restore: bool) {
        for &container in set {
            let mut child = self.rec(container).first_child;
            while let Some(name) = child {
                let n = *self.rec(name);
                child = n.next_sibling;
                let Some(value) = n.first_child else {
                    continue;
                };
                let v = self.rec_mut(value);
                if v.flags.contains(VarFlags::RECURSING) {
                    v.refs = if restore {
                        v.refs.wrapping_add(1)
                    } else {
                        v.refs.wrapping_sub(1)
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
