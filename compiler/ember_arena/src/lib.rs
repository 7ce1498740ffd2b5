//! Ember Arena - the value store of the Ember script runtime.
//!
//! Every runtime value (numbers, strings, object members, arrays, functions,
//! the global root) lives in one fixed-size pool of value records. There is
//! no other allocator: when the pool is full, allocation fails with
//! [`ArenaError::OutOfMemory`] and the caller abandons the operation.
//!
//! # Ownership
//!
//! Two counts keep a record alive:
//! - the **lock count**, held by [`Var`] guards for as long as code works
//!   with the record;
//! - the **reference count**, held by the structures that own it (a name
//!   owning its value, a container owning its names).
//!
//! A record is freed when both reach zero. Freeing releases what the record
//! owns, which may cascade. Cycles are reclaimed by a bounded heuristic
//! (see the `slots` module); larger unreachable cycles leak.
//!
//! # Layout
//!
//! - Strings keep [`STRING_CHARS`] bytes inline and continue into chained
//!   extension records of [`STRING_EXT_CHARS`] bytes.
//! - Objects, arrays and functions hold an insertion-ordered list of *names*.
//!   A name is a string (or, for array indices, integer) record flagged
//!   [`VarFlags::NAME`] whose first child is its value.

mod arena;
mod children;
mod convert;
mod copy;
mod errors;
mod native;
mod record;
mod slots;
mod strings;
mod var_ref;

pub use arena::{Arena, ArenaConfig, ArenaStats, Children, Var};
pub use convert::{float_to_int32, format_number, parse_number};
pub use errors::{ArenaError, ArenaResult};
pub use native::{ArgSpec, ArgType, NativeId};
pub use strings::StrCursor;
pub use var_ref::{VarFlags, VarKind, VarRef};

/// Bytes stored inline in a string head record.
pub const STRING_CHARS: usize = 8;

/// Bytes stored in each string extension record.
pub const STRING_EXT_CHARS: usize = 12;

/// Largest supported arena: record references are 16 bits wide.
pub const MAX_CAPACITY: usize = u16::MAX as usize;
