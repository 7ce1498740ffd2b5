//! Host-implemented functions.
//!
//! A [`NativeRegistry`] is the read-only symbol table the evaluator falls
//! back to when scope lookup fails. Entries are keyed by owner and member
//! name: owner [`GLOBAL_OWNER`] holds free functions, any other owner is a
//! class (`String`, `Array`, ...) or a namespace object (`Math`). Nothing is
//! placed in the arena until a script actually touches an entry, at which
//! point a native function record carrying the entry's id is created.

mod call;

use std::fmt;

use ember_arena::{Arena, ArenaResult, ArgSpec, NativeId, Var};

use crate::errors::EvalResult;

pub use call::NativeCall;

/// Owner of free functions such as `print`.
pub const GLOBAL_OWNER: &str = "global";

/// Signature of a host function.
pub type NativeFn = for<'a, 'e> fn(&mut NativeCall<'a, 'e>) -> EvalResult<NativeValue<'a>>;

/// A value crossing the native boundary, already converted to the type the
/// function's [`ArgSpec`] names.
#[derive(Clone, Debug, Default)]
pub enum NativeValue<'a> {
    #[default]
    Undefined,
    Var(Var<'a>),
    Bool(bool),
    Int(i32),
    Float(f64),
    /// Pin or handle number.
    Pin(i32),
    /// Remaining arguments collected into an array.
    Array(Var<'a>),
}

impl<'a> NativeValue<'a> {
    pub fn from_var(value: Option<Var<'a>>) -> Self {
        value.map_or(NativeValue::Undefined, NativeValue::Var)
    }

    /// The record behind a `Var` or `Array` value.
    pub fn as_var(&self) -> Option<&Var<'a>> {
        match self {
            NativeValue::Var(v) | NativeValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to a script value, allocating a record for scalars.
    pub fn into_var(self, arena: &'a Arena) -> ArenaResult<Option<Var<'a>>> {
        Ok(match self {
            NativeValue::Undefined => None,
            NativeValue::Var(v) | NativeValue::Array(v) => Some(v),
            NativeValue::Bool(b) => Some(arena.new_bool(b)?),
            NativeValue::Int(i) | NativeValue::Pin(i) => Some(arena.new_int(i)?),
            NativeValue::Float(f) => Some(arena.new_float(f)?),
        })
    }

    pub fn to_bool(&self, arena: &Arena) -> bool {
        match self {
            NativeValue::Undefined => false,
            NativeValue::Var(v) | NativeValue::Array(v) => arena.as_bool(v),
            NativeValue::Bool(b) => *b,
            NativeValue::Int(i) | NativeValue::Pin(i) => *i != 0,
            NativeValue::Float(f) => *f != 0.0 && !f.is_nan(),
        }
    }

    pub fn to_int(&self, arena: &Arena) -> i32 {
        match self {
            NativeValue::Undefined => 0,
            NativeValue::Var(v) | NativeValue::Array(v) => arena.as_int(v),
            NativeValue::Bool(b) => i32::from(*b),
            NativeValue::Int(i) | NativeValue::Pin(i) => *i,
            NativeValue::Float(f) => ember_arena::float_to_int32(*f),
        }
    }

    pub fn to_float(&self, arena: &Arena) -> f64 {
        match self {
            NativeValue::Undefined => f64::NAN,
            NativeValue::Var(v) | NativeValue::Array(v) => arena.as_float(v),
            NativeValue::Bool(b) => f64::from(u8::from(*b)),
            NativeValue::Int(i) | NativeValue::Pin(i) => f64::from(*i),
            NativeValue::Float(f) => *f,
        }
    }
}

/// A registered host function.
#[derive(Clone)]
pub struct NativeEntry {
    pub owner: String,
    pub name: String,
    pub spec: ArgSpec,
    pub func: NativeFn,
}

impl fmt::Debug for NativeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEntry")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Sorted symbol table of host functions.
///
/// Ids are positions in registration order and stay valid for the life of
/// the registry; the sorted index is what lookups search.
#[derive(Clone, Debug, Default)]
pub struct NativeRegistry {
    entries: Vec<NativeEntry>,
    index: Vec<NativeId>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `owner.name`, replacing an existing entry of that name.
    ///
    /// Returns `None` once the id space is exhausted.
    pub fn register(
        &mut self,
        owner: &str,
        name: &str,
        spec: ArgSpec,
        func: NativeFn,
    ) -> Option<NativeId> {
        let entry = NativeEntry {
            owner: owner.to_owned(),
            name: name.to_owned(),
            spec,
            func,
        };
        match self.search(owner, name) {
            Ok(pos) => {
                let id = self.index[pos];
                self.entries[usize::from(id.0)] = entry;
                Some(id)
            }
            Err(pos) => {
                let id = NativeId(u16::try_from(self.entries.len()).ok()?);
                self.entries.push(entry);
                self.index.insert(pos, id);
                Some(id)
            }
        }
    }

    fn search(&self, owner: &str, name: &str) -> Result<usize, usize> {
        self.index.binary_search_by(|id| {
            let e = &self.entries[usize::from(id.0)];
            (e.owner.as_str(), e.name.as_str()).cmp(&(owner, name))
        })
    }

    pub fn lookup(&self, owner: &str, name: &str) -> Option<NativeId> {
        self.search(owner, name).ok().map(|pos| self.index[pos])
    }

    pub fn get(&self, id: NativeId) -> Option<&NativeEntry> {
        self.entries.get(usize::from(id.0))
    }

    /// Whether any entry belongs to `owner`.
    pub fn has_owner(&self, owner: &str) -> bool {
        let pos = self
            .index
            .partition_point(|id| self.entries[usize::from(id.0)].owner.as_str() < owner);
        self.index
            .get(pos)
            .is_some_and(|id| self.entries[usize::from(id.0)].owner == owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests;
