//! Record handles, type tags and flag bits.

use std::fmt;
use std::num::NonZeroU16;

use bitflags::bitflags;

/// Raw, unpinned reference to a value record.
///
/// A `VarRef` is a plain index: holding one does not keep the record alive.
/// Linkage fields store `VarRef`s; code that needs to read a record across
/// other arena operations must hold a [`crate::Var`] lock instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarRef(NonZeroU16);

impl VarRef {
    /// Build a reference from a zero-based slot index.
    #[inline]
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index + 1).ok().and_then(NonZeroU16::new).map(VarRef)
    }

    /// Zero-based slot index.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0.get()) - 1
    }

    /// Raw one-based identifier, stable for the life of the record.
    #[inline]
    pub fn raw(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Debug for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The type tag of a value record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// Record sits on the free list.
    Free,
    /// The `null` value.
    Null,
    /// 32-bit integer (also used for integer name keys).
    Int,
    /// Boolean.
    Bool,
    /// 64-bit float.
    Float,
    /// Head of a string; continues into `StringExt` chunks.
    String,
    /// String continuation chunk. Only reachable from its string head.
    StringExt,
    /// Plain object.
    Object,
    /// Array (children are names with integer keys).
    Array,
    /// Script function with a block body.
    Function,
    /// Arrow function whose body is a single returned expression.
    FunctionReturn,
    /// Host-implemented function.
    NativeFunction,
    /// Global root object.
    Root,
}

impl VarKind {
    /// Kinds that carry a child list of names.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            VarKind::Object
                | VarKind::Array
                | VarKind::Function
                | VarKind::FunctionReturn
                | VarKind::NativeFunction
                | VarKind::Root
        )
    }

    /// Kinds that can be called.
    #[inline]
    pub fn is_function(self) -> bool {
        matches!(
            self,
            VarKind::Function | VarKind::FunctionReturn | VarKind::NativeFunction
        )
    }

    /// Kinds that hold character data.
    #[inline]
    pub fn is_string(self) -> bool {
        matches!(self, VarKind::String)
    }

    /// Numeric kinds.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, VarKind::Int | VarKind::Float | VarKind::Bool)
    }

    /// Character capacity of a record of this kind.
    #[inline]
    pub(crate) fn char_capacity(self) -> usize {
        match self {
            VarKind::String => crate::STRING_CHARS,
            VarKind::StringExt => crate::STRING_EXT_CHARS,
            _ => 0,
        }
    }
}

bitflags! {
    /// Per-record flag bits layered over the [`VarKind`] tag.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct VarFlags: u8 {
        /// Record is a name: it owns its value through `first_child`
        /// and is owned by its container's child list.
        const NAME = 1 << 0;
        /// Internal name, never visible to scripts or enumeration.
        const HIDDEN = 1 << 1;
        /// Declared function parameter.
        const PARAM = 1 << 2;
        /// Traversal mark used by cycle detection and copying.
        const RECURSING = 1 << 3;
        /// Record is being torn down; further unrefs are ignored.
        const FREEING = 1 << 4;
        /// Reserved: read-only name.
        const CONST = 1 << 5;
    }
}
