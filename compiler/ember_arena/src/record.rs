//! The value record: the single storage unit for every runtime value.

use crate::native::{ArgSpec, NativeId};
use crate::var_ref::{VarFlags, VarKind, VarRef};
use crate::STRING_EXT_CHARS;

/// Inline character storage. String heads use the first
/// [`crate::STRING_CHARS`] bytes; extension chunks use all of it, standing in
/// for the linkage fields a chunk never needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Chars {
    pub(crate) len: u8,
    pub(crate) buf: [u8; STRING_EXT_CHARS],
}

impl Chars {
    pub(crate) const EMPTY: Chars = Chars {
        len: 0,
        buf: [0; STRING_EXT_CHARS],
    };

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..usize::from(self.len)]
    }
}

/// Native function payload: registry id plus marshalling descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NativeSlot {
    pub(crate) id: NativeId,
    pub(crate) spec: ArgSpec,
}

/// Record payload, interpreted according to the kind tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Payload {
    None,
    /// Integer value, integer name key, or array length.
    Int(i32),
    Bool(bool),
    Float(f64),
    Chars(Chars),
    Native(NativeSlot),
}

/// A value record.
///
/// Linkage:
/// - names: `first_child` is the owned value, siblings link the container list;
/// - strings: `last_child` continues into the next extension chunk;
/// - containers: `first_child`/`last_child` bound the list of child names;
/// - free records: `next_sibling` links the free list.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Record {
    pub(crate) kind: VarKind,
    pub(crate) flags: VarFlags,
    pub(crate) locks: u16,
    pub(crate) refs: u16,
    pub(crate) payload: Payload,
    pub(crate) first_child: Option<VarRef>,
    pub(crate) last_child: Option<VarRef>,
    pub(crate) next_sibling: Option<VarRef>,
    pub(crate) prev_sibling: Option<VarRef>,
}

impl Record {
    pub(crate) const FREE: Record = Record {
        kind: VarKind::Free,
        flags: VarFlags::empty(),
        locks: 0,
        refs: 0,
        payload: Payload::None,
        first_child: None,
        last_child: None,
        next_sibling: None,
        prev_sibling: None,
    };

    /// Fresh record of `kind` with the default payload for that kind.
    pub(crate) fn new(kind: VarKind) -> Record {
        let payload = match kind {
            VarKind::Int | VarKind::Array => Payload::Int(0),
            VarKind::Bool => Payload::Bool(false),
            VarKind::Float => Payload::Float(0.0),
            VarKind::String | VarKind::StringExt => Payload::Chars(Chars::EMPTY),
            _ => Payload::None,
        };
        Record {
            kind,
            payload,
            ..Record::FREE
        }
    }

    #[inline]
    pub(crate) fn is_name(&self) -> bool {
        self.flags.contains(VarFlags::NAME)
    }

    #[inline]
    pub(crate) fn chars(&self) -> Option<&Chars> {
        match &self.payload {
            Payload::Chars(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn chars_mut(&mut self) -> Option<&mut Chars> {
        match &mut self.payload {
            Payload::Chars(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn int(&self) -> i32 {
        match self.payload {
            Payload::Int(i) => i,
            _ => 0,
        }
    }
}
