//! What an expression evaluates to before it is read or assigned.

use ember_arena::{Var, VarKind};

use super::{Exec, RANGE_ERROR, REFERENCE_ERROR};
use crate::errors::EvalResult;

/// A member key: array-like index or text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Key {
    Index(i32),
    Text(String),
}

impl Key {
    /// Canonical non-negative integers (`"0"`, `"12"`, not `"012"`) are
    /// indices, everything else is text.
    pub(crate) fn from_text(text: &str) -> Key {
        let canonical = !text.is_empty()
            && text.bytes().all(|b| b.is_ascii_digit())
            && (text == "0" || !text.starts_with('0'));
        match text.parse::<i32>() {
            Ok(i) if canonical => Key::Index(i),
            _ => Key::Text(text.to_owned()),
        }
    }

    pub(crate) fn is(&self, text: &str) -> bool {
        matches!(self, Key::Text(t) if t == text)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Text(t) => f.write_str(t),
        }
    }
}

/// Result of evaluating an expression: a value, or a reference that can
/// also be assigned.
#[derive(Clone, Debug)]
pub(crate) enum Operand<'a> {
    /// A plain value. `None` is `undefined`.
    Value(Option<Var<'a>>),
    /// An existing name. Variables have no parent; members do.
    Name {
        name: Var<'a>,
        parent: Option<Var<'a>>,
    },
    /// Found on the prototype chain or among native methods; assignment
    /// creates an own member.
    Inherited {
        value: Option<Var<'a>>,
        parent: Var<'a>,
        key: Key,
    },
    /// Missing member of a container.
    NewMember { parent: Var<'a>, key: Key },
    /// `length` of an array.
    ArrayLength(Var<'a>),
    /// Variable found nowhere.
    Unresolved(String),
}

impl<'a> Operand<'a> {
    pub(crate) fn undefined() -> Self {
        Operand::Value(None)
    }

    /// The object a member was looked up on: the receiver of a method call.
    pub(crate) fn parent(&self) -> Option<Var<'a>> {
        match self {
            Operand::Name { parent, .. } => parent.clone(),
            Operand::Inherited { parent, .. } | Operand::NewMember { parent, .. } => {
                Some(parent.clone())
            }
            Operand::ArrayLength(array) => Some(array.clone()),
            Operand::Value(_) | Operand::Unresolved(_) => None,
        }
    }
}

impl<'a> Exec<'a> {
    /// Read an operand. An unresolved variable throws `ReferenceError`.
    pub(crate) fn value_of(&mut self, operand: Operand<'a>) -> EvalResult<Option<Var<'a>>> {
        if !self.executing() {
            return Ok(None);
        }
        Ok(match operand {
            Operand::Value(value) | Operand::Inherited { value, .. } => value,
            Operand::Name { name, .. } => self.arena.name_value(&name),
            Operand::NewMember { .. } => None,
            Operand::ArrayLength(array) => {
                Some(self.arena.new_int(self.arena.array_len(&array))?)
            }
            Operand::Unresolved(key) => {
                self.throw_error(REFERENCE_ERROR, &format!("{key} is not defined"))?;
                None
            }
        })
    }

    /// Store `value` through an operand.
    pub(crate) fn assign(&mut self, target: &Operand<'a>, value: Option<&Var<'a>>) -> EvalResult<()> {
        if !self.executing() {
            return Ok(());
        }
        let arena = self.arena;
        match target {
            Operand::Name { name, .. } => arena.set_name_value(name, value)?,
            Operand::Inherited { parent, key, .. } | Operand::NewMember { parent, key } => {
                self.set_member(parent, key, value)?;
            }
            Operand::ArrayLength(array) => {
                let len = value.map_or(f64::NAN, |v| arena.as_float(v));
                if len >= 0.0 && len.fract() == 0.0 && len <= f64::from(i32::MAX) {
                    arena.set_array_len(array, len as i32);
                } else {
                    self.throw_error(RANGE_ERROR, "invalid array length")?;
                }
            }
            Operand::Unresolved(key) => {
                let root = self.root.clone();
                self.set_member(&root, &Key::from_text(key), value)?;
            }
            Operand::Value(_) => {
                self.throw_error(REFERENCE_ERROR, "invalid assignment target")?;
            }
        }
        Ok(())
    }

    /// Create or overwrite an own member. Non-containers ignore the write.
    pub(crate) fn set_member(
        &mut self,
        parent: &Var<'a>,
        key: &Key,
        value: Option<&Var<'a>>,
    ) -> EvalResult<()> {
        let arena = self.arena;
        if !parent.kind().is_container() {
            return Ok(());
        }
        match key {
            Key::Index(i) => arena.array_set(parent, *i, value)?,
            Key::Text(text) if parent.kind() == VarKind::Array && text == "length" => {
                let target = Operand::ArrayLength(parent.clone());
                self.assign(&target, value)?;
            }
            Key::Text(text) => {
                arena.set_child(parent, text, value)?;
            }
        }
        Ok(())
    }
}
