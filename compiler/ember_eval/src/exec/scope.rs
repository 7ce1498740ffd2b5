//! Name resolution, declarations and member lookup.
//!
//! Variables are found by walking the scope chain innermost first, then the
//! root, then the native registry. Member reads fall back from own members
//! to the prototype chain to native methods of the value's class.

use ember_arena::{Var, VarKind};

use super::{hidden, Exec, Key, Operand, ScopeChain, TYPE_ERROR};
use crate::errors::EvalResult;
use crate::native::GLOBAL_OWNER;

/// Longest `scope` link chain followed when entering a function.
const MAX_SCOPE_CHAIN: usize = 64;

/// Longest prototype chain followed by a member read.
const MAX_PROTO_DEPTH: usize = 16;

impl<'a> Exec<'a> {
    /// Find the variable `key`.
    pub(crate) fn resolve(&mut self, key: &str) -> EvalResult<Operand<'a>> {
        if !self.executing() {
            return Ok(Operand::undefined());
        }
        let arena = self.arena;
        for scope in self.scopes.iter().rev() {
            if let Some(name) = arena.find_child(scope, key) {
                return Ok(Operand::Name { name, parent: None });
            }
        }
        if let Some(name) = arena.find_child(&self.root, key) {
            return Ok(Operand::Name { name, parent: None });
        }
        if let Some(native) = self.native(GLOBAL_OWNER, key)? {
            return Ok(Operand::Value(Some(native)));
        }
        if self.rt.natives().has_owner(key) {
            let namespace = arena.new_object()?;
            let class = arena.new_string(key)?;
            arena.set_hidden(&namespace, hidden::CLASS, Some(&class))?;
            return Ok(Operand::Value(Some(namespace)));
        }
        Ok(Operand::Unresolved(key.to_owned()))
    }

    /// Materialize the native function `owner.name`, if registered.
    fn native(&self, owner: &str, name: &str) -> EvalResult<Option<Var<'a>>> {
        let natives = self.rt.natives();
        let Some(id) = natives.lookup(owner, name) else {
            return Ok(None);
        };
        let Some(entry) = natives.get(id) else {
            return Ok(None);
        };
        Ok(Some(self.arena.new_native(id, entry.spec)?))
    }

    /// The scope that receives `var` declarations.
    fn declaration_scope(&self) -> Var<'a> {
        self.var_scope
            .and_then(|i| self.scopes.get(i))
            .unwrap_or(&self.root)
            .clone()
    }

    /// Declare `key` in the current function scope. Without an initializer
    /// an existing variable keeps its value.
    pub(crate) fn declare(&mut self, key: &str, init: Option<Option<Var<'a>>>) -> EvalResult<()> {
        if !self.executing() {
            return Ok(());
        }
        let arena = self.arena;
        let scope = self.declaration_scope();
        match (arena.find_child(&scope, key), init) {
            (Some(_), None) => {}
            (Some(name), Some(value)) => arena.set_name_value(&name, value.as_ref())?,
            (None, init) => {
                arena.set_child(&scope, key, init.flatten().as_ref())?;
            }
        }
        Ok(())
    }

    /// New empty scope record linked to the innermost scope.
    pub(crate) fn new_scope(&self) -> EvalResult<Var<'a>> {
        let scope = self.arena.new_object()?;
        if let Some(outer) = self.scopes.last() {
            self.arena.set_hidden(&scope, hidden::SCOPE, Some(outer))?;
        }
        Ok(scope)
    }

    /// The chain ending in `innermost`, rebuilt from its `scope` links.
    pub(crate) fn scope_chain(&self, innermost: Var<'a>) -> ScopeChain<'a> {
        let mut chain = ScopeChain::new();
        let mut next = Some(innermost);
        while let Some(scope) = next {
            if chain.len() >= MAX_SCOPE_CHAIN {
                break;
            }
            next = self.arena.get_hidden(&scope, hidden::SCOPE);
            chain.push(scope);
        }
        chain.reverse();
        chain
    }

    /// Owner name under which the native methods of `value` are registered.
    pub(crate) fn class_of(&self, value: &Var<'a>) -> String {
        match value.kind() {
            VarKind::String => "String".to_owned(),
            VarKind::Array => "Array".to_owned(),
            VarKind::Int | VarKind::Float => "Number".to_owned(),
            VarKind::Bool => "Boolean".to_owned(),
            kind if kind.is_function() => "Function".to_owned(),
            _ => self
                .arena
                .get_hidden(value, hidden::CLASS)
                .map_or_else(|| "Object".to_owned(), |c| self.arena.to_display_string(Some(&c))),
        }
    }

    fn find_member(&self, parent: &Var<'a>, key: &Key) -> Option<Var<'a>> {
        match key {
            Key::Index(i) => self.arena.find_child_int(parent, *i),
            Key::Text(text) => self.arena.find_child(parent, text),
        }
    }

    /// Whether `object` or an object on its prototype chain has `key`.
    pub(crate) fn has_property(&self, object: &Var<'a>, key: &Key) -> bool {
        let mut next = Some(object.clone());
        let mut hops = 0;
        while let Some(o) = next {
            if self.find_member(&o, key).is_some() {
                return true;
            }
            if hops >= MAX_PROTO_DEPTH {
                break;
            }
            next = self.arena.get_hidden(&o, hidden::PROTO);
            hops += 1;
        }
        false
    }

    /// Look up `parent[key]`.
    pub(crate) fn member(&mut self, parent: Option<Var<'a>>, key: Key) -> EvalResult<Operand<'a>> {
        if !self.executing() {
            return Ok(Operand::undefined());
        }
        let arena = self.arena;
        let parent = match parent {
            Some(p) if p.kind() != VarKind::Null => p,
            other => {
                let what = if other.is_some() { "null" } else { "undefined" };
                self.throw_error(
                    TYPE_ERROR,
                    &format!("cannot read property '{key}' of {what}"),
                )?;
                return Ok(Operand::undefined());
            }
        };
        let kind = parent.kind();

        if kind == VarKind::String {
            match &key {
                Key::Index(i) => {
                    let c = usize::try_from(*i)
                        .ok()
                        .and_then(|i| arena.char_at(&parent, i));
                    return Ok(Operand::Value(match c {
                        Some(c) => Some(arena.new_string_bytes(&[c])?),
                        None => None,
                    }));
                }
                Key::Text(t) if t == "length" => {
                    let len = i32::try_from(arena.string_len(&parent)).unwrap_or(i32::MAX);
                    return Ok(Operand::Value(Some(arena.new_int(len)?)));
                }
                Key::Text(_) => {}
            }
        }

        if kind.is_container() {
            if let Some(name) = self.find_member(&parent, &key) {
                return Ok(Operand::Name {
                    name,
                    parent: Some(parent),
                });
            }
            if kind == VarKind::Array && key.is("length") {
                return Ok(Operand::ArrayLength(parent));
            }
            if kind.is_function() && key.is("prototype") {
                let prototype = arena.new_object()?;
                let name = arena.set_child(&parent, "prototype", Some(&prototype))?;
                return Ok(Operand::Name {
                    name,
                    parent: Some(parent),
                });
            }
            let mut proto = arena.get_hidden(&parent, hidden::PROTO);
            let mut hops = 0;
            while let Some(p) = proto {
                if hops >= MAX_PROTO_DEPTH {
                    break;
                }
                if let Some(name) = self.find_member(&p, &key) {
                    return Ok(Operand::Inherited {
                        value: arena.name_value(&name),
                        parent,
                        key,
                    });
                }
                proto = arena.get_hidden(&p, hidden::PROTO);
                hops += 1;
            }
        }

        if let Key::Text(name) = &key {
            if let Some(method) = self.native(&self.class_of(&parent), name)? {
                return Ok(Operand::Inherited {
                    value: Some(method),
                    parent,
                    key,
                });
            }
        }

        if kind.is_container() {
            Ok(Operand::NewMember { parent, key })
        } else {
            Ok(Operand::Inherited {
                value: None,
                parent,
                key,
            })
        }
    }

    /// The key a computed member expression `[value]` names.
    pub(crate) fn key_of(&self, value: Option<&Var<'a>>) -> Key {
        let arena = self.arena;
        match value {
            Some(v) if v.kind() == VarKind::Int && arena.as_int(v) >= 0 => {
                Key::Index(arena.as_int(v))
            }
            Some(v) if v.kind() == VarKind::Float => {
                let f = arena.as_float(v);
                if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(i32::MAX) {
                    Key::Index(f as i32)
                } else {
                    Key::Text(arena.to_display_string(Some(v)))
                }
            }
            Some(v) if v.kind() == VarKind::String => {
                Key::from_text(&arena.string_to_string(v))
            }
            other => Key::Text(arena.to_display_string(other)),
        }
    }
}
