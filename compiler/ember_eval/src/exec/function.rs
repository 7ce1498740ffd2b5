//! Function literals, the call protocol and `new`.
//!
//! A function record keeps a copy of its body source in the hidden `code`
//! member. Calling it lexes that copy from the start in a fresh frame whose
//! scope chain is rebuilt from the captured `scope` link.

use ember_arena::{Arena, ArgType, Var, VarFlags, VarKind};
use ember_lexer::{Lexer, TokenKind};
use smallvec::SmallVec;
use tracing::trace;

use super::operators::truthy;
use super::{hidden, Args, Exec, Frame, Key, Operand, TYPE_ERROR};
use crate::errors::EvalResult;
use crate::flags::{Completion, ExecFlags};
use crate::native::{NativeCall, NativeValue};

/// Convert a script value to the host type a descriptor slot names.
fn marshal<'a>(arena: &'a Arena, ty: ArgType, value: Option<Var<'a>>) -> NativeValue<'a> {
    match ty {
        ArgType::Void => NativeValue::Undefined,
        ArgType::Var | ArgType::ArgArray => NativeValue::from_var(value),
        ArgType::Bool => NativeValue::Bool(truthy(arena, value.as_ref())),
        ArgType::Int32 => NativeValue::Int(value.map_or(0, |v| arena.as_int(&v))),
        ArgType::Pin => NativeValue::Pin(value.map_or(-1, |v| arena.as_int(&v))),
        ArgType::Float => NativeValue::Float(value.map_or(f64::NAN, |v| arena.as_float(&v))),
    }
}

impl<'a> Exec<'a> {
    /// `x => body` or `(a, b) => body`. Returns `None`, with the lexer
    /// restored, when the tokens ahead are not an arrow function.
    pub(crate) fn arrow_function(&mut self) -> EvalResult<Option<Operand<'a>>> {
        if !matches!(self.lex.kind(), TokenKind::Ident | TokenKind::LParen) {
            return Ok(None);
        }
        let saved = self.lex.clone();
        let params = if self.lex.is(TokenKind::Ident) {
            let name = self.lex.ident().to_owned();
            self.lex.next_token();
            Some(vec![name])
        } else {
            self.arrow_params()
        };
        let params = match params {
            Some(params) if self.lex.is(TokenKind::Arrow) => params,
            _ => {
                self.lex = saved;
                return Ok(None);
            }
        };
        self.lex.next_token();

        if self.lex.is(TokenKind::LBrace) {
            let (start, end) = self.function_body()?;
            let func = self.make_function(VarKind::Function, None, &params, start, end, true)?;
            return Ok(Some(Operand::Value(func)));
        }
        let start = self.lex.token_start();
        self.with_flags(ExecFlags::IN_FUNCTION, Self::assignment)?;
        let end = self.lex.prev_token_end();
        let func = self.make_function(VarKind::FunctionReturn, None, &params, start, end, true)?;
        Ok(Some(Operand::Value(func)))
    }

    /// `(a, b, c)` as an arrow parameter list, or `None` if it is not one.
    fn arrow_params(&mut self) -> Option<Vec<String>> {
        if !self.lex.eat_token(TokenKind::LParen) {
            return None;
        }
        let mut params = Vec::new();
        while self.lex.is(TokenKind::Ident) {
            params.push(self.lex.ident().to_owned());
            self.lex.next_token();
            if !self.lex.eat_token(TokenKind::Comma) {
                break;
            }
        }
        self.lex.eat_token(TokenKind::RParen).then_some(params)
    }

    /// `function name(params) { body }`. The name is optional in expressions.
    pub(crate) fn function_literal(
        &mut self,
        require_name: bool,
    ) -> EvalResult<(Option<String>, Option<Var<'a>>)> {
        self.expect(TokenKind::Function)?;
        let name = if self.lex.is(TokenKind::Ident) {
            Some(self.ident()?)
        } else if require_name {
            return Err(self.expected("function name"));
        } else {
            None
        };
        let params = self.param_list()?;
        let (start, end) = self.function_body()?;
        let func =
            self.make_function(VarKind::Function, name.as_deref(), &params, start, end, false)?;
        Ok((name, func))
    }

    fn param_list(&mut self) -> EvalResult<Vec<String>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.lex.is(TokenKind::RParen) {
            params.push(self.ident()?);
            if !self.lex.eat_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    /// Parse a `{ ... }` body without effects; returns its source span.
    fn function_body(&mut self) -> EvalResult<(usize, usize)> {
        self.with_flags(ExecFlags::IN_FUNCTION, |e| {
            let start = e.lex.token_start();
            e.block()?;
            Ok((start, e.lex.prev_token_end()))
        })
    }

    fn make_function(
        &mut self,
        kind: VarKind,
        name: Option<&str>,
        params: &[String],
        start: usize,
        end: usize,
        bind_this: bool,
    ) -> EvalResult<Option<Var<'a>>> {
        if !self.executing() {
            return Ok(None);
        }
        let arena = self.arena;
        let func = arena.new_container(kind)?;
        let code = arena.new_string_from_span(self.lex.source(), start, end)?;
        arena.set_hidden(&func, hidden::CODE, Some(&code))?;
        if !params.is_empty() {
            let list = arena.new_array()?;
            for param in params {
                let param = arena.new_string(param)?;
                arena.array_push(&list, Some(&param))?;
            }
            arena.set_hidden(&func, hidden::PARAMS, Some(&list))?;
        }
        if let Some(scope) = self.scopes.last() {
            arena.set_hidden(&func, hidden::SCOPE, Some(scope))?;
        }
        if let Some(name) = name {
            let name = arena.new_string(name)?;
            arena.set_hidden(&func, hidden::NAME, Some(&name))?;
        }
        let (line, column) = self.position(start);
        let line = arena.new_int(i32::try_from(line).unwrap_or(i32::MAX))?;
        arena.set_hidden(&func, hidden::LINE, Some(&line))?;
        let column = arena.new_int(i32::try_from(column).unwrap_or(i32::MAX))?;
        arena.set_hidden(&func, hidden::COLUMN, Some(&column))?;
        if bind_this {
            if let Some(this) = &self.this {
                arena.set_hidden(&func, hidden::THIS, Some(this))?;
            }
        }
        Ok(Some(func))
    }

    /// Bound leading arguments of `func` followed by `args`.
    fn with_bound_args(&self, func: &Var<'a>, args: Args<'a>) -> Args<'a> {
        let arena = self.arena;
        let Some(bound) = arena.get_hidden(func, hidden::ARGS) else {
            return args;
        };
        let mut all: Args<'a> = (0..arena.array_len(&bound))
            .map(|i| arena.array_get(&bound, i))
            .collect();
        all.extend(args);
        all
    }

    /// Call a script or host function. Throws `TypeError` if `func` is not
    /// callable.
    pub(crate) fn call_value(
        &mut self,
        func: Option<Var<'a>>,
        this: Option<Var<'a>>,
        args: Args<'a>,
    ) -> EvalResult<Option<Var<'a>>> {
        let site = self.call_site.take();
        if !self.executing() {
            return Ok(None);
        }
        let Some(func) = func.filter(|f| f.kind().is_function()) else {
            self.throw_error(TYPE_ERROR, "value is not a function")?;
            return Ok(None);
        };
        self.safepoint()?;
        self.depth += 1;
        let result = self.check_stack().and_then(|()| {
            if func.kind() == VarKind::NativeFunction {
                self.call_native(&func, this, args)
            } else {
                self.call_script(&func, this, args, site)
            }
        });
        self.depth -= 1;
        result
    }

    /// Run a script function body in a fresh frame. `site` is the offset of
    /// the caller's `(`, for the trace of an exception leaving the body.
    fn call_script(
        &mut self,
        func: &Var<'a>,
        this: Option<Var<'a>>,
        args: Args<'a>,
        site: Option<usize>,
    ) -> EvalResult<Option<Var<'a>>> {
        let arena = self.arena;
        let Some(code) = arena.get_hidden(func, hidden::CODE) else {
            return Ok(None);
        };

        let activation = arena.new_object()?;
        if let Some(scope) = arena.get_hidden(func, hidden::SCOPE) {
            arena.set_hidden(&activation, hidden::SCOPE, Some(&scope))?;
        }
        let mut values = self.with_bound_args(func, args).into_iter();
        if let Some(params) = arena.get_hidden(func, hidden::PARAMS) {
            for i in 0..arena.array_len(&params) {
                let key = arena
                    .array_get(&params, i)
                    .map(|k| arena.string_to_string(&k))
                    .unwrap_or_default();
                let value = values.next().flatten();
                let param = arena.new_name(&key, value.as_ref(), VarFlags::PARAM)?;
                arena.add_child(&activation, &param)?;
            }
        }
        let this = arena
            .get_hidden(func, hidden::THIS)
            .or(this)
            .or_else(|| Some(self.root.clone()));

        let name = arena
            .get_hidden(func, hidden::NAME)
            .map_or_else(|| "<anonymous>".to_owned(), |n| arena.string_to_string(&n));
        let body_at = |key| {
            arena
                .get_hidden(func, key)
                .and_then(|v| usize::try_from(arena.as_int(&v)).ok())
                .unwrap_or(1)
        };
        let (line, column) = (body_at(hidden::LINE), body_at(hidden::COLUMN));
        trace!(function = %name, ?site, depth = self.depth, "call");

        let scopes = self.scope_chain(activation);
        let frame = Frame {
            lex: Lexer::new(code),
            var_scope: Some(scopes.len() - 1),
            scopes,
            this,
            flags: ExecFlags::EXECUTE | ExecFlags::IN_FUNCTION,
            line_base: line.saturating_sub(1),
            column_base: column.saturating_sub(1),
        };
        let caller = self.swap_frame(frame);
        let body = if func.kind() == VarKind::FunctionReturn {
            self.assignment_value()
        } else {
            self.block().map(|()| None)
        };
        self.swap_frame(caller);
        let value = body?;

        match self.pending.take() {
            Some(Completion::Return(value)) => Ok(value),
            Some(Completion::Throw(thrown)) => {
                let frame = match site.map(|at| self.position(at)) {
                    Some((line, column)) => {
                        format!("in {name} ({}:{line}:{column})", self.source_name)
                    }
                    None => format!("in {name} ({})", self.source_name),
                };
                self.trace.push(frame);
                self.pending = Some(Completion::Throw(thrown));
                Ok(None)
            }
            Some(Completion::Break | Completion::Continue) | None => Ok(value),
        }
    }

    fn call_native(
        &mut self,
        func: &Var<'a>,
        this: Option<Var<'a>>,
        args: Args<'a>,
    ) -> EvalResult<Option<Var<'a>>> {
        let arena = self.arena;
        let Some((id, spec)) = arena.native_slot(func) else {
            return Ok(None);
        };
        let Some(native) = self.rt.natives().get(id).map(|entry| entry.func) else {
            self.throw_error(TYPE_ERROR, "unknown host function")?;
            return Ok(None);
        };
        let this = arena.get_hidden(func, hidden::THIS).or(this);

        let mut values = self.with_bound_args(func, args).into_iter();
        let mut marshalled = SmallVec::new();
        for ty in spec.params() {
            let value = if ty == ArgType::ArgArray {
                let rest = arena.new_array()?;
                for value in values.by_ref() {
                    arena.array_push(&rest, value.as_ref())?;
                }
                NativeValue::Array(rest)
            } else {
                marshal(arena, ty, values.next().flatten())
            };
            marshalled.push(value);
        }
        let this = if spec.takes_this() { this } else { None };

        let result = native(&mut NativeCall::new(self, this, marshalled))?;
        if self.is_throwing() {
            return Ok(None);
        }
        Ok(match (spec.ret(), result) {
            (ArgType::Void, _) => None,
            (ArgType::Float, NativeValue::Float(f)) => Some(arena.new_number(f)?),
            (_, value) => value.into_var(arena)?,
        })
    }

    /// `new func(args)`: a fresh object linked to `func.prototype` is passed
    /// as `this`. A container returned by the call replaces it.
    pub(crate) fn construct(
        &mut self,
        func: Option<Var<'a>>,
        args: Args<'a>,
        site: Option<usize>,
    ) -> EvalResult<Operand<'a>> {
        if !self.executing() {
            return Ok(Operand::undefined());
        }
        let Some(func) = func else {
            return Ok(Operand::undefined());
        };
        let arena = self.arena;
        let object = arena.new_object()?;
        let prototype = self.member(Some(func.clone()), Key::Text("prototype".to_owned()))?;
        if let Some(prototype) = self.value_of(prototype)?.filter(|p| p.kind().is_container()) {
            arena.set_hidden(&object, hidden::PROTO, Some(&prototype))?;
        }
        self.call_site = site;
        let result = self.call_value(Some(func), Some(object.clone()), args)?;
        Ok(Operand::Value(Some(match result {
            Some(r) if r.kind().is_container() => r,
            _ => object,
        })))
    }
}
