//! The fused parser/evaluator.
//!
//! There is no syntax tree. Each grammar production reads tokens straight
//! from the [`Lexer`] and, when [`ExecFlags::EXECUTE`] is set and no abrupt
//! completion is pending, performs its effect on the arena as it goes. An
//! untaken branch is parsed with `EXECUTE` cleared so it is still checked and
//! its tokens consumed. Loops and function bodies run by seeking the lexer
//! back to recorded offsets and parsing the same source again.
//!
//! # Modules
//!
//! - `statement`: statements, blocks, `try`, `switch`
//! - `loops`: `while`, `do`, `for`, `for-in`, `for-of`
//! - `expr`: expressions by precedence
//! - `function`: function literals, the call protocol, `new`
//! - `scope`: name resolution, declarations, member lookup
//! - `operand`: references produced by expressions and assignment to them
//! - `operators`: arithmetic, comparison and conversion rules

mod expr;
mod function;
mod loops;
mod operand;
mod operators;
mod scope;
mod statement;

use ember_arena::{Arena, Var};
use ember_lexer::{Lexer, SyntaxError, TokenKind};
use ember_stack::StackProbe;
use smallvec::SmallVec;
use tracing::debug;

use crate::errors::{EvalError, EvalResult};
use crate::flags::{Completion, ExecFlags};
use crate::runtime::Runtime;

pub(crate) use operand::{Key, Operand};

/// Call arguments. Most calls pass a handful.
pub(crate) type Args<'a> = SmallVec<[Option<Var<'a>>; 4]>;

/// Scope chain, outermost first. The global root is not part of it.
pub(crate) type ScopeChain<'a> = SmallVec<[Var<'a>; 8]>;

/// Names of the hidden members the evaluator keeps on records.
pub(crate) mod hidden {
    /// Function body source.
    pub const CODE: &str = "code";
    /// Function parameter names, as an array of strings.
    pub const PARAMS: &str = "params";
    /// Captured scope of a function; enclosing scope of a scope record.
    pub const SCOPE: &str = "scope";
    pub const NAME: &str = "name";
    /// Line of the function body.
    pub const LINE: &str = "line";
    /// Column of the function body on its first line.
    pub const COLUMN: &str = "column";
    /// Bound receiver.
    pub const THIS: &str = "this";
    /// Bound leading arguments.
    pub const ARGS: &str = "args";
    /// Prototype link of an object created by `new`.
    pub const PROTO: &str = "__proto__";
    /// Owner name of a native namespace object.
    pub const CLASS: &str = "class";
    /// Uncaught exception, on the root.
    pub const EXCEPTION: &str = "exception";
    /// Trace of the uncaught exception, on the root.
    pub const TRACE: &str = "trace";
}

pub(crate) const TYPE_ERROR: &str = "TypeError";
pub(crate) const REFERENCE_ERROR: &str = "ReferenceError";
pub(crate) const RANGE_ERROR: &str = "RangeError";

/// The parts of the execution state that a script call replaces.
struct Frame<'a> {
    lex: Lexer<'a>,
    scopes: ScopeChain<'a>,
    var_scope: Option<usize>,
    this: Option<Var<'a>>,
    flags: ExecFlags,
    line_base: usize,
    column_base: usize,
}

/// Execution context of one top-level evaluation.
pub(crate) struct Exec<'a> {
    pub(crate) rt: &'a Runtime,
    pub(crate) arena: &'a Arena,
    pub(crate) lex: Lexer<'a>,
    source_name: String,
    /// Added to lexer lines; nonzero while running a function body.
    line_base: usize,
    /// Added to lexer columns on the first line of a function body.
    column_base: usize,
    /// Offset of the `(` of the call being made, taken by the callee.
    call_site: Option<usize>,
    flags: ExecFlags,
    pending: Option<Completion<'a>>,
    scopes: ScopeChain<'a>,
    /// Index in `scopes` that receives `var` declarations; `None` means the
    /// root.
    var_scope: Option<usize>,
    root: Var<'a>,
    this: Option<Var<'a>>,
    depth: usize,
    probe: StackProbe,
    /// Host clock reading at which the time budget runs out.
    deadline: Option<u64>,
    /// Frames of the exception in flight, innermost first.
    trace: Vec<String>,
    /// Value of the last top-level expression statement.
    last_value: Option<Var<'a>>,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(rt: &'a Runtime, source: Var<'a>, source_name: &str) -> Self {
        let root = rt.root();
        let config = rt.config();
        let deadline = config
            .time_budget_ms
            .map(|budget| rt.clock().now_ms().saturating_add(budget));
        Exec {
            rt,
            arena: rt.arena(),
            lex: Lexer::new(source),
            source_name: source_name.to_owned(),
            line_base: 0,
            column_base: 0,
            call_site: None,
            flags: ExecFlags::EXECUTE,
            pending: None,
            scopes: SmallVec::new(),
            var_scope: None,
            this: Some(root.clone()),
            root,
            depth: 0,
            probe: StackProbe::new(config.stack_red_zone, config.max_call_depth),
            deadline,
            trace: Vec::new(),
            last_value: None,
        }
    }

    /// Evaluate with `scope` as the only scope, receiving declarations.
    pub(crate) fn enter_scope(&mut self, scope: Var<'a>) {
        self.scopes.push(scope);
        self.var_scope = Some(self.scopes.len() - 1);
    }

    // State

    /// Whether productions should perform their effects.
    #[inline]
    pub(crate) fn executing(&self) -> bool {
        self.flags.contains(ExecFlags::EXECUTE) && self.pending.is_none()
    }

    pub(crate) fn is_throwing(&self) -> bool {
        self.pending.as_ref().is_some_and(Completion::is_throw)
    }

    /// Run `f` under `flags`, restoring the current flags afterwards.
    fn with_flags<T>(
        &mut self,
        flags: ExecFlags,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let saved = std::mem::replace(&mut self.flags, flags);
        let result = f(self);
        self.flags = saved;
        result
    }

    /// Parse without effects.
    fn dry<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        self.with_flags(self.flags - ExecFlags::EXECUTE, f)
    }

    /// Parse with effects only if `execute` (and the current flags allow it).
    fn branch<T>(
        &mut self,
        execute: bool,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let flags = if execute {
            self.flags
        } else {
            self.flags - ExecFlags::EXECUTE
        };
        self.with_flags(flags, f)
    }

    fn swap_frame(&mut self, mut frame: Frame<'a>) -> Frame<'a> {
        std::mem::swap(&mut self.lex, &mut frame.lex);
        std::mem::swap(&mut self.scopes, &mut frame.scopes);
        std::mem::swap(&mut self.var_scope, &mut frame.var_scope);
        std::mem::swap(&mut self.this, &mut frame.this);
        std::mem::swap(&mut self.flags, &mut frame.flags);
        std::mem::swap(&mut self.line_base, &mut frame.line_base);
        std::mem::swap(&mut self.column_base, &mut frame.column_base);
        frame
    }

    // Tokens and syntax errors

    /// Line and column of a source offset in the evaluated source, also
    /// when running the copied text of a function body.
    fn position(&self, offset: usize) -> (usize, usize) {
        let (line, column) = self.lex.line_column(offset);
        let column = if line == 1 {
            column + self.column_base
        } else {
            column
        };
        (line + self.line_base, column)
    }

    fn syntax(&self, err: SyntaxError) -> EvalError {
        let (line, column) = self.position(err.offset);
        EvalError::Syntax {
            message: err.message,
            offset: err.offset,
            line,
            column,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> EvalResult<()> {
        self.lex.accept(kind).map_err(|err| self.syntax(err))
    }

    fn unexpected(&self) -> EvalError {
        self.syntax(self.lex.unexpected())
    }

    fn expected(&self, what: &str) -> EvalError {
        self.syntax(self.lex.expected(what))
    }

    /// Consume an identifier and return its text.
    fn ident(&mut self) -> EvalResult<String> {
        if !self.lex.is(TokenKind::Ident) {
            return Err(self.expected("identifier"));
        }
        let name = self.lex.ident().to_owned();
        self.lex.next_token();
        Ok(name)
    }

    // Limits

    fn check_stack(&self) -> EvalResult<()> {
        self.probe
            .check(self.depth)
            .map_err(|_| EvalError::StackExhausted { depth: self.depth })
    }

    /// Poll host interruption, the time budget and arena faults.
    fn safepoint(&self) -> EvalResult<()> {
        if self.rt.interrupt_handle().take() {
            debug!("evaluation interrupted by host");
            return Err(EvalError::Interrupted);
        }
        if let Some(deadline) = self.deadline {
            if self.rt.clock().now_ms() >= deadline {
                debug!(deadline, "evaluation ran out of time");
                return Err(EvalError::Interrupted);
            }
        }
        self.arena.check_fault()?;
        Ok(())
    }

    fn check_loop_limit(&self, iterations: usize) -> EvalResult<()> {
        let limit = self.rt.config().max_loop_iterations;
        if limit != 0 && iterations > limit {
            return Err(EvalError::LoopLimit { limit });
        }
        Ok(())
    }

    // Exceptions

    /// Start unwinding with `value`, thrown at source offset `offset`.
    pub(crate) fn throw_value(&mut self, value: Option<Var<'a>>, offset: usize) {
        let (line, column) = self.position(offset);
        self.trace.clear();
        self.trace
            .push(format!("at {}:{line}:{column}", self.source_name));
        self.pending = Some(Completion::Throw(value));
    }

    /// Throw a new error object `{ name, message }` at the current token.
    pub(crate) fn throw_error(&mut self, name: &str, message: &str) -> EvalResult<()> {
        let arena = self.arena;
        let error = arena.new_object()?;
        let name = arena.new_string(name)?;
        arena.set_child(&error, "name", Some(&name))?;
        let message = arena.new_string(message)?;
        arena.set_child(&error, "message", Some(&message))?;
        self.throw_value(Some(error), self.lex.token_start());
        Ok(())
    }

    /// The pending exception, if one is pending. Other completions stay.
    fn take_throw(&mut self) -> Option<Option<Var<'a>>> {
        match self.pending.take() {
            Some(Completion::Throw(value)) => Some(value),
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Park an exception that reached the top level on the root and turn it
    /// into an error for the host.
    fn uncaught(&mut self, value: Option<Var<'a>>) -> EvalResult<EvalError> {
        let arena = self.arena;
        let message = self.describe_exception(value.as_ref());
        debug!(%message, "uncaught exception");
        arena.set_hidden(&self.root, hidden::EXCEPTION, value.as_ref())?;
        let trace = arena.new_array()?;
        for line in &self.trace {
            let line = arena.new_string(line)?;
            arena.array_push(&trace, Some(&line))?;
        }
        arena.set_hidden(&self.root, hidden::TRACE, Some(&trace))?;
        Ok(EvalError::Uncaught {
            message,
            trace: std::mem::take(&mut self.trace),
        })
    }

    /// `Name: message` for error objects, display text otherwise.
    fn describe_exception(&self, value: Option<&Var<'a>>) -> String {
        let arena = self.arena;
        if let Some(v) = value.filter(|v| v.kind() == ember_arena::VarKind::Object) {
            if let Some(message) = arena.get_child(v, "message") {
                let message = arena.to_display_string(Some(&message));
                return match arena.get_child(v, "name") {
                    Some(name) => format!("{}: {message}", arena.to_display_string(Some(&name))),
                    None => message,
                };
            }
        }
        arena.to_display_string(value)
    }

    // Top level

    /// Run every statement of the source.
    ///
    /// A syntax error is reported and parsing resumes after the next `;` or
    /// `}` without executing anything further, so later errors are reported
    /// too. The first syntax error is returned.
    pub(crate) fn run_program(&mut self) -> EvalResult<Option<Var<'a>>> {
        let mut first_error = None;
        while !self.lex.is(TokenKind::Eof) {
            match self.statement() {
                Ok(()) => {}
                Err(err @ EvalError::Syntax { .. }) => {
                    self.report_syntax(&err);
                    first_error.get_or_insert(err);
                    self.flags.remove(ExecFlags::EXECUTE);
                    self.resync();
                }
                Err(err) => return Err(err),
            }
            if self.is_throwing() {
                break;
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        if let Some(value) = self.take_throw() {
            return Err(self.uncaught(value)?);
        }
        Ok(self.last_value.take())
    }

    /// Call `func` on behalf of the host. An exception it throws is uncaught.
    pub(crate) fn call_from_host(
        &mut self,
        func: Var<'a>,
        this: Option<Var<'a>>,
        args: Args<'a>,
    ) -> EvalResult<Option<Var<'a>>> {
        let value = self.call_value(Some(func), this, args)?;
        if let Some(thrown) = self.take_throw() {
            return Err(self.uncaught(thrown)?);
        }
        Ok(value)
    }

    fn report_syntax(&self, err: &EvalError) {
        if let EvalError::Syntax {
            message,
            line,
            column,
            ..
        } = err
        {
            self.rt.sink().report(&format!(
                "{}:{line}:{column}: syntax error: {message}",
                self.source_name
            ));
        }
    }

    /// Skip past the next statement boundary.
    fn resync(&mut self) {
        loop {
            match self.lex.kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon | TokenKind::RBrace => {
                    self.lex.next_token();
                    return;
                }
                _ => self.lex.next_token(),
            }
        }
    }
}
