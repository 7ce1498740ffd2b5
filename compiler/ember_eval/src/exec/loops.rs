//! Loops.
//!
//! The condition, step and body of a loop are parsed once to find where
//! they end, then replayed by seeking the lexer back to their recorded
//! offsets for every further iteration. The loop limit counts executions of
//! the body.

use ember_arena::{Var, VarKind};
use ember_lexer::TokenKind;

use super::operators::truthy;
use super::{Exec, TYPE_ERROR};
use crate::errors::EvalResult;
use crate::flags::{Completion, ExecFlags};

impl<'a> Exec<'a> {
    fn loop_body(&mut self, execute: bool) -> EvalResult<()> {
        let mut flags = self.flags | ExecFlags::IN_LOOP;
        if !execute {
            flags -= ExecFlags::EXECUTE;
        }
        self.with_flags(flags, Self::statement)
    }

    /// Evaluate a loop condition; false when not executing.
    fn loop_condition(&mut self) -> EvalResult<bool> {
        let value = self.expression_value()?;
        Ok(self.executing() && truthy(self.arena, value.as_ref()))
    }

    /// Consume the `break` or `continue` that ended an iteration. Returns
    /// whether the loop goes on.
    fn continue_loop(&mut self) -> bool {
        match &self.pending {
            None => true,
            Some(Completion::Continue) => {
                self.pending = None;
                true
            }
            Some(Completion::Break) => {
                self.pending = None;
                false
            }
            Some(Completion::Return(_) | Completion::Throw(_)) => false,
        }
    }

    fn count_iteration(&self, count: &mut usize) -> EvalResult<()> {
        self.safepoint()?;
        *count += 1;
        self.check_loop_limit(*count)
    }

    pub(crate) fn while_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        self.expect(TokenKind::LParen)?;
        let cond_start = self.lex.token_start();
        let mut go = self.loop_condition()?;
        self.expect(TokenKind::RParen)?;
        let mut count = usize::from(go);
        self.loop_body(go)?;
        let body_end = self.lex.token_start();

        while go && self.continue_loop() {
            self.lex.seek(cond_start);
            go = self.loop_condition()?;
            self.expect(TokenKind::RParen)?;
            if !go {
                break;
            }
            self.count_iteration(&mut count)?;
            self.loop_body(true)?;
        }
        self.lex.seek(body_end);
        Ok(())
    }

    pub(crate) fn do_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        let body_start = self.lex.token_start();
        let active = self.executing();
        let mut count = usize::from(active);
        self.loop_body(active)?;

        loop {
            let more = active && self.continue_loop();
            self.expect(TokenKind::While)?;
            self.expect(TokenKind::LParen)?;
            let go = if more {
                self.loop_condition()?
            } else {
                self.dry(Self::expression)?;
                false
            };
            self.expect(TokenKind::RParen)?;
            if !go {
                break;
            }
            self.count_iteration(&mut count)?;
            self.lex.seek(body_start);
            self.loop_body(true)?;
        }
        self.lex.eat_token(TokenKind::Semicolon);
        Ok(())
    }

    /// `for (init; cond; step)`, `for (x in obj)` and `for (x of items)`.
    pub(crate) fn for_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        self.expect(TokenKind::LParen)?;

        let saved = self.lex.clone();
        let declared = matches!(
            self.lex.kind(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        );
        if declared {
            self.lex.next_token();
        }
        if self.lex.is(TokenKind::Ident) {
            let name = self.lex.ident().to_owned();
            self.lex.next_token();
            let of = self.lex.is(TokenKind::Ident) && self.lex.ident() == "of";
            if of || self.lex.is(TokenKind::In) {
                if declared {
                    self.declare(&name, None)?;
                }
                return self.for_each(&name, of);
            }
        }
        self.lex = saved;

        if matches!(
            self.lex.kind(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            self.lex.next_token();
            self.declarations()?;
        } else if !self.lex.is(TokenKind::Semicolon) {
            self.expression_value()?;
        }
        self.expect(TokenKind::Semicolon)?;

        let cond_start = self.lex.token_start();
        let has_cond = !self.lex.is(TokenKind::Semicolon);
        let mut go = if has_cond {
            self.loop_condition()?
        } else {
            self.executing()
        };
        self.expect(TokenKind::Semicolon)?;
        let step_start = self.lex.token_start();
        if !self.lex.is(TokenKind::RParen) {
            self.dry(Self::expression)?;
        }
        self.expect(TokenKind::RParen)?;
        let body_start = self.lex.token_start();
        let mut count = usize::from(go);
        self.loop_body(go)?;
        let body_end = self.lex.token_start();

        while go && self.continue_loop() {
            self.lex.seek(step_start);
            if !self.lex.is(TokenKind::RParen) {
                self.expression_value()?;
            }
            go = if has_cond {
                self.lex.seek(cond_start);
                self.loop_condition()?
            } else {
                self.executing()
            };
            if !go {
                break;
            }
            self.count_iteration(&mut count)?;
            self.lex.seek(body_start);
            self.loop_body(true)?;
        }
        self.lex.seek(body_end);
        Ok(())
    }

    /// The rest of a `for-in`/`for-of` loop, from the `in` or `of` token.
    fn for_each(&mut self, name: &str, of: bool) -> EvalResult<()> {
        self.lex.next_token();
        let subject = self.expression_value()?;
        self.expect(TokenKind::RParen)?;
        let items = if self.executing() {
            self.iteration_items(subject.as_ref(), of)?
        } else {
            Vec::new()
        };
        let body_start = self.lex.token_start();
        self.loop_body(false)?;
        let body_end = self.lex.token_start();

        let mut count = 0;
        for item in items {
            if !self.executing() {
                break;
            }
            self.count_iteration(&mut count)?;
            let target = self.resolve(name)?;
            self.assign(&target, item.as_ref())?;
            self.lex.seek(body_start);
            self.loop_body(true)?;
            if !self.continue_loop() {
                break;
            }
        }
        self.lex.seek(body_end);
        Ok(())
    }

    /// Snapshot what a loop visits: member keys for `in`, elements or
    /// characters for `of`.
    fn iteration_items(
        &mut self,
        subject: Option<&Var<'a>>,
        of: bool,
    ) -> EvalResult<Vec<Option<Var<'a>>>> {
        let arena = self.arena;
        let mut items = Vec::new();
        let kind = subject.map(Var::kind);
        match (subject, kind, of) {
            (Some(subject), Some(kind), false) if kind.is_container() => {
                for name in arena.children(subject) {
                    items.push(Some(arena.new_string(&arena.name_key_string(&name))?));
                }
            }
            (Some(subject), Some(VarKind::String), false) => {
                for i in 0..arena.string_len(subject) {
                    items.push(Some(arena.new_string(&i.to_string())?));
                }
            }
            (_, _, false) => {}
            (Some(subject), Some(VarKind::Array), true) => {
                for i in 0..arena.array_len(subject) {
                    items.push(arena.array_get(subject, i));
                }
            }
            (Some(subject), Some(VarKind::String), true) => {
                for i in 0..arena.string_len(subject) {
                    let c = arena.char_at(subject, i);
                    items.push(c.map(|c| arena.new_string_bytes(&[c])).transpose()?);
                }
            }
            (subject, _, true) => {
                let what = arena.to_display_string(subject);
                self.throw_error(TYPE_ERROR, &format!("{what} is not iterable"))?;
            }
        }
        Ok(items)
    }
}
