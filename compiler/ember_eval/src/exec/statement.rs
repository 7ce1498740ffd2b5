//! Statements.

use ember_arena::Var;
use ember_lexer::{SyntaxError, TokenKind};

use super::operators::{strict_equals, truthy};
use super::Exec;
use crate::errors::EvalResult;
use crate::flags::{Completion, ExecFlags};

impl<'a> Exec<'a> {
    pub(crate) fn statement(&mut self) -> EvalResult<()> {
        match self.lex.kind() {
            TokenKind::LBrace => self.block(),
            TokenKind::Semicolon => {
                self.lex.next_token();
                Ok(())
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.var_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Switch => self.switch_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Throw => self.throw_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Break | TokenKind::Continue => self.jump_statement(),
            TokenKind::Function => {
                let (name, func) = self.function_literal(true)?;
                if let Some(name) = name {
                    self.declare(&name, Some(func))?;
                }
                Ok(())
            }
            _ => {
                let value = self.expression_value()?;
                if self.depth == 0 && self.executing() {
                    self.last_value = value;
                }
                self.end_statement();
                Ok(())
            }
        }
    }

    /// `{ statements }`
    pub(crate) fn block(&mut self) -> EvalResult<()> {
        self.expect(TokenKind::LBrace)?;
        self.check_stack()?;
        while !self.lex.is(TokenKind::RBrace) {
            if self.lex.is(TokenKind::Eof) {
                return Err(self.expected("'}'"));
            }
            self.statement()?;
        }
        self.lex.next_token();
        Ok(())
    }

    fn end_statement(&mut self) {
        self.lex.eat_token(TokenKind::Semicolon);
    }

    /// `var a = 1, b;`
    pub(crate) fn var_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        self.declarations()?;
        self.end_statement();
        Ok(())
    }

    /// The comma-separated declarators after `var`/`let`/`const`; returns the
    /// last declared name.
    pub(crate) fn declarations(&mut self) -> EvalResult<String> {
        loop {
            let name = self.ident()?;
            let init = if self.lex.eat_token(TokenKind::Assign) {
                Some(self.assignment_value()?)
            } else {
                None
            };
            self.declare(&name, init)?;
            if !self.lex.eat_token(TokenKind::Comma) {
                return Ok(name);
            }
        }
    }

    fn if_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        self.expect(TokenKind::LParen)?;
        let cond = self.expression_value()?;
        self.expect(TokenKind::RParen)?;
        let active = self.executing();
        let take = truthy(self.arena, cond.as_ref());
        self.branch(active && take, Self::statement)?;
        if self.lex.eat_token(TokenKind::Else) {
            self.branch(active && !take, Self::statement)?;
        }
        Ok(())
    }

    /// `switch`: clauses are scanned once to find the matching `case` and
    /// once more from `default` if none matched. Fallthrough continues into
    /// later clauses until `break`.
    fn switch_statement(&mut self) -> EvalResult<()> {
        self.lex.next_token();
        self.expect(TokenKind::LParen)?;
        let disc = self.expression_value()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let active = self.executing();
        let body = self.lex.token_start();
        let flags = self.flags | ExecFlags::IN_SWITCH;

        let (matched, default_at) =
            self.with_flags(flags, |e| e.switch_clauses(active, disc.as_ref(), None))?;
        let end = self.lex.token_start();
        if !matched && active {
            if let Some(default_at) = default_at {
                self.lex.seek(body);
                self.with_flags(flags, |e| e.switch_clauses(true, None, Some(default_at)))?;
                self.lex.seek(end);
            }
        }
        self.expect(TokenKind::RBrace)?;
        if matches!(self.pending, Some(Completion::Break)) {
            self.pending = None;
        }
        Ok(())
    }

    /// One pass over the clauses of a `switch` body, stopping at its `}`.
    ///
    /// Statements execute from the first clause that matches `disc`, or from
    /// the clause starting at `start_at` when given. Returns whether a clause
    /// matched and where the `default` clause starts.
    fn switch_clauses(
        &mut self,
        active: bool,
        disc: Option<&Var<'a>>,
        start_at: Option<usize>,
    ) -> EvalResult<(bool, Option<usize>)> {
        let mut running = false;
        let mut default_at = None;
        while !self.lex.is(TokenKind::RBrace) {
            let clause = self.lex.token_start();
            match self.lex.kind() {
                TokenKind::Case => {
                    self.lex.next_token();
                    let test = self.branch(active && !running && start_at.is_none(), |e| {
                        e.expression_value()
                    })?;
                    if active && !running && start_at.is_none() && self.executing() {
                        running = strict_equals(self.arena, disc, test.as_ref());
                    }
                }
                TokenKind::Default => {
                    self.lex.next_token();
                    default_at = Some(clause);
                }
                TokenKind::Eof => return Err(self.expected("'}'")),
                _ => return Err(self.expected("'case' or 'default'")),
            }
            self.expect(TokenKind::Colon)?;
            if start_at == Some(clause) {
                running = true;
            }
            while !matches!(
                self.lex.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                self.branch(active && running, Self::statement)?;
            }
        }
        Ok((running, default_at))
    }

    /// `try { } catch (e) { } finally { }`
    fn try_statement(&mut self) -> EvalResult<()> {
        let at = self.lex.token_start();
        self.lex.next_token();
        let active = self.executing();
        self.block()?;
        let mut handled = false;

        if self.lex.eat_token(TokenKind::Catch) {
            handled = true;
            let param = if self.lex.eat_token(TokenKind::LParen) {
                let name = self.ident()?;
                self.expect(TokenKind::RParen)?;
                Some(name)
            } else {
                None
            };
            let caught = if active { self.take_throw() } else { None };
            match caught {
                Some(value) => {
                    self.trace.clear();
                    let scope = self.new_scope()?;
                    if let Some(param) = &param {
                        self.arena.set_child(&scope, param, value.as_ref())?;
                    }
                    self.scopes.push(scope);
                    let result = self.block();
                    self.scopes.pop();
                    result?;
                }
                None => self.dry(Self::block)?,
            }
        }

        if self.lex.eat_token(TokenKind::Finally) {
            handled = true;
            let saved = self.pending.take();
            self.branch(active, Self::block)?;
            if self.pending.is_none() {
                self.pending = saved;
            }
        }

        if !handled {
            let err = SyntaxError::new("expected 'catch' or 'finally' after 'try' block", at);
            return Err(self.syntax(err));
        }
        Ok(())
    }

    fn throw_statement(&mut self) -> EvalResult<()> {
        let at = self.lex.token_start();
        self.lex.next_token();
        let value = self.expression_value()?;
        if self.executing() {
            self.throw_value(value, at);
        }
        self.end_statement();
        Ok(())
    }

    fn return_statement(&mut self) -> EvalResult<()> {
        if !self.flags.contains(ExecFlags::IN_FUNCTION) {
            return Err(self.syntax(SyntaxError::new(
                "'return' outside of a function",
                self.lex.token_start(),
            )));
        }
        self.lex.next_token();
        let value = if matches!(
            self.lex.kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            None
        } else {
            self.expression_value()?
        };
        if self.executing() {
            self.pending = Some(Completion::Return(value));
        }
        self.end_statement();
        Ok(())
    }

    /// `break` and `continue`.
    fn jump_statement(&mut self) -> EvalResult<()> {
        let is_break = self.lex.is(TokenKind::Break);
        let allowed = if is_break {
            self.flags.intersects(ExecFlags::IN_LOOP | ExecFlags::IN_SWITCH)
        } else {
            self.flags.contains(ExecFlags::IN_LOOP)
        };
        if !allowed {
            let what = if is_break { "break" } else { "continue" };
            return Err(self.syntax(SyntaxError::new(
                format!("'{what}' outside of a loop"),
                self.lex.token_start(),
            )));
        }
        self.lex.next_token();
        if self.executing() {
            self.pending = Some(if is_break {
                Completion::Break
            } else {
                Completion::Continue
            });
        }
        self.end_statement();
        Ok(())
    }
}
