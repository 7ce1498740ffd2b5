//! Expressions, from the comma operator down to primaries.

use ember_arena::{format_number, Arena, ArenaResult, Var};
use ember_lexer::{SyntaxError, TokenKind};

use super::operators::{self, truthy};
use super::{Args, Exec, Key, Operand, TYPE_ERROR};
use crate::errors::EvalResult;

/// Binding power of a binary operator; higher binds tighter.
fn precedence(op: TokenKind) -> Option<u8> {
    Some(match op {
        TokenKind::PipePipe => 1,
        TokenKind::AmpAmp => 2,
        TokenKind::Pipe => 3,
        TokenKind::Caret => 4,
        TokenKind::Amp => 5,
        TokenKind::Eq | TokenKind::NotEq | TokenKind::StrictEq | TokenKind::StrictNotEq => 6,
        TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::In
        | TokenKind::Instanceof => 7,
        TokenKind::Shl | TokenKind::Shr | TokenKind::UShr => 8,
        TokenKind::Plus | TokenKind::Minus => 9,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 10,
        _ => return None,
    })
}

impl<'a> Exec<'a> {
    /// `a, b, c`: every operand is evaluated, the last one is the result.
    pub(crate) fn expression(&mut self) -> EvalResult<Operand<'a>> {
        let mut operand = self.assignment()?;
        while self.lex.eat_token(TokenKind::Comma) {
            self.value_of(operand)?;
            operand = self.assignment()?;
        }
        Ok(operand)
    }

    pub(crate) fn expression_value(&mut self) -> EvalResult<Option<Var<'a>>> {
        let operand = self.expression()?;
        self.value_of(operand)
    }

    pub(crate) fn assignment_value(&mut self) -> EvalResult<Option<Var<'a>>> {
        let operand = self.assignment()?;
        self.value_of(operand)
    }

    /// Assignment, compound assignment and arrow functions.
    pub(crate) fn assignment(&mut self) -> EvalResult<Operand<'a>> {
        self.check_stack()?;
        if let Some(arrow) = self.arrow_function()? {
            return Ok(arrow);
        }
        let target = self.ternary()?;
        let op = self.lex.kind();
        if !op.is_assignment() {
            return Ok(target);
        }
        self.lex.next_token();
        let value = match op.compound_base() {
            Some(base) => {
                let current = self.value_of(target.clone())?;
                let rhs = self.assignment_value()?;
                self.binary_op(base, current, rhs)?
            }
            None => self.assignment_value()?,
        };
        self.assign(&target, value.as_ref())?;
        Ok(Operand::Value(value))
    }

    fn ternary(&mut self) -> EvalResult<Operand<'a>> {
        let cond = self.binary(1)?;
        if !self.lex.eat_token(TokenKind::Question) {
            return Ok(cond);
        }
        let test = self.value_of(cond)?;
        let active = self.executing();
        let take = truthy(self.arena, test.as_ref());
        let yes = self.branch(active && take, Self::assignment_value)?;
        self.expect(TokenKind::Colon)?;
        let no = self.branch(active && !take, Self::assignment_value)?;
        Ok(Operand::Value(if take { yes } else { no }))
    }

    /// Precedence climbing over the binary operators. The untaken side of
    /// `&&` and `||` is parsed without effects.
    fn binary(&mut self, min: u8) -> EvalResult<Operand<'a>> {
        let mut left = self.unary()?;
        loop {
            let op = self.lex.kind();
            let Some(prec) = precedence(op).filter(|&p| p >= min) else {
                return Ok(left);
            };
            self.lex.next_token();
            let lhs = self.value_of(left)?;
            left = if matches!(op, TokenKind::AmpAmp | TokenKind::PipePipe) {
                let active = self.executing();
                let truth = truthy(self.arena, lhs.as_ref());
                let short = if op == TokenKind::AmpAmp { !truth } else { truth };
                let rhs = self.branch(active && !short, |e| {
                    let rhs = e.binary(prec + 1)?;
                    e.value_of(rhs)
                })?;
                Operand::Value(if short { lhs } else { rhs })
            } else {
                let rhs = self.binary(prec + 1)?;
                let rhs = self.value_of(rhs)?;
                Operand::Value(self.binary_op(op, lhs, rhs)?)
            };
        }
    }

    /// Prefix operators.
    fn unary(&mut self) -> EvalResult<Operand<'a>> {
        self.check_stack()?;
        let op = self.lex.kind();
        match op {
            TokenKind::Bang | TokenKind::Minus | TokenKind::Plus | TokenKind::Tilde => {
                self.lex.next_token();
                let operand = self.unary()?;
                let value = self.value_of(operand)?;
                if !self.executing() {
                    return Ok(Operand::undefined());
                }
                Ok(Operand::Value(operators::unary(self.arena, op, value.as_ref())?))
            }
            TokenKind::Typeof => {
                self.lex.next_token();
                let operand = self.unary()?;
                if !self.executing() {
                    return Ok(Operand::undefined());
                }
                let value = match operand {
                    Operand::Unresolved(_) => None,
                    other => self.value_of(other)?,
                };
                let text = operators::type_of(value.as_ref());
                Ok(Operand::Value(Some(self.arena.new_string(text)?)))
            }
            TokenKind::Void => {
                self.lex.next_token();
                let operand = self.unary()?;
                self.value_of(operand)?;
                Ok(Operand::undefined())
            }
            TokenKind::Delete => {
                self.lex.next_token();
                let operand = self.unary()?;
                if !self.executing() {
                    return Ok(Operand::undefined());
                }
                let deleted = match &operand {
                    Operand::Name {
                        name,
                        parent: Some(parent),
                    } => {
                        self.arena.remove_name(parent, name)?;
                        true
                    }
                    Operand::NewMember { .. } | Operand::Value(_) => true,
                    _ => false,
                };
                Ok(Operand::Value(Some(self.arena.new_bool(deleted)?)))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.lex.next_token();
                let target = self.unary()?;
                self.increment(target, op == TokenKind::PlusPlus, true)
            }
            _ => self.postfix(),
        }
    }

    /// `++`/`--` in either position.
    fn increment(&mut self, target: Operand<'a>, up: bool, prefix: bool) -> EvalResult<Operand<'a>> {
        let old = self.value_of(target.clone())?;
        if !self.executing() {
            return Ok(Operand::undefined());
        }
        let arena = self.arena;
        let old = operators::unary(arena, TokenKind::Plus, old.as_ref())?;
        let one = arena.new_int(1)?;
        let op = if up { TokenKind::Plus } else { TokenKind::Minus };
        let new = operators::arithmetic(arena, op, old.as_ref(), Some(&one))?;
        self.assign(&target, new.as_ref())?;
        Ok(Operand::Value(if prefix { new } else { old }))
    }

    /// Member accesses, calls and postfix `++`/`--`.
    fn postfix(&mut self) -> EvalResult<Operand<'a>> {
        let mut operand = self.primary()?;
        loop {
            match self.lex.kind() {
                TokenKind::Dot | TokenKind::LBracket => operand = self.member_access(operand)?,
                TokenKind::LParen => {
                    let at = self.lex.token_start();
                    let this = operand.parent();
                    let func = self.callee(operand)?;
                    let args = self.arguments()?;
                    self.call_site = Some(at);
                    operand = Operand::Value(self.call_value(func, this, args)?);
                }
                op @ (TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                    self.lex.next_token();
                    return self.increment(operand, op == TokenKind::PlusPlus, false);
                }
                _ => return Ok(operand),
            }
        }
    }

    /// `.name` or `[expr]` applied to `operand`.
    pub(crate) fn member_access(&mut self, operand: Operand<'a>) -> EvalResult<Operand<'a>> {
        if self.lex.eat_token(TokenKind::Dot) {
            if !self.lex.kind().is_word() {
                return Err(self.expected("property name"));
            }
            let key = Key::from_text(self.lex.ident());
            self.lex.next_token();
            let parent = self.value_of(operand)?;
            return self.member(parent, key);
        }
        self.expect(TokenKind::LBracket)?;
        let parent = self.value_of(operand)?;
        let key = self.expression_value()?;
        self.expect(TokenKind::RBracket)?;
        let key = self.key_of(key.as_ref());
        self.member(parent, key)
    }

    /// The function an operand denotes; throws `TypeError` if it is not
    /// callable.
    pub(crate) fn callee(&mut self, operand: Operand<'a>) -> EvalResult<Option<Var<'a>>> {
        if !self.executing() {
            return Ok(None);
        }
        let what = match &operand {
            Operand::Name { name, .. } => self.arena.name_key_string(name),
            Operand::Inherited { key, .. } | Operand::NewMember { key, .. } => key.to_string(),
            Operand::ArrayLength(_) => "length".to_owned(),
            Operand::Unresolved(key) => key.clone(),
            Operand::Value(_) => "expression".to_owned(),
        };
        let func = self.value_of(operand)?;
        if self.executing() && !func.as_ref().is_some_and(|f| f.kind().is_function()) {
            self.throw_error(TYPE_ERROR, &format!("{what} is not a function"))?;
            return Ok(None);
        }
        Ok(func)
    }

    /// `( args )`
    pub(crate) fn arguments(&mut self) -> EvalResult<Args<'a>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Args::new();
        while !self.lex.is(TokenKind::RParen) {
            args.push(self.assignment_value()?);
            if !self.lex.eat_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    /// Allocate a literal's record, unless effects are off.
    fn literal(
        &self,
        make: impl FnOnce(&'a Arena) -> ArenaResult<Var<'a>>,
    ) -> EvalResult<Option<Var<'a>>> {
        if self.executing() {
            Ok(Some(make(self.arena)?))
        } else {
            Ok(None)
        }
    }

    fn primary(&mut self) -> EvalResult<Operand<'a>> {
        let value = match self.lex.kind() {
            TokenKind::Int => {
                let i = self.lex.int_value();
                self.literal(|a| a.new_int(i))?
            }
            TokenKind::Float => {
                let f = self.lex.number();
                self.literal(|a| a.new_float(f))?
            }
            TokenKind::Str => {
                let bytes = self.lex.token_bytes();
                if self.executing() {
                    Some(self.arena.new_string_bytes(bytes)?)
                } else {
                    None
                }
            }
            TokenKind::True => self.literal(|a| a.new_bool(true))?,
            TokenKind::False => self.literal(|a| a.new_bool(false))?,
            TokenKind::Null => self.literal(Arena::new_null)?,
            TokenKind::Undefined => None,
            TokenKind::This => self.this.clone().filter(|_| self.executing()),
            TokenKind::Ident => {
                let name = self.lex.ident().to_owned();
                self.lex.next_token();
                return self.resolve(&name);
            }
            TokenKind::LParen => {
                self.lex.next_token();
                self.check_stack()?;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => return self.array_literal(),
            TokenKind::LBrace => return self.object_literal(),
            TokenKind::Function => {
                let (_, func) = self.function_literal(false)?;
                return Ok(Operand::Value(func));
            }
            TokenKind::New => return self.new_expression(),
            TokenKind::UnterminatedString => {
                let err = SyntaxError::new("unterminated string literal", self.lex.token_start());
                return Err(self.syntax(err));
            }
            _ => return Err(self.unexpected()),
        };
        self.lex.next_token();
        Ok(Operand::Value(value))
    }

    /// `[a, , b]`: holes leave indices unset but count toward the length.
    fn array_literal(&mut self) -> EvalResult<Operand<'a>> {
        self.expect(TokenKind::LBracket)?;
        self.check_stack()?;
        let arena = self.arena;
        let array = self.literal(Arena::new_array)?;
        let mut index = 0i32;
        while !self.lex.is(TokenKind::RBracket) {
            if self.lex.eat_token(TokenKind::Comma) {
                index = index.saturating_add(1);
                continue;
            }
            let value = self.assignment_value()?;
            if let Some(array) = array.as_ref().filter(|_| self.executing()) {
                arena.array_set(array, index, value.as_ref())?;
            }
            index = index.saturating_add(1);
            if !self.lex.eat_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        if let Some(array) = array.as_ref().filter(|_| self.executing()) {
            arena.set_array_len(array, index);
        }
        Ok(Operand::Value(array))
    }

    /// `{ key: value, "key": value, 1: value, shorthand }`
    fn object_literal(&mut self) -> EvalResult<Operand<'a>> {
        self.expect(TokenKind::LBrace)?;
        self.check_stack()?;
        let object = self.literal(Arena::new_object)?;
        while !self.lex.is(TokenKind::RBrace) {
            let kind = self.lex.kind();
            let key = match kind {
                TokenKind::Str => Key::from_text(&String::from_utf8_lossy(self.lex.token_bytes())),
                TokenKind::Int if self.lex.int_value() >= 0 => Key::Index(self.lex.int_value()),
                TokenKind::Int | TokenKind::Float => Key::Text(format_number(self.lex.number())),
                k if k.is_word() => Key::from_text(self.lex.ident()),
                _ => return Err(self.expected("property name")),
            };
            self.lex.next_token();
            let shorthand = kind == TokenKind::Ident
                && (self.lex.is(TokenKind::Comma) || self.lex.is(TokenKind::RBrace));
            let value = if shorthand {
                let variable = self.resolve(&key.to_string())?;
                self.value_of(variable)?
            } else {
                self.expect(TokenKind::Colon)?;
                self.assignment_value()?
            };
            if let Some(object) = object.as_ref().filter(|_| self.executing()) {
                self.set_member(object, &key, value.as_ref())?;
            }
            if !self.lex.eat_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Operand::Value(object))
    }

    /// `new F(args)`; the argument list is optional.
    fn new_expression(&mut self) -> EvalResult<Operand<'a>> {
        self.lex.next_token();
        let mut operand = self.primary()?;
        while matches!(self.lex.kind(), TokenKind::Dot | TokenKind::LBracket) {
            operand = self.member_access(operand)?;
        }
        let func = self.callee(operand)?;
        let site = self.lex.token_start();
        let args = if self.lex.is(TokenKind::LParen) {
            self.arguments()?
        } else {
            Args::new()
        };
        self.construct(func, args, Some(site))
    }
}
