//! The tokenizer.
//!
//! A [`Lexer`] reads a span of an arena string through a [`StrCursor`], so
//! the source may be split across any number of string chunks. It holds one
//! token of lookahead: the current token's kind, offsets and value. Because
//! the only state is a cursor position, [`Lexer::seek`] can restart lexing at
//! any recorded token start, which is how loops and function bodies are
//! replayed.

use ember_arena::{Arena, StrCursor, Var};

use crate::error::SyntaxError;
use crate::escape::{hex_value, push_code_point, resolve_escape};
use crate::keywords;
use crate::token::TokenKind;

/// Resumable tokenizer over an arena string.
///
/// Cloning takes a snapshot that can be restored to backtrack without
/// re-seeking.
#[derive(Clone)]
pub struct Lexer<'a> {
    arena: &'a Arena,
    source: Var<'a>,
    cursor: StrCursor,
    /// Byte at `pos`, or `None` at the end of the span.
    ch: Option<u8>,
    pos: usize,
    from: usize,
    end: usize,

    kind: TokenKind,
    token_start: usize,
    token_end: usize,
    prev_token_end: usize,
    /// Identifier text or decoded string literal.
    buf: Vec<u8>,
    int_value: i32,
    number: f64,
}

#[inline]
fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

#[inline]
fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

impl<'a> Lexer<'a> {
    /// Lex the whole of `source`.
    pub fn new(source: Var<'a>) -> Self {
        Lexer::init(source, 0, usize::MAX)
    }

    /// Lex bytes `from..to` of `source` (clamped to its length) and load the
    /// first token.
    pub fn init(source: Var<'a>, from: usize, to: usize) -> Self {
        let arena = source.arena();
        let end = to.min(arena.string_len(&source));
        let from = from.min(end);
        let cursor = arena.string_cursor(&source, from);
        let mut lexer = Lexer {
            arena,
            source,
            cursor,
            ch: None,
            pos: from,
            from,
            end,
            kind: TokenKind::Eof,
            token_start: from,
            token_end: from,
            prev_token_end: from,
            buf: Vec::new(),
            int_value: 0,
            number: 0.0,
        };
        lexer.bump();
        lexer.next_token();
        lexer
    }

    // Accessors

    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// The string being lexed.
    pub fn source(&self) -> &Var<'a> {
        &self.source
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Offset of the first byte of the current token.
    #[inline]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Offset just past the current token.
    #[inline]
    pub fn token_end(&self) -> usize {
        self.token_end
    }

    /// Offset just past the previous token.
    #[inline]
    pub fn prev_token_end(&self) -> usize {
        self.prev_token_end
    }

    /// Start of the lexed span.
    pub fn span_start(&self) -> usize {
        self.from
    }

    /// End of the lexed span.
    pub fn span_end(&self) -> usize {
        self.end
    }

    /// Value of an `Int` token.
    pub fn int_value(&self) -> i32 {
        self.int_value
    }

    /// Value of an `Int` or `Float` token.
    pub fn number(&self) -> f64 {
        self.number
    }

    /// Identifier text, or the decoded bytes of a string literal.
    pub fn token_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Identifier text. Identifiers are ASCII, so this is lossless for them.
    pub fn ident(&self) -> &str {
        std::str::from_utf8(&self.buf).unwrap_or_default()
    }

    // Reading

    /// Move to the next byte of the span.
    fn bump(&mut self) {
        self.pos = self.cursor.index();
        self.ch = if self.pos < self.end {
            self.arena.cursor_next(&mut self.cursor)
        } else {
            None
        };
    }

    /// The byte after the current one.
    fn peek(&self) -> Option<u8> {
        if self.cursor.index() < self.end {
            self.arena.cursor_peek(&self.cursor)
        } else {
            None
        }
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.ch == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    // Tokens

    /// Advance to the next token.
    pub fn next_token(&mut self) {
        self.prev_token_end = self.token_end;
        self.skip_trivia();
        self.token_start = self.pos;
        self.buf.clear();
        self.kind = match self.ch {
            None => TokenKind::Eof,
            Some(c) if is_ident_start(c) => self.lex_ident(),
            Some(c) if c.is_ascii_digit() => self.lex_number(),
            Some(b'.') if self.peek().is_some_and(|d| d.is_ascii_digit()) => self.lex_number(),
            Some(quote @ (b'"' | b'\'')) => self.lex_string(quote),
            Some(c) => {
                self.bump();
                self.lex_punct(c)
            }
        };
        self.token_end = self.pos;
    }

    /// Restart lexing at `offset` (normally a recorded token start) and load
    /// the token found there.
    pub fn seek(&mut self, offset: usize) {
        let offset = offset.clamp(self.from, self.end);
        self.cursor = self.arena.string_cursor(&self.source, offset);
        self.token_end = offset;
        self.bump();
        self.next_token();
    }

    /// Consume the current token if it is `kind`.
    pub fn accept(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.kind == kind {
            self.next_token();
            Ok(())
        } else {
            Err(self.expected(&kind.to_string()))
        }
    }

    /// Consume the current token if it is `kind`; report whether it was.
    pub fn eat_token(&mut self, kind: TokenKind) -> bool {
        if self.kind == kind {
            self.next_token();
            true
        } else {
            false
        }
    }

    /// Error for a token that does not fit here.
    pub fn unexpected(&self) -> SyntaxError {
        SyntaxError::new(
            format!("unexpected {}", self.describe_current()),
            self.token_start,
        )
    }

    /// Error naming what the grammar wanted instead of the current token.
    pub fn expected(&self, what: &str) -> SyntaxError {
        SyntaxError::new(
            format!("expected {what}, found {}", self.describe_current()),
            self.token_start,
        )
    }

    fn describe_current(&self) -> String {
        match self.kind {
            TokenKind::Ident => format!("identifier '{}'", self.ident()),
            kind => kind.to_string(),
        }
    }

    /// One-based line and column of `offset`, counted from the start of the
    /// source string.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let mut cursor = self.arena.string_cursor(&self.source, 0);
        let (mut line, mut column) = (1, 1);
        while cursor.index() < offset {
            match self.arena.cursor_next(&mut cursor) {
                Some(b'\n') => {
                    line += 1;
                    column = 1;
                }
                Some(_) => column += 1,
                None => break,
            }
        }
        (line, column)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.ch {
                Some(b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c) => self.bump(),
                Some(b'/') if self.peek() == Some(b'/') => {
                    while !matches!(self.ch, None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek() == Some(b'*') => {
                    self.bump();
                    self.bump();
                    // An unterminated block comment runs to the end.
                    while let Some(c) = self.ch {
                        self.bump();
                        if c == b'*' && self.eat(b'/') {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        while let Some(c) = self.ch.filter(|&c| is_ident_continue(c)) {
            self.buf.push(c);
            self.bump();
        }
        keywords::lookup(&self.buf).unwrap_or(TokenKind::Ident)
    }

    fn lex_number(&mut self) -> TokenKind {
        if self.ch == Some(b'0') {
            let radix = match self.peek() {
                Some(b'x' | b'X') => Some(16),
                Some(b'o' | b'O') => Some(8),
                Some(b'b' | b'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                let mut value = 0.0f64;
                while let Some(d) = self.ch.and_then(|c| char::from(c).to_digit(radix)) {
                    value = value * f64::from(radix) + f64::from(d);
                    self.bump();
                }
                return self.number_token(value, true);
            }
        }

        let mut text = String::new();
        let mut integral = true;
        self.take_digits(&mut text);
        if self.ch == Some(b'.')
            && !self.peek().is_some_and(|c| is_ident_start(c) || c == b'.')
        {
            integral = false;
            text.push('.');
            self.bump();
            self.take_digits(&mut text);
        }
        if matches!(self.ch, Some(b'e' | b'E'))
            && self
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || c == b'+' || c == b'-')
        {
            integral = false;
            text.push('e');
            self.bump();
            if let Some(sign @ (b'+' | b'-')) = self.ch {
                text.push(char::from(sign));
                self.bump();
            }
            self.take_digits(&mut text);
        }
        let value = text.parse::<f64>().unwrap_or(f64::NAN);
        self.number_token(value, integral)
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(c) = self.ch.filter(u8::is_ascii_digit) {
            text.push(char::from(c));
            self.bump();
        }
    }

    fn number_token(&mut self, value: f64, integral: bool) -> TokenKind {
        self.number = value;
        if integral && value <= f64::from(i32::MAX) {
            self.int_value = value as i32;
            TokenKind::Int
        } else {
            TokenKind::Float
        }
    }

    fn lex_string(&mut self, quote: u8) -> TokenKind {
        self.bump();
        loop {
            match self.ch {
                None | Some(b'\n' | b'\r') => return TokenKind::UnterminatedString,
                Some(c) if c == quote => {
                    self.bump();
                    return TokenKind::Str;
                }
                Some(b'\\') => {
                    self.bump();
                    self.lex_escape();
                }
                Some(c) => {
                    self.buf.push(c);
                    self.bump();
                }
            }
        }
    }

    fn lex_escape(&mut self) {
        let Some(c) = self.ch else {
            return;
        };
        self.bump();
        match c {
            // Line continuation.
            b'\n' => {}
            b'\r' => {
                self.eat(b'\n');
            }
            b'x' => self.lex_hex_escape(b'x', 2),
            b'u' => self.lex_hex_escape(b'u', 4),
            c => self.buf.push(resolve_escape(c).unwrap_or(c)),
        }
    }

    /// `\xHH` or `\uHHHH`. Too few digits keeps the text literally.
    fn lex_hex_escape(&mut self, marker: u8, digits: usize) {
        let mut code = 0u32;
        let mut seen = Vec::with_capacity(digits);
        while seen.len() < digits {
            let Some((c, d)) = self.ch.and_then(|c| hex_value(c).map(|d| (c, d))) else {
                break;
            };
            code = code * 16 + d;
            seen.push(c);
            self.bump();
        }
        if seen.len() < digits {
            self.buf.push(marker);
            self.buf.extend_from_slice(&seen);
        } else if marker == b'x' {
            self.buf.push(code as u8);
        } else {
            push_code_point(&mut self.buf, code);
        }
    }

    fn lex_punct(&mut self, c: u8) -> TokenKind {
        match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'~' => TokenKind::Tilde,
            b'+' => {
                if self.eat(b'+') {
                    TokenKind::PlusPlus
                } else {
                    self.assign_or(TokenKind::PlusAssign, TokenKind::Plus)
                }
            }
            b'-' => {
                if self.eat(b'-') {
                    TokenKind::MinusMinus
                } else {
                    self.assign_or(TokenKind::MinusAssign, TokenKind::Minus)
                }
            }
            b'*' => self.assign_or(TokenKind::StarAssign, TokenKind::Star),
            b'/' => self.assign_or(TokenKind::SlashAssign, TokenKind::Slash),
            b'%' => self.assign_or(TokenKind::PercentAssign, TokenKind::Percent),
            b'^' => self.assign_or(TokenKind::CaretAssign, TokenKind::Caret),
            b'=' => {
                if self.eat(b'=') {
                    self.assign_or(TokenKind::StrictEq, TokenKind::Eq)
                } else if self.eat(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    self.assign_or(TokenKind::StrictNotEq, TokenKind::NotEq)
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.eat(b'<') {
                    self.assign_or(TokenKind::ShlAssign, TokenKind::Shl)
                } else {
                    self.assign_or(TokenKind::LtEq, TokenKind::Lt)
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    if self.eat(b'>') {
                        self.assign_or(TokenKind::UShrAssign, TokenKind::UShr)
                    } else {
                        self.assign_or(TokenKind::ShrAssign, TokenKind::Shr)
                    }
                } else {
                    self.assign_or(TokenKind::GtEq, TokenKind::Gt)
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    TokenKind::AmpAmp
                } else {
                    self.assign_or(TokenKind::AmpAssign, TokenKind::Amp)
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    TokenKind::PipePipe
                } else {
                    self.assign_or(TokenKind::PipeAssign, TokenKind::Pipe)
                }
            }
            other => TokenKind::Unknown(other),
        }
    }

    /// `with_eq` if the next byte is `=` (consuming it), `plain` otherwise.
    fn assign_or(&mut self, with_eq: TokenKind, plain: TokenKind) -> TokenKind {
        if self.eat(b'=') {
            with_eq
        } else {
            plain
        }
    }
}
