//! Token kinds.

use std::fmt;

/// Token kinds for Ember source.
///
/// Literal values and identifier text are not stored in the kind; the lexer
/// keeps them alongside the current token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of the lexed span.
    Eof,
    /// Identifier: `foo`, `$el`, `_x1`
    Ident,
    /// Integer literal that fits in 32 bits.
    Int,
    /// Float literal, or an integer literal too large for 32 bits.
    Float,
    /// String literal (single or double quoted).
    Str,
    /// String literal missing its closing quote.
    UnterminatedString,

    // Keywords
    Var,
    Let,
    Const,
    If,
    Else,
    Do,
    While,
    For,
    In,
    Break,
    Continue,
    Function,
    Return,
    Throw,
    Try,
    Catch,
    Finally,
    Switch,
    Case,
    Default,
    New,
    This,
    True,
    False,
    Null,
    Undefined,
    Typeof,
    Void,
    Delete,
    Instanceof,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Question,
    Colon,
    /// `=>`
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `===`
    StrictEq,
    Bang,
    /// `!=`
    NotEq,
    /// `!==`
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,

    // Compound assignment
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,

    /// A byte that starts no token.
    Unknown(u8),
}

impl TokenKind {
    /// Human-readable name used in syntax errors.
    pub fn display_name(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Ident => "identifier",
            TokenKind::Int | TokenKind::Float => "number",
            TokenKind::Str => "string",
            TokenKind::UnterminatedString => "unterminated string",
            TokenKind::Var => "var",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Do => "do",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::Throw => "throw",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::New => "new",
            TokenKind::This => "this",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::Typeof => "typeof",
            TokenKind::Void => "void",
            TokenKind::Delete => "delete",
            TokenKind::Instanceof => "instanceof",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Arrow => "=>",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::StrictEq => "===",
            TokenKind::Bang => "!",
            TokenKind::NotEq => "!=",
            TokenKind::StrictNotEq => "!==",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::UShr => ">>>",
            TokenKind::Amp => "&",
            TokenKind::AmpAmp => "&&",
            TokenKind::Pipe => "|",
            TokenKind::PipePipe => "||",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::ShlAssign => "<<=",
            TokenKind::ShrAssign => ">>=",
            TokenKind::UShrAssign => ">>>=",
            TokenKind::AmpAssign => "&=",
            TokenKind::PipeAssign => "|=",
            TokenKind::CaretAssign => "^=",
            TokenKind::Unknown(_) => "unknown character",
        }
    }

    /// Identifiers and keywords: anything that may follow `.` as a property
    /// name. The lexer keeps the text of both.
    pub fn is_word(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Do
                | TokenKind::While
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::New
                | TokenKind::This
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::Typeof
                | TokenKind::Void
                | TokenKind::Delete
                | TokenKind::Instanceof
        )
    }

    /// The plain operator a compound assignment applies (`+=` → `+`).
    pub fn compound_base(self) -> Option<TokenKind> {
        Some(match self {
            TokenKind::PlusAssign => TokenKind::Plus,
            TokenKind::MinusAssign => TokenKind::Minus,
            TokenKind::StarAssign => TokenKind::Star,
            TokenKind::SlashAssign => TokenKind::Slash,
            TokenKind::PercentAssign => TokenKind::Percent,
            TokenKind::ShlAssign => TokenKind::Shl,
            TokenKind::ShrAssign => TokenKind::Shr,
            TokenKind::UShrAssign => TokenKind::UShr,
            TokenKind::AmpAssign => TokenKind::Amp,
            TokenKind::PipeAssign => TokenKind::Pipe,
            TokenKind::CaretAssign => TokenKind::Caret,
            _ => return None,
        })
    }

    /// Whether this token is an assignment operator (`=` or compound).
    pub fn is_assignment(self) -> bool {
        self == TokenKind::Assign || self.compound_base().is_some()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Unknown(b) if b.is_ascii_graphic() => write!(f, "'{}'", char::from(*b)),
            TokenKind::Unknown(b) => write!(f, "byte 0x{b:02x}"),
            TokenKind::Ident | TokenKind::Int | TokenKind::Float | TokenKind::Str | TokenKind::Eof => {
                f.write_str(self.display_name())
            }
            _ => write!(f, "'{}'", self.display_name()),
        }
    }
}
