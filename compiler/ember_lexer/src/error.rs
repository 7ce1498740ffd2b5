//! Syntax errors.

/// A syntax error at a byte offset of the lexed source.
///
/// The lexer itself never fails; the parser raises these through
/// [`crate::Lexer::accept`] and [`crate::Lexer::unexpected`] when the token
/// stream does not fit the grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    /// What was expected and what was found.
    pub message: String,
    /// Byte offset of the offending token.
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        SyntaxError {
            message: message.into(),
            offset,
        }
    }
}
