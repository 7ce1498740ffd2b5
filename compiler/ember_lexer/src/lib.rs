//! Ember Lexer - tokenizer for Ember script source.
//!
//! The lexer reads source text straight out of an arena string, walking its
//! chunk chain, and keeps exactly one token of lookahead. There is no token
//! buffer: the evaluator re-lexes loop bodies and function bodies by seeking
//! back to recorded offsets.
//!
//! Malformed input never fails here. Unrecognized bytes become
//! [`TokenKind::Unknown`] tokens and unterminated strings become
//! [`TokenKind::UnterminatedString`]; the parser turns them into
//! [`SyntaxError`]s.

mod error;
mod escape;
mod keywords;
mod lexer;
mod token;

pub use error::SyntaxError;
pub use lexer::Lexer;
pub use token::TokenKind;
