//! Reserved word lookup.
//!
//! Length-bucketed: the identifier's length picks a short list of candidates
//! (keywords range from 2 to 10 bytes), then the text is compared directly.
//! No hashing is involved.
//!
//! `of` is not reserved; the `for` statement recognizes it contextually.

use crate::token::TokenKind;

/// Look up a reserved word by text.
///
/// Returns `None` for ordinary identifiers.
#[inline]
pub(crate) fn lookup(text: &[u8]) -> Option<TokenKind> {
    let len = text.len();
    if !(2..=10).contains(&len) || !text[0].is_ascii_lowercase() {
        return None;
    }

    match len {
        2 => match text {
            b"if" => Some(TokenKind::If),
            b"do" => Some(TokenKind::Do),
            b"in" => Some(TokenKind::In),
            _ => None,
        },
        3 => match text {
            b"var" => Some(TokenKind::Var),
            b"let" => Some(TokenKind::Let),
            b"for" => Some(TokenKind::For),
            b"try" => Some(TokenKind::Try),
            b"new" => Some(TokenKind::New),
            _ => None,
        },
        4 => match text {
            b"else" => Some(TokenKind::Else),
            b"case" => Some(TokenKind::Case),
            b"this" => Some(TokenKind::This),
            b"true" => Some(TokenKind::True),
            b"null" => Some(TokenKind::Null),
            b"void" => Some(TokenKind::Void),
            _ => None,
        },
        5 => match text {
            b"const" => Some(TokenKind::Const),
            b"while" => Some(TokenKind::While),
            b"break" => Some(TokenKind::Break),
            b"throw" => Some(TokenKind::Throw),
            b"catch" => Some(TokenKind::Catch),
            b"false" => Some(TokenKind::False),
            _ => None,
        },
        6 => match text {
            b"return" => Some(TokenKind::Return),
            b"switch" => Some(TokenKind::Switch),
            b"typeof" => Some(TokenKind::Typeof),
            b"delete" => Some(TokenKind::Delete),
            _ => None,
        },
        7 => match text {
            b"finally" => Some(TokenKind::Finally),
            b"default" => Some(TokenKind::Default),
            _ => None,
        },
        8 => match text {
            b"continue" => Some(TokenKind::Continue),
            b"function" => Some(TokenKind::Function),
            _ => None,
        },
        9 => match text {
            b"undefined" => Some(TokenKind::Undefined),
            _ => None,
        },
        10 => match text {
            b"instanceof" => Some(TokenKind::Instanceof),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests;
