//! Escape sequence processing for string literals.
//!
//! Recognized escapes: `\n \r \t \b \f \v \0 \' \" \\`, `\xHH` (one byte),
//! `\uHHHH` (UTF-8 encoded), and a backslash before a line break, which
//! continues the literal on the next line. Unknown escapes stand for the
//! escaped character itself.

/// Resolve a single-character escape to its byte.
#[inline]
pub(crate) fn resolve_escape(c: u8) -> Option<u8> {
    match c {
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'v' => Some(0x0b),
        b'0' => Some(0),
        b'\\' => Some(b'\\'),
        b'"' => Some(b'"'),
        b'\'' => Some(b'\''),
        _ => None,
    }
}

/// Value of an ASCII hex digit.
#[inline]
pub(crate) fn hex_value(c: u8) -> Option<u32> {
    char::from(c).to_digit(16)
}

/// Append the UTF-8 encoding of `code` (replacement character if invalid).
pub(crate) fn push_code_point(out: &mut Vec<u8>, code: u32) {
    let c = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
