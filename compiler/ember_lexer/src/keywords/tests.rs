use pretty_assertions::assert_eq;

use super::*;

#[test]
fn control_flow_keywords() {
    assert_eq!(lookup(b"if"), Some(TokenKind::If));
    assert_eq!(lookup(b"else"), Some(TokenKind::Else));
    assert_eq!(lookup(b"while"), Some(TokenKind::While));
    assert_eq!(lookup(b"for"), Some(TokenKind::For));
    assert_eq!(lookup(b"switch"), Some(TokenKind::Switch));
    assert_eq!(lookup(b"continue"), Some(TokenKind::Continue));
    assert_eq!(lookup(b"finally"), Some(TokenKind::Finally));
}

#[test]
fn declaration_keywords() {
    assert_eq!(lookup(b"var"), Some(TokenKind::Var));
    assert_eq!(lookup(b"let"), Some(TokenKind::Let));
    assert_eq!(lookup(b"const"), Some(TokenKind::Const));
    assert_eq!(lookup(b"function"), Some(TokenKind::Function));
}

#[test]
fn operator_keywords() {
    assert_eq!(lookup(b"typeof"), Some(TokenKind::Typeof));
    assert_eq!(lookup(b"instanceof"), Some(TokenKind::Instanceof));
    assert_eq!(lookup(b"delete"), Some(TokenKind::Delete));
    assert_eq!(lookup(b"void"), Some(TokenKind::Void));
    assert_eq!(lookup(b"undefined"), Some(TokenKind::Undefined));
}

#[test]
fn identifiers_are_not_keywords() {
    for text in [&b"x"[..], b"of", b"iff", b"Var", b"functions", b"instanceOf", b"_if"] {
        assert_eq!(lookup(text), None, "{:?}", String::from_utf8_lossy(text));
    }
}
