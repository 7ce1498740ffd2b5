//! Lexing across string chunks and replaying from recorded offsets.

#![allow(clippy::unwrap_used, reason = "tests")]

use ember_arena::Arena;
use ember_lexer::{Lexer, TokenKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Kind(TokenKind),
    Ident(String),
    Int(i32),
    Str(Vec<u8>),
}

fn snapshot(lx: &Lexer<'_>) -> Tok {
    match lx.kind() {
        TokenKind::Ident => Tok::Ident(lx.ident().to_owned()),
        TokenKind::Int => Tok::Int(lx.int_value()),
        TokenKind::Str => Tok::Str(lx.token_bytes().to_vec()),
        kind => Tok::Kind(kind),
    }
}

fn drain(lx: &mut Lexer<'_>) -> Vec<(usize, Tok)> {
    let mut out = Vec::new();
    while !lx.is(TokenKind::Eof) {
        out.push((lx.token_start(), snapshot(lx)));
        lx.next_token();
    }
    out
}

#[test]
fn source_built_by_appending_lexes_like_a_literal() {
    let arena = Arena::with_capacity(256);
    let whole = arena
        .new_string("for (var i = 0; i < 10; i++) { total += \"chunk boundary\"; }")
        .unwrap();
    let pieces = arena.new_string("").unwrap();
    for piece in ["for (var i", " = 0; i < 1", "0; i++) { tot", "al += \"chunk bou", "ndary\"; }"] {
        arena.append_str(&pieces, piece).unwrap();
    }
    let a = drain(&mut Lexer::new(whole));
    let b = drain(&mut Lexer::new(pieces));
    assert_eq!(a, b);
    assert_eq!(a.len(), 20);
}

#[test]
fn body_span_can_be_relexed_from_a_copy() {
    let arena = Arena::with_capacity(256);
    let src = arena
        .new_string("function f(a) { return a * 2; } f(3);")
        .unwrap();
    let mut lx = Lexer::new(src.clone());
    while !lx.is(TokenKind::LBrace) {
        lx.next_token();
    }
    let start = lx.token_start();
    while !lx.is(TokenKind::RBrace) {
        lx.next_token();
    }
    let end = lx.token_end();
    let body = arena.new_string_from_span(&src, start, end).unwrap();
    assert_eq!(arena.string_to_string(&body), "{ return a * 2; }");

    let in_place: Vec<Tok> = drain(&mut Lexer::init(src, start, end))
        .into_iter()
        .map(|(_, t)| t)
        .collect();
    let copied: Vec<Tok> = drain(&mut Lexer::new(body))
        .into_iter()
        .map(|(_, t)| t)
        .collect();
    assert_eq!(in_place, copied);
}

fn token_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_$][a-z0-9_]{0,10}",
        (0u32..100_000).prop_map(|n| n.to_string()),
        "\"[a-z ]{0,20}\"",
        prop::sample::select(vec!["+", "===", ">>>=", "(", ")", "{", "}", ";", "=>", "&&"])
            .prop_map(str::to_owned),
    ]
}

proptest! {
    #[test]
    fn seek_to_any_token_reproduces_the_suffix(
        parts in prop::collection::vec(token_text(), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let src = parts.join(" ");
        let arena = Arena::with_capacity(1024);
        let source = arena.new_string(&src).unwrap();
        let mut lx = Lexer::new(source);
        let all = drain(&mut lx);
        prop_assume!(!all.is_empty());
        let at = pick.index(all.len());
        lx.seek(all[at].0);
        let suffix = drain(&mut lx);
        prop_assert_eq!(&suffix[..], &all[at..]);
    }
}
