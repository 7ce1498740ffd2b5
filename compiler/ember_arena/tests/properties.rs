//! Property-based tests for the value arena.
//!
//! 1. Ownership: across arbitrary construct/lock/unlock/link/unlink
//!    sequences, nothing locked or reachable from a locked record is freed,
//!    and acyclic structures are fully reclaimed once the last guard drops.
//! 2. Chunk transparency: chunked strings behave exactly like plain byte
//!    strings for length, indexing, appending and equality.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    reason = "Proptest macros generate code with these patterns"
)]

use ember_arena::{Arena, Var, VarKind, STRING_CHARS, STRING_EXT_CHARS};
use proptest::prelude::*;

// -- Ownership --

#[derive(Clone, Debug)]
enum Op {
    NewObject,
    NewInt(i32),
    Link { parent: usize, child: usize, key: u8 },
    Unlink { parent: usize, key: u8 },
    Drop(usize),
    Clone(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::NewObject),
        2 => any::<i32>().prop_map(Op::NewInt),
        4 => (any::<usize>(), any::<usize>(), 0u8..4)
            .prop_map(|(parent, child, key)| Op::Link { parent, child, key }),
        1 => (any::<usize>(), 0u8..4).prop_map(|(parent, key)| Op::Unlink { parent, key }),
        2 => any::<usize>().prop_map(Op::Drop),
        1 => any::<usize>().prop_map(Op::Clone),
    ]
}

/// A held guard plus its creation rank (clones share the rank).
struct Held<'a> {
    var: Var<'a>,
    rank: usize,
}

fn check_live(arena: &Arena, held: &[Held<'_>]) {
    for h in held {
        assert_ne!(arena.kind(&h.var), VarKind::Free);
        assert!(arena.locks(&h.var) >= 1);
        if !h.var.kind().is_container() {
            continue;
        }
        for name in arena.children(&h.var) {
            assert!(arena.refs(&name) >= 1, "listed name lost its reference");
            if let Some(value) = arena.name_value(&name) {
                assert_ne!(arena.kind(&value), VarKind::Free);
                assert!(arena.refs(&value) >= 1, "owned value lost its reference");
            }
        }
    }
}

/// Apply `ops`; when `acyclic`, links only point from newer to older
/// records.
fn run_ops(arena: &Arena, ops: &[Op], acyclic: bool) {
    let mut held: Vec<Held<'_>> = Vec::new();
    let mut next_rank = 0;
    for op in ops {
        match *op {
            Op::NewObject | Op::NewInt(_) => {
                let made = match *op {
                    Op::NewInt(i) => arena.new_int(i),
                    _ => arena.new_object(),
                };
                if let Ok(var) = made {
                    held.push(Held {
                        var,
                        rank: next_rank,
                    });
                    next_rank += 1;
                }
            }
            Op::Link { parent, child, key } if !held.is_empty() => {
                let p = &held[parent % held.len()];
                let c = &held[child % held.len()];
                if !p.var.kind().is_container() || (acyclic && c.rank >= p.rank) {
                    continue;
                }
                let key = format!("k{key}");
                if let Ok(name) = arena.set_child(&p.var, &key, Some(&c.var)) {
                    drop(name);
                }
            }
            Op::Unlink { parent, key } if !held.is_empty() => {
                let p = &held[parent % held.len()];
                if p.var.kind().is_container() {
                    arena.remove_child(&p.var, &format!("k{key}"));
                }
            }
            Op::Drop(i) if !held.is_empty() => {
                let i = i % held.len();
                held.swap_remove(i);
            }
            Op::Clone(i) if !held.is_empty() => {
                let h = &held[i % held.len()];
                let copy = Held {
                    var: h.var.clone(),
                    rank: h.rank,
                };
                held.push(copy);
            }
            _ => {}
        }
        check_live(arena, &held);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn locked_and_reachable_records_survive(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let arena = Arena::with_capacity(512);
        run_ops(&arena, &ops, false);
    }

    #[test]
    fn acyclic_structures_are_fully_reclaimed(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let arena = Arena::with_capacity(512);
        run_ops(&arena, &ops, true);
        prop_assert_eq!(arena.stats().used, 0);
        prop_assert_eq!(arena.take_fault(), None);
    }
}

// -- Chunk transparency --

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 ]{0,80}").expect("valid regex")
}

/// Lengths sitting exactly on chunk boundaries, and one either side.
fn boundary_lengths() -> Vec<usize> {
    let mut lengths = vec![0, 1];
    for chunks in 0..4 {
        let edge = STRING_CHARS + chunks * STRING_EXT_CHARS;
        lengths.extend([edge - 1, edge, edge + 1]);
    }
    lengths
}

#[test]
fn boundary_lengths_behave_like_plain_strings() {
    let arena = Arena::with_capacity(256);
    for len in boundary_lengths() {
        let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let s = arena.new_string(&text).unwrap();
        assert_eq!(arena.string_len(&s), len);
        assert_eq!(arena.string_to_string(&s), text);
        assert_eq!(arena.char_at(&s, len), None);
        if len > 0 {
            assert_eq!(arena.char_at(&s, len - 1), text.as_bytes().last().copied());
        }
    }
    assert_eq!(arena.stats().used, 0);
}

proptest! {
    #[test]
    fn chunked_strings_match_plain_strings(a in text_strategy(), b in text_strategy(), split in 0usize..80) {
        let arena = Arena::with_capacity(256);
        let s = arena.new_string(&a).unwrap();

        prop_assert_eq!(arena.string_len(&s), a.len());
        for (i, byte) in a.bytes().enumerate() {
            prop_assert_eq!(arena.char_at(&s, i), Some(byte));
        }

        arena.append_str(&s, &b).unwrap();
        let joined = format!("{a}{b}");
        prop_assert_eq!(arena.string_to_string(&s), joined.clone());
        prop_assert!(arena.string_eq_str(&s, &joined));

        // The same content built from a different split compares equal.
        let split = split.min(joined.len());
        let t = arena.new_string(&joined[..split]).unwrap();
        arena.append_str(&t, &joined[split..]).unwrap();
        prop_assert!(arena.equals(&s, &t));
        prop_assert_eq!(arena.compare_strings(&s, &t), std::cmp::Ordering::Equal);

        let middle = arena.new_string_from_span(&s, split / 2, split).unwrap();
        prop_assert_eq!(arena.string_to_string(&middle), joined[split / 2..split].to_owned());
    }
}
