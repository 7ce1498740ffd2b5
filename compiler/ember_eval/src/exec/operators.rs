//! Operator semantics.
//!
//! Integer arithmetic stays in 32 bits while results fit and are exact;
//! anything else is done in `f64` and stored as whatever
//! [`Arena::new_number`] picks. `+` concatenates as soon as either side is
//! a string or an object.

use ember_arena::{Arena, ArenaResult, Var, VarKind};
use ember_lexer::TokenKind;

use super::{hidden, Exec, TYPE_ERROR};
use crate::errors::EvalResult;

/// Longest prototype chain followed by `instanceof`.
const MAX_INSTANCEOF_DEPTH: usize = 16;

pub(crate) fn truthy(arena: &Arena, value: Option<&Var<'_>>) -> bool {
    value.is_some_and(|v| arena.as_bool(v))
}

pub(crate) fn to_number(arena: &Arena, value: Option<&Var<'_>>) -> f64 {
    value.map_or(f64::NAN, |v| arena.as_float(v))
}

fn to_int32(arena: &Arena, value: Option<&Var<'_>>) -> i32 {
    value.map_or(0, |v| arena.as_int(v))
}

/// The value as an integer, if it takes the integer fast path.
fn int_operand(arena: &Arena, value: Option<&Var<'_>>) -> Option<i32> {
    let v = value?;
    matches!(v.kind(), VarKind::Int | VarKind::Bool | VarKind::Null).then(|| arena.as_int(v))
}

fn is_textual(value: Option<&Var<'_>>) -> bool {
    value.is_some_and(|v| v.kind() == VarKind::String || v.kind().is_container())
}

/// Exact 32-bit result, or `None` to fall back to floats (overflow,
/// inexact division, negative zero).
fn int_arith(op: TokenKind, x: i32, y: i32) -> Option<i32> {
    match op {
        TokenKind::Plus => x.checked_add(y),
        TokenKind::Minus => x.checked_sub(y),
        TokenKind::Star => x.checked_mul(y).filter(|&r| r != 0 || (x >= 0 && y >= 0)),
        TokenKind::Slash => {
            if y == 0 || x.checked_rem(y)? != 0 || (x == 0 && y < 0) {
                None
            } else {
                x.checked_div(y)
            }
        }
        TokenKind::Percent => x.checked_rem(y).filter(|&r| r != 0 || x >= 0),
        _ => None,
    }
}

/// `+ - * / %` and the bitwise and shift operators.
pub(crate) fn arithmetic<'a>(
    arena: &'a Arena,
    op: TokenKind,
    a: Option<&Var<'a>>,
    b: Option<&Var<'a>>,
) -> ArenaResult<Option<Var<'a>>> {
    if op == TokenKind::Plus && (is_textual(a) || is_textual(b)) {
        let out = arena.new_string("")?;
        arena.append_display(&out, a)?;
        arena.append_display(&out, b)?;
        return Ok(Some(out));
    }
    let bits = |f: fn(i32, i32) -> i32| -> ArenaResult<Option<Var<'a>>> {
        Ok(Some(arena.new_int(f(to_int32(arena, a), to_int32(arena, b)))?))
    };
    match op {
        TokenKind::Amp => return bits(|x, y| x & y),
        TokenKind::Pipe => return bits(|x, y| x | y),
        TokenKind::Caret => return bits(|x, y| x ^ y),
        TokenKind::Shl => return bits(|x, y| x.wrapping_shl(y as u32)),
        TokenKind::Shr => return bits(|x, y| x.wrapping_shr(y as u32)),
        TokenKind::UShr => {
            let x = to_int32(arena, a) as u32;
            let y = to_int32(arena, b) as u32;
            return Ok(Some(arena.new_number(f64::from(x.wrapping_shr(y)))?));
        }
        _ => {}
    }
    if let (Some(x), Some(y)) = (int_operand(arena, a), int_operand(arena, b)) {
        if let Some(r) = int_arith(op, x, y) {
            return Ok(Some(arena.new_int(r)?));
        }
    }
    let (x, y) = (to_number(arena, a), to_number(arena, b));
    let r = match op {
        TokenKind::Plus => x + y,
        TokenKind::Minus => x - y,
        TokenKind::Star => x * y,
        TokenKind::Slash => x / y,
        TokenKind::Percent => x % y,
        _ => f64::NAN,
    };
    Ok(Some(arena.new_number(r)?))
}

/// `< <= > >=`. Two strings compare by content, anything else as numbers;
/// `NaN` compares false.
pub(crate) fn compare(arena: &Arena, op: TokenKind, a: Option<&Var<'_>>, b: Option<&Var<'_>>) -> bool {
    use std::cmp::Ordering;

    let ordering = match (a, b) {
        (Some(x), Some(y)) if x.kind() == VarKind::String && y.kind() == VarKind::String => {
            Some(arena.compare_strings(x, y))
        }
        _ => to_number(arena, a).partial_cmp(&to_number(arena, b)),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        TokenKind::Lt => ordering == Ordering::Less,
        TokenKind::LtEq => ordering != Ordering::Greater,
        TokenKind::Gt => ordering == Ordering::Greater,
        TokenKind::GtEq => ordering != Ordering::Less,
        _ => false,
    }
}

/// `==`: `undefined` equals `null`, numbers and numeric strings compare by
/// value.
pub(crate) fn loose_equals(arena: &Arena, a: Option<&Var<'_>>, b: Option<&Var<'_>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (None, Some(v)) | (Some(v), None) => v.kind() == VarKind::Null,
        (Some(x), Some(y)) => arena.equals(x, y),
    }
}

fn category(kind: VarKind) -> u8 {
    match kind {
        VarKind::Int | VarKind::Float => 0,
        VarKind::Bool => 1,
        VarKind::String => 2,
        VarKind::Null => 3,
        _ => 4,
    }
}

/// `===`: no conversions; objects compare by identity.
pub(crate) fn strict_equals(arena: &Arena, a: Option<&Var<'_>>, b: Option<&Var<'_>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => {
            let cat = category(x.kind());
            if cat != category(y.kind()) {
                false
            } else if cat == 4 {
                x.same(y)
            } else {
                arena.equals(x, y)
            }
        }
        _ => false,
    }
}

pub(crate) fn type_of(value: Option<&Var<'_>>) -> &'static str {
    let Some(v) = value else {
        return "undefined";
    };
    match v.kind() {
        VarKind::Int | VarKind::Float => "number",
        VarKind::Bool => "boolean",
        VarKind::String => "string",
        kind if kind.is_function() => "function",
        _ => "object",
    }
}

/// `! - + ~` applied to a value.
pub(crate) fn unary<'a>(
    arena: &'a Arena,
    op: TokenKind,
    value: Option<&Var<'a>>,
) -> ArenaResult<Option<Var<'a>>> {
    let result = match op {
        TokenKind::Bang => arena.new_bool(!truthy(arena, value))?,
        TokenKind::Tilde => arena.new_int(!to_int32(arena, value))?,
        TokenKind::Minus => match int_operand(arena, value) {
            Some(i) if i != 0 && i != i32::MIN => arena.new_int(-i)?,
            _ => arena.new_number(-to_number(arena, value))?,
        },
        _ => match int_operand(arena, value) {
            Some(i) => arena.new_int(i)?,
            None => arena.new_number(to_number(arena, value))?,
        },
    };
    Ok(Some(result))
}

impl<'a> Exec<'a> {
    /// Apply a binary operator to two evaluated operands.
    pub(crate) fn binary_op(
        &mut self,
        op: TokenKind,
        a: Option<Var<'a>>,
        b: Option<Var<'a>>,
    ) -> EvalResult<Option<Var<'a>>> {
        if !self.executing() {
            return Ok(None);
        }
        let arena = self.arena;
        let (a, b) = (a.as_ref(), b.as_ref());
        let result = match op {
            TokenKind::Eq => loose_equals(arena, a, b),
            TokenKind::NotEq => !loose_equals(arena, a, b),
            TokenKind::StrictEq => strict_equals(arena, a, b),
            TokenKind::StrictNotEq => !strict_equals(arena, a, b),
            TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                compare(arena, op, a, b)
            }
            TokenKind::In => {
                let Some(object) = b.filter(|v| v.kind().is_container()) else {
                    self.throw_error(TYPE_ERROR, "cannot use 'in' on a non-object")?;
                    return Ok(None);
                };
                let key = self.key_of(a);
                self.has_property(object, &key)
            }
            TokenKind::Instanceof => {
                let Some(class) = b.filter(|v| v.kind().is_function()) else {
                    self.throw_error(TYPE_ERROR, "right side of 'instanceof' is not callable")?;
                    return Ok(None);
                };
                self.instance_of(a, class)
            }
            _ => return Ok(arithmetic(arena, op, a, b)?),
        };
        Ok(Some(arena.new_bool(result)?))
    }

    /// Whether `class.prototype` is on the prototype chain of `value`.
    fn instance_of(&self, value: Option<&Var<'a>>, class: &Var<'a>) -> bool {
        let arena = self.arena;
        let (Some(value), Some(prototype)) = (value, arena.get_child(class, "prototype")) else {
            return false;
        };
        let mut proto = arena.get_hidden(value, hidden::PROTO);
        let mut hops = 0;
        while let Some(p) = proto {
            if p.same(&prototype) {
                return true;
            }
            hops += 1;
            if hops > MAX_INSTANCEOF_DEPTH {
                break;
            }
            proto = arena.get_hidden(&p, hidden::PROTO);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use ember_arena::{Arena, ArenaResult, Var};
    use ember_lexer::TokenKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ok<T>(r: ArenaResult<T>) -> T {
        r.unwrap_or_else(|e| panic!("{e}"))
    }

    fn show(arena: &Arena, v: Option<Var<'_>>) -> String {
        arena.to_display_string(v.as_ref())
    }

    fn apply(arena: &Arena, op: TokenKind, a: f64, b: f64) -> String {
        let (a, b) = (ok(arena.new_number(a)), ok(arena.new_number(b)));
        show(arena, ok(arithmetic(arena, op, Some(&a), Some(&b))))
    }

    #[test]
    fn integer_fast_path_and_promotion() {
        let arena = Arena::with_capacity(64);
        assert_eq!(apply(&arena, TokenKind::Plus, 2.0, 3.0), "5");
        assert_eq!(apply(&arena, TokenKind::Slash, 6.0, 3.0), "2");
        assert_eq!(apply(&arena, TokenKind::Slash, 7.0, 2.0), "3.5");
        assert_eq!(apply(&arena, TokenKind::Slash, 1.0, 0.0), "Infinity");
        assert_eq!(apply(&arena, TokenKind::Percent, 7.0, 3.0), "1");
        assert_eq!(apply(&arena, TokenKind::Plus, 2_147_483_647.0, 1.0), "2147483648");
        assert_eq!(apply(&arena, TokenKind::Plus, 0.1, 0.2), "0.30000000000000004");
    }

    #[test]
    fn smallest_int_divided_by_minus_one_promotes() {
        let arena = Arena::with_capacity(64);
        let min = f64::from(i32::MIN);
        assert_eq!(apply(&arena, TokenKind::Slash, min, -1.0), "2147483648");
        assert_eq!(apply(&arena, TokenKind::Percent, min, -1.0), "0");
        assert_eq!(apply(&arena, TokenKind::Star, min, -1.0), "2147483648");
    }

    #[test]
    fn bitwise_and_shifts() {
        let arena = Arena::with_capacity(64);
        assert_eq!(apply(&arena, TokenKind::Amp, 6.0, 3.0), "2");
        assert_eq!(apply(&arena, TokenKind::Pipe, 6.0, 3.0), "7");
        assert_eq!(apply(&arena, TokenKind::Caret, 6.0, 3.0), "5");
        assert_eq!(apply(&arena, TokenKind::Shl, 1.0, 33.0), "2");
        assert_eq!(apply(&arena, TokenKind::Shr, -8.0, 1.0), "-4");
        assert_eq!(apply(&arena, TokenKind::UShr, -1.0, 0.0), "4294967295");
    }

    #[test]
    fn plus_concatenates_strings() {
        let arena = Arena::with_capacity(64);
        let s = ok(arena.new_string("n="));
        let n = ok(arena.new_int(4));
        assert_eq!(show(&arena, ok(arithmetic(&arena, TokenKind::Plus, Some(&s), Some(&n)))), "n=4");
        assert_eq!(show(&arena, ok(arithmetic(&arena, TokenKind::Plus, Some(&n), Some(&s)))), "4n=");
        assert_eq!(show(&arena, ok(arithmetic(&arena, TokenKind::Plus, Some(&s), None))), "n=undefined");
    }

    #[test]
    fn equality() {
        let arena = Arena::with_capacity(64);
        let one = ok(arena.new_int(1));
        let one_f = ok(arena.new_float(1.0));
        let one_s = ok(arena.new_string("1"));
        let null = ok(arena.new_null());
        let obj = ok(arena.new_object());
        let other = ok(arena.new_object());

        assert!(loose_equals(&arena, Some(&one), Some(&one_s)));
        assert!(!strict_equals(&arena, Some(&one), Some(&one_s)));
        assert!(strict_equals(&arena, Some(&one), Some(&one_f)));
        assert!(loose_equals(&arena, None, Some(&null)));
        assert!(!strict_equals(&arena, None, Some(&null)));
        assert!(strict_equals(&arena, Some(&obj), Some(&obj.clone())));
        assert!(!loose_equals(&arena, Some(&obj), Some(&other)));
    }

    #[test]
    fn comparisons() {
        let arena = Arena::with_capacity(64);
        let a = ok(arena.new_string("apple"));
        let b = ok(arena.new_string("banana"));
        let ten = ok(arena.new_int(10));
        let nine = ok(arena.new_string("9"));
        assert!(compare(&arena, TokenKind::Lt, Some(&a), Some(&b)));
        assert!(compare(&arena, TokenKind::Gt, Some(&ten), Some(&nine)));
        assert!(!compare(&arena, TokenKind::Lt, None, Some(&ten)));
        assert!(!compare(&arena, TokenKind::GtEq, None, Some(&ten)));
    }

    #[test]
    fn unary_operators() {
        let arena = Arena::with_capacity(64);
        let zero = ok(arena.new_int(0));
        let five = ok(arena.new_string("5"));
        assert_eq!(show(&arena, ok(unary(&arena, TokenKind::Minus, Some(&five)))), "-5");
        assert_eq!(show(&arena, ok(unary(&arena, TokenKind::Bang, Some(&zero)))), "true");
        assert_eq!(show(&arena, ok(unary(&arena, TokenKind::Tilde, Some(&zero)))), "-1");
        let neg_zero = ok(unary(&arena, TokenKind::Minus, Some(&zero)));
        assert_eq!(neg_zero.map(|v| v.kind()), Some(VarKind::Float));
        assert_eq!(type_of(None), "undefined");
        assert_eq!(type_of(Some(&five)), "string");
    }
}
