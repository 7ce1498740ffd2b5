//! Typed accessors and value-to-text conversion.
//!
//! Conversions follow script semantics: strings parse as numbers, empty
//! strings are falsy, containers are truthy. A name converts as the value it
//! holds. `undefined` is not a record, so callers handle it before reaching
//! these helpers.

use crate::record::Payload;
use crate::slots::Slots;
use crate::var_ref::{VarFlags, VarKind, VarRef};

/// Longest string that is parsed as a number. Longer strings are `NaN`.
const MAX_NUMERIC_TEXT: usize = 64;

/// Parse script numeric text: optional sign, decimal with fraction and
/// exponent, `0x`/`0o`/`0b` integers, or `Infinity`. Surrounding whitespace
/// is ignored and the empty string is zero. Returns `None` for anything else.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    let (negative, body) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if body == "Infinity" {
        f64::INFINITY
    } else if let Some(radix) = radix_prefix(body) {
        let digits = &body[2..];
        if digits.is_empty() {
            return None;
        }
        let mut value = 0.0f64;
        for c in digits.chars() {
            value = value * f64::from(radix) + f64::from(c.to_digit(radix)?);
        }
        value
    } else {
        let numeric = body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
        if !numeric || !body.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse::<f64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn radix_prefix(body: &str) -> Option<u32> {
    let bytes = body.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }
    match bytes[1] {
        b'x' | b'X' => Some(16),
        b'o' | b'O' => Some(8),
        b'b' | b'B' => Some(2),
        _ => None,
    }
}

/// Format a number the way scripts print it: `NaN`, `Infinity`, integral
/// values without a fraction, exponent notation for very large or small
/// magnitudes.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{value:e}");
        // `1e21` in Rust, `1e+21` in script output.
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        };
    }
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    format!("{value}")
}

/// Truncate a float to a 32-bit integer with wrap-around, as bitwise
/// operators do. `NaN` and infinities become zero.
pub fn float_to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let truncated = value.trunc();
    let wrapped = truncated.rem_euclid(4_294_967_296.0);
    (wrapped as u32) as i32
}

impl Slots {
    /// Follow a name to its value. Non-names are returned unchanged.
    pub(crate) fn skip_name(&self, r: VarRef) -> Option<VarRef> {
        if self.rec(r).is_name() {
            self.rec(r).first_child
        } else {
            Some(r)
        }
    }

    pub(crate) fn as_float(&self, r: VarRef) -> f64 {
        let Some(r) = self.skip_name(r) else {
            return f64::NAN;
        };
        let rec = self.rec(r);
        match (rec.kind, rec.payload) {
            (VarKind::Int, Payload::Int(i)) => f64::from(i),
            (VarKind::Float, Payload::Float(f)) => f,
            (VarKind::Bool, Payload::Bool(b)) => f64::from(u8::from(b)),
            (VarKind::Null, _) => 0.0,
            (VarKind::String, _) => self.string_to_number(r),
            (VarKind::Array, _) => self.array_to_number(r),
            _ => f64::NAN,
        }
    }

    pub(crate) fn as_int(&self, r: VarRef) -> i32 {
        let Some(v) = self.skip_name(r) else {
            return 0;
        };
        match self.rec(v).payload {
            Payload::Int(i) if self.rec(v).kind == VarKind::Int => i,
            _ => float_to_int32(self.as_float(v)),
        }
    }

    pub(crate) fn as_bool(&self, r: VarRef) -> bool {
        let Some(r) = self.skip_name(r) else {
            return false;
        };
        let rec = self.rec(r);
        match (rec.kind, rec.payload) {
            (VarKind::Int, Payload::Int(i)) => i != 0,
            (VarKind::Float, Payload::Float(f)) => f != 0.0 && !f.is_nan(),
            (VarKind::Bool, Payload::Bool(b)) => b,
            (VarKind::Null, _) => false,
            (VarKind::String, _) => self.string_len(r) > 0,
            _ => true,
        }
    }

    fn string_to_number(&self, r: VarRef) -> f64 {
        if self.string_len(r) > MAX_NUMERIC_TEXT {
            return f64::NAN;
        }
        let mut buf = [0u8; MAX_NUMERIC_TEXT];
        let n = self.fill_buf(r, &mut buf);
        std::str::from_utf8(&buf[..n])
            .ok()
            .and_then(parse_number)
            .unwrap_or(f64::NAN)
    }

    /// `[]` is 0, `[x]` converts as `x`, anything longer is `NaN`.
    fn array_to_number(&self, r: VarRef) -> f64 {
        match self.array_len(r) {
            0 => 0.0,
            1 => self
                .find_child_int(r, 0)
                .and_then(|n| self.rec(n).first_child)
                .map_or(0.0, |v| {
                    if self.rec(v).kind.is_container() {
                        f64::NAN
                    } else {
                        self.as_float(v)
                    }
                }),
            _ => f64::NAN,
        }
    }

    /// Append the display form of `r` to `out`.
    ///
    /// Arrays print their elements joined by commas; a nested reference back
    /// to an array already being printed prints as empty.
    pub(crate) fn write_display(&mut self, r: Option<VarRef>, out: &mut Vec<u8>) {
        let Some(r) = r.and_then(|r| self.skip_name(r)) else {
            out.extend_from_slice(b"undefined");
            return;
        };
        let rec = *self.rec(r);
        match (rec.kind, rec.payload) {
            (VarKind::Int, Payload::Int(i)) => out.extend_from_slice(i.to_string().as_bytes()),
            (VarKind::Float, Payload::Float(f)) => {
                out.extend_from_slice(format_number(f).as_bytes());
            }
            (VarKind::Bool, Payload::Bool(b)) => {
                out.extend_from_slice(if b { "true" } else { "false" }.as_bytes());
            }
            (VarKind::Null, _) => out.extend_from_slice(b"null"),
            (VarKind::String, _) => self.string_bytes(r, out),
            (VarKind::Array, _) => {
                if rec.flags.contains(VarFlags::RECURSING) {
                    return;
                }
                self.rec_mut(r).flags.insert(VarFlags::RECURSING);
                let len = self.array_len(r);
                for i in 0..len {
                    if i > 0 {
                        out.push(b',');
                    }
                    let value = self.find_child_int(r, i).and_then(|n| self.rec(n).first_child);
                    let printable = value.filter(|&v| self.rec(v).kind != VarKind::Null);
                    if printable.is_some() {
                        self.write_display(printable, out);
                    }
                }
                self.rec_mut(r).flags.remove(VarFlags::RECURSING);
            }
            (kind, _) if kind.is_function() => out.extend_from_slice(b"function"),
            _ => out.extend_from_slice(b"[object Object]"),
        }
    }
}
