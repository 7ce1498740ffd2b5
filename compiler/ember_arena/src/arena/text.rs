//! String construction, inspection and cursors.

use std::cmp::Ordering;

use super::{Arena, Var};
use crate::errors::ArenaResult;
use crate::strings::StrCursor;
use crate::var_ref::VarKind;

impl Arena {
    pub fn new_string(&self, text: &str) -> ArenaResult<Var<'_>> {
        self.new_string_bytes(text.as_bytes())
    }

    pub fn new_string_bytes(&self, bytes: &[u8]) -> ArenaResult<Var<'_>> {
        let r = self.slots.borrow_mut().new_string(bytes)?;
        Ok(self.adopt(r))
    }

    /// New string holding bytes `start..end` of `src`, clamped to its length.
    pub fn new_string_from_span(
        &self,
        src: &Var<'_>,
        start: usize,
        end: usize,
    ) -> ArenaResult<Var<'_>> {
        let r = self.slots.borrow_mut().string_from_span(src.r, start, end)?;
        Ok(self.adopt(r))
    }

    /// Append text. On failure the string is unchanged.
    pub fn append_str(&self, dst: &Var<'_>, text: &str) -> ArenaResult<()> {
        self.slots.borrow_mut().append_bytes(dst.r, text.as_bytes())
    }

    /// Append bytes `start..end` of string `src`.
    pub fn append_span(
        &self,
        dst: &Var<'_>,
        src: &Var<'_>,
        start: usize,
        end: usize,
    ) -> ArenaResult<()> {
        self.slots.borrow_mut().append_span(dst.r, src.r, start, end)
    }

    /// Append the display form of any value (strings append their content
    /// chunk by chunk).
    pub fn append_display(&self, dst: &Var<'_>, value: Option<&Var<'_>>) -> ArenaResult<()> {
        let mut slots = self.slots.borrow_mut();
        let src = value.and_then(|v| slots.skip_name(v.r));
        if let Some(src) = src.filter(|&s| slots.rec(s).kind == VarKind::String) {
            return slots.append_span(dst.r, src, 0, usize::MAX);
        }
        let mut text = Vec::new();
        slots.write_display(src, &mut text);
        slots.append_bytes(dst.r, &text)
    }

    pub fn is_string(&self, v: &Var<'_>) -> bool {
        self.kind(v) == VarKind::String
    }

    /// Length in bytes. Zero for non-strings.
    pub fn string_len(&self, v: &Var<'_>) -> usize {
        let slots = self.slots.borrow();
        if slots.rec(v.r).kind == VarKind::String {
            slots.string_len(v.r)
        } else {
            0
        }
    }

    /// Byte at `index`, walking the chunk chain.
    pub fn char_at(&self, v: &Var<'_>, index: usize) -> Option<u8> {
        let slots = self.slots.borrow();
        if slots.rec(v.r).kind == VarKind::String {
            slots.char_at(v.r, index)
        } else {
            None
        }
    }

    /// Compare string content against `text`.
    pub fn string_eq_str(&self, v: &Var<'_>, text: &str) -> bool {
        let slots = self.slots.borrow();
        slots.rec(v.r).kind == VarKind::String && slots.string_eq_bytes(v.r, text.as_bytes())
    }

    /// Bytewise ordering of two strings.
    pub fn compare_strings(&self, a: &Var<'_>, b: &Var<'_>) -> Ordering {
        self.slots.borrow().strings_cmp(a.r, b.r)
    }

    /// Copy the string content out, replacing invalid UTF-8.
    pub fn string_to_string(&self, v: &Var<'_>) -> String {
        let mut out = Vec::new();
        self.slots.borrow().string_bytes(v.r, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Copy at most `buf.len()` bytes out; returns the count written.
    pub fn string_to_buf(&self, v: &Var<'_>, buf: &mut [u8]) -> usize {
        self.slots.borrow().fill_buf(v.r, buf)
    }

    // Cursors

    /// Cursor at byte `index` of string `v` (clamped to the end).
    pub fn string_cursor(&self, v: &Var<'_>, index: usize) -> StrCursor {
        self.slots.borrow().cursor_at(v.r, index)
    }

    /// Read and advance. The string the cursor walks must still be locked.
    pub fn cursor_next(&self, cursor: &mut StrCursor) -> Option<u8> {
        self.slots.borrow().cursor_next(cursor)
    }

    pub fn cursor_peek(&self, cursor: &StrCursor) -> Option<u8> {
        self.slots.borrow().cursor_peek(cursor)
    }
}
