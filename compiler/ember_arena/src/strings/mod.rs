//! Chunked string storage.
//!
//! A string is a head record (kind `String`) holding up to
//! [`crate::STRING_CHARS`] bytes, continued through `last_child` into
//! extension chunks of [`crate::STRING_EXT_CHARS`] bytes each. Every
//! operation here walks the chain in place; nothing materializes the whole
//! string unless the caller asks for a copy.

use crate::errors::{ArenaError, ArenaResult};
use crate::slots::Slots;
use crate::var_ref::{VarKind, VarRef};
use crate::{STRING_CHARS, STRING_EXT_CHARS};

/// Resumable read position inside a chunked string.
///
/// The cursor stores only indices; it must be advanced through the arena that
/// owns the string, and is invalidated if that string is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrCursor {
    chunk: Option<VarRef>,
    offset: usize,
    index: usize,
}

impl StrCursor {
    /// Absolute byte index of the next byte to be read.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Number of extension chunks needed to hold `extra` bytes beyond the head.
pub(crate) fn chunks_for(extra: usize) -> usize {
    extra.div_ceil(STRING_EXT_CHARS)
}

impl Slots {
    pub(crate) fn ensure_string(&self, r: VarRef) -> ArenaResult<()> {
        if self.rec(r).kind == VarKind::String {
            Ok(())
        } else {
            Err(ArenaError::NotAString)
        }
    }

    /// Allocate a string holding `bytes` (locked).
    pub(crate) fn new_string(&mut self, bytes: &[u8]) -> ArenaResult<VarRef> {
        let extra = bytes.len().saturating_sub(STRING_CHARS);
        if 1 + chunks_for(extra) > self.free_count() {
            return Err(ArenaError::OutOfMemory {
                capacity: self.capacity(),
            });
        }
        let head = self.alloc(VarKind::String)?;
        if let Err(err) = self.append_at_tail(head, bytes) {
            self.unlock(head);
            return Err(err);
        }
        Ok(head)
    }

    /// The chunk after `r` in its chain. Non-string records have none.
    #[inline]
    fn next_chunk(&self, r: VarRef) -> Option<VarRef> {
        let rec = self.rec(r);
        if rec.kind.char_capacity() > 0 {
            rec.last_child
        } else {
            None
        }
    }

    fn chunk_bytes(&self, r: VarRef) -> &[u8] {
        self.rec(r).chars().map_or(&[], |c| c.as_bytes())
    }

    fn tail_chunk(&self, head: VarRef) -> VarRef {
        let mut tail = head;
        while let Some(next) = self.next_chunk(tail) {
            tail = next;
        }
        tail
    }

    /// Total length in bytes, walking the chain.
    pub(crate) fn string_len(&self, head: VarRef) -> usize {
        let mut len = 0;
        let mut chunk = Some(head);
        while let Some(c) = chunk {
            len += self.chunk_bytes(c).len();
            chunk = self.next_chunk(c);
        }
        len
    }

    /// Byte at `index`, or `None` past the end.
    pub(crate) fn char_at(&self, head: VarRef, mut index: usize) -> Option<u8> {
        let mut chunk = Some(head);
        while let Some(c) = chunk {
            let bytes = self.chunk_bytes(c);
            if index < bytes.len() {
                return Some(bytes[index]);
            }
            index -= bytes.len();
            chunk = self.next_chunk(c);
        }
        None
    }

    /// Append `bytes` to the string at `head`. Either the whole append
    /// succeeds or nothing changes.
    pub(crate) fn append_bytes(&mut self, head: VarRef, bytes: &[u8]) -> ArenaResult<()> {
        self.ensure_string(head)?;
        let tail = self.tail_chunk(head);
        let room = self.room(tail);
        let needed = chunks_for(bytes.len().saturating_sub(room));
        if needed > self.free_count() {
            return Err(ArenaError::OutOfMemory {
                capacity: self.capacity(),
            });
        }
        self.append_at_tail(tail, bytes)?;
        Ok(())
    }

    fn room(&self, chunk: VarRef) -> usize {
        let rec = self.rec(chunk);
        rec.kind.char_capacity() - rec.chars().map_or(0, |c| usize::from(c.len))
    }

    /// Fill `tail` and then as many fresh chunks as needed. The caller has
    /// already checked that enough records are free. Returns the new tail.
    fn append_at_tail(&mut self, mut tail: VarRef, mut bytes: &[u8]) -> ArenaResult<VarRef> {
        loop {
            let room = self.room(tail);
            let take = room.min(bytes.len());
            if take > 0 {
                if let Some(chars) = self.rec_mut(tail).chars_mut() {
                    let start = usize::from(chars.len);
                    chars.buf[start..start + take].copy_from_slice(&bytes[..take]);
                    chars.len += take as u8;
                }
                bytes = &bytes[take..];
            }
            if bytes.is_empty() {
                return Ok(tail);
            }
            let chunk = self.alloc_chunk()?;
            self.rec_mut(tail).last_child = Some(chunk);
            tail = chunk;
        }
    }

    /// Append bytes `start..end` of string `src` onto string `dst`.
    pub(crate) fn append_span(
        &mut self,
        dst: VarRef,
        src: VarRef,
        start: usize,
        end: usize,
    ) -> ArenaResult<()> {
        self.ensure_string(dst)?;
        self.ensure_string(src)?;
        let end = end.min(self.string_len(src));
        let start = start.min(end);
        let mut tail = self.tail_chunk(dst);
        let needed = chunks_for((end - start).saturating_sub(self.room(tail)));
        if needed > self.free_count() {
            return Err(ArenaError::OutOfMemory {
                capacity: self.capacity(),
            });
        }
        let mut cursor = self.cursor_at(src, start);
        let mut piece = [0u8; STRING_EXT_CHARS];
        let mut remaining = end - start;
        while remaining > 0 {
            let n = remaining.min(piece.len());
            for slot in piece.iter_mut().take(n) {
                *slot = self.cursor_next(&mut cursor).unwrap_or(b' ');
            }
            tail = self.append_at_tail(tail, &piece[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// New string holding bytes `start..end` of `src` (locked).
    pub(crate) fn string_from_span(
        &mut self,
        src: VarRef,
        start: usize,
        end: usize,
    ) -> ArenaResult<VarRef> {
        let head = self.new_string(&[])?;
        if let Err(err) = self.append_span(head, src, start, end) {
            self.unlock(head);
            return Err(err);
        }
        Ok(head)
    }

    /// Copy the whole string out.
    pub(crate) fn string_bytes(&self, head: VarRef, out: &mut Vec<u8>) {
        let mut chunk = Some(head);
        while let Some(c) = chunk {
            out.extend_from_slice(self.chunk_bytes(c));
            chunk = self.next_chunk(c);
        }
    }

    /// Copy as much of the string as fits into `buf`; returns bytes written.
    pub(crate) fn fill_buf(&self, head: VarRef, buf: &mut [u8]) -> usize {
        let mut written = 0;
        let mut chunk = Some(head);
        while let Some(c) = chunk {
            let bytes = self.chunk_bytes(c);
            let take = bytes.len().min(buf.len() - written);
            buf[written..written + take].copy_from_slice(&bytes[..take]);
            written += take;
            if written == buf.len() {
                break;
            }
            chunk = self.next_chunk(c);
        }
        written
    }

    /// Compare a chunked string against plain bytes.
    pub(crate) fn string_eq_bytes(&self, head: VarRef, other: &[u8]) -> bool {
        let mut rest = other;
        let mut chunk = Some(head);
        while let Some(c) = chunk {
            let bytes = self.chunk_bytes(c);
            if bytes.len() > rest.len() || &rest[..bytes.len()] != bytes {
                return false;
            }
            rest = &rest[bytes.len()..];
            chunk = self.next_chunk(c);
        }
        rest.is_empty()
    }

    /// Compare two chunked strings without materializing either. Chunk
    /// boundaries of the two chains need not line up.
    pub(crate) fn strings_eq(&self, a: VarRef, b: VarRef) -> bool {
        if a == b {
            return true;
        }
        let mut ca = self.cursor_at(a, 0);
        let mut cb = self.cursor_at(b, 0);
        loop {
            match (self.cursor_next(&mut ca), self.cursor_next(&mut cb)) {
                (None, None) => return true,
                (Some(x), Some(y)) if x == y => {}
                _ => return false,
            }
        }
    }

    /// Lexicographic byte comparison of two chunked strings.
    pub(crate) fn strings_cmp(&self, a: VarRef, b: VarRef) -> std::cmp::Ordering {
        let mut ca = self.cursor_at(a, 0);
        let mut cb = self.cursor_at(b, 0);
        loop {
            match (self.cursor_next(&mut ca), self.cursor_next(&mut cb)) {
                (None, None) => return std::cmp::Ordering::Equal,
                (None, Some(_)) => return std::cmp::Ordering::Less,
                (Some(_), None) => return std::cmp::Ordering::Greater,
                (Some(x), Some(y)) if x != y => return x.cmp(&y),
                _ => {}
            }
        }
    }

    // Cursors

    /// Cursor positioned at byte `index` of `head`, clamped to the end.
    pub(crate) fn cursor_at(&self, head: VarRef, index: usize) -> StrCursor {
        let mut skipped = 0;
        let mut chunk = head;
        loop {
            let len = self.chunk_bytes(chunk).len();
            if index - skipped < len {
                return StrCursor {
                    chunk: Some(chunk),
                    offset: index - skipped,
                    index,
                };
            }
            match self.next_chunk(chunk) {
                Some(next) => {
                    skipped += len;
                    chunk = next;
                }
                None => {
                    return StrCursor {
                        chunk: Some(chunk),
                        offset: len,
                        index: skipped + len,
                    }
                }
            }
        }
    }

    /// Read the byte under the cursor and advance.
    pub(crate) fn cursor_next(&self, cursor: &mut StrCursor) -> Option<u8> {
        loop {
            let chunk = cursor.chunk?;
            let bytes = self.chunk_bytes(chunk);
            if cursor.offset < bytes.len() {
                let b = bytes[cursor.offset];
                cursor.offset += 1;
                cursor.index += 1;
                return Some(b);
            }
            let next = self.next_chunk(chunk)?;
            cursor.chunk = Some(next);
            cursor.offset = 0;
        }
    }

    /// Read the byte under the cursor without advancing.
    pub(crate) fn cursor_peek(&self, cursor: &StrCursor) -> Option<u8> {
        let mut copy = *cursor;
        self.cursor_next(&mut copy)
    }
}
