//! Byte cursor with line/column tracking for the XML reader

use crate::error::Pos;

#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Current byte without consuming
    pub fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn starts_with(&self, pattern: &[u8]) -> bool {
        self.remaining().starts_with(pattern)
    }

    pub fn advance(&mut self) {
        if let Some(b) = self.current() {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    pub fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.current() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consume byte if it matches
    pub fn consume(&mut self, expected: u8) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance past the next occurrence of `pattern`, returning the bytes
    /// before it. `None` when the pattern never occurs; the cursor is then
    /// left at end of input.
    pub fn take_until(&mut self, pattern: &[u8]) -> Option<&'a [u8]> {
        let start = self.pos;
        while !self.is_eof() {
            if self.starts_with(pattern) {
                let taken = self.slice_from(start);
                self.advance_by(pattern.len());
                return Some(taken);
            }
            self.advance();
        }
        None
    }

    pub const fn position(&self) -> Pos {
        Pos::new(self.pos, self.line, self.col)
    }

    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Current byte index
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes from `start` up to the current position
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        self.input.get(start..self.pos).unwrap_or_default()
    }
}
