//! Text normalization and line-oriented reading of directory documents
//!
//! The published directories are code page 437 text. Box-drawing characters are
//! mapped to ASCII before decoding so the line shapes only ever see `-`, `+`
//! and `|`.

use std::iter::Peekable;
use std::str::Lines;

/// Map the legacy box-drawing bytes onto their ASCII look-alikes
pub fn translate_pseudo_graphics(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        match *byte {
            0xC4 => *byte = b'-',
            0xC1 | 0xBF | 0xD9 => *byte = b'+',
            0xB3 => *byte = b'|',
            _ => {}
        }
    }
}

/// Normalize raw document bytes into text.
///
/// Box-drawing bytes are translated first; the result is decoded as UTF-8 when
/// valid, otherwise one char per byte (Latin-1).
///
/// Input is assumed to be the published CP437/ASCII text. UTF-8 documents
/// with multi-byte characters containing 0xB3, 0xBF or 0xC4 are altered by
/// the translation.
pub fn decode(bytes: &[u8]) -> String {
    let mut bytes = bytes.to_vec();
    translate_pseudo_graphics(&mut bytes);
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// A line consisting only of whitespace
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The `-----` rule separating records in the definition directories
pub fn is_record_separator(line: &str) -> bool {
    let line = line.trim_end();
    !line.is_empty() && line.bytes().all(|b| b == b'-')
}

/// Forward-only cursor over the lines of a document, tracking line numbers
pub struct LineCursor<'a> {
    lines: Peekable<Lines<'a>>,
    line_number: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().peekable(),
            line_number: 0,
        }
    }

    /// 1-based number of the line most recently returned by [`next_line`](Self::next_line)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line)
    }

    pub fn peek(&mut self) -> Option<&'a str> {
        self.lines.peek().copied()
    }

    /// Skip blank lines without consuming the first non-blank one
    pub fn skip_blank(&mut self) {
        while self.peek().is_some_and(is_blank) {
            self.next_line();
        }
    }

    /// Next non-blank line, or `None` at end of input
    pub fn next_non_blank(&mut self) -> Option<&'a str> {
        self.skip_blank();
        self.next_line()
    }

    /// Consume lines up to and including the first one satisfying `predicate`
    pub fn find(&mut self, predicate: impl Fn(&str) -> bool) -> Option<&'a str> {
        while let Some(line) = self.next_line() {
            if predicate(line) {
                return Some(line);
            }
        }
        None
    }
}
