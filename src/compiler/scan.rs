//! Comment- and string-aware source scanning.
//!
//! Shared by the import scanner ([`crate::deps`]) and the stylesheet
//! transformer ([`super::transform`]). Both must never interpret directive
//! text inside comments or string literals, so the quoting/commenting
//! rules live in one place.

use thiserror::Error;

/// Lexical scan failures. Carry the line the construct started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated comment (line {0})")]
    UnterminatedComment(u32),

    #[error("unterminated string (line {0})")]
    UnterminatedString(u32),
}

/// Kind of a scanned comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...` to end of line
    Line,
    /// `/* ... */`
    Block,
    /// `/*! ... */` - always preserved in output
    Bang,
}

/// A scanned comment with its inner text (delimiters stripped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment<'a> {
    pub kind: CommentKind,
    pub text: &'a str,
}

/// Character cursor over stylesheet source with line tracking.
///
/// Positions are byte offsets into the source, always on UTF-8 boundaries.
/// Cloning is cheap and used for speculative matches.
#[derive(Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Current 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Character after the next one.
    pub fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    /// Next character `byte_off` bytes past the cursor.
    ///
    /// The offset must land on a character boundary (always true after
    /// skipping an ASCII keyword).
    pub fn peek_ahead(&self, byte_off: usize) -> Option<char> {
        self.src.get(self.pos + byte_off..)?.chars().next()
    }

    /// Consume and return the next character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Check whether the remaining input starts with `s`.
    pub fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    /// Consume `n` characters.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Consume whitespace.
    pub fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Slice of the source between two byte offsets.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }

    /// Whether the cursor is at the start of a comment.
    pub fn at_comment(&self) -> bool {
        self.peek() == Some('/') && matches!(self.peek_second(), Some('/') | Some('*'))
    }

    /// Consume a comment. The cursor must be at `//` or `/*`.
    pub fn take_comment(&mut self) -> Result<Comment<'a>, ScanError> {
        let line = self.line;

        if self.starts_with("//") {
            self.advance(2);
            let start = self.pos;
            while self.peek().is_some_and(|c| c != '\n') {
                self.bump();
            }
            return Ok(Comment {
                kind: CommentKind::Line,
                text: self.slice(start, self.pos),
            });
        }

        debug_assert!(self.starts_with("/*"));
        self.advance(2);
        let kind = if self.peek() == Some('!') {
            self.bump();
            CommentKind::Bang
        } else {
            CommentKind::Block
        };

        let start = self.pos;
        while !self.is_eof() {
            if self.starts_with("*/") {
                let text = self.slice(start, self.pos);
                self.advance(2);
                return Ok(Comment { kind, text });
            }
            self.bump();
        }
        Err(ScanError::UnterminatedComment(line))
    }

    /// Consume a string literal, returning it with its quotes.
    ///
    /// The cursor must be at `"` or `'`. A raw newline inside the string is
    /// treated as unterminated; escaped characters (including escaped
    /// newlines) are consumed blindly.
    pub fn take_string(&mut self) -> Result<&'a str, ScanError> {
        let line = self.line;
        let start = self.pos;
        let quote = self.bump().unwrap_or('"');

        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' => return Err(ScanError::UnterminatedString(line)),
                c if c == quote => return Ok(self.slice(start, self.pos)),
                _ => {}
            }
        }
        Err(ScanError::UnterminatedString(line))
    }
}

// ============================================================================
// Tests
// ============================================================================
