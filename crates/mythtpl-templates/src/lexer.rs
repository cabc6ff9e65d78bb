use std::borrow::Cow;

use mythtpl_source::Span;

use crate::tokens::Token;

const TAG_START: u8 = b'{';
const TAG_END: u8 = b'}';
const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &str = "-->";

/// Replace every `\r\n` with `\n`. Borrows when there is nothing to replace.
#[must_use]
pub fn normalize_line_endings(source: &str) -> Cow<'_, str> {
    if source.contains("\r\n") {
        Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Splits template source into literal text and tag candidates.
///
/// A candidate starts at `{`, needs at least one character that is neither a
/// quote nor `}`, may contain balanced quoted strings (which can hold `}`),
/// and ends at the first unquoted `}`. A `{` that cannot start a complete
/// candidate stays part of the surrounding literal text.
pub struct Lexer<'src> {
    source: &'src str,
    strip_comments: bool,
    start: usize,
    current: usize,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str, strip_comments: bool) -> Self {
        Lexer {
            source,
            strip_comments,
            start: 0,
            current: 0,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            if self.strip_comments && self.rest().starts_with(COMMENT_START) {
                if let Some(end) = self.comment_end() {
                    self.flush_literal(&mut tokens);
                    tokens.push(Token::Comment {
                        text: &self.source[self.current..end],
                        span: Span::from_bounds(self.current, end),
                    });
                    self.current = end;
                    self.start = end;
                    continue;
                }
            }

            if self.peek() == Some(TAG_START) {
                if let Some(end) = self.candidate_end() {
                    self.flush_literal(&mut tokens);
                    tokens.push(Token::Candidate {
                        text: &self.source[self.current..end],
                        span: Span::from_bounds(self.current, end),
                    });
                    self.current = end;
                    self.start = end;
                    continue;
                }
            }

            // Delimiters are ASCII, so stepping a byte at a time never splits
            // a token inside a multi-byte character.
            self.current += 1;
        }

        self.flush_literal(&mut tokens);
        tokens
    }

    fn flush_literal(&mut self, tokens: &mut Vec<Token<'src>>) {
        if self.start < self.current {
            tokens.push(Token::Literal {
                text: &self.source[self.start..self.current],
                span: Span::from_bounds(self.start, self.current),
            });
        }
        self.start = self.current;
    }

    fn comment_end(&self) -> Option<usize> {
        let body = self.current + COMMENT_START.len();
        self.source[body..]
            .find(COMMENT_END)
            .map(|idx| body + idx + COMMENT_END.len())
    }

    fn candidate_end(&self) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut pos = self.current + 1;

        match bytes.get(pos) {
            None | Some(b'"' | b'\'' | &TAG_END) => return None,
            Some(_) => pos += 1,
        }

        while let Some(&byte) = bytes.get(pos) {
            match byte {
                TAG_END => return Some(pos + 1),
                b'"' | b'\'' => {
                    let close = self.source[pos + 1..].find(char::from(byte))?;
                    pos += close + 2;
                }
                _ => pos += 1,
            }
        }

        None
    }

    /// Remaining input as bytes. `current` may sit inside a multi-byte
    /// character, so this must not slice the `str`.
    #[inline]
    fn rest(&self) -> &'src [u8] {
        &self.source.as_bytes()[self.current..]
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}
