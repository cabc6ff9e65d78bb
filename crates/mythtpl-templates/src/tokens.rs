use mythtpl_source::Span;
use serde::Serialize;

/// One slice of template source produced by the [`Lexer`](crate::Lexer).
///
/// Concatenating the `text` of every token in order reproduces the source
/// exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Token<'src> {
    /// Plain text between tag candidates.
    Literal { text: &'src str, span: Span },
    /// A brace-delimited `{...}` region that may be a tag.
    Candidate { text: &'src str, span: Span },
    /// An HTML comment, produced only when comment stripping is enabled.
    Comment { text: &'src str, span: Span },
}

impl<'src> Token<'src> {
    #[must_use]
    pub fn text(&self) -> &'src str {
        match self {
            Token::Literal { text, .. }
            | Token::Candidate { text, .. }
            | Token::Comment { text, .. } => text,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Token::Literal { span, .. }
            | Token::Candidate { span, .. }
            | Token::Comment { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn is_candidate(&self) -> bool {
        matches!(self, Token::Candidate { .. })
    }
}
