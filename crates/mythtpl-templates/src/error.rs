use std::fmt;

use mythtpl_source::Span;
use serde::Serialize;
use thiserror::Error;

use crate::options::Origin;

/// The two block constructs whose nesting is tracked during compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BlockKind {
    Loop,
    Conditional,
}

impl BlockKind {
    #[must_use]
    pub fn open_tag(self) -> &'static str {
        match self {
            BlockKind::Loop => "{loop}",
            BlockKind::Conditional => "{if}",
        }
    }

    #[must_use]
    pub fn close_tag(self) -> &'static str {
        match self {
            BlockKind::Loop => "{/loop}",
            BlockKind::Conditional => "{/if}",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.open_tag())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum TemplateError {
    /// Unclosed Block
    ///
    /// A `{loop}` or `{if}` was still open when the end of the template was
    /// reached. The span points at the innermost opener left open. When both
    /// kinds are open the conditional is reported.
    ///
    /// ```text
    /// {loop="$items"}
    ///   <li>{$value}</li>
    /// ```
    #[error("unclosed {block} tag in {origin}")]
    Unclosed {
        block: BlockKind,
        origin: Origin,
        span: Span,
    },

    /// Unexpected Close
    ///
    /// A `{/loop}` or `{/if}` appeared with no matching opener.
    #[error("unexpected {} in {}: no open {} tag", .block.close_tag(), .origin, .block)]
    UnexpectedClose {
        block: BlockKind,
        origin: Origin,
        span: Span,
    },

    /// Invalid Pattern
    ///
    /// A custom tag was registered with a pattern the regex engine rejects.
    #[error("invalid pattern for custom tag '{name}': {message}")]
    InvalidPattern { name: String, message: String },

    /// Emit Error
    ///
    /// The emitter could not serialize the compiled program.
    #[error("failed to emit compiled template: {0}")]
    Emit(String),
}

impl TemplateError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::Unclosed { .. } => "M100",
            TemplateError::UnexpectedClose { .. } => "M101",
            TemplateError::InvalidPattern { .. } => "M200",
            TemplateError::Emit(_) => "M300",
        }
    }

    /// Location of the offending tag in the template source, if any.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            TemplateError::Unclosed { span, .. } | TemplateError::UnexpectedClose { span, .. } => {
                Some(*span)
            }
            TemplateError::InvalidPattern { .. } | TemplateError::Emit(_) => None,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            TemplateError::Unclosed { origin, .. }
            | TemplateError::UnexpectedClose { origin, .. } => Some(origin),
            TemplateError::InvalidPattern { .. } | TemplateError::Emit(_) => None,
        }
    }
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Emit(err.to_string())
    }
}
