mod position;
mod render;

pub use position::LineCol;
pub use position::LineIndex;
pub use position::Span;
pub use render::Diagnostic;
pub use render::DiagnosticRenderer;
