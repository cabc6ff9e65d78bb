use annotate_snippets::AnnotationKind;
use annotate_snippets::Level;
use annotate_snippets::Renderer;
use annotate_snippets::Snippet;

use crate::Span;

/// A compile error ready for rendering.
///
/// Callers pull the code, message and span out of their error type and build
/// this struct; rendering is delegated to `annotate-snippets`.
#[derive(Debug)]
pub struct Diagnostic<'a> {
    pub source: &'a str,
    pub path: &'a str,
    pub code: &'a str,
    pub message: &'a str,
    pub span: Span,
    pub label: &'a str,
    pub notes: Vec<&'a str>,
}

impl<'a> Diagnostic<'a> {
    #[must_use]
    pub fn new(
        source: &'a str,
        path: &'a str,
        code: &'a str,
        message: &'a str,
        span: Span,
        label: &'a str,
    ) -> Self {
        Self {
            source,
            path,
            code,
            message,
            span,
            label,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: &'a str) -> Self {
        self.notes.push(note);
        self
    }
}

/// Renders diagnostics as plain text (for tests and pipes) or with ANSI styling.
#[derive(Debug)]
pub struct DiagnosticRenderer {
    renderer: Renderer,
}

impl DiagnosticRenderer {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            renderer: Renderer::plain(),
        }
    }

    #[must_use]
    pub fn styled() -> Self {
        Self {
            renderer: Renderer::styled(),
        }
    }

    #[must_use]
    pub fn render(&self, diagnostic: &Diagnostic<'_>) -> String {
        let start = diagnostic.span.start_usize().min(diagnostic.source.len());
        let end = diagnostic.span.end_usize().min(diagnostic.source.len());

        let snippet = Snippet::source(diagnostic.source)
            .path(diagnostic.path)
            .line_start(1)
            .annotation(
                AnnotationKind::Primary
                    .span(start..end)
                    .label(diagnostic.label),
            );

        let mut title = Level::ERROR
            .primary_title(diagnostic.message)
            .id(diagnostic.code)
            .element(snippet);

        for note in &diagnostic.notes {
            title = title.element(Level::NOTE.message(*note));
        }

        let report = &[title];
        self.renderer.render(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> DiagnosticRenderer {
        DiagnosticRenderer::plain()
    }

    #[test]
    fn unclosed_loop() {
        let source = "<ul>\n{loop=\"$items\"}\n<li>{$value}</li>\n</ul>\n";

        let diag = Diagnostic::new(
            source,
            "templates/list.html",
            "M100",
            "unclosed {loop} tag",
            Span::new(5, 15),
            "this loop is never closed",
        );
        let output = plain().render(&diag);

        assert!(output.contains("error[M100]"), "should have error header");
        assert!(output.contains("unclosed {loop} tag"));
        assert!(output.contains("templates/list.html"));
        assert!(output.contains("{loop=\"$items\"}"), "should show source line");
        assert!(output.contains("this loop is never closed"));
        assert!(output.contains("^^^"), "should have underline carets");
    }

    #[test]
    fn notes_follow_the_snippet() {
        let source = "{if=\"$a\"}\n{loop=\"$b\"}\n{/if}\n";

        let diag = Diagnostic::new(
            source,
            "page.html",
            "M100",
            "unclosed {loop} tag",
            Span::new(10, 11),
            "opened here",
        )
        .note("add {/loop} before {/if}");

        let output = plain().render(&diag);

        assert!(output.contains("opened here"));
        assert!(output.contains("note: add {/loop} before {/if}"));
    }

    #[test]
    fn span_past_end_is_clamped() {
        let source = "{if=\"$a\"}";
        let diag = Diagnostic::new(
            source,
            "page.html",
            "M100",
            "unclosed {if} tag",
            Span::new(0, 400),
            "never closed",
        );
        let output = plain().render(&diag);
        assert!(output.contains("never closed"));
    }

    #[test]
    fn styled_produces_ansi() {
        let source = "{loop=\"$a\"}\n";
        let diag = Diagnostic::new(
            source,
            "test.html",
            "M100",
            "unclosed {loop} tag",
            Span::new(0, 11),
            "never closed",
        );
        let output = DiagnosticRenderer::styled().render(&diag);
        assert!(output.contains("\x1b["));

        let output = plain().render(&diag);
        assert!(!output.contains("\x1b["));
    }
}
