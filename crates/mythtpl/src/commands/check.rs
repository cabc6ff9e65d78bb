use std::io::IsTerminal;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;
use mythtpl_source::Diagnostic;
use mythtpl_source::DiagnosticRenderer;
use mythtpl_templates::normalize_line_endings;
use mythtpl_templates::BlockKind;
use mythtpl_templates::Compiler;
use mythtpl_templates::TemplateError;

use crate::args::Args;
use crate::commands::load_host;
use crate::commands::Command;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Check {
    /// Template files to check.
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,
}

impl Command for Check {
    fn execute(&self, args: &Args) -> Result<Exit> {
        let host = load_host(args)?;
        let renderer = pick_renderer();

        let mut error_count: usize = 0;
        for path in &self.paths {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {path}"))?;
            if let Some(rendered) = check_source(host.compiler(), path, &source, &renderer) {
                println!("{rendered}\n");
                error_count += 1;
            }
        }

        if error_count > 0 {
            let file_word = if error_count == 1 { "file" } else { "files" };
            Ok(Exit::error().with_message(format!(
                "Found errors in {error_count} {file_word}."
            )))
        } else {
            Ok(Exit::success())
        }
    }
}

/// Compile `source` and render its syntax error, if any.
fn check_source(
    compiler: &Compiler,
    path: &Utf8Path,
    source: &str,
    renderer: &DiagnosticRenderer,
) -> Option<String> {
    let directory = match path.parent().map(Utf8Path::as_str) {
        Some("") | None => String::new(),
        Some(parent) => format!("{}/", parent.trim_end_matches('/')),
    };
    let err = compiler
        .compile_file(source, &directory, path.as_str())
        .err()?;
    Some(render_error(&err, path, source, renderer))
}

fn render_error(
    err: &TemplateError,
    path: &Utf8Path,
    source: &str,
    renderer: &DiagnosticRenderer,
) -> String {
    let message = err.to_string();
    let Some(span) = err.span() else {
        return format!("error[{}]: {message}", err.code());
    };

    let label = match err {
        TemplateError::Unclosed { block, .. } => match block {
            BlockKind::Loop => "this {loop} is never closed",
            BlockKind::Conditional => "this {if} is never closed",
        },
        _ => "no matching opener",
    };
    let note = match err {
        TemplateError::Unclosed { block, .. } => Some(format!("add {}", block.close_tag())),
        _ => None,
    };

    let source = normalize_line_endings(source);
    let mut diagnostic = Diagnostic::new(
        &source,
        path.as_str(),
        err.code(),
        &message,
        span,
        label,
    );
    if let Some(note) = &note {
        diagnostic = diagnostic.note(note);
    }
    renderer.render(&diagnostic)
}

fn pick_renderer() -> DiagnosticRenderer {
    if std::io::stdout().is_terminal() {
        DiagnosticRenderer::styled()
    } else {
        DiagnosticRenderer::plain()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mythtpl_templates::CompileOptions;
    use mythtpl_templates::TagRegistry;

    use super::*;

    fn compiler() -> Compiler {
        Compiler::new(CompileOptions::default(), Arc::new(TagRegistry::new()))
    }

    #[test]
    fn clean_template_has_no_diagnostic() {
        let rendered = check_source(
            &compiler(),
            Utf8Path::new("templates/ok.html"),
            "{loop=\"$a\"}{$value}{/loop}",
            &DiagnosticRenderer::plain(),
        );
        assert!(rendered.is_none());
    }

    #[test]
    fn unclosed_loop_is_rendered() {
        let rendered = check_source(
            &compiler(),
            Utf8Path::new("templates/list.html"),
            "<ul>\n{loop=\"$items\"}\n</ul>\n",
            &DiagnosticRenderer::plain(),
        )
        .unwrap();
        assert!(rendered.contains("error[M100]"));
        assert!(rendered.contains("templates/list.html"));
        assert!(rendered.contains("this {loop} is never closed"));
        assert!(rendered.contains("add {/loop}"));
    }

    #[test]
    fn stray_close_is_rendered() {
        let rendered = check_source(
            &compiler(),
            Utf8Path::new("page.html"),
            "a\r\n{/if}",
            &DiagnosticRenderer::plain(),
        )
        .unwrap();
        assert!(rendered.contains("error[M101]"));
        assert!(rendered.contains("no matching opener"));
    }
}
