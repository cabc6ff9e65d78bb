use std::sync::Arc;

use mythtpl_source::LineCol;
use mythtpl_source::LineIndex;
use mythtpl_source::Span;
use regex::Captures;

use crate::error::BlockKind;
use crate::error::TemplateError;
use crate::expression::compose_modifiers;
use crate::expression::rewrite;
use crate::expression::Expr;
use crate::instructions::IncludeTarget;
use crate::instructions::Instruction;
use crate::instructions::Loop;
use crate::instructions::LoopSource;
use crate::instructions::Program;
use crate::lexer::normalize_line_endings;
use crate::lexer::Lexer;
use crate::options::CompileOptions;
use crate::options::Origin;
use crate::paths::reduce_path;
use crate::registry::TagRegistry;
use crate::tagspecs::TagKind;
use crate::tagspecs::TagMatchers;
use crate::tokens::Token;

const RAW_CODE_NOTICE: &str = "{php} tag detected but not enabled";
const RAW_CODE_CLOSE_NOTICE: &str = "{/php} tag detected but not enabled";

/// Turns template source into a [`Program`].
///
/// A compiler is cheap to share: it holds its options, a handle to the
/// custom tag registry and a reference to the process-wide tag matchers.
/// All per-template state lives in a [`CompileState`] created for each call.
#[derive(Debug)]
pub struct Compiler {
    options: CompileOptions,
    registry: Arc<TagRegistry>,
    matchers: &'static TagMatchers,
}

/// Block bookkeeping for one compilation.
#[derive(Debug)]
struct CompileState {
    /// Spans of the open `{loop}` tags; the loop depth is the length.
    loops: Vec<Span>,
    conditionals: Vec<Span>,
    no_parse: bool,
    ignore: bool,
    raw_code: bool,
    default_escape: bool,
    escape_policy: Vec<bool>,
    lines: LineIndex,
}

impl CompileState {
    fn new(default_escape: bool, source: &str) -> Self {
        Self {
            loops: Vec::new(),
            conditionals: Vec::new(),
            no_parse: false,
            ignore: false,
            raw_code: false,
            default_escape,
            escape_policy: Vec::new(),
            lines: LineIndex::from_text(source),
        }
    }

    fn position(&self, span: Span) -> LineCol {
        self.lines.position(span)
    }

    fn loop_level(&self) -> usize {
        self.loops.len()
    }

    fn auto_escape(&self) -> bool {
        self.escape_policy
            .last()
            .copied()
            .unwrap_or(self.default_escape)
    }

    fn finish(&self, origin: &Origin) -> Result<(), TemplateError> {
        if let Some(span) = self.conditionals.last() {
            return Err(TemplateError::Unclosed {
                block: BlockKind::Conditional,
                origin: origin.clone(),
                span: *span,
            });
        }
        if let Some(span) = self.loops.last() {
            return Err(TemplateError::Unclosed {
                block: BlockKind::Loop,
                origin: origin.clone(),
                span: *span,
            });
        }
        Ok(())
    }
}

impl Compiler {
    #[must_use]
    pub fn new(options: CompileOptions, registry: Arc<TagRegistry>) -> Self {
        let matchers = TagMatchers::get(options.case_insensitive_tags);
        Self {
            options,
            registry,
            matchers,
        }
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Compile a template read from `path`, which lives in `directory`.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] naming `path` when a block is left open or
    /// closed without being opened.
    pub fn compile_file(
        &self,
        source: &str,
        directory: &str,
        path: &str,
    ) -> Result<Program, TemplateError> {
        self.compile(source, &Origin::file(directory, path))
    }

    /// Compile an in-memory template. Errors name the file and line of the
    /// code that called this method.
    ///
    /// # Errors
    ///
    /// See [`Compiler::compile_file`].
    #[track_caller]
    pub fn compile_string(&self, source: &str) -> Result<Program, TemplateError> {
        let origin = Origin::caller();
        self.compile(source, &origin)
    }

    /// # Errors
    ///
    /// See [`Compiler::compile_file`].
    pub fn compile(&self, source: &str, origin: &Origin) -> Result<Program, TemplateError> {
        let source = normalize_line_endings(source);
        let tokens = Lexer::new(&source, self.options.strip_comments).tokenize();

        let mut state = CompileState::new(self.options.auto_escape, &source);
        let mut program = Program::default();

        for token in &tokens {
            match token {
                Token::Comment { .. } => {}
                Token::Literal { text, .. } => {
                    if !state.ignore {
                        program.push(Instruction::Text((*text).to_string()));
                    }
                }
                Token::Candidate { text, span } => {
                    self.compile_candidate(text, *span, &mut state, origin, &mut program)?;
                }
            }
        }

        state.finish(origin)?;

        tracing::debug!(
            "compiled {}: {} tokens, {} instructions",
            origin,
            tokens.len(),
            program.len()
        );

        Ok(program)
    }

    fn compile_candidate(
        &self,
        text: &str,
        span: Span,
        state: &mut CompileState,
        origin: &Origin,
        program: &mut Program,
    ) -> Result<(), TemplateError> {
        let matchers = self.matchers;

        if !state.no_parse && matchers.is_match(TagKind::RawCodeClose, text) {
            if !self.options.allow_raw_code {
                state.ignore = false;
                program.push(Instruction::Notice(RAW_CODE_CLOSE_NOTICE.to_string()));
                return Ok(());
            }
            if state.raw_code {
                state.raw_code = false;
                program.push(Instruction::RawCodeClose);
                return Ok(());
            }
        }

        if !state.no_parse && matchers.is_match(TagKind::IgnoreClose, text) {
            state.ignore = false;
            return Ok(());
        }

        if state.ignore {
            return Ok(());
        }

        if matchers.is_match(TagKind::NoParseClose, text) {
            state.no_parse = false;
            return Ok(());
        }

        if state.no_parse || state.raw_code {
            program.push(Instruction::Text(text.to_string()));
            return Ok(());
        }

        let Some((kind, captures)) = matchers.classify(text) else {
            self.compile_custom_tags(text, program);
            return Ok(());
        };

        let level = state.loop_level();

        match kind {
            TagKind::Ignore => state.ignore = true,
            TagKind::NoParse => state.no_parse = true,
            TagKind::RawCode => {
                if self.options.allow_raw_code {
                    state.raw_code = true;
                    program.push(Instruction::RawCodeOpen);
                } else {
                    state.ignore = true;
                    program.push(Instruction::Notice(RAW_CODE_NOTICE.to_string()));
                }
            }
            TagKind::Include => {
                let target = self.include_target(group(&captures, 1), origin, level);
                program.push(Instruction::Include(target));
            }
            TagKind::Loop => {
                state.loops.push(span);
                program.push(Instruction::LoopOpen(loop_header(&captures, state.loop_level())));
            }
            TagKind::LoopClose => {
                if state.loops.pop().is_none() {
                    return Err(TemplateError::UnexpectedClose {
                        block: BlockKind::Loop,
                        origin: origin.clone(),
                        span,
                    });
                }
                program.push(Instruction::LoopClose);
            }
            TagKind::Break | TagKind::Continue => {
                if level == 0 {
                    tracing::warn!(
                        "{{{}}} outside of a loop in {} at {}",
                        kind.name(),
                        origin,
                        state.position(span)
                    );
                }
                program.push(if kind == TagKind::Break {
                    Instruction::Break
                } else {
                    Instruction::Continue
                });
            }
            TagKind::If => {
                state.conditionals.push(span);
                let condition = rewrite(group(&captures, 1), level, None).expr;
                program.push(Instruction::If(condition));
            }
            TagKind::ElseIf => {
                let condition = rewrite(group(&captures, 1), level, None).expr;
                program.push(Instruction::ElseIf(condition));
            }
            TagKind::Else => program.push(Instruction::Else),
            TagKind::IfClose => {
                if state.conditionals.pop().is_none() {
                    return Err(TemplateError::UnexpectedClose {
                        block: BlockKind::Conditional,
                        origin: origin.clone(),
                        span,
                    });
                }
                program.push(Instruction::IfClose);
            }
            TagKind::Autoescape => {
                state.escape_policy.push(autoescape_enabled(group(&captures, 1)));
            }
            TagKind::AutoescapeClose => {
                if state.escape_policy.pop().is_none() {
                    tracing::warn!(
                        "{{/autoescape}} with no open block in {} at {}",
                        origin,
                        state.position(span)
                    );
                }
            }
            TagKind::FunctionCall => {
                let function = group(&captures, 1).replace('/', "\\");
                let arguments = captures.get(2).map(|args| {
                    let inner = &args.as_str()[1..args.as_str().len() - 1];
                    Box::new(rewrite(inner, level, None).expr)
                });
                program.push(Instruction::Output(Expr::Invoke {
                    function,
                    arguments,
                }));
            }
            TagKind::Ternary => {
                let escape = self.escape_charset(state);
                let condition = rewrite(group(&captures, 1), level, escape).expr;
                let if_true = rewrite(group(&captures, 2), level, escape).expr;
                let if_false = rewrite(group(&captures, 3), level, escape).expr;
                program.push(Instruction::Output(Expr::Ternary {
                    condition: Box::new(condition),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                }));
            }
            TagKind::Variable => {
                let content = strip_braces(group(&captures, 0));
                let rewritten = rewrite(content, level, self.escape_charset(state));
                program.push(if rewritten.is_output() {
                    Instruction::Output(rewritten.expr)
                } else {
                    Instruction::Statement(rewritten.expr)
                });
            }
            TagKind::Constant => {
                let content = strip_braces(group(&captures, 0));
                let content = content.strip_prefix('#').unwrap_or(content);
                let content = content.strip_suffix('#').unwrap_or(content);
                program.push(Instruction::Output(compose_modifiers(content)));
            }
            TagKind::RawCodeClose | TagKind::IgnoreClose | TagKind::NoParseClose => {
                // `classify` never yields region closers.
                program.push(Instruction::Text(text.to_string()));
            }
        }

        Ok(())
    }

    fn compile_custom_tags(&self, text: &str, program: &mut Program) {
        let before = program.len();
        for (name, matches) in self.registry.matches(text) {
            program.push(Instruction::CustomTag {
                name: name.to_string(),
                matches,
            });
        }
        if program.len() == before {
            program.push(Instruction::Text(text.to_string()));
        }
    }

    fn escape_charset(&self, state: &CompileState) -> Option<&str> {
        state
            .auto_escape()
            .then_some(self.options.charset.as_str())
    }

    fn include_target(&self, path: &str, origin: &Origin, level: usize) -> IncludeTarget {
        let directory = origin.directory();
        let folder = directory
            .strip_prefix(self.options.template_dir.as_str())
            .unwrap_or(directory);

        if path.contains('$') {
            IncludeTarget::Dynamic {
                folder: reduce_path(folder),
                path: rewrite(path, level, None).expr,
            }
        } else {
            IncludeTarget::Static(reduce_path(&format!("{folder}{path}")))
        }
    }
}

/// Only the exact modes `off`, `false`, `0` and the empty mode disable
/// escaping. Matching is case-sensitive, so `OFF` turns escaping on.
fn autoescape_enabled(mode: &str) -> bool {
    !matches!(mode, "off" | "false" | "0" | "")
}

fn group<'t>(captures: &Captures<'t>, index: usize) -> &'t str {
    captures.get(index).map_or("", |m| m.as_str())
}

fn strip_braces(tag: &str) -> &str {
    tag.strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(tag)
}

fn loop_header(captures: &Captures<'_>, level: usize) -> Loop {
    let collection = captures.name("variable").map_or("", |m| m.as_str());
    let source = match rewrite(collection, level - 1, None).expr {
        Expr::Code(code) if !code.contains('(') => {
            if code.contains('$') {
                LoopSource::Variable(code)
            } else {
                LoopSource::Variable(format!("${code}"))
            }
        }
        expr => LoopSource::Computed(expr),
    };

    let key = captures.name("key").map(|m| m.as_str().to_string());
    let value = captures.name("value").map(|m| m.as_str().to_string());
    let (key, value) = match (key, value) {
        (Some(key), Some(value)) => (key, value),
        (Some(value), None) => (format!("$key{level}"), value),
        _ => (format!("$key{level}"), format!("$value{level}")),
    };

    Loop {
        level,
        source,
        key,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TagMatches;

    fn compiler(options: CompileOptions) -> Compiler {
        Compiler::new(options, Arc::new(TagRegistry::new()))
    }

    fn compile(source: &str) -> Vec<Instruction> {
        compiler(CompileOptions::default())
            .compile_file(source, "", "test.html")
            .unwrap()
            .instructions
    }

    fn text(s: &str) -> Instruction {
        Instruction::Text(s.to_string())
    }

    fn code(s: &str) -> Expr {
        Expr::Code(s.to_string())
    }

    mod blocks {
        use super::*;

        #[test]
        fn test_state_reports_line_and_column() {
            let state = CompileState::new(false, "a\n  {break}\n");
            assert_eq!(state.position(Span::from_bounds(4, 11)).to_string(), "2:2");
        }

        #[test]
        fn test_simple_loop() {
            let instructions = compile("{loop=\"$week\"}<li>{$value}</li>{/loop}");
            assert_eq!(
                instructions,
                vec![
                    Instruction::LoopOpen(Loop {
                        level: 1,
                        source: LoopSource::Variable("$week".to_string()),
                        key: "$key1".to_string(),
                        value: "$value1".to_string(),
                    }),
                    text("<li>"),
                    Instruction::Output(code("$value1")),
                    text("</li>"),
                    Instruction::LoopClose,
                ]
            );
        }

        #[test]
        fn test_nested_loops_number_bindings() {
            let instructions =
                compile("{loop=\"$table\"}{loop=\"$value\"}{$key}{/loop}{/loop}");
            let Instruction::LoopOpen(inner) = &instructions[1] else {
                panic!("expected inner loop, got {:?}", instructions[1]);
            };
            assert_eq!(inner.level, 2);
            assert_eq!(inner.source, LoopSource::Variable("$value1".to_string()));
            assert_eq!(inner.counter(), "$counter2");
            assert_eq!(instructions[2], Instruction::Output(code("$key2")));
        }

        #[test]
        fn test_loop_with_named_bindings() {
            let instructions = compile("{loop=\"$users\" as $k => $u}{/loop}");
            let Instruction::LoopOpen(header) = &instructions[0] else {
                panic!("expected loop");
            };
            assert_eq!(header.key, "$k");
            assert_eq!(header.value, "$u");

            let instructions = compile("{loop=\"users\" as $u}{/loop}");
            let Instruction::LoopOpen(header) = &instructions[0] else {
                panic!("expected loop");
            };
            assert_eq!(header.source, LoopSource::Variable("$users".to_string()));
            assert_eq!(header.key, "$key1");
            assert_eq!(header.value, "$u");
        }

        #[test]
        fn test_computed_loop_source() {
            let instructions = compile("{loop=\"$items|array_reverse\"}{/loop}");
            let Instruction::LoopOpen(header) = &instructions[0] else {
                panic!("expected loop");
            };
            assert!(matches!(header.source, LoopSource::Computed(Expr::Modifier { .. })));
        }

        #[test]
        fn test_conditionals() {
            let instructions =
                compile("{if=\"$a.b > 1\"}x{elseif=\"$c\"}y{else}z{/if}");
            assert_eq!(
                instructions,
                vec![
                    Instruction::If(code("$a[\"b\"] > 1")),
                    text("x"),
                    Instruction::ElseIf(code("$c")),
                    text("y"),
                    Instruction::Else,
                    text("z"),
                    Instruction::IfClose,
                ]
            );
        }

        #[test]
        fn test_break_outside_loop_still_emits() {
            assert_eq!(compile("{break}{continue}"), vec![Instruction::Break, Instruction::Continue]);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_unclosed_loop_points_at_opener() {
            let err = compiler(CompileOptions::default())
                .compile_file("a\n{loop=\"$x\"}\nb", "", "list.html")
                .unwrap_err();
            assert_eq!(err.to_string(), "unclosed {loop} tag in list.html");
            assert_eq!(err.span(), Some(Span::new(2, 11)));
        }

        #[test]
        fn test_unclosed_if_reported_before_loop() {
            let err = compiler(CompileOptions::default())
                .compile_file("{loop=\"$x\"}{if=\"$a\"}", "", "page.html")
                .unwrap_err();
            assert!(matches!(
                err,
                TemplateError::Unclosed {
                    block: BlockKind::Conditional,
                    ..
                }
            ));
        }

        #[test]
        fn test_unexpected_close() {
            let err = compiler(CompileOptions::default())
                .compile_file("x{/loop}", "", "page.html")
                .unwrap_err();
            assert!(matches!(
                err,
                TemplateError::UnexpectedClose {
                    block: BlockKind::Loop,
                    ..
                }
            ));
            assert_eq!(err.span(), Some(Span::new(1, 7)));

            let err = compiler(CompileOptions::default())
                .compile_file("{/if}", "", "page.html")
                .unwrap_err();
            assert_eq!(err.code(), "M101");
        }

        #[test]
        fn test_string_compile_names_caller() {
            let err = compiler(CompileOptions::default())
                .compile_string("{if=\"$a\"}")
                .unwrap_err();
            let message = err.to_string();
            assert!(message.starts_with("unclosed {if} tag in the string loaded by "));
            assert!(message.contains("compiler.rs"));
        }
    }

    mod regions {
        use super::*;

        #[test]
        fn test_noparse_keeps_everything() {
            assert_eq!(
                compile("{noparse}a {$x} b{/noparse}{$y}"),
                vec![
                    text("a "),
                    text("{$x}"),
                    text(" b"),
                    Instruction::Output(code("$y")),
                ]
            );
        }

        #[test]
        fn test_ignore_drops_everything() {
            assert_eq!(compile("a{ignore}b {$x}{/ignore}c"), vec![text("a"), text("c")]);
            assert_eq!(compile("a{* note *}b"), vec![text("a"), text("b")]);
            assert_eq!(compile("a{*}b"), vec![text("a"), text("b")]);
        }

        #[test]
        fn test_noparse_does_not_nest() {
            assert_eq!(
                compile("{noparse}{noparse}x{/noparse}y{/noparse}"),
                vec![text("{noparse}"), text("x"), text("y")]
            );
        }

        #[test]
        fn test_ignore_does_not_nest() {
            assert_eq!(
                compile("a{ignore}{ignore}x{/ignore}y{/ignore}z"),
                vec![text("a"), text("y"), text("z")]
            );
        }

        #[test]
        fn test_raw_code_does_not_nest() {
            let options = CompileOptions {
                allow_raw_code: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("{php}{php}x{/php}y{/php}", "", "t.html")
                .unwrap();
            assert_eq!(
                program.instructions,
                vec![
                    Instruction::RawCodeOpen,
                    text("{php}"),
                    text("x"),
                    Instruction::RawCodeClose,
                    text("y"),
                    text("{/php}"),
                ]
            );
        }

        #[test]
        fn test_raw_code_disabled_becomes_ignore() {
            assert_eq!(
                compile("{php} echo 1; {/php}x"),
                vec![
                    Instruction::Notice(RAW_CODE_NOTICE.to_string()),
                    Instruction::Notice(RAW_CODE_CLOSE_NOTICE.to_string()),
                    text("x"),
                ]
            );
        }

        #[test]
        fn test_raw_code_enabled() {
            let options = CompileOptions {
                allow_raw_code: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("{php} if ($a) { $b = 1; } {/php}", "", "t.html")
                .unwrap();
            assert_eq!(
                program.instructions,
                vec![
                    Instruction::RawCodeOpen,
                    text(" if ($a) "),
                    text("{ $b = 1; }"),
                    text(" "),
                    Instruction::RawCodeClose,
                ]
            );
        }

        #[test]
        fn test_stray_raw_close_is_text_when_enabled() {
            let options = CompileOptions {
                allow_raw_code: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("{/php}", "", "t.html")
                .unwrap();
            assert_eq!(program.instructions, vec![text("{/php}")]);
        }

        #[test]
        fn test_comments_stripped() {
            let options = CompileOptions {
                strip_comments: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("a<!-- {$x}\n -->b", "", "t.html")
                .unwrap();
            assert_eq!(program.instructions, vec![text("a"), text("b")]);
        }
    }

    mod escaping {
        use super::*;

        fn escaped(inner: Expr) -> Expr {
            Expr::Escape {
                inner: Box::new(inner),
                charset: "UTF-8".to_string(),
            }
        }

        #[test]
        fn test_autoescape_blocks_nest() {
            let options = CompileOptions {
                auto_escape: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file(
                    "{$a}{autoescape=\"off\"}{$b}{autoescape=\"on\"}{$c}{/autoescape}{$d}{/autoescape}{$e}",
                    "",
                    "t.html",
                )
                .unwrap();
            assert_eq!(
                program.instructions,
                vec![
                    Instruction::Output(escaped(code("$a"))),
                    Instruction::Output(code("$b")),
                    Instruction::Output(escaped(code("$c"))),
                    Instruction::Output(code("$d")),
                    Instruction::Output(escaped(code("$e"))),
                ]
            );
        }

        #[test]
        fn test_autoescape_modes_are_case_sensitive() {
            assert!(!autoescape_enabled("off"));
            assert!(!autoescape_enabled("false"));
            assert!(!autoescape_enabled("0"));
            assert!(!autoescape_enabled(""));
            assert!(autoescape_enabled("on"));
            assert!(autoescape_enabled("OFF"));
            assert!(autoescape_enabled("False"));

            assert_eq!(
                compile("{autoescape=\"OFF\"}{$a}{/autoescape}"),
                vec![Instruction::Output(escaped(code("$a")))]
            );
        }

        #[test]
        fn test_stray_autoescape_close_keeps_policy() {
            assert_eq!(
                compile("{/autoescape}{$a}"),
                vec![Instruction::Output(code("$a"))]
            );
        }

        #[test]
        fn test_ternary_escapes_every_part() {
            let options = CompileOptions {
                auto_escape: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("{$ok?$yes:\"no\"}", "", "t.html")
                .unwrap();
            assert_eq!(
                program.instructions,
                vec![Instruction::Output(Expr::Ternary {
                    condition: Box::new(escaped(code("$ok"))),
                    if_true: Box::new(escaped(code("$yes"))),
                    if_false: Box::new(code("\"no\"")),
                })]
            );
        }

        #[test]
        fn test_assignment_is_statement() {
            assert_eq!(
                compile("{$v = 10}"),
                vec![Instruction::Statement(code("$v = 10"))]
            );
        }
    }

    mod tags {
        use super::*;

        #[test]
        fn test_function_call() {
            assert_eq!(
                compile("{function=\"date('Y')\"}{function=\"time\"}"),
                vec![
                    Instruction::Output(Expr::Invoke {
                        function: "date".to_string(),
                        arguments: Some(Box::new(code("'Y'"))),
                    }),
                    Instruction::Output(Expr::Invoke {
                        function: "time".to_string(),
                        arguments: None,
                    }),
                ]
            );
        }

        #[test]
        fn test_constants() {
            assert_eq!(
                compile("{#PI#}{#PI|round}"),
                vec![
                    Instruction::Output(code("PI")),
                    Instruction::Output(Expr::Modifier {
                        name: "round".to_string(),
                        target: Box::new(code("PI")),
                        args: None,
                    }),
                ]
            );
        }

        #[test]
        fn test_unknown_braces_are_text() {
            assert_eq!(compile("p { color: red; }"), vec![text("p "), text("{ color: red; }")]);
        }

        #[test]
        fn test_case_insensitive_tags() {
            let options = CompileOptions {
                case_insensitive_tags: true,
                ..CompileOptions::default()
            };
            let program = compiler(options)
                .compile_file("{LOOP=\"$a\"}{/Loop}", "", "t.html")
                .unwrap();
            assert_eq!(program.len(), 2);
            assert!(matches!(program.instructions[0], Instruction::LoopOpen(_)));
        }

        #[test]
        fn test_custom_tags_in_registration_order() {
            let mut registry = TagRegistry::new();
            registry
                .register("shout", r"\{shout=(\w+)\}", |m| {
                    m.first(1).unwrap_or_default().to_uppercase()
                })
                .unwrap()
                .register("any", r"\{shout", |_| String::new())
                .unwrap();
            let compiler = Compiler::new(CompileOptions::default(), Arc::new(registry));
            let program = compiler.compile_file("{shout=hi}", "", "t.html").unwrap();
            let names: Vec<_> = program
                .iter()
                .filter_map(|i| match i {
                    Instruction::CustomTag { name, .. } => Some(name.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(names, vec!["shout", "any"]);

            let Instruction::CustomTag { matches, .. } = &program.instructions[0] else {
                panic!("expected custom tag");
            };
            assert_eq!(compiler.registry().invoke("shout", matches).as_deref(), Some("HI"));
            assert_ne!(matches, &TagMatches::default());
        }
    }

    mod includes {
        use super::*;

        fn include(source: &str, directory: &str) -> Instruction {
            let options = CompileOptions {
                template_dir: "templates/".to_string(),
                ..CompileOptions::default()
            };
            compiler(options)
                .compile_file(source, directory, "page.html")
                .unwrap()
                .instructions
                .remove(0)
        }

        #[test]
        fn test_static_include_is_relative_to_folder() {
            assert_eq!(
                include("{include=\"../footer\"}", "templates/blog/"),
                Instruction::Include(IncludeTarget::Static("footer".to_string()))
            );
            assert_eq!(
                include("{include=\"header\"}", "templates/"),
                Instruction::Include(IncludeTarget::Static("header".to_string()))
            );
        }

        #[test]
        fn test_dynamic_include() {
            assert_eq!(
                include("{include=\"$page.name\"}", "templates/blog//"),
                Instruction::Include(IncludeTarget::Dynamic {
                    folder: "blog/".to_string(),
                    path: code("$page[\"name\"]"),
                })
            );
        }
    }

    #[test]
    fn test_crlf_normalized() {
        assert_eq!(compile("a\r\n{$b}\r\n"), vec![text("a\n"), Instruction::Output(code("$b")), text("\n")]);
    }
}
