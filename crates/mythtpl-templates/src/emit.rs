use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;
use crate::expression::Expr;
use crate::instructions::IncludeTarget;
use crate::instructions::Instruction;
use crate::instructions::Loop;
use crate::instructions::LoopSource;
use crate::instructions::Program;
use crate::registry::TagMatches;

/// Header that stops a compiled artifact from running outside the engine.
pub const SAFETY_HEADER: &str =
    r"<?php namespace MythTPL\Template; if(!class_exists('MythTPL\MythTPL')){exit;}?>";

static XML_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml(.*?)\?>").expect("xml pattern is valid"));

static CODE_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\?php|<\?=|\?>").expect("marker pattern is valid"));

/// Renders a compiled [`Program`] into an artifact body.
pub trait Emitter {
    /// # Errors
    ///
    /// Returns [`TemplateError::Emit`] when the program cannot be rendered.
    fn emit(&self, program: &Program) -> Result<String, TemplateError>;

    /// File suffix used for artifacts produced by this emitter.
    fn extension(&self) -> &'static str;
}

/// Emits PHP source for the engine's template host.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhpEmitter;

impl Emitter for PhpEmitter {
    fn emit(&self, program: &Program) -> Result<String, TemplateError> {
        let mut body = String::new();
        for instruction in program.iter() {
            write_instruction(&mut body, instruction);
        }

        let body = body.replace("?><?php", " ");
        Ok(format!("{SAFETY_HEADER}{body}").replace("?>\n", "?>\n\n"))
    }

    fn extension(&self) -> &'static str {
        "mtpl.php"
    }
}

/// Emits the instruction tree as pretty-printed JSON, for hosts that
/// interpret templates themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEmitter;

impl Emitter for JsonEmitter {
    fn emit(&self, program: &Program) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(program)?)
    }

    fn extension(&self) -> &'static str {
        "mtpl.json"
    }
}

fn write_instruction(out: &mut String, instruction: &Instruction) {
    match instruction {
        Instruction::Text(text) => out.push_str(&sanitize_text(text)),
        Instruction::Output(expr) => {
            out.push_str(&format!("<?php echo {}; ?>", php_expr(expr)));
        }
        Instruction::Statement(expr) => {
            out.push_str(&format!("<?php {}; ?>", php_expr(expr)));
        }
        Instruction::LoopOpen(header) => out.push_str(&loop_open(header)),
        Instruction::LoopClose | Instruction::IfClose => out.push_str("<?php } ?>"),
        Instruction::Break => out.push_str("<?php break; ?>"),
        Instruction::Continue => out.push_str("<?php continue; ?>"),
        Instruction::If(condition) => {
            out.push_str(&format!("<?php if( {} ){{ ?>", php_expr(condition)));
        }
        Instruction::ElseIf(condition) => {
            out.push_str(&format!("<?php }}elseif( {} ){{ ?>", php_expr(condition)));
        }
        Instruction::Else => out.push_str("<?php }else{ ?>"),
        Instruction::RawCodeOpen => out.push_str("<?php "),
        Instruction::RawCodeClose => out.push_str(" ?>"),
        Instruction::Notice(notice) => out.push_str(&format!("<?php /* {notice} */ ?>")),
        Instruction::Include(IncludeTarget::Static(path)) => {
            out.push_str(&format!(
                "<?php require $this->processTemplate(\"{path}\");?>"
            ));
        }
        Instruction::Include(IncludeTarget::Dynamic { folder, path }) => {
            out.push_str(&format!(
                "<?php require $this->processTemplate('{folder}'.{});?>",
                php_expr(path)
            ));
        }
        Instruction::CustomTag { name, matches } => {
            out.push_str(&format!(
                "<?php echo call_user_func( static::$registered_tags['{}']['function'], {} ); ?>",
                quote_single(name),
                var_export(matches)
            ));
        }
    }
}

fn loop_open(header: &Loop) -> String {
    let level = header.level;
    let counter = header.counter();
    let (collection, assign) = match &header.source {
        LoopSource::Variable(variable) => (variable.clone(), String::new()),
        LoopSource::Computed(expr) => {
            let variable = format!("$newvar{level}");
            let assign = format!("{variable}={};", php_expr(expr));
            (variable, assign)
        }
    };

    format!(
        "<?php {counter}=-1; {assign} if( ({collection} !== null) && ( is_array({collection}) || {collection} instanceof Traversable ) && sizeof({collection}) ) foreach( {collection} as {key} => {value} ){{ {counter}++; ?>",
        key = header.key,
        value = header.value,
    )
}

/// Render an expression as PHP source.
#[must_use]
pub fn php_expr(expr: &Expr) -> String {
    match expr {
        Expr::Code(code) => code.clone(),
        Expr::Modifier { name, target, args } => match args {
            Some(args) => format!("{name}({},{args})", php_expr(target)),
            None => format!("{name}({})", php_expr(target)),
        },
        Expr::Escape { inner, charset } => format!(
            "htmlspecialchars( {}, ENT_QUOTES | ENT_SUBSTITUTE | ENT_HTML401, '{charset}', FALSE )",
            php_expr(inner)
        ),
        Expr::Ternary {
            condition,
            if_true,
            if_false,
        } => format!(
            "({}?{}:{})",
            php_expr(condition),
            php_expr(if_true),
            php_expr(if_false)
        ),
        Expr::Invoke {
            function,
            arguments,
        } => match arguments {
            Some(arguments) => format!("{function}({})", php_expr(arguments)),
            None => format!("{function}()"),
        },
    }
}

/// Make literal text inert: PHP open/close markers are entity-escaped and
/// `<?xml ... ?>` declarations are re-emitted through `echo`.
fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for captures in XML_DECLARATION.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        out.push_str(&neutralize_markers(&text[last..whole.start()]));
        out.push_str("<?php echo '<?xml ");
        out.push_str(&strip_slashes(&neutralize_markers(&captures[1])));
        out.push_str(" ?>'; ?>");
        last = whole.end();
    }

    out.push_str(&neutralize_markers(&text[last..]));
    out
}

fn neutralize_markers(text: &str) -> String {
    CODE_MARKERS
        .replace_all(text, |caps: &regex::Captures| {
            match caps[0].to_ascii_lowercase().as_str() {
                "<?php" => "&lt;?php",
                "<?=" => "&lt;?=",
                _ => "?&gt;",
            }
        })
        .into_owned()
}

fn strip_slashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('0') => out.push('\0'),
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn quote_single(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// PHP `var_export` rendering of the capture groups, as
/// `preg_match_all` would have produced them.
fn var_export(matches: &TagMatches) -> String {
    let mut out = String::from("array (\n");
    for (index, group) in matches.groups.iter().enumerate() {
        let mut values = String::from("  array (\n");
        for (n, value) in group.values.iter().enumerate() {
            values.push_str(&format!("    {n} => '{}',\n", quote_single(value)));
        }
        values.push_str("  ),\n");

        if let Some(name) = &group.name {
            out.push_str(&format!("  '{}' => \n", quote_single(name)));
            out.push_str(&values);
        }
        out.push_str(&format!("  {index} => \n"));
        out.push_str(&values);
    }
    out.push(')');
    out
}
