use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::modifiers::parse_modifier;
use crate::modifiers::split_modifier_chain;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[A-Za-z_]").expect("variable pattern is valid"));

static LOOP_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(key|value|counter)\b").expect("loop binding pattern is valid")
});

/// A rewritten template expression.
///
/// Leaves hold host-language code; the other variants record the structure
/// added by the rewriter so emitters can render it in their own syntax.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Code(String),
    /// `target|name:args`. `args` is `None` when the modifier has no `:`.
    Modifier {
        name: String,
        target: Box<Expr>,
        args: Option<String>,
    },
    Escape {
        inner: Box<Expr>,
        charset: String,
    },
    Ternary {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Invoke {
        function: String,
        arguments: Option<Box<Expr>>,
    },
}

impl Expr {
    /// The code of a leaf expression.
    #[must_use]
    pub fn as_code(&self) -> Option<&str> {
        match self {
            Expr::Code(code) => Some(code),
            _ => None,
        }
    }
}

/// Result of rewriting one expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Rewrite {
    pub expr: Expr,
    pub has_variable: bool,
    pub is_assignment: bool,
}

impl Rewrite {
    /// Whether the expression produces output rather than a side effect.
    pub fn is_output(&self) -> bool {
        self.has_variable && !self.is_assignment
    }
}

/// Rewrite a variable expression for the host language.
///
/// `loop_level` renames the `$key`, `$value` and `$counter` placeholders to
/// the enclosing loop's numbered bindings. `escape` carries the charset when
/// the result should be wrapped in output escaping. Expressions with no
/// variable reference are returned untouched.
pub(crate) fn rewrite(source: &str, loop_level: usize, escape: Option<&str>) -> Rewrite {
    let renamed = if loop_level > 0 {
        rename_loop_bindings(source, loop_level)
    } else {
        source.to_string()
    };

    if !has_variable(&renamed) {
        return Rewrite {
            expr: Expr::Code(renamed),
            has_variable: false,
            is_assignment: false,
        };
    }

    let pathed = rewrite_paths(&renamed);
    let is_assignment = is_assignment(&pathed);
    let mut expr = compose_modifiers(&pathed);

    if let Some(charset) = escape {
        if !is_assignment {
            expr = Expr::Escape {
                inner: Box::new(expr),
                charset: charset.to_string(),
            };
        }
    }

    Rewrite {
        expr,
        has_variable: true,
        is_assignment,
    }
}

pub(crate) fn has_variable(text: &str) -> bool {
    VARIABLE.is_match(text)
}

fn rename_loop_bindings(text: &str, level: usize) -> String {
    LOOP_BINDING
        .replace_all(text, |caps: &Captures| format!("${}{level}", &caps[1]))
        .into_owned()
}

/// Build a modifier pipeline from `base|f:x|g`, nesting so the first
/// modifier is innermost: `g(f(base,x))`.
pub(crate) fn compose_modifiers(text: &str) -> Expr {
    let Some((base, segments)) = split_modifier_chain(text) else {
        return Expr::Code(text.to_string());
    };

    segments
        .into_iter()
        .fold(Expr::Code(base.trim_end().to_string()), |target, raw| {
            let (name, args) = parse_modifier(raw);
            Expr::Modifier {
                name: name.to_string(),
                target: Box::new(target),
                args: args.map(str::to_string),
            }
        })
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn skip_word(bytes: &[u8], mut idx: usize) -> usize {
    while bytes.get(idx).copied().is_some_and(is_word) {
        idx += 1;
    }
    idx
}

/// End of a `$?word` path segment starting at `idx`, if the segment is
/// non-empty.
fn segment_end(bytes: &[u8], idx: usize) -> Option<usize> {
    let word_start = if bytes.get(idx) == Some(&b'$') {
        idx + 1
    } else {
        idx
    };
    let end = skip_word(bytes, word_start);
    (end > word_start).then_some(end)
}

/// Rewrite dotted and bracketed path segments inside variable chains into
/// quoted subscripts: `$a.b[c]` becomes `$a["b"]["c"]`.
///
/// Quoted strings are copied verbatim. A `.segment` directly followed by a
/// quote is string concatenation and stays as written, as do empty segments.
pub(crate) fn rewrite_paths(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut copied = 0;
    let mut quote: Option<u8> = None;
    let mut in_chain = false;
    // Chain state to restore when a `[...]` that was not rewritten closes.
    let mut brackets: Vec<bool> = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];

        if let Some(q) = quote {
            if byte == b'\\' {
                idx += 2;
                continue;
            }
            if byte == q {
                quote = None;
            }
            idx += 1;
            continue;
        }

        match byte {
            b'"' | b'\'' => {
                quote = Some(byte);
                in_chain = false;
                idx += 1;
            }
            b'$' if bytes.get(idx + 1).copied().is_some_and(is_ident_start) => {
                in_chain = true;
                idx = skip_word(bytes, idx + 1);
            }
            b'[' | b'.' if in_chain => {
                let start = idx + 1;
                let closed = |end: usize| {
                    if byte == b'[' {
                        (bytes.get(end) == Some(&b']')).then_some(end + 1)
                    } else {
                        (!matches!(bytes.get(end), Some(b'"' | b'\''))).then_some(end)
                    }
                };
                match segment_end(bytes, start).and_then(|end| closed(end).map(|next| (end, next))) {
                    Some((end, next)) => {
                        out.push_str(&text[copied..idx]);
                        out.push_str("[\"");
                        out.push_str(&text[start..end]);
                        out.push_str("\"]");
                        copied = next;
                        idx = next;
                    }
                    None => {
                        if byte == b'[' {
                            brackets.push(true);
                        }
                        in_chain = false;
                        idx += 1;
                    }
                }
            }
            b'[' => {
                brackets.push(false);
                in_chain = false;
                idx += 1;
            }
            b']' => {
                in_chain = brackets.pop().unwrap_or(false);
                idx += 1;
            }
            b'-' if in_chain
                && bytes.get(idx + 1) == Some(&b'>')
                && bytes.get(idx + 2).copied().is_some_and(is_ident_start) =>
            {
                idx = skip_word(bytes, idx + 2);
            }
            _ => {
                in_chain = false;
                idx += 1;
            }
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Whether an expression assigns: an unquoted `=` that is not part of a
/// comparison (`==`, `===`, `!=`, `<=`, `>=`) or of `=>`.
pub(crate) fn is_assignment(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut found = false;
    crate::quotes::for_each_unquoted(
        text,
        |ch| ch == '=',
        |idx| {
            let prev = idx.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(idx + 1).copied();
            let comparison = matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
                || matches!(next, Some(b'=' | b'>'));
            found = !comparison;
            found
        },
    );
    found
}
