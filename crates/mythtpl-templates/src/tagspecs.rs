use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;
use serde::Serialize;

/// Built-in tag kinds recognized in a candidate token.
///
/// Custom tags are not listed here; they live in the
/// [`TagRegistry`](crate::TagRegistry) and are tried after every built-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TagKind {
    RawCodeClose,
    IgnoreClose,
    NoParseClose,
    Ignore,
    NoParse,
    RawCode,
    Include,
    Loop,
    LoopClose,
    Break,
    Continue,
    If,
    ElseIf,
    Else,
    IfClose,
    Autoescape,
    AutoescapeClose,
    FunctionCall,
    Ternary,
    Variable,
    Constant,
}

impl TagKind {
    /// Every kind, in the order the compiler tries them.
    pub const ALL: [TagKind; 21] = [
        TagKind::RawCodeClose,
        TagKind::IgnoreClose,
        TagKind::NoParseClose,
        TagKind::Ignore,
        TagKind::NoParse,
        TagKind::RawCode,
        TagKind::Include,
        TagKind::Loop,
        TagKind::LoopClose,
        TagKind::Break,
        TagKind::Continue,
        TagKind::If,
        TagKind::ElseIf,
        TagKind::Else,
        TagKind::IfClose,
        TagKind::Autoescape,
        TagKind::AutoescapeClose,
        TagKind::FunctionCall,
        TagKind::Ternary,
        TagKind::Variable,
        TagKind::Constant,
    ];

    /// Kinds that are only recognized outside suppressed regions.
    #[must_use]
    pub fn ordinary() -> &'static [TagKind] {
        &Self::ALL[3..]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TagKind::RawCodeClose => "/php",
            TagKind::IgnoreClose => "/ignore",
            TagKind::NoParseClose => "/noparse",
            TagKind::Ignore => "ignore",
            TagKind::NoParse => "noparse",
            TagKind::RawCode => "php",
            TagKind::Include => "include",
            TagKind::Loop => "loop",
            TagKind::LoopClose => "/loop",
            TagKind::Break => "break",
            TagKind::Continue => "continue",
            TagKind::If => "if",
            TagKind::ElseIf => "elseif",
            TagKind::Else => "else",
            TagKind::IfClose => "/if",
            TagKind::Autoescape => "autoescape",
            TagKind::AutoescapeClose => "/autoescape",
            TagKind::FunctionCall => "function",
            TagKind::Ternary => "ternary",
            TagKind::Variable => "variable",
            TagKind::Constant => "constant",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TagKind::RawCodeClose => r"\{/php\}",
            TagKind::IgnoreClose => r"\{/ignore\}|\*\}",
            TagKind::NoParseClose => r"\{/noparse\}",
            TagKind::Ignore => r"\{ignore\}|\{\*",
            TagKind::NoParse => r"\{noparse\}",
            TagKind::RawCode => r"\{php\}",
            TagKind::Include => r#"\{include="([^"]*)"\}"#,
            TagKind::Loop => {
                r#"\{loop="(?P<variable>\$?[^"]*)"(?: as (?P<key>\$.*?)(?: => (?P<value>\$.*?))?)?\}"#
            }
            TagKind::LoopClose => r"\{/loop\}",
            TagKind::Break => r"\{break\}",
            TagKind::Continue => r"\{continue\}",
            TagKind::If => r#"\{if="([^"]*)"\}"#,
            TagKind::ElseIf => r#"\{elseif="([^"]*)"\}"#,
            TagKind::Else => r"\{else\}",
            TagKind::IfClose => r"\{/if\}",
            TagKind::Autoescape => r#"\{autoescape="([^"]*)"\}"#,
            TagKind::AutoescapeClose => r"\{/autoescape\}",
            TagKind::FunctionCall => {
                r#"\{function="(\\*[a-zA-Z_][a-zA-Z_0-9:\\]*)(\(.*\))?"\}"#
            }
            TagKind::Ternary => r"\{(.[^{?}]*?)\?(.*?):(.*?)\}",
            TagKind::Variable => r#"\{\$[^}]+?(?:(?:"[^"]*"|'[^']*')[^}]*?)*\}"#,
            TagKind::Constant => r#"\{#[^}]+?(?:(?:"[^"]*"|'[^']*')[^}]*?)*#?\}"#,
        }
    }
}

/// One compiled pattern per built-in tag kind.
#[derive(Debug)]
pub struct TagMatchers {
    patterns: Vec<Regex>,
}

static CASE_SENSITIVE: LazyLock<TagMatchers> = LazyLock::new(|| TagMatchers::build(false));
static CASE_INSENSITIVE: LazyLock<TagMatchers> = LazyLock::new(|| TagMatchers::build(true));

impl TagMatchers {
    fn build(case_insensitive: bool) -> Self {
        let patterns = TagKind::ALL
            .iter()
            .map(|kind| {
                let pattern = if case_insensitive {
                    format!("(?i){}", kind.pattern())
                } else {
                    kind.pattern().to_string()
                };
                Regex::new(&pattern).expect("built-in tag patterns are valid")
            })
            .collect();
        Self { patterns }
    }

    /// The shared matcher set for the requested case sensitivity.
    #[must_use]
    pub fn get(case_insensitive: bool) -> &'static TagMatchers {
        if case_insensitive {
            &CASE_INSENSITIVE
        } else {
            &CASE_SENSITIVE
        }
    }

    fn regex(&self, kind: TagKind) -> &Regex {
        &self.patterns[kind as usize]
    }

    #[must_use]
    pub fn is_match(&self, kind: TagKind, text: &str) -> bool {
        self.regex(kind).is_match(text)
    }

    #[must_use]
    pub fn captures<'t>(&self, kind: TagKind, text: &'t str) -> Option<Captures<'t>> {
        self.regex(kind).captures(text)
    }

    /// The first ordinary kind matching `text`, with its captures.
    #[must_use]
    pub fn classify<'t>(&self, text: &'t str) -> Option<(TagKind, Captures<'t>)> {
        TagKind::ordinary()
            .iter()
            .find_map(|&kind| self.captures(kind, text).map(|caps| (kind, caps)))
    }
}
