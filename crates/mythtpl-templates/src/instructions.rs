use serde::Deserialize;
use serde::Serialize;

use crate::expression::Expr;
use crate::registry::TagMatches;

/// A compiled template: the flat instruction stream an emitter renders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Literal template text, copied to the output.
    Text(String),
    /// Evaluate and print.
    Output(Expr),
    /// Evaluate for side effects only.
    Statement(Expr),
    LoopOpen(Loop),
    LoopClose,
    Break,
    Continue,
    If(Expr),
    ElseIf(Expr),
    Else,
    IfClose,
    RawCodeOpen,
    RawCodeClose,
    /// A comment left in the output, e.g. for a disabled `{php}` block.
    Notice(String),
    Include(IncludeTarget),
    CustomTag {
        name: String,
        matches: TagMatches,
    },
}

/// Header of a `{loop}` block.
///
/// `level` is the 1-based nesting depth; the counter binding of the loop is
/// `$counter{level}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loop {
    pub level: usize,
    pub source: LoopSource,
    pub key: String,
    pub value: String,
}

impl Loop {
    #[must_use]
    pub fn counter(&self) -> String {
        format!("$counter{}", self.level)
    }
}

/// What a loop iterates over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopSource {
    /// A variable that can be iterated directly.
    Variable(String),
    /// A computed collection, bound to `$newvar{level}` before iterating.
    Computed(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncludeTarget {
    /// A template path known at compile time, already normalized.
    Static(String),
    /// A path computed at render time, appended to the including
    /// template's folder.
    Dynamic { folder: String, path: Expr },
}
