//! Template compilation for the MythTPL engine.
//!
//! Templates are HTML with brace-delimited tags (`{$var}`, `{loop="$items"}`,
//! `{if="$x"}`, `{include="footer"}`, ...). This crate turns them into a
//! flat instruction [`Program`] and renders that program through an
//! [`Emitter`].
//!
//! ## Pipeline
//!
//! 1. **Lexing**: [`Lexer`] splits the source into literal text and tag
//!    candidates. The token stream is lossless.
//! 2. **Compiling**: [`Compiler`] classifies each candidate against the
//!    built-in [`TagMatchers`] and the user's [`TagRegistry`], tracks block
//!    nesting and escape policy, and rewrites expressions into [`Expr`] trees.
//! 3. **Emitting**: [`PhpEmitter`] produces the PHP artifact the engine host
//!    executes; [`JsonEmitter`] dumps the instruction tree instead.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mythtpl_templates::{Artifact, CompileOptions, Compiler, Origin, PhpEmitter, TagRegistry};
//!
//! let compiler = Compiler::new(CompileOptions::default(), Arc::new(TagRegistry::new()));
//! let artifact = Artifact::build(&compiler, &PhpEmitter, "Hi {$name}", &Origin::file("", "hi.html"))?;
//! assert!(artifact.contents().ends_with("Hi <?php echo $name; ?>"));
//! # Ok::<(), mythtpl_templates::TemplateError>(())
//! ```

mod artifact;
mod compiler;
mod emit;
mod error;
mod expression;
mod instructions;
mod lexer;
mod modifiers;
mod options;
mod paths;
mod quotes;
mod registry;
mod tagspecs;
mod tokens;

pub use artifact::Artifact;
pub use compiler::Compiler;
pub use emit::php_expr;
pub use emit::Emitter;
pub use emit::JsonEmitter;
pub use emit::PhpEmitter;
pub use emit::SAFETY_HEADER;
pub use error::BlockKind;
pub use error::TemplateError;
pub use expression::Expr;
pub use instructions::IncludeTarget;
pub use instructions::Instruction;
pub use instructions::Loop;
pub use instructions::LoopSource;
pub use instructions::Program;
pub use lexer::normalize_line_endings;
pub use lexer::Lexer;
pub use options::CompileOptions;
pub use options::Origin;
pub use paths::reduce_path;
pub use registry::CaptureGroup;
pub use registry::TagCallback;
pub use registry::TagMatches;
pub use registry::TagRegistry;
pub use tagspecs::TagKind;
pub use tagspecs::TagMatchers;
pub use tokens::Token;
