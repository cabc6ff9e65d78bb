use crate::compiler::Compiler;
use crate::emit::Emitter;
use crate::error::TemplateError;
use crate::options::Origin;

/// The complete text of a compiled template, ready to be persisted.
///
/// Building either succeeds with the whole artifact or fails with the first
/// syntax error; nothing partial is ever produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    contents: String,
    instruction_count: usize,
}

impl Artifact {
    /// # Errors
    ///
    /// Returns the compiler's [`TemplateError`] for malformed templates, or an
    /// emit error from `emitter`.
    pub fn build(
        compiler: &Compiler,
        emitter: &dyn Emitter,
        source: &str,
        origin: &Origin,
    ) -> Result<Self, TemplateError> {
        let program = compiler.compile(source, origin)?;
        let contents = emitter.emit(&program)?;
        Ok(Self {
            contents,
            instruction_count: program.len(),
        })
    }

    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    #[must_use]
    pub fn into_contents(self) -> String {
        self.contents
    }

    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::emit::PhpEmitter;
    use crate::emit::SAFETY_HEADER;
    use crate::options::CompileOptions;
    use crate::registry::TagRegistry;

    fn compiler() -> Compiler {
        Compiler::new(CompileOptions::default(), Arc::new(TagRegistry::new()))
    }

    #[test]
    fn builds_full_artifact() {
        let artifact = Artifact::build(
            &compiler(),
            &PhpEmitter,
            "Hi {$name}!\r\n",
            &Origin::file("", "hi.html"),
        )
        .unwrap();
        assert_eq!(
            artifact.contents(),
            format!("{SAFETY_HEADER}Hi <?php echo $name; ?>!\n")
        );
        assert_eq!(artifact.instruction_count(), 3);
    }

    #[test]
    fn errors_produce_no_artifact() {
        let result = Artifact::build(
            &compiler(),
            &PhpEmitter,
            "{if=\"$a\"}",
            &Origin::file("", "bad.html"),
        );
        assert!(result.is_err());
    }
}
