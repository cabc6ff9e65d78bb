use std::io::Read as _;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::load_host;
use crate::commands::Command;
use crate::commands::EmitFormat;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct CompileString {
    /// Template text. Read from stdin when omitted.
    text: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    emit: EmitFormat,

    /// Print the compiled artifact instead of its path.
    #[arg(long)]
    print: bool,
}

impl Command for CompileString {
    fn execute(&self, args: &Args) -> Result<Exit> {
        let source = match &self.text {
            Some(text) => text.clone(),
            None => {
                let mut source = String::new();
                std::io::stdin()
                    .read_to_string(&mut source)
                    .context("Failed to read stdin")?;
                source
            }
        };

        let host = load_host(args)?;
        let path = host.compile_string(&source, self.emit.emitter())?;

        if self.print {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read artifact {path}"))?;
            print!("{contents}");
            return Ok(Exit::success());
        }
        Ok(Exit::success().with_message(path.to_string()))
    }
}
