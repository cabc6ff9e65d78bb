use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::load_host;
use crate::commands::Command;
use crate::commands::EmitFormat;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Compile {
    /// Template name, relative to the template directory and without extension.
    template: String,

    /// Recompile even when the cached artifact is fresh.
    #[arg(long)]
    force: bool,

    #[arg(long, value_enum, default_value_t)]
    emit: EmitFormat,
}

impl Command for Compile {
    fn execute(&self, args: &Args) -> Result<Exit> {
        let host = load_host(args)?;
        let path = host.compile_template(&self.template, self.emit.emitter(), self.force)?;
        Ok(Exit::success().with_message(path.to_string()))
    }
}
