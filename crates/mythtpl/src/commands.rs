mod check;
mod clean;
mod compile;
mod string;

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Subcommand;
use clap::ValueEnum;
use mythtpl_conf::Settings;
use mythtpl_templates::Emitter;
use mythtpl_templates::JsonEmitter;
use mythtpl_templates::PhpEmitter;
use mythtpl_templates::TagRegistry;

use crate::args::Args;
use crate::exit::Exit;
use crate::host::Host;

pub trait Command {
    fn execute(&self, args: &Args) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum MythtplCommand {
    /// Compile a named template into the cache
    Compile(self::compile::Compile),
    /// Compile template text given as an argument or on stdin
    String(self::string::CompileString),
    /// Report syntax errors in template files
    Check(self::check::Check),
    /// Remove expired artifacts from the cache
    Clean(self::clean::Clean),
}

impl Command for MythtplCommand {
    fn execute(&self, args: &Args) -> Result<Exit> {
        match self {
            MythtplCommand::Compile(cmd) => cmd.execute(args),
            MythtplCommand::String(cmd) => cmd.execute(args),
            MythtplCommand::Check(cmd) => cmd.execute(args),
            MythtplCommand::Clean(cmd) => cmd.execute(args),
        }
    }
}

/// Output format of compiled artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EmitFormat {
    #[default]
    Php,
    Json,
}

impl EmitFormat {
    pub fn emitter(self) -> &'static dyn Emitter {
        match self {
            EmitFormat::Php => &PhpEmitter,
            EmitFormat::Json => &JsonEmitter,
        }
    }
}

fn resolve_project_root(args: &Args) -> Result<Utf8PathBuf> {
    if let Some(project) = &args.global.project {
        return Ok(project.clone());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| anyhow::anyhow!("Current directory is not valid UTF-8"))
}

fn load_host(args: &Args) -> Result<Host> {
    let root = resolve_project_root(args)?;
    let settings = Settings::new(root.as_std_path()).context("Failed to load settings")?;
    tracing::debug!("loaded settings for {}: {:?}", root, settings);
    Ok(Host::new(root, settings, Arc::new(TagRegistry::new()))?)
}
