use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::load_host;
use crate::commands::Command;
use crate::exit::Exit;
use crate::host::DEFAULT_EXPIRE;

#[derive(Debug, Parser)]
pub struct Clean {
    /// Remove artifacts last written more than this many seconds ago.
    #[arg(long, default_value_t = DEFAULT_EXPIRE.as_secs())]
    expire: u64,
}

impl Command for Clean {
    fn execute(&self, args: &Args) -> Result<Exit> {
        let host = load_host(args)?;
        let removed = host.clean(Duration::from_secs(self.expire))?;
        let word = if removed == 1 { "artifact" } else { "artifacts" };
        Ok(Exit::success().with_message(format!("Removed {removed} {word}.")))
    }
}
