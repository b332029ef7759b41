//! `moments config`: show the effective configuration.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also list the files and environment variables that were applied
    #[arg(long)]
    pub sources: bool,
}

pub fn run(ctx: &AppContext, args: ConfigArgs) -> Result<()> {
    if args.sources {
        if ctx.sources.files.is_empty() {
            println!("# No config files found; using defaults");
        }
        for file in &ctx.sources.files {
            println!("# file: {}", file.display());
        }
        for var in &ctx.sources.env_overrides {
            println!("# env:  {}", var);
        }
        println!();
    }

    print!("{}", ctx.config.to_toml());
    Ok(())
}
