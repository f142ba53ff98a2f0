use anyhow::{Context, Result};

use super::run::{build_config, preflight, RunArgs};

#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub connection: RunArgs,
}

/// Validate the configuration and run the startup pre-flight checks
/// without starting any loop.
pub fn run(args: CheckArgs) -> Result<()> {
    let config = build_config(&args.connection)?;
    config.validate().context("configuration rejected")?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(preflight(&config))?;

    println!("ok: configuration valid, controller CLI working, control center reachable");
    Ok(())
}
