//! Operator/test helpers over the control center's admin endpoints. These
//! seed scenarios and inspect state; the reconciliation loop never uses
//! them.

use anyhow::Result;
use relay_core::ControlCenter;

#[derive(Debug, clap::Args)]
pub struct TriggerArgs {
    /// Image tag to deploy (e.g. v2.0.0)
    pub image_tag: String,

    #[arg(long, env = "RELAY_CONTROL_CENTER_URL")]
    pub control_center_url: String,
}

pub fn trigger(args: TriggerArgs) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let response = rt.block_on(async {
        let center = ControlCenter::new(&args.control_center_url)?;
        center.trigger_deployment(&args.image_tag).await
    })?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[derive(Debug, clap::Args)]
pub struct AdminStatusArgs {
    #[arg(long, env = "RELAY_CONTROL_CENTER_URL")]
    pub control_center_url: String,
}

pub fn status(args: AdminStatusArgs) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let response = rt.block_on(async {
        let center = ControlCenter::new(&args.control_center_url)?;
        center.admin_status().await
    })?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
