use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use argocd_client::ArgoCdClient;
use relay_core::{AgentConfig, ClientConfig, ControlCenter, ControllerConfig};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// RunArgs
// ---------------------------------------------------------------------------

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// YAML config file (multi-client). Overrides the single-client flags.
    #[arg(long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Identity used when polling the control center
    #[arg(long, env = "RELAY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Control center base URL (e.g. http://gcc.internal:5000)
    #[arg(long, env = "RELAY_CONTROL_CENTER_URL")]
    pub control_center_url: Option<String>,

    /// GitOps application name
    #[arg(long = "app", env = "RELAY_APP_NAME")]
    pub application: Option<String>,

    #[arg(long = "app-namespace", env = "RELAY_APP_NAMESPACE")]
    pub namespace: Option<String>,

    /// Controller server address (host:port)
    #[arg(long, env = "ARGOCD_SERVER")]
    pub argocd_server: Option<String>,

    #[arg(long, env = "ARGOCD_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Skip TLS verification when talking to the controller (dev/test only)
    #[arg(long, env = "ARGOCD_INSECURE")]
    pub insecure: bool,

    /// Seconds between control-center polls
    #[arg(long, env = "RELAY_POLL_INTERVAL")]
    pub poll_interval: Option<u64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    config.validate().context("configuration rejected")?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_async(config))
}

async fn run_async(config: AgentConfig) -> Result<()> {
    preflight(&config).await?;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received; finishing current iteration");
            let _ = tx.send(true);
        }
    });

    relay_core::run_all(config, rx).await?;
    tracing::info!("agent stopped");
    Ok(())
}

/// Startup checks, fatal on failure: the controller CLI must exist and run,
/// and the control center must answer its health endpoint.
pub(crate) async fn preflight(config: &AgentConfig) -> Result<()> {
    let cli = config
        .controller
        .cli_path
        .clone()
        .unwrap_or_else(|| "argocd".to_string());
    which::which(&cli).map_err(|_| anyhow!("controller CLI '{cli}' not found in PATH"))?;

    let controller = ArgoCdClient::new(config.controller.connect_options());
    controller
        .version_check()
        .await
        .context("controller CLI failed its version check")?;
    tracing::info!(cli = %cli, "controller CLI ok");

    let center = ControlCenter::new(&config.control_center_url)?;
    center
        .check_health()
        .await
        .with_context(|| format!("control center at {} is not healthy", config.control_center_url))?;
    tracing::info!(url = %config.control_center_url, "control center reachable");

    Ok(())
}

// ---------------------------------------------------------------------------
// Config assembly
// ---------------------------------------------------------------------------

pub(crate) fn build_config(args: &RunArgs) -> Result<AgentConfig> {
    if let Some(path) = &args.config {
        return AgentConfig::load(path)
            .with_context(|| format!("failed to load config file {}", path.display()));
    }

    let client_id = required(&args.client_id, "--client-id / RELAY_CLIENT_ID")?;
    let control_center_url = required(
        &args.control_center_url,
        "--control-center-url / RELAY_CONTROL_CENTER_URL",
    )?;
    let application = required(&args.application, "--app / RELAY_APP_NAME")?;
    let server = required(&args.argocd_server, "--argocd-server / ARGOCD_SERVER")?;

    Ok(AgentConfig {
        control_center_url,
        controller: ControllerConfig {
            server,
            auth_token: args.auth_token.clone(),
            insecure: args.insecure,
            cli_path: None,
            call_timeout_secs: 30,
        },
        clients: vec![ClientConfig {
            client_id,
            application,
            namespace: args.namespace.clone(),
        }],
        poll_interval_secs: args.poll_interval.unwrap_or(10),
        health_poll_interval_secs: 5,
        health_timeout_secs: 300,
    })
}

fn required(value: &Option<String>, flag: &str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required option {flag}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
