use std::time::Duration;

use tokio::process::Command;

use crate::error::Result;
use crate::exec::run_capture;
use crate::status::{AppHandle, AppStatus};

// ─── ConnectOptions ───────────────────────────────────────────────────────

/// How to reach the controller. Credentials are carried as flags on every
/// invocation rather than a stateful login session, so a single client can
/// be shared read-only across concurrent loops.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Controller server address (`host:port`).
    pub server: String,
    pub auth_token: Option<String>,
    /// Skip TLS verification. Dev/test only.
    pub insecure: bool,
    /// Override the CLI executable (tests point this at a stub script).
    pub cli_path: Option<String>,
    /// Hard timeout applied to each CLI invocation.
    pub call_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            server: "localhost:8080".to_string(),
            auth_token: None,
            insecure: false,
            cli_path: None,
            call_timeout: Duration::from_secs(30),
        }
    }
}

// ─── ArgoCdClient ─────────────────────────────────────────────────────────

/// Thin typed wrapper over the controller CLI.
///
/// Mutating calls (`set_target_version`, `trigger_sync`) are at-least-once
/// network operations with no internal retry: retry policy belongs to the
/// caller so partial-failure semantics stay visible.
#[derive(Debug, Clone)]
pub struct ArgoCdClient {
    opts: ConnectOptions,
}

impl ArgoCdClient {
    pub fn new(opts: ConnectOptions) -> Self {
        Self { opts }
    }

    /// Pin the application's image tag. Idempotent at the controller:
    /// repeating the same version is accepted without error.
    pub async fn set_target_version(&self, app: &AppHandle, version: &str) -> Result<()> {
        let args = set_args(app, version);
        run_capture(self.command(&args, true), "app set", self.opts.call_timeout).await?;
        Ok(())
    }

    /// Request reconciliation. Returns once the sync operation is accepted;
    /// does not block until the application settles.
    pub async fn trigger_sync(&self, app: &AppHandle) -> Result<()> {
        let args = sync_args(app);
        run_capture(self.command(&args, true), "app sync", self.opts.call_timeout).await?;
        Ok(())
    }

    /// Point-in-time status read. Never mutates; always safe to call.
    pub async fn get_status(&self, app: &AppHandle) -> Result<AppStatus> {
        let args = get_args(app);
        let stdout =
            run_capture(self.command(&args, true), "app get", self.opts.call_timeout).await?;
        AppStatus::from_json(&stdout)
    }

    /// Pre-flight probe that the CLI exists and runs. Does not contact the
    /// server.
    pub async fn version_check(&self) -> Result<()> {
        let args = vec!["version".to_string(), "--client".to_string()];
        run_capture(self.command(&args, false), "version", self.opts.call_timeout).await?;
        Ok(())
    }

    fn command(&self, args: &[String], with_connection: bool) -> Command {
        let exe = self.opts.cli_path.as_deref().unwrap_or("argocd");
        let mut cmd = Command::new(exe);
        cmd.args(args);
        if with_connection {
            cmd.args(self.connection_args());
        }
        cmd
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = vec!["--server".to_string(), self.opts.server.clone()];
        if let Some(token) = &self.opts.auth_token {
            args.push("--auth-token".to_string());
            args.push(token.clone());
        }
        if self.opts.insecure {
            args.push("--insecure".to_string());
        }
        args
    }
}

// ─── Argument builders ────────────────────────────────────────────────────

fn set_args(app: &AppHandle, version: &str) -> Vec<String> {
    let mut args = vec![
        "app".to_string(),
        "set".to_string(),
        app.name.clone(),
        "--helm-set".to_string(),
        format!("image.tag={version}"),
    ];
    push_namespace(&mut args, app);
    args
}

fn sync_args(app: &AppHandle) -> Vec<String> {
    // --async: the monitor polls for settlement itself
    let mut args = vec![
        "app".to_string(),
        "sync".to_string(),
        app.name.clone(),
        "--prune".to_string(),
        "--async".to_string(),
    ];
    push_namespace(&mut args, app);
    args
}

fn get_args(app: &AppHandle) -> Vec<String> {
    let mut args = vec![
        "app".to_string(),
        "get".to_string(),
        app.name.clone(),
        "-o".to_string(),
        "json".to_string(),
    ];
    push_namespace(&mut args, app);
    args
}

fn push_namespace(args: &mut Vec<String>, app: &AppHandle) {
    if let Some(ns) = &app.namespace {
        args.push("--app-namespace".to_string());
        args.push(ns.clone());
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
