//! The control loop: poll the control center for pending change requests,
//! drive each accepted request through the rollout monitor, and fan the
//! terminal outcome back as a status report.
//!
//! One loop runs per managed client/application pair. Within a loop
//! execution is strictly sequential — poll, mutate, health-wait, report —
//! so the at-most-one-rollout-per-application invariant holds without any
//! locking: the loop simply never polls again while a rollout is in
//! flight.

use std::sync::Arc;
use std::time::Duration;

use argocd_client::{AppHandle, ArgoCdClient};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::{AgentConfig, ClientConfig};
use crate::control_center::ControlCenter;
use crate::error::Result;
use crate::monitor::{Controller, RolloutMonitor};
use crate::types::{ChangeRequest, StatusReport};

// ---------------------------------------------------------------------------
// LoopIntervals
// ---------------------------------------------------------------------------

/// Timing knobs for one loop. Split out from [`AgentConfig`] so tests can
/// run with sub-second intervals.
#[derive(Debug, Clone, Copy)]
pub struct LoopIntervals {
    /// Wall-clock pause between control-center polls. Fixed, not adaptive.
    pub poll: Duration,
    pub health_poll: Duration,
    pub health_timeout: Duration,
}

impl From<&AgentConfig> for LoopIntervals {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            poll: cfg.poll_interval(),
            health_poll: cfg.health_poll_interval(),
            health_timeout: cfg.health_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReconcileLoop
// ---------------------------------------------------------------------------

pub struct ReconcileLoop<C> {
    center: Arc<ControlCenter>,
    controller: Arc<C>,
    client: ClientConfig,
    app: AppHandle,
    intervals: LoopIntervals,
    shutdown: watch::Receiver<bool>,
    /// Last request id driven to a terminal state. Re-polls of the same id
    /// (the control center may not have cleared its pending flag yet) are
    /// ignored.
    last_handled: Option<String>,
}

impl<C: Controller> ReconcileLoop<C> {
    pub fn new(
        center: Arc<ControlCenter>,
        controller: Arc<C>,
        client: ClientConfig,
        intervals: LoopIntervals,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let app = client.app_handle();
        Self {
            center,
            controller,
            client,
            app,
            intervals,
            shutdown,
            last_handled: None,
        }
    }

    /// Run until shutdown. A single iteration's error never aborts the
    /// loop; it is logged and the next tick gets another chance.
    pub async fn run(mut self) {
        tracing::info!(
            client_id = %self.client.client_id,
            app = %self.app,
            "reconciliation loop started"
        );

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            match self.center.poll_updates(&self.client.client_id).await {
                Ok(Some(request)) => self.handle_request(request).await,
                Ok(None) => {
                    tracing::trace!(client_id = %self.client.client_id, "no pending change");
                }
                Err(e) => {
                    tracing::warn!(
                        client_id = %self.client.client_id,
                        error = %e,
                        "poll failed; retrying next tick"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.intervals.poll) => {}
                res = self.shutdown.changed() => {
                    if res.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(client_id = %self.client.client_id, "reconciliation loop stopped");
    }

    async fn handle_request(&mut self, request: ChangeRequest) {
        if self.last_handled.as_deref() == Some(request.request_id.as_str()) {
            tracing::debug!(
                client_id = %self.client.client_id,
                request_id = %request.request_id,
                "request already handled; pending flag not yet cleared"
            );
            return;
        }

        let monitor = RolloutMonitor::new(
            &*self.controller,
            &self.app,
            self.intervals.health_poll,
            self.intervals.health_timeout,
        );
        let state = monitor.execute(&request, &mut self.shutdown).await;

        let report = StatusReport::from_state(&self.client.client_id, &state);
        match self.center.report_status(&report).await {
            Ok(()) => {
                tracing::info!(
                    client_id = %self.client.client_id,
                    request_id = %report.request_id,
                    outcome = %report.outcome,
                    "status reported"
                );
            }
            Err(e) => {
                // At-most-once reporting: the report is dropped rather than
                // blocking subsequent rollouts.
                tracing::error!(
                    client_id = %self.client.client_id,
                    request_id = %report.request_id,
                    outcome = %report.outcome,
                    error = %e,
                    "failed to deliver status report; dropping it"
                );
            }
        }

        // Local rollout state is cleared here regardless of delivery:
        // `state` goes out of scope and only the handled id is retained.
        self.last_handled = Some(request.request_id);
    }
}

// ---------------------------------------------------------------------------
// run_all
// ---------------------------------------------------------------------------

/// Spawn one reconciliation loop per configured client and wait for all of
/// them to stop. The control-center and controller handles are shared
/// read-only across loops.
pub async fn run_all(config: AgentConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    let center = Arc::new(ControlCenter::new(&config.control_center_url)?);
    let controller = Arc::new(ArgoCdClient::new(config.controller.connect_options()));
    let intervals = LoopIntervals::from(&config);

    let mut set = JoinSet::new();
    for client in &config.clients {
        let l = ReconcileLoop::new(
            Arc::clone(&center),
            Arc::clone(&controller),
            client.clone(),
            intervals,
            shutdown.clone(),
        );
        set.spawn(l.run());
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            tracing::error!(error = %e, "reconciliation task panicked");
        }
    }
    Ok(())
}
