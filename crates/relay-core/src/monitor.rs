//! Rollout monitor: drives a single change request from "requested" to a
//! terminal outcome.
//!
//! ```text
//! Requested --(set ok)--> ParamSet --(sync ok)--> Syncing
//! Syncing --(Synced + Healthy)----------------> Succeeded
//! Syncing --(Degraded/Missing after Synced)---> Failed
//! Syncing --(ceiling elapsed)-----------------> TimedOut
//! Requested|ParamSet --(set/sync error)-------> Failed
//! ```
//!
//! Mutating calls are never retried: a failure terminates the rollout and
//! the control center decides whether to re-issue the request.

use std::future::Future;
use std::time::Duration;

use argocd_client::{AppHandle, AppStatus, ArgoCdClient, ControllerError, HealthStatus, SyncStatus};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::types::{ChangeRequest, Outcome, RolloutState};

// ---------------------------------------------------------------------------
// Controller trait
// ---------------------------------------------------------------------------

/// The controller operations the monitor needs. Implemented by
/// [`ArgoCdClient`] and by scripted mocks in tests.
pub trait Controller: Send + Sync {
    fn set_target_version(
        &self,
        app: &AppHandle,
        version: &str,
    ) -> impl Future<Output = argocd_client::Result<()>> + Send;

    fn trigger_sync(&self, app: &AppHandle) -> impl Future<Output = argocd_client::Result<()>> + Send;

    fn get_status(&self, app: &AppHandle)
        -> impl Future<Output = argocd_client::Result<AppStatus>> + Send;
}

impl Controller for ArgoCdClient {
    async fn set_target_version(&self, app: &AppHandle, version: &str) -> argocd_client::Result<()> {
        ArgoCdClient::set_target_version(self, app, version).await
    }

    async fn trigger_sync(&self, app: &AppHandle) -> argocd_client::Result<()> {
        ArgoCdClient::trigger_sync(self, app).await
    }

    async fn get_status(&self, app: &AppHandle) -> argocd_client::Result<AppStatus> {
        ArgoCdClient::get_status(self, app).await
    }
}

// ---------------------------------------------------------------------------
// RolloutMonitor
// ---------------------------------------------------------------------------

pub struct RolloutMonitor<'a, C> {
    controller: &'a C,
    app: &'a AppHandle,
    /// Fixed interval between status polls.
    poll_interval: Duration,
    /// Ceiling on the whole health wait.
    timeout: Duration,
}

impl<'a, C: Controller> RolloutMonitor<'a, C> {
    pub fn new(
        controller: &'a C,
        app: &'a AppHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            controller,
            app,
            poll_interval,
            timeout,
        }
    }

    /// Drive one change request to a terminal [`RolloutState`].
    pub async fn execute(
        &self,
        request: &ChangeRequest,
        shutdown: &mut watch::Receiver<bool>,
    ) -> RolloutState {
        let mut state = RolloutState::new(request);
        tracing::info!(
            app = %self.app,
            request_id = %request.request_id,
            target = %request.image_tag,
            "rollout starting"
        );

        if let Err(e) = self
            .controller
            .set_target_version(self.app, &request.image_tag)
            .await
        {
            tracing::warn!(app = %self.app, error = %e, "parameter set failed");
            state.resolve(outcome_for(&e), Some(e.to_string()));
            return state;
        }

        if let Err(e) = self.controller.trigger_sync(self.app).await {
            tracing::warn!(app = %self.app, error = %e, "sync trigger failed");
            state.resolve(outcome_for(&e), Some(e.to_string()));
            return state;
        }

        self.wait_for_health(&mut state, shutdown).await;
        tracing::info!(
            app = %self.app,
            request_id = %state.request_id,
            outcome = %state.outcome.map(|o| o.as_str()).unwrap_or("pending"),
            "rollout resolved"
        );
        state
    }

    /// Poll the controller until the application settles, the ceiling
    /// elapses, or shutdown is requested. Transient status-read errors are
    /// tolerated until the ceiling.
    pub async fn wait_for_health(
        &self,
        state: &mut RolloutState,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let deadline = Instant::now() + self.timeout;
        // Guards against a stale Degraded reading left over from a prior
        // rollout: health is only believed after sync reaches Synced.
        let mut synced_seen = false;

        loop {
            if *shutdown.borrow() {
                state.resolve(
                    Outcome::TimedOut,
                    Some("agent shutdown during health wait".into()),
                );
                return;
            }

            match self.controller.get_status(self.app).await {
                Ok(status) => {
                    state.observe(&status);
                    if status.sync == SyncStatus::Synced {
                        synced_seen = true;
                    }
                    tracing::debug!(
                        app = %self.app,
                        sync = %status.sync,
                        health = %status.health,
                        operation_phase = status.operation_phase.as_deref().unwrap_or("-"),
                        "status poll"
                    );
                    if let Some((outcome, detail)) = classify(&status, synced_seen) {
                        state.resolve(outcome, detail);
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(app = %self.app, error = %e, "status poll failed; will retry");
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                state.resolve(
                    Outcome::TimedOut,
                    Some(format!(
                        "no terminal state within {}s (last observed sync={} health={})",
                        self.timeout.as_secs(),
                        state.sync_status,
                        state.health_status
                    )),
                );
                return;
            }

            let nap = remaining.min(self.poll_interval);
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        state.resolve(
                            Outcome::TimedOut,
                            Some("agent shutdown during health wait".into()),
                        );
                        return;
                    }
                }
            }
        }
    }
}

/// Classify an observation into a terminal outcome, if it is one.
///
/// A Degraded/Missing reading taken before Synced has been observed for
/// this rollout is not terminal — it may describe the previous generation.
fn classify(status: &AppStatus, synced_seen: bool) -> Option<(Outcome, Option<String>)> {
    if status.sync == SyncStatus::Synced && status.health == HealthStatus::Healthy {
        return Some((Outcome::Succeeded, None));
    }
    if synced_seen
        && matches!(
            status.health,
            HealthStatus::Degraded | HealthStatus::Missing
        )
    {
        return Some((
            Outcome::Failed,
            Some(format!("application {} after sync", status.health)),
        ));
    }
    None
}

fn outcome_for(err: &ControllerError) -> Outcome {
    match err {
        ControllerError::TimedOut(_) => Outcome::TimedOut,
        _ => Outcome::Failed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
