//! Data model for one rollout: the change request that starts it, the state
//! machine instance that tracks it, and the report that ends it.

use std::fmt;

use argocd_client::{AppStatus, HealthStatus, SyncStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChangeRequest
// ---------------------------------------------------------------------------

/// A desired-state delta for one managed application, produced by the
/// control center. Immutable once issued; consumed at most once per
/// `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub request_id: String,
    pub image_tag: String,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal result of a rollout. `TimedOut` is distinguished from `Failed`
/// so the control center can decide whether to re-trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RolloutState
// ---------------------------------------------------------------------------

/// State machine instance tracking one in-flight change. Created when a
/// `ChangeRequest` is accepted, mutated only by the rollout monitor, and
/// discarded once terminal and reported. At most one non-terminal instance
/// exists per application: the owning loop is sequential and holds at most
/// one.
#[derive(Debug, Clone)]
pub struct RolloutState {
    pub request_id: String,
    pub target_version: String,
    pub started_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub health_status: HealthStatus,
    /// `None` while the rollout is pending.
    pub outcome: Option<Outcome>,
    pub error_detail: Option<String>,
}

impl RolloutState {
    pub fn new(request: &ChangeRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            target_version: request.image_tag.clone(),
            started_at: Utc::now(),
            sync_status: SyncStatus::Unknown,
            health_status: HealthStatus::Unknown,
            outcome: None,
            error_detail: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record a controller status observation.
    pub fn observe(&mut self, status: &AppStatus) {
        self.sync_status = status.sync;
        self.health_status = status.health;
    }

    /// Move to a terminal outcome. Later resolutions are ignored: the first
    /// terminal outcome wins.
    pub fn resolve(&mut self, outcome: Outcome, detail: Option<String>) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
            self.error_detail = detail;
        }
    }
}

// ---------------------------------------------------------------------------
// StatusReport
// ---------------------------------------------------------------------------

/// Outcome pushed to the control center. Write-once; delivery is
/// at-most-once (a failed delivery is logged, not retried).
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Carried in the URL path, not the body.
    #[serde(skip)]
    pub client_id: String,
    pub request_id: String,
    pub outcome: Outcome,
    pub image_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    /// Build the report for a terminal rollout. Falls back to `Failed` if
    /// called on a non-terminal state, which the loop never does.
    pub fn from_state(client_id: &str, state: &RolloutState) -> Self {
        Self {
            client_id: client_id.to_string(),
            request_id: state.request_id.clone(),
            outcome: state.outcome.unwrap_or(Outcome::Failed),
            image_tag: state.target_version.clone(),
            error: state.error_detail.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChangeRequest {
        ChangeRequest {
            request_id: "req-1".into(),
            image_tag: "v2.0.0".into(),
        }
    }

    #[test]
    fn new_state_is_pending() {
        let state = RolloutState::new(&request());
        assert!(!state.is_terminal());
        assert_eq!(state.sync_status, SyncStatus::Unknown);
        assert_eq!(state.health_status, HealthStatus::Unknown);
    }

    #[test]
    fn first_resolution_wins() {
        let mut state = RolloutState::new(&request());
        state.resolve(Outcome::TimedOut, Some("ceiling".into()));
        state.resolve(Outcome::Succeeded, None);
        assert_eq!(state.outcome, Some(Outcome::TimedOut));
        assert_eq!(state.error_detail.as_deref(), Some("ceiling"));
    }

    #[test]
    fn report_body_matches_wire_contract() {
        let mut state = RolloutState::new(&request());
        state.resolve(Outcome::Failed, Some("degraded after sync".into()));
        let report = StatusReport::from_state("101", &state);
        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "request_id": "req-1",
                "outcome": "failed",
                "image_tag": "v2.0.0",
                "error": "degraded after sync"
            })
        );
    }

    #[test]
    fn report_omits_error_when_none() {
        let mut state = RolloutState::new(&request());
        state.resolve(Outcome::Succeeded, None);
        let report = StatusReport::from_state("101", &state);
        let body = serde_json::to_value(&report).unwrap();
        assert!(body.get("error").is_none());
        assert_eq!(body["outcome"], "succeeded");
    }

    #[test]
    fn outcome_serde_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&Outcome::TimedOut).unwrap(),
            "\"timed_out\""
        );
        let parsed: Outcome = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(parsed, Outcome::Succeeded);
    }
}
