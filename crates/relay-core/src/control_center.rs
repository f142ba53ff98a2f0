//! HTTP client for the control center: poll for pending change requests,
//! push status reports, and (for operator tooling only) drive the admin
//! endpoints.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AgentError, Result};
use crate::types::{ChangeRequest, StatusReport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// ControlCenter
// ---------------------------------------------------------------------------

/// Shared read-only across reconciliation loops; `reqwest::Client` pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct ControlCenter {
    http: reqwest::Client,
    base_url: String,
}

impl ControlCenter {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Poll for a pending change request. `None` is the expected steady
    /// state, not an error.
    pub async fn poll_updates(&self, client_id: &str) -> Result<Option<ChangeRequest>> {
        let url = self.url(&format!("/api/v1/clients/{client_id}/updates"));
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::UnexpectedStatus {
                url,
                status: resp.status().as_u16(),
            });
        }
        let body: UpdatesResponse = resp.json().await?;
        if !body.pending {
            return Ok(None);
        }
        match (body.request_id, body.image_tag) {
            (Some(request_id), Some(image_tag)) => Ok(Some(ChangeRequest {
                request_id,
                image_tag,
            })),
            _ => Err(AgentError::MalformedResponse(
                "pending update without request_id/image_tag".into(),
            )),
        }
    }

    /// Push a terminal rollout outcome. The caller treats delivery failure
    /// as log-and-drop; this method just surfaces it.
    pub async fn report_status(&self, report: &StatusReport) -> Result<()> {
        let url = self.url(&format!("/api/v1/clients/{}/status", report.client_id));
        let resp = self.http.post(&url).json(report).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::UnexpectedStatus {
                url,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Startup connectivity probe.
    pub async fn check_health(&self) -> Result<()> {
        let url = self.url("/health");
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::UnexpectedStatus {
                url,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Admin endpoints — operator/test tooling only, never called by the
    // reconciliation loop.
    // -----------------------------------------------------------------------

    /// Seed a deployment request on the control center.
    pub async fn trigger_deployment(&self, image_tag: &str) -> Result<serde_json::Value> {
        let url = self.url("/api/v1/admin/trigger-deployment");
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "image_tag": image_tag }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AgentError::UnexpectedStatus {
                url,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    /// Pending update and report history, as the control center sees them.
    pub async fn admin_status(&self) -> Result<serde_json::Value> {
        let url = self.url("/api/v1/admin/status");
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::UnexpectedStatus {
                url,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    pending: bool,
    #[serde(default)]
    image_tag: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
