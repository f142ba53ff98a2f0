//! Application identity and status vocabulary.
//!
//! `AppStatus` is decoded from the controller's `app get -o json` output.
//! Unrecognized status strings degrade to `Unknown` rather than failing the
//! poll — the controller is free to grow its vocabulary.

use std::fmt;

use serde::Deserialize;

use crate::error::{ControllerError, Result};

// ─── AppHandle ────────────────────────────────────────────────────────────

/// Identifies one GitOps-managed application. Static configuration; never
/// mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppHandle {
    pub name: String,
    pub namespace: Option<String>,
}

impl AppHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

// ─── SyncStatus / HealthStatus ────────────────────────────────────────────

/// Whether the live state matches the declared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unknown,
    OutOfSync,
    Syncing,
    Synced,
}

impl SyncStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Synced" => SyncStatus::Synced,
            "OutOfSync" => SyncStatus::OutOfSync,
            "Syncing" => SyncStatus::Syncing,
            _ => SyncStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unknown => "Unknown",
            SyncStatus::OutOfSync => "OutOfSync",
            SyncStatus::Syncing => "Syncing",
            SyncStatus::Synced => "Synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness/readiness signal of the deployed workload, independent of sync
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Unknown,
    Progressing,
    Healthy,
    Degraded,
    Missing,
}

impl HealthStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Healthy" => HealthStatus::Healthy,
            "Progressing" => HealthStatus::Progressing,
            "Degraded" => HealthStatus::Degraded,
            "Missing" => HealthStatus::Missing,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "Unknown",
            HealthStatus::Progressing => "Progressing",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Missing => "Missing",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── AppStatus ────────────────────────────────────────────────────────────

/// Point-in-time application status as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStatus {
    pub sync: SyncStatus,
    pub health: HealthStatus,
    /// Phase of the most recent sync operation, when one is recorded
    /// (e.g. `Running`, `Succeeded`, `Failed`).
    pub operation_phase: Option<String>,
}

impl AppStatus {
    /// Decode the controller's `app get -o json` output.
    pub fn from_json(output: &str) -> Result<Self> {
        let raw: RawApp = serde_json::from_str(output).map_err(|source| ControllerError::Parse {
            output: truncate(output, 500),
            source,
        })?;
        Ok(Self {
            sync: SyncStatus::parse(&raw.status.sync.status),
            health: HealthStatus::parse(&raw.status.health.status),
            operation_phase: raw.status.operation_state.and_then(|op| op.phase),
        })
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync={} health={}", self.sync, self.health)
    }
}

// Raw mirror of the subset of the controller JSON we read. Everything is
// defaulted so a sparse document (e.g. an app that has never synced) still
// decodes.
#[derive(Deserialize)]
struct RawApp {
    #[serde(default)]
    status: RawStatus,
}

#[derive(Deserialize, Default)]
struct RawStatus {
    #[serde(default)]
    sync: RawField,
    #[serde(default)]
    health: RawField,
    #[serde(default, rename = "operationState")]
    operation_state: Option<RawOperation>,
}

#[derive(Deserialize, Default)]
struct RawField {
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct RawOperation {
    #[serde(default)]
    phase: Option<String>,
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_document() {
        let json = r#"{
            "metadata": {"name": "demo-app"},
            "status": {
                "sync": {"status": "Synced", "revision": "abc123"},
                "health": {"status": "Healthy"},
                "operationState": {"phase": "Succeeded"}
            }
        }"#;
        let status = AppStatus::from_json(json).unwrap();
        assert_eq!(status.sync, SyncStatus::Synced);
        assert_eq!(status.health, HealthStatus::Healthy);
        assert_eq!(status.operation_phase.as_deref(), Some("Succeeded"));
    }

    #[test]
    fn sparse_document_decodes_to_unknown() {
        let status = AppStatus::from_json("{}").unwrap();
        assert_eq!(status.sync, SyncStatus::Unknown);
        assert_eq!(status.health, HealthStatus::Unknown);
        assert!(status.operation_phase.is_none());
    }

    #[test]
    fn unrecognized_values_degrade_to_unknown() {
        let json = r#"{
            "status": {
                "sync": {"status": "SomethingNew"},
                "health": {"status": "Suspended"}
            }
        }"#;
        let status = AppStatus::from_json(json).unwrap();
        assert_eq!(status.sync, SyncStatus::Unknown);
        assert_eq!(status.health, HealthStatus::Unknown);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = AppStatus::from_json("not json").unwrap_err();
        assert!(matches!(err, ControllerError::Parse { .. }));
    }

    #[test]
    fn app_handle_display_includes_namespace() {
        assert_eq!(AppHandle::new("demo").to_string(), "demo");
        assert_eq!(
            AppHandle::with_namespace("demo", "prod").to_string(),
            "prod/demo"
        );
    }
}
