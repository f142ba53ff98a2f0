use std::path::Path;
use std::time::Duration;

use argocd_client::{AppHandle, ConnectOptions};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller server address (`host:port`).
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Skip TLS verification. Dev/test only.
    #[serde(default)]
    pub insecure: bool,
    /// Override the controller CLI executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<String>,
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

fn default_call_timeout() -> u64 {
    30
}

impl ControllerConfig {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            server: self.server.clone(),
            auth_token: self.auth_token.clone(),
            insecure: self.insecure,
            cli_path: self.cli_path.clone(),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// One managed client/application pair. Each entry gets its own
/// reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Identity used when polling the control center.
    pub client_id: String,
    /// GitOps application name.
    pub application: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ClientConfig {
    pub fn app_handle(&self) -> AppHandle {
        AppHandle {
            name: self.application.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Control center base URL (e.g. `http://gcc.internal:5000`).
    pub control_center_url: String,
    pub controller: ControllerConfig,
    pub clients: Vec<ClientConfig>,
    /// Seconds between control-center polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Seconds between controller status polls during a rollout.
    #[serde(default = "default_health_poll_interval")]
    pub health_poll_interval_secs: u64,
    /// Ceiling on the health wait; matches the controller's settle time.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_health_poll_interval() -> u64 {
    5
}

fn default_health_timeout() -> u64 {
    300
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: AgentConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Reject a config the agent cannot start with. Called before any loop
    /// is spawned; a failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.control_center_url.trim().is_empty() {
            return Err(AgentError::Config("control_center_url is required".into()));
        }
        if self.controller.server.trim().is_empty() {
            return Err(AgentError::Config("controller.server is required".into()));
        }
        if self.clients.is_empty() {
            return Err(AgentError::Config(
                "at least one client entry is required".into(),
            ));
        }
        for client in &self.clients {
            if client.client_id.trim().is_empty() {
                return Err(AgentError::Config("client_id must not be empty".into()));
            }
            if client.application.trim().is_empty() {
                return Err(AgentError::Config(format!(
                    "client '{}' has no application name",
                    client.client_id
                )));
            }
        }
        if self.poll_interval_secs == 0 || self.health_poll_interval_secs == 0 {
            return Err(AgentError::Config("poll intervals must be non-zero".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
control_center_url: http://localhost:5000
controller:
  server: localhost:8080
clients:
  - client_id: "101"
    application: demo-app
"#
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: AgentConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.poll_interval_secs, 10);
        assert_eq!(cfg.health_poll_interval_secs, 5);
        assert_eq!(cfg.health_timeout_secs, 300);
        assert_eq!(cfg.controller.call_timeout_secs, 30);
        assert!(!cfg.controller.insecure);
    }

    #[test]
    fn load_reads_a_yaml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", minimal_yaml()).unwrap();
        let cfg = AgentConfig::load(file.path()).unwrap();
        assert_eq!(cfg.clients[0].application, "demo-app");
    }

    #[test]
    fn load_fails_for_missing_file() {
        assert!(AgentConfig::load(Path::new("/nonexistent/relay.yaml")).is_err());
    }

    #[test]
    fn roundtrip_preserves_clients() {
        let cfg: AgentConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.clients.len(), 1);
        assert_eq!(parsed.clients[0].client_id, "101");
        assert_eq!(parsed.clients[0].application, "demo-app");
    }

    #[test]
    fn empty_clients_fails_validation() {
        let yaml = r#"
control_center_url: http://localhost:5000
controller:
  server: localhost:8080
clients: []
"#;
        let cfg: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("at least one client"));
    }

    #[test]
    fn blank_client_id_fails_validation() {
        let yaml = r#"
control_center_url: http://localhost:5000
controller:
  server: localhost:8080
clients:
  - client_id: "  "
    application: demo-app
"#;
        let cfg: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let yaml = r#"
control_center_url: http://localhost:5000
controller:
  server: localhost:8080
clients:
  - client_id: "101"
    application: demo-app
poll_interval_secs: 0
"#;
        let cfg: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn app_handle_carries_namespace() {
        let client = ClientConfig {
            client_id: "101".into(),
            application: "demo-app".into(),
            namespace: Some("prod".into()),
        };
        let handle = client.app_handle();
        assert_eq!(handle.name, "demo-app");
        assert_eq!(handle.namespace.as_deref(), Some("prod"));
    }
}
