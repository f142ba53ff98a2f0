//! `relay-core` — deployment reconciliation agent library.
//!
//! A long-running control loop polls the control center for desired-state
//! change requests (target image version per client), applies them to the
//! GitOps controller, and tracks each rollout to a terminal outcome.
//!
//! # Architecture
//!
//! ```text
//! ReconcileLoop (one per client, sequential within itself)
//!     │ poll                                 ▲ report
//!     ▼                                      │
//! ControlCenter ── ChangeRequest ──> RolloutMonitor ── StatusReport
//!                                        │ set / sync / status polls
//!                                        ▼
//!                                    Controller (argocd-client)
//! ```
//!
//! Loops share nothing mutable: the control-center and controller handles
//! are read-only, and each loop owns its rollout state exclusively.

pub mod config;
pub mod control_center;
pub mod error;
pub mod monitor;
pub mod reconcile;
pub mod types;

pub use config::{AgentConfig, ClientConfig, ControllerConfig};
pub use control_center::ControlCenter;
pub use error::AgentError;
pub use monitor::{Controller, RolloutMonitor};
pub use reconcile::{run_all, LoopIntervals, ReconcileLoop};
pub use types::{ChangeRequest, Outcome, RolloutState, StatusReport};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
