//! `argocd-client` — typed async driver for the GitOps controller CLI.
//!
//! The controller is treated as a black-box reconciler reached through its
//! command-line interface: parameter set, sync trigger, and JSON status
//! read, each a bounded subprocess invocation.
//!
//! # Architecture
//!
//! ```text
//! ConnectOptions
//!     │
//!     ▼
//! ArgoCdClient    ← builds `argocd app set|sync|get …` invocations
//!     │              (credentials as per-call flags, no login session)
//!     ▼
//! exec            ← runs the subprocess with a hard per-call timeout,
//!     │              classifies exit code + stderr into ControllerError
//!     ▼
//! AppStatus       ← sync/health vocabulary decoded from `-o json` output
//! ```
//!
//! The client never retries: mutating calls are single-shot so the caller
//! owns partial-failure semantics.

pub mod client;
pub mod error;
pub mod status;

pub(crate) mod exec;

pub use client::{ArgoCdClient, ConnectOptions};
pub use error::ControllerError;
pub use status::{AppHandle, AppStatus, HealthStatus, SyncStatus};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ControllerError>;
