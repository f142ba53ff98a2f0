//! Subprocess invocation for controller CLI commands.
//!
//! Every call is bounded by the configured per-call timeout. Exit-code and
//! stderr classification happens here so callers only see the
//! [`ControllerError`] taxonomy.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{ControllerError, Result};

/// Run a command to completion, capturing stdout, with a hard timeout.
///
/// `op` names the logical operation (`app set`, `app sync`, ...) for error
/// messages. On success the captured stdout is returned.
pub(crate) async fn run_capture(mut cmd: Command, op: &str, timeout: Duration) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(op, "invoking controller CLI");

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => {
            return Err(ControllerError::Unreachable(format!(
                "`{op}` did not complete within {}s",
                timeout.as_secs()
            )))
        }
        Ok(Err(e)) => {
            return Err(ControllerError::Unreachable(format!(
                "failed to run `{op}`: {e}"
            )))
        }
        Ok(Ok(output)) => output,
    };

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let detail = if stderr.is_empty() {
        format!(
            "exited with {}",
            output.status.code().map_or_else(
                || "signal".to_string(),
                |c| format!("code {c}")
            )
        )
    } else {
        stderr.clone()
    };

    if looks_unreachable(&stderr) {
        Err(ControllerError::Unreachable(detail))
    } else {
        Err(ControllerError::Rejected {
            op: op.to_string(),
            detail,
        })
    }
}

/// Heuristic split between "the controller refused" and "the controller
/// could not be reached". The CLI reports both through a non-zero exit, so
/// stderr text is the only signal.
fn looks_unreachable(stderr: &str) -> bool {
    const PATTERNS: &[&str] = &[
        "connection refused",
        "connection reset",
        "no such host",
        "dial tcp",
        "context deadline exceeded",
        "i/o timeout",
        "certificate",
        "transport is closing",
        "failed to establish",
    ];
    let lower = stderr.to_lowercase();
    PATTERNS.iter().any(|p| lower.contains(p))
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn success_returns_stdout() {
        let out = run_capture(sh("echo hello"), "app get", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_with_validation_stderr_is_rejected() {
        let err = run_capture(
            sh("echo 'rpc error: application spec is invalid' >&2; exit 1"),
            "app set",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ControllerError::Rejected { op, detail } => {
                assert_eq!(op, "app set");
                assert!(detail.contains("spec is invalid"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_with_network_stderr_is_unreachable() {
        let err = run_capture(
            sh("echo 'dial tcp 10.0.0.1:443: connection refused' >&2; exit 1"),
            "app sync",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ControllerError::Unreachable(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_unreachable() {
        let err = run_capture(
            Command::new("definitely-not-a-real-binary-4471"),
            "version",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ControllerError::Unreachable(_)));
    }

    #[tokio::test]
    async fn hung_command_hits_the_call_timeout() {
        let err = run_capture(sh("sleep 5"), "app get", Duration::from_millis(100))
            .await
            .unwrap_err();
        match err {
            ControllerError::Unreachable(msg) => assert!(msg.contains("did not complete")),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_patterns_are_case_insensitive() {
        assert!(looks_unreachable("Dial TCP: Connection Refused"));
        assert!(looks_unreachable("context deadline exceeded"));
        assert!(!looks_unreachable("application not found"));
        assert!(!looks_unreachable(""));
    }
}
