use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller could not be reached: spawn failure, a call that hit
    /// its own timeout, or a network-level failure reported on stderr.
    #[error("controller unreachable: {0}")]
    Unreachable(String),

    /// The controller refused the request (validation failure, unknown
    /// application, bad parameter, ...). Not retried by the client.
    #[error("controller rejected `{op}`: {detail}")]
    Rejected { op: String, detail: String },

    /// The application did not reach a terminal sync/health combination
    /// within the health-wait ceiling.
    #[error("timed out after {0}s waiting for the application to settle")]
    TimedOut(u64),

    #[error("failed to parse controller status output: {source}\n  output: {output}")]
    Parse {
        output: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ControllerError>;
