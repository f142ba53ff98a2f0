use argocd_client::ControllerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("control center request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control center returned HTTP {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("malformed control center response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
