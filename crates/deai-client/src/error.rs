use ic_agent::identity::PemError;
use ic_agent::AgentError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("candid error: {0}")]
    Candid(#[from] candid::Error),

    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to generate key pair: {0}")]
    KeyGeneration(String),

    #[error("failed to read private key: {0}")]
    Pem(#[from] PemError),

    #[error("invalid principal {text:?}: {reason}")]
    Principal { text: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unexpected return value: {0}")]
    UnexpectedReturn(String),
}
