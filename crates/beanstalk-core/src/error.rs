use crate::types::ActionKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeanstalkError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid jitter range: min {min}s is greater than max {max}s")]
    InvalidJitter { min: u64, max: u64 },

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("credential rejected for account #{0}: session is invalid or expired")]
    CredentialRejected(usize),

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("{kind} gave up after {failures} failed attempts")]
    FailureCeiling { kind: ActionKind, failures: u32 },

    #[error("{kind} unavailable: {reason}")]
    ActionUnavailable { kind: ActionKind, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for BeanstalkError {
    fn from(e: reqwest::Error) -> Self {
        BeanstalkError::Remote(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BeanstalkError>;
