use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlueGreenError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid user parameters: {0}")]
    InvalidParameters(String),

    #[error(
        "Insufficient environments: application {application} has {found}, at least 2 are required"
    )]
    InsufficientEnvironments { application: String, found: usize },

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Environment {name} is {status} and will never become Ready")]
    EnvironmentUnavailable { name: String, status: String },

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("FunctionTimeOut: {stage} did not finish before the job deadline")]
    Timeout { stage: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BlueGreenError {
    pub fn timeout(stage: impl Into<String>) -> Self {
        Self::Timeout {
            stage: stage.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BlueGreenError>;
