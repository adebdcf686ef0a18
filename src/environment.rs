use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the hosting control plane.
///
/// Only `Ready` makes an environment a swap or termination candidate. Any
/// status the control plane reports that is not listed here is kept verbatim
/// in `Other` and treated as "not ready".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentStatus {
    Launching,
    Updating,
    Ready,
    Terminating,
    Terminated,
    Other(String),
}

impl EnvironmentStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Terminating or Terminated: the environment is on its way out and can
    /// never become Ready again.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Launching => "Launching",
            Self::Updating => "Updating",
            Self::Ready => "Ready",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Other(status) => status,
        }
    }
}

impl From<String> for EnvironmentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Launching" => Self::Launching,
            "Updating" => Self::Updating,
            "Ready" => Self::Ready,
            "Terminating" => Self::Terminating,
            "Terminated" => Self::Terminated,
            _ => Self::Other(value),
        }
    }
}

impl From<EnvironmentStatus> for String {
    fn from(value: EnvironmentStatus) -> Self {
        match value {
            EnvironmentStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deployed instance of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    #[serde(rename = "EnvironmentName")]
    pub name: String,
    #[serde(rename = "EnvironmentId")]
    pub id: String,
    pub status: EnvironmentStatus,
    #[serde(rename = "DateCreated")]
    pub created_at: DateTime<Utc>,
    /// Externally visible address; the live alias moves between
    /// environments on swap.
    #[serde(rename = "CNAME", default)]
    pub cname: Option<String>,
    #[serde(default)]
    pub version_label: Option<String>,
}

/// Pre-swap address of the blue environment, persisted in object storage so
/// the cleanup stage knows what was live before the deployment cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnameRecord {
    #[serde(rename = "BlueEnvUrl")]
    pub blue_env_url: Option<String>,
}
