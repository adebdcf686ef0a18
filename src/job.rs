use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::deadline::Deadline;
use crate::error::{BlueGreenError, Result};

/// Payload the pipeline orchestrator hands to every stage invocation.
#[derive(Debug, Deserialize)]
pub struct JobEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: JobDescriptor,
}

#[derive(Debug, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    #[serde(default)]
    pub data: JobData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: HashMap<String, String>,
}

impl JobEvent {
    /// Reads the event from a file, or from stdin when `path` is `None` or `-`.
    pub fn read(path: Option<&Path>) -> anyhow::Result<Self> {
        let contents = match path {
            Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read job event: {}", path.display()))?,
            _ => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read job event from stdin")?;
                buffer
            }
        };

        serde_json::from_str(&contents).context("Failed to parse job event")
    }

    pub fn into_job(self, deadline: Deadline) -> PipelineJob {
        let JobDescriptor { id, data } = self.job;
        let user_parameters = data
            .action_configuration
            .configuration
            .get("UserParameters")
            .cloned();

        PipelineJob {
            id,
            user_parameters,
            deadline,
        }
    }
}

/// One orchestrator-issued unit of work.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub id: String,
    /// Raw `UserParameters` string; parsed by the stage so a malformed value
    /// is reported against this job instead of aborting the process.
    pub user_parameters: Option<String>,
    pub deadline: Deadline,
}

impl PipelineJob {
    pub fn parameters(&self) -> Result<UserParameters> {
        UserParameters::parse(self.user_parameters.as_deref())
    }
}

/// Per-run parameters configured on the pipeline action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserParameters {
    #[serde(rename = "BeanstalkAppName")]
    pub application_name: Option<String>,
    pub blue_env_name: Option<String>,
    pub green_env_name: Option<String>,
    #[serde(rename = "BlueCNAMEConfigBucket")]
    pub cname_config_bucket: Option<String>,
    #[serde(rename = "BlueCNAMEConfigFile")]
    pub cname_config_file: Option<String>,
    #[serde(rename = "CreateConfigTempName")]
    pub config_template_name: Option<String>,
}

impl UserParameters {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| BlueGreenError::InvalidParameters(format!("{e}"))),
        }
    }

    pub fn application_name<'a>(&'a self, fallback: Option<&'a str>) -> Result<&'a str> {
        self.application_name
            .as_deref()
            .or(fallback)
            .ok_or_else(|| missing("BeanstalkAppName"))
    }

    pub fn blue_env_name(&self) -> Result<&str> {
        required(&self.blue_env_name, "BlueEnvName")
    }

    pub fn green_env_name(&self) -> Result<&str> {
        required(&self.green_env_name, "GreenEnvName")
    }

    pub fn config_template_name(&self) -> Result<&str> {
        required(&self.config_template_name, "CreateConfigTempName")
    }

    /// Bucket and key of the CNAME record.
    pub fn cname_record_location(&self) -> Result<(&str, &str)> {
        Ok((
            required(&self.cname_config_bucket, "BlueCNAMEConfigBucket")?,
            required(&self.cname_config_file, "BlueCNAMEConfigFile")?,
        ))
    }

    /// Both environment names, when the payload carries them explicitly.
    pub fn explicit_pair(&self) -> Option<(&str, &str)> {
        Some((
            self.blue_env_name.as_deref()?,
            self.green_env_name.as_deref()?,
        ))
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| missing(key))
}

fn missing(key: &str) -> BlueGreenError {
    BlueGreenError::InvalidParameters(format!("missing user parameter `{key}`"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    JobFailed,
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobFailed => "JobFailed",
        }
    }
}

/// The single terminal signal sent to the orchestrator for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Success {
        output_variables: IndexMap<String, String>,
    },
    Failure {
        message: String,
        failure_type: FailureType,
    },
}

impl JobReport {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            failure_type: FailureType::JobFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
