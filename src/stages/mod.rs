//! Pipeline stages of the blue/green workflow.
//!
//! Every stage is a plain async function over injected collaborators that
//! returns a [`StageOutcome`]; [`runner::run_stage`] turns that outcome into
//! the single report the orchestrator receives.

pub mod create_green;
pub mod decommission;
pub mod directory;
pub mod readiness;
pub mod rollback;
pub mod runner;
pub mod swap;

use clap::ValueEnum;
use indexmap::IndexMap;
use log::info;

use crate::config::PollingConfig;
use crate::error::Result;
use crate::job::{JobReport, UserParameters};
use crate::providers::{ControlPlane, ObjectStore};

use self::directory::EnvironmentDirectory;

/// Result of one stage, checked explicitly by the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed {
        message: String,
        output_variables: IndexMap<String, String>,
    },
    /// Nothing to do; counts as success.
    Skipped { reason: String },
    Failed { reason: String },
}

impl StageOutcome {
    pub fn completed(message: impl Into<String>) -> Self {
        Self::Completed {
            message: message.into(),
            output_variables: IndexMap::new(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn with_output(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Self::Completed {
            output_variables, ..
        } = &mut self
        {
            output_variables.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn into_report(self) -> JobReport {
        match self {
            Self::Completed {
                output_variables, ..
            } => JobReport::Success { output_variables },
            Self::Skipped { .. } => JobReport::Success {
                output_variables: IndexMap::new(),
            },
            Self::Failed { reason } => JobReport::failure(reason),
        }
    }
}

/// Collaborators and settings shared by all stages of one invocation.
pub struct StageContext<'a> {
    pub control_plane: &'a dyn ControlPlane,
    pub store: &'a dyn ObjectStore,
    pub polling: &'a PollingConfig,
    /// Application name used when the user parameters do not carry one.
    pub default_application: Option<&'a str>,
}

/// Which of the two environments a stage acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// The older, currently live environment.
    Blue,
    /// The newer staging environment.
    Green,
}

/// Blue and green environment names, taken from the user parameters when
/// both are present, otherwise rediscovered through the directory.
pub async fn resolve_pair(
    ctx: &StageContext<'_>,
    params: &UserParameters,
) -> Result<(String, String)> {
    if let Some((blue, green)) = params.explicit_pair() {
        return Ok((blue.to_string(), green.to_string()));
    }

    let application = params.application_name(ctx.default_application)?;
    let deployment = EnvironmentDirectory::new(ctx.control_plane)
        .discover(application)
        .await?;
    info!(
        "Discovered blue [{}] and green [{}] for {application}",
        deployment.blue.name, deployment.green.name
    );
    Ok((deployment.blue.name, deployment.green.name))
}
