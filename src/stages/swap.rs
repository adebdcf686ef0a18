use clap::ValueEnum;
use log::{info, warn};

use crate::error::{BlueGreenError, Result};
use crate::job::PipelineJob;
use crate::providers::ControlPlane;

use super::{resolve_pair, StageContext, StageOutcome};

/// Which environment is passed as the swap source.
///
/// The control plane exchanges the two addresses either way; the direction
/// fixes the argument order so every stage issues the same call for the same
/// intent, independent of where the environments sit in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwapDirection {
    /// Move live traffic onto green: source green, destination blue.
    Promote,
    /// Hand live traffic back to blue: source blue, destination green.
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPair {
    pub source: String,
    pub destination: String,
}

impl SwapDirection {
    pub fn pair(self, blue: &str, green: &str) -> SwapPair {
        let (source, destination) = match self {
            Self::Promote => (green, blue),
            Self::Revert => (blue, green),
        };
        SwapPair {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }
}

pub struct SwapCoordinator<'a> {
    control_plane: &'a dyn ControlPlane,
}

impl<'a> SwapCoordinator<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane) -> Self {
        Self { control_plane }
    }

    /// Swaps the live alias when, and only when, both environments are Ready.
    /// Anything else is a failure that leaves the environments untouched.
    pub async fn swap(&self, pair: &SwapPair) -> Result<StageOutcome> {
        if pair.source == pair.destination {
            return Err(BlueGreenError::InvalidParameters(format!(
                "cannot swap {} with itself",
                pair.source
            )));
        }
        info!("from [{}] to [{}]", pair.source, pair.destination);

        let environments = self
            .control_plane
            .describe_environments(&[pair.source.as_str(), pair.destination.as_str()])
            .await?;
        let status_of = |name: &str| {
            environments
                .iter()
                .find(|env| env.name == name)
                .map(|env| env.status.clone())
        };

        let (source_status, destination_status) =
            match (status_of(pair.source.as_str()), status_of(pair.destination.as_str())) {
                (Some(source), Some(destination)) => (source, destination),
                (None, _) => return Err(BlueGreenError::EnvironmentNotFound(pair.source.clone())),
                (_, None) => {
                    return Err(BlueGreenError::EnvironmentNotFound(
                        pair.destination.clone(),
                    ))
                }
            };

        if !(source_status.is_ready() && destination_status.is_ready()) {
            warn!(
                "Not swapping: {} is {source_status}, {} is {destination_status}",
                pair.source, pair.destination
            );
            return Ok(StageOutcome::failed(format!(
                "Both environments must be Ready to swap: {} is {source_status}, {} is {destination_status}",
                pair.source, pair.destination
            )));
        }

        self.control_plane
            .swap_environment_cnames(&pair.source, &pair.destination)
            .await?;
        info!("Swapped {} and {}", pair.source, pair.destination);

        Ok(StageOutcome::completed(format!(
            "Swapped {} and {}",
            pair.source, pair.destination
        ))
        .with_output("SourceEnvName", pair.source.as_str())
        .with_output("DestinationEnvName", pair.destination.as_str()))
    }
}

/// `swap` stage.
pub async fn run(
    ctx: &StageContext<'_>,
    job: &PipelineJob,
    direction: SwapDirection,
) -> Result<StageOutcome> {
    let params = job.parameters()?;
    let (blue, green) = resolve_pair(ctx, &params).await?;
    let pair = direction.pair(&blue, &green);

    SwapCoordinator::new(ctx.control_plane).swap(&pair).await
}
