use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

use crate::auth::Token;
use crate::config::{Config, EndpointConfig};
use crate::deadline::Deadline;
use crate::job::{JobEvent, JobReport};
use crate::output;
use crate::providers::{HostingClient, ObjectStorageClient, PipelineClient, RetryPolicy};
use crate::stages::decommission::{self, DecommissionTarget};
use crate::stages::runner::run_stage;
use crate::stages::swap::{self, SwapDirection};
use crate::stages::{create_green, directory, rollback, Role, StageContext};

#[derive(Parser)]
#[command(name = "bluegreen")]
#[command(author, version, about = "Blue/green deployment pipeline stages", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Job event JSON; `-` or omitted reads stdin
    #[arg(short, long, global = true)]
    event: Option<PathBuf>,

    /// Milliseconds left before the invocation is killed
    #[arg(long, global = true, env = "PIPELINE_REMAINING_MS")]
    remaining_ms: Option<u64>,

    /// Application used when the job parameters do not name one
    #[arg(short, long, global = true, env = "BLUEGREEN_APPLICATION")]
    application: Option<String>,

    #[arg(long, global = true, env = "BLUEGREEN_CONTROL_PLANE_URL")]
    control_plane_url: Option<String>,

    #[arg(long, global = true, env = "BLUEGREEN_STORAGE_URL")]
    storage_url: Option<String>,

    #[arg(long, global = true, env = "BLUEGREEN_ORCHESTRATOR_URL")]
    orchestrator_url: Option<String>,

    /// Bearer token for every service that has none configured
    #[arg(short, long, global = true, env = "BLUEGREEN_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the blue and green environments of the application
    Discover,

    /// Provision green from blue's configuration
    CreateGreen,

    /// Swap the live address between blue and green
    Swap {
        #[arg(short, long, value_enum, default_value_t = SwapDirection::Promote)]
        direction: SwapDirection,
    },

    /// Terminate an environment once it is Ready
    #[command(group(ArgGroup::new("which").required(true).args(["target", "environment"])))]
    Decommission {
        #[arg(long, value_enum)]
        target: Option<Role>,

        #[arg(long)]
        environment: Option<String>,

        /// Also delete the configuration template and CNAME record
        #[arg(long, default_value_t = false)]
        cleanup: bool,
    },

    /// Swap back to blue and tear green down
    Rollback,
}

impl Commands {
    fn stage_name(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::CreateGreen => "create-green",
            Self::Swap { .. } => "swap",
            Self::Decommission { .. } => "decommission",
            Self::Rollback => "rollback",
        }
    }
}

impl Cli {
    fn endpoint(
        &self,
        endpoint: &EndpointConfig,
        url_override: Option<&String>,
    ) -> (String, Option<Token>) {
        let url = url_override.unwrap_or(&endpoint.base_url).clone();
        let token = endpoint
            .token
            .as_deref()
            .or(self.token.as_deref())
            .map(Token::from);
        (url, token)
    }

    /// The platform's remaining time was sampled at `started`; config
    /// loading and reading the event already count against it.
    fn deadline(&self, config: &Config, started: Instant) -> Deadline {
        let remaining = self
            .remaining_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.polling.default_budget());
        Deadline::starting_at(started, remaining, config.polling.safety_margin())
    }

    pub async fn execute(&self) -> Result<JobReport> {
        let started = Instant::now();
        let config = Config::load(self.config.as_deref())?;
        let retry = RetryPolicy::from(&config.retry);

        let (url, token) = self.endpoint(&config.control_plane, self.control_plane_url.as_ref());
        let hosting = HostingClient::new(&url, token, retry)
            .with_context(|| format!("Invalid control plane URL: {url}"))?;
        let (url, token) = self.endpoint(&config.storage, self.storage_url.as_ref());
        let storage = ObjectStorageClient::new(&url, token, retry)
            .with_context(|| format!("Invalid storage URL: {url}"))?;
        let (url, token) = self.endpoint(&config.orchestrator, self.orchestrator_url.as_ref());
        let pipeline = PipelineClient::new(&url, token, retry)
            .with_context(|| format!("Invalid orchestrator URL: {url}"))?;

        let event = JobEvent::read(self.event.as_deref())?;
        let job = event.into_job(self.deadline(&config, started));
        let stage = self.command.stage_name();
        info!(
            "Job {} running {stage} with {:?} left",
            job.id,
            job.deadline.remaining()
        );

        let ctx = StageContext {
            control_plane: &hosting,
            store: &storage,
            polling: &config.polling,
            default_application: self.application.as_deref(),
        };

        let report = match &self.command {
            Commands::Discover => {
                run_stage(&pipeline, &job, stage, directory::run(&ctx, &job)).await?
            }
            Commands::CreateGreen => {
                run_stage(&pipeline, &job, stage, create_green::run(&ctx, &job)).await?
            }
            Commands::Swap { direction } => {
                run_stage(&pipeline, &job, stage, swap::run(&ctx, &job, *direction)).await?
            }
            Commands::Decommission {
                target,
                environment,
                cleanup,
            } => {
                let target = match (target, environment) {
                    (_, Some(name)) => DecommissionTarget::Named(name.clone()),
                    (Some(role), None) => DecommissionTarget::Role(*role),
                    (None, None) => bail!("decommission needs --target or --environment"),
                };
                run_stage(
                    &pipeline,
                    &job,
                    stage,
                    decommission::run(&ctx, &job, &target, *cleanup),
                )
                .await?
            }
            Commands::Rollback => {
                run_stage(&pipeline, &job, stage, rollback::run(&ctx, &job)).await?
            }
        };

        output::print_report(stage, &report);
        Ok(report)
    }
}
