use log::info;

use crate::deadline::Deadline;
use crate::environment::CnameRecord;
use crate::error::{BlueGreenError, Result};
use crate::job::{PipelineJob, UserParameters};
use crate::providers::{ControlPlane, ObjectStore};

use super::readiness::ReadinessWaiter;
use super::{resolve_pair, Role, StageContext, StageOutcome};

/// Environment a decommission stage acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecommissionTarget {
    Role(Role),
    Named(String),
}

/// Resources removed together with the environment in the extended flow.
/// Steps whose resource is not configured are skipped.
#[derive(Debug, Clone, Default)]
pub struct Cleanup<'p> {
    pub application: Option<&'p str>,
    pub template: Option<&'p str>,
    pub record: Option<(&'p str, &'p str)>,
}

impl<'p> Cleanup<'p> {
    /// A record location needs both bucket and key; only one of the two is a
    /// parameter error rather than a reason to skip the record.
    pub fn from_params(
        params: &'p UserParameters,
        application: Option<&'p str>,
    ) -> Result<Self> {
        let record = match (&params.cname_config_bucket, &params.cname_config_file) {
            (None, None) => None,
            _ => Some(params.cname_record_location()?),
        };
        Ok(Self {
            application,
            template: params.config_template_name.as_deref(),
            record,
        })
    }
}

/// Terminates environments, only ever from the Ready state.
pub struct Decommissioner<'a> {
    control_plane: &'a dyn ControlPlane,
    store: &'a dyn ObjectStore,
    waiter: ReadinessWaiter<'a>,
}

impl<'a> Decommissioner<'a> {
    pub fn new(ctx: &StageContext<'a>) -> Self {
        Self {
            control_plane: ctx.control_plane,
            store: ctx.store,
            waiter: ReadinessWaiter::new(ctx.control_plane, ctx.polling),
        }
    }

    /// Terminates `name` once it is Ready. An environment that is gone or on
    /// its way out is a successful no-op.
    pub async fn decommission(&self, name: &str, deadline: &Deadline) -> Result<StageOutcome> {
        let current = self
            .control_plane
            .describe_environments(&[name])
            .await?
            .into_iter()
            .find(|env| env.name == name);

        match current {
            None => {
                info!("{name} does not exist, nothing to terminate");
                return Ok(StageOutcome::skipped(format!("{name} does not exist")));
            }
            Some(env) if env.status.is_gone() => {
                info!("{name} is already {}", env.status);
                return Ok(StageOutcome::skipped(format!(
                    "{name} is already {}",
                    env.status
                )));
            }
            Some(_) => {}
        }

        self.waiter.wait_until_ready(name, deadline).await?;
        self.control_plane.terminate_environment(name).await?;
        info!("Successfully terminated {name}");

        Ok(
            StageOutcome::completed(format!("Terminated {name}"))
                .with_output("TerminatedEnvName", name),
        )
    }

    /// Extended flow: removes the configuration template and the CNAME
    /// record, then decommissions `name`.
    pub async fn decommission_with_cleanup(
        &self,
        name: &str,
        cleanup: &Cleanup<'_>,
        deadline: &Deadline,
    ) -> Result<StageOutcome> {
        match (cleanup.application, cleanup.template) {
            (Some(application), Some(template)) => {
                self.delete_config_template(application, template).await?;
            }
            _ => info!("No configuration template configured, skipping template cleanup"),
        }

        match cleanup.record {
            Some((bucket, key)) => {
                self.delete_cname_record(bucket, key).await?;
            }
            None => info!("No CNAME record configured, skipping record cleanup"),
        }

        self.decommission(name, deadline).await
    }

    /// Returns whether a template was deleted; an absent one is not an error.
    pub async fn delete_config_template(&self, application: &str, template: &str) -> Result<bool> {
        let templates = self
            .control_plane
            .list_configuration_templates(application)
            .await?;
        if !templates.iter().any(|t| t == template) {
            info!("Config template {template} does not exist");
            return Ok(false);
        }

        match self
            .control_plane
            .delete_configuration_template(application, template)
            .await
        {
            Ok(()) => {
                info!("Config template {template} deleted");
                Ok(true)
            }
            Err(BlueGreenError::Api { status: 404, .. }) => {
                info!("Config template {template} was already deleted");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Blue's pre-swap address as stored by `create-green`, if the record is
    /// still there.
    pub async fn read_cname_record(&self, bucket: &str, key: &str) -> Result<Option<CnameRecord>> {
        match self.store.get_object(bucket, key).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(BlueGreenError::ObjectNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns whether a record was deleted; an absent one is not an error.
    pub async fn delete_cname_record(&self, bucket: &str, key: &str) -> Result<bool> {
        if !self.store.object_exists(bucket, key).await? {
            info!("CNAME record {bucket}/{key} is already deleted");
            return Ok(false);
        }

        self.store.delete_object(bucket, key).await?;
        info!("Successfully deleted the CNAME record {bucket}/{key}");
        Ok(true)
    }
}

async fn resolve_target(
    ctx: &StageContext<'_>,
    params: &UserParameters,
    target: &DecommissionTarget,
) -> Result<String> {
    let explicit = match target {
        DecommissionTarget::Named(name) => return Ok(name.clone()),
        DecommissionTarget::Role(Role::Blue) => params.blue_env_name.as_deref(),
        DecommissionTarget::Role(Role::Green) => params.green_env_name.as_deref(),
    };
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }

    let (blue, green) = resolve_pair(ctx, params).await?;
    Ok(match target {
        DecommissionTarget::Role(Role::Green) => green,
        _ => blue,
    })
}

/// `decommission` stage.
pub async fn run(
    ctx: &StageContext<'_>,
    job: &PipelineJob,
    target: &DecommissionTarget,
    with_cleanup: bool,
) -> Result<StageOutcome> {
    let params = job.parameters()?;
    let name = resolve_target(ctx, &params, target).await?;
    let decommissioner = Decommissioner::new(ctx);

    if with_cleanup {
        let application = params.application_name(ctx.default_application).ok();
        let cleanup = Cleanup::from_params(&params, application)?;
        decommissioner
            .decommission_with_cleanup(&name, &cleanup, &job.deadline)
            .await
    } else {
        decommissioner.decommission(&name, &job.deadline).await
    }
}
