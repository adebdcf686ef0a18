use log::info;

use crate::environment::{CnameRecord, Environment};
use crate::error::{BlueGreenError, Result};
use crate::job::PipelineJob;
use crate::providers::{ControlPlane, ObjectStore};

use super::{StageContext, StageOutcome};

/// Idempotent provisioning of the green environment from blue's
/// configuration. Re-running the stage reuses whatever already exists.
pub struct GreenProvisioner<'a> {
    control_plane: &'a dyn ControlPlane,
    store: &'a dyn ObjectStore,
}

impl<'a> GreenProvisioner<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane, store: &'a dyn ObjectStore) -> Self {
        Self {
            control_plane,
            store,
        }
    }

    pub async fn describe_blue(&self, name: &str) -> Result<Environment> {
        self.control_plane
            .describe_environments(&[name])
            .await?
            .into_iter()
            .find(|env| env.name == name)
            .ok_or_else(|| BlueGreenError::EnvironmentNotFound(name.to_string()))
    }

    pub async fn ensure_config_template(
        &self,
        application: &str,
        blue: &Environment,
        template: &str,
    ) -> Result<String> {
        let templates = self
            .control_plane
            .list_configuration_templates(application)
            .await?;
        if templates.iter().any(|t| t == template) {
            info!("Config template {template} already exists");
            return Ok(template.to_string());
        }

        let created = self
            .control_plane
            .create_configuration_template(application, &blue.id, template)
            .await?;
        info!("Created config template {created} from {}", blue.name);
        Ok(created)
    }

    /// Id of the green environment, creating it unless a live one exists.
    pub async fn ensure_green(
        &self,
        application: &str,
        name: &str,
        template: &str,
        version_label: Option<&str>,
    ) -> Result<String> {
        let existing = self
            .control_plane
            .describe_environments(&[name])
            .await?
            .into_iter()
            .find(|env| env.name == name);

        if let Some(env) = existing {
            if !env.status.is_gone() {
                info!("Environment {name} already exists ({})", env.status);
                return Ok(env.id);
            }
            info!("Environment {name} is {}, creating a new one", env.status);
        }

        let created = self
            .control_plane
            .create_environment(application, name, template, version_label)
            .await?;
        info!("Creating environment {name} ({})", created.id);
        Ok(created.id)
    }

    /// Writes blue's address unless a record is already present. Returns
    /// whether a record was written.
    pub async fn ensure_cname_record(
        &self,
        bucket: &str,
        key: &str,
        blue: &Environment,
    ) -> Result<bool> {
        if self.store.object_exists(bucket, key).await? {
            info!("CNAME record {bucket}/{key} already exists");
            return Ok(false);
        }

        let record = CnameRecord {
            blue_env_url: blue.cname.clone(),
        };
        self.store
            .put_object(bucket, key, serde_json::to_vec(&record)?)
            .await?;
        info!("Created CNAME record {bucket}/{key}");
        Ok(true)
    }
}

/// `create-green` stage.
pub async fn run(ctx: &StageContext<'_>, job: &PipelineJob) -> Result<StageOutcome> {
    let params = job.parameters()?;
    let application = params.application_name(ctx.default_application)?;
    let blue_name = params.blue_env_name()?;
    let green_name = params.green_env_name()?;
    let template = params.config_template_name()?;
    let (bucket, key) = params.cname_record_location()?;

    let provisioner = GreenProvisioner::new(ctx.control_plane, ctx.store);

    let blue = provisioner.describe_blue(blue_name).await?;
    let template = provisioner
        .ensure_config_template(application, &blue, template)
        .await?;
    let green_id = provisioner
        .ensure_green(application, green_name, &template, blue.version_label.as_deref())
        .await?;
    provisioner.ensure_cname_record(bucket, key, &blue).await?;

    Ok(StageOutcome::completed(format!(
        "Green environment {green_name} created or already present"
    ))
    .with_output("GreenEnvId", green_id))
}
