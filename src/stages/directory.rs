use log::{debug, info};

use crate::environment::Environment;
use crate::error::{BlueGreenError, Result};
use crate::job::PipelineJob;
use crate::providers::ControlPlane;

use super::{StageContext, StageOutcome};

/// The live (oldest) and staging (newest) environments of an application.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub blue: Environment,
    pub green: Environment,
}

pub struct EnvironmentDirectory<'a> {
    control_plane: &'a dyn ControlPlane,
}

impl<'a> EnvironmentDirectory<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane) -> Self {
        Self { control_plane }
    }

    /// Current environments of `application`, oldest first. Environments
    /// already terminating or terminated are left out.
    pub async fn list_ordered(&self, application: &str) -> Result<Vec<Environment>> {
        let mut environments: Vec<Environment> = self
            .control_plane
            .list_environments(application)
            .await?
            .into_iter()
            .filter(|env| !env.status.is_gone())
            .collect();

        environments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        debug!(
            "Environments of {application} by creation time: {:?}",
            environments.iter().map(|env| &env.name).collect::<Vec<_>>()
        );
        Ok(environments)
    }

    pub async fn discover(&self, application: &str) -> Result<Deployment> {
        let environments = self.list_ordered(application).await?;
        if environments.len() < 2 {
            return Err(BlueGreenError::InsufficientEnvironments {
                application: application.to_string(),
                found: environments.len(),
            });
        }

        let blue = environments[0].clone();
        let green = environments[environments.len() - 1].clone();
        Ok(Deployment { blue, green })
    }
}

/// `discover` stage: publishes the current blue/green names as output
/// variables for later pipeline actions.
pub async fn run(ctx: &StageContext<'_>, job: &PipelineJob) -> Result<StageOutcome> {
    let params = job.parameters()?;
    let application = params.application_name(ctx.default_application)?;

    let deployment = EnvironmentDirectory::new(ctx.control_plane)
        .discover(application)
        .await?;
    info!(
        "blue: [{}], green: [{}]",
        deployment.blue.name, deployment.green.name
    );

    let mut outcome = StageOutcome::completed(format!(
        "Discovered blue {} and green {}",
        deployment.blue.name, deployment.green.name
    ))
    .with_output("BlueEnvName", deployment.blue.name)
    .with_output("GreenEnvName", deployment.green.name);
    if let Some(cname) = deployment.blue.cname {
        outcome = outcome.with_output("BlueEnvCname", cname);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentStatus::{Launching, Ready, Terminated};
    use crate::testing::{environment, Call, FakeControlPlane};

    #[tokio::test]
    async fn test_orders_by_creation_time_not_input_order() {
        let fake = FakeControlPlane::with_environments(vec![
            environment("newest", 20, Launching),
            environment("oldest", 1, Ready),
            environment("middle", 10, Ready),
        ]);

        let ordered = EnvironmentDirectory::new(&fake)
            .list_ordered("demo-app")
            .await
            .unwrap();
        let names: Vec<_> = ordered.iter().map(|env| env.name.as_str()).collect();
        assert_eq!(names, ["oldest", "middle", "newest"]);

        let deployment = EnvironmentDirectory::new(&fake)
            .discover("demo-app")
            .await
            .unwrap();
        assert_eq!(deployment.blue.name, "oldest");
        assert_eq!(deployment.green.name, "newest");
    }

    #[tokio::test]
    async fn test_fewer_than_two_environments_is_insufficient() {
        for environments in [vec![], vec![environment("only", 1, Ready)]] {
            let expected = environments.len();
            let fake = FakeControlPlane::with_environments(environments);

            let err = EnvironmentDirectory::new(&fake)
                .discover("demo-app")
                .await
                .unwrap_err();
            match err {
                BlueGreenError::InsufficientEnvironments { application, found } => {
                    assert_eq!(application, "demo-app");
                    assert_eq!(found, expected);
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(fake.mutations().is_empty());
        }
    }

    #[tokio::test]
    async fn test_terminated_environments_do_not_count() {
        let fake = FakeControlPlane::with_environments(vec![
            environment("old", 1, Terminated),
            environment("current", 2, Ready),
        ]);

        let err = EnvironmentDirectory::new(&fake)
            .discover("demo-app")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlueGreenError::InsufficientEnvironments { found: 1, .. }
        ));
        assert_eq!(fake.calls(), vec![Call::ListEnvironments("demo-app".into())]);
    }
}
