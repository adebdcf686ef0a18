use std::time::Duration;

use log::{debug, info};

use crate::config::PollingConfig;
use crate::deadline::Deadline;
use crate::environment::Environment;
use crate::error::{BlueGreenError, Result};
use crate::providers::ControlPlane;

/// Polls an environment until it reports `Ready`.
///
/// The wait is bounded by the job deadline, optionally tightened by a
/// configured maximum. A poll is never started when the next interval would
/// run past that bound; the waiter gives up with `Timeout` instead.
pub struct ReadinessWaiter<'a> {
    control_plane: &'a dyn ControlPlane,
    interval: Duration,
    max_wait: Option<Duration>,
}

impl<'a> ReadinessWaiter<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane, polling: &PollingConfig) -> Self {
        Self {
            control_plane,
            interval: polling.interval(),
            max_wait: polling.max_wait(),
        }
    }

    pub async fn wait_until_ready(&self, name: &str, deadline: &Deadline) -> Result<Environment> {
        let budget = deadline.capped(self.max_wait);
        let stage = format!("waiting for {name} to become Ready");
        let mut attempts = 0u32;

        loop {
            budget.check(&stage)?;
            attempts += 1;

            let environment = self
                .control_plane
                .describe_environments(&[name])
                .await?
                .into_iter()
                .find(|env| env.name == name)
                .ok_or_else(|| BlueGreenError::EnvironmentNotFound(name.to_string()))?;

            info!("{name} status: {} (poll {attempts})", environment.status);

            if environment.status.is_ready() {
                return Ok(environment);
            }
            if environment.status.is_gone() {
                return Err(BlueGreenError::EnvironmentUnavailable {
                    name: name.to_string(),
                    status: environment.status.to_string(),
                });
            }

            if budget.remaining() < self.interval {
                debug!(
                    "{:?} left, not enough for another {:?} interval",
                    budget.remaining(),
                    self.interval
                );
                return Err(BlueGreenError::timeout(stage));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
