use log::{info, warn};

use crate::error::Result;
use crate::job::PipelineJob;

use super::decommission::{Cleanup, Decommissioner};
use super::swap::{SwapCoordinator, SwapDirection};
use super::{StageContext, StageOutcome};

/// `rollback` stage: hands live traffic back to blue, then tears green down
/// together with its configuration template and the CNAME record.
pub async fn run(ctx: &StageContext<'_>, job: &PipelineJob) -> Result<StageOutcome> {
    let params = job.parameters()?;
    let application = params.application_name(ctx.default_application)?;
    let blue = params.blue_env_name()?;
    let green = params.green_env_name()?;
    let cleanup = Cleanup::from_params(&params, Some(application))?;
    let decommissioner = Decommissioner::new(ctx);

    // Read before the teardown deletes it.
    let blue_url = match cleanup.record {
        Some((bucket, key)) => decommissioner
            .read_cname_record(bucket, key)
            .await?
            .and_then(|record| record.blue_env_url),
        None => None,
    };
    match &blue_url {
        Some(url) => info!("Restoring live traffic to {blue} at {url}"),
        None => info!("No recorded address for {blue}"),
    }

    let pair = SwapDirection::Revert.pair(blue, green);
    let reswap = SwapCoordinator::new(ctx.control_plane).swap(&pair).await?;
    if let StageOutcome::Failed { reason } = reswap {
        warn!("Re-swap did not happen: {reason}");
        return Ok(StageOutcome::failed(format!(
            "Re-swap did not happen: {reason}"
        )));
    }

    info!("Deleting the green environment {green}");
    let teardown = decommissioner
        .decommission_with_cleanup(green, &cleanup, &job.deadline)
        .await?;
    if teardown.is_failed() {
        return Ok(teardown);
    }

    let mut outcome = StageOutcome::completed(format!(
        "Successfully reswapped {blue} and terminated the green environment {green}"
    ))
    .with_output("BlueEnvName", blue)
    .with_output("GreenEnvName", green);
    if let Some(url) = blue_url {
        outcome = outcome.with_output("BlueEnvUrl", url);
    }
    Ok(outcome)
}
