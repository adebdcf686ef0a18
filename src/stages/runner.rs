use std::future::Future;

use log::{error, info};

use crate::error::{BlueGreenError, Result};
use crate::job::{JobReport, PipelineJob};
use crate::providers::JobReporter;

use super::StageOutcome;

/// Runs one stage and sends exactly one terminal report for `job`.
///
/// The stage races the job deadline; if the deadline wins, the stage future
/// is dropped and a timeout failure is reported instead. Errors returned by
/// the stage become failure reports. Delivery of the report is itself bounded
/// by the platform's hard limit. The only error this function returns is a
/// failure to deliver the report.
pub async fn run_stage<F>(
    reporter: &dyn JobReporter,
    job: &PipelineJob,
    stage: &str,
    work: F,
) -> Result<JobReport>
where
    F: Future<Output = Result<StageOutcome>>,
{
    info!("Running stage {stage} for job {}", job.id);

    let outcome = match tokio::time::timeout_at(job.deadline.expires_at(), work).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!("Stage {stage} failed: {e}");
            StageOutcome::failed(format!("Error occurred while executing {stage}: {e}"))
        }
        Err(_) => {
            error!("Execution is about to time out, sending failure response");
            StageOutcome::failed(BlueGreenError::timeout(stage).to_string())
        }
    };

    match &outcome {
        StageOutcome::Completed { message, .. } => info!("{message}"),
        StageOutcome::Skipped { reason } => info!("Nothing to do: {reason}"),
        StageOutcome::Failed { reason } => error!("{reason}"),
    }

    let report = outcome.into_report();
    let delivery = deliver(reporter, &job.id, &report);
    match tokio::time::timeout_at(job.deadline.hard_limit(), delivery).await {
        Ok(result) => result?,
        Err(_) => {
            error!("Could not report job {} before the invocation limit", job.id);
            return Err(BlueGreenError::timeout(format!("reporting job {}", job.id)));
        }
    }

    Ok(report)
}

async fn deliver(reporter: &dyn JobReporter, job_id: &str, report: &JobReport) -> Result<()> {
    match report {
        JobReport::Success { output_variables } => {
            reporter.put_job_success(job_id, output_variables).await
        }
        JobReport::Failure {
            message,
            failure_type,
        } => {
            reporter
                .put_job_failure(job_id, message, *failure_type)
                .await
        }
    }
}
