use async_trait::async_trait;
use indexmap::IndexMap;
use log::info;
use serde::Serialize;

use crate::auth::Token;
use crate::error::Result;
use crate::job::FailureType;

use super::client::{ApiClient, RetryPolicy};
use super::JobReporter;

/// HTTP binding of the pipeline orchestrator's job result API.
pub struct PipelineClient {
    api: ApiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessRequest<'a> {
    output_variables: &'a IndexMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureRequest<'a> {
    failure_details: FailureDetails<'a>,
}

#[derive(Serialize)]
struct FailureDetails<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    failure_type: &'static str,
}

impl PipelineClient {
    pub fn new(base_url: &str, token: Option<Token>, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url, token, retry)?,
        })
    }
}

#[async_trait]
impl JobReporter for PipelineClient {
    async fn put_job_success(
        &self,
        job_id: &str,
        output_variables: &IndexMap<String, String>,
    ) -> Result<()> {
        info!("Putting job success for {job_id}");
        let url = self.api.url(&["jobs", job_id, "success"])?;
        self.api
            .post_empty(url, &SuccessRequest { output_variables })
            .await
    }

    async fn put_job_failure(
        &self,
        job_id: &str,
        message: &str,
        failure_type: FailureType,
    ) -> Result<()> {
        info!("Putting job failure for {job_id}: {message}");
        let url = self.api.url(&["jobs", job_id, "failure"])?;
        let request = FailureRequest {
            failure_details: FailureDetails {
                message,
                failure_type: failure_type.as_str(),
            },
        };
        self.api.post_empty(url, &request).await
    }
}
