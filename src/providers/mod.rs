mod client;
mod hosting;
mod pipeline;
mod storage;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::environment::Environment;
use crate::error::Result;
use crate::job::FailureType;

pub use client::RetryPolicy;
pub use hosting::HostingClient;
pub use pipeline::PipelineClient;
pub use storage::ObjectStorageClient;

/// Operations the stages need from the application-hosting control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_environments(&self, application: &str) -> Result<Vec<Environment>>;

    /// Batched status query. Names the control plane does not know are
    /// simply absent from the result.
    async fn describe_environments(&self, names: &[&str]) -> Result<Vec<Environment>>;

    async fn swap_environment_cnames(&self, source: &str, destination: &str) -> Result<()>;

    async fn terminate_environment(&self, name: &str) -> Result<()>;

    async fn list_configuration_templates(&self, application: &str) -> Result<Vec<String>>;

    async fn create_configuration_template(
        &self,
        application: &str,
        environment_id: &str,
        name: &str,
    ) -> Result<String>;

    async fn delete_configuration_template(&self, application: &str, name: &str) -> Result<()>;

    async fn create_environment(
        &self,
        application: &str,
        name: &str,
        template: &str,
        version_label: Option<&str>,
    ) -> Result<Environment>;
}

/// Durable object storage used for the CNAME record.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Deleting an absent object is not an error.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Terminal job results sent back to the pipeline orchestrator.
#[async_trait]
pub trait JobReporter: Send + Sync {
    async fn put_job_success(
        &self,
        job_id: &str,
        output_variables: &IndexMap<String, String>,
    ) -> Result<()>;

    async fn put_job_failure(
        &self,
        job_id: &str,
        message: &str,
        failure_type: FailureType,
    ) -> Result<()>;
}
