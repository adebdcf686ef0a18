use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::auth::Token;
use crate::environment::Environment;
use crate::error::Result;

use super::client::{ApiClient, RetryPolicy};
use super::ControlPlane;

/// HTTP binding of the application-hosting control plane.
pub struct HostingClient {
    api: ApiClient,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvironmentsResponse {
    environments: Vec<Environment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemplatesResponse {
    configuration_templates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateResponse {
    template_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRequest<'a> {
    environment_names: &'a [&'a str],
    include_deleted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SwapRequest<'a> {
    source_environment_name: &'a str,
    destination_environment_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateTemplateRequest<'a> {
    template_name: &'a str,
    environment_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEnvironmentRequest<'a> {
    environment_name: &'a str,
    template_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_label: Option<&'a str>,
}

impl HostingClient {
    pub fn new(base_url: &str, token: Option<Token>, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url, token, retry)?,
        })
    }
}

#[async_trait]
impl ControlPlane for HostingClient {
    async fn list_environments(&self, application: &str) -> Result<Vec<Environment>> {
        let mut url = self.api.url(&["applications", application, "environments"])?;
        url.query_pairs_mut().append_pair("includeDeleted", "false");

        let response: EnvironmentsResponse = self.api.get_json(url).await?;
        debug!(
            "Listed {} environments for {application}",
            response.environments.len()
        );
        Ok(response.environments)
    }

    async fn describe_environments(&self, names: &[&str]) -> Result<Vec<Environment>> {
        let url = self.api.url(&["environments", "describe"])?;
        let request = DescribeRequest {
            environment_names: names,
            include_deleted: false,
        };

        let response: EnvironmentsResponse = self.api.post_json(url, &request).await?;
        Ok(response.environments)
    }

    async fn swap_environment_cnames(&self, source: &str, destination: &str) -> Result<()> {
        let url = self.api.url(&["environments", "swap-cnames"])?;
        let request = SwapRequest {
            source_environment_name: source,
            destination_environment_name: destination,
        };

        self.api.mutate_empty(url, &request).await
    }

    async fn terminate_environment(&self, name: &str) -> Result<()> {
        let url = self.api.url(&["environments", name, "terminate"])?;
        self.api.mutate_empty(url, &serde_json::json!({})).await
    }

    async fn list_configuration_templates(&self, application: &str) -> Result<Vec<String>> {
        let url = self
            .api
            .url(&["applications", application, "configuration-templates"])?;

        let response: TemplatesResponse = self.api.get_json(url).await?;
        Ok(response.configuration_templates)
    }

    async fn create_configuration_template(
        &self,
        application: &str,
        environment_id: &str,
        name: &str,
    ) -> Result<String> {
        let url = self
            .api
            .url(&["applications", application, "configuration-templates"])?;
        let request = CreateTemplateRequest {
            template_name: name,
            environment_id,
        };

        let response: TemplateResponse = self.api.mutate_json(url, &request).await?;
        Ok(response.template_name)
    }

    async fn delete_configuration_template(&self, application: &str, name: &str) -> Result<()> {
        let url = self
            .api
            .url(&["applications", application, "configuration-templates", name])?;

        self.api.execute_once(|client| client.delete(url)).await?;
        Ok(())
    }

    async fn create_environment(
        &self,
        application: &str,
        name: &str,
        template: &str,
        version_label: Option<&str>,
    ) -> Result<Environment> {
        let url = self.api.url(&["applications", application, "environments"])?;
        let request = CreateEnvironmentRequest {
            environment_name: name,
            template_name: template,
            version_label,
        };

        self.api.mutate_json(url, &request).await
    }
}
