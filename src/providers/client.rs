use std::time::Duration;

use log::warn;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::Token;
use crate::config::RetryConfig;
use crate::error::{BlueGreenError, Result};

const USER_AGENT: &str = concat!("bluegreen/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    /// Upper bound on a single HTTP exchange.
    pub request_timeout: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.delay(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// JSON-over-HTTP core shared by the control plane, storage and
/// orchestrator bindings.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<Token>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<Token>, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(retry.request_timeout)
            .build()
            .map_err(|e| BlueGreenError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| BlueGreenError::Config(format!("Invalid base URL: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(BlueGreenError::Config(format!(
                "Base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            token,
            retry,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BlueGreenError::Config(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Sends a request, retrying network errors, rate limits and server
    /// errors. Any other response is returned as-is, whatever its status.
    pub async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut retry_count = 0;
        loop {
            let request = self.auth_request(build(&self.client));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= self.retry.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {:?} ({}/{})...",
                        e,
                        self.retry.delay,
                        retry_count + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= self.retry.max_retries {
                    return Err(BlueGreenError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.retry.max_retries,
                    });
                }

                warn!(
                    "API error (status {status}). Waiting {:?} before retry {}/{}...",
                    self.retry.delay,
                    retry_count + 1,
                    self.retry.max_retries
                );

                tokio::time::sleep(self.retry.delay).await;
                retry_count += 1;
                continue;
            }

            return Ok(response);
        }
    }

    /// Sends a request exactly once. Used for mutations: a 5xx may arrive
    /// after the server already applied the change, so resending is unsafe.
    pub async fn execute_once<F>(&self, build: F) -> Result<Response>
    where
        F: FnOnce(&Client) -> RequestBuilder,
    {
        let response = self.auth_request(build(&self.client)).send().await?;
        error_for_status(response).await
    }

    /// Like [`ApiClient::execute`], but any non-success status is an error.
    pub async fn execute_ok<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.execute(build).await?;
        error_for_status(response).await
    }

    pub async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.execute_ok(|client| client.get(url.clone())).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute_ok(|client| client.post(url.clone()).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// POST whose response body carries nothing the caller needs.
    pub async fn post_empty<B>(&self, url: Url, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute_ok(|client| client.post(url.clone()).json(body))
            .await?;
        Ok(())
    }

    /// Non-retried POST for state-changing calls.
    pub async fn mutate_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute_once(|client| client.post(url).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn mutate_empty<B>(&self, url: Url, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute_once(|client| client.post(url).json(body))
            .await?;
        Ok(())
    }
}

pub(super) async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(BlueGreenError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
pub(crate) fn test_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    }
}
