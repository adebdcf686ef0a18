use async_trait::async_trait;
use reqwest::StatusCode;

use crate::auth::Token;
use crate::error::{BlueGreenError, Result};

use super::client::{error_for_status, ApiClient, RetryPolicy};
use super::ObjectStore;

/// Path-style HTTP binding of the object storage: `{base}/{bucket}/{key}`.
pub struct ObjectStorageClient {
    api: ApiClient,
}

impl ObjectStorageClient {
    pub fn new(base_url: &str, token: Option<Token>, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url, token, retry)?,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<url::Url> {
        if bucket.is_empty() || key.is_empty() {
            return Err(BlueGreenError::InvalidParameters(
                "bucket and key must not be empty".to_string(),
            ));
        }

        // Keys keep their '/' hierarchy; each part is encoded on its own.
        let segments: Vec<&str> = std::iter::once(bucket).chain(key.split('/')).collect();
        self.api.url(&segments)
    }
}

#[async_trait]
impl ObjectStore for ObjectStorageClient {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let url = self.object_url(bucket, key)?;
        let response = self.api.execute(|client| client.head(url.clone())).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        error_for_status(response).await?;
        Ok(true)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let url = self.object_url(bucket, key)?;
        self.api
            .execute_ok(|client| client.put(url.clone()).body(body.clone()))
            .await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key)?;
        let response = self.api.execute(|client| client.get(url.clone())).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlueGreenError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        let response = error_for_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let url = self.object_url(bucket, key)?;
        let response = self.api.execute(|client| client.delete(url.clone())).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        error_for_status(response).await?;
        Ok(())
    }
}
