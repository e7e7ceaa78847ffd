use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::capability::{redact, CapabilityRoot};
use crate::error::{BlobError, BlobResult};
use crate::listing::parse_blob_names;
use crate::traits::BlobTransport;

/// Header that makes a PUT replace the whole object.
pub const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
pub const BLOB_TYPE_BLOCK: &str = "BlockBlob";

/// [`BlobTransport`] over HTTP(S) using `reqwest`.
///
/// Authorization is entirely in the URL, so requests carry no auth header.
#[derive(Clone, Debug)]
pub struct HttpBlobTransport {
    client: Client,
}

impl HttpBlobTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> BlobResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobError::Request(e.without_url().to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> BlobResult<Response> {
        request
            .send()
            .await
            .map_err(|e| BlobError::Request(e.without_url().to_string()))
    }
}

/// Turn a non-2xx response into a typed error, consuming the body.
async fn error_for(response: Response, url: &str) -> BlobError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return BlobError::NotFound {
            url: redact(url).to_string(),
        };
    }
    let body = response.text().await.unwrap_or_default();
    BlobError::status(status.as_u16(), &body)
}

#[async_trait]
impl BlobTransport for HttpBlobTransport {
    async fn put(&self, url: &str, data: Bytes, media_type: &str) -> BlobResult<()> {
        let size = data.len();
        let request = self
            .client
            .put(url)
            .header(BLOB_TYPE_HEADER, BLOB_TYPE_BLOCK)
            .header(reqwest::header::CONTENT_TYPE, media_type)
            .body(data);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(error_for(response, url).await);
        }
        debug!(blob = redact(url), size, media_type, "put blob");
        Ok(())
    }

    async fn get(&self, url: &str) -> BlobResult<Bytes> {
        let response = self.send(self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(error_for(response, url).await);
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| BlobError::Request(e.without_url().to_string()))?;
        debug!(blob = redact(url), size = body.len(), "got blob");
        Ok(body)
    }

    async fn delete(&self, url: &str) -> BlobResult<()> {
        let response = self.send(self.client.delete(url)).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(blob = redact(url), status = status.as_u16(), "deleted blob");
            return Ok(());
        }
        Err(error_for(response, url).await)
    }

    async fn list(&self, root: &CapabilityRoot) -> BlobResult<Vec<String>> {
        let url = root.list_url();
        let response = self.send(self.client.get(&url)).await?;
        if !response.status().is_success() {
            return Err(error_for(response, &url).await);
        }
        let body = response
            .text()
            .await
            .map_err(|e| BlobError::Request(e.without_url().to_string()))?;
        Ok(parse_blob_names(&body))
    }
}
