use async_trait::async_trait;
use bytes::Bytes;

use super::ByteSource;
use crate::IngestError;

/// Source streaming an HTTP response body
pub struct HttpSource {
    url: String,
    response: reqwest::Response,
}

impl HttpSource {
    /// Issue a GET and fail fast on a non-success status
    pub async fn open(client: &reqwest::Client, url: impl Into<String>) -> Result<Self, IngestError> {
        let url = url.into();
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Transport {
                resource: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("GET {} returned {}", url, status);
            return Err(IngestError::Load {
                resource: url,
                status: status.as_u16(),
            });
        }

        Ok(Self { url, response })
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        self.response
            .chunk()
            .await
            .map_err(|e| IngestError::Transport {
                resource: self.url.clone(),
                message: e.to_string(),
            })
    }

    fn resource(&self) -> &str {
        &self.url
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }
}
