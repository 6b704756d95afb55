//! Image fetching seam for the image round trip.

use async_trait::async_trait;
use base64::Engine as _;
use tokio_util::sync::CancellationToken;

use crate::error::{PrecisError, PrecisResult};
use crate::types::ImageData;

/// Fetches an image URL into base64 form for attachment.
///
/// The round-trip negotiator goes through this seam so hosts (and tests)
/// can substitute their own fetch path.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> PrecisResult<ImageData>;
}

/// Default fetcher backed by reqwest.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> PrecisResult<ImageData> {
        let request = self.client.get(url).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PrecisError::Cancelled),
            resp = request => resp?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrecisError::provider(status.as_u16(), body));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());

        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(PrecisError::Cancelled),
            bytes = response.bytes() => bytes?,
        };

        Ok(ImageData {
            base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime_type,
        })
    }
}
