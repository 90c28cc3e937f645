//! Transport to the analysis service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use scene_graph_core::{AnalysisResponse, AnalysisResult, SelectedImage};

use crate::config::Config;
use crate::error::{AnalysisCallResult, AnalysisError};

/// Name of the multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// Something that turns an image into an analysis.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &SelectedImage) -> AnalysisCallResult<AnalysisResult>;
}

#[async_trait]
impl<A: Analyzer + ?Sized> Analyzer for std::sync::Arc<A> {
    async fn analyze(&self, image: &SelectedImage) -> AnalysisCallResult<AnalysisResult> {
        (**self).analyze(image).await
    }
}

/// HTTP client posting images to the analysis endpoint.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AnalysisCallResult<Self> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::network(endpoint.clone(), e))?;
        Ok(Self { http, endpoint })
    }

    pub fn from_config(config: &Config) -> AnalysisCallResult<Self> {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post the image and return the payload as sent by the service.
    pub async fn fetch_response(
        &self,
        image: &SelectedImage,
    ) -> AnalysisCallResult<AnalysisResponse> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.media_type())
            .map_err(|_| AnalysisError::MediaType {
                media_type: image.media_type().to_string(),
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(
            endpoint = %self.endpoint,
            name = image.name(),
            bytes = image.len(),
            "Posting image"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalysisError::network(self.endpoint.clone(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::network(self.endpoint.clone(), e))?;

        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    async fn analyze(&self, image: &SelectedImage) -> AnalysisCallResult<AnalysisResult> {
        let response = self.fetch_response(image).await?;
        let result = AnalysisResult::try_from(response)?;
        info!(
            endpoint = %self.endpoint,
            objects = result.scene_graph().object_count(),
            relationships = result.scene_graph().relationship_count(),
            "Received analysis"
        );
        Ok(result)
    }
}
