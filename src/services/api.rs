use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::models::assignment::Assignment;
use crate::models::health::Health;
use crate::models::job::JobResponse;
use crate::models::upload::{Payload, TransferUpdate, UploadOutcome};
use crate::services::transfer::{ReqwestTransport, TransferError, TransferStream, Transport};
use crate::services::validation::{self, ValidationError};

/// Client for the pipeline's JSON API.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // Uploads get their own client: no timeout may cut a slow transfer short.
        let transport = ReqwestTransport::new(
            Client::new(),
            config.upload_field.clone(),
            config.upload_chunk_size,
        );
        Self::with_transport(config, Arc::new(transport))
    }

    /// Client whose uploads go through a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            http,
            config,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET <prefix>: status of every backend service.
    pub async fn health(&self) -> Result<Health, ApiError> {
        self.get_json("").await
    }

    /// GET <prefix>/assignment/{id}
    pub async fn assignment(&self, id: &str) -> Result<Assignment, ApiError> {
        let id = validation::parse_id(id)?;
        self.get_json(&format!("assignment/{}", id)).await
    }

    /// GET <prefix>/job/{id}
    pub async fn job(&self, id: &str) -> Result<JobResponse, ApiError> {
        let id = validation::parse_id(id)?;
        self.get_json(&format!("job/{}", id)).await
    }

    /// POST <prefix>/upload, reporting progress as the returned stream is pulled.
    pub fn upload(&self, payload: Payload) -> TransferStream {
        metrics::counter!("uploads_total").increment(1);
        tracing::info!(
            filename = %payload.filename,
            bytes = payload.len(),
            "Uploading capture"
        );
        TransferStream::start(
            self.transport.as_ref(),
            self.config.endpoint_url("upload"),
            payload,
        )
    }

    /// Upload and drain the progress stream, returning the server's outcome.
    pub async fn upload_and_wait(&self, payload: Payload) -> Result<UploadOutcome, TransferError> {
        let filename = payload.filename.clone();
        let mut updates = self.upload(payload);

        while let Some(update) = updates.next().await {
            match update {
                Ok(TransferUpdate::Progress(pct)) => {
                    tracing::debug!(filename = %filename, progress = pct, "Upload progress");
                }
                Ok(TransferUpdate::Complete(outcome)) => {
                    tracing::info!(
                        filename = %outcome.filename,
                        success = outcome.success,
                        assignment_id = ?outcome.assignment_id,
                        "Upload complete"
                    );
                    return Ok(outcome);
                }
                Err(e) => {
                    metrics::counter!("uploads_failed").increment(1);
                    tracing::error!(filename = %filename, error = %e, "Upload failed");
                    return Err(e);
                }
            }
        }

        Err(TransferError::Interrupted)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let url = self.config.endpoint_url(endpoint);
        let response = self.http.get(&url).send().await.map_err(ApiError::Http)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "API request failed");
            return Err(ApiError::Request {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.bytes().await.map_err(ApiError::Http)?;
        serde_json::from_slice(&body).map_err(ApiError::InvalidResponse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] ValidationError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed: {status} {status_text}")]
    Request { status: u16, status_text: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ApiError {
    /// Failures that mean the requested resource does not exist for the UI.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidId(_) | ApiError::Request { status: 404, .. }
        )
    }
}
