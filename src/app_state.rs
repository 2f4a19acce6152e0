use std::sync::Arc;

use crate::config::ClientConfig;
use crate::services::{
    api::{ApiClient, ApiError},
    tracker::AssignmentTracker,
};

/// Shared client state handed to every front-end task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClientConfig>,
    pub api: Arc<ApiClient>,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(config.clone())?;
        Ok(Self::from_parts(config, api))
    }

    pub fn from_parts(config: ClientConfig, api: ApiClient) -> Self {
        Self {
            config: Arc::new(config),
            api: Arc::new(api),
        }
    }

    /// Start following an assignment. Polling stops when the tracker is dropped.
    pub fn track(&self, assignment_id: &str) -> Result<AssignmentTracker, ApiError> {
        AssignmentTracker::spawn(Arc::clone(&self.api), assignment_id)
    }
}
