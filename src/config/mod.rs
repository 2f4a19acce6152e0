use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API prefix every endpoint hangs off (e.g., "http://localhost:3000/api")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Multipart field that carries the capture file
    #[serde(default = "default_upload_field")]
    pub upload_field: String,

    /// Bytes handed to the HTTP stack per upload progress event
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,

    /// Timeout for JSON lookups. Uploads are never timed out.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_upload_field() -> String {
    "file".to_string()
}

fn default_upload_chunk_size() -> usize {
    64 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            upload_field: default_upload_field(),
            upload_chunk_size: default_upload_chunk_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Config pointing at an explicit API prefix, everything else defaulted.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an endpoint below the API prefix. An empty endpoint
    /// addresses the prefix itself (the health route).
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, endpoint)
        }
    }
}
