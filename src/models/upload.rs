use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One item of an upload's progress sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferUpdate {
    /// Percentage of the payload handed to the network, 0..=100.
    Progress(u8),
    /// Final server response. Always the last item.
    Complete(UploadOutcome),
}

/// Response body of `POST <prefix>/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub filename: String,
    pub filesize: u64,
    pub message: Option<String>,
    pub assignment_id: Option<String>,
}

/// Capture file to submit: a name and an opaque blob of known size.
#[derive(Debug, Clone)]
pub struct Payload {
    pub filename: String,
    pub bytes: Bytes,
}

impl Payload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a capture file from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.pcap".to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
