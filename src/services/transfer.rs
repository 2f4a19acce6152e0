//! Upload with progress, exposed as a pull-based stream.
//!
//! A [`Transport`] performs the actual transfer and reports what happens
//! through callbacks. Those events are queued on a [`bridge`] and turned into
//! [`TransferUpdate`]s only when the consumer pulls the [`TransferStream`],
//! so consumer-visible state never changes behind its back.

use bytes::Bytes;
use futures::stream::{FusedStream, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::models::upload::{Payload, TransferUpdate, UploadOutcome};
use crate::services::bridge::{bridge, EventPusher, EventStream};

/// What a transport reports while moving a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// `loaded` of `total` bytes have been handed to the network.
    Progress { loaded: u64, total: u64 },
    /// The server answered. Terminal.
    Load {
        status: u16,
        status_text: String,
        body: Bytes,
    },
    /// The transfer broke down before a response arrived. Terminal.
    Failed(String),
}

/// Callback-driven upload mechanism.
///
/// `start` must initiate exactly one transfer and report through `events`
/// until it pushes a terminal event (`Load` or `Failed`).
pub trait Transport: Send + Sync {
    fn start(&self, url: String, payload: Payload, events: EventPusher<TransportEvent>);
}

/// Multipart upload over reqwest. The file part is streamed in chunks and
/// every chunk taken by the HTTP stack raises a progress event.
pub struct ReqwestTransport {
    http: Client,
    field_name: String,
    chunk_size: usize,
}

impl ReqwestTransport {
    pub fn new(http: Client, field_name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            http,
            field_name: field_name.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Transport for ReqwestTransport {
    fn start(&self, url: String, payload: Payload, events: EventPusher<TransportEvent>) {
        let http = self.http.clone();
        let field_name = self.field_name.clone();
        let chunk_size = self.chunk_size;

        tokio::spawn(async move {
            let total = payload.len();
            events.push(TransportEvent::Progress { loaded: 0, total });

            let chunks: Vec<Bytes> = (0..payload.bytes.len())
                .step_by(chunk_size)
                .map(|start| {
                    let end = (start + chunk_size).min(payload.bytes.len());
                    payload.bytes.slice(start..end)
                })
                .collect();

            let progress = events.clone();
            let mut loaded = 0u64;
            let body = futures::stream::iter(chunks).map(move |chunk| {
                loaded += chunk.len() as u64;
                progress.push(TransportEvent::Progress { loaded, total });
                Ok::<_, std::io::Error>(chunk)
            });

            let part = Part::stream_with_length(Body::wrap_stream(body), total)
                .file_name(payload.filename.clone());
            let form = Form::new().part(field_name, part);

            tracing::debug!(url = %url, filename = %payload.filename, total, "Starting upload");

            let event = match http.post(&url).multipart(form).send().await {
                Ok(response) => {
                    let status = response.status();
                    match response.bytes().await {
                        Ok(body) => TransportEvent::Load {
                            status: status.as_u16(),
                            status_text: status.canonical_reason().unwrap_or_default().to_string(),
                            body,
                        },
                        Err(e) => TransportEvent::Failed(e.to_string()),
                    }
                }
                Err(e) => TransportEvent::Failed(e.to_string()),
            };

            if !events.push(event) {
                tracing::debug!(url = %url, "Upload finished after its consumer went away");
            }
        });
    }
}

/// Pull side of an upload.
///
/// Yields zero or more `Progress` values in the order the transport raised
/// them, then `Progress(100)` and `Complete` on success, or a single error.
/// Nothing is yielded after either. Not restartable: retry by starting a new
/// upload. Dropping the stream mid-transfer releases the event queue; the
/// transport's remaining events are discarded.
pub struct TransferStream {
    events: EventStream<TransportEvent>,
    pending: Option<UploadOutcome>,
    last_percent: Option<u8>,
    done: bool,
}

impl TransferStream {
    /// Kick off one transfer through `transport` and return its update stream.
    pub fn start(transport: &dyn Transport, url: String, payload: Payload) -> Self {
        let (pusher, events) = bridge();
        transport.start(url, payload, pusher);
        Self::from_events(events)
    }

    /// Wrap an event queue that some transport is already feeding.
    pub fn from_events(events: EventStream<TransportEvent>) -> Self {
        Self {
            events,
            pending: None,
            last_percent: None,
            done: false,
        }
    }

    fn finish<T>(&mut self, item: T) -> Poll<Option<T>> {
        self.done = true;
        self.events.close();
        Poll::Ready(Some(item))
    }
}

/// Whole percent of `loaded` over `total`, clamped to 100.
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded as u128 * 100) / total as u128;
    pct.min(100) as u8
}

impl Stream for TransferStream {
    type Item = Result<TransferUpdate, TransferError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        if let Some(outcome) = this.pending.take() {
            return this.finish(Ok(TransferUpdate::Complete(outcome)));
        }

        match ready!(this.events.poll_next_unpin(cx)) {
            Some(TransportEvent::Progress { loaded, total }) => {
                let pct = percent(loaded, total);
                this.last_percent = Some(pct);
                Poll::Ready(Some(Ok(TransferUpdate::Progress(pct))))
            }
            Some(TransportEvent::Load {
                status,
                status_text,
                body,
            }) => {
                if !(200..300).contains(&status) {
                    return this.finish(Err(TransferError::Request {
                        status,
                        status_text,
                    }));
                }
                match serde_json::from_slice::<UploadOutcome>(&body) {
                    Ok(outcome) if this.last_percent == Some(100) => {
                        this.finish(Ok(TransferUpdate::Complete(outcome)))
                    }
                    Ok(outcome) => {
                        this.pending = Some(outcome);
                        this.last_percent = Some(100);
                        Poll::Ready(Some(Ok(TransferUpdate::Progress(100))))
                    }
                    Err(e) => this.finish(Err(TransferError::InvalidResponse(e))),
                }
            }
            Some(TransportEvent::Failed(message)) => {
                this.finish(Err(TransferError::Transport(message)))
            }
            None => this.finish(Err(TransferError::Interrupted)),
        }
    }
}

impl FusedStream for TransferStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Upload transport failed: {0}")]
    Transport(String),

    #[error("Upload request failed: {status} {status_text}")]
    Request { status: u16, status_text: String },

    #[error("Upload response was not a valid outcome: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Upload transport stopped without a response")]
    Interrupted,
}
