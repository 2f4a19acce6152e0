//! Callback-to-stream bridge.
//!
//! Producers that are driven by callbacks (HTTP body polling, timers,
//! transport hooks) push into an [`EventPusher`]; a single consumer pulls
//! the same events, in push order, from the paired [`EventStream`].
//! The queue is unbounded so a slow consumer never stalls the producer.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Create a connected pusher/stream pair.
pub fn bridge<T>() -> (EventPusher<T>, EventStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventPusher { tx }, EventStream { rx })
}

/// Producer half. Cheap to clone, usable from any task or thread.
#[derive(Debug)]
pub struct EventPusher<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for EventPusher<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventPusher<T> {
    /// Queue an event. Returns `false` once the consumer is gone, in which
    /// case the event is dropped.
    pub fn push(&self, event: T) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. Yields every pushed event exactly once and ends after the
/// last pusher is dropped and the queue is drained.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// Stop accepting events; already queued ones can still be pulled.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
