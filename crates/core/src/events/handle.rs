use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::BatchEvent;

/// Envelope wrapping a batch event with metadata
#[derive(Debug, Clone)]
pub struct BatchEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: BatchEvent,
}

/// Handle for emitting batch events
///
/// Cheaply cloneable, shared by every job of one batch. A closed or full
/// channel is logged and otherwise ignored.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<BatchEventEnvelope>,
}

impl EventHandle {
    /// Create a new event handle from a channel sender
    pub fn new(tx: mpsc::Sender<BatchEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Create a handle together with its receiving end
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<BatchEventEnvelope>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    /// Emit an event, waiting for channel capacity
    pub async fn emit(&self, event: BatchEvent) {
        let envelope = BatchEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::debug!("Batch event dropped, receiver gone: {}", e);
        }
    }

    /// Try to emit an event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: BatchEvent) -> bool {
        let envelope = BatchEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to emit batch event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::media::MediaCategory;

    fn skipped() -> BatchEvent {
        BatchEvent::FileSkipped {
            path: PathBuf::from("/in/notes.txt"),
            category: MediaCategory::Unknown,
            reason: "unrecognised content".to_string(),
        }
    }

    #[tokio::test]
    async fn test_emit_event() {
        let (handle, mut rx) = EventHandle::channel(10);

        handle.emit(skipped()).await;

        let envelope = rx.recv().await.expect("Should receive event");
        assert!(matches!(envelope.event, BatchEvent::FileSkipped { .. }));
    }

    #[tokio::test]
    async fn test_emit_closed_channel() {
        let (handle, rx) = EventHandle::channel(10);

        // Drop the receiver to close the channel
        drop(rx);

        // This should not panic
        handle.emit(skipped()).await;
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (handle, _rx) = EventHandle::channel(1);

        assert!(handle.try_emit(skipped()));
        assert!(!handle.try_emit(skipped()));
    }

    #[test]
    fn test_envelope_has_timestamp() {
        let (handle, mut rx) = EventHandle::channel(10);

        let before = Utc::now();
        handle.try_emit(skipped());
        let after = Utc::now();

        let envelope = rx.try_recv().expect("Should receive event");
        assert!(envelope.timestamp >= before);
        assert!(envelope.timestamp <= after);
    }
}
