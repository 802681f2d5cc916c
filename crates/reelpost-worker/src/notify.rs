//! Progress notification sinks.
//!
//! The orchestrator reports every phase transition as a [`ProgressEvent`].
//! Sinks are fire-and-forget: a sink that can no longer deliver (closed
//! channel, gone chat) drops the event and the publish carries on.

use std::sync::Arc;

use reelpost_models::ProgressEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Receives progress events.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, event: ProgressEvent) {
        (**self).notify(event)
    }
}

/// Forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("Progress receiver dropped; discarding event");
        }
    }
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: ProgressEvent) {
        info!(
            platform = ?event.platform,
            phase = event.phase.as_str(),
            "{}", event.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpost_models::{Platform, PublishPhase};

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.notify(ProgressEvent::shared(PublishPhase::Staging, "one"));
        sink.notify(ProgressEvent::for_platform(Platform::Instagram, PublishPhase::Done, "two"));

        assert_eq!(rx.recv().await.unwrap().message, "one");
        assert_eq!(rx.recv().await.unwrap().message, "two");
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        // Must not panic
        sink.notify(ProgressEvent::shared(PublishPhase::Staging, "nobody listening"));
    }
}
