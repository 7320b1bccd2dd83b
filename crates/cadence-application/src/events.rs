// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex};

use cadence_domain::{Album, Artist, QueryId, TrackResult};
use tokio::sync::mpsc;
use tracing::debug;

/// Completion messages produced by a resolve command, tagged with the query
/// they answer.
#[derive(Debug, Clone)]
pub enum ResolveEvent {
    Results {
        query_id: QueryId,
        results: Vec<TrackResult>,
    },
    Artists {
        query_id: QueryId,
        artists: Vec<Arc<Artist>>,
    },
    Albums {
        query_id: QueryId,
        albums: Vec<Arc<Album>>,
    },
}

impl ResolveEvent {
    pub fn query_id(&self) -> QueryId {
        match self {
            Self::Results { query_id, .. }
            | Self::Artists { query_id, .. }
            | Self::Albums { query_id, .. } => *query_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Results { .. } => "results",
            Self::Artists { .. } => "artists",
            Self::Albums { .. } => "albums",
        }
    }
}

/// Destination for resolve events.
pub trait ResolveEventSink: Send + Sync {
    fn publish(&self, event: ResolveEvent);
}

/// A minimal in-memory event bus that keeps every published event.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Mutex<Vec<ResolveEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("Failed to acquire lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<ResolveEvent> {
        let mut guard = self.inner.lock().expect("Failed to acquire lock");
        std::mem::take(&mut *guard)
    }
}

impl ResolveEventSink for InMemoryEventBus {
    fn publish(&self, event: ResolveEvent) {
        self.inner
            .lock()
            .expect("Failed to acquire lock")
            .push(event);
    }
}

/// Forwards events into an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ResolveEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ResolveEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResolveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ResolveEventSink for ChannelSink {
    fn publish(&self, event: ResolveEvent) {
        let query_id = event.query_id();
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!(target: "events", %query_id, event = name, "receiver dropped, discarding event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::{ArtistId, QueryId};

    #[test]
    fn publish_and_drain_events() {
        let bus = InMemoryEventBus::new();
        assert!(bus.is_empty());

        let query_id = QueryId::new();
        bus.publish(ResolveEvent::Artists {
            query_id,
            artists: vec![Arc::new(Artist::new(ArtistId(1), "Daft Punk"))],
        });
        bus.publish(ResolveEvent::Results {
            query_id,
            results: Vec::new(),
        });
        assert_eq!(bus.len(), 2);

        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name(), "artists");
        assert_eq!(drained[1].query_id(), query_id);
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn channel_sink_forwards_and_tolerates_closed_receiver() {
        let (sink, mut rx) = ChannelSink::channel();
        let query_id = QueryId::new();

        sink.publish(ResolveEvent::Albums {
            query_id,
            albums: Vec::new(),
        });
        let received = rx.recv().await.expect("event delivered");
        assert_eq!(received.query_id(), query_id);

        drop(rx);
        sink.publish(ResolveEvent::Results {
            query_id,
            results: Vec::new(),
        });
    }
}
