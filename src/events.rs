//! Engine event broadcasting
//!
//! Every observable state change is published as an [`EngineEvent`] on a
//! broadcast channel. Event names are stable strings (`index:created`,
//! `document:upserted`, ...) so subscribers can forward them to other
//! transports without matching on the enum.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::vector::DistanceMetric;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    IndexCreated {
        index: String,
        dimension: usize,
        metric: DistanceMetric,
    },
    DocumentUpserted {
        index: String,
        document_id: String,
        degraded: bool,
    },
    DocumentDeleted {
        index: String,
        document_id: String,
    },
    EmbeddingDegraded {
        cache_key: String,
        reason: String,
    },
    EmbeddingBatch {
        completed: usize,
        total: usize,
    },
    CacheInvalidated {
        cache_key: String,
    },
    ClusterCompleted {
        index: String,
        clusters: usize,
        iterations: usize,
        converged: bool,
    },
    DuplicatesFound {
        index: String,
        pairs: usize,
    },
}

impl EngineEvent {
    /// Stable `namespace:action` name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IndexCreated { .. } => "index:created",
            Self::DocumentUpserted { .. } => "document:upserted",
            Self::DocumentDeleted { .. } => "document:deleted",
            Self::EmbeddingDegraded { .. } => "embedding:degraded",
            Self::EmbeddingBatch { .. } => "embedding:batch",
            Self::CacheInvalidated { .. } => "cache:invalidated",
            Self::ClusterCompleted { .. } => "cluster:completed",
            Self::DuplicatesFound { .. } => "duplicates:found",
        }
    }
}

/// Fans engine events out to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn send(&self, event: EngineEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(count) => tracing::trace!(event = name, subscribers = count, "event broadcast"),
            Err(_) => tracing::trace!(event = name, "no subscribers for event"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
