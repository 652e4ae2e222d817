//! Domain event infrastructure
//!
//! Search sessions record what happened to them (searches issued, completed,
//! discarded as stale) as immutable events. Publishers are pluggable; the
//! in-memory store backs tests and the CLI.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Something that happened to a search session
pub trait DomainEvent: Send + Sync {
    fn event_type(&self) -> &str;

    /// Session the event belongs to
    fn aggregate_id(&self) -> Uuid;

    fn timestamp(&self) -> DateTime<Utc>;

    fn data(&self) -> Option<&serde_json::Value>;
}

/// Sink for domain events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()>;

    /// Publish several events in order, stopping at the first failure
    async fn publish_all(&self, events: &[&dyn DomainEvent]) -> Result<()> {
        for event in events {
            self.publish(*event).await?;
        }
        Ok(())
    }
}

/// Event as kept by a store, detached from its concrete type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            data: event.data().cloned(),
            created_at: event.timestamp(),
        }
    }
}

/// Append-only event log held in memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, event: StoredEvent) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn filtered(&self, predicate: impl Fn(&StoredEvent) -> bool) -> Vec<StoredEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .cloned()
            .collect()
    }

    /// Events of one search session, oldest first
    pub fn events_for(&self, aggregate_id: Uuid) -> Vec<StoredEvent> {
        self.filtered(|event| event.aggregate_id == aggregate_id)
    }

    pub fn events_by_type(&self, event_type: &str) -> Vec<StoredEvent> {
        self.filtered(|event| event.event_type == event_type)
    }

    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.filtered(|_| true)
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventStore {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()> {
        self.store(StoredEvent::from_event(event));
        Ok(())
    }
}
