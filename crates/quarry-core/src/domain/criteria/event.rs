//! Criteria events
//!
//! Two kinds: synchronous [`TreeChange`] notifications fired around every
//! query builder mutation, and [`SearchEvent`] domain events recorded by the
//! search mediator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::NodeId;
use crate::domain::events::DomainEvent;

/// Kind of structural change applied to a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
    Replace,
}

/// Description of one mutation, passed to before and after listeners alike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeChange {
    pub kind: ChangeKind,
    /// Node being added or removed; the root for replacements
    pub node_id: NodeId,
    /// Condition the node is added to or removed from
    pub parent_id: Option<NodeId>,
}

impl TreeChange {
    pub fn add(node_id: NodeId, parent_id: NodeId) -> Self {
        Self {
            kind: ChangeKind::Add,
            node_id,
            parent_id: Some(parent_id),
        }
    }

    pub fn remove(node_id: NodeId, parent_id: NodeId) -> Self {
        Self {
            kind: ChangeKind::Remove,
            node_id,
            parent_id: Some(parent_id),
        }
    }

    pub fn replace(root_id: NodeId) -> Self {
        Self {
            kind: ChangeKind::Replace,
            node_id: root_id,
            parent_id: None,
        }
    }
}

type ChangeCallback = Box<dyn FnMut(&TreeChange) + Send + Sync>;

/// Ordered list of change callbacks
#[derive(Default)]
pub struct ChangeListeners {
    callbacks: Vec<ChangeCallback>,
}

impl std::fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("len", &self.callbacks.len())
            .finish()
    }
}

impl ChangeListeners {
    pub fn subscribe(&mut self, callback: impl FnMut(&TreeChange) + Send + Sync + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Call every callback in registration order
    pub fn notify(&mut self, change: &TreeChange) {
        for callback in self.callbacks.iter_mut() {
            callback(change);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Type of search event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEventType {
    /// A search request was handed to the search service
    SearchStarted,
    /// The latest search returned results
    SearchCompleted,
    /// A search resolved after a newer one was issued; its results were ignored
    SearchDiscarded,
    /// The search service returned an error
    SearchFailed,
}

impl SearchEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchStarted => "search_started",
            Self::SearchCompleted => "search_completed",
            Self::SearchDiscarded => "search_discarded",
            Self::SearchFailed => "search_failed",
        }
    }
}

impl std::fmt::Display for SearchEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A search domain event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEvent {
    pub id: Uuid,
    /// Search session (mediator) the event belongs to
    pub aggregate_id: Uuid,
    pub event_type: SearchEventType,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl SearchEvent {
    pub fn new(
        aggregate_id: Uuid,
        event_type: SearchEventType,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            event_type,
            data,
            created_at: Utc::now(),
        }
    }

    pub fn started(session_id: Uuid, request_number: u64, search_mode: &str) -> Self {
        let data = serde_json::json!({
            "request": request_number,
            "search_mode": search_mode,
        });
        Self::new(session_id, SearchEventType::SearchStarted, Some(data))
    }

    pub fn completed(session_id: Uuid, request_number: u64, result_size: u64) -> Self {
        let data = serde_json::json!({
            "request": request_number,
            "result_size": result_size,
        });
        Self::new(session_id, SearchEventType::SearchCompleted, Some(data))
    }

    pub fn discarded(session_id: Uuid, request_number: u64, latest_request: u64) -> Self {
        let data = serde_json::json!({
            "request": request_number,
            "latest_request": latest_request,
        });
        Self::new(session_id, SearchEventType::SearchDiscarded, Some(data))
    }

    pub fn failed(session_id: Uuid, request_number: u64, reason: &str) -> Self {
        let data = serde_json::json!({
            "request": request_number,
            "reason": reason,
        });
        Self::new(session_id, SearchEventType::SearchFailed, Some(data))
    }
}

impl DomainEvent for SearchEvent {
    fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}
