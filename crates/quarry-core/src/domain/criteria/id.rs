//! Node id generation
//!
//! Ids only need to be unique within the process. Production code uses
//! random v4 UUIDs; tests inject a sequential generator for deterministic ids.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use super::entity::NodeId;

/// Source of node ids for tree construction
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Random UUID ids
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> NodeId {
        NodeId::new(Uuid::new_v4().to_string())
    }
}

/// Deterministic `prefix-N` ids
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("node")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> NodeId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        NodeId::new(format!("{}-{}", self.prefix, n))
    }
}
