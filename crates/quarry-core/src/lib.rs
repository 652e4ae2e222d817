//! Quarry Core Library
//!
//! This crate provides the search criteria query model:
//! - Criteria trees (AND/OR conditions over field/operator/value rules)
//! - Tree factory and depth-first walker
//! - Query builder with change notifications and restriction injection
//! - Basic <-> advanced search form translation
//! - Human readable rendering and label translation
//! - Search mediation with last-request-wins semantics

pub mod config;
pub mod domain;
pub mod error;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::criteria::{
        Condition, CriteriaFactory, CriteriaNode, Junction, NodeId, QueryBuilder, Rule, RuleValue,
    };
    pub use crate::error::{Error, Result};
}

#[cfg(test)]
mod error_tests;
