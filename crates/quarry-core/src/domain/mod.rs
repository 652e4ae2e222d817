//! Domain layer
//!
//! Contains the criteria query model and the event infrastructure it reports through.

pub mod criteria;
pub mod events;
