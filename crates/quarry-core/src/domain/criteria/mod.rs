//! Search criteria domain
//!
//! This module contains:
//! - Entities: criteria tree nodes, rule values, junctions
//! - Factory and id generation for well-formed trees
//! - Walker: traversal hooks and derived queries
//! - Query builder: notified mutation, restrictions, sanitization, encoding
//! - Transformer: basic search mapping <-> advanced tree
//! - Rendering and label translation
//! - Mediator: running searches with last-request-wins semantics

pub mod entity;
pub mod event;
pub mod factory;
pub mod id;
pub mod mediator;
pub mod query_builder;
pub mod render;
pub mod shape;
pub mod transformer;
pub mod translation;
pub mod walker;

pub use entity::{
    ANY_OBJECT, ANY_RELATION, CRITERIA_FTS_RULE_FIELD, CRITERIA_TYPES_RULE_FIELD, CURRENT_OBJECT,
    Condition, CriteriaNode, Junction, NodeId, Rule, RuleValue, operator, rule_type,
};
pub use event::{ChangeKind, SearchEvent, SearchEventType, TreeChange};
pub use factory::{CriteriaFactory, OneOrMany, SearchTreeParams};
pub use id::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use mediator::{
    OrderDirection, SearchArguments, SearchData, SearchMediator, SearchMode, SearchOutcome,
    SearchQuery, SearchRequest, SearchResponse, SearchService,
};
pub use query_builder::{
    BuilderState, QueryBuilder, assign_restrictions, decode_search_tree, encode_search_tree,
    replace_criteria, sanitize_search_tree,
};
pub use render::{
    CriteriaRenderer, RenderFormat, RenderOptions, modify_criteria, stringify_criteria,
};
pub use transformer::{
    BasicCriteriaMapping, BasicCriterion, BasicField, BasicSearchSync, can_render_in_basic_form,
    convert_advanced_to_basic, convert_basic_to_advanced,
};
pub use translation::{BaseLabels, CriteriaTranslator, LabelSource, Labels};
pub use walker::{
    CriteriaListener, CriteriaListenerMut, NodeRef, RuleAttribute, first_rule, is_criteria_defined,
    is_criteria_empty, is_criteria_topmost, rule_attribute_values, rule_values_by_field,
    rule_values_by_type, walk, walk_mut,
};
