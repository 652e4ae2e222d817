//! Criteria tree factory
//!
//! Builds well-formed default trees and canned rules. Every node gets its id
//! from the injected [`IdGenerator`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{
    ANY_RELATION, CRITERIA_FTS_RULE_FIELD, CRITERIA_TYPES_RULE_FIELD, Condition, CriteriaNode,
    Junction, Rule, RuleValue, operator, rule_type,
};
use super::id::{IdGenerator, UuidIdGenerator};
use super::query_builder::assign_restrictions;
use super::shape;

/// One value or many; normalized to a list when building trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<&str>> for OneOrMany {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// Parameters for [`CriteriaFactory::build_search_tree`], e.g. from a URL or a widget config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTreeParams {
    pub object_type: Option<OneOrMany>,
    pub free_text: Option<String>,
    pub context: Option<OneOrMany>,
    pub restrictions: Option<CriteriaNode>,
    /// Root junction, OR when absent; restrictions force AND
    pub root_condition: Option<Junction>,
}

impl SearchTreeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_type(mut self, object_type: impl Into<OneOrMany>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    pub fn with_free_text(mut self, free_text: impl Into<String>) -> Self {
        self.free_text = Some(free_text.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<OneOrMany>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_restrictions(mut self, restrictions: impl Into<CriteriaNode>) -> Self {
        self.restrictions = Some(restrictions.into());
        self
    }

    pub fn with_root_condition(mut self, condition: Junction) -> Self {
        self.root_condition = Some(condition);
        self
    }
}

/// Constructs criteria trees and rules
#[derive(Clone)]
pub struct CriteriaFactory {
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for CriteriaFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaFactory").finish_non_exhaustive()
    }
}

impl Default for CriteriaFactory {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdGenerator))
    }
}

impl CriteriaFactory {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// The id generator nodes are created with
    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Root condition (OR unless given) holding one empty AND primary group
    pub fn default_advanced_tree(&self, condition: Option<Junction>) -> Condition {
        let primary = self.build_condition(Some(Junction::And), None);
        self.build_condition(Some(condition.unwrap_or(Junction::Or)), Some(vec![primary.into()]))
    }

    pub fn build_rule(
        &self,
        field: impl Into<String>,
        rule_type: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<RuleValue>,
    ) -> Rule {
        Rule::new(self.ids.next_id(), field, rule_type, operator, value)
    }

    /// Condition node; AND with no rules by default
    pub fn build_condition(
        &self,
        condition: Option<Junction>,
        rules: Option<Vec<CriteriaNode>>,
    ) -> Condition {
        Condition::new(
            self.ids.next_id(),
            condition.unwrap_or_default(),
            rules.unwrap_or_default(),
        )
    }

    pub fn default_object_type_rule(&self, predefined_types: Option<Vec<String>>) -> Rule {
        self.build_rule(
            CRITERIA_TYPES_RULE_FIELD,
            rule_type::NONE,
            operator::EQUALS,
            RuleValue::List(predefined_types.unwrap_or_default()),
        )
    }

    pub fn default_free_text_rule(&self, value: Option<String>) -> Rule {
        self.build_rule(
            CRITERIA_FTS_RULE_FIELD,
            rule_type::FTS,
            operator::CONTAINS,
            RuleValue::Text(value.unwrap_or_default()),
        )
    }

    pub fn default_any_relation_rule(&self, value: Option<Vec<String>>) -> Rule {
        self.build_rule(
            ANY_RELATION,
            rule_type::OBJECT,
            operator::SET_TO,
            RuleValue::List(value.unwrap_or_default()),
        )
    }

    /// Tree for a search started from parameters instead of a form
    ///
    /// Object type goes into the primary group; free text and context share an
    /// inner AND group that exists only if one of them is given; restrictions
    /// are merged at root level.
    pub fn build_search_tree(&self, params: SearchTreeParams) -> Condition {
        let SearchTreeParams {
            object_type,
            free_text,
            context,
            restrictions,
            root_condition,
        } = params;

        let mut tree = self.default_advanced_tree(root_condition);

        let mut primary_rules: Vec<CriteriaNode> = Vec::new();
        if let Some(object_type) = object_type {
            primary_rules.push(self.default_object_type_rule(Some(object_type.into_vec())).into());
        }

        let mut inner_rules: Vec<CriteriaNode> = Vec::new();
        if let Some(free_text) = free_text {
            inner_rules.push(self.default_free_text_rule(Some(free_text)).into());
        }
        if let Some(context) = context {
            inner_rules.push(self.default_any_relation_rule(Some(context.into_vec())).into());
        }
        if !inner_rules.is_empty() {
            primary_rules.push(self.build_condition(Some(Junction::And), Some(inner_rules)).into());
        }

        if let Some(primary) = shape::primary_group_mut(&mut tree) {
            primary.rules.extend(primary_rules);
        }

        if let Some(restrictions) = restrictions {
            assign_restrictions(self, &mut tree, Some(restrictions));
        }

        debug!(root = %tree.id, "Built search tree");
        tree
    }
}
