//! Criteria tree entities
//!
//! A criteria tree is a recursive boolean query: condition nodes join their
//! children with AND/OR, rule nodes are `field operator value` predicates.
//! The JSON shape matches the one exchanged with search and persistence
//! collaborators:
//!
//! ```json
//! {"id": "..", "condition": "OR", "rules": [
//!     {"id": "..", "condition": "AND", "rules": [
//!         {"id": "..", "field": "types", "type": "", "operator": "equals", "value": ["anyObject"]}
//!     ]}
//! ]}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pseudo object type meaning "any object type"
pub const ANY_OBJECT: &str = "anyObject";
/// Pseudo field matching any relation to the given objects
pub const ANY_RELATION: &str = "anyRelation";
/// Placeholder value resolved to the object the search is embedded in
pub const CURRENT_OBJECT: &str = "current_object";
/// Field of the object type rule
pub const CRITERIA_TYPES_RULE_FIELD: &str = "types";
/// Field of the free text rule
pub const CRITERIA_FTS_RULE_FIELD: &str = "freeText";

/// Auxiliary rule type tags
pub mod rule_type {
    pub const OBJECT: &str = "object";
    pub const CODE_LIST: &str = "codeList";
    pub const FTS: &str = "fts";
    pub const DATE_TIME: &str = "dateTime";
    pub const NONE: &str = "";
}

/// Well-known rule operators
pub mod operator {
    pub const EQUALS: &str = "equals";
    pub const CONTAINS: &str = "contains";
    pub const SET_TO: &str = "set_to";
    pub const AFTER: &str = "after";
    pub const BEFORE: &str = "before";
}

/// Opaque node identifier, unique within the process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Boolean junction of a condition node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Junction {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Junction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Parse case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a rule: a single string or a list of strings
///
/// Numbers and booleans in incoming JSON are read as their text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RuleValue {
    Text(String),
    List(Vec<String>),
}

impl Default for RuleValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl RuleValue {
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// True for `""` and `[]`
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(values) => values.is_empty(),
        }
    }

    /// Non-empty entries of the value, lists flattened
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![text.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Equality where an empty text and an empty list are the same "unset" value
    pub fn same_as(&self, other: &RuleValue) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (a, b) => a.is_empty() && b.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for RuleValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| scalar_text(item).map_err(serde::de::Error::custom))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            scalar => scalar_text(scalar)
                .map(Self::Text)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn scalar_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        serde_json::Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(format!("unsupported rule value entry: {other}")),
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for RuleValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for RuleValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Attributes attached by outer layers that the model does not interpret
pub type ExtraAttributes = BTreeMap<String, serde_json::Value>;

/// Leaf predicate `field operator value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: NodeId,
    pub field: String,
    #[serde(rename = "type", default)]
    pub rule_type: String,
    #[serde(default)]
    pub operator: String,
    /// Some widgets emit `null` instead of an empty value
    #[serde(default)]
    pub value: RuleValue,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl Rule {
    pub fn new(
        id: NodeId,
        field: impl Into<String>,
        rule_type: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self {
            id,
            field: field.into(),
            rule_type: rule_type.into(),
            operator: operator.into(),
            value: value.into(),
            extra: ExtraAttributes::new(),
        }
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Branch node joining its children with a junction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: NodeId,
    pub condition: Junction,
    pub rules: Vec<CriteriaNode>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl Condition {
    pub fn new(id: NodeId, condition: Junction, rules: Vec<CriteriaNode>) -> Self {
        Self {
            id,
            condition,
            rules,
            extra: ExtraAttributes::new(),
        }
    }

    /// Child condition at `index`, if that child is a condition
    pub fn condition_at(&self, index: usize) -> Option<&Condition> {
        self.rules.get(index).and_then(CriteriaNode::as_condition)
    }

    pub fn condition_at_mut(&mut self, index: usize) -> Option<&mut Condition> {
        self.rules.get_mut(index).and_then(CriteriaNode::as_condition_mut)
    }

    /// Child rule at `index`, if that child is a rule
    pub fn rule_at(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index).and_then(CriteriaNode::as_rule)
    }
}

/// A node of the criteria tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriteriaNode {
    Condition(Condition),
    Rule(Rule),
}

impl CriteriaNode {
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Condition(condition) => &condition.id,
            Self::Rule(rule) => &rule.id,
        }
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Self::Condition(condition) => Some(condition),
            Self::Rule(_) => None,
        }
    }

    pub fn as_condition_mut(&mut self) -> Option<&mut Condition> {
        match self {
            Self::Condition(condition) => Some(condition),
            Self::Rule(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Condition(_) => None,
        }
    }

    pub fn as_rule_mut(&mut self) -> Option<&mut Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Condition(_) => None,
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self, Self::Condition(_))
    }
}

impl From<Rule> for CriteriaNode {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl From<Condition> for CriteriaNode {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}
