//! Criteria tree walker
//!
//! Depth-first, pre-order, left-to-right traversal with pluggable hooks.
//! A condition's hooks fire before any of its children are visited. Callers
//! rely on this order for label lists and for locating the topmost rule.

use super::entity::{Condition, CriteriaNode, NodeId, Rule, RuleValue};
use super::shape;

/// Borrowed view of either node kind
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Condition(&'a Condition),
    Rule(&'a Rule),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a NodeId {
        match *self {
            Self::Condition(condition) => &condition.id,
            Self::Rule(rule) => &rule.id,
        }
    }
}

impl<'a> From<&'a Condition> for NodeRef<'a> {
    fn from(condition: &'a Condition) -> Self {
        Self::Condition(condition)
    }
}

impl<'a> From<&'a Rule> for NodeRef<'a> {
    fn from(rule: &'a Rule) -> Self {
        Self::Rule(rule)
    }
}

impl<'a> From<&'a CriteriaNode> for NodeRef<'a> {
    fn from(node: &'a CriteriaNode) -> Self {
        match node {
            CriteriaNode::Condition(condition) => Self::Condition(condition),
            CriteriaNode::Rule(rule) => Self::Rule(rule),
        }
    }
}

/// Read-only traversal hooks; register any subset
pub trait CriteriaListener<'a> {
    fn on_rule(&mut self, _rule: &'a Rule) {}

    fn on_condition(&mut self, _condition: &'a Condition) {}

    /// Fires for both kinds, after the specific hook
    fn on_any(&mut self, _node: NodeRef<'a>) {}
}

/// Mutating traversal hooks
pub trait CriteriaListenerMut {
    fn on_rule(&mut self, _rule: &mut Rule) {}

    fn on_condition(&mut self, _condition: &mut Condition) {}
}

/// Walk a tree or subtree
pub fn walk<'a, L>(node: impl Into<NodeRef<'a>>, listener: &mut L)
where
    L: CriteriaListener<'a> + ?Sized,
{
    match node.into() {
        NodeRef::Condition(condition) => {
            listener.on_condition(condition);
            listener.on_any(NodeRef::Condition(condition));
            for child in &condition.rules {
                walk(child, listener);
            }
        }
        NodeRef::Rule(rule) => {
            listener.on_rule(rule);
            listener.on_any(NodeRef::Rule(rule));
        }
    }
}

/// Walk an optional tree; absent trees are not visited
pub fn walk_optional<'a, L>(node: Option<&'a Condition>, listener: &mut L)
where
    L: CriteriaListener<'a> + ?Sized,
{
    if let Some(node) = node {
        walk(node, listener);
    }
}

/// Walk a tree letting the listener modify the nodes it visits
///
/// Children are read after the condition hook returns, so nodes added by
/// the hook are visited too.
pub fn walk_mut<L>(condition: &mut Condition, listener: &mut L)
where
    L: CriteriaListenerMut + ?Sized,
{
    listener.on_condition(condition);
    for child in condition.rules.iter_mut() {
        match child {
            CriteriaNode::Condition(inner) => walk_mut(inner, listener),
            CriteriaNode::Rule(rule) => listener.on_rule(rule),
        }
    }
}

/// Listener calling a closure for every rule
pub struct RuleVisitor<F>(pub F);

impl<'a, F> CriteriaListener<'a> for RuleVisitor<F>
where
    F: FnMut(&'a Rule),
{
    fn on_rule(&mut self, rule: &'a Rule) {
        (self.0)(rule)
    }
}

/// Listener calling a closure for every condition
pub struct ConditionVisitor<F>(pub F);

impl<'a, F> CriteriaListener<'a> for ConditionVisitor<F>
where
    F: FnMut(&'a Condition),
{
    fn on_condition(&mut self, condition: &'a Condition) {
        (self.0)(condition)
    }
}

impl<F> CriteriaListenerMut for RuleVisitor<F>
where
    F: FnMut(&mut Rule),
{
    fn on_rule(&mut self, rule: &mut Rule) {
        (self.0)(rule)
    }
}

/// Every rule of the tree in walk order
pub fn collect_rules(tree: &Condition) -> Vec<&Rule> {
    let mut rules = Vec::new();
    walk(tree, &mut RuleVisitor(|rule| rules.push(rule)));
    rules
}

/// Rule-level attributes that can be extracted across a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAttribute {
    Field,
    Operator,
    Type,
}

/// Value of `attribute` for every rule, in walk order
pub fn rule_attribute_values(tree: &Condition, attribute: RuleAttribute) -> Vec<String> {
    collect_rules(tree)
        .into_iter()
        .map(|rule| match attribute {
            RuleAttribute::Field => rule.field.clone(),
            RuleAttribute::Operator => rule.operator.clone(),
            RuleAttribute::Type => rule.rule_type.clone(),
        })
        .collect()
}

fn values_where(tree: &Condition, predicate: impl Fn(&Rule) -> bool) -> Vec<String> {
    collect_rules(tree)
        .into_iter()
        .filter(|rule| predicate(rule))
        .flat_map(|rule| rule.value.values())
        .map(str::to_string)
        .collect()
}

/// All values of rules with the given field; lists flattened, empty scalars skipped
pub fn rule_values_by_field(tree: &Condition, field: &str) -> Vec<String> {
    values_where(tree, |rule| rule.field == field)
}

/// All values of rules with the given type tag
pub fn rule_values_by_type(tree: &Condition, rule_type: &str) -> Vec<String> {
    values_where(tree, |rule| rule.rule_type == rule_type)
}

/// True when no rule in the tree carries a value
pub fn is_criteria_empty(tree: &Condition) -> bool {
    !collect_rules(tree).iter().any(|rule| rule.has_value())
}

/// True when the node exists and is a condition
pub fn is_criteria_defined(node: Option<&CriteriaNode>) -> bool {
    matches!(node, Some(CriteriaNode::Condition(_)))
}

/// True when `rule` is the first rule of the inner group
///
/// Trees without the default shape have no topmost rule.
pub fn is_criteria_topmost(tree: &Condition, rule: &Rule) -> bool {
    shape::topmost_rule(tree).is_some_and(|topmost| topmost.id == rule.id)
}

/// First rule with the given field, in walk order
pub fn first_rule<'a>(tree: &'a Condition, field: &str) -> Option<&'a Rule> {
    collect_rules(tree).into_iter().find(|rule| rule.field == field)
}

/// First rule with the given field and operator
pub fn first_rule_with_operator<'a>(
    tree: &'a Condition,
    field: &str,
    operator: &str,
) -> Option<&'a Rule> {
    collect_rules(tree)
        .into_iter()
        .find(|rule| rule.field == field && rule.operator == operator)
}

/// Condition node with the given id, the root included
pub fn find_condition<'a>(tree: &'a Condition, id: &NodeId) -> Option<&'a Condition> {
    let mut found = None;
    walk(
        tree,
        &mut ConditionVisitor(|condition: &'a Condition| {
            if found.is_none() && condition.id == *id {
                found = Some(condition);
            }
        }),
    );
    found
}

pub fn find_condition_mut<'a>(tree: &'a mut Condition, id: &NodeId) -> Option<&'a mut Condition> {
    if tree.id == *id {
        return Some(tree);
    }
    tree.rules
        .iter_mut()
        .filter_map(CriteriaNode::as_condition_mut)
        .find_map(|child| find_condition_mut(child, id))
}

/// Mutable access to the first rule with the given field and operator
pub fn find_rule_mut<'a>(
    tree: &'a mut Condition,
    field: &str,
    operator: Option<&str>,
) -> Option<&'a mut Rule> {
    for child in tree.rules.iter_mut() {
        let found = match child {
            CriteriaNode::Rule(rule) => {
                let matches = rule.field == field
                    && operator.is_none_or(|operator| rule.operator == operator);
                matches.then_some(rule)
            }
            CriteriaNode::Condition(inner) => find_rule_mut(inner, field, operator),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// True when any node of the tree has the given id
pub fn contains_node(tree: &Condition, id: &NodeId) -> bool {
    struct Finder<'i> {
        id: &'i NodeId,
        found: bool,
    }

    impl<'a> CriteriaListener<'a> for Finder<'_> {
        fn on_any(&mut self, node: NodeRef<'a>) {
            self.found |= node.id() == self.id;
        }
    }

    let mut finder = Finder { id, found: false };
    walk(tree, &mut finder);
    finder.found
}

/// Assign `value` to every rule with the given field
pub fn assign_rule_value(tree: &mut Condition, field: &str, value: &RuleValue) -> usize {
    let mut assigned = 0;
    walk_mut(
        tree,
        &mut RuleVisitor(|rule: &mut Rule| {
            if rule.field == field {
                rule.value = value.clone();
                assigned += 1;
            }
        }),
    );
    assigned
}
