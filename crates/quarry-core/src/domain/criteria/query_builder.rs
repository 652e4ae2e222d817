//! Query builder
//!
//! The sanctioned mutator of a criteria tree. Every structural change goes
//! through [`QueryBuilder::add`], [`QueryBuilder::remove`] or one of the
//! replacing operations, and is bracketed by before/after change
//! notifications. The free functions in this module are the tree-level
//! building blocks the builder and the factory share.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{Condition, CriteriaNode, Junction, NodeId, Rule};
use super::event::{ChangeListeners, TreeChange};
use super::factory::CriteriaFactory;
use super::shape;
use super::walker::{
    self, ConditionVisitor, CriteriaListenerMut, collect_rules, find_condition,
    find_condition_mut, is_criteria_empty, walk, walk_mut,
};
use crate::error::{Error, Result};

/// Lifecycle of the tree held by a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderState {
    /// No tree assigned yet
    Uninitialized,
    /// Tree assigned, no rules in it
    Initialized,
    /// Tree holds at least one rule
    Populated,
}

/// Owner of one search session's criteria tree
#[derive(Debug, Default)]
pub struct QueryBuilder {
    factory: CriteriaFactory,
    root_condition: Option<Junction>,
    tree: Option<Condition>,
    primary_group: Option<NodeId>,
    before_change: ChangeListeners,
    after_change: ChangeListeners,
}

impl QueryBuilder {
    pub fn new(factory: CriteriaFactory) -> Self {
        Self {
            factory,
            ..Self::default()
        }
    }

    /// Root junction of default trees created by [`Self::init`]
    pub fn with_root_condition(mut self, condition: Junction) -> Self {
        self.root_condition = Some(condition);
        self
    }

    pub fn factory(&self) -> &CriteriaFactory {
        &self.factory
    }

    /// Assign `criteria`, or a fresh default tree, and return it
    pub fn init(&mut self, criteria: Option<Condition>) -> &mut Condition {
        let tree = criteria
            .unwrap_or_else(|| self.factory.default_advanced_tree(self.root_condition));
        self.primary_group = shape::primary_group(&tree).map(|group| group.id.clone());
        debug!(root = %tree.id, "Query builder initialized");
        self.tree.insert(tree)
    }

    pub fn state(&self) -> BuilderState {
        match &self.tree {
            None => BuilderState::Uninitialized,
            Some(tree) if collect_rules(tree).is_empty() => BuilderState::Initialized,
            Some(_) => BuilderState::Populated,
        }
    }

    pub fn tree(&self) -> Option<&Condition> {
        self.tree.as_ref()
    }

    /// Direct mutable access; changes made through it are not notified
    pub fn tree_mut(&mut self) -> Option<&mut Condition> {
        self.tree.as_mut()
    }

    pub fn into_tree(self) -> Option<Condition> {
        self.tree
    }

    /// Id of the primary group, captured when the tree was assigned
    pub fn primary_group_id(&self) -> Option<&NodeId> {
        self.primary_group.as_ref()
    }

    pub fn primary_group(&self) -> Option<&Condition> {
        find_condition(self.tree.as_ref()?, self.primary_group.as_ref()?)
    }

    pub fn on_before_change(&mut self, callback: impl FnMut(&TreeChange) + Send + Sync + 'static) {
        self.before_change.subscribe(callback);
    }

    pub fn on_after_change(&mut self, callback: impl FnMut(&TreeChange) + Send + Sync + 'static) {
        self.after_change.subscribe(callback);
    }

    fn tree_or_err(&self) -> Result<&Condition> {
        self.tree.as_ref().ok_or(Error::BuilderNotInitialized)
    }

    /// Append `node` to the condition with id `parent_id`
    ///
    /// Returns `false` without notifying anyone when no such condition exists.
    pub fn add(&mut self, node: impl Into<CriteriaNode>, parent_id: &NodeId) -> Result<bool> {
        let node = node.into();
        let tree = self.tree.as_mut().ok_or(Error::BuilderNotInitialized)?;
        if find_condition(tree, parent_id).is_none() {
            debug!(parent = %parent_id, "Parent condition not found, nothing added");
            return Ok(false);
        }

        let change = TreeChange::add(node.id().clone(), parent_id.clone());
        self.before_change.notify(&change);
        if let Some(parent) = find_condition_mut(tree, parent_id) {
            parent.rules.push(node);
        }
        self.after_change.notify(&change);

        debug!(node = %change.node_id, parent = %parent_id, "Node added");
        Ok(true)
    }

    /// Detach the node with the given id from whichever condition holds it
    pub fn remove(&mut self, node_id: &NodeId) -> Result<Option<CriteriaNode>> {
        let tree = self.tree.as_mut().ok_or(Error::BuilderNotInitialized)?;
        let Some(parent_id) = parent_of(tree, node_id).map(|parent| parent.id.clone()) else {
            debug!(node = %node_id, "Node not found, nothing removed");
            return Ok(None);
        };

        let change = TreeChange::remove(node_id.clone(), parent_id.clone());
        self.before_change.notify(&change);
        let removed = detach_node(tree, node_id);
        self.after_change.notify(&change);

        debug!(node = %node_id, parent = %parent_id, "Node removed");
        Ok(removed)
    }

    /// Swap the whole tree for `target`, keeping the held root in place
    pub fn replace(&mut self, target: Condition) -> Result<()> {
        let tree = self.tree.as_mut().ok_or(Error::BuilderNotInitialized)?;
        let change = TreeChange::replace(tree.id.clone());

        self.before_change.notify(&change);
        replace_criteria(tree, target);
        self.primary_group = shape::primary_group(tree).map(|group| group.id.clone());
        self.after_change.notify(&change);
        Ok(())
    }

    /// Inject `restrictions` at root level of the held tree
    pub fn restrict(&mut self, restrictions: Option<CriteriaNode>) -> Result<bool> {
        let tree = self.tree.as_mut().ok_or(Error::BuilderNotInitialized)?;
        if !restrictions_apply(restrictions.as_ref()) {
            return Ok(false);
        }

        let change = TreeChange::replace(tree.id.clone());
        self.before_change.notify(&change);
        let applied = assign_restrictions(&self.factory, tree, restrictions);
        self.primary_group = shape::primary_group(tree).map(|group| group.id.clone());
        self.after_change.notify(&change);
        Ok(applied)
    }

    pub fn first_rule(&self, field: &str) -> Option<&Rule> {
        walker::first_rule(self.tree.as_ref()?, field)
    }

    /// Copy of the held tree without transient attributes
    pub fn sanitized(&self) -> Result<Condition> {
        Ok(sanitize_search_tree(self.tree_or_err()?))
    }

    pub fn encode(&self) -> Result<String> {
        encode_search_tree(self.tree_or_err()?)
    }
}

/// Condition directly holding the node with the given id
pub fn parent_of<'a>(tree: &'a Condition, node_id: &NodeId) -> Option<&'a Condition> {
    let mut parent = None;
    walk(
        tree,
        &mut ConditionVisitor(|condition: &'a Condition| {
            if parent.is_none() && condition.rules.iter().any(|child| child.id() == node_id) {
                parent = Some(condition);
            }
        }),
    );
    parent
}

/// Splice the node with the given id out of its parent, without notifications
pub fn detach_node(tree: &mut Condition, node_id: &NodeId) -> Option<CriteriaNode> {
    let parent_id = parent_of(tree, node_id)?.id.clone();
    let parent = find_condition_mut(tree, &parent_id)?;
    let index = parent.rules.iter().position(|child| child.id() == node_id)?;
    Some(parent.rules.remove(index))
}

/// Replace the contents of `original` with `target` in place
///
/// Whoever holds `original` observes the new tree. Extra attributes of the
/// original survive unless `target` sets the same key.
pub fn replace_criteria(original: &mut Condition, target: Condition) {
    original.rules.clear();
    let Condition {
        id,
        condition,
        rules,
        extra,
    } = target;
    original.id = id;
    original.condition = condition;
    original.rules = rules;
    original.extra.extend(extra);
}

fn restrictions_apply(restrictions: Option<&CriteriaNode>) -> bool {
    match restrictions {
        None => false,
        Some(CriteriaNode::Rule(rule)) => rule.has_value(),
        Some(CriteriaNode::Condition(condition)) => !is_criteria_empty(condition),
    }
}

/// Force the root to AND and push `restrictions` as a direct child
///
/// Absent or empty restrictions leave the tree untouched. An empty tree is
/// first replaced by a default one so the primary group stays at index 0.
pub fn assign_restrictions(
    factory: &CriteriaFactory,
    criteria: &mut Condition,
    restrictions: Option<CriteriaNode>,
) -> bool {
    if !restrictions_apply(restrictions.as_ref()) {
        return false;
    }
    let Some(restrictions) = restrictions else {
        return false;
    };

    if is_criteria_empty(criteria) {
        replace_criteria(criteria, factory.default_advanced_tree(None));
    }
    criteria.condition = Junction::And;
    debug!(root = %criteria.id, restriction = %restrictions.id(), "Restrictions assigned");
    criteria.rules.push(restrictions);
    true
}

struct Sanitizer;

impl CriteriaListenerMut for Sanitizer {
    fn on_rule(&mut self, rule: &mut Rule) {
        rule.extra.clear();
    }

    fn on_condition(&mut self, condition: &mut Condition) {
        condition.extra.clear();
    }
}

/// Deep copy of `criteria` with every transient attribute removed
pub fn sanitize_search_tree(criteria: &Condition) -> Condition {
    let mut sanitized = criteria.clone();
    walk_mut(&mut sanitized, &mut Sanitizer);
    sanitized
}

/// URL-safe text form of a tree, for links and routing parameters
pub fn encode_search_tree(criteria: &Condition) -> Result<String> {
    let json = serde_json::to_vec(&sanitize_search_tree(criteria))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Inverse of [`encode_search_tree`]; trailing padding is accepted
pub fn decode_search_tree(encoded: &str) -> Result<Condition> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .map_err(|e| Error::Decode(e.to_string()))?;
    let tree = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidCriteria(format!("decoded text is not a criteria tree: {e}")))?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criteria::event::ChangeKind;
    use crate::domain::criteria::id::SequentialIdGenerator;
    use crate::domain::criteria::walker::is_criteria_topmost;
    use std::sync::{Arc, Mutex};

    fn factory() -> CriteriaFactory {
        CriteriaFactory::new(Arc::new(SequentialIdGenerator::new("q")))
    }

    fn builder() -> QueryBuilder {
        let mut builder = QueryBuilder::new(factory());
        builder.init(None);
        builder
    }

    #[test]
    fn test_state_transitions() {
        let mut builder = QueryBuilder::new(factory());
        assert_eq!(builder.state(), BuilderState::Uninitialized);

        builder.init(None);
        assert_eq!(builder.state(), BuilderState::Initialized);

        let primary = builder.primary_group_id().cloned().unwrap();
        let rule = builder.factory().build_rule("title", "", "contains", "");
        builder.add(rule, &primary).unwrap();
        assert_eq!(builder.state(), BuilderState::Populated);
    }

    #[test]
    fn test_uninitialized_builder_rejects_mutation() {
        let mut builder = QueryBuilder::new(factory());
        let rule = builder.factory().build_rule("f", "", "equals", "v");

        let err = builder.add(rule, &NodeId::from("x")).unwrap_err();
        assert!(matches!(err, Error::BuilderNotInitialized));
        assert!(matches!(
            builder.remove(&NodeId::from("x")),
            Err(Error::BuilderNotInitialized)
        ));
    }

    #[test]
    fn test_init_with_root_condition() {
        let mut builder = QueryBuilder::new(factory()).with_root_condition(Junction::And);
        assert_eq!(builder.init(None).condition, Junction::And);
    }

    #[test]
    fn test_add_remove_inverse() {
        let mut builder = builder();
        let primary = builder.primary_group_id().cloned().unwrap();
        let existing = builder.factory().build_rule("a", "", "equals", "1");
        builder.add(existing, &primary).unwrap();
        let before = builder.primary_group().unwrap().rules.clone();

        let rule = builder.factory().build_rule("b", "", "equals", "2");
        let rule_id = rule.id.clone();
        assert!(builder.add(rule.clone(), &primary).unwrap());
        assert_eq!(builder.primary_group().unwrap().rules.len(), 2);

        let removed = builder.remove(&rule_id).unwrap();
        assert_eq!(removed, Some(CriteriaNode::Rule(rule)));
        assert_eq!(builder.primary_group().unwrap().rules, before);
    }

    #[test]
    fn test_add_to_unknown_parent_is_noop() {
        let mut builder = builder();
        let events = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&events);
        builder.on_before_change(move |_| *counter.lock().unwrap() += 1);

        let snapshot = builder.tree().cloned();
        let rule = builder.factory().build_rule("f", "", "equals", "v");
        assert!(!builder.add(rule, &NodeId::from("missing")).unwrap());
        assert_eq!(builder.tree().cloned(), snapshot);
        assert_eq!(*events.lock().unwrap(), 0);
    }

    #[test]
    fn test_remove_unknown_node_is_noop() {
        let mut builder = builder();
        assert_eq!(builder.remove(&NodeId::from("missing")).unwrap(), None);
    }

    #[test]
    fn test_notifications_bracket_mutation() {
        let mut builder = builder();
        let log = Arc::new(Mutex::new(Vec::new()));

        let before = Arc::clone(&log);
        builder.on_before_change(move |change| {
            before.lock().unwrap().push(("before", change.kind));
        });
        let after = Arc::clone(&log);
        builder.on_after_change(move |change| after.lock().unwrap().push(("after", change.kind)));

        let primary = builder.primary_group_id().cloned().unwrap();
        let rule = builder.factory().build_rule("f", "", "equals", "v");
        let rule_id = rule.id.clone();
        builder.add(rule, &primary).unwrap();
        builder.remove(&rule_id).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("before", ChangeKind::Add),
                ("after", ChangeKind::Add),
                ("before", ChangeKind::Remove),
                ("after", ChangeKind::Remove),
            ]
        );
    }

    #[test]
    fn test_remove_from_nested_condition() {
        let mut builder = builder();
        let primary = builder.primary_group_id().cloned().unwrap();
        let factory = builder.factory().clone();

        let nested_rule = factory.build_rule("f", "", "equals", "v");
        let nested_id = nested_rule.id.clone();
        let group = factory.build_condition(Some(Junction::Or), Some(vec![nested_rule.into()]));
        let group_id = group.id.clone();
        builder.add(group, &primary).unwrap();

        assert!(builder.remove(&nested_id).unwrap().is_some());
        let group = find_condition(builder.tree().unwrap(), &group_id).unwrap();
        assert!(group.rules.is_empty());
    }

    #[test]
    fn test_topmost_rule_after_canonical_shape() {
        let factory = factory();
        let mut builder = QueryBuilder::new(factory.clone());
        builder.init(None);
        let primary = builder.primary_group_id().cloned().unwrap();

        let r1 = factory.build_rule("a", "", "equals", "1");
        let r2 = factory.build_rule("b", "", "equals", "2");
        builder.add(r1.clone(), &primary).unwrap();
        builder.add(r2.clone(), &primary).unwrap();

        let inner = factory.build_condition(
            Some(Junction::And),
            Some(vec![r1.clone().into(), r2.clone().into()]),
        );
        if let Some(group) = shape::primary_group_mut(builder.tree_mut().unwrap()) {
            group.rules[shape::INNER_GROUP_INDEX] = inner.into();
        }

        let tree = builder.tree().unwrap();
        assert!(is_criteria_topmost(tree, &r1));
        assert!(!is_criteria_topmost(tree, &r2));
    }

    #[test]
    fn test_replace_criteria_in_place() {
        let factory = factory();
        let mut original = factory.default_advanced_tree(None);
        original.extra.insert("dirty".into(), serde_json::json!(true));
        let target = factory.build_condition(
            Some(Junction::And),
            Some(vec![factory.build_rule("f", "", "equals", "v").into()]),
        );

        let holder = &mut original;
        replace_criteria(holder, target.clone());

        assert_eq!(original.id, target.id);
        assert_eq!(original.condition, Junction::And);
        assert_eq!(original.rules, target.rules);
        assert_eq!(original.extra.get("dirty"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_builder_replace_updates_primary_handle() {
        let mut builder = builder();
        let old_primary = builder.primary_group_id().cloned();
        let replacement = builder.factory().default_advanced_tree(None);

        builder.replace(replacement.clone()).unwrap();
        assert_ne!(builder.primary_group_id().cloned(), old_primary);
        assert_eq!(builder.tree(), Some(&replacement));
    }

    #[test]
    fn test_assign_restrictions_on_empty_tree() {
        let factory = factory();
        let mut tree = factory.default_advanced_tree(None);
        let restriction = factory.build_rule("x", "object", "equals", vec!["1"]);

        assert!(assign_restrictions(&factory, &mut tree, Some(restriction.clone().into())));
        assert_eq!(tree.condition, Junction::And);
        assert!(tree.rules.contains(&CriteriaNode::Rule(restriction.clone())));
        let primary = shape::primary_group(&tree).unwrap();
        assert!(!primary.rules.contains(&CriteriaNode::Rule(restriction)));
    }

    #[test]
    fn test_assign_restrictions_ignores_empty_input() {
        let factory = factory();
        let mut tree = factory.default_advanced_tree(None);
        let snapshot = tree.clone();

        assert!(!assign_restrictions(&factory, &mut tree, None));
        let blank = factory.build_rule("x", "", "equals", "");
        let empty = factory.build_condition(None, Some(vec![blank.into()]));
        assert!(!assign_restrictions(&factory, &mut tree, Some(empty.into())));
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_builder_restrict_notifies() {
        let mut builder = builder();
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        builder.on_after_change(move |_| *counter.lock().unwrap() += 1);

        let restriction = builder.factory().build_rule("x", "object", "equals", vec!["1"]);
        assert!(builder.restrict(Some(restriction.into())).unwrap());
        assert!(!builder.restrict(None).unwrap());
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(builder.primary_group().is_some());
    }

    #[test]
    fn test_sanitize_strips_extra_attributes() {
        let factory = factory();
        let mut tree = factory.default_advanced_tree(None);
        let mut rule = factory.build_rule("f", "", "equals", "v");
        rule.extra.insert("renderer".into(), serde_json::json!("picker"));
        tree.extra.insert("expanded".into(), serde_json::json!(true));
        if let Some(primary) = shape::primary_group_mut(&mut tree) {
            primary.rules.push(rule.into());
        }

        let sanitized = sanitize_search_tree(&tree);
        assert!(sanitized.extra.is_empty());
        assert!(collect_rules(&sanitized).iter().all(|rule| rule.extra.is_empty()));
        // original untouched
        assert!(!tree.extra.is_empty());
    }

    #[test]
    fn test_encode_decode() {
        let factory = factory();
        let tree = factory.build_condition(
            Some(Junction::Or),
            Some(vec![factory.build_rule("freeText", "fts", "contains", "a/b+c?").into()]),
        );

        let encoded = encode_search_tree(&tree).unwrap();
        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode_search_tree(&encoded).unwrap(), tree);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_search_tree("***"), Err(Error::Decode(_))));
        let not_a_tree = URL_SAFE_NO_PAD.encode(b"[1, 2]");
        assert!(matches!(
            decode_search_tree(&not_a_tree),
            Err(Error::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_first_rule_lookup() {
        let mut builder = builder();
        let primary = builder.primary_group_id().cloned().unwrap();
        let rule = builder.factory().default_free_text_rule(Some("q".into()));
        builder.add(rule.clone(), &primary).unwrap();

        assert_eq!(builder.first_rule("freeText"), Some(&rule));
        assert!(builder.first_rule("missing").is_none());
    }
}
