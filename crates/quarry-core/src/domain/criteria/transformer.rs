//! Basic <-> advanced search translation
//!
//! The basic search form edits a flat, fixed set of fields; the advanced form
//! edits the nested tree. [`convert_advanced_to_basic`] projects the tree onto
//! the flat mapping and [`convert_basic_to_advanced`] writes the mapping back,
//! diffing by field so ids of untouched rules stay stable.
//!
//! Parts of the tree the basic form cannot show are remembered in the
//! mapping's hidden list, whole groups included, and put back into the inner
//! group if they went missing from the tree in the meantime.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entity::{
    ANY_RELATION, CRITERIA_FTS_RULE_FIELD, CRITERIA_TYPES_RULE_FIELD, Condition, CriteriaNode,
    Junction, Rule, RuleValue, operator, rule_type,
};
use super::factory::CriteriaFactory;
use super::query_builder::detach_node;
use super::shape;
use super::walker::{
    ConditionVisitor, RuleVisitor, collect_rules, contains_node, find_rule_mut, walk,
};

/// The closed set of fields the basic search form edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicField {
    FreeText,
    Context,
    Relationships,
    Types,
    CreatedFromDate,
    CreatedToDate,
    CreatedBy,
}

impl BasicField {
    pub const ALL: [BasicField; 7] = [
        Self::FreeText,
        Self::Context,
        Self::Relationships,
        Self::Types,
        Self::CreatedFromDate,
        Self::CreatedToDate,
        Self::CreatedBy,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::Context => "context",
            Self::Relationships => "relationships",
            Self::Types => "types",
            Self::CreatedFromDate => "created_from_date",
            Self::CreatedToDate => "created_to_date",
            Self::CreatedBy => "created_by",
        }
    }

    /// Field of the advanced rule this entry mirrors
    pub fn field(&self) -> &'static str {
        match self {
            Self::FreeText => CRITERIA_FTS_RULE_FIELD,
            Self::Context => ANY_RELATION,
            Self::Relationships => "relationships",
            Self::Types => CRITERIA_TYPES_RULE_FIELD,
            Self::CreatedFromDate | Self::CreatedToDate => "emf:createdOn",
            Self::CreatedBy => "emf:createdBy",
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Self::FreeText => operator::CONTAINS,
            Self::Context | Self::Relationships | Self::CreatedBy => operator::SET_TO,
            Self::Types => operator::EQUALS,
            Self::CreatedFromDate => operator::AFTER,
            Self::CreatedToDate => operator::BEFORE,
        }
    }

    pub fn rule_type(&self) -> &'static str {
        match self {
            Self::FreeText => rule_type::FTS,
            Self::Context | Self::Relationships | Self::CreatedBy => rule_type::OBJECT,
            Self::Types => rule_type::NONE,
            Self::CreatedFromDate | Self::CreatedToDate => rule_type::DATE_TIME,
        }
    }

    /// Both date entries share a field and differ only by operator
    fn keyed_by_operator(&self) -> bool {
        matches!(self, Self::CreatedFromDate | Self::CreatedToDate)
    }

    fn holds_list(&self) -> bool {
        !matches!(
            self,
            Self::FreeText | Self::CreatedFromDate | Self::CreatedToDate
        )
    }

    /// The basic entry a rule belongs to, if any
    pub fn of_rule(rule: &Rule) -> Option<Self> {
        Self::ALL.into_iter().find(|basic| {
            basic.field() == rule.field
                && (!basic.keyed_by_operator() || basic.operator() == rule.operator)
        })
    }

    fn operator_filter(&self) -> Option<&'static str> {
        self.keyed_by_operator().then(|| self.operator())
    }

    fn empty_value(&self) -> RuleValue {
        if self.holds_list() {
            RuleValue::empty_list()
        } else {
            RuleValue::default()
        }
    }

    /// `value` in the form rules of this entry carry it
    fn normalize(&self, value: &RuleValue) -> RuleValue {
        match (self.holds_list(), value) {
            (true, RuleValue::Text(_)) => {
                RuleValue::List(value.values().into_iter().map(str::to_string).collect())
            }
            (false, RuleValue::List(values)) => RuleValue::Text(values.join(" ")),
            _ => value.clone(),
        }
    }
}

/// One entry of the basic mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicCriterion {
    pub id: String,
    pub field: String,
    pub operation: String,
    #[serde(default)]
    pub value: RuleValue,
}

impl BasicCriterion {
    fn empty(basic: BasicField) -> Self {
        Self {
            id: basic.key().to_string(),
            field: basic.field().to_string(),
            operation: basic.operator().to_string(),
            value: basic.empty_value(),
        }
    }
}

/// Flat projection of the tree edited by the basic search form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicCriteriaMapping {
    pub free_text: BasicCriterion,
    pub context: BasicCriterion,
    pub relationships: BasicCriterion,
    pub types: BasicCriterion,
    pub created_from_date: BasicCriterion,
    pub created_to_date: BasicCriterion,
    pub created_by: BasicCriterion,
    /// Advanced-only rules and groups seen during the last projection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden: Vec<CriteriaNode>,
}

impl Default for BasicCriteriaMapping {
    fn default() -> Self {
        Self {
            free_text: BasicCriterion::empty(BasicField::FreeText),
            context: BasicCriterion::empty(BasicField::Context),
            relationships: BasicCriterion::empty(BasicField::Relationships),
            types: BasicCriterion::empty(BasicField::Types),
            created_from_date: BasicCriterion::empty(BasicField::CreatedFromDate),
            created_to_date: BasicCriterion::empty(BasicField::CreatedToDate),
            created_by: BasicCriterion::empty(BasicField::CreatedBy),
            hidden: Vec::new(),
        }
    }
}

impl BasicCriteriaMapping {
    pub fn get(&self, basic: BasicField) -> &BasicCriterion {
        match basic {
            BasicField::FreeText => &self.free_text,
            BasicField::Context => &self.context,
            BasicField::Relationships => &self.relationships,
            BasicField::Types => &self.types,
            BasicField::CreatedFromDate => &self.created_from_date,
            BasicField::CreatedToDate => &self.created_to_date,
            BasicField::CreatedBy => &self.created_by,
        }
    }

    pub fn get_mut(&mut self, basic: BasicField) -> &mut BasicCriterion {
        match basic {
            BasicField::FreeText => &mut self.free_text,
            BasicField::Context => &mut self.context,
            BasicField::Relationships => &mut self.relationships,
            BasicField::Types => &mut self.types,
            BasicField::CreatedFromDate => &mut self.created_from_date,
            BasicField::CreatedToDate => &mut self.created_to_date,
            BasicField::CreatedBy => &mut self.created_by,
        }
    }

    pub fn set_value(&mut self, basic: BasicField, value: impl Into<RuleValue>) {
        self.get_mut(basic).value = value.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (BasicField, &BasicCriterion)> {
        BasicField::ALL.into_iter().map(move |basic| (basic, self.get(basic)))
    }

    /// True when every entry holds the same value as in `other`
    ///
    /// An empty text and an empty list count as the same unset value. Hidden
    /// rules are not compared.
    pub fn same_values(&self, other: &BasicCriteriaMapping) -> bool {
        self.iter()
            .all(|(basic, criterion)| criterion.value.same_as(&other.get(basic).value))
    }

    fn clear_values(&mut self) {
        for basic in BasicField::ALL {
            let criterion = self.get_mut(basic);
            criterion.value = basic.empty_value();
            criterion.operation = basic.operator().to_string();
        }
        self.hidden.clear();
    }
}

/// Part of the tree the search forms edit; restrictions live outside it
fn form_scope(tree: &Condition) -> &Condition {
    shape::primary_group(tree).unwrap_or(tree)
}

/// Project `tree` onto `mapping`
///
/// The first rule for each entry wins. Rules of no entry, and later
/// duplicates, are kept in `mapping.hidden`. A group with nothing to project
/// is kept there whole, so its junction survives the trip back.
pub fn convert_advanced_to_basic(mapping: &mut BasicCriteriaMapping, tree: &Condition) {
    mapping.clear_values();
    let mut seen = Vec::new();
    let mut hidden = Vec::new();

    for node in &form_scope(tree).rules {
        project_node(node, mapping, &mut seen, &mut hidden);
    }

    if !hidden.is_empty() {
        warn!(count = hidden.len(), "Nodes not representable in basic search kept aside");
    }
    mapping.hidden = hidden;
}

fn project_node(
    node: &CriteriaNode,
    mapping: &mut BasicCriteriaMapping,
    seen: &mut Vec<BasicField>,
    hidden: &mut Vec<CriteriaNode>,
) {
    match node {
        CriteriaNode::Rule(rule) => match BasicField::of_rule(rule) {
            Some(basic) if !seen.contains(&basic) => {
                seen.push(basic);
                let criterion = mapping.get_mut(basic);
                criterion.value = rule.value.clone();
                criterion.operation = rule.operator.clone();
            }
            _ => hidden.push(node.clone()),
        },
        CriteriaNode::Condition(condition) if collect_rules(condition).is_empty() => {}
        CriteriaNode::Condition(condition) if !projects_any(condition, seen) => {
            hidden.push(node.clone());
        }
        CriteriaNode::Condition(condition) => {
            for child in &condition.rules {
                project_node(child, mapping, seen, hidden);
            }
        }
    }
}

/// Whether some rule under `condition` would fill a still unset entry
fn projects_any(condition: &Condition, seen: &[BasicField]) -> bool {
    collect_rules(condition)
        .into_iter()
        .any(|rule| BasicField::of_rule(rule).is_some_and(|basic| !seen.contains(&basic)))
}

/// Write `mapping` back into `tree`
///
/// Existing rules are updated in place, new entries get new rules and
/// entries that became empty lose theirs. Returns whether the tree changed;
/// a second call with the same mapping changes nothing.
pub fn convert_basic_to_advanced(
    factory: &CriteriaFactory,
    mapping: &BasicCriteriaMapping,
    tree: &mut Condition,
) -> bool {
    let ids = factory.ids();
    let mut changed = false;
    if shape::primary_group(tree).is_none() {
        changed = true;
    }
    let Some(primary) = shape::ensure_primary_group(tree, ids) else {
        return changed;
    };

    for (basic, criterion) in mapping.iter() {
        let value = basic.normalize(&criterion.value);
        let existing = find_rule_mut(primary, basic.field(), basic.operator_filter());

        match existing {
            Some(rule) if value.is_empty() => {
                let id = rule.id.clone();
                detach_node(primary, &id);
                debug!(field = basic.key(), rule = %id, "Basic entry cleared, rule removed");
                changed = true;
            }
            Some(rule) => {
                if !rule.value.same_as(&value) {
                    rule.value = value;
                    changed = true;
                }
                if !basic.keyed_by_operator() && rule.operator != criterion.operation {
                    rule.operator = criterion.operation.clone();
                    changed = true;
                }
            }
            None if value.is_empty() => {}
            None => {
                let rule = new_rule(factory, basic, &criterion.operation, value);
                debug!(field = basic.key(), rule = %rule.id, "Rule created from basic entry");
                place_rule(factory, primary, basic, rule);
                changed = true;
            }
        }
    }

    for node in &mapping.hidden {
        if contains_node(primary, node.id()) {
            continue;
        }
        if let Some(inner) = shape::ensure_inner_group_in(primary, ids) {
            inner.rules.push(node.clone());
            changed = true;
        }
    }

    changed
}

fn new_rule(
    factory: &CriteriaFactory,
    basic: BasicField,
    operation: &str,
    value: RuleValue,
) -> Rule {
    let list = |value: &RuleValue| -> Vec<String> {
        value.values().into_iter().map(str::to_string).collect()
    };
    match basic {
        BasicField::Types => factory.default_object_type_rule(Some(list(&value))),
        BasicField::Context => factory.default_any_relation_rule(Some(list(&value))),
        BasicField::FreeText => factory.default_free_text_rule(Some(value.values().join(" "))),
        _ => {
            let operation = if basic.keyed_by_operator() || operation.is_empty() {
                basic.operator()
            } else {
                operation
            };
            factory.build_rule(basic.field(), basic.rule_type(), operation, value)
        }
    }
}

/// Object types go first in the primary group; everything else in the inner group
fn place_rule(factory: &CriteriaFactory, primary: &mut Condition, basic: BasicField, rule: Rule) {
    if basic == BasicField::Types {
        primary.rules.insert(shape::OBJECT_TYPE_RULE_INDEX, rule.into());
    } else if let Some(inner) = shape::ensure_inner_group_in(primary, factory.ids()) {
        inner.rules.push(rule.into());
    }
}

/// Whether the basic form can show `tree` without losing anything
///
/// Fails on rules of no basic entry, on two rules for one entry, on more than
/// one context value and on OR groups inside the form scope.
pub fn can_render_in_basic_form(tree: &Condition) -> bool {
    let scope = form_scope(tree);

    let mut has_or_group = false;
    walk(
        scope,
        &mut ConditionVisitor(|condition: &Condition| {
            has_or_group |= condition.condition == Junction::Or && condition.rules.len() > 1;
        }),
    );
    if has_or_group {
        return false;
    }

    let mut seen = Vec::new();
    let mut representable = true;
    walk(
        scope,
        &mut RuleVisitor(|rule: &Rule| match BasicField::of_rule(rule) {
            Some(basic) if !seen.contains(&basic) => {
                seen.push(basic);
                if basic == BasicField::Context && rule.value.values().len() > 1 {
                    representable = false;
                }
            }
            _ => representable = false,
        }),
    );
    representable
}

/// Basic-to-advanced synchronization that skips unchanged mappings
///
/// Both forms observe the same tree; regenerating on every notification would
/// bounce changes between them.
#[derive(Debug, Default)]
pub struct BasicSearchSync {
    previous: Option<BasicCriteriaMapping>,
}

impl BasicSearchSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `tree` into `mapping` and remember the result as the last snapshot
    pub fn project(&mut self, mapping: &mut BasicCriteriaMapping, tree: &Condition) {
        convert_advanced_to_basic(mapping, tree);
        self.previous = Some(mapping.clone());
    }

    /// Write `mapping` into `tree` unless it equals the last snapshot
    pub fn sync(
        &mut self,
        factory: &CriteriaFactory,
        mapping: &BasicCriteriaMapping,
        tree: &mut Condition,
    ) -> bool {
        if self
            .previous
            .as_ref()
            .is_some_and(|previous| previous.same_values(mapping))
        {
            debug!("Basic criteria unchanged, tree left as is");
            return false;
        }
        let changed = convert_basic_to_advanced(factory, mapping, tree);
        self.previous = Some(mapping.clone());
        changed
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
