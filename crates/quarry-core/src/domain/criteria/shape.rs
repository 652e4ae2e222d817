//! Positional layout of a search tree
//!
//! Trees produced by the factory have a fixed shape that forms and the
//! topmost-rule check rely on:
//!
//! ```text
//! root (OR)                      restrictions are appended here, after the primary group
//! └── primary group (AND)        rules[PRIMARY_GROUP_INDEX]
//!     ├── object type rule       rules[OBJECT_TYPE_RULE_INDEX]
//!     └── inner group (AND)      rules[INNER_GROUP_INDEX]
//!         ├── topmost rule       rules[TOPMOST_RULE_INDEX]
//!         └── ...
//! ```
//!
//! Every positional lookup goes through this module.

use super::entity::{Condition, Junction, Rule};
use super::id::IdGenerator;

pub const PRIMARY_GROUP_INDEX: usize = 0;
pub const OBJECT_TYPE_RULE_INDEX: usize = 0;
pub const INNER_GROUP_INDEX: usize = 1;
pub const TOPMOST_RULE_INDEX: usize = 0;

pub fn primary_group(tree: &Condition) -> Option<&Condition> {
    tree.condition_at(PRIMARY_GROUP_INDEX)
}

pub fn primary_group_mut(tree: &mut Condition) -> Option<&mut Condition> {
    tree.condition_at_mut(PRIMARY_GROUP_INDEX)
}

pub fn inner_group(tree: &Condition) -> Option<&Condition> {
    primary_group(tree)?.condition_at(INNER_GROUP_INDEX)
}

pub fn inner_group_mut(tree: &mut Condition) -> Option<&mut Condition> {
    primary_group_mut(tree)?.condition_at_mut(INNER_GROUP_INDEX)
}

/// First rule of the inner group
pub fn topmost_rule(tree: &Condition) -> Option<&Rule> {
    inner_group(tree)?.rule_at(TOPMOST_RULE_INDEX)
}

/// Primary group of the tree, inserted at the front when missing
pub fn ensure_primary_group<'a>(
    tree: &'a mut Condition,
    ids: &dyn IdGenerator,
) -> Option<&'a mut Condition> {
    if primary_group(tree).is_none() {
        let group = Condition::new(ids.next_id(), Junction::And, Vec::new());
        tree.rules.insert(PRIMARY_GROUP_INDEX, group.into());
    }
    primary_group_mut(tree)
}

/// Inner group of the tree, created when the primary group lacks one
///
/// Returns `None` only when the tree has no primary group at all.
pub fn ensure_inner_group<'a>(
    tree: &'a mut Condition,
    ids: &dyn IdGenerator,
) -> Option<&'a mut Condition> {
    ensure_inner_group_in(primary_group_mut(tree)?, ids)
}

/// Inner group of `primary`, created when missing
///
/// An existing group is found by kind rather than position, since trees built
/// without an object type rule hold it first. Only AND groups qualify; an OR
/// group next to it is user structure. A new group goes right after the
/// object type rule.
pub fn ensure_inner_group_in<'a>(
    primary: &'a mut Condition,
    ids: &dyn IdGenerator,
) -> Option<&'a mut Condition> {
    let existing = primary.rules.iter().position(|node| {
        node.as_condition()
            .is_some_and(|group| group.condition == Junction::And)
    });
    let index = match existing {
        Some(index) => index,
        None => {
            let index = INNER_GROUP_INDEX.min(primary.rules.len());
            primary
                .rules
                .insert(index, Condition::new(ids.next_id(), Junction::And, Vec::new()).into());
            index
        }
    };
    primary.condition_at_mut(index)
}
