//! Members whose types cannot be identified.
//!
//! A member referencing a type that is neither well known nor declared by
//! the database cannot be rendered faithfully by any system. Outside strict
//! mode such members are stripped with a warning before generation starts.

use std::collections::BTreeSet;

use crate::idl::{Database, Interface};
use crate::types::is_known_type;

/// Every unidentified type referenced by a member, sorted.
pub fn unidentified_types(database: &Database) -> Vec<String> {
    let mut names = BTreeSet::new();
    for interface in database.interfaces() {
        for name in member_types(interface) {
            if !is_known_type(database, name) {
                names.insert(name.to_string());
            }
        }
    }
    names.into_iter().collect()
}

fn member_types(interface: &Interface) -> impl Iterator<Item = &str> {
    let constants = interface.constants.iter().map(|c| c.typ.id.as_str());
    let attributes = interface.attributes.iter().map(|a| a.typ.id.as_str());
    let operations = interface.operations.iter().flat_map(|op| {
        std::iter::once(op.typ.id.as_str()).chain(op.arguments.iter().map(|a| a.typ.id.as_str()))
    });
    let constructors = interface
        .constructors
        .iter()
        .flat_map(|ctor| ctor.arguments.iter().map(|a| a.typ.id.as_str()));
    constants.chain(attributes).chain(operations).chain(constructors)
}

/// Removes members that reference unidentified types. Returns the number of
/// members removed.
pub fn strip_unidentified_members(database: &mut Database) -> usize {
    // Decide against an immutable view first, then apply.
    let mut plan: Vec<(String, StripPlan)> = Vec::new();
    for interface in database.interfaces() {
        let keep = StripPlan {
            constants: interface
                .constants
                .iter()
                .map(|c| is_known_type(database, &c.typ.id))
                .collect(),
            attributes: interface
                .attributes
                .iter()
                .map(|a| is_known_type(database, &a.typ.id))
                .collect(),
            operations: interface
                .operations
                .iter()
                .map(|op| {
                    is_known_type(database, &op.typ.id)
                        && op.arguments.iter().all(|a| is_known_type(database, &a.typ.id))
                })
                .collect(),
            constructors: interface
                .constructors
                .iter()
                .map(|ctor| ctor.arguments.iter().all(|a| is_known_type(database, &a.typ.id)))
                .collect(),
        };
        if !keep.keeps_everything() {
            plan.push((interface.id.clone(), keep));
        }
    }

    let mut removed = 0;
    for (id, keep) in plan {
        let Some(interface) = database.get_interface_mut(&id) else {
            continue;
        };
        removed += retain_flagged(&mut interface.constants, &keep.constants, |c| {
            tracing::warn!(interface = %id, constant = %c.id, "removing constant with unidentified type")
        });
        removed += retain_flagged(&mut interface.attributes, &keep.attributes, |a| {
            tracing::warn!(interface = %id, attribute = %a.id, "removing attribute with unidentified type")
        });
        removed += retain_flagged(&mut interface.operations, &keep.operations, |op| {
            tracing::warn!(interface = %id, operation = %op.name(), "removing operation with unidentified type")
        });
        removed += retain_flagged(&mut interface.constructors, &keep.constructors, |_| {
            tracing::warn!(interface = %id, "removing constructor with unidentified type")
        });
    }
    removed
}

struct StripPlan {
    constants: Vec<bool>,
    attributes: Vec<bool>,
    operations: Vec<bool>,
    constructors: Vec<bool>,
}

impl StripPlan {
    fn keeps_everything(&self) -> bool {
        [&self.constants, &self.attributes, &self.operations, &self.constructors]
            .iter()
            .all(|flags| flags.iter().all(|keep| *keep))
    }
}

fn retain_flagged<T>(items: &mut Vec<T>, keep: &[bool], mut on_remove: impl FnMut(&T)) -> usize {
    let before = items.len();
    let mut index = 0;
    items.retain(|item| {
        let kept = keep.get(index).copied().unwrap_or(true);
        index += 1;
        if !kept {
            on_remove(item);
        }
        kept
    });
    before - items.len()
}
