//! Structure validation for the interface database.
//!
//! Rejects inheritance cycles, `[MergedInto]` cycles and interfaces that
//! declare the same accessor twice for one attribute.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::GeneratorError;
use crate::idl::{is_collection_type, Database, Interface};

/// Validates the structure of the database.
pub fn validate_structure(database: &Database) -> Result<(), GeneratorError> {
    check_inheritance_cycles(database)?;
    for interface in database.interfaces() {
        check_merge_chain(database, interface)?;
        check_accessors(interface)?;
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

fn check_inheritance_cycles(database: &Database) -> Result<(), GeneratorError> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut path: Vec<&str> = Vec::new();
    for interface in database.interfaces() {
        visit(database, &interface.id, &mut marks, &mut path)?;
    }
    Ok(())
}

fn visit<'a>(
    database: &'a Database,
    id: &'a str,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<(), GeneratorError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|p| *p == id).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|p| p.to_string()).collect();
            cycle.push(id.to_string());
            return Err(GeneratorError::InheritanceCycle { cycle });
        }
        None => {}
    }

    let Some(interface) = database.get_interface(id) else {
        return Ok(());
    };

    marks.insert(id, Mark::InProgress);
    path.push(id);
    for parent in &interface.parents {
        if !is_collection_type(parent.id()) {
            visit(database, parent.id(), marks, path)?;
        }
    }
    path.pop();
    marks.insert(id, Mark::Done);
    Ok(())
}

/// Follows `[MergedInto]` from `interface`. A target naming itself ends the
/// chain, matching how type lookup treats it.
fn check_merge_chain(database: &Database, interface: &Interface) -> Result<(), GeneratorError> {
    let mut chain: Vec<&str> = vec![interface.id.as_str()];
    let mut current = interface;
    while let Some(target) = current
        .ext_attr_value("MergedInto")
        .filter(|target| *target != current.id)
    {
        if let Some(start) = chain.iter().position(|id| *id == target) {
            let mut cycle: Vec<String> = chain[start..].iter().map(|id| id.to_string()).collect();
            cycle.push(target.to_string());
            return Err(GeneratorError::MergedIntoCycle { cycle });
        }
        let Some(next) = database.get_interface(target) else {
            break;
        };
        chain.push(target);
        current = next;
    }
    Ok(())
}

fn check_accessors(interface: &Interface) -> Result<(), GeneratorError> {
    let mut getters = BTreeSet::new();
    let mut setters = BTreeSet::new();
    for attr in &interface.attributes {
        if attr.is_fc_getter && !getters.insert(attr.id.as_str()) {
            return Err(GeneratorError::DuplicateAccessor {
                interface: interface.id.clone(),
                attribute: attr.id.clone(),
                accessor: "getter",
            });
        }
        if attr.is_fc_setter && !setters.insert(attr.id.as_str()) {
            return Err(GeneratorError::DuplicateAccessor {
                interface: interface.id.clone(),
                attribute: attr.id.clone(),
                accessor: "setter",
            });
        }
    }
    Ok(())
}
