//! The interface database and its snapshot format.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

use crate::diagnostic::GeneratorError;
use super::interface::{IdlType, Interface};

/// A dictionary declaration. Only its existence matters to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: String,
    #[serde(default)]
    pub members: Vec<DictionaryMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryMember {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: IdlType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// An enum declaration; enums are represented as strings in Dart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Serialized form of (part of) a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub dictionaries: Vec<Dictionary>,
    #[serde(default)]
    pub enums: Vec<Enum>,
}

/// The interface database.
///
/// Interfaces are keyed by id, so iteration order is sorted by id and
/// independent of load order.
#[derive(Debug, Clone, Default)]
pub struct Database {
    interfaces: BTreeMap<String, Interface>,
    dictionaries: BTreeMap<String, Dictionary>,
    enums: BTreeMap<String, Enum>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from a snapshot, rejecting duplicate interface ids.
    pub fn from_snapshot(snapshot: DatabaseSnapshot) -> Result<Self, GeneratorError> {
        let mut database = Self::new();
        database.extend(snapshot)?;
        Ok(database)
    }

    /// Adds every declaration of a snapshot fragment.
    pub fn extend(&mut self, snapshot: DatabaseSnapshot) -> Result<(), GeneratorError> {
        for interface in snapshot.interfaces {
            self.add_interface(interface)?;
        }
        for dictionary in snapshot.dictionaries {
            self.add_dictionary(dictionary);
        }
        for e in snapshot.enums {
            self.add_enum(e);
        }
        Ok(())
    }

    /// Converts the database back to its serialized form.
    pub fn to_snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot {
            interfaces: self.interfaces.values().cloned().collect(),
            dictionaries: self.dictionaries.values().cloned().collect(),
            enums: self.enums.values().cloned().collect(),
        }
    }

    pub fn has_interface(&self, id: &str) -> bool {
        self.interfaces.contains_key(id)
    }

    pub fn get_interface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.get(id)
    }

    pub fn get_interface_mut(&mut self, id: &str) -> Option<&mut Interface> {
        self.interfaces.get_mut(id)
    }

    /// All interfaces, sorted by id.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    pub fn interfaces_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.interfaces.values_mut()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    pub fn add_interface(&mut self, interface: Interface) -> Result<(), GeneratorError> {
        if self.interfaces.contains_key(&interface.id) {
            return Err(GeneratorError::DuplicateInterface {
                name: interface.id,
            });
        }
        self.interfaces.insert(interface.id.clone(), interface);
        Ok(())
    }

    pub fn delete_interface(&mut self, id: &str) -> Option<Interface> {
        self.interfaces.remove(id)
    }

    pub fn has_dictionary(&self, id: &str) -> bool {
        self.dictionaries.contains_key(id)
    }

    pub fn get_dictionary(&self, id: &str) -> Option<&Dictionary> {
        self.dictionaries.get(id)
    }

    pub fn add_dictionary(&mut self, dictionary: Dictionary) {
        self.dictionaries.insert(dictionary.id.clone(), dictionary);
    }

    pub fn has_enum(&self, id: &str) -> bool {
        self.enums.contains_key(id)
    }

    pub fn add_enum(&mut self, e: Enum) {
        self.enums.insert(e.id.clone(), e);
    }

    /// True if `name` is declared by the database in any form.
    pub fn declares(&self, name: &str) -> bool {
        self.has_interface(name) || self.has_dictionary(name) || self.has_enum(name)
    }

    /// Folds `[Supplemental=Target]` interfaces into their targets.
    ///
    /// The supplemental's constants, attributes and operations are appended
    /// to the target and the supplemental itself is deleted. Returns the
    /// number of interfaces merged.
    pub fn merge_supplementals(&mut self) -> Result<usize, GeneratorError> {
        let supplementals: Vec<(String, String)> = self
            .interfaces
            .values()
            .filter_map(|interface| {
                interface
                    .ext_attr_value("Supplemental")
                    .map(|target| (interface.id.clone(), target.to_string()))
            })
            .collect();

        let targets: BTreeMap<&str, &str> = supplementals
            .iter()
            .map(|(id, target)| (id.as_str(), target.as_str()))
            .collect();

        // A supplemental may extend another supplemental; every chain must end
        // at a regular interface.
        let mut resolved = Vec::with_capacity(supplementals.len());
        for (id, target) in &supplementals {
            let mut current = target.as_str();
            let mut seen = BTreeSet::from([id.as_str()]);
            while let Some(next) = targets.get(current) {
                if !seen.insert(current) {
                    break;
                }
                current = *next;
            }
            if targets.contains_key(current) || !self.interfaces.contains_key(current) {
                return Err(GeneratorError::SupplementalTargetMissing {
                    interface: id.clone(),
                    target: target.clone(),
                });
            }
            resolved.push((id.clone(), current.to_string()));
        }

        for (id, target) in &resolved {
            let source = self.interfaces.remove(id);
            let target_interface = self.interfaces.get_mut(target);
            let (Some(source), Some(target_interface)) = (source, target_interface) else {
                return Err(GeneratorError::SupplementalTargetMissing {
                    interface: id.clone(),
                    target: target.clone(),
                });
            };
            tracing::debug!(supplemental = %id, target = %target, "merging supplemental interface");
            target_interface.constants.extend(source.constants);
            target_interface.attributes.extend(source.attributes);
            target_interface.operations.extend(source.operations);
        }

        Ok(supplementals.len())
    }
}
