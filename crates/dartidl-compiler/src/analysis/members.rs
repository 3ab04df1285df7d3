//! Member grouping and merging helpers used by the driver.

use std::collections::{BTreeMap, BTreeSet};

use crate::idl::{Attribute, Interface, Operation};
use super::inheritance::InheritanceResolver;

/// A getter/setter pair sharing one attribute id. At least one side is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributePair<'a> {
    pub getter: Option<&'a Attribute>,
    pub setter: Option<&'a Attribute>,
}

impl<'a> AttributePair<'a> {
    pub fn id(&self) -> &'a str {
        self.getter
            .or(self.setter)
            .map(|attr| attr.id.as_str())
            .unwrap_or_default()
    }

    /// True when getter and setter exist and agree on the type, so the pair
    /// can be rendered as a single field.
    pub fn is_field(&self) -> bool {
        match (self.getter, self.setter) {
            (Some(getter), Some(setter)) => getter.typ.id == setter.typ.id,
            _ => false,
        }
    }
}

/// Pairs attribute records by id, sorted by id.
///
/// Setters of `[Replaceable]` attributes are dropped.
pub fn pair_up_attributes<'a, I>(attributes: I) -> Vec<AttributePair<'a>>
where
    I: IntoIterator<Item = &'a Attribute>,
{
    let mut pairs: BTreeMap<&'a str, AttributePair<'a>> = BTreeMap::new();
    for attr in attributes {
        let pair = pairs.entry(attr.id.as_str()).or_insert(AttributePair {
            getter: None,
            setter: None,
        });
        if attr.is_fc_getter {
            pair.getter = Some(attr);
        } else if attr.is_fc_setter && !attr.ext_attrs.contains_key("Replaceable") {
            pair.setter = Some(attr);
        }
    }
    pairs
        .into_values()
        .filter(|pair| pair.getter.is_some() || pair.setter.is_some())
        .collect()
}

/// Groups named operations by id, sorted by id.
pub fn group_operations(interface: &Interface) -> BTreeMap<&str, Vec<&Operation>> {
    let mut groups: BTreeMap<&str, Vec<&Operation>> = BTreeMap::new();
    for op in &interface.operations {
        match op.id.as_deref() {
            Some(id) => groups.entry(id).or_default().push(op),
            None => {
                tracing::debug!(interface = %interface.id, "skipping anonymous operation");
            }
        }
    }
    groups
}

/// Members of a secondary parent that must be forwarded into the class.
#[derive(Debug)]
pub struct SecondaryMembers<'a> {
    pub attributes: Vec<AttributePair<'a>>,
    pub operations: BTreeMap<&'a str, Vec<&'a Operation>>,
}

/// Collects the members of `parent` not shadowed by `interface`'s own
/// declarations.
///
/// An attribute record is shadowed by an own record with the same id and
/// accessor kind. An operation group is shadowed when `interface` declares
/// any operation with that id.
pub fn secondary_members<'a>(interface: &Interface, parent: &'a Interface) -> SecondaryMembers<'a> {
    let attributes = pair_up_attributes(
        parent
            .attributes
            .iter()
            .filter(|attr| find_matching_attribute(interface, attr).is_none()),
    );

    let own: BTreeSet<&str> = interface
        .operations
        .iter()
        .filter_map(|op| op.id.as_deref())
        .collect();
    let operations = group_operations(parent)
        .into_iter()
        .filter(|(id, _)| !own.contains(id))
        .collect();

    SecondaryMembers {
        attributes,
        operations,
    }
}

/// The own attribute record matching `attr` by id and accessor kind.
pub fn find_matching_attribute<'i>(interface: &'i Interface, attr: &Attribute) -> Option<&'i Attribute> {
    interface.attributes.iter().find(|own| {
        own.id == attr.id
            && own.is_fc_getter == attr.is_fc_getter
            && own.is_fc_setter == attr.is_fc_setter
    })
}

/// Event handler attributes on event targets are generated elsewhere.
pub fn is_event_attribute(
    resolver: &InheritanceResolver,
    interface: &Interface,
    attr: &Attribute,
) -> bool {
    attr.typ.id == "EventListener" && resolver.implements(&interface.id, "EventTarget")
}
