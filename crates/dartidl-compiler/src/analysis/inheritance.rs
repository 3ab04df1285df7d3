//! Inheritance queries over the database.
//!
//! Parent references naming collection sugar (`List`, `sequence<T>`) or
//! interfaces missing from the database are skipped everywhere: they do not
//! contribute to closures, orderings or secondary parent sets.

use std::collections::BTreeSet;

use crate::idl::{is_collection_type, sequence_item_type, Database, Interface};

pub struct InheritanceResolver<'db> {
    database: &'db Database,
}

impl<'db> InheritanceResolver<'db> {
    pub fn new(database: &'db Database) -> Self {
        Self { database }
    }

    /// The database-resident, non-collection parents of `interface`.
    pub fn parents(&self, interface: &Interface) -> Vec<&'db Interface> {
        interface
            .parents
            .iter()
            .filter(|parent| !is_collection_type(parent.id()))
            .filter_map(|parent| self.database.get_interface(parent.id()))
            .collect()
    }

    /// The primary (first) parent, if it resolves to a database interface.
    pub fn primary_parent(&self, interface: &Interface) -> Option<&'db Interface> {
        let parent = interface.primary_parent()?;
        if is_collection_type(parent.id()) {
            return None;
        }
        self.database.get_interface(parent.id())
    }

    /// Reflexive transitive closure of `id` over parent edges.
    pub fn closure(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        self.collect_closure(id, &mut seen);
        seen
    }

    fn collect_closure(&self, id: &str, seen: &mut BTreeSet<String>) {
        if !seen.insert(id.to_string()) {
            return;
        }
        if let Some(interface) = self.database.get_interface(id) {
            for parent in self.parents(interface) {
                self.collect_closure(&parent.id, seen);
            }
        }
    }

    /// True if `id` is `other` or inherits from it.
    ///
    /// `other` need not be in the database: naming it as a parent anywhere
    /// in the closure is enough.
    pub fn implements(&self, id: &str, other: &str) -> bool {
        self.closure(id).iter().any(|ancestor| {
            ancestor == other
                || self
                    .database
                    .get_interface(ancestor)
                    .is_some_and(|i| i.parents.iter().any(|p| p.id() == other))
        })
    }

    /// Orders `interfaces` so that every interface follows its parents.
    ///
    /// Only members of the working set are returned, but the walk goes
    /// through parents outside it so indirect ancestors still order
    /// correctly. Each interface appears once.
    pub fn pre_order(&self, interfaces: &[&'db Interface]) -> Vec<&'db Interface> {
        let working: BTreeSet<&str> = interfaces.iter().map(|i| i.id.as_str()).collect();
        let mut seen = BTreeSet::new();
        let mut order = Vec::with_capacity(interfaces.len());
        for &interface in interfaces {
            self.visit(interface, &working, &mut seen, &mut order);
        }
        order
    }

    fn visit(
        &self,
        interface: &'db Interface,
        working: &BTreeSet<&str>,
        seen: &mut BTreeSet<String>,
        order: &mut Vec<&'db Interface>,
    ) {
        if !seen.insert(interface.id.clone()) {
            return;
        }
        for parent in self.parents(interface) {
            self.visit(parent, working, seen, order);
        }
        if working.contains(interface.id.as_str()) {
            order.push(interface);
        }
    }

    /// Interfaces brought in through non-primary parents, transitively.
    ///
    /// Interfaces already inherited through the primary parent chain are
    /// left out: the real base class provides their members.
    pub fn secondary_parents(&self, interface: &Interface) -> Vec<&'db Interface> {
        let inherited = match self.primary_parent(interface) {
            Some(primary) => self.closure(&primary.id),
            None => BTreeSet::new(),
        };

        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        let mut stack: Vec<&'db Interface> = interface
            .parents
            .iter()
            .skip(1)
            .filter(|parent| !is_collection_type(parent.id()))
            .filter_map(|parent| self.database.get_interface(parent.id()))
            .rev()
            .collect();

        while let Some(parent) = stack.pop() {
            if parent.id == interface.id || !seen.insert(parent.id.clone()) {
                continue;
            }
            if !inherited.contains(&parent.id) {
                result.push(parent);
            }
            stack.extend(self.parents(parent).into_iter().rev());
        }
        result
    }

    /// Element type of a `sequence<T>` parent, for list-like interfaces.
    pub fn list_element_type(&self, interface: &Interface) -> Option<String> {
        interface
            .parents
            .iter()
            .find_map(|parent| sequence_item_type(parent.id()))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::ParentRef;

    fn interface(id: &str, parents: &[&str]) -> Interface {
        let mut interface = Interface::new(id);
        interface.parents = parents.iter().map(|p| ParentRef::new(*p)).collect();
        interface
    }

    fn database() -> Database {
        let mut db = Database::new();
        for i in [
            interface("EventTarget", &[]),
            interface("Node", &["EventTarget"]),
            interface("ElementTraversal", &[]),
            interface("NodeSelector", &[]),
            interface("Element", &["Node", "ElementTraversal", "NodeSelector"]),
            interface("HTMLElement", &["Element"]),
            interface("NodeList", &["sequence<Node>"]),
            interface("Widget", &["Unknown", "List"]),
        ] {
            db.add_interface(i).unwrap();
        }
        db
    }

    #[test]
    fn test_closure_is_reflexive_and_transitive() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        let closure = resolver.closure("HTMLElement");
        for id in ["HTMLElement", "Element", "Node", "EventTarget", "ElementTraversal", "NodeSelector"] {
            assert!(closure.contains(id), "{id}");
        }
        assert!(resolver.implements("Element", "EventTarget"));
        assert!(!resolver.implements("Node", "Element"));
        assert!(resolver.implements("Widget", "Unknown"));
    }

    #[test]
    fn test_closure_skips_collections_and_unknown_parents() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        assert_eq!(resolver.closure("NodeList").len(), 1);
        assert_eq!(resolver.closure("Widget").len(), 1);
        assert!(resolver.primary_parent(db.get_interface("Widget").unwrap()).is_none());
    }

    #[test]
    fn test_pre_order_places_parents_first() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        let set: Vec<&Interface> = db.interfaces().collect();
        let order = resolver.pre_order(&set);

        assert_eq!(order.len(), set.len());
        let position = |id: &str| order.iter().position(|i| i.id == id).unwrap();
        for interface in &order {
            for parent in resolver.parents(interface) {
                assert!(position(parent.id.as_str()) < position(interface.id.as_str()));
            }
        }
    }

    #[test]
    fn test_pre_order_walks_through_out_of_set_parents() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        let set = vec![
            db.get_interface("HTMLElement").unwrap(),
            db.get_interface("EventTarget").unwrap(),
        ];
        let ids: Vec<&str> = resolver.pre_order(&set).into_iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["EventTarget", "HTMLElement"]);
    }

    #[test]
    fn test_secondary_parents() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        let element = db.get_interface("Element").unwrap();
        let ids: Vec<&str> = resolver
            .secondary_parents(element)
            .into_iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ElementTraversal", "NodeSelector"]);

        let html = db.get_interface("HTMLElement").unwrap();
        assert!(resolver.secondary_parents(html).is_empty());
    }

    #[test]
    fn test_list_element_type() {
        let db = database();
        let resolver = InheritanceResolver::new(&db);
        let list = db.get_interface("NodeList").unwrap();
        assert_eq!(resolver.list_element_type(list).as_deref(), Some("Node"));
        assert_eq!(resolver.list_element_type(db.get_interface("Node").unwrap()), None);
    }
}
