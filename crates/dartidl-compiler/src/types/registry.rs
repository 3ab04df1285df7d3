//! Memoising type resolver.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use crate::idl::{sequence_item_type, Database, Interface};
use super::table::{self, PURE_INTERFACES};
use super::{TypeInfo, TypeKind};

/// Resolves IDL type names against the static table and the database.
///
/// Results are cached per registry; the registry lives for one generation
/// run and borrows the (already normalised) database.
pub struct TypeRegistry<'db> {
    database: &'db Database,
    renames: BTreeMap<String, String>,
    cache: RefCell<HashMap<String, Rc<TypeInfo>>>,
    unresolved: RefCell<BTreeSet<String>>,
}

impl<'db> TypeRegistry<'db> {
    pub fn new(database: &'db Database, renames: BTreeMap<String, String>) -> Self {
        Self {
            database,
            renames,
            cache: RefCell::new(HashMap::new()),
            unresolved: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// Returns the type information for `type_name`.
    ///
    /// Never fails: unresolved names are logged, recorded (see
    /// [`TypeRegistry::unresolved`]) and resolved to `dynamic`.
    pub fn type_info(&self, type_name: &str) -> Rc<TypeInfo> {
        if let Some(info) = self.cache.borrow().get(type_name) {
            return Rc::clone(info);
        }
        let info = Rc::new(self.resolve(type_name));
        self.cache
            .borrow_mut()
            .insert(type_name.to_string(), Rc::clone(&info));
        info
    }

    /// Shorthand for the Dart type of `type_name`.
    pub fn dart_type(&self, type_name: &str) -> String {
        self.type_info(type_name).dart_type().to_string()
    }

    /// The Dart class name for an interface id.
    pub fn dart_name(&self, id: &str) -> String {
        if let Some(renamed) = self.renames.get(id) {
            return renamed.clone();
        }
        if let Some(name) = self
            .database
            .get_interface(id)
            .and_then(|interface| interface.ext_attr_value("DartName"))
        {
            return name.to_string();
        }
        id.to_string()
    }

    /// The Dart class name for an interface.
    pub fn interface_name(&self, interface: &Interface) -> String {
        self.dart_name(&interface.id)
    }

    /// Names that failed to resolve so far, sorted.
    pub fn unresolved(&self) -> Vec<String> {
        self.unresolved.borrow().iter().cloned().collect()
    }

    fn resolve(&self, type_name: &str) -> TypeInfo {
        if let Some(stripped) = type_name.strip_suffix('?') {
            return (*self.type_info(stripped)).clone();
        }

        if let Some(data) = table::lookup(type_name) {
            if let Some(target) = data.merged_into {
                return (*self.type_info(target)).clone();
            }
            let dart_type = match data.kind {
                TypeKind::Interface if self.database.has_interface(type_name) => {
                    self.dart_name(type_name)
                }
                TypeKind::Interface | TypeKind::TearOff => self
                    .renames
                    .get(type_name)
                    .cloned()
                    .unwrap_or_else(|| data.dart_type.to_string()),
                _ => data.dart_type.to_string(),
            };
            return TypeInfo {
                idl_type: type_name.to_string(),
                kind: data.kind,
                dart_type,
                native_type: data.native_type.to_string(),
                conversion: data.conversion.map(str::to_string),
                list_item: data.item_type.map(|item| self.type_info(item)),
                pure_interface: PURE_INTERFACES.contains(&type_name),
            };
        }

        if let Some(item) = sequence_item_type(type_name) {
            let item = self.type_info(item);
            return TypeInfo {
                idl_type: type_name.to_string(),
                kind: TypeKind::Sequence,
                dart_type: format!("List<{}>", item.dart_type()),
                native_type: format!("Vector<{}>", item.native_type()),
                conversion: None,
                list_item: Some(item),
                pure_interface: false,
            };
        }

        if let Some(interface) = self.database.get_interface(type_name) {
            if let Some(target) = interface
                .ext_attr_value("MergedInto")
                .filter(|target| *target != type_name)
            {
                return (*self.type_info(target)).clone();
            }
            let kind = if interface.has_ext_attr("Callback") {
                TypeKind::Callback
            } else {
                TypeKind::Interface
            };
            return TypeInfo {
                idl_type: type_name.to_string(),
                kind,
                dart_type: self.interface_name(interface),
                native_type: type_name.to_string(),
                conversion: None,
                list_item: None,
                pure_interface: PURE_INTERFACES.contains(&type_name)
                    || interface.has_ext_attr("PureInterface"),
            };
        }

        if self.database.has_dictionary(type_name) {
            return TypeInfo {
                idl_type: type_name.to_string(),
                kind: TypeKind::Dictionary,
                dart_type: "Map".to_string(),
                native_type: "Dictionary".to_string(),
                conversion: Some("Dictionary".to_string()),
                list_item: None,
                pure_interface: false,
            };
        }

        if self.database.has_enum(type_name) {
            return TypeInfo {
                idl_type: type_name.to_string(),
                kind: TypeKind::Enum,
                dart_type: "String".to_string(),
                native_type: "String".to_string(),
                conversion: Some("String".to_string()),
                list_item: None,
                pure_interface: false,
            };
        }

        tracing::error!(type_name, "unresolved type reference, falling back to dynamic");
        self.unresolved.borrow_mut().insert(type_name.to_string());
        TypeInfo::any(type_name)
    }
}

/// True if `type_name` resolves without falling back to `dynamic`.
///
/// Used by the normalisation pass that strips members whose types cannot be
/// identified before any emitter sees them.
pub fn is_known_type(database: &Database, type_name: &str) -> bool {
    let type_name = type_name.strip_suffix('?').unwrap_or(type_name);
    if table::lookup(type_name).is_some() || database.declares(type_name) {
        return true;
    }
    match sequence_item_type(type_name) {
        Some(item) => is_known_type(database, item),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::Interface;

    fn database() -> Database {
        let mut db = Database::new();
        db.add_interface(Interface::new("Node")).unwrap();
        db.add_interface(Interface::new("Window")).unwrap();

        let mut listener = Interface::new("MediaQueryListListener");
        listener.ext_attrs.insert("Callback".to_string(), None);
        db.add_interface(listener).unwrap();

        let mut renamed = Interface::new("HTMLElement");
        renamed
            .ext_attrs
            .insert("DartName".to_string(), Some("Element".to_string()));
        db.add_interface(renamed).unwrap();

        let mut merged = Interface::new("WebKitPoint");
        merged
            .ext_attrs
            .insert("MergedInto".to_string(), Some("Node".to_string()));
        db.add_interface(merged).unwrap();

        db.add_dictionary(crate::idl::Dictionary {
            id: "EventInit".to_string(),
            members: vec![],
        });
        db.add_enum(crate::idl::Enum {
            id: "ReadyState".to_string(),
            values: vec![],
        });
        db
    }

    #[test]
    fn test_primitives() {
        let db = Database::new();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        assert_eq!(types.dart_type("double"), "num");
        assert_eq!(types.dart_type("DOMString"), "String");
        assert_eq!(types.dart_type("boolean"), "bool");
        assert!(types.type_info("void").is_void());
        assert!(types.unresolved().is_empty());
    }

    #[test]
    fn test_sequence_is_list_shaped() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let info = types.type_info("sequence<Node>");
        assert_eq!(info.kind(), TypeKind::Sequence);
        assert_eq!(info.dart_type(), "List<Node>");
        assert_eq!(info.list_item().unwrap().dart_type(), "Node");
        assert!(info.needs_wrapping());
        assert_eq!(types.dart_type("DOMString[]"), "List<String>");
    }

    #[test]
    fn test_database_fallbacks() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        assert_eq!(types.type_info("Node").kind(), TypeKind::Interface);
        assert_eq!(types.dart_type("HTMLElement"), "Element");
        assert_eq!(types.dart_type("EventInit"), "Map");
        assert_eq!(types.dart_type("ReadyState"), "String");

        let callback = types.type_info("MediaQueryListListener");
        assert_eq!(callback.kind(), TypeKind::Callback);
        assert!(callback.is_pure_interface());
    }

    #[test]
    fn test_merged_into_redirects() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        assert_eq!(*types.type_info("WebKitPoint"), *types.type_info("Node"));
        assert_eq!(types.type_info("DOMWindow").dart_type(), "Window");
    }

    #[test]
    fn test_renames_win_over_dart_name() {
        let db = database();
        let mut renames = BTreeMap::new();
        renames.insert("HTMLElement".to_string(), "HtmlElement".to_string());
        let types = TypeRegistry::new(&db, renames);
        assert_eq!(types.dart_type("HTMLElement"), "HtmlElement");
    }

    #[test]
    fn test_nullable_resolves_like_base() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        assert_eq!(types.dart_type("Node?"), "Node");
    }

    #[test]
    fn test_unresolved_falls_back_to_dynamic() {
        let db = Database::new();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let info = types.type_info("Mystery");
        assert_eq!(info.kind(), TypeKind::Any);
        assert_eq!(info.dart_type(), "dynamic");
        types.type_info("Mystery");
        assert_eq!(types.unresolved(), vec!["Mystery".to_string()]);
    }

    #[test]
    fn test_cached() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let a = types.type_info("Node");
        let b = types.type_info("Node");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_native_conversions() {
        let db = database();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        assert_eq!(
            types.type_info("double").to_native(1),
            "DartUtilities::dartToDouble(args, 1, exception)"
        );
        assert_eq!(types.type_info("double").to_dart("result"), "DartUtilities::doubleToDart(result)");
        assert_eq!(types.type_info("Node").to_dart("result"), "DartNode::toDart(result)");
    }

    #[test]
    fn test_is_known_type() {
        let db = database();
        assert!(is_known_type(&db, "Node?"));
        assert!(is_known_type(&db, "sequence<EventInit>"));
        assert!(is_known_type(&db, "long"));
        assert!(!is_known_type(&db, "sequence<Mystery>"));
    }
}
