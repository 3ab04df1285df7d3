//! Interface node types.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Extended attributes: flags map to `None`, `Key=Value` pairs to `Some(value)`.
pub type ExtAttrs = BTreeMap<String, Option<String>>;

/// Source annotations keyed by source name (e.g. "WebKit", "Dart").
pub type Annotations = BTreeMap<String, BTreeMap<String, String>>;

/// A reference to an IDL type by name.
///
/// Deserialises from a plain string (`"Node?"` sets `nullable`) or from
/// `{ "id": ..., "nullable": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "IdlTypeRepr")]
pub struct IdlType {
    pub id: String,
    pub nullable: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdlTypeRepr {
    Name(String),
    Full {
        id: String,
        #[serde(default)]
        nullable: bool,
    },
}

impl From<IdlTypeRepr> for IdlType {
    fn from(repr: IdlTypeRepr) -> Self {
        match repr {
            IdlTypeRepr::Name(name) => match name.strip_suffix('?') {
                Some(stripped) => IdlType::nullable(stripped),
                None => IdlType::new(name),
            },
            IdlTypeRepr::Full { id, nullable } => IdlType { id, nullable },
        }
    }
}

impl IdlType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nullable: false,
        }
    }

    pub fn nullable(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nullable: true,
        }
    }
}

/// A parent (base interface) reference. Index 0 of `Interface::parents` is
/// the primary parent; the rest are secondary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParentRefRepr")]
pub struct ParentRef {
    #[serde(rename = "type")]
    pub typ: IdlType,
    pub annotations: Annotations,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParentRefRepr {
    Name(String),
    Full {
        #[serde(rename = "type")]
        typ: IdlType,
        #[serde(default)]
        annotations: Annotations,
    },
}

impl From<ParentRefRepr> for ParentRef {
    fn from(repr: ParentRefRepr) -> Self {
        match repr {
            ParentRefRepr::Name(name) => ParentRef::new(name),
            ParentRefRepr::Full { typ, annotations } => ParentRef { typ, annotations },
        }
    }
}

impl ParentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            typ: IdlType::new(id),
            annotations: Annotations::new(),
        }
    }

    /// The referenced interface name.
    pub fn id(&self) -> &str {
        &self.typ.id
    }

    pub fn matches_source_filter(&self, filter: &[String]) -> bool {
        matches_filter(&self.annotations, filter)
    }
}

/// An IDL attribute accessor record.
///
/// A read/write attribute is represented by two records sharing the same id,
/// one with `is_fc_getter` and one with `is_fc_setter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: IdlType,
    #[serde(default)]
    pub is_fc_getter: bool,
    #[serde(default)]
    pub is_fc_setter: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Attribute {
    /// Creates a getter record.
    pub fn getter(id: impl Into<String>, typ: IdlType) -> Self {
        Self {
            id: id.into(),
            typ,
            is_fc_getter: true,
            is_fc_setter: false,
            is_read_only: false,
            ext_attrs: ExtAttrs::new(),
            doc: None,
        }
    }

    /// Creates a setter record.
    pub fn setter(id: impl Into<String>, typ: IdlType) -> Self {
        Self {
            is_fc_getter: false,
            is_fc_setter: true,
            ..Self::getter(id, typ)
        }
    }
}

/// An operation argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: IdlType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
}

impl Argument {
    pub fn new(id: impl Into<String>, typ: IdlType) -> Self {
        Self {
            id: id.into(),
            typ,
            optional: false,
            default_value: None,
            ext_attrs: ExtAttrs::new(),
        }
    }

    pub fn optional(id: impl Into<String>, typ: IdlType) -> Self {
        Self {
            optional: true,
            ..Self::new(id, typ)
        }
    }

    /// True when the argument may be omitted by the caller.
    ///
    /// `[Optional]` without a value counts; `[Optional=DefaultIsUndefined]`
    /// and friends do not.
    pub fn is_optional(&self) -> bool {
        self.optional || matches!(self.ext_attrs.get("Optional"), Some(None))
    }
}

/// An IDL operation. Operations sharing an id within one interface form an
/// overload set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// `None` for anonymous (special) operations.
    #[serde(default)]
    pub id: Option<String>,
    /// Return type.
    #[serde(rename = "type")]
    pub typ: IdlType,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub raises_exception: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Operation {
    pub fn new(id: impl Into<String>, return_type: IdlType, arguments: Vec<Argument>) -> Self {
        Self {
            id: Some(id.into()),
            typ: return_type,
            arguments,
            raises_exception: false,
            is_static: false,
            ext_attrs: ExtAttrs::new(),
            doc: None,
        }
    }

    /// The operation name, or `""` for anonymous operations.
    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

/// An IDL constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: IdlType,
    pub value: String,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
}

impl Constant {
    pub fn new(id: impl Into<String>, typ: IdlType, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            typ,
            value: value.into(),
            ext_attrs: ExtAttrs::new(),
        }
    }
}

/// One constructor overload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
}

/// An IDL interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: String,
    #[serde(default)]
    pub parents: Vec<ParentRef>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub constructors: Vec<Constructor>,
    #[serde(default)]
    pub ext_attrs: ExtAttrs,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Interface {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parents: Vec::new(),
            constants: Vec::new(),
            attributes: Vec::new(),
            operations: Vec::new(),
            constructors: Vec::new(),
            ext_attrs: ExtAttrs::new(),
            annotations: Annotations::new(),
            doc: None,
        }
    }

    pub fn has_ext_attr(&self, name: &str) -> bool {
        self.ext_attrs.contains_key(name)
    }

    /// The value of a `Key=Value` extended attribute.
    pub fn ext_attr_value(&self, name: &str) -> Option<&str> {
        self.ext_attrs.get(name).and_then(|v| v.as_deref())
    }

    pub fn primary_parent(&self) -> Option<&ParentRef> {
        self.parents.first()
    }

    pub fn matches_source_filter(&self, filter: &[String]) -> bool {
        matches_filter(&self.annotations, filter)
    }

    /// Splits attribute records that carry neither accessor flag into a
    /// getter record and, unless read-only, a setter record.
    pub fn split_accessors(&mut self) {
        let mut split = Vec::with_capacity(self.attributes.len());
        for attr in self.attributes.drain(..) {
            if attr.is_fc_getter || attr.is_fc_setter {
                split.push(attr);
                continue;
            }
            let mut getter = attr.clone();
            getter.is_fc_getter = true;
            split.push(getter);
            if !attr.is_read_only {
                let mut setter = attr;
                setter.is_fc_setter = true;
                split.push(setter);
            }
        }
        self.attributes = split;
    }
}

fn matches_filter(annotations: &Annotations, filter: &[String]) -> bool {
    filter.is_empty() || filter.iter().any(|token| annotations.contains_key(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_string() {
        let ty: IdlType = serde_json::from_str("\"Node?\"").unwrap();
        assert_eq!(ty, IdlType::nullable("Node"));

        let ty: IdlType = serde_json::from_str("{\"id\": \"double\"}").unwrap();
        assert_eq!(ty, IdlType::new("double"));
    }

    #[test]
    fn test_parent_from_string() {
        let parents: Vec<ParentRef> =
            serde_json::from_str("[\"Shape\", {\"type\": \"EventTarget\", \"annotations\": {\"WebKit\": {}}}]")
                .unwrap();
        assert_eq!(parents[0].id(), "Shape");
        assert_eq!(parents[1].id(), "EventTarget");
        assert!(parents[1].matches_source_filter(&["WebKit".to_string()]));
        assert!(!parents[0].matches_source_filter(&["WebKit".to_string()]));
    }

    #[test]
    fn test_split_accessors() {
        let mut interface = Interface::new("Circle");
        let mut rw = Attribute::getter("radius", IdlType::new("double"));
        rw.is_fc_getter = false;
        let mut ro = rw.clone();
        ro.id = "area".to_string();
        ro.is_read_only = true;
        interface.attributes = vec![rw, ro];

        interface.split_accessors();

        let shape: Vec<(&str, bool, bool)> = interface
            .attributes
            .iter()
            .map(|a| (a.id.as_str(), a.is_fc_getter, a.is_fc_setter))
            .collect();
        assert_eq!(
            shape,
            vec![("radius", true, false), ("radius", false, true), ("area", true, false)]
        );
    }

    #[test]
    fn test_optional_argument() {
        let mut arg = Argument::new("x", IdlType::new("long"));
        assert!(!arg.is_optional());
        arg.ext_attrs.insert("Optional".to_string(), None);
        assert!(arg.is_optional());
        arg.ext_attrs
            .insert("Optional".to_string(), Some("DefaultIsUndefined".to_string()));
        assert!(!arg.is_optional());
        assert!(Argument::optional("y", IdlType::new("long")).is_optional());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let interface = Interface::new("Node");
        assert!(interface.matches_source_filter(&[]));
        assert!(!interface.matches_source_filter(&["WebKit".to_string()]));
    }
}
