//! Type registry: maps IDL type names to target-language type information.

mod registry;
mod table;

use std::rc::Rc;

pub use registry::{is_known_type, TypeRegistry};

/// How a type is represented across the generated surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Booleans, numbers, strings, dates and script values.
    Primitive,
    Void,
    /// A database or well-known interface.
    Interface,
    /// A callback interface (or `EventListener`), rendered as a Dart function type.
    Callback,
    /// `sequence<T>` / `T[]`.
    Sequence,
    /// An interface that behaves as a read-only list (`NodeList`, ...).
    ListLike,
    /// Typed arrays (`Float32Array`, ...).
    TypedList,
    /// SVG property tear-off wrappers.
    TearOff,
    Dictionary,
    Enum,
    /// Permissive fallback for unresolved types.
    Any,
}

/// Resolved information about one IDL type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub(crate) idl_type: String,
    pub(crate) kind: TypeKind,
    pub(crate) dart_type: String,
    pub(crate) native_type: String,
    pub(crate) conversion: Option<String>,
    pub(crate) list_item: Option<Rc<TypeInfo>>,
    pub(crate) pure_interface: bool,
}

impl TypeInfo {
    pub(crate) fn any(idl_type: &str) -> Self {
        Self {
            idl_type: idl_type.to_string(),
            kind: TypeKind::Any,
            dart_type: "dynamic".to_string(),
            native_type: "ScriptValue".to_string(),
            conversion: Some("ScriptValue".to_string()),
            list_item: None,
            pure_interface: false,
        }
    }

    pub fn idl_type(&self) -> &str {
        &self.idl_type
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// The Dart type name used in declarations.
    pub fn dart_type(&self) -> &str {
        &self.dart_type
    }

    /// The C++ type used for native locals.
    pub fn native_type(&self) -> &str {
        &self.native_type
    }

    /// Item type of list-shaped types.
    pub fn list_item(&self) -> Option<&TypeInfo> {
        self.list_item.as_deref()
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    pub fn is_tear_off(&self) -> bool {
        self.kind == TypeKind::TearOff
    }

    /// Marker interfaces are never instantiated; systems must not synthesize
    /// object creation for them.
    pub fn is_pure_interface(&self) -> bool {
        self.pure_interface
    }

    /// True if the value crosses the wrapper boundary as a wrapped object.
    pub fn needs_wrapping(&self) -> bool {
        match self.kind {
            TypeKind::Interface | TypeKind::Callback | TypeKind::TearOff => true,
            TypeKind::Sequence | TypeKind::ListLike => {
                self.list_item().is_some_and(TypeInfo::needs_wrapping)
            }
            _ => false,
        }
    }

    /// True if a Dart `is` test against this type is meaningful.
    pub fn is_checkable(&self) -> bool {
        is_checkable_type(&self.dart_type)
    }

    /// C++ expression converting Dart argument `index` to a native value.
    pub fn to_native(&self, index: usize) -> String {
        let args = format!("args, {}, exception", index);
        match self.kind {
            TypeKind::Interface | TypeKind::TearOff | TypeKind::ListLike | TypeKind::TypedList => {
                format!("Dart{}::toNative({})", self.idl_type, args)
            }
            TypeKind::Callback => format!("Dart{}::create({})", self.idl_type, args),
            TypeKind::Sequence => {
                let item = self
                    .list_item()
                    .map(|item| item.native_type.as_str())
                    .unwrap_or("ScriptValue");
                format!("DartUtilities::toNativeVector<{}>({})", item, args)
            }
            TypeKind::Enum => format!("DartUtilities::dartToString({})", args),
            _ => {
                let stem = self.conversion.as_deref().unwrap_or("ScriptValue");
                format!("DartUtilities::dartTo{}({})", stem, args)
            }
        }
    }

    /// C++ expression converting native `value` to a Dart handle.
    pub fn to_dart(&self, value: &str) -> String {
        match self.kind {
            TypeKind::Interface
            | TypeKind::TearOff
            | TypeKind::ListLike
            | TypeKind::TypedList
            | TypeKind::Callback => format!("Dart{}::toDart({})", self.idl_type, value),
            TypeKind::Sequence => format!("DartUtilities::toDartList({})", value),
            TypeKind::Enum => format!("DartUtilities::stringToDart({})", value),
            _ => {
                let stem = self.conversion.as_deref().unwrap_or("ScriptValue");
                format!("DartUtilities::{}ToDart({})", lower_first(stem), value)
            }
        }
    }
}

/// False for Dart types every value satisfies.
pub fn is_checkable_type(dart_type: &str) -> bool {
    !matches!(dart_type, "dynamic" | "Object" | "void")
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("Double"), "double");
        assert_eq!(lower_first("ScriptValue"), "scriptValue");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_any_is_not_checkable() {
        let info = TypeInfo::any("Mystery");
        assert_eq!(info.dart_type(), "dynamic");
        assert!(!info.is_checkable());
        assert!(!info.needs_wrapping());
    }
}
