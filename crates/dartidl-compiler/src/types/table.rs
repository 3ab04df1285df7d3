//! Static table of well-known IDL types.

use super::TypeKind;

/// Static description of a well-known IDL type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeData {
    pub kind: TypeKind,
    pub dart_type: &'static str,
    pub native_type: &'static str,
    /// Stem of the `DartUtilities` conversion pair (`dartToX` / `xToDart`).
    pub conversion: Option<&'static str>,
    pub item_type: Option<&'static str>,
    pub merged_into: Option<&'static str>,
}

const fn primitive(dart_type: &'static str, native_type: &'static str, conversion: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::Primitive,
        dart_type,
        native_type,
        conversion: Some(conversion),
        item_type: None,
        merged_into: None,
    }
}

const fn interface(dart_type: &'static str, native_type: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::Interface,
        dart_type,
        native_type,
        conversion: None,
        item_type: None,
        merged_into: None,
    }
}

const fn list_like(dart_type: &'static str, native_type: &'static str, item_type: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::ListLike,
        dart_type,
        native_type,
        conversion: None,
        item_type: Some(item_type),
        merged_into: None,
    }
}

const fn typed_list(dart_type: &'static str, native_type: &'static str, item_type: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::TypedList,
        dart_type,
        native_type,
        conversion: None,
        item_type: Some(item_type),
        merged_into: None,
    }
}

const fn tear_off(dart_type: &'static str, native_type: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::TearOff,
        dart_type,
        native_type,
        conversion: None,
        item_type: None,
        merged_into: None,
    }
}

const fn merged(target: &'static str) -> TypeData {
    TypeData {
        kind: TypeKind::Interface,
        dart_type: target,
        native_type: target,
        conversion: None,
        item_type: None,
        merged_into: Some(target),
    }
}

/// Looks up a well-known type by IDL name.
pub(crate) fn lookup(name: &str) -> Option<TypeData> {
    let data = match name {
        "boolean" => primitive("bool", "bool", "Bool"),
        "byte" => primitive("int", "int", "Int"),
        "octet" => primitive("int", "unsigned", "Unsigned"),
        "short" => primitive("int", "int", "Int"),
        "unsigned short" => primitive("int", "unsigned", "Unsigned"),
        "long" => primitive("int", "int", "Int"),
        "unsigned long" => primitive("int", "unsigned", "Unsigned"),
        "long long" => primitive("int", "long long", "Int64"),
        "unsigned long long" => primitive("int", "unsigned long long", "Unsigned64"),
        "float" => primitive("num", "float", "Double"),
        "double" => primitive("num", "double", "Double"),
        "DOMString" => primitive("String", "String", "String"),
        "DOMTimeStamp" => primitive("int", "unsigned long long", "Unsigned64"),
        "Date" => primitive("DateTime", "double", "Date"),
        "any" => primitive("Object", "ScriptValue", "ScriptValue"),
        "object" => primitive("Object", "ScriptValue", "ScriptValue"),
        "SerializedScriptValue" => primitive("dynamic", "RefPtr<SerializedScriptValue>", "SerializedScriptValue"),
        "void" => TypeData {
            kind: TypeKind::Void,
            dart_type: "void",
            native_type: "void",
            conversion: None,
            item_type: None,
            merged_into: None,
        },
        "Dictionary" => TypeData {
            kind: TypeKind::Dictionary,
            dart_type: "Map",
            native_type: "Dictionary",
            conversion: Some("Dictionary"),
            item_type: None,
            merged_into: None,
        },
        "EventListener" => TypeData {
            kind: TypeKind::Callback,
            dart_type: "EventListener",
            native_type: "EventListener",
            conversion: None,
            item_type: None,
            merged_into: None,
        },

        "EventTarget" => interface("EventTarget", "EventTarget"),
        "DOMStringMap" => interface("Map<String, String>", "DOMStringMap"),
        "ArrayBuffer" => interface("ByteBuffer", "ArrayBuffer"),
        "ArrayBufferView" => interface("TypedData", "ArrayBufferView"),

        "DOMStringList" => list_like("List<String>", "DOMStringList", "DOMString"),
        "NodeList" => list_like("List<Node>", "NodeList", "Node"),

        "Float32Array" => typed_list("Float32List", "Float32Array", "double"),
        "Float64Array" => typed_list("Float64List", "Float64Array", "double"),
        "Int8Array" => typed_list("Int8List", "Int8Array", "byte"),
        "Int16Array" => typed_list("Int16List", "Int16Array", "short"),
        "Int32Array" => typed_list("Int32List", "Int32Array", "long"),
        "Uint8Array" => typed_list("Uint8List", "Uint8Array", "octet"),
        "Uint8ClampedArray" => typed_list("Uint8ClampedList", "Uint8ClampedArray", "octet"),
        "Uint16Array" => typed_list("Uint16List", "Uint16Array", "unsigned short"),
        "Uint32Array" => typed_list("Uint32List", "Uint32Array", "unsigned long"),

        "SVGAngle" => tear_off("SVGAngle", "SVGPropertyTearOff<SVGAngle>"),
        "SVGLength" => tear_off("SVGLength", "SVGPropertyTearOff<SVGLength>"),
        "SVGMatrix" => tear_off("SVGMatrix", "SVGPropertyTearOff<SVGMatrix>"),
        "SVGNumber" => tear_off("SVGNumber", "SVGPropertyTearOff<float>"),
        "SVGPoint" => tear_off("SVGPoint", "SVGPropertyTearOff<FloatPoint>"),
        "SVGPreserveAspectRatio" => tear_off("SVGPreserveAspectRatio", "SVGPropertyTearOff<SVGPreserveAspectRatio>"),
        "SVGRect" => tear_off("SVGRect", "SVGPropertyTearOff<FloatRect>"),
        "SVGTransform" => tear_off("SVGTransform", "SVGPropertyTearOff<SVGTransform>"),
        "SVGLengthList" => tear_off("SVGLengthList", "SVGListPropertyTearOff<SVGLengthList>"),
        "SVGNumberList" => tear_off("SVGNumberList", "SVGListPropertyTearOff<SVGNumberList>"),
        "SVGTransformList" => tear_off("SVGTransformList", "SVGTransformListPropertyTearOff"),
        "SVGPointList" => tear_off("SVGPointList", "SVGStaticListPropertyTearOff<SVGPointList>"),

        "DOMWindow" => merged("Window"),
        "HTMLDocument" => merged("Document"),

        _ => return None,
    };
    Some(data)
}

/// Marker interfaces that are only used structurally and never instantiated.
pub(crate) const PURE_INTERFACES: &[&str] = &[
    "DOMStringMap",
    "ElementTimeControl",
    "ElementTraversal",
    "MediaQueryListListener",
    "NodeSelector",
    "SVGExternalResourcesRequired",
    "SVGFilterPrimitiveStandardAttributes",
    "SVGFitToViewBox",
    "SVGLangSpace",
    "SVGLocatable",
    "SVGTests",
    "SVGTransformable",
    "SVGURIReference",
    "SVGZoomAndPan",
    "TimeoutHandler",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_widths_share_dart_int() {
        for name in ["byte", "octet", "short", "unsigned short", "long", "unsigned long", "long long"] {
            let data = lookup(name).unwrap();
            assert_eq!(data.kind, TypeKind::Primitive);
            assert_eq!(data.dart_type, "int", "{name}");
        }
    }

    #[test]
    fn test_unknown_type() {
        assert!(lookup("Circle").is_none());
    }

    #[test]
    fn test_merged_entries() {
        let data = lookup("DOMWindow").unwrap();
        assert_eq!(data.merged_into, Some("Window"));
    }
}
