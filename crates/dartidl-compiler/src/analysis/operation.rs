//! Overload-set analysis.
//!
//! An overload set (all operations of one interface sharing an id) is
//! expanded into concrete overloads, one per callable arity, and unified
//! into a single Dart-facing parameter list.

use std::collections::BTreeSet;

use crate::diagnostic::GeneratorError;
use crate::idl::{Argument, ExtAttrs, IdlType, Interface, Operation};
use crate::types::TypeRegistry;

/// Separator used when overloads disagree on a parameter name.
pub const NAME_SEPARATOR: &str = "_OR_";

/// One unified parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    /// IDL type shared by every overload reaching this slot, if any.
    pub type_id: Option<String>,
    /// Dart type of the slot; `dynamic` when overloads disagree.
    pub dart_type: String,
    pub is_optional: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl ParamInfo {
    pub fn declaration(&self) -> String {
        format!("{} {}", self.dart_type, self.name)
    }
}

/// A concrete overload after trailing optionals have been split off.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    pub arguments: Vec<Argument>,
    /// Index of the declaring operation within the group.
    pub source: usize,
}

impl Overload {
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn type_ids(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.typ.id.as_str()).collect()
    }
}

/// The analyzed form of an overload set.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationInfo {
    /// Id of the declaring interface.
    pub interface: String,
    /// IDL id of the operation.
    pub declared_name: String,
    /// Dart member name.
    pub name: String,
    pub return_type: String,
    pub return_dart_type: String,
    pub params: Vec<ParamInfo>,
    pub overloads: Vec<Overload>,
    pub is_static: bool,
    pub is_constructor: bool,
    pub raises_exception: bool,
    pub ext_attrs: ExtAttrs,
}

impl OperationInfo {
    pub fn number_of_required(&self) -> usize {
        self.params.iter().filter(|p| !p.is_optional).count()
    }

    /// Dart parameter list, e.g. `int a, [String b]`.
    pub fn parameters_as_declaration(&self) -> String {
        let required: Vec<String> = self
            .params
            .iter()
            .filter(|p| !p.is_optional)
            .map(ParamInfo::declaration)
            .collect();
        let optional: Vec<String> = self
            .params
            .iter()
            .filter(|p| p.is_optional)
            .map(ParamInfo::declaration)
            .collect();

        let mut out = required.join(", ");
        if !optional.is_empty() {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push('[');
            out.push_str(&optional.join(", "));
            out.push(']');
        }
        out
    }

    /// The first `count` parameter names as a call argument list.
    pub fn parameters_as_arguments(&self, count: usize) -> String {
        self.params
            .iter()
            .take(count)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_void(&self) -> bool {
        self.return_dart_type == "void"
    }

    pub fn has_overloads(&self) -> bool {
        self.overloads.len() > 1
    }
}

/// Analyzes the operations of `interface` that share one id.
pub fn analyze_operation(
    interface: &Interface,
    operations: &[&Operation],
    types: &TypeRegistry,
) -> Result<OperationInfo, GeneratorError> {
    let Some(first) = operations.first() else {
        return Err(GeneratorError::EmptyOverloadSet {
            interface: interface.id.clone(),
            operation: String::new(),
        });
    };
    let declared_name = first.name().to_string();

    let mut return_types: Vec<String> = Vec::new();
    for op in operations {
        if !return_types.contains(&op.typ.id) {
            return_types.push(op.typ.id.clone());
        }
    }
    if return_types.len() > 1 {
        return Err(GeneratorError::DivergentReturnTypes {
            interface: interface.id.clone(),
            operation: declared_name,
            types: return_types,
        });
    }

    let overloads = split_overloads(operations);
    reject_duplicates(interface, &declared_name, &overloads)?;
    let params = merge_params(interface, &declared_name, &overloads, types)?;

    let name = first
        .ext_attrs
        .get("DartName")
        .and_then(|v| v.clone())
        .unwrap_or_else(|| declared_name.clone());

    tracing::debug!(
        interface = %interface.id,
        operation = %declared_name,
        overloads = overloads.len(),
        "analyzed operation"
    );

    Ok(OperationInfo {
        interface: interface.id.clone(),
        name,
        return_dart_type: types.dart_type(&first.typ.id),
        return_type: first.typ.id.clone(),
        declared_name,
        params,
        overloads,
        is_static: first.is_static,
        is_constructor: false,
        raises_exception: operations.iter().any(|op| op.raises_exception),
        ext_attrs: first.ext_attrs.clone(),
    })
}

/// Analyzes the constructor overloads of `interface`, if it has any.
pub fn analyze_constructor(
    interface: &Interface,
    types: &TypeRegistry,
) -> Result<Option<OperationInfo>, GeneratorError> {
    if interface.constructors.is_empty() {
        return Ok(None);
    }

    let operations: Vec<Operation> = interface
        .constructors
        .iter()
        .map(|ctor| Operation {
            ext_attrs: ctor.ext_attrs.clone(),
            ..Operation::new(&interface.id, IdlType::new(&interface.id), ctor.arguments.clone())
        })
        .collect();
    let refs: Vec<&Operation> = operations.iter().collect();

    let mut info = analyze_operation(interface, &refs, types)?;
    info.name = types.interface_name(interface);
    info.is_constructor = true;
    info.is_static = true;
    Ok(Some(info))
}

/// Expands every trailing optional argument into a shorter overload.
///
/// `f(a, [b], [c])` yields `f(a)`, `f(a, b)`, `f(a, b, c)`.
fn split_overloads(operations: &[&Operation]) -> Vec<Overload> {
    let mut overloads = Vec::new();
    for (source, op) in operations.iter().enumerate() {
        for (i, arg) in op.arguments.iter().enumerate() {
            if arg.is_optional() {
                overloads.push(Overload {
                    arguments: op.arguments[..i].to_vec(),
                    source,
                });
            }
        }
        overloads.push(Overload {
            arguments: op.arguments.clone(),
            source,
        });
    }
    overloads
}

fn reject_duplicates(
    interface: &Interface,
    operation: &str,
    overloads: &[Overload],
) -> Result<(), GeneratorError> {
    let mut seen = BTreeSet::new();
    for overload in overloads {
        if !seen.insert(overload.type_ids()) {
            return Err(GeneratorError::DuplicateOverload {
                interface: interface.id.clone(),
                operation: operation.to_string(),
            });
        }
    }
    Ok(())
}

fn merge_params(
    interface: &Interface,
    operation: &str,
    overloads: &[Overload],
    types: &TypeRegistry,
) -> Result<Vec<ParamInfo>, GeneratorError> {
    let width = overloads.iter().map(Overload::arity).max().unwrap_or(0);
    let mut params = Vec::with_capacity(width);

    for position in 0..width {
        let present: Vec<&Argument> = overloads
            .iter()
            .filter_map(|o| o.arguments.get(position))
            .collect();

        let names: BTreeSet<&str> = present.iter().map(|a| a.id.as_str()).collect();
        let name = names.into_iter().collect::<Vec<_>>().join(NAME_SEPARATOR);

        let type_ids: BTreeSet<&str> = present.iter().map(|a| a.typ.id.as_str()).collect();
        let dart_types: BTreeSet<String> = type_ids.iter().map(|id| types.dart_type(id)).collect();
        let (type_id, dart_type) = match (dart_types.len(), type_ids.first()) {
            (1, Some(id)) => (Some(id.to_string()), types.dart_type(id)),
            _ => (None, "dynamic".to_string()),
        };

        let is_optional =
            present.len() < overloads.len() || present.iter().any(|a| a.is_optional());

        let defaults: BTreeSet<Option<&str>> =
            present.iter().map(|a| a.default_value.as_deref()).collect();
        let default_value = match defaults.into_iter().collect::<Vec<_>>().as_slice() {
            [Some(value)] => Some(value.to_string()),
            _ => None,
        };

        let is_nullable =
            present.iter().any(|a| a.typ.nullable) || (is_optional && default_value.is_none());

        params.push(ParamInfo {
            name,
            type_id,
            dart_type,
            is_optional,
            is_nullable,
            default_value,
        });
    }

    let mut seen_optional = false;
    for param in &params {
        if param.is_optional {
            seen_optional = true;
        } else if seen_optional {
            return Err(GeneratorError::OptionalBeforeRequired {
                interface: interface.id.clone(),
                operation: operation.to_string(),
                parameter: param.name.clone(),
            });
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{Constructor, Database};
    use std::collections::BTreeMap;

    fn arg(id: &str, ty: &str) -> Argument {
        Argument::new(id, IdlType::new(ty))
    }

    fn opt(id: &str, ty: &str) -> Argument {
        Argument::optional(id, IdlType::new(ty))
    }

    fn op(args: Vec<Argument>) -> Operation {
        Operation::new("f", IdlType::new("void"), args)
    }

    fn analyze(ops: &[Operation]) -> Result<OperationInfo, GeneratorError> {
        let db = Database::new();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let refs: Vec<&Operation> = ops.iter().collect();
        analyze_operation(&Interface::new("Test"), &refs, &types)
    }

    #[test]
    fn test_trailing_optional_becomes_optional_slot() {
        let info = analyze(&[op(vec![arg("a", "long"), opt("b", "DOMString")])]).unwrap();

        assert_eq!(info.params.len(), 2);
        assert_eq!(info.params[0].dart_type, "int");
        assert!(!info.params[0].is_optional);
        assert_eq!(info.params[1].dart_type, "String");
        assert!(info.params[1].is_optional);
        assert!(info.params[1].is_nullable);

        let arities: Vec<usize> = info.overloads.iter().map(Overload::arity).collect();
        assert_eq!(arities, vec![1, 2]);
    }

    #[test]
    fn test_merged_names_are_sorted() {
        let info = analyze(&[
            op(vec![arg("node", "Node")]),
            op(vec![arg("index", "long")]),
        ])
        .unwrap();
        assert_eq!(info.params[0].name, "index_OR_node");
        assert_eq!(info.params[0].dart_type, "dynamic");
        assert_eq!(info.params[0].type_id, None);
    }

    #[test]
    fn test_same_dart_type_keeps_type() {
        let info = analyze(&[
            op(vec![arg("x", "long")]),
            op(vec![arg("x", "short"), arg("y", "long")]),
        ])
        .unwrap();
        assert_eq!(info.params[0].dart_type, "int");
        assert_eq!(info.params[0].type_id.as_deref(), Some("long"));
        assert!(info.params[1].is_optional);
        assert_eq!(info.number_of_required(), 1);
        assert_eq!(info.parameters_as_declaration(), "int x, [int y]");
        assert_eq!(info.parameters_as_arguments(1), "x");
    }

    #[test]
    fn test_duplicate_overload_rejected() {
        let err = analyze(&[
            op(vec![arg("a", "long"), opt("b", "long")]),
            op(vec![arg("a", "long")]),
        ])
        .unwrap_err();
        assert!(matches!(err, GeneratorError::DuplicateOverload { .. }));
    }

    #[test]
    fn test_divergent_return_types() {
        let mut second = op(vec![arg("a", "long")]);
        second.typ = IdlType::new("long");
        let err = analyze(&[op(vec![]), second]).unwrap_err();
        assert!(matches!(err, GeneratorError::DivergentReturnTypes { ref types, .. } if types.len() == 2));
    }

    #[test]
    fn test_empty_group() {
        let err = analyze(&[]).unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyOverloadSet { .. }));
    }

    #[test]
    fn test_dart_name_attribute() {
        let mut renamed = op(vec![]);
        renamed
            .ext_attrs
            .insert("DartName".to_string(), Some("g".to_string()));
        let info = analyze(&[renamed]).unwrap();
        assert_eq!(info.declared_name, "f");
        assert_eq!(info.name, "g");
        assert!(info.is_void());
        assert!(!info.has_overloads());
    }

    #[test]
    fn test_constructor_analysis() {
        let db = Database::new();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let mut interface = Interface::new("Circle");
        interface.constructors.push(Constructor::default());
        interface.constructors.push(Constructor {
            arguments: vec![arg("radius", "double")],
            ext_attrs: ExtAttrs::new(),
        });

        let info = analyze_constructor(&interface, &types).unwrap().unwrap();
        assert!(info.is_constructor);
        assert_eq!(info.name, "Circle");
        assert_eq!(info.overloads.len(), 2);
        assert!(info.params[0].is_optional);

        assert!(analyze_constructor(&Interface::new("Shape"), &types)
            .unwrap()
            .is_none());
    }
}
