//! Overload dispatch trees.
//!
//! A dispatch tree selects one concrete overload of an [`OperationInfo`] from
//! the runtime values of the unified parameters. The tree is built position
//! by position: at each slot the candidates are partitioned by the type the
//! first remaining overload expects there. Branch order is therefore a pure
//! function of declaration order.

use crate::diagnostic::GeneratorError;
use crate::types::{is_checkable_type, TypeRegistry};
use super::operation::OperationInfo;

/// A runtime test on one parameter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// `param is T`
    Type {
        position: usize,
        param: String,
        dart_type: String,
    },
    /// `param != null`, used when the expected type admits every value.
    Present { position: usize, param: String },
    /// `param == null`, the caller did not reach this slot.
    Null { position: usize, param: String },
}

impl Check {
    pub fn position(&self) -> usize {
        match self {
            Check::Type { position, .. }
            | Check::Present { position, .. }
            | Check::Null { position, .. } => *position,
        }
    }

    pub fn param(&self) -> &str {
        match self {
            Check::Type { param, .. } | Check::Present { param, .. } | Check::Null { param, .. } => {
                param
            }
        }
    }

    /// Evaluates the check against runtime Dart type names (`None` = null).
    pub fn matches(&self, args: &[Option<&str>]) -> bool {
        let value = args.get(self.position()).copied().flatten();
        match self {
            Check::Type { dart_type, .. } => value == Some(dart_type.as_str()),
            Check::Present { .. } => value.is_some(),
            Check::Null { .. } => value.is_none(),
        }
    }

    /// The Dart condition expression.
    pub fn to_dart(&self) -> String {
        match self {
            Check::Type { param, dart_type, .. } => format!("{} is {}", param, dart_type),
            Check::Present { param, .. } => format!("{} != null", param),
            Check::Null { param, .. } => format!("{} == null", param),
        }
    }
}

/// A decision tree over the overloads of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Forward to overload `overload` (index into `OperationInfo::overloads`).
    Call { overload: usize },
    /// Exhaustive two-way test.
    Branch {
        check: Check,
        then: Box<Dispatch>,
        otherwise: Box<Dispatch>,
    },
    /// Narrowing test without an else arm; control may fall through.
    Guard { check: Check, then: Box<Dispatch> },
}

impl Dispatch {
    /// True if some inputs reach the end of the tree without a call.
    pub fn may_fall_through(&self) -> bool {
        match self {
            Dispatch::Call { .. } => false,
            Dispatch::Branch { then, otherwise, .. } => {
                then.may_fall_through() || otherwise.may_fall_through()
            }
            Dispatch::Guard { .. } => true,
        }
    }

    /// Selects the overload the generated code would call for `args`.
    pub fn select(&self, args: &[Option<&str>]) -> Option<usize> {
        match self {
            Dispatch::Call { overload } => Some(*overload),
            Dispatch::Branch {
                check,
                then,
                otherwise,
            } => {
                if check.matches(args) {
                    then.select(args)
                } else {
                    otherwise.select(args)
                }
            }
            Dispatch::Guard { check, then } => {
                if check.matches(args) {
                    then.select(args)
                } else {
                    None
                }
            }
        }
    }

    /// Indices of every overload reachable from this tree, in tree order.
    pub fn calls(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls(&self, out: &mut Vec<usize>) {
        match self {
            Dispatch::Call { overload } => out.push(*overload),
            Dispatch::Branch { then, otherwise, .. } => {
                then.collect_calls(out);
                otherwise.collect_calls(out);
            }
            Dispatch::Guard { then, .. } => then.collect_calls(out),
        }
    }
}

struct Candidate {
    index: usize,
    /// Dart type per argument position.
    slots: Vec<String>,
}

impl Candidate {
    /// Partition key at `position`; types every value satisfies share one key.
    fn key(&self, position: usize) -> Option<&str> {
        self.slots.get(position).map(|t| slot_key(t))
    }
}

fn slot_key(dart_type: &str) -> &str {
    if is_checkable_type(dart_type) {
        dart_type
    } else {
        "dynamic"
    }
}

/// Builds the dispatch tree for `info`.
pub fn build_dispatch(info: &OperationInfo, types: &TypeRegistry) -> Result<Dispatch, GeneratorError> {
    let candidates: Vec<Candidate> = info
        .overloads
        .iter()
        .enumerate()
        .map(|(index, overload)| Candidate {
            index,
            slots: overload
                .arguments
                .iter()
                .map(|arg| types.dart_type(&arg.typ.id))
                .collect(),
        })
        .collect();
    let refs: Vec<&Candidate> = candidates.iter().collect();
    dispatch_at(info, 0, refs)
}

fn dispatch_at(
    info: &OperationInfo,
    position: usize,
    candidates: Vec<&Candidate>,
) -> Result<Dispatch, GeneratorError> {
    let Some(first) = candidates.first() else {
        return Err(GeneratorError::EmptyOverloadSet {
            interface: info.interface.clone(),
            operation: info.declared_name.clone(),
        });
    };
    if candidates.len() == 1 {
        return Ok(Dispatch::Call {
            overload: first.index,
        });
    }
    let Some(param) = info.params.get(position) else {
        return Err(GeneratorError::DuplicateOverload {
            interface: info.interface.clone(),
            operation: info.declared_name.clone(),
        });
    };

    // The first remaining overload drives the test. If its slot admits every
    // value, the first overload with a testable type there takes over.
    let driver = match first.slots.get(position) {
        Some(t) if !is_checkable_type(t) => candidates
            .iter()
            .find(|c| c.slots.get(position).is_some_and(|t| is_checkable_type(t)))
            .unwrap_or(first),
        _ => first,
    };
    let expected = driver.key(position).map(str::to_string);
    let check = match driver.slots.get(position) {
        Some(t) if is_checkable_type(t) => Check::Type {
            position,
            param: param.name.clone(),
            dart_type: t.clone(),
        },
        Some(_) => Check::Present {
            position,
            param: param.name.clone(),
        },
        None => Check::Null {
            position,
            param: param.name.clone(),
        },
    };

    let (positive, negative): (Vec<&Candidate>, Vec<&Candidate>) = candidates
        .into_iter()
        .partition(|c| c.key(position) == expected.as_deref());

    if !negative.is_empty() {
        return Ok(Dispatch::Branch {
            check,
            then: Box::new(dispatch_at(info, position + 1, positive)?),
            otherwise: Box::new(dispatch_at(info, position, negative)?),
        });
    }

    // Every candidate needs the same test. Skip it when the declared Dart
    // type of the slot already implies it.
    if expected.as_deref() == Some(slot_key(&param.dart_type)) {
        return dispatch_at(info, position + 1, positive);
    }

    Ok(Dispatch::Guard {
        check,
        then: Box::new(dispatch_at(info, position + 1, positive)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::operation::analyze_operation;
    use crate::idl::{Argument, Database, IdlType, Interface, Operation};
    use std::collections::BTreeMap;

    fn op(args: &[(&str, &str)]) -> Operation {
        Operation::new(
            "f",
            IdlType::new("void"),
            args.iter()
                .map(|(id, ty)| Argument::new(*id, IdlType::new(*ty)))
                .collect(),
        )
    }

    fn build(ops: &[Operation]) -> (OperationInfo, Result<Dispatch, GeneratorError>) {
        let mut db = Database::new();
        db.add_interface(Interface::new("Node")).unwrap();
        db.add_interface(Interface::new("Element")).unwrap();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let refs: Vec<&Operation> = ops.iter().collect();
        let info = analyze_operation(&Interface::new("Test"), &refs, &types).unwrap();
        let tree = build_dispatch(&info, &types);
        (info, tree)
    }

    fn args_for<'a>(info: &'a OperationInfo, overload: usize, types: &'a [String]) -> Vec<Option<&'a str>> {
        (0..info.params.len())
            .map(|i| {
                if i < info.overloads[overload].arity() {
                    Some(types[i].as_str())
                } else {
                    None
                }
            })
            .collect()
    }

    #[test]
    fn test_single_overload_is_a_call() {
        let (_, tree) = build(&[op(&[("x", "long")])]);
        let tree = tree.unwrap();
        assert_eq!(tree, Dispatch::Call { overload: 0 });
        assert!(!tree.may_fall_through());
    }

    #[test]
    fn test_type_branch_follows_declaration_order() {
        let (_, tree) = build(&[op(&[("x", "long")]), op(&[("x", "Node")])]);
        let tree = tree.unwrap();
        match &tree {
            Dispatch::Branch { check, then, otherwise } => {
                assert_eq!(check.to_dart(), "x is int");
                assert_eq!(**then, Dispatch::Call { overload: 0 });
                assert_eq!(**otherwise, Dispatch::Call { overload: 1 });
            }
            other => panic!("expected branch, got {other:?}"),
        }
        assert!(!tree.may_fall_through());

        let (_, reversed) = build(&[op(&[("x", "Node")]), op(&[("x", "long")])]);
        match reversed.unwrap() {
            Dispatch::Branch { check, .. } => assert_eq!(check.to_dart(), "x is Node"),
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn test_arity_uses_null_check() {
        let (_, tree) = build(&[op(&[("x", "long")]), op(&[("x", "long"), ("y", "DOMString")])]);
        match tree.unwrap() {
            Dispatch::Branch { check, .. } => {
                assert_eq!(check, Check::Null { position: 1, param: "y".to_string() });
                assert_eq!(check.to_dart(), "y == null");
            }
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_type_implied_by_slot_is_skipped() {
        let (info, tree) = build(&[
            op(&[("a", "Node"), ("b", "long")]),
            op(&[("a", "Node"), ("b", "DOMString")]),
        ]);
        assert_eq!(info.params[0].dart_type, "Node");
        let tree = tree.unwrap();
        match &tree {
            Dispatch::Branch { check, .. } => assert_eq!(check.to_dart(), "b is int"),
            other => panic!("expected branch, got {other:?}"),
        }
        assert!(!tree.may_fall_through());
    }

    #[test]
    fn test_narrowing_guard_may_fall_through() {
        let (info, tree) = build(&[
            op(&[("a", "long"), ("b", "Node")]),
            op(&[("a", "long"), ("b", "Node"), ("c", "long")]),
            op(&[("a", "DOMString"), ("b", "long")]),
        ]);
        assert_eq!(info.params[1].dart_type, "dynamic");
        let tree = tree.unwrap();

        let Dispatch::Branch { then, otherwise, .. } = &tree else {
            panic!("expected branch, got {tree:?}");
        };
        assert_eq!(**otherwise, Dispatch::Call { overload: 2 });
        match &**then {
            Dispatch::Guard { check, then } => {
                assert_eq!(check.to_dart(), "b is Node");
                assert!(matches!(**then, Dispatch::Branch { check: Check::Null { position: 2, .. }, .. }));
            }
            other => panic!("expected guard, got {other:?}"),
        }
        assert!(tree.may_fall_through());
        assert_eq!(tree.select(&[Some("int"), Some("int"), None]), None);
    }

    #[test]
    fn test_untestable_slot_uses_presence_check() {
        let (_, tree) = build(&[op(&[("a", "any")]), op(&[])]);
        match tree.unwrap() {
            Dispatch::Branch { check, .. } => assert_eq!(check.to_dart(), "a != null"),
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_at_dart_level_rejected() {
        let (_, tree) = build(&[op(&[("x", "long")]), op(&[("x", "short")])]);
        assert!(matches!(tree, Err(GeneratorError::DuplicateOverload { .. })));
    }

    #[test]
    fn test_empty_overload_set_rejected() {
        let (mut info, _) = build(&[op(&[])]);
        info.overloads.clear();
        let db = Database::new();
        let types = TypeRegistry::new(&db, BTreeMap::new());
        let err = build_dispatch(&info, &types).unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyOverloadSet { .. }));
    }

    #[test]
    fn test_every_overload_is_selected_by_its_own_arguments() {
        let mut db = Database::new();
        db.add_interface(Interface::new("Node")).unwrap();
        let types = TypeRegistry::new(&db, BTreeMap::new());

        let ops = vec![
            op(&[("a", "Node"), ("b", "long")]),
            op(&[("a", "Node"), ("b", "DOMString"), ("c", "boolean")]),
            op(&[("a", "long")]),
            op(&[("a", "DOMString"), ("b", "Node")]),
            op(&[]),
            op(&[("a", "Node")]),
        ];
        let refs: Vec<&Operation> = ops.iter().collect();
        let info = analyze_operation(&Interface::new("Test"), &refs, &types).unwrap();
        let tree = build_dispatch(&info, &types).unwrap();

        for (k, overload) in info.overloads.iter().enumerate() {
            let dart_types: Vec<String> = overload
                .arguments
                .iter()
                .map(|a| types.dart_type(&a.typ.id))
                .collect();
            let args = args_for(&info, k, &dart_types);
            assert_eq!(tree.select(&args), Some(k), "overload {k} with {args:?}");
        }

        let mut calls = tree.calls();
        calls.sort_unstable();
        assert_eq!(calls, (0..info.overloads.len()).collect::<Vec<_>>());
    }
}
