//! Dart rendering helpers shared by the systems.

use std::path::Path;

use crate::analysis::{Dispatch, OperationInfo, Overload};
use crate::diagnostic::GeneratorError;
use crate::idl::{is_collection_type, sequence_item_type, Interface};
use super::{Context, OutputSink, SystemKind};

/// Statement closing a dispatch tree that may fall through.
pub const THROW_ARGUMENT_ERROR: &str =
    "throw new ArgumentError(\"Incorrect number or type of arguments\");";

/// Renders a dispatch tree as nested `if` statements.
///
/// `call(overload, indent)` renders the statement(s) forwarding to one
/// overload, already indented by `indent`.
pub fn render_dispatch(
    tree: &Dispatch,
    indent: usize,
    call: &mut dyn FnMut(usize, &str) -> String,
) -> String {
    let mut out = String::new();
    render_node(tree, indent, call, &mut out);
    if tree.may_fall_through() {
        out.push_str(&format!("{}{}\n", pad(indent), THROW_ARGUMENT_ERROR));
    }
    out
}

fn render_node(
    tree: &Dispatch,
    indent: usize,
    call: &mut dyn FnMut(usize, &str) -> String,
    out: &mut String,
) {
    let prefix = pad(indent);
    match tree {
        Dispatch::Call { overload } => out.push_str(&call(*overload, &prefix)),
        Dispatch::Guard { check, then } => {
            out.push_str(&format!("{}if ({}) {{\n", prefix, check.to_dart()));
            render_node(then, indent + 1, call, out);
            out.push_str(&format!("{}}}\n", prefix));
        }
        Dispatch::Branch {
            check,
            then,
            otherwise,
        } => {
            out.push_str(&format!("{}if ({}) {{\n", prefix, check.to_dart()));
            render_node(then, indent + 1, call, out);
            out.push_str(&format!("{}}} else {{\n", prefix));
            render_node(otherwise, indent + 1, call, out);
            out.push_str(&format!("{}}}\n", prefix));
        }
    }
}

/// Two spaces per level.
pub(crate) fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

/// Renders the declaration of an operation, e.g. `int add(int a, [int b])`.
pub(crate) fn operation_signature(info: &OperationInfo) -> String {
    let modifier = if info.is_static { "static " } else { "" };
    format!(
        "{}{} {}({})",
        modifier,
        info.return_dart_type,
        info.name,
        info.parameters_as_declaration()
    )
}

/// `return ` for value-returning operations.
pub(crate) fn return_prefix(info: &OperationInfo) -> &'static str {
    if info.is_void() {
        ""
    } else {
        "return "
    }
}

/// Parameter list of one concrete overload, using the unified names.
pub(crate) fn overload_declaration(ctx: &Context, info: &OperationInfo, overload: &Overload) -> String {
    overload
        .arguments
        .iter()
        .zip(&info.params)
        .map(|(arg, param)| format!("{} {}", ctx.types.dart_type(&arg.typ.id), param.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A `/** .. */` block for an optional doc string.
pub(crate) fn doc_comment(doc: Option<&str>, indent: usize) -> String {
    let Some(doc) = doc.map(str::trim).filter(|d| !d.is_empty()) else {
        return String::new();
    };
    let prefix = pad(indent);
    let mut out = format!("{}/**\n", prefix);
    for line in doc.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(&format!("{} *\n", prefix));
        } else {
            out.push_str(&format!("{} * {}\n", prefix, line));
        }
    }
    out.push_str(&format!("{} */\n", prefix));
    out
}

/// The Dart supertypes of a generated class.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Supertypes {
    /// Dart name of the primary parent, after `super_map`.
    pub primary: Option<String>,
    /// Every Dart type the class implements, primary parent first.
    pub implements: Vec<String>,
    /// Parents outside the source filter, rendered as comments.
    pub suppressed: Vec<String>,
}

impl Supertypes {
    /// ` implements A, B /* implements lib.C */`, or empty.
    pub fn implements_clause(&self) -> String {
        let mut out = String::new();
        if !self.implements.is_empty() {
            out.push_str(" implements ");
            out.push_str(&self.implements.join(", "));
        }
        for name in &self.suppressed {
            out.push_str(&format!(" /* implements {} */", name));
        }
        out
    }
}

pub(crate) fn supertypes(ctx: &Context, interface: &Interface) -> Supertypes {
    let mut result = Supertypes::default();
    let filter = &ctx.config.source_filter;

    for (i, parent) in interface.parents.iter().enumerate() {
        let id = parent.id();
        if let Some(item) = sequence_item_type(id) {
            result.implements.push(format!("List<{}>", ctx.types.dart_type(item)));
            continue;
        }
        if is_collection_type(id) {
            continue;
        }

        let mut name = ctx.types.dart_name(id);
        if i == 0 {
            if let Some(mapped) = ctx.config.super_map.get(&interface.id) {
                name = mapped.clone();
            }
        }

        let in_scope = parent.matches_source_filter(filter)
            || ctx
                .database
                .get_interface(id)
                .is_some_and(|p| p.matches_source_filter(filter));
        if !in_scope {
            match &ctx.config.common_prefix {
                Some(prefix) => result.suppressed.push(format!("{}.{}", prefix, name)),
                None => {
                    tracing::debug!(interface = %interface.id, parent = %id, "dropping out-of-scope parent");
                }
            }
            continue;
        }

        if i == 0 {
            result.primary = Some(name.clone());
        }
        if !result.implements.contains(&name) {
            result.implements.push(name);
        }
    }
    result
}

/// Path of `target` as seen from the directory of `manifest`, with forward
/// slashes.
pub(crate) fn relative_part(manifest: &str, target: &Path) -> String {
    let base = Path::new(manifest).parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());
    relative.to_string_lossy().replace('\\', "/")
}

/// Renders and writes a library manifest listing `parts`.
pub(crate) fn write_library(
    ctx: &Context,
    sink: &mut OutputSink,
    system: SystemKind,
    manifest: &str,
    imports: &[String],
    parts: &[String],
) -> Result<(), GeneratorError> {
    let imports: String = imports.iter().map(|i| format!("import '{}';\n", i)).collect();
    let parts: String = parts
        .iter()
        .map(|p| format!("part '{}';\n", relative_part(manifest, Path::new(p))))
        .collect();
    let text = ctx.templates.render(
        "library.template",
        &[
            ("LIBRARY", ctx.config.library_name.as_str()),
            ("IMPORTS", imports.as_str()),
            ("PARTS", parts.as_str()),
        ],
    )?;
    sink.write_library(system, manifest, text)
}

/// Paths of every interface declaration, generated or auxiliary, as written
/// to the output tree. Auxiliary files keep their own location.
pub(crate) fn interface_parts(ctx: &Context, sink: &OutputSink) -> Vec<String> {
    let mut parts: Vec<String> = sink
        .sources_for(SystemKind::Interface)
        .into_iter()
        .map(str::to_string)
        .collect();
    let out_dir = &ctx.config.out_dir;
    for path in ctx.auxiliary.values() {
        let part = pathdiff::diff_paths(path, out_dir).unwrap_or_else(|| path.clone());
        parts.push(part.to_string_lossy().replace('\\', "/"));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Check;

    fn call(overload: usize, prefix: &str) -> String {
        format!("{}return _f_{}();\n", prefix, overload + 1)
    }

    #[test]
    fn test_render_single_call() {
        let out = render_dispatch(&Dispatch::Call { overload: 0 }, 2, &mut call);
        assert_eq!(out, "    return _f_1();\n");
    }

    #[test]
    fn test_render_branch() {
        let tree = Dispatch::Branch {
            check: Check::Type {
                position: 0,
                param: "a".to_string(),
                dart_type: "int".to_string(),
            },
            then: Box::new(Dispatch::Call { overload: 0 }),
            otherwise: Box::new(Dispatch::Call { overload: 1 }),
        };
        let out = render_dispatch(&tree, 1, &mut call);
        assert_eq!(
            out,
            "  if (a is int) {\n    return _f_1();\n  } else {\n    return _f_2();\n  }\n"
        );
    }

    #[test]
    fn test_render_guard_throws() {
        let tree = Dispatch::Guard {
            check: Check::Null {
                position: 1,
                param: "b".to_string(),
            },
            then: Box::new(Dispatch::Call { overload: 0 }),
        };
        let out = render_dispatch(&tree, 0, &mut call);
        assert_eq!(
            out,
            format!("if (b == null) {{\n  return _f_1();\n}}\n{}\n", THROW_ARGUMENT_ERROR)
        );
    }

    #[test]
    fn test_relative_part() {
        assert_eq!(
            relative_part("wrapping/html_wrapping.dart", Path::new("interface/Node.dart")),
            "../interface/Node.dart"
        );
        assert_eq!(
            relative_part("interface/html.dart", Path::new("interface/Node.dart")),
            "Node.dart"
        );
    }

    #[test]
    fn test_doc_comment() {
        assert_eq!(doc_comment(None, 0), "");
        assert_eq!(
            doc_comment(Some("The node.\n\nMore."), 1),
            "  /**\n   * The node.\n   *\n   * More.\n   */\n"
        );
    }
}
