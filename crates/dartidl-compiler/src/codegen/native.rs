//! Native system: Dart classes bound to C++ glue.
//!
//! Every native member is a Dart declaration with a `native "Binding"`
//! clause. The runtime looks the binding up by exact `(name, argc)` pair
//! through the resolver functions generated here, so binding names,
//! argument counts and callback symbols must agree across the Dart and C++
//! outputs:
//!
//! | Member | Binding | argc |
//! |--------|---------|------|
//! | getter | `<Iface>_<attr>_Getter` | 1 |
//! | setter | `<Iface>_<attr>_Setter` | 2 |
//! | operation | `<Iface>_<op>_Callback` | arguments + receiver |
//! | overload `n` | `<Iface>_<op>_<n>_Callback` | arguments + receiver |
//! | constructor | `<Iface>_constructor_Callback`, `<Iface>_constructor_<n>_Callback` | arguments |
//!
//! Static operations and constructors have no receiver.

use std::collections::BTreeSet;

use crate::analysis::{AttributePair, Dispatch, OperationInfo, Overload};
use crate::diagnostic::GeneratorError;
use crate::idl::Interface;
use crate::types::{TypeInfo, TypeKind};
use super::dart::{self, overload_declaration, render_dispatch, return_prefix};
use super::{Context, OutputSink, System, SystemKind};

const BASE_CLASS: &str = "NativeFieldWrapperClass1";

/// One resolver row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverEntry {
    pub binding: String,
    pub argc: usize,
    /// Fully qualified C++ callback symbol.
    pub symbol: String,
}

/// Maps `(binding, argc)` to native callback symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverTable {
    entries: Vec<ResolverEntry>,
}

impl ResolverTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, binding: impl Into<String>, argc: usize, symbol: impl Into<String>) {
        self.entries.push(ResolverEntry {
            binding: binding.into(),
            argc,
            symbol: symbol.into(),
        });
    }

    pub fn entries(&self) -> &[ResolverEntry] {
        &self.entries
    }

    /// Exact lookup; the first matching row wins.
    pub fn resolve(&self, binding: &str, argc: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.argc == argc && entry.binding == binding)
            .map(|entry| entry.symbol.as_str())
    }

    /// Renders the table as a C++ resolver function named `function`.
    pub fn render(&self, function: &str) -> String {
        let mut out = format!(
            "Dart_NativeFunction {}(Dart_Handle nameHandle, int argumentCount)\n{{\n",
            function
        );
        out.push_str("    String name = DartUtilities::dartStringToString(nameHandle);\n\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "    if (argumentCount == {} && name == \"{}\")\n        return {};\n",
                entry.argc, entry.binding, entry.symbol
            ));
        }
        out.push_str("    return 0;\n}\n");
        out
    }
}

/// One C++ callback to generate.
struct NativeCall<'a> {
    symbol: String,
    binding: String,
    receiver: bool,
    /// IDL type ids of the Dart-side arguments, receiver excluded.
    arguments: Vec<&'a str>,
    return_type: &'a str,
    /// Callee, e.g. `receiver->item` or `Node::create`.
    callee: String,
    raises: bool,
}

impl NativeCall<'_> {
    fn argc(&self) -> usize {
        self.arguments.len() + usize::from(self.receiver)
    }
}

fn holds_ref(info: &TypeInfo) -> bool {
    matches!(
        info.kind(),
        TypeKind::Interface | TypeKind::Callback | TypeKind::TearOff | TypeKind::ListLike | TypeKind::TypedList
    )
}

fn native_local(info: &TypeInfo) -> String {
    if holds_ref(info) {
        format!("RefPtr<{}>", info.native_type())
    } else {
        info.native_type().to_string()
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct NativeBuffer {
    id: String,
    name: String,
    base: String,
    members: String,
    factory: String,
    declarations: String,
    callbacks: String,
    includes: BTreeSet<String>,
    table: ResolverTable,
}

impl NativeBuffer {
    fn class_name(&self) -> String {
        format!("_{}Impl", self.name)
    }

    fn include(&mut self, info: &TypeInfo) {
        if (holds_ref(info) || info.kind() == TypeKind::Dictionary) && info.idl_type() != self.id {
            self.includes.insert(format!("#include \"Dart{}.h\"\n", info.idl_type()));
        }
    }

    fn add_callback(&mut self, ctx: &Context, call: NativeCall) {
        let mut body = String::new();
        let mut needs_fail = call.raises;

        if call.receiver {
            body.push_str(&format!(
                "        {id}* receiver = DartDOMWrapper::receiver<{id}>(args);\n",
                id = self.id
            ));
        }
        let mut locals = Vec::with_capacity(call.arguments.len());
        for (i, type_id) in call.arguments.iter().enumerate() {
            let info = ctx.types.type_info(type_id);
            self.include(&info);
            let index = i + usize::from(call.receiver);
            body.push_str(&format!(
                "        {} arg{} = {};\n",
                native_local(&info),
                i,
                info.to_native(index)
            ));
            locals.push(if holds_ref(&info) {
                format!("arg{}.get()", i)
            } else {
                format!("arg{}", i)
            });
        }
        if !call.arguments.is_empty() {
            body.push_str("        if (exception)\n            goto fail;\n");
            needs_fail = true;
        }
        if call.raises {
            body.push_str("        ExceptionCode ec = 0;\n");
            locals.push("ec".to_string());
        }

        let invocation = format!("{}({})", call.callee, locals.join(", "));
        let return_info = ctx.types.type_info(call.return_type);
        if return_info.is_void() {
            body.push_str(&format!("        {};\n", invocation));
        } else {
            self.include(&return_info);
            body.push_str(&format!(
                "        {} result = {};\n",
                native_local(&return_info),
                invocation
            ));
        }
        if call.raises {
            body.push_str(
                "        if (ec) {\n            exception = DartDOMWrapper::exceptionCodeToDartException(ec);\n            goto fail;\n        }\n",
            );
        }
        if !return_info.is_void() {
            body.push_str(&format!(
                "        Dart_SetReturnValue(args, {});\n",
                return_info.to_dart(if holds_ref(&return_info) { "result.get()" } else { "result" })
            ));
        }
        body.push_str("        return;\n");

        let mut text = format!(
            "\nvoid {}(Dart_NativeArguments args)\n{{\n    DartApiScope dartApiScope;\n",
            call.symbol
        );
        if needs_fail {
            text.push_str("    Dart_Handle exception = 0;\n");
        }
        text.push_str("    {\n");
        text.push_str(&body);
        text.push_str("    }\n");
        if needs_fail {
            text.push_str("\nfail:\n    Dart_ThrowException(exception);\n    ASSERT_NOT_REACHED();\n");
        }
        text.push_str("}\n");

        self.callbacks.push_str(&text);
        self.declarations
            .push_str(&format!("void {}(Dart_NativeArguments);\n", call.symbol));
        let argc = call.argc();
        self.table.add(
            call.binding,
            argc,
            format!("Dart{}Internal::{}", self.id, call.symbol),
        );
    }

    fn add_attribute(&mut self, ctx: &Context, pair: &AttributePair) {
        let name = pair.id();
        if let Some(getter) = pair.getter {
            let dart_type = ctx.types.dart_type(&getter.typ.id);
            let binding = format!("{}_{}_Getter", self.id, name);
            self.members.push_str(&format!(
                "\n  {} get {} native \"{}\";\n",
                dart_type, name, binding
            ));
            self.add_callback(
                ctx,
                NativeCall {
                    symbol: format!("{}Getter", name),
                    binding,
                    receiver: true,
                    arguments: Vec::new(),
                    return_type: &getter.typ.id,
                    callee: format!("receiver->{}", name),
                    raises: false,
                },
            );
        }
        if let Some(setter) = pair.setter {
            let dart_type = ctx.types.dart_type(&setter.typ.id);
            let binding = format!("{}_{}_Setter", self.id, name);
            self.members.push_str(&format!(
                "\n  void set {}({} value) native \"{}\";\n",
                name, dart_type, binding
            ));
            self.add_callback(
                ctx,
                NativeCall {
                    symbol: format!("{}Setter", name),
                    binding,
                    receiver: true,
                    arguments: vec![setter.typ.id.as_str()],
                    return_type: "void",
                    callee: format!("receiver->set{}", capitalize(name)),
                    raises: false,
                },
            );
        }
    }

    fn add_operation(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
        let receiver = !info.is_static;
        let callee = if receiver {
            format!("receiver->{}", info.declared_name)
        } else {
            format!("{}::{}", self.id, info.declared_name)
        };

        if !info.has_overloads() {
            let binding = format!("{}_{}_Callback", self.id, info.declared_name);
            self.members.push_str(&format!(
                "\n  {} native \"{}\";\n",
                dart::operation_signature(info),
                binding
            ));
            let arguments = info
                .overloads
                .first()
                .map(Overload::type_ids)
                .unwrap_or_default();
            self.add_callback(
                ctx,
                NativeCall {
                    symbol: format!("{}Callback", info.declared_name),
                    binding,
                    receiver,
                    arguments,
                    return_type: &info.return_type,
                    callee,
                    raises: info.raises_exception,
                },
            );
            return;
        }

        let modifier = if info.is_static { "static " } else { "" };
        let private = |n: usize| format!("_{}_{}", info.name, n);
        let mut call = |index: usize, prefix: &str| -> String {
            let arity = info.overloads.get(index).map(Overload::arity).unwrap_or(0);
            format!(
                "{}{}{}({});\n",
                prefix,
                return_prefix(info),
                private(index + 1),
                info.parameters_as_arguments(arity)
            )
        };
        let mut text = format!("\n  {} {{\n", dart::operation_signature(info));
        text.push_str(&render_dispatch(dispatch, 2, &mut call));
        text.push_str("  }\n");
        self.members.push_str(&text);

        for (i, overload) in info.overloads.iter().enumerate() {
            let n = i + 1;
            let binding = format!("{}_{}_{}_Callback", self.id, info.declared_name, n);
            self.members.push_str(&format!(
                "\n  {}{} {}({}) native \"{}\";\n",
                modifier,
                info.return_dart_type,
                private(n),
                overload_declaration(ctx, info, overload),
                binding
            ));
            self.add_callback(
                ctx,
                NativeCall {
                    symbol: format!("{}_{}Callback", info.declared_name, n),
                    binding,
                    receiver,
                    arguments: overload.type_ids(),
                    return_type: &info.return_type,
                    callee: callee.clone(),
                    raises: info.raises_exception,
                },
            );
        }
    }

    fn add_constructor(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
        let dart_name = info.name.as_str();
        let create = format!("create{}", dart_name);
        let callee = format!("{}::create", self.id);
        let mut text = format!("\nclass _{}FactoryProvider {{\n", dart_name);

        if !info.has_overloads() {
            let binding = format!("{}_constructor_Callback", self.id);
            text.push_str(&format!(
                "  static {} {}({}) native \"{}\";\n",
                dart_name,
                create,
                info.parameters_as_declaration(),
                binding
            ));
            let arguments = info
                .overloads
                .first()
                .map(Overload::type_ids)
                .unwrap_or_default();
            self.add_callback(
                ctx,
                NativeCall {
                    symbol: "constructorCallback".to_string(),
                    binding,
                    receiver: false,
                    arguments,
                    return_type: &info.return_type,
                    callee,
                    raises: info.raises_exception,
                },
            );
        } else {
            let mut call = |index: usize, prefix: &str| -> String {
                let arity = info.overloads.get(index).map(Overload::arity).unwrap_or(0);
                format!(
                    "{}return _{}_{}({});\n",
                    prefix,
                    create,
                    index + 1,
                    info.parameters_as_arguments(arity)
                )
            };
            text.push_str(&format!(
                "  static {} {}({}) {{\n",
                dart_name,
                create,
                info.parameters_as_declaration()
            ));
            text.push_str(&render_dispatch(dispatch, 2, &mut call));
            text.push_str("  }\n");

            for (i, overload) in info.overloads.iter().enumerate() {
                let n = i + 1;
                let binding = format!("{}_constructor_{}_Callback", self.id, n);
                text.push_str(&format!(
                    "\n  static {} _{}_{}({}) native \"{}\";\n",
                    dart_name,
                    create,
                    n,
                    overload_declaration(ctx, info, overload),
                    binding
                ));
                self.add_callback(
                    ctx,
                    NativeCall {
                        symbol: format!("constructor_{}Callback", n),
                        binding,
                        receiver: false,
                        arguments: overload.type_ids(),
                        return_type: &info.return_type,
                        callee: callee.clone(),
                        raises: info.raises_exception,
                    },
                );
            }
        }
        text.push_str("}\n");
        self.factory.push_str(&text);
    }
}

pub struct NativeSystem {
    current: Option<NativeBuffer>,
    /// Interface ids with a generated resolver, in emission order.
    resolvers: Vec<String>,
    cpp_sources: Vec<String>,
}

impl NativeSystem {
    pub fn new() -> Self {
        Self {
            current: None,
            resolvers: Vec::new(),
            cpp_sources: Vec::new(),
        }
    }
}

impl System for NativeSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Native
    }

    fn begin_interface(&mut self, ctx: &Context, interface: &Interface) -> Result<(), GeneratorError> {
        if ctx.types.type_info(&interface.id).is_pure_interface() {
            self.current = None;
            return Ok(());
        }
        let base = dart::supertypes(ctx, interface)
            .primary
            .map(|parent| format!("_{}Impl", parent))
            .unwrap_or_else(|| BASE_CLASS.to_string());
        self.current = Some(NativeBuffer {
            id: interface.id.clone(),
            name: ctx.types.interface_name(interface),
            base,
            members: String::new(),
            factory: String::new(),
            declarations: String::new(),
            callbacks: String::new(),
            includes: BTreeSet::new(),
            table: ResolverTable::new(),
        });
        Ok(())
    }

    fn add_attribute(&mut self, ctx: &Context, pair: &AttributePair) {
        if let Some(buffer) = self.current.as_mut() {
            buffer.add_attribute(ctx, pair);
        }
    }

    fn add_indexer(&mut self, ctx: &Context, item_type: &str) {
        let Some(buffer) = self.current.as_mut() else {
            return;
        };
        let dart_type = ctx.types.dart_type(item_type);
        let binding = format!("{}_numericIndexGetter_Callback", buffer.id);
        buffer.members.push_str(&format!(
            "\n  {t} operator [](int index) native \"{b}\";\n\n  void operator []=(int index, {t} value) {{\n    throw new UnsupportedError(\"Cannot assign element of immutable List.\");\n  }}\n",
            t = dart_type,
            b = binding
        ));
        buffer.add_callback(
            ctx,
            NativeCall {
                symbol: "numericIndexGetterCallback".to_string(),
                binding,
                receiver: true,
                arguments: vec!["unsigned long"],
                return_type: item_type,
                callee: "receiver->item".to_string(),
                raises: false,
            },
        );
    }

    fn add_operation(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
        if let Some(buffer) = self.current.as_mut() {
            buffer.add_operation(ctx, info, dispatch);
        }
    }

    fn add_constructor(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
        if let Some(buffer) = self.current.as_mut() {
            buffer.add_constructor(ctx, info, dispatch);
        }
    }

    fn add_secondary_attribute(&mut self, ctx: &Context, _parent: &Interface, pair: &AttributePair) {
        self.add_attribute(ctx, pair);
    }

    fn add_secondary_operation(
        &mut self,
        ctx: &Context,
        _parent: &Interface,
        info: &OperationInfo,
        dispatch: &Dispatch,
    ) {
        self.add_operation(ctx, info, dispatch);
    }

    fn finish_interface(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let Some(buffer) = self.current.take() else {
            return Ok(());
        };
        let class_name = buffer.class_name();

        let dart = ctx.templates.render_for(
            SystemKind::Native.name(),
            &buffer.id,
            "native.template",
            &[
                ("LIBRARY", ctx.config.library_name.as_str()),
                ("CLASS", class_name.as_str()),
                ("BASE", buffer.base.as_str()),
                ("NAME", buffer.name.as_str()),
                ("MEMBERS", buffer.members.as_str()),
                ("FACTORY", buffer.factory.as_str()),
            ],
        )?;
        sink.write(SystemKind::Native, format!("native/{}.dart", class_name), dart)?;

        let declarations: String = buffer
            .declarations
            .lines()
            .map(|line| format!("    {}\n", line))
            .collect();
        let header = ctx.templates.render(
            "cpp_header.template",
            &[
                ("ID", buffer.id.as_str()),
                ("INCLUDES", ""),
                ("DECLARATIONS", declarations.as_str()),
            ],
        )?;
        sink.write(SystemKind::Native, format!("native/cpp/Dart{}.h", buffer.id), header)?;

        let includes: String = buffer.includes.iter().map(String::as_str).collect();
        let resolver = buffer.table.render(&format!("{}Resolver", buffer.id));
        let implementation = ctx.templates.render(
            "cpp_impl.template",
            &[
                ("ID", buffer.id.as_str()),
                ("INCLUDES", includes.as_str()),
                ("CLASS", class_name.as_str()),
                ("CALLBACKS", buffer.callbacks.as_str()),
                ("RESOLVER", resolver.as_str()),
            ],
        )?;
        let cpp_path = format!("native/cpp/Dart{}.cpp", buffer.id);
        sink.write(SystemKind::Native, cpp_path.clone(), implementation)?;

        tracing::debug!(interface = %buffer.id, bindings = buffer.table.entries().len(), "native glue generated");
        self.resolvers.push(buffer.id);
        self.cpp_sources.push(cpp_path);
        Ok(())
    }

    fn generate_libraries(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let mut parts = dart::interface_parts(ctx, sink);
        parts.extend(
            sink.sources_for(SystemKind::Native)
                .into_iter()
                .filter(|path| path.ends_with(".dart"))
                .map(str::to_string),
        );
        let manifest = format!("native/{}_native.dart", ctx.config.library_name);
        dart::write_library(
            ctx,
            sink,
            SystemKind::Native,
            &manifest,
            &["dart:nativewrappers".to_string()],
            &parts,
        )?;

        let sources: String = self
            .cpp_sources
            .iter()
            .filter_map(|path| path.rsplit('/').next())
            .map(|file| format!("#include \"{}\"\n", file))
            .collect();
        let derived = ctx
            .templates
            .render("cpp_derived_sources.template", &[("INCLUDES", sources.as_str())])?;
        sink.write_library(SystemKind::Native, "native/cpp/DartDerivedSourcesAll.cpp", derived)?;

        let headers: String = self
            .resolvers
            .iter()
            .map(|id| format!("#include \"Dart{}.h\"\n", id))
            .collect();
        let chain: String = self
            .resolvers
            .iter()
            .map(|id| {
                format!(
                    "    if (Dart_NativeFunction func = {}Resolver(name, argumentCount))\n        return func;\n",
                    id
                )
            })
            .collect();
        let resolver = ctx.templates.render(
            "cpp_resolver.template",
            &[("INCLUDES", headers.as_str()), ("RESOLVERS", chain.as_str())],
        )?;
        sink.write_library(SystemKind::Native, "native/cpp/DartResolver.cpp", resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_first_match_wins() {
        let mut table = ResolverTable::new();
        table.add("Node_appendChild_Callback", 2, "DartNodeInternal::appendChildCallback");
        table.add("Node_appendChild_Callback", 2, "DartNodeInternal::shadowed");
        table.add("Node_appendChild_Callback", 3, "DartNodeInternal::wider");

        assert_eq!(
            table.resolve("Node_appendChild_Callback", 2),
            Some("DartNodeInternal::appendChildCallback")
        );
        assert_eq!(
            table.resolve("Node_appendChild_Callback", 3),
            Some("DartNodeInternal::wider")
        );
        assert_eq!(table.resolve("Node_appendChild_Callback", 1), None);
        assert_eq!(table.resolve("Node_removeChild_Callback", 2), None);
    }

    #[test]
    fn test_resolver_render_ends_unresolved() {
        let mut table = ResolverTable::new();
        table.add("Node_parentNode_Getter", 1, "DartNodeInternal::parentNodeGetter");
        let text = table.render("NodeResolver");

        assert!(text.starts_with("Dart_NativeFunction NodeResolver(Dart_Handle nameHandle, int argumentCount)\n"));
        assert!(text.contains(
            "    if (argumentCount == 1 && name == \"Node_parentNode_Getter\")\n        return DartNodeInternal::parentNodeGetter;\n"
        ));
        assert!(text.ends_with("    return 0;\n}\n"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("radius"), "Radius");
        assert_eq!(capitalize(""), "");
    }
}
