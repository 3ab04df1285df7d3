//! JS system: Dart classes bound directly to JavaScript DOM objects.

use crate::analysis::{AttributePair, Dispatch, OperationInfo, Overload};
use crate::diagnostic::GeneratorError;
use crate::idl::Interface;
use super::dart::{self, overload_declaration, render_dispatch, return_prefix};
use super::{Context, OutputSink, System, SystemKind};

const BASE_CLASS: &str = "_DOMTypeJs";

struct ClassBuffer {
    id: String,
    name: String,
    base: String,
    members: String,
}

pub struct JsSystem {
    current: Option<ClassBuffer>,
}

impl JsSystem {
    pub fn new() -> Self {
        Self { current: None }
    }

    fn push(&mut self, text: &str) {
        if let Some(buffer) = self.current.as_mut() {
            buffer.members.push_str(text);
        }
    }
}

fn render_attribute(ctx: &Context, pair: &AttributePair) -> String {
    let name = pair.id();
    match (pair.getter, pair.setter) {
        (Some(getter), Some(_)) if pair.is_field() => {
            format!("\n  {} {};\n", ctx.types.dart_type(&getter.typ.id), name)
        }
        (getter, setter) => {
            let mut out = String::new();
            if let Some(getter) = getter {
                out.push_str(&format!("\n  final {} {};\n", ctx.types.dart_type(&getter.typ.id), name));
            }
            if let Some(setter) = setter {
                out.push_str(&format!(
                    "\n  void set {n}({t} value) native \"this.{n} = value;\";\n",
                    n = name,
                    t = ctx.types.dart_type(&setter.typ.id)
                ));
            }
            out
        }
    }
}

fn render_operation(ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) -> String {
    if !info.has_overloads() {
        return format!("\n  {} native;\n", dart::operation_signature(info));
    }

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
    let mut out = format!("\n  {} {{\n", dart::operation_signature(info));
    out.push_str(&render_dispatch(dispatch, 2, &mut call));
    out.push_str("  }\n");

    for (i, overload) in info.overloads.iter().enumerate() {
        out.push_str(&format!(
            "  @JSName('{}')\n  {} {}({}) native;\n",
            info.declared_name,
            info.return_dart_type,
            private(i + 1),
            overload_declaration(ctx, info, overload)
        ));
    }
    out
}

impl System for JsSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Js
    }

    fn begin_interface(&mut self, ctx: &Context, interface: &Interface) -> Result<(), GeneratorError> {
        let base = dart::supertypes(ctx, interface)
            .primary
            .map(|parent| format!("_{}Js", parent))
            .unwrap_or_else(|| BASE_CLASS.to_string());
        self.current = Some(ClassBuffer {
            id: interface.id.clone(),
            name: ctx.types.interface_name(interface),
            base,
            members: String::new(),
        });
        Ok(())
    }

    fn add_attribute(&mut self, ctx: &Context, pair: &AttributePair) {
        self.push(&render_attribute(ctx, pair));
    }

    fn add_indexer(&mut self, ctx: &Context, item_type: &str) {
        let dart_type = ctx.types.dart_type(item_type);
        self.push(&format!(
            "\n  {t} operator [](int index) native \"return this[index];\";\n\n  void operator []=(int index, {t} value) native \"this[index] = value\";\n",
            t = dart_type
        ));
    }

    fn add_operation(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
        // JS interop binds instance members only.
        if info.is_static {
            return;
        }
        self.push(&render_operation(ctx, info, dispatch));
    }

    fn add_secondary_attribute(&mut self, ctx: &Context, _parent: &Interface, pair: &AttributePair) {
        self.push(&render_attribute(ctx, pair));
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
        let class_name = format!("_{}Js", buffer.name);
        let text = ctx.templates.render_for(
            SystemKind::Js.name(),
            &buffer.id,
            "js.template",
            &[
                ("LIBRARY", ctx.config.library_name.as_str()),
                ("CLASS", class_name.as_str()),
                ("BASE", buffer.base.as_str()),
                ("NAME", buffer.name.as_str()),
                ("ID", buffer.id.as_str()),
                ("MEMBERS", buffer.members.as_str()),
            ],
        )?;
        sink.write(SystemKind::Js, format!("js/{}.dart", class_name), text)
    }

    fn generate_libraries(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let mut parts = dart::interface_parts(ctx, sink);
        parts.extend(sink.sources_for(SystemKind::Js).into_iter().map(str::to_string));
        let manifest = format!("js/{}_js.dart", ctx.config.library_name);
        dart::write_library(ctx, sink, SystemKind::Js, &manifest, &[], &parts)
    }
}
