//! Wrapping system: Dart classes delegating to a wrapped DOM object.
//!
//! Every member forwards to `_ptr`. Values crossing the boundary are
//! wrapped on the way out and unwrapped on the way in.

use crate::analysis::{AttributePair, Dispatch, OperationInfo};
use crate::diagnostic::GeneratorError;
use crate::idl::Interface;
use crate::types::{TypeInfo, TypeKind};
use super::dart::{self, render_dispatch, return_prefix};
use super::{Context, OutputSink, System, SystemKind};

const BASE_CLASS: &str = "DOMWrapperBase";

struct ClassBuffer {
    id: String,
    name: String,
    base: String,
    members: String,
}

pub struct WrappingSystem {
    current: Option<ClassBuffer>,
}

impl WrappingSystem {
    pub fn new() -> Self {
        Self { current: None }
    }

    fn push(&mut self, text: &str) {
        if let Some(buffer) = self.current.as_mut() {
            buffer.members.push_str(text);
        }
    }
}

fn wrap(info: &TypeInfo, expr: &str) -> String {
    match info.kind() {
        TypeKind::Interface | TypeKind::Callback | TypeKind::TearOff => {
            format!("LevelDom.wrap{}({})", info.dart_type(), expr)
        }
        TypeKind::Sequence | TypeKind::ListLike if info.needs_wrapping() => {
            let item = info.list_item().map(TypeInfo::dart_type).unwrap_or("Object");
            format!("LevelDom.wrap{}List({})", item, expr)
        }
        _ => expr.to_string(),
    }
}

fn unwrap(info: &TypeInfo, expr: &str) -> String {
    if info.needs_wrapping() {
        format!("LevelDom.unwrap({})", expr)
    } else {
        expr.to_string()
    }
}

fn render_attribute(ctx: &Context, pair: &AttributePair) -> String {
    let name = pair.id();
    let mut out = String::new();
    if let Some(getter) = pair.getter {
        let info = ctx.types.type_info(&getter.typ.id);
        out.push_str(&format!(
            "\n  {} get {} => {};\n",
            info.dart_type(),
            name,
            wrap(&info, &format!("_ptr.{}", name))
        ));
    }
    if let Some(setter) = pair.setter {
        let info = ctx.types.type_info(&setter.typ.id);
        out.push_str(&format!(
            "\n  void set {}({} value) {{\n    _ptr.{} = {};\n  }}\n",
            name,
            info.dart_type(),
            name,
            unwrap(&info, "value")
        ));
    }
    out
}

fn render_operation(ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) -> String {
    let return_info = ctx.types.type_info(&info.return_type);
    let mut out = format!("\n  {} {{\n", dart::operation_signature(info));

    let mut call = |index: usize, prefix: &str| -> String {
        let Some(overload) = info.overloads.get(index) else {
            return String::new();
        };
        let args: Vec<String> = overload
            .arguments
            .iter()
            .zip(&info.params)
            .map(|(arg, param)| unwrap(&ctx.types.type_info(&arg.typ.id), &param.name))
            .collect();
        let invocation = format!("_ptr.{}({})", info.declared_name, args.join(", "));
        if info.is_void() {
            let mut text = format!("{}{};\n", prefix, invocation);
            if info.has_overloads() {
                text.push_str(&format!("{}return;\n", prefix));
            }
            text
        } else {
            format!("{}{}{};\n", prefix, return_prefix(info), wrap(&return_info, &invocation))
        }
    };
    out.push_str(&render_dispatch(dispatch, 2, &mut call));
    out.push_str("  }\n");
    out
}

impl System for WrappingSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Wrapping
    }

    fn begin_interface(&mut self, ctx: &Context, interface: &Interface) -> Result<(), GeneratorError> {
        if ctx.types.type_info(&interface.id).is_pure_interface() {
            tracing::debug!(interface = %interface.id, "no wrapper for pure interface");
            self.current = None;
            return Ok(());
        }
        let base = dart::supertypes(ctx, interface)
            .primary
            .map(|parent| format!("{}WrappingImplementation", parent))
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
        let info = ctx.types.type_info(item_type);
        self.push(&format!(
            "\n  {t} operator [](int index) => {get};\n\n  void operator []=(int index, {t} value) {{\n    _ptr[index] = {set};\n  }}\n",
            t = info.dart_type(),
            get = wrap(&info, "_ptr[index]"),
            set = unwrap(&info, "value"),
        ));
    }

    fn add_operation(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {
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
        if info.is_static {
            return;
        }
        self.push(&render_operation(ctx, info, dispatch));
    }

    fn finish_interface(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let Some(buffer) = self.current.take() else {
            return Ok(());
        };
        let text = ctx.templates.render_for(
            SystemKind::Wrapping.name(),
            &buffer.id,
            "wrapping.template",
            &[
                ("LIBRARY", ctx.config.library_name.as_str()),
                ("NAME", buffer.name.as_str()),
                ("BASE", buffer.base.as_str()),
                ("MEMBERS", buffer.members.as_str()),
            ],
        )?;
        sink.write(
            SystemKind::Wrapping,
            format!("wrapping/{}WrappingImplementation.dart", buffer.name),
            text,
        )
    }

    fn generate_libraries(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let mut parts = dart::interface_parts(ctx, sink);
        parts.extend(sink.sources_for(SystemKind::Wrapping).into_iter().map(str::to_string));
        let manifest = format!("wrapping/{}_wrapping.dart", ctx.config.library_name);
        dart::write_library(ctx, sink, SystemKind::Wrapping, &manifest, &[], &parts)
    }
}
