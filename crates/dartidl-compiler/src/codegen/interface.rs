//! Interface system: abstract Dart declarations.

use crate::analysis::{AttributePair, Dispatch, OperationInfo};
use crate::diagnostic::GeneratorError;
use crate::idl::{Constant, Interface};
use super::dart::{self, doc_comment, operation_signature};
use super::{Context, OutputSink, System, SystemKind};

struct ClassBuffer {
    id: String,
    name: String,
    doc: String,
    supertypes: String,
    members: String,
}

pub struct InterfaceSystem {
    current: Option<ClassBuffer>,
}

impl InterfaceSystem {
    pub fn new() -> Self {
        Self { current: None }
    }

    fn members(&mut self) -> Option<&mut String> {
        self.current.as_mut().map(|buffer| &mut buffer.members)
    }
}

impl System for InterfaceSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Interface
    }

    fn begin_interface(&mut self, ctx: &Context, interface: &Interface) -> Result<(), GeneratorError> {
        self.current = Some(ClassBuffer {
            id: interface.id.clone(),
            name: ctx.types.interface_name(interface),
            doc: doc_comment(interface.doc.as_deref(), 0),
            supertypes: dart::supertypes(ctx, interface).implements_clause(),
            members: String::new(),
        });
        Ok(())
    }

    fn add_constant(&mut self, ctx: &Context, constant: &Constant) {
        let dart_type = ctx.types.dart_type(&constant.typ.id);
        if let Some(members) = self.members() {
            members.push_str(&format!(
                "\n  static const {} {} = {};\n",
                dart_type, constant.id, constant.value
            ));
        }
    }

    fn add_attribute(&mut self, ctx: &Context, pair: &AttributePair) {
        let name = pair.id();
        let mut out = String::from("\n");
        match (pair.getter, pair.setter) {
            (Some(getter), Some(_)) if pair.is_field() => {
                out.push_str(&doc_comment(getter.doc.as_deref(), 1));
                out.push_str(&format!("  {} {};\n", ctx.types.dart_type(&getter.typ.id), name));
            }
            (Some(getter), None) => {
                out.push_str(&doc_comment(getter.doc.as_deref(), 1));
                out.push_str(&format!("  final {} {};\n", ctx.types.dart_type(&getter.typ.id), name));
            }
            (getter, setter) => {
                if let Some(getter) = getter {
                    out.push_str(&doc_comment(getter.doc.as_deref(), 1));
                    out.push_str(&format!("  {} get {};\n", ctx.types.dart_type(&getter.typ.id), name));
                }
                if let Some(setter) = setter {
                    out.push_str(&format!(
                        "  void set {}({} value);\n",
                        name,
                        ctx.types.dart_type(&setter.typ.id)
                    ));
                }
            }
        }
        if let Some(members) = self.members() {
            members.push_str(&out);
        }
    }

    fn add_indexer(&mut self, ctx: &Context, item_type: &str) {
        let dart_type = ctx.types.dart_type(item_type);
        if let Some(members) = self.members() {
            members.push_str(&format!(
                "\n  {t} operator [](int index);\n\n  void operator []=(int index, {t} value);\n",
                t = dart_type
            ));
        }
    }

    fn add_operation(&mut self, _ctx: &Context, info: &OperationInfo, _dispatch: &Dispatch) {
        if let Some(members) = self.members() {
            members.push_str(&format!("\n  {};\n", operation_signature(info)));
        }
    }

    fn add_constructor(&mut self, ctx: &Context, info: &OperationInfo, _dispatch: &Dispatch) {
        // `_<Name>FactoryProvider` is only defined by the native library.
        if !ctx.config.systems.contains(&SystemKind::Native) {
            tracing::debug!(interface = %info.name, "no native system, skipping factory constructor");
            return;
        }
        let name = info.name.clone();
        let args = info.parameters_as_arguments(info.params.len());
        if let Some(members) = self.members() {
            members.push_str(&format!(
                "\n  factory {n}({params}) => _{n}FactoryProvider.create{n}({args});\n",
                n = name,
                params = info.parameters_as_declaration(),
                args = args
            ));
        }
    }

    fn finish_interface(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let Some(buffer) = self.current.take() else {
            return Ok(());
        };
        let text = ctx.templates.render_for(
            SystemKind::Interface.name(),
            &buffer.id,
            "interface.template",
            &[
                ("LIBRARY", ctx.config.library_name.as_str()),
                ("DOC", buffer.doc.as_str()),
                ("MODIFIERS", "abstract "),
                ("NAME", buffer.name.as_str()),
                ("SUPERTYPES", buffer.supertypes.as_str()),
                ("MEMBERS", buffer.members.as_str()),
            ],
        )?;
        sink.write(SystemKind::Interface, format!("interface/{}.dart", buffer.name), text)
    }

    fn process_callback(
        &mut self,
        ctx: &Context,
        interface: &Interface,
        info: &OperationInfo,
        sink: &mut OutputSink,
    ) -> Result<(), GeneratorError> {
        let name = ctx.types.interface_name(interface);
        let text = ctx.templates.render_for(
            SystemKind::Interface.name(),
            &interface.id,
            "callback.template",
            &[
                ("LIBRARY", ctx.config.library_name.as_str()),
                ("RETURN_TYPE", info.return_dart_type.as_str()),
                ("NAME", name.as_str()),
                ("PARAMETERS", info.parameters_as_declaration().as_str()),
            ],
        )?;
        sink.write(SystemKind::Interface, format!("interface/{}.dart", name), text)
    }

    fn generate_libraries(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        let parts = dart::interface_parts(ctx, sink);
        let manifest = format!("interface/{}.dart", ctx.config.library_name);
        dart::write_library(ctx, sink, SystemKind::Interface, &manifest, &[], &parts)
    }
}
