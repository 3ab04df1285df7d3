//! Dart binding generation.
//!
//! Every system implements [`System`]. The driver walks the filtered,
//! pre-ordered interfaces once and forwards each member to every active
//! system, which renders it into its own per-interface buffers:
//! - `interface`: abstract Dart classes plus the library manifest
//! - `wrapping`: Dart classes delegating to a wrapped object
//! - `native`: Dart classes with `native` bindings plus C++ glue and resolver
//! - `js`: Dart classes bound to JavaScript objects
//! - `dummy`: nothing
//!
//! Systems only add files to the [`OutputSink`]; nothing touches the disk
//! until the whole run has succeeded.

mod dart;
mod driver;
mod dummy;
mod interface;
mod js;
mod native;
mod output;
mod template;
mod wrapping;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::analysis::{AttributePair, Dispatch, InheritanceResolver, OperationInfo};
use crate::config::GeneratorConfig;
use crate::diagnostic::GeneratorError;
use crate::idl::{Constant, Database, Interface};
use crate::types::TypeRegistry;

pub use dart::{render_dispatch, THROW_ARGUMENT_ERROR};
pub use driver::{emission_order, generate, GenerateStats};
pub use native::{ResolverEntry, ResolverTable};
pub use output::{GeneratedFile, OutputSink, StaleFile, StaleReason};
pub use template::{substitute, TemplateLoader};

/// The code generation back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    Interface,
    Wrapping,
    Native,
    Js,
    Dummy,
}

impl SystemKind {
    pub const ALL: [SystemKind; 5] = [
        SystemKind::Interface,
        SystemKind::Wrapping,
        SystemKind::Native,
        SystemKind::Js,
        SystemKind::Dummy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SystemKind::Interface => "interface",
            SystemKind::Wrapping => "wrapping",
            SystemKind::Native => "native",
            SystemKind::Js => "js",
            SystemKind::Dummy => "dummy",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemKind {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| GeneratorError::UnknownSystem { name: s.to_string() })
    }
}

/// Shared, read-only state handed to every system call.
pub struct Context<'a> {
    pub database: &'a Database,
    pub types: &'a TypeRegistry<'a>,
    pub resolver: &'a InheritanceResolver<'a>,
    pub templates: &'a TemplateLoader,
    pub config: &'a GeneratorConfig,
    /// Auxiliary files keyed by the interface id they replace.
    pub auxiliary: &'a BTreeMap<String, PathBuf>,
}

/// A code generation back-end.
///
/// `add_*` calls render into the buffers opened by `begin_interface`; a
/// system that does not model a member renders nothing. Only buffer and
/// sink operations can fail.
#[allow(unused_variables)]
pub trait System {
    fn kind(&self) -> SystemKind;

    fn begin_interface(&mut self, ctx: &Context, interface: &Interface) -> Result<(), GeneratorError> {
        Ok(())
    }

    fn add_constant(&mut self, ctx: &Context, constant: &Constant) {}

    fn add_attribute(&mut self, ctx: &Context, pair: &AttributePair) {}

    /// Called for interfaces that behave as a list of `item_type`.
    fn add_indexer(&mut self, ctx: &Context, item_type: &str) {}

    fn add_operation(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {}

    fn add_constructor(&mut self, ctx: &Context, info: &OperationInfo, dispatch: &Dispatch) {}

    fn add_secondary_attribute(&mut self, ctx: &Context, parent: &Interface, pair: &AttributePair) {}

    fn add_secondary_operation(
        &mut self,
        ctx: &Context,
        parent: &Interface,
        info: &OperationInfo,
        dispatch: &Dispatch,
    ) {
    }

    fn finish_interface(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        Ok(())
    }

    /// Callback interfaces skip the member-by-member path.
    fn process_callback(
        &mut self,
        ctx: &Context,
        interface: &Interface,
        info: &OperationInfo,
        sink: &mut OutputSink,
    ) -> Result<(), GeneratorError> {
        Ok(())
    }

    /// Emits the aggregate manifests once every interface is done.
    fn generate_libraries(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        Ok(())
    }

    fn finish(&mut self, ctx: &Context, sink: &mut OutputSink) -> Result<(), GeneratorError> {
        Ok(())
    }
}

/// Creates a system by kind.
pub fn create_system(kind: SystemKind) -> Box<dyn System> {
    match kind {
        SystemKind::Interface => Box::new(interface::InterfaceSystem::new()),
        SystemKind::Wrapping => Box::new(wrapping::WrappingSystem::new()),
        SystemKind::Native => Box::new(native::NativeSystem::new()),
        SystemKind::Js => Box::new(js::JsSystem::new()),
        SystemKind::Dummy => Box::new(dummy::DummySystem),
    }
}
