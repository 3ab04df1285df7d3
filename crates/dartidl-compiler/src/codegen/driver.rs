//! The generation run.
//!
//! ```text
//! INIT → FILTER → ORDER → EMIT → FINALIZE
//! ```
//!
//! Any error aborts the whole run. Files only ever reach the [`OutputSink`],
//! so a failed run leaves nothing half-written on disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis::members::{group_operations, is_event_attribute, secondary_members};
use crate::analysis::{
    analyze_constructor, analyze_operation, build_dispatch, pair_up_attributes, AttributePair,
    InheritanceResolver,
};
use crate::config::GeneratorConfig;
use crate::diagnostic::GeneratorError;
use crate::idl::{Constant, Database, Interface, Operation};
use crate::types::TypeRegistry;
use super::{create_system, Context, OutputSink, System, TemplateLoader};

/// Counters reported after a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Interfaces generated member by member.
    pub interfaces: usize,
    pub callbacks: usize,
    /// Interfaces replaced by auxiliary files.
    pub skipped: usize,
    /// Operation groups analyzed, including constructors and forwarded groups.
    pub operations: usize,
    pub files: usize,
}

/// Interfaces selected by the source filter, parents first.
pub fn emission_order<'db>(database: &'db Database, config: &GeneratorConfig) -> Vec<&'db Interface> {
    let filtered: Vec<&Interface> = database
        .interfaces()
        .filter(|interface| interface.matches_source_filter(&config.source_filter))
        .collect();
    InheritanceResolver::new(database).pre_order(&filtered)
}

/// Runs every configured system over `database`, adding the output to `sink`.
pub fn generate(
    database: &Database,
    config: &GeneratorConfig,
    sink: &mut OutputSink,
) -> Result<GenerateStats, GeneratorError> {
    // Phase 1: INIT
    let types = TypeRegistry::new(database, config.renames.clone());
    let resolver = InheritanceResolver::new(database);
    let templates = TemplateLoader::new(config.template_dirs.clone());
    let auxiliary = match &config.auxiliary_dir {
        Some(dir) => find_auxiliary_files(dir)?,
        None => BTreeMap::new(),
    };
    let ctx = Context {
        database,
        types: &types,
        resolver: &resolver,
        templates: &templates,
        config,
        auxiliary: &auxiliary,
    };
    let mut systems: Vec<Box<dyn System>> = config.systems.iter().map(|kind| create_system(*kind)).collect();

    // Phase 2-3: FILTER and ORDER
    let order = emission_order(database, config);
    tracing::info!(
        interfaces = order.len(),
        systems = systems.len(),
        "starting generation"
    );

    // Phase 4: EMIT
    let mut stats = GenerateStats::default();
    for interface in order {
        let dart_name = types.interface_name(interface);
        if auxiliary.contains_key(&interface.id) || auxiliary.contains_key(&dart_name) {
            tracing::info!(interface = %interface.id, "using auxiliary file");
            stats.skipped += 1;
            continue;
        }

        if let Some(operations) = callback_operations(interface) {
            let info = analyze_operation(interface, &operations, &types)?;
            for system in systems.iter_mut() {
                system.process_callback(&ctx, interface, &info, sink)?;
            }
            stats.callbacks += 1;
            continue;
        }

        tracing::info!(interface = %interface.id, "generating interface");
        emit_interface(&ctx, interface, &mut systems, sink, &mut stats)?;
        stats.interfaces += 1;
    }

    // Phase 5: FINALIZE
    for system in systems.iter_mut() {
        system.generate_libraries(&ctx, sink)?;
    }
    for system in systems.iter_mut() {
        system.finish(&ctx, sink)?;
    }

    if config.strict_types {
        let names = types.unresolved();
        if !names.is_empty() {
            return Err(GeneratorError::UnresolvedTypes { names });
        }
    }

    stats.files = sink.len();
    Ok(stats)
}

fn emit_interface(
    ctx: &Context,
    interface: &Interface,
    systems: &mut [Box<dyn System>],
    sink: &mut OutputSink,
    stats: &mut GenerateStats,
) -> Result<(), GeneratorError> {
    for system in systems.iter_mut() {
        system.begin_interface(ctx, interface)?;
    }

    let mut constants: Vec<&Constant> = interface.constants.iter().collect();
    constants.sort_by(|a, b| a.id.cmp(&b.id));
    for constant in constants {
        for system in systems.iter_mut() {
            system.add_constant(ctx, constant);
        }
    }

    let attributes = pair_up_attributes(
        interface
            .attributes
            .iter()
            .filter(|attr| !is_event_attribute(ctx.resolver, interface, attr)),
    );
    for pair in &attributes {
        for system in systems.iter_mut() {
            system.add_attribute(ctx, pair);
        }
    }

    if let Some(item_type) = ctx.resolver.list_element_type(interface) {
        for system in systems.iter_mut() {
            system.add_indexer(ctx, &item_type);
        }
    }

    if let Some(info) = analyze_constructor(interface, ctx.types)? {
        let dispatch = build_dispatch(&info, ctx.types)?;
        for system in systems.iter_mut() {
            system.add_constructor(ctx, &info, &dispatch);
        }
        stats.operations += 1;
    }

    for (_, operations) in group_operations(interface) {
        let info = analyze_operation(interface, &operations, ctx.types)?;
        let dispatch = build_dispatch(&info, ctx.types)?;
        for system in systems.iter_mut() {
            system.add_operation(ctx, &info, &dispatch);
        }
        stats.operations += 1;
    }

    // A member reachable through several secondary parents is forwarded
    // once, from the first parent that declares it.
    let mut forwarded_accessors: BTreeSet<(&str, bool)> = BTreeSet::new();
    let mut forwarded_operations: BTreeSet<&str> = BTreeSet::new();

    for parent in ctx.resolver.secondary_parents(interface) {
        let members = secondary_members(interface, parent);
        tracing::debug!(
            interface = %interface.id,
            parent = %parent.id,
            attributes = members.attributes.len(),
            operations = members.operations.len(),
            "forwarding secondary members"
        );
        for pair in &members.attributes {
            let event = [pair.getter, pair.setter]
                .into_iter()
                .flatten()
                .any(|attr| is_event_attribute(ctx.resolver, interface, attr));
            if event {
                continue;
            }
            let pair = AttributePair {
                getter: pair
                    .getter
                    .filter(|getter| forwarded_accessors.insert((getter.id.as_str(), true))),
                setter: pair
                    .setter
                    .filter(|setter| forwarded_accessors.insert((setter.id.as_str(), false))),
            };
            if pair.getter.is_none() && pair.setter.is_none() {
                continue;
            }
            for system in systems.iter_mut() {
                system.add_secondary_attribute(ctx, parent, &pair);
            }
        }
        for (id, operations) in members.operations {
            if !forwarded_operations.insert(id) {
                tracing::debug!(interface = %interface.id, parent = %parent.id, operation = id, "already forwarded");
                continue;
            }
            let info = analyze_operation(parent, &operations, ctx.types)?;
            let dispatch = build_dispatch(&info, ctx.types)?;
            for system in systems.iter_mut() {
                system.add_secondary_operation(ctx, parent, &info, &dispatch);
            }
            stats.operations += 1;
        }
    }

    for system in systems.iter_mut() {
        system.finish_interface(ctx, sink)?;
    }
    Ok(())
}

/// The handler operations of a callback interface: a `[Callback]` interface
/// whose operations are all `handleEvent`.
fn callback_operations(interface: &Interface) -> Option<Vec<&Operation>> {
    if !interface.has_ext_attr("Callback") {
        return None;
    }
    let operations: Vec<&Operation> = interface.operations.iter().collect();
    if !operations.is_empty() && operations.iter().all(|op| op.name() == "handleEvent") {
        return Some(operations);
    }
    tracing::warn!(
        interface = %interface.id,
        operations = operations.len(),
        "malformed callback interface, generating it as a regular interface"
    );
    None
}

/// Hand-written `.dart` files below `dir`, keyed by file stem.
fn find_auxiliary_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>, GeneratorError> {
    let mut files = BTreeMap::new();
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "auxiliary directory does not exist");
        return Ok(files);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GeneratorError::IoError {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "dart") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(stem.to_string(), path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::SystemKind;
    use crate::idl::{Argument, Attribute, IdlType, ParentRef};

    fn config(systems: &[SystemKind]) -> GeneratorConfig {
        GeneratorConfig {
            systems: systems.to_vec(),
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_callback_recognised() {
        let mut db = Database::new();
        let mut callback = Interface::new("VoidCallback");
        callback.ext_attrs.insert("Callback".to_string(), None);
        callback.operations = vec![Operation::new("handleEvent", IdlType::new("boolean"), vec![])];
        db.add_interface(callback).unwrap();

        let mut sink = OutputSink::new();
        let stats = generate(&db, &config(&[SystemKind::Interface]), &mut sink).unwrap();

        assert_eq!(stats.callbacks, 1);
        assert_eq!(stats.interfaces, 0);
        let text = sink.get("interface/VoidCallback.dart").unwrap();
        assert!(text.contains("typedef bool VoidCallback();"));
    }

    #[test]
    fn test_malformed_callback_generated_normally() {
        let mut db = Database::new();
        let mut callback = Interface::new("Weird");
        callback.ext_attrs.insert("Callback".to_string(), None);
        callback.operations = vec![Operation::new("run", IdlType::new("void"), vec![])];
        db.add_interface(callback).unwrap();

        let mut sink = OutputSink::new();
        let stats = generate(&db, &config(&[SystemKind::Interface]), &mut sink).unwrap();
        assert_eq!(stats.callbacks, 0);
        assert_eq!(stats.interfaces, 1);
        assert!(sink.get("interface/Weird.dart").unwrap().contains("  void run();"));
    }

    #[test]
    fn test_event_attributes_suppressed() {
        let mut db = Database::new();
        let mut node = Interface::new("Node");
        node.parents = vec![ParentRef::new("EventTarget")];
        node.attributes = vec![
            Attribute::getter("onclick", IdlType::new("EventListener")),
            Attribute::getter("nodeName", IdlType::new("DOMString")),
        ];
        db.add_interface(node).unwrap();

        let mut sink = OutputSink::new();
        generate(&db, &config(&[SystemKind::Interface]), &mut sink).unwrap();
        let text = sink.get("interface/Node.dart").unwrap();
        assert!(text.contains("final String nodeName;"));
        assert!(!text.contains("onclick"));
    }

    #[test]
    fn test_strict_mode_rejects_unresolved_parent_type() {
        let mut db = Database::new();
        let mut node = Interface::new("Node");
        node.operations = vec![Operation::new(
            "frob",
            IdlType::new("void"),
            vec![Argument::new("x", IdlType::new("Gadget"))],
        )];
        db.add_interface(node).unwrap();

        let mut lenient = OutputSink::new();
        generate(&db, &config(&[SystemKind::Interface]), &mut lenient).unwrap();
        assert!(lenient.get("interface/Node.dart").unwrap().contains("void frob(dynamic x);"));

        let strict = GeneratorConfig {
            strict_types: true,
            ..config(&[SystemKind::Interface])
        };
        let err = generate(&db, &strict, &mut OutputSink::new()).unwrap_err();
        assert!(matches!(err, GeneratorError::UnresolvedTypes { ref names } if names == &["Gadget"]));
    }

    #[test]
    fn test_auxiliary_file_replaces_generation() {
        let dir = tempfile::tempdir().unwrap();
        let aux = dir.path().join("aux");
        std::fs::create_dir_all(&aux).unwrap();
        std::fs::write(aux.join("Node.dart"), "// hand written\n").unwrap();

        let mut db = Database::new();
        db.add_interface(Interface::new("Node")).unwrap();
        db.add_interface(Interface::new("Text")).unwrap();

        let config = GeneratorConfig {
            out_dir: dir.path().join("out"),
            auxiliary_dir: Some(aux),
            ..config(&[SystemKind::Interface])
        };
        let mut sink = OutputSink::new();
        let stats = generate(&db, &config, &mut sink).unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(!sink.contains("interface/Node.dart"));
        let manifest = sink.get("interface/html.dart").unwrap();
        assert!(manifest.contains("part 'Text.dart';"));
        assert!(manifest.contains("part '../../aux/Node.dart';"));
    }
}
