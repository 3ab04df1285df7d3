//! Generator configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::codegen::SystemKind;
use crate::diagnostic::GeneratorError;

/// Configuration for one generation run.
///
/// Loadable from a JSON file with snake_case keys; every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Database snapshot file, or a directory of snapshot fragments.
    pub database: PathBuf,

    /// Directory the generated tree is flushed to.
    pub out_dir: PathBuf,

    /// Systems to run, in emission order.
    pub systems: Vec<SystemKind>,

    /// Dart library name used by the aggregate manifests.
    pub library_name: String,

    /// Annotation keys selecting the interfaces in scope. Empty selects all.
    pub source_filter: Vec<String>,

    /// Library prefix for parents outside the source filter. When unset,
    /// such parents are dropped from the generated supertype list.
    pub common_prefix: Option<String>,

    /// Retargets the primary parent of an interface (interface id to Dart name).
    pub super_map: BTreeMap<String, String>,

    /// Dart names for interfaces (interface id to Dart name).
    pub renames: BTreeMap<String, String>,

    /// Hand-written Dart files replacing generation for the interface named
    /// by their file stem.
    pub auxiliary_dir: Option<PathBuf>,

    /// Template search directories, searched before the built-in templates.
    pub template_dirs: Vec<PathBuf>,

    /// Fail the run on unresolved type references instead of stripping the
    /// members that use them.
    pub strict_types: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("idl/database.json"),
            out_dir: PathBuf::from("generated"),
            systems: vec![SystemKind::Interface],
            library_name: "html".to_string(),
            source_filter: Vec::new(),
            common_prefix: None,
            super_map: BTreeMap::new(),
            renames: BTreeMap::new(),
            auxiliary_dir: None,
            template_dirs: Vec::new(),
            strict_types: false,
        }
    }
}

impl GeneratorConfig {
    /// Loads a configuration file. Relative paths inside the file are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let content = std::fs::read_to_string(path).map_err(|e| GeneratorError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut config: GeneratorConfig =
            serde_json::from_str(&content).map_err(|e| GeneratorError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.database);
        join(&mut self.out_dir);
        if let Some(dir) = self.auxiliary_dir.as_mut() {
            join(dir);
        }
        for dir in &mut self.template_dirs {
            join(dir);
        }
    }
}
