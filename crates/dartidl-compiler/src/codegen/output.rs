//! In-memory output tree.

use std::collections::BTreeMap;
use std::path::Path;

use crate::diagnostic::GeneratorError;
use super::SystemKind;

/// One generated file, keyed by its path relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
    pub system: SystemKind,
    /// Aggregate manifests and side tables, as opposed to per-interface sources.
    pub is_library: bool,
}

/// Write-once map of generated files in emission order.
#[derive(Debug, Default)]
pub struct OutputSink {
    files: Vec<GeneratedFile>,
    index: BTreeMap<String, usize>,
}

/// A file whose on-disk contents differ from the generated ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleFile {
    pub path: String,
    pub reason: StaleReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    Missing,
    Changed,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a per-interface source file.
    pub fn write(
        &mut self,
        system: SystemKind,
        path: impl Into<String>,
        contents: String,
    ) -> Result<(), GeneratorError> {
        self.insert(system, path.into(), contents, false)
    }

    /// Adds an aggregate file (manifest, resolver table, umbrella source).
    pub fn write_library(
        &mut self,
        system: SystemKind,
        path: impl Into<String>,
        contents: String,
    ) -> Result<(), GeneratorError> {
        self.insert(system, path.into(), contents, true)
    }

    fn insert(
        &mut self,
        system: SystemKind,
        path: String,
        contents: String,
        is_library: bool,
    ) -> Result<(), GeneratorError> {
        if self.index.contains_key(&path) {
            return Err(GeneratorError::DuplicateOutput { path });
        }
        tracing::trace!(%system, path = %path, bytes = contents.len(), "generated file");
        self.index.insert(path.clone(), self.files.len());
        self.files.push(GeneratedFile {
            path,
            contents,
            system,
            is_library,
        });
        Ok(())
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.index
            .get(path)
            .map(|&i| self.files[i].contents.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Per-interface source paths of one system, in emission order.
    pub fn sources_for(&self, system: SystemKind) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| f.system == system && !f.is_library)
            .map(|f| f.path.as_str())
            .collect()
    }

    /// Writes every file below `out_dir`. Returns the number of files written.
    pub fn flush(&self, out_dir: &Path) -> Result<usize, GeneratorError> {
        std::fs::create_dir_all(out_dir).map_err(|e| GeneratorError::IoError {
            path: out_dir.to_path_buf(),
            message: e.to_string(),
        })?;

        for file in &self.files {
            let path = out_dir.join(&file.path);
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GeneratorError::IoError {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            std::fs::write(&path, &file.contents).map_err(|e| GeneratorError::IoError {
                path,
                message: e.to_string(),
            })?;
        }

        Ok(self.files.len())
    }

    /// Compares the generated tree with `out_dir` without writing anything.
    pub fn stale_files(&self, out_dir: &Path) -> Result<Vec<StaleFile>, GeneratorError> {
        let mut stale = Vec::new();
        for file in &self.files {
            let path = out_dir.join(&file.path);
            let reason = match std::fs::read_to_string(&path) {
                Ok(existing) if existing == file.contents => continue,
                Ok(_) => StaleReason::Changed,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => StaleReason::Missing,
                Err(e) => return Err(GeneratorError::io(path, e.to_string())),
            };
            stale.push(StaleFile {
                path: file.path.clone(),
                reason,
            });
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once() {
        let mut sink = OutputSink::new();
        sink.write(SystemKind::Interface, "interface/Node.dart", "a".to_string())
            .unwrap();
        let err = sink
            .write_library(SystemKind::Native, "interface/Node.dart", "b".to_string())
            .unwrap_err();
        assert!(matches!(err, GeneratorError::DuplicateOutput { ref path } if path == "interface/Node.dart"));
        assert_eq!(sink.get("interface/Node.dart"), Some("a"));
    }

    #[test]
    fn test_sources_for_skips_libraries() {
        let mut sink = OutputSink::new();
        sink.write(SystemKind::Interface, "interface/B.dart", String::new()).unwrap();
        sink.write(SystemKind::Interface, "interface/A.dart", String::new()).unwrap();
        sink.write(SystemKind::Js, "js/_AJs.dart", String::new()).unwrap();
        sink.write_library(SystemKind::Interface, "interface/html.dart", String::new())
            .unwrap();

        assert_eq!(
            sink.sources_for(SystemKind::Interface),
            vec!["interface/B.dart", "interface/A.dart"]
        );
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_flush_and_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::new();
        sink.write(SystemKind::Interface, "interface/Node.dart", "class Node {}\n".to_string())
            .unwrap();
        sink.write(SystemKind::Native, "native/cpp/DartNode.h", "//\n".to_string())
            .unwrap();

        let stale = sink.stale_files(dir.path()).unwrap();
        assert_eq!(stale.len(), 2);
        assert!(stale.iter().all(|s| s.reason == StaleReason::Missing));

        assert_eq!(sink.flush(dir.path()).unwrap(), 2);
        assert!(sink.stale_files(dir.path()).unwrap().is_empty());

        std::fs::write(dir.path().join("interface/Node.dart"), "edited").unwrap();
        let stale = sink.stale_files(dir.path()).unwrap();
        assert_eq!(
            stale,
            vec![StaleFile {
                path: "interface/Node.dart".to_string(),
                reason: StaleReason::Changed
            }]
        );
    }
}
