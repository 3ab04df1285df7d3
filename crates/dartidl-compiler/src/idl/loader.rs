//! Loading database snapshots from disk.
//!
//! A snapshot is a JSON document in the [`DatabaseSnapshot`] shape. The
//! database path may point at a single snapshot file or at a directory, in
//! which case every `*.json` file below it is loaded as a fragment.

use std::path::Path;
use walkdir::WalkDir;

use crate::diagnostic::GeneratorError;
use super::{Database, DatabaseSnapshot};

/// Loads a database from a snapshot file or a directory of fragments.
///
/// Attribute records without accessor flags are split into getter/setter
/// records so hand-written snapshots can declare read/write attributes once.
pub fn load_database(path: &Path) -> Result<Database, GeneratorError> {
    let mut database = Database::new();

    if path.is_dir() {
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
                database.extend(read_snapshot(file)?)?;
            }
        }
    } else {
        database.extend(read_snapshot(path)?)?;
    }

    for interface in database.interfaces_mut() {
        interface.split_accessors();
    }

    tracing::info!(
        path = %path.display(),
        interfaces = database.interface_count(),
        "loaded interface database"
    );

    Ok(database)
}

/// Parses one snapshot file.
pub fn read_snapshot(path: &Path) -> Result<DatabaseSnapshot, GeneratorError> {
    let content = std::fs::read_to_string(path).map_err(|e| GeneratorError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| GeneratorError::DatabaseParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("db.json");
        std::fs::write(
            &file,
            r#"{ "interfaces": [
                { "id": "Circle", "parents": ["Shape"],
                  "attributes": [{ "id": "radius", "type": "double" }] },
                { "id": "Shape" }
            ] }"#,
        )
        .unwrap();

        let db = load_database(&file).unwrap();
        assert!(db.has_interface("Shape"));
        let circle = db.get_interface("Circle").unwrap();
        assert_eq!(circle.parents[0].id(), "Shape");
        assert_eq!(circle.attributes.len(), 2);
    }

    #[test]
    fn test_load_directory_of_fragments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{ "interfaces": [{ "id": "Node" }] }"#).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested").join("b.json"),
            r#"{ "enums": [{ "id": "Mode" }] }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let db = load_database(dir.path()).unwrap();
        assert!(db.has_interface("Node"));
        assert!(db.has_enum("Mode"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.json");
        std::fs::write(&file, "{ not json").unwrap();

        let err = load_database(&file).unwrap_err();
        assert!(matches!(err, GeneratorError::DatabaseParse { ref path, .. } if path == &file));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_database(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, GeneratorError::IoError { .. }));
    }
}
