//! Validation and normalisation of the interface database.

mod structure;
mod types;

use crate::diagnostic::GeneratorError;
use crate::idl::Database;

pub use types::{strip_unidentified_members, unidentified_types};

/// Validates the entire database.
pub fn validate_database(database: &Database) -> Result<(), GeneratorError> {
    structure::validate_structure(database)
}
