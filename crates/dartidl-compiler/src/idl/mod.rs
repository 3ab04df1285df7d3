//! In-memory interface database.
//!
//! The database is the finished, already-parsed description of every IDL
//! interface the generator may emit. It is produced upstream (see
//! [`loader`]) and treated as read-only by the code generators, apart from
//! the normalisation passes that run before generation starts.

mod database;
mod interface;
pub mod loader;

pub use database::{Database, DatabaseSnapshot, Dictionary, DictionaryMember, Enum};
pub use interface::{
    Annotations, Argument, Attribute, Constant, Constructor, ExtAttrs, IdlType, Interface,
    Operation, ParentRef,
};

/// Returns true for parent type names that are structural collection sugar
/// (`List`, `sequence<T>`) rather than real base interfaces.
pub fn is_collection_type(type_name: &str) -> bool {
    type_name == "List" || type_name.starts_with("sequence<")
}

/// Returns the item type of a `sequence<T>` or `T[]` type name.
pub fn sequence_item_type(type_name: &str) -> Option<&str> {
    if let Some(inner) = type_name
        .strip_prefix("sequence<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return Some(inner.trim());
    }
    type_name.strip_suffix("[]")
}
