//! The document backend contract.
//!
//! A driver owns the parsed document tree between a load and a write and
//! answers path-level reads and writes against it. The core stays
//! backend-agnostic: anything that can parse itself into [`Value`]s and
//! render itself back out can carry a document.

mod memory;

use std::io::{Read, Write};

pub use memory::MemoryDriver;

use crate::bind::Bindable;
use crate::decl::{FieldDecl, SectionDecl};
use crate::desc::TypeDesc;
use crate::error::BindResult;
use crate::resolve::Resolver;
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// Driver

/// One document backend.
///
/// Paths are dotted: `a.b.c` addresses key `c` inside map `b` inside
/// top-level map `a`. Lookups against absent intermediate maps answer
/// "no value" rather than failing.
pub trait Driver: Send {
    /// Short backend name, used in error context lines.
    fn name(&self) -> &'static str;

    /// Parses backend bytes and replaces the held tree.
    fn load(&mut self, reader: &mut dyn Read) -> BindResult<()>;

    /// Renders the held tree, including any comments and headers the
    /// backend derives from the declaration.
    fn write(&self, writer: &mut dyn Write, decl: &SectionDecl) -> BindResult<()>;

    /// The value at `path`, if present.
    fn value(&self, path: &str) -> Option<Value>;

    fn path_exists(&self, path: &str) -> bool;

    /// Top-level keys of the held tree, in document order.
    fn all_keys(&self) -> Vec<String>;

    /// Stores an already-lowered value at `path`, creating intermediate
    /// maps as needed. The field declaration is available for backends
    /// that keep per-key bookkeeping.
    fn set_value(&mut self, path: &str, value: Value, field: Option<&FieldDecl>) -> BindResult<()>;

    /// Drops the value at `path`, if present.
    fn remove_value(&mut self, path: &str);

    /// Lowers a typed value for this backend. The default lowers
    /// conservatively through the engine; backends override this to
    /// special-case values they cannot represent natively.
    fn serialize_value(
        &self,
        resolver: &Resolver<'_>,
        value: Option<&dyn Bindable>,
        desc: Option<&TypeDesc>,
    ) -> BindResult<Value> {
        resolver.serialize(value, desc, true)
    }

    /// Post-serialization veto hook. The default accepts everything.
    fn is_valid(&self, path: &str, value: &Value) -> bool {
        let _ = (path, value);
        true
    }
}

// -----------------------------------------------------------------------------
// Path helpers

/// Resolves a dotted path against a tree.
pub fn lookup_path<'a>(root: &'a ValueMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Stores a value at a dotted path, creating intermediate maps and
/// replacing non-map values standing in the way.
pub fn set_path(root: &mut ValueMap, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = root
                .entry(head.to_owned())
                .or_insert_with(|| Value::Map(ValueMap::new()));
            if !matches!(entry, Value::Map(_)) {
                *entry = Value::Map(ValueMap::new());
            }
            if let Value::Map(nested) = entry {
                set_path(nested, rest, value);
            }
        }
    }
}

/// Removes the value at a dotted path, keeping the order of the
/// remaining keys.
pub fn remove_path(root: &mut ValueMap, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => root.shift_remove(path),
        Some((head, rest)) => match root.get_mut(head) {
            Some(Value::Map(nested)) => remove_path(nested, rest),
            _ => None,
        },
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{lookup_path, remove_path, set_path};
    use crate::value::{Value, ValueMap};

    #[test]
    fn dotted_paths_create_intermediate_maps() {
        let mut root = ValueMap::new();
        set_path(&mut root, "server.net.port", Value::Int(8080));

        assert_eq!(lookup_path(&root, "server.net.port"), Some(&Value::Int(8080)));
        assert!(lookup_path(&root, "server.net").unwrap().as_object().is_some());
        assert_eq!(lookup_path(&root, "server.missing"), None);
    }

    #[test]
    fn a_scalar_in_the_way_is_replaced() {
        let mut root = ValueMap::new();
        set_path(&mut root, "server", Value::Int(1));
        set_path(&mut root, "server.port", Value::Int(8080));
        assert_eq!(lookup_path(&root, "server.port"), Some(&Value::Int(8080)));
    }

    #[test]
    fn removal_keeps_sibling_order() {
        let mut root = ValueMap::new();
        set_path(&mut root, "a", Value::Int(1));
        set_path(&mut root, "b", Value::Int(2));
        set_path(&mut root, "c", Value::Int(3));

        assert_eq!(remove_path(&mut root, "b"), Some(Value::Int(2)));
        let keys: Vec<_> = root.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(remove_path(&mut root, "b"), None);
    }
}
