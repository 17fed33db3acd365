use std::io::{Read, Write};

use super::{Driver, lookup_path, remove_path, set_path};
use crate::decl::{FieldDecl, SectionDecl};
use crate::error::{BindError, BindResult};
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// MemoryDriver

/// A driver over a plain in-memory tree, speaking JSON on the wire.
///
/// This is the backend behind nested-section resolution and the test
/// suites; file-format crates provide richer drivers on top of the same
/// contract.
#[derive(Clone, Debug, Default)]
pub struct MemoryDriver {
    root: ValueMap,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            root: ValueMap::new(),
        }
    }

    /// Wraps an existing tree.
    pub fn with_root(root: ValueMap) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ValueMap {
        &self.root
    }

    pub fn into_root(self) -> ValueMap {
        self.root
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&mut self, reader: &mut dyn Read) -> BindResult<()> {
        let parsed: Value = serde_json::from_reader(reader)
            .map_err(|err| BindError::driver("failed to parse document", err))?;
        self.root = match parsed {
            Value::Map(map) => map,
            Value::Null => ValueMap::new(),
            other => {
                return Err(BindError::Mismatch {
                    expected: "a map at the document root",
                    found: other.kind_name().to_owned(),
                });
            }
        };
        Ok(())
    }

    fn write(&self, writer: &mut dyn Write, _decl: &SectionDecl) -> BindResult<()> {
        serde_json::to_writer_pretty(&mut *writer, &self.root)
            .map_err(|err| BindError::driver("failed to render document", err))?;
        writeln!(writer)?;
        Ok(())
    }

    fn value(&self, path: &str) -> Option<Value> {
        lookup_path(&self.root, path).cloned()
    }

    fn path_exists(&self, path: &str) -> bool {
        lookup_path(&self.root, path).is_some()
    }

    fn all_keys(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }

    fn set_value(&mut self, path: &str, value: Value, _field: Option<&FieldDecl>) -> BindResult<()> {
        set_path(&mut self.root, path, value);
        Ok(())
    }

    fn remove_value(&mut self, path: &str) {
        remove_path(&mut self.root, path);
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::MemoryDriver;
    use crate::driver::Driver;
    use crate::value::Value;

    #[test]
    fn loads_a_json_tree() {
        let mut driver = MemoryDriver::new();
        let mut input = r#"{"name": "probe", "nested": {"port": 8080}}"#.as_bytes();
        driver.load(&mut input).unwrap();

        assert_eq!(driver.value("name"), Some(Value::Str("probe".to_owned())));
        assert_eq!(driver.value("nested.port"), Some(Value::Int(8080)));
        assert!(driver.path_exists("nested"));
        assert_eq!(driver.all_keys(), ["name", "nested"]);
    }

    #[test]
    fn rejects_a_non_map_root() {
        let mut driver = MemoryDriver::new();
        let mut input = "[1, 2]".as_bytes();
        let err = driver.load(&mut input).unwrap_err();
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn set_and_remove_round_trip() {
        let mut driver = MemoryDriver::new();
        driver
            .set_value("outer.inner", Value::Str("kept".to_owned()), None)
            .unwrap();
        assert!(driver.path_exists("outer.inner"));

        driver.remove_value("outer.inner");
        assert!(!driver.path_exists("outer.inner"));
        assert!(driver.path_exists("outer"));
    }
}
