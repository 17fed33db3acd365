//! The YAML document driver.

use std::io::{Read, Write};

use docbind_core::driver::{lookup_path, remove_path, set_path};
use docbind_core::{BindError, BindResult, Driver, FieldDecl, SectionDecl, Value, ValueMap};

use crate::post::{PostProcessor, YamlWalker};

/// Prefix rendered before every comment line.
const COMMENT_PREFIX: &str = "# ";

// -----------------------------------------------------------------------------
// YamlDriver

/// Document driver speaking YAML through `serde_yaml`.
///
/// Loading accepts any mapping-rooted document. Writing renders the held
/// tree and then re-inserts the comments and header the declaration
/// carries, since the renderer itself has no comment support.
#[derive(Clone, Debug, Default)]
pub struct YamlDriver {
    root: ValueMap,
}

impl YamlDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing tree.
    pub fn with_root(root: ValueMap) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ValueMap {
        &self.root
    }
}

impl Driver for YamlDriver {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn load(&mut self, reader: &mut dyn Read) -> BindResult<()> {
        let parsed: Value = serde_yaml::from_reader(reader)
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
        tracing::trace!(keys = self.root.len(), "yaml document parsed");
        Ok(())
    }

    fn write(&self, writer: &mut dyn Write, decl: &SectionDecl) -> BindResult<()> {
        let rendered = serde_yaml::to_string(&self.root)
            .map_err(|err| BindError::driver("failed to render document", err))?;
        let walker = YamlWalker::new(decl, COMMENT_PREFIX);
        let text = PostProcessor::of(rendered)
            .update_paths(&walker)
            .prepend_header(COMMENT_PREFIX, decl.header_lines())
            .into_string();
        writer.write_all(text.as_bytes())?;
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
    use std::sync::Arc;

    use docbind_core::derive::Bind;
    use docbind_core::{Document, TransformRegistry};

    use super::YamlDriver;

    #[derive(Bind, Clone, Debug, Default, PartialEq)]
    struct Limits {
        #[bind(comment = "Requests per second.")]
        rate: u32,
    }

    #[derive(Bind, Clone, Debug, PartialEq)]
    #[bind(version = 2)]
    #[bind(header = "Service settings.")]
    struct Service {
        #[bind(comment = "Port the service listens on.")]
        port: u16,
        #[bind(comment = "Downstream limits.")]
        limits: Limits,
        features: Vec<String>,
    }

    impl Default for Service {
        fn default() -> Self {
            Self {
                port: 8080,
                limits: Limits::default(),
                features: vec![String::from("base")],
            }
        }
    }

    fn document() -> Document<Service> {
        let registry = Arc::new(TransformRegistry::with_defaults());
        Document::new(registry, YamlDriver::new()).unwrap()
    }

    #[test]
    fn yaml_documents_load_into_fields() {
        let mut doc = document();
        doc.load_str("port: 9000\nlimits:\n  rate: 5\n").unwrap();

        assert_eq!(doc.object().port, 9000);
        assert_eq!(doc.object().limits, Limits { rate: 5 });
        assert_eq!(doc.object().features, [String::from("base")]);
    }

    #[test]
    fn saves_render_comments_and_header() {
        let mut doc = document();
        doc.load_str("port: 9000\n").unwrap();

        let text = doc.save_to_string().unwrap();

        assert!(text.starts_with("# Service settings.\n\n"));
        assert!(text.contains("# Port the service listens on.\nport: 9000\n"));
        assert!(text.contains("# Downstream limits.\nlimits:\n"));
        // Nested comments match their key's indent.
        assert!(text.contains("  # Requests per second.\n  rate: 0\n"));
        assert!(text.contains("schema-version: 2"));
    }

    #[test]
    fn saved_documents_load_back() {
        let mut doc = document();
        doc.load_str("port: 4000\nfeatures:\n- fast\n- safe\n").unwrap();
        let text = doc.save_to_string().unwrap();

        let mut reloaded = document();
        reloaded.load_str(&text).unwrap();

        assert_eq!(reloaded.object(), doc.object());
        assert_eq!(
            reloaded.object().features,
            [String::from("fast"), String::from("safe")]
        );
    }

    #[test]
    fn empty_documents_keep_the_defaults() {
        let mut doc = document();
        doc.load_str("").unwrap();

        assert_eq!(doc.object(), &Service::default());
    }

    #[test]
    fn non_map_roots_are_rejected() {
        let mut doc = document();
        let err = doc.load_str("- 1\n- 2\n").unwrap_err();
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn unknown_keys_round_trip_untouched() {
        let mut doc = document();
        doc.load_str("port: 1234\ncustom:\n  kept: true\n").unwrap();

        let text = doc.save_to_string().unwrap();
        assert!(text.contains("custom:\n  kept: true\n"));
    }

    #[test]
    fn initiate_writes_defaults_and_reloads_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.yml");

        let mut doc = document().with_path(&path);
        doc.initiate().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Service settings.\n"));
        assert!(text.contains("port: 8080\n"));

        let mut reloaded = document().with_path(&path);
        reloaded.object_mut().port = 1;
        reloaded.initiate().unwrap();
        assert_eq!(reloaded.object(), &Service::default());
    }
}
