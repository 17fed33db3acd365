use std::io;

use thiserror::Error;

// -----------------------------------------------------------------------------
// BindResult

/// Convenience alias for results produced by this crate.
pub type BindResult<T> = Result<T, BindError>;

// -----------------------------------------------------------------------------
// BindError

/// Every failure the binding layer can surface.
///
/// Update and save runs are all-or-nothing: the first field that produces
/// one of these aborts the whole operation and leaves the object in its
/// previous state wherever possible.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    /// No conversion path leads from the source value to the requested
    /// target type.
    #[error("cannot resolve value '{value}' ({source_type} => {target_type})")]
    Unresolvable {
        value: String,
        source_type: String,
        target_type: String,
    },

    /// A value could not be lowered into a document tree.
    #[error("cannot serialize {type_name}: '{value}'")]
    Unserializable { type_name: String, value: String },

    /// An enum lookup failed. The message lists every legal name.
    #[error("no {enum_name} variant named `{name}` (available: {available})")]
    UnknownVariant {
        enum_name: &'static str,
        name: String,
        available: String,
    },

    /// A parameterized target did not carry the sub-type information the
    /// engine needs at this position.
    #[error("{target} is missing generic argument {index}")]
    MissingSubType { target: String, index: usize },

    /// Two field declarations of one section computed the same document
    /// path, and neither carries a migration tag that would retire it.
    #[error("duplicate key `{path}` in {section}")]
    DuplicatePath { section: &'static str, path: String },

    /// A driver rejected a value without raising an error of its own.
    #[error("{driver} marked {path} as invalid without raising an error")]
    Invalid { driver: &'static str, path: String },

    /// An environment override could not be applied to its field.
    #[error("variable `{name}` for {path} could not be applied")]
    Variable {
        name: String,
        path: String,
        #[source]
        source: Box<BindError>,
    },

    /// The document backend failed while parsing or emitting a document.
    #[error("driver failure: {context}")]
    Driver {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Plain I/O failure while touching the filesystem.
    #[error("i/o failure")]
    Io(#[from] io::Error),

    /// An engine-internal downcast did not match the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch { expected: &'static str, found: String },

    /// A file-based operation was called on a document without a bound path.
    #[error("no file path bound to this document")]
    NoPath,
}

impl BindError {
    /// Wraps a backend failure with a short context line.
    pub fn driver(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Driver {
            context: context.into(),
            source: source.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::BindError;

    #[test]
    fn messages_name_the_involved_types() {
        let err = BindError::Unresolvable {
            value: "x".into(),
            source_type: "String".into(),
            target_type: "i64".into(),
        };
        assert_eq!(err.to_string(), "cannot resolve value 'x' (String => i64)");

        let err = BindError::UnknownVariant {
            enum_name: "Color",
            name: "purple".into(),
            available: "Red, Green, Blue".into(),
        };
        let text = err.to_string();
        assert!(text.contains("purple"));
        assert!(text.contains("Red, Green, Blue"));
    }

    #[test]
    fn driver_wrap_keeps_the_source() {
        use std::error::Error;

        let inner = std::io::Error::other("backend broke");
        let err = BindError::driver("failed to parse document", inner);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("failed to parse document"));
    }
}
