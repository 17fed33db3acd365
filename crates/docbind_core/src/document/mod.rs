//! A typed object bound to a backing document.

use core::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::bind::Bindable;
use crate::decl::{FieldDecl, Section, SectionDecl};
use crate::desc::Described;
use crate::driver::Driver;
use crate::error::{BindError, BindResult};
use crate::registry::TransformRegistry;
use crate::resolve::Resolver;
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// FieldState

/// Per-field bookkeeping recorded by the most recent update.
#[derive(Debug)]
pub struct FieldState {
    starting: Option<Box<dyn Bindable>>,
    hidden: bool,
}

impl FieldState {
    /// The value snapshotted at load time. For hidden fields this is what
    /// gets persisted instead of the live value.
    pub fn starting(&self) -> Option<&dyn Bindable> {
        self.starting.as_deref()
    }

    /// Whether an environment override replaced the live value. Hidden
    /// fields never leak their override into the saved document.
    pub fn hidden(&self) -> bool {
        self.hidden
    }
}

// -----------------------------------------------------------------------------
// Document

/// A section instance together with the document it loads from and saves
/// to.
///
/// The object side stays a plain value of `T`; the document side lives in
/// the driver. Updates move document values into the object, saves move
/// object values back. Both directions run through the registry the
/// document was created with and fail as a whole on the first field that
/// cannot resolve.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use docbind_core::derive::Bind;
/// use docbind_core::{BindResult, Document, MemoryDriver, TransformRegistry};
///
/// #[derive(Bind, Clone, Debug, Default, PartialEq)]
/// struct Net {
///     port: u16,
/// }
///
/// fn main() -> BindResult<()> {
///     let registry = Arc::new(TransformRegistry::with_defaults());
///     let mut document = Document::<Net>::new(registry, MemoryDriver::new())?;
///
///     document.load_str(r#"{"port": 9000}"#)?;
///     assert_eq!(document.object().port, 9000);
///
///     document.object_mut().port = 9001;
///     assert!(document.save_to_string()?.contains("9001"));
///     Ok(())
/// }
/// ```
pub struct Document<T: Section> {
    object: T,
    decl: &'static SectionDecl,
    registry: Arc<TransformRegistry>,
    driver: Box<dyn Driver>,
    path: Option<PathBuf>,
    states: IndexMap<String, FieldState>,
}

impl<T: Section> Document<T> {
    /// Binds a default-initialized `T` to a fresh driver.
    pub fn new(registry: Arc<TransformRegistry>, driver: impl Driver + 'static) -> BindResult<Self> {
        let decl = registry.section_decl_of::<T>()?;
        Ok(Self {
            object: T::default(),
            decl,
            registry,
            driver: Box::new(driver),
            path: None,
            states: IndexMap::new(),
        })
    }

    /// Attaches the file this document loads from and saves to.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    pub fn decl(&self) -> &'static SectionDecl {
        self.decl
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    pub fn object(&self) -> &T {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut T {
        &mut self.object
    }

    pub fn into_object(self) -> T {
        self.object
    }

    /// The bookkeeping of one field after the last update.
    pub fn field_state(&self, path: &str) -> Option<&FieldState> {
        self.states.get(path)
    }

    /// Loads the bound file if it exists, otherwise writes a fresh
    /// document with the declared defaults.
    pub fn initiate(&mut self) -> BindResult<()> {
        if self.save_defaults()? {
            return Ok(());
        }
        self.load()
    }

    /// Writes the declared defaults to the bound file, but only when the
    /// file does not exist yet. Returns whether a write happened.
    pub fn save_defaults(&mut self) -> BindResult<bool> {
        let path = self.path.clone().ok_or(BindError::NoPath)?;
        if path.exists() {
            return Ok(false);
        }
        tracing::debug!(
            section = self.decl.name(),
            path = %path.display(),
            "document file missing, writing defaults"
        );
        self.save()?;
        Ok(true)
    }

    /// Loads the bound file, updates the object and writes the document
    /// back. The write-back persists defaults for keys the file was
    /// missing and drops keys the migration sweep retired.
    pub fn load(&mut self) -> BindResult<()> {
        let path = self.path.clone().ok_or(BindError::NoPath)?;
        tracing::debug!(
            section = self.decl.name(),
            path = %path.display(),
            "loading document"
        );
        let mut file = fs::File::open(&path)?;
        self.load_reader(&mut file)?;
        self.save()
    }

    /// Loads from an arbitrary reader, without writing anything back.
    pub fn load_reader(&mut self, reader: &mut dyn std::io::Read) -> BindResult<()> {
        self.driver.load(reader)?;
        self.update()
    }

    /// Loads from an in-memory document.
    pub fn load_str(&mut self, text: &str) -> BindResult<()> {
        self.load_reader(&mut text.as_bytes())
    }

    /// Re-runs field resolution against the driver's current tree.
    pub fn update(&mut self) -> BindResult<()> {
        let resolver = Resolver::new(&self.registry);
        self.states = update_object(&mut self.object, self.decl, &mut *self.driver, &resolver)?;
        Ok(())
    }

    /// Writes the document to the bound file, creating parent directories
    /// as needed.
    pub fn save(&mut self) -> BindResult<()> {
        let path = self.path.clone().ok_or(BindError::NoPath)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::File::create(&path)?;
        self.save_writer(&mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Serializes every active field into the driver and renders the
    /// document.
    ///
    /// Hidden fields persist their starting value. A field the driver's
    /// validity hook rejects without an error fails the whole save.
    pub fn save_writer(&mut self, writer: &mut dyn Write) -> BindResult<()> {
        let decl = self.decl;
        let resolver = Resolver::new(&self.registry);

        for field in decl.active_fields() {
            let state = self.states.get(field.path());
            let serialized = if state.is_some_and(FieldState::hidden) {
                let starting = state.and_then(FieldState::starting);
                self.driver
                    .serialize_value(&resolver, starting, Some(field.desc()))?
            } else {
                let live = field.value(&self.object)?;
                self.driver
                    .serialize_value(&resolver, Some(live), Some(field.desc()))?
            };
            if !self.driver.is_valid(field.path(), &serialized) {
                return Err(BindError::Invalid {
                    driver: self.driver.name(),
                    path: field.path().to_owned(),
                });
            }
            self.driver.set_value(field.path(), serialized, Some(field))?;
        }
        self.driver.set_value(
            decl.version_key(),
            Value::Int(i64::from(decl.version())),
            None,
        )?;

        self.driver.write(writer, decl)
    }

    /// Renders the document into a string.
    pub fn save_to_string(&mut self) -> BindResult<String> {
        let mut out = Vec::new();
        self.save_writer(&mut out)?;
        String::from_utf8(out).map_err(|err| BindError::driver("document is not valid utf-8", err))
    }

    /// The typed value at `path`: the live object value for declared
    /// fields, the document value for anything else.
    pub fn get<V: Bindable + Described>(&self, path: &str) -> BindResult<Option<V>> {
        let resolver = Resolver::new(&self.registry);
        if let Some(field) = self.decl.field(path) {
            let live = field.value(&self.object)?;
            return resolver.deserialize_as::<V>(Some(live), None);
        }
        match self.driver.value(path) {
            Some(raw) => resolver.deserialize_as::<V>(Some(&raw), None),
            None => Ok(None),
        }
    }

    /// Stores a value at `path`. Declared fields update the object and
    /// the document together; undeclared paths only touch the document.
    pub fn set<V: Bindable + Described>(&mut self, path: &str, value: V) -> BindResult<()> {
        let decl = self.decl;
        let resolver = Resolver::new(&self.registry);
        match decl.field(path) {
            Some(field) => {
                let resolved = resolver
                    .deserialize(Some(&value), None, field.desc(), None)?
                    .ok_or_else(|| BindError::Unresolvable {
                        value: format!("{value:?}"),
                        source_type: value.desc().to_string(),
                        target_type: field.desc().to_string(),
                    })?;
                field.set_value(&mut self.object, resolved)?;
                let live = field.value(&self.object)?;
                let serialized =
                    self.driver
                        .serialize_value(&resolver, Some(live), Some(field.desc()))?;
                self.driver.set_value(path, serialized, Some(field))?;
            }
            None => {
                let serialized = self.driver.serialize_value(&resolver, Some(&value), None)?;
                self.driver.set_value(path, serialized, None)?;
            }
        }
        Ok(())
    }

    /// Whether `path` names a declared field or an existing document key.
    pub fn contains(&self, path: &str) -> bool {
        self.decl.field(path).is_some() || self.driver.path_exists(path)
    }

    /// Active field paths first, then document keys unknown to the
    /// schema. The version key never appears.
    pub fn keys(&self) -> Vec<String> {
        let decl = self.decl;
        let mut keys: Vec<String> = decl.active_fields().map(|f| f.path().to_owned()).collect();
        for key in self.driver.all_keys() {
            if key != decl.version_key() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Flattens the document into one map: active fields under their
    /// paths, followed by document keys unknown to the schema. The
    /// version key is excluded.
    pub fn as_map(&self, conservative: bool) -> BindResult<ValueMap> {
        let decl = self.decl;
        let resolver = Resolver::new(&self.registry);
        let mut out = ValueMap::new();
        for field in decl.active_fields() {
            let live = field.value(&self.object)?;
            out.insert(
                field.path().to_owned(),
                resolver.serialize(Some(live), Some(field.desc()), conservative)?,
            );
        }
        for key in self.driver.all_keys() {
            if key == decl.version_key() || out.contains_key(&key) {
                continue;
            }
            if let Some(value) = self.driver.value(&key) {
                out.insert(key, value);
            }
        }
        Ok(out)
    }
}

impl<T: Section> fmt::Debug for Document<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("section", &self.decl.name())
            .field("driver", &self.driver.name())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// The update walk

/// Resolves every field of `decl` from the driver's tree into `object`.
///
/// Runs the migration sweep first, then resolves each active field from
/// the document, merging over the value the object already holds. A
/// declared environment override replaces the live value, but the
/// document value still resolves and is recorded as the starting one, so
/// a later save restores it. The first failing field aborts the whole
/// update.
pub(crate) fn update_object(
    object: &mut dyn Bindable,
    decl: &'static SectionDecl,
    driver: &mut dyn Driver,
    resolver: &Resolver<'_>,
) -> BindResult<IndexMap<String, FieldState>> {
    let stored = stored_version(driver, decl);
    tracing::debug!(
        section = decl.name(),
        stored_version = stored,
        declared_version = decl.version(),
        "updating section"
    );

    for field in decl.migrated_fields() {
        if field.sweep(stored, decl.version(), object, driver)? {
            tracing::debug!(
                section = decl.name(),
                path = field.path(),
                tag = field.migration(),
                "retired key removed by migration sweep"
            );
        }
    }

    let mut states = IndexMap::new();
    for field in decl.active_fields() {
        let mut hidden = false;
        let previous = match apply_variable(object, field, resolver)? {
            Some(value) => {
                hidden = true;
                value
            }
            None => field.value(object)?.clone_boxed(),
        };

        if !driver.path_exists(field.path()) {
            tracing::trace!(path = field.path(), "key absent, keeping default");
            states.insert(
                field.path().to_owned(),
                FieldState {
                    starting: hidden.then_some(previous),
                    hidden,
                },
            );
            continue;
        }

        let raw = driver.value(field.path()).unwrap_or_default();
        if !driver.is_valid(field.path(), &raw) {
            return Err(BindError::Invalid {
                driver: driver.name(),
                path: field.path().to_owned(),
            });
        }
        let resolved = resolver.deserialize(Some(&raw), None, field.desc(), Some(&*previous))?;
        let state = match resolved {
            Some(value) => {
                tracing::trace!(path = field.path(), "field loaded from document");
                let starting = value.clone_boxed();
                if !hidden {
                    field.set_value(object, value)?;
                }
                FieldState {
                    starting: Some(starting),
                    hidden,
                }
            }
            None => FieldState {
                starting: hidden.then_some(previous),
                hidden,
            },
        };
        states.insert(field.path().to_owned(), state);
    }

    Ok(states)
}

/// Applies a declared environment override, if its variable is set.
///
/// Returns the value the field held before the override. It becomes the
/// fallback starting value when the document has nothing to resolve at
/// the field's path.
fn apply_variable(
    object: &mut dyn Bindable,
    field: &FieldDecl,
    resolver: &Resolver<'_>,
) -> BindResult<Option<Box<dyn Bindable>>> {
    let Some(name) = field.variable() else {
        return Ok(None);
    };
    let Ok(text) = std::env::var(name) else {
        return Ok(None);
    };

    let wrap = |source: BindError| BindError::Variable {
        name: name.to_owned(),
        path: field.path().to_owned(),
        source: Box::new(source),
    };

    let previous = field.value(object)?.clone_boxed();
    let resolved = resolver
        .deserialize(Some(&text), None, field.desc(), Some(&*previous))
        .map_err(wrap)?
        .ok_or_else(|| {
            wrap(BindError::Unresolvable {
                value: text.clone(),
                source_type: "String".to_owned(),
                target_type: field.desc().to_string(),
            })
        })?;
    field.set_value(object, resolved).map_err(wrap)?;
    tracing::trace!(path = field.path(), variable = name, "environment override applied");

    Ok(Some(previous))
}

/// The schema version stored in the tree. Documents without one count as
/// version 1.
fn stored_version(driver: &dyn Driver, decl: &SectionDecl) -> u32 {
    match driver.value(decl.version_key()) {
        Some(Value::Int(v)) => u32::try_from(v).unwrap_or(1),
        Some(Value::Str(text)) => text.trim().parse().unwrap_or(1),
        _ => 1,
    }
}

// -----------------------------------------------------------------------------
// Tests
