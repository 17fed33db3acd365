use core::fmt;

use super::NamePolicy;
use crate::bind::Bindable;
use crate::desc::{DescKind, Described, TypeDesc};
use crate::driver::Driver;
use crate::error::{BindError, BindResult};

type GetFn = Box<dyn for<'a> Fn(&'a dyn Bindable) -> BindResult<&'a dyn Bindable> + Send + Sync>;
type SetFn = Box<dyn Fn(&mut dyn Bindable, Box<dyn Bindable>) -> BindResult<()> + Send + Sync>;

// -----------------------------------------------------------------------------
// FieldSpec

/// One field of a section, as declared.
///
/// Specs are produced by `#[derive(Bind)]` or built by hand; the registry
/// turns them into cached [`FieldDecl`]s. The accessor pair is taken as
/// plain functions so a spec stays buildable from non-capturing closures.
pub struct FieldSpec {
    name: &'static str,
    key: Option<&'static str>,
    comments: Vec<String>,
    migration: Option<u32>,
    variable: Option<String>,
    desc: TypeDesc,
    get: GetFn,
    set: SetFn,
}

impl FieldSpec {
    /// Declares a field of `O` holding an `F`, reachable through the given
    /// accessor pair.
    pub fn new<O, F>(name: &'static str, get: fn(&O) -> &F, set: fn(&mut O) -> &mut F) -> Self
    where
        O: Bindable,
        F: Bindable + Described,
    {
        Self {
            name,
            key: None,
            comments: Vec::new(),
            migration: None,
            variable: None,
            desc: <F as Described>::desc(),
            get: Box::new(move |object: &dyn Bindable| {
                let owner = object.downcast_ref::<O>().ok_or_else(|| owner_mismatch::<O>())?;
                Ok(get(owner) as &dyn Bindable)
            }),
            set: Box::new(move |object: &mut dyn Bindable, value: Box<dyn Bindable>| {
                let value = value
                    .take::<F>()
                    .map_err(|found| crate::impls::take_mismatch::<F>(&*found))?;
                let Some(owner) = object.downcast_mut::<O>() else {
                    return Err(owner_mismatch::<O>());
                };
                *set(owner) = value;
                Ok(())
            }),
        }
    }

    /// Overrides the computed document key with an explicit one.
    pub fn key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Adds one comment line above the field's document key.
    pub fn comment(mut self, line: impl Into<String>) -> Self {
        self.comments.push(line.into());
        self
    }

    /// Adds several comment lines at once.
    pub fn comments<I>(mut self, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.comments.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Tags the schema version at which this field's document key retires.
    pub fn migration(mut self, version: u32) -> Self {
        self.migration = Some(version);
        self
    }

    /// Names an environment variable that overrides this field at load
    /// time without leaking into the saved document.
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("desc", &self.desc.to_string())
            .finish_non_exhaustive()
    }
}

fn owner_mismatch<O>() -> BindError {
    BindError::Mismatch {
        expected: core::any::type_name::<O>(),
        found: String::from("a different section type"),
    }
}

// -----------------------------------------------------------------------------
// FieldDecl

/// A field with its document key computed. Built once per section type and
/// cached by the registry.
pub struct FieldDecl {
    path: String,
    name: &'static str,
    comments: Vec<String>,
    migration: Option<u32>,
    variable: Option<String>,
    desc: TypeDesc,
    get: GetFn,
    set: SetFn,
}

impl FieldDecl {
    pub(crate) fn from_spec(spec: FieldSpec, policy: &NamePolicy) -> Self {
        let path = match spec.key {
            Some(key) => key.to_owned(),
            None => policy.apply(spec.name),
        };
        Self {
            path,
            name: spec.name,
            comments: spec.comments,
            migration: spec.migration,
            variable: spec.variable,
            desc: spec.desc,
            get: spec.get,
            set: spec.set,
        }
    }

    /// The document key this field reads from and writes to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The declared field name, before key computation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn comment_lines(&self) -> &[String] {
        &self.comments
    }

    pub fn migration(&self) -> Option<u32> {
        self.migration
    }

    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    pub fn desc(&self) -> &TypeDesc {
        &self.desc
    }

    /// Borrows this field's value out of its owning section.
    pub fn value<'a>(&self, object: &'a dyn Bindable) -> BindResult<&'a dyn Bindable> {
        (self.get)(object)
    }

    /// Moves a value into this field of its owning section.
    pub fn set_value(&self, object: &mut dyn Bindable, value: Box<dyn Bindable>) -> BindResult<()> {
        (self.set)(object, value)
    }

    /// Whether a document at `version` has this field's key retired.
    pub fn is_migrated(&self, version: u32) -> bool {
        self.migration.is_some_and(|tag| version >= tag)
    }

    /// Resets an optional field to its empty state. Non-optional fields
    /// keep their value.
    pub(crate) fn clear_value(&self, object: &mut dyn Bindable) -> BindResult<bool> {
        let DescKind::Optional(meta) = self.desc.kind() else {
            return Ok(false);
        };
        (self.set)(object, (meta.none)())?;
        Ok(true)
    }

    /// The migration sweep for one field: when the loaded document's
    /// version predates this field's tag and the declared version has
    /// caught up, the stale key is dropped from the document and the
    /// in-memory value cleared. Runs before any fresh value is written,
    /// and only ever fires while the stale key still exists.
    pub(crate) fn sweep(
        &self,
        file_version: u32,
        current_version: u32,
        object: &mut dyn Bindable,
        driver: &mut dyn Driver,
    ) -> BindResult<bool> {
        let Some(tag) = self.migration else {
            return Ok(false);
        };
        if !(file_version < tag && tag <= current_version) {
            return Ok(false);
        }
        if !driver.path_exists(&self.path) {
            return Ok(false);
        }
        self.clear_value(object)?;
        driver.remove_value(&self.path);
        Ok(true)
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("migration", &self.migration)
            .field("variable", &self.variable)
            .field("desc", &self.desc.to_string())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{FieldDecl, FieldSpec};
    use crate::bind::Bindable;
    use crate::decl::{NameModifier, NamePolicy, NameStrategy};
    use crate::desc::{Described, TypeDesc};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Probe {
        retry_count: i64,
        label: String,
    }

    impl Described for Probe {
        fn desc() -> TypeDesc {
            TypeDesc::opaque::<Probe>("Probe")
        }
    }

    impl Bindable for Probe {
        fn desc(&self) -> TypeDesc {
            <Self as Described>::desc()
        }

        crate::bind::impl_bindable_shell!();
    }

    fn retry_count_field() -> FieldSpec {
        FieldSpec::new::<Probe, i64>(
            "retry_count",
            |probe| &probe.retry_count,
            |probe| &mut probe.retry_count,
        )
    }

    #[test]
    fn accessors_reach_through_the_erased_object() {
        let policy = NamePolicy::default();
        let decl = FieldDecl::from_spec(retry_count_field(), &policy);

        let mut probe = Probe {
            retry_count: 3,
            label: String::new(),
        };
        let value = decl.value(&probe).unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&3));

        decl.set_value(&mut probe, Box::new(9_i64)).unwrap();
        assert_eq!(probe.retry_count, 9);
    }

    #[test]
    fn set_rejects_a_value_of_the_wrong_type() {
        let decl = FieldDecl::from_spec(retry_count_field(), &NamePolicy::default());
        let mut probe = Probe::default();
        let err = decl
            .set_value(&mut probe, Box::new(String::from("three")))
            .unwrap_err();
        assert!(err.to_string().contains("i64"));
    }

    #[test]
    fn explicit_key_bypasses_the_policy() {
        let policy = NamePolicy::new(NameStrategy::Kebab, NameModifier::Uppercase);
        let decl = FieldDecl::from_spec(retry_count_field(), &policy);
        assert_eq!(decl.path(), "RETRY-COUNT");

        let decl = FieldDecl::from_spec(retry_count_field().key("retries"), &policy);
        assert_eq!(decl.path(), "retries");
    }

    #[test]
    fn migration_compares_against_the_tag() {
        let decl = FieldDecl::from_spec(retry_count_field().migration(3), &NamePolicy::default());
        assert!(!decl.is_migrated(2));
        assert!(decl.is_migrated(3));
        assert!(decl.is_migrated(7));

        let untagged = FieldDecl::from_spec(retry_count_field(), &NamePolicy::default());
        assert!(!untagged.is_migrated(u32::MAX));
    }
}
