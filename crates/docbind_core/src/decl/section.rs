use core::any::TypeId;
use core::fmt;

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::{FieldDecl, FieldSpec, NamePolicy};
use crate::bind::Bindable;
use crate::desc::Described;
use crate::error::{BindError, BindResult};

/// Document key holding a section's schema version.
pub const DEFAULT_VERSION_KEY: &str = "schema-version";

// -----------------------------------------------------------------------------
// Section

/// A type that maps to a document section.
///
/// Implemented by `#[derive(Bind)]`. The spec describes the fields once;
/// the registry builds and caches the declaration behind it.
pub trait Section: Bindable + Described + Default + Clone {
    fn spec() -> SectionSpec;
}

// -----------------------------------------------------------------------------
// SectionSpec

/// The declared shape of a section, before key computation.
pub struct SectionSpec {
    name: &'static str,
    version: u32,
    version_key: &'static str,
    header: Vec<String>,
    policy: NamePolicy,
    fields: Vec<FieldSpec>,
}

impl SectionSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            version: 1,
            version_key: DEFAULT_VERSION_KEY,
            header: Vec::new(),
            policy: NamePolicy::default(),
            fields: Vec::new(),
        }
    }

    /// Declares the current schema version. Documents without a stored
    /// version count as version 1.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Overrides the key the schema version is stored under.
    pub fn version_key(mut self, key: &'static str) -> Self {
        self.version_key = key;
        self
    }

    /// Adds one header comment line above the whole document.
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.header.push(line.into());
        self
    }

    /// Sets the key-computation policy for every field without an
    /// explicit key.
    pub fn naming(mut self, policy: NamePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared_version(&self) -> u32 {
        self.version
    }

    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    pub fn header_lines(&self) -> &[String] {
        &self.header
    }
}

impl fmt::Debug for SectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionSpec")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// SectionDecl

/// The built, cached declaration of one section type.
///
/// Fields are keyed by their computed document path, in declaration
/// order. A path collision between a migration-tagged and an untagged
/// field resolves in favor of the untagged one; the tagged declaration
/// moves to the retired set and only participates in the migration
/// sweep. Any other collision fails the build.
pub struct SectionDecl {
    id: TypeId,
    name: &'static str,
    version: u32,
    version_key: &'static str,
    header: Vec<String>,
    fields: IndexMap<String, FieldDecl>,
    retired: Vec<FieldDecl>,
}

impl SectionDecl {
    /// Builds an owned declaration from a section descriptor.
    ///
    /// Registries cache built declarations per type; this constructor is
    /// for code that only holds a descriptor, such as document backends
    /// descending into nested sections.
    pub fn of(desc: &crate::desc::TypeDesc) -> BindResult<Self> {
        let crate::desc::DescKind::Section(meta) = desc.kind() else {
            return Err(BindError::Mismatch {
                expected: "a section descriptor",
                found: desc.to_string(),
            });
        };
        Self::build(desc.id(), (meta.spec)())
    }

    pub(crate) fn build(id: TypeId, spec: SectionSpec) -> BindResult<Self> {
        let policy = spec.policy;
        let mut fields: IndexMap<String, FieldDecl> = IndexMap::with_capacity(spec.fields.len());
        let mut retired = Vec::new();

        for field in spec.fields {
            let decl = FieldDecl::from_spec(field, &policy);
            if decl.path() == spec.version_key {
                return Err(BindError::DuplicatePath {
                    section: spec.name,
                    path: decl.path().to_owned(),
                });
            }
            match fields.entry(decl.path().to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert(decl);
                }
                Entry::Occupied(mut slot) => {
                    let kept_tagged = slot.get().migration().is_some();
                    match (kept_tagged, decl.migration().is_some()) {
                        (true, false) => retired.push(slot.insert(decl)),
                        (false, true) => retired.push(decl),
                        _ => {
                            return Err(BindError::DuplicatePath {
                                section: spec.name,
                                path: slot.key().clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(Self {
            id,
            name: spec.name,
            version: spec.version,
            version_key: spec.version_key,
            header: spec.header,
            fields,
            retired,
        })
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared schema version of this section type.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn version_key(&self) -> &'static str {
        self.version_key
    }

    pub fn header_lines(&self) -> &[String] {
        &self.header
    }

    /// Every path-owning field, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values()
    }

    pub fn field(&self, path: &str) -> Option<&FieldDecl> {
        self.fields.get(path)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields that still live in the current schema. These load and save.
    pub fn active_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields
            .values()
            .filter(|field| !field.is_migrated(self.version))
    }

    /// Fields already folded into the current schema. These only take
    /// part in the migration sweep.
    pub fn migrated_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.retired.iter().chain(
            self.fields
                .values()
                .filter(|field| field.is_migrated(self.version)),
        )
    }
}

impl fmt::Debug for SectionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionDecl")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("retired", &self.retired.len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::{SectionDecl, SectionSpec};
    use crate::bind::Bindable;
    use crate::decl::FieldSpec;
    use crate::desc::{Described, TypeDesc};

    #[derive(Clone, Debug, Default)]
    struct Sample {
        first: i64,
        second: i64,
    }

    impl Described for Sample {
        fn desc() -> TypeDesc {
            TypeDesc::opaque::<Sample>("Sample")
        }
    }

    impl Bindable for Sample {
        fn desc(&self) -> TypeDesc {
            <Self as Described>::desc()
        }

        crate::bind::impl_bindable_shell!();
    }

    fn field(name: &'static str) -> FieldSpec {
        FieldSpec::new::<Sample, i64>(name, |s| &s.first, |s| &mut s.first)
    }

    fn second_field(name: &'static str) -> FieldSpec {
        FieldSpec::new::<Sample, i64>(name, |s| &s.second, |s| &mut s.second)
    }

    fn build(spec: SectionSpec) -> crate::error::BindResult<SectionDecl> {
        SectionDecl::build(TypeId::of::<Sample>(), spec)
    }

    #[test]
    fn fields_keep_declaration_order() {
        let decl = build(
            SectionSpec::new("Sample")
                .field(field("beta"))
                .field(second_field("alpha")),
        )
        .unwrap();
        let keys: Vec<_> = decl.keys().collect();
        assert_eq!(keys, ["beta", "alpha"]);
    }

    #[test]
    fn duplicate_paths_without_a_tag_fail() {
        let err = build(
            SectionSpec::new("Sample")
                .field(field("same"))
                .field(second_field("same")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("same"));
    }

    #[test]
    fn tagged_collision_retires_the_tagged_field() {
        // Declaration order must not matter.
        for tagged_first in [true, false] {
            let (a, b) = if tagged_first {
                (field("same").migration(2), second_field("same"))
            } else {
                (field("same"), second_field("same").migration(2))
            };
            let decl = build(SectionSpec::new("Sample").version(3).field(a).field(b)).unwrap();

            assert_eq!(decl.field_count(), 1);
            assert!(decl.field("same").unwrap().migration().is_none());
            let retired: Vec<_> = decl.migrated_fields().collect();
            assert_eq!(retired.len(), 1);
            assert_eq!(retired[0].migration(), Some(2));
        }
    }

    #[test]
    fn version_key_collision_fails() {
        let err = build(
            SectionSpec::new("Sample")
                .version_key("meta")
                .field(field("meta")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("meta"));
    }

    #[test]
    fn partition_follows_the_declared_version() {
        let decl = build(
            SectionSpec::new("Sample")
                .version(4)
                .field(field("fresh").migration(5))
                .field(second_field("folded").migration(3)),
        )
        .unwrap();

        let active: Vec<_> = decl.active_fields().map(|f| f.path().to_owned()).collect();
        assert_eq!(active, ["fresh"]);
        let migrated: Vec<_> = decl.migrated_fields().map(|f| f.path().to_owned()).collect();
        assert_eq!(migrated, ["folded"]);
    }
}
