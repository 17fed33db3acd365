use core::any::TypeId;
use core::fmt;
use std::sync::{PoisonError, RwLock};

use docbind_utils::TypeIdMap;
use docbind_utils::hash::HashMap;

use super::{TransformPack, Transformer, default_pack, extras_pack};
use crate::decl::{Section, SectionDecl, SectionSpec};
use crate::desc::{DescKind, TypeDesc};
use crate::error::{BindError, BindResult};
use crate::serializer::ObjectSerializer;

// -----------------------------------------------------------------------------
// TransformRegistry

/// Holds every conversion the resolution engine may use, plus the cache of
/// built section declarations.
///
/// Transformers are keyed by their exact source and target type pair; a
/// later registration for the same pair replaces the earlier one. Object
/// serializers are probed newest-first, so the serializer registered last
/// for a type wins.
///
/// The registry is passed explicitly to resolvers and documents. Two
/// registries never share state.
///
/// # Examples
///
/// ```
/// use docbind_core::{Resolver, TransformRegistry, Transformer};
///
/// let mut registry = TransformRegistry::with_defaults();
/// registry.register(Transformer::new(|b: &bool| Some(i64::from(*b))));
///
/// let resolver = Resolver::new(&registry);
/// let out = resolver.deserialize_as::<i64>(Some(&true), None)?;
/// assert_eq!(out, Some(1));
/// # Ok::<(), docbind_core::BindError>(())
/// ```
pub struct TransformRegistry {
    transformers: HashMap<(TypeId, TypeId), Transformer>,
    serializers: Vec<Box<dyn ObjectSerializer>>,
    decls: RwLock<TypeIdMap<&'static SectionDecl>>,
}

impl TransformRegistry {
    /// A registry without any conversions at all.
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::default(),
            serializers: Vec::new(),
            decls: RwLock::new(TypeIdMap::new()),
        }
    }

    /// A registry with the built-in packs, plus every pack submitted
    /// through `submit_pack!` when the `auto_register` feature is on.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        default_pack(&mut registry);
        extras_pack(&mut registry);

        #[cfg(feature = "auto_register")]
        for entry in inventory::iter::<super::PackEntry> {
            (entry.register)(&mut registry);
        }

        registry
    }

    /// Registers a transformer, replacing any earlier one for the same
    /// source and target pair.
    pub fn register(&mut self, transformer: Transformer) {
        self.transformers.insert(transformer.key(), transformer);
    }

    /// Registers both directions of a conversion pair.
    pub fn register_pair(&mut self, pair: (Transformer, Transformer)) {
        self.register(pair.0);
        self.register(pair.1);
    }

    /// Registers an object serializer. The newest registration for a
    /// supported type takes precedence.
    pub fn register_serializer<S: ObjectSerializer + 'static>(&mut self, serializer: S) {
        self.serializers.push(Box::new(serializer));
    }

    /// Lets a pack register its conversions.
    pub fn add_pack(&mut self, pack: &dyn TransformPack) {
        pack.register(self);
    }

    /// Builder-style variant of [`add_pack`](Self::add_pack).
    pub fn with_pack(mut self, pack: impl TransformPack) -> Self {
        pack.register(&mut self);
        self
    }

    /// The transformer for an exact source and target pair.
    pub fn transformer(&self, source: TypeId, target: TypeId) -> Option<&Transformer> {
        self.transformers.get(&(source, target))
    }

    /// All registered transformers, in no particular order.
    pub(crate) fn transformers(&self) -> impl Iterator<Item = &Transformer> {
        self.transformers.values()
    }

    /// The newest serializer claiming the given type.
    pub fn serializer_for(&self, id: TypeId) -> Option<&dyn ObjectSerializer> {
        self.serializers
            .iter()
            .rev()
            .find(|s| s.supports(id))
            .map(|s| &**s)
    }

    pub fn transformer_count(&self) -> usize {
        self.transformers.len()
    }

    pub fn serializer_count(&self) -> usize {
        self.serializers.len()
    }

    /// The built declaration of section type `T`.
    ///
    /// Declarations are built once per registry and cached; every caller
    /// sees the same instance. Build failures are returned and not cached.
    pub fn section_decl_of<T: Section>(&self) -> BindResult<&'static SectionDecl> {
        self.build_decl(TypeId::of::<T>(), T::spec)
    }

    /// The built declaration behind a section descriptor.
    pub(crate) fn section_decl(&self, desc: &TypeDesc) -> BindResult<&'static SectionDecl> {
        let DescKind::Section(meta) = desc.kind() else {
            return Err(BindError::Mismatch {
                expected: "a section descriptor",
                found: desc.to_string(),
            });
        };
        self.build_decl(desc.id(), meta.spec)
    }

    fn build_decl(
        &self,
        id: TypeId,
        spec: impl FnOnce() -> SectionSpec,
    ) -> BindResult<&'static SectionDecl> {
        let cached = self
            .decls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied();
        if let Some(decl) = cached {
            return Ok(decl);
        }

        // Built outside the lock; a racing build of the same section loses
        // and leaks one spare declaration.
        let built: &'static SectionDecl = Box::leak(Box::new(SectionDecl::build(id, spec())?));

        let mut decls = self.decls.write().unwrap_or_else(PoisonError::into_inner);
        Ok(*decls.get_or_insert(id, || built))
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transformers", &self.transformers.len())
            .field("serializers", &self.serializers.len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::TransformRegistry;
    use crate::registry::Transformer;

    #[test]
    fn later_registration_replaces_the_pair() {
        let mut registry = TransformRegistry::empty();
        registry.register(Transformer::new(|_: &String| Some(1_i64)));
        registry.register(Transformer::new(|_: &String| Some(2_i64)));

        assert_eq!(registry.transformer_count(), 1);
        let t = registry
            .transformer(TypeId::of::<String>(), TypeId::of::<i64>())
            .unwrap();
        let out = t.apply(&String::from("x")).unwrap().unwrap();
        assert_eq!(out.take::<i64>().unwrap(), 2);
    }

    #[test]
    fn missing_pair_is_none() {
        let registry = TransformRegistry::empty();
        assert!(
            registry
                .transformer(TypeId::of::<String>(), TypeId::of::<i64>())
                .is_none()
        );
    }

    #[test]
    fn defaults_cover_the_scalar_pairs() {
        let registry = TransformRegistry::with_defaults();
        assert!(
            registry
                .transformer(TypeId::of::<String>(), TypeId::of::<i32>())
                .is_some()
        );
        assert!(
            registry
                .transformer(TypeId::of::<i32>(), TypeId::of::<String>())
                .is_some()
        );
    }
}
