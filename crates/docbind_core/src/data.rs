use core::fmt;

use crate::bind::Bindable;
use crate::desc::Described;
use crate::error::BindResult;
use crate::resolve::Resolver;
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// DataBag

/// The keyed view an [`ObjectSerializer`] reads from and writes to.
///
/// Values added to the bag are serialized conservatively through the
/// resolver right away, so the output side always holds plain document
/// values. Reads resolve document values back into the requested type.
///
/// [`ObjectSerializer`]: crate::serializer::ObjectSerializer
pub struct DataBag<'r> {
    resolver: &'r Resolver<'r>,
    input: Option<ValueMap>,
    output: ValueMap,
}

impl<'r> DataBag<'r> {
    pub(crate) fn for_output(resolver: &'r Resolver<'r>) -> Self {
        Self {
            resolver,
            input: None,
            output: ValueMap::new(),
        }
    }

    pub(crate) fn for_input(resolver: &'r Resolver<'r>, input: ValueMap) -> Self {
        Self {
            resolver,
            input: Some(input),
            output: ValueMap::new(),
        }
    }

    /// The resolver this bag converts through.
    pub fn resolver(&self) -> &Resolver<'r> {
        self.resolver
    }

    /// Serializes `value` and stores it under `key`.
    pub fn add<T: Bindable + Described>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> BindResult<()> {
        let desc = <T as Described>::desc();
        let serialized = self.resolver.serialize(Some(value), Some(&desc), true)?;
        self.output.insert(key.into(), serialized);
        Ok(())
    }

    /// Stores an already-lowered document value under `key`.
    pub fn add_value(&mut self, key: impl Into<String>, value: Value) {
        self.output.insert(key.into(), value);
    }

    /// Stores formatted text under `key`.
    pub fn add_formatted(&mut self, key: impl Into<String>, args: fmt::Arguments<'_>) {
        self.output.insert(key.into(), Value::Str(args.to_string()));
    }

    /// Resolves the value under `key` into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent or the conversion
    /// declines.
    pub fn get<T: Bindable + Described>(&self, key: &str) -> BindResult<Option<T>> {
        let Some(raw) = self.raw(key) else {
            return Ok(None);
        };
        self.resolver
            .deserialize_as::<T>(Some(raw as &dyn Bindable), None)
    }

    /// Resolves the value under `key` into `T`, falling back to `default`
    /// when the key is absent or the conversion declines.
    pub fn get_or<T: Bindable + Described + Clone>(
        &self,
        key: &str,
        default: &T,
    ) -> BindResult<T> {
        let Some(raw) = self.raw(key) else {
            return Ok(default.clone());
        };
        let out = self
            .resolver
            .deserialize_as::<T>(Some(raw as &dyn Bindable), Some(default))?;
        Ok(out.unwrap_or_else(|| default.clone()))
    }

    /// The raw document value under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.input.as_ref().and_then(|map| map.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some() || self.output.contains_key(key)
    }

    /// The keys of the side this bag currently reads from.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        match &self.input {
            Some(input) => either_keys(input),
            None => either_keys(&self.output),
        }
    }

    pub(crate) fn into_output(self) -> ValueMap {
        self.output
    }
}

fn either_keys(map: &ValueMap) -> impl Iterator<Item = &str> {
    map.keys().map(String::as_str)
}

// -----------------------------------------------------------------------------
// Tests
