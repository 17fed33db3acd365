//! The generic resolution engine.
//!
//! Two mirrored walks: serialization lowers typed values into document
//! values, deserialization lifts document values back into typed ones.
//! Both dispatch on [`TypeDesc`] kinds and consult the registry for
//! everything they cannot do structurally.

mod de;
mod ser;

use crate::bind::{BindList, BindMap, Bindable};
use crate::desc::{Described, TypeDesc};
use crate::error::{BindError, BindResult};
use crate::registry::TransformRegistry;
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// Resolver

/// A borrowed view over a registry that runs the resolution walks.
///
/// Resolvers are cheap to create and carry no state of their own; every
/// conversion context builds one from the registry at hand.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'r> {
    registry: &'r TransformRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r TransformRegistry {
        self.registry
    }

    /// Lowers a typed value into a document value.
    ///
    /// In conservative mode scalars keep their native document form; in
    /// non-conservative mode everything convertible to text becomes text.
    /// `desc` refines the value's own classification, which matters for
    /// generic arguments the runtime value cannot know.
    pub fn serialize(
        &self,
        value: Option<&dyn Bindable>,
        desc: Option<&TypeDesc>,
        conservative: bool,
    ) -> BindResult<Value> {
        ser::serialize(self, value, desc, conservative)
    }

    /// Lowers every item of a list value.
    pub fn serialize_items(
        &self,
        items: &dyn BindList,
        item_desc: Option<&TypeDesc>,
        conservative: bool,
    ) -> BindResult<Vec<Value>> {
        ser::serialize_items(self, items, item_desc, conservative)
    }

    /// Lowers every entry of a map value. Keys become document keys and
    /// must lower to key-shaped scalars.
    pub fn serialize_entries(
        &self,
        entries: &dyn BindMap,
        key_desc: Option<&TypeDesc>,
        value_desc: Option<&TypeDesc>,
        conservative: bool,
    ) -> BindResult<ValueMap> {
        ser::serialize_entries(self, entries, key_desc, value_desc, conservative)
    }

    /// Lifts a document value into the target type.
    ///
    /// `source` overrides the value's own classification, `default` is the
    /// value the target held before and feeds default-aware conversions.
    /// `Ok(None)` means "no value": the input was absent, null, or every
    /// applicable conversion declined.
    pub fn deserialize(
        &self,
        value: Option<&dyn Bindable>,
        source: Option<&TypeDesc>,
        target: &TypeDesc,
        default: Option<&dyn Bindable>,
    ) -> BindResult<Option<Box<dyn Bindable>>> {
        de::deserialize(self, value, source, target, default)
    }

    /// Lifts a document value into `T`.
    pub fn deserialize_as<T: Bindable + Described>(
        &self,
        value: Option<&dyn Bindable>,
        default: Option<&T>,
    ) -> BindResult<Option<T>> {
        let target = <T as Described>::desc();
        let out = de::deserialize(
            self,
            value,
            None,
            &target,
            default.map(|d| d as &dyn Bindable),
        )?;
        match out {
            Some(boxed) => take_as::<T>(boxed).map(Some),
            None => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// Shared helpers

/// Unpacks a document scalar into its native boxed form.
///
/// Lists and maps stay wrapped; their shaped views walk the tree in
/// place.
pub(crate) fn unwrap_document_scalar(value: &dyn Bindable) -> Option<Box<dyn Bindable>> {
    match value.downcast_ref::<Value>()? {
        Value::Bool(v) => Some(Box::new(*v)),
        Value::Int(v) => Some(Box::new(*v)),
        Value::Float(v) => Some(Box::new(*v)),
        Value::Str(v) => Some(Box::new(v.clone())),
        _ => None,
    }
}

pub(crate) fn is_document_null(value: &dyn Bindable) -> bool {
    value.downcast_ref::<Value>().is_some_and(Value::is_null)
}

pub(crate) fn take_as<T: Bindable + Described>(value: Box<dyn Bindable>) -> BindResult<T> {
    value.take::<T>().map_err(|found| BindError::Mismatch {
        expected: <T as Described>::desc().name(),
        found: format!("{found:?}"),
    })
}

pub(crate) fn unresolvable(
    value: &dyn Bindable,
    source: &TypeDesc,
    target: &TypeDesc,
) -> BindError {
    BindError::Unresolvable {
        value: format!("{value:?}"),
        source_type: source.to_string(),
        target_type: target.to_string(),
    }
}

pub(crate) fn missing_sub(target: &TypeDesc, index: usize) -> BindError {
    BindError::MissingSubType {
        target: target.to_string(),
        index,
    }
}
