use core::any::TypeId;

use super::{Resolver, de, take_as, unwrap_document_scalar};
use crate::bind::{BindList, BindMap, Bindable};
use crate::data::DataBag;
use crate::desc::TypeDesc;
use crate::error::{BindError, BindResult};
use crate::impls::value_from_bindable;
use crate::registry::Transformer;
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// The serialization walk

/// Lowers a typed value into a document value.
///
/// Dispatch order matters and mirrors the deserialization walk: sections
/// and optionals are structural and always go first, object serializers
/// beat scalar handling so a serializer can claim a scalar-shaped type,
/// and transformers come last.
pub(crate) fn serialize(
    r: &Resolver<'_>,
    value: Option<&dyn Bindable>,
    desc: Option<&TypeDesc>,
    conservative: bool,
) -> BindResult<Value> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };

    // Document values short-circuit: conservative mode passes scalars
    // through untouched, everything else unwraps to its native form and
    // resolves like any other value.
    if let Some(doc) = value.downcast_ref::<Value>() {
        match doc {
            Value::Null => return Ok(Value::Null),
            Value::List(_) | Value::Map(_) => {}
            scalar if conservative => return Ok(scalar.clone()),
            _ => {}
        }
    }
    let unwrapped = unwrap_document_scalar(value);
    let value = unwrapped.as_deref().unwrap_or(value);

    let runtime = value.desc();
    if runtime.is_section() {
        return serialize_section(r, value, &runtime, conservative);
    }

    let effective = desc.filter(|d| !d.is::<Value>()).unwrap_or(&runtime);

    if let Some(optional) = value.as_optional() {
        return match optional {
            Some(inner) => serialize(r, Some(inner), effective.sub_type(0), conservative),
            None => Ok(Value::Null),
        };
    }

    if let Some(serializer) = r.registry().serializer_for(effective.id()) {
        let mut bag = DataBag::for_output(r);
        serializer.serialize(value, &mut bag)?;
        let raw = bag.into_output();
        if conservative {
            return Ok(Value::Map(raw));
        }
        let mut out = ValueMap::with_capacity(raw.len());
        for (key, entry) in raw {
            out.insert(key, serialize(r, Some(&entry), None, false)?);
        }
        return Ok(Value::Map(out));
    }

    if conservative && effective.is_scalar() {
        return value_from_bindable(value.clone_boxed());
    }

    if is_text_convertible(r, effective) {
        let text = de::deserialize(r, Some(value), Some(effective), &TypeDesc::of::<String>(), None)?;
        return Ok(match text {
            Some(text) => Value::Str(take_as::<String>(text)?),
            None => Value::Null,
        });
    }

    if let Some(transformer) = list_transformer(r, effective) {
        if let Some(lowered) = transformer.apply(value)? {
            return serialize(r, Some(&*lowered), Some(transformer.target()), conservative);
        }
    }

    if let Some(items) = value.as_list() {
        let lowered = serialize_items(r, items, effective.sub_type(0), conservative)?;
        return Ok(Value::List(lowered));
    }

    if let Some(entries) = value.as_map() {
        let lowered = serialize_entries(
            r,
            entries,
            effective.sub_type(0),
            effective.sub_type(1),
            conservative,
        )?;
        return Ok(Value::Map(lowered));
    }

    Err(BindError::Unserializable {
        type_name: effective.to_string(),
        value: format!("{value:?}"),
    })
}

pub(crate) fn serialize_items(
    r: &Resolver<'_>,
    items: &dyn BindList,
    item_desc: Option<&TypeDesc>,
    conservative: bool,
) -> BindResult<Vec<Value>> {
    let mut out = Vec::with_capacity(items.item_len());
    for item in items.items() {
        out.push(serialize(r, Some(item), item_desc, conservative)?);
    }
    Ok(out)
}

pub(crate) fn serialize_entries(
    r: &Resolver<'_>,
    entries: &dyn BindMap,
    key_desc: Option<&TypeDesc>,
    value_desc: Option<&TypeDesc>,
    conservative: bool,
) -> BindResult<ValueMap> {
    let mut out = ValueMap::with_capacity(entries.entry_len());
    for (key, entry) in entries.entries() {
        let key = match serialize(r, Some(key), key_desc, conservative)? {
            Value::Str(text) => text,
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            other => {
                return Err(BindError::Unserializable {
                    type_name: "document key".to_owned(),
                    value: other.to_string(),
                });
            }
        };
        out.insert(key, serialize(r, Some(entry), value_desc, conservative)?);
    }
    Ok(out)
}

/// A section lowers through its declaration: active fields only, in
/// declaration order, under their computed document keys.
fn serialize_section(
    r: &Resolver<'_>,
    value: &dyn Bindable,
    desc: &TypeDesc,
    conservative: bool,
) -> BindResult<Value> {
    let decl = r.registry().section_decl(desc)?;
    let mut out = ValueMap::new();
    for field in decl.active_fields() {
        let field_value = field.value(value)?;
        out.insert(
            field.path().to_owned(),
            serialize(r, Some(field_value), Some(field.desc()), conservative)?,
        );
    }
    Ok(Value::Map(out))
}

/// Whether non-conservative mode can render this type as text.
fn is_text_convertible(r: &Resolver<'_>, desc: &TypeDesc) -> bool {
    desc.is_string()
        || desc.is_enum()
        || r.registry()
            .transformer(desc.id(), TypeId::of::<String>())
            .is_some()
}

/// A transformer that lowers this type into a list-shaped one.
fn list_transformer<'a>(r: &'a Resolver<'_>, desc: &TypeDesc) -> Option<&'a Transformer> {
    r.registry()
        .transformers()
        .find(|t| t.source().id() == desc.id() && t.target().is_list())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::registry::{TransformRegistry, Transformer};
    use crate::resolve::Resolver;
    use crate::value::Value;

    #[test]
    fn conservative_keeps_scalars_native() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let out = resolver.serialize(Some(&42_i64), None, true).unwrap();
        assert_eq!(out, Value::Int(42));

        let out = resolver.serialize(Some(&true), None, true).unwrap();
        assert_eq!(out, Value::Bool(true));

        let out = resolver.serialize(None, None, true).unwrap();
        assert!(out.is_null());
    }

    #[test]
    fn non_conservative_renders_scalars_as_text() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let out = resolver.serialize(Some(&42_i64), None, false).unwrap();
        assert_eq!(out, Value::Str("42".to_owned()));

        let out = resolver
            .serialize(Some(&String::from("kept")), None, false)
            .unwrap();
        assert_eq!(out, Value::Str("kept".to_owned()));
    }

    #[test]
    fn document_scalars_pass_through_conservatively() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let doc = Value::Int(7);
        let out = resolver.serialize(Some(&doc), None, true).unwrap();
        assert_eq!(out, Value::Int(7));

        // Non-conservative mode unwraps and re-resolves.
        let out = resolver.serialize(Some(&doc), None, false).unwrap();
        assert_eq!(out, Value::Str("7".to_owned()));
    }

    #[test]
    fn lists_and_maps_lower_structurally() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let list = vec![1_i64, 2, 3];
        let out = resolver.serialize(Some(&list), None, true).unwrap();
        assert_eq!(
            out,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );

        let mut map = indexmap::IndexMap::new();
        map.insert(String::from("a"), 1_i64);
        map.insert(String::from("b"), 2_i64);
        let out = resolver.serialize(Some(&map), None, true).unwrap();
        let object = out.as_object().unwrap();
        assert_eq!(object.get("a"), Some(&Value::Int(1)));
        assert_eq!(object.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn integer_keys_become_document_keys() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let mut map = indexmap::IndexMap::new();
        map.insert(10_i64, String::from("ten"));
        let out = resolver.serialize(Some(&map), None, true).unwrap();
        let object = out.as_object().unwrap();
        assert_eq!(object.get("10"), Some(&Value::Str("ten".to_owned())));
    }

    #[test]
    fn custom_transformer_lowers_opaque_types() {
        use crate::bind::Bindable;
        use crate::desc::{Described, TypeDesc};

        #[derive(Clone, Debug, PartialEq)]
        struct Radius(f64);

        impl Described for Radius {
            fn desc() -> TypeDesc {
                TypeDesc::opaque::<Radius>("Radius")
            }
        }

        impl Bindable for Radius {
            fn desc(&self) -> TypeDesc {
                <Self as Described>::desc()
            }

            crate::bind::impl_bindable_shell!();
        }

        let mut registry = TransformRegistry::with_defaults();
        registry.register(Transformer::new(|r: &Radius| Some(format!("r={}", r.0))));
        let resolver = Resolver::new(&registry);

        let out = resolver.serialize(Some(&Radius(2.5)), None, true).unwrap();
        assert_eq!(out, Value::Str("r=2.5".to_owned()));
    }

    #[test]
    fn unconvertible_value_reports_unserializable() {
        use crate::bind::Bindable;
        use crate::desc::{Described, TypeDesc};

        #[derive(Clone, Debug)]
        struct Blob;

        impl Described for Blob {
            fn desc() -> TypeDesc {
                TypeDesc::opaque::<Blob>("Blob")
            }
        }

        impl Bindable for Blob {
            fn desc(&self) -> TypeDesc {
                <Self as Described>::desc()
            }

            crate::bind::impl_bindable_shell!();
        }

        let registry = TransformRegistry::empty();
        let resolver = Resolver::new(&registry);
        let err = resolver.serialize(Some(&Blob), None, true).unwrap_err();
        assert!(err.to_string().contains("Blob"));
    }
}
