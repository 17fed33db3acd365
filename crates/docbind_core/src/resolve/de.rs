use core::fmt;

use super::{Resolver, is_document_null, missing_sub, ser, unresolvable, unwrap_document_scalar};
use crate::bind::Bindable;
use crate::data::DataBag;
use crate::desc::{DescKind, EnumMeta, ScalarKind, SectionMeta, TypeDesc};
use crate::driver::MemoryDriver;
use crate::error::{BindError, BindResult};
use crate::value::{Value, ValueMap};

// -----------------------------------------------------------------------------
// The deserialization walk

pub(crate) fn deserialize(
    r: &Resolver<'_>,
    value: Option<&dyn Bindable>,
    source: Option<&TypeDesc>,
    target: &TypeDesc,
    default: Option<&dyn Bindable>,
) -> BindResult<Option<Box<dyn Bindable>>> {
    deserialize_inner(r, value, source, target, default, false)
}

/// One pass of the walk. `retried` marks the normalization pass, which may
/// run at most once per value to keep the recursion bounded.
fn deserialize_inner(
    r: &Resolver<'_>,
    value: Option<&dyn Bindable>,
    source: Option<&TypeDesc>,
    target: &TypeDesc,
    default: Option<&dyn Bindable>,
    retried: bool,
) -> BindResult<Option<Box<dyn Bindable>>> {
    let value = match value {
        Some(value) if !is_document_null(value) => value,
        _ => {
            // Absent input resolves optionals to their empty state and
            // leaves everything else to the caller's default handling.
            return Ok(match target.kind() {
                DescKind::Optional(meta) => Some((meta.none)()),
                _ => None,
            });
        }
    };

    if let DescKind::Optional(meta) = target.kind() {
        let inner_target = target.sub_type(0).ok_or_else(|| missing_sub(target, 0))?;
        let inner_default = default.and_then(Bindable::as_optional).flatten();
        return match deserialize_inner(r, Some(value), source, inner_target, inner_default, retried)? {
            Some(inner) => (meta.some)(inner).map(Some),
            None => Ok(Some((meta.none)())),
        };
    }

    // The concrete type may already match, either directly or after
    // unpacking a document scalar.
    if value.as_any().type_id() == target.id() {
        return Ok(Some(value.clone_boxed()));
    }
    let unwrapped = unwrap_document_scalar(value);
    let value = unwrapped.as_deref().unwrap_or(value);
    if unwrapped.is_some() && value.as_any().type_id() == target.id() {
        return Ok(Some(value.clone_boxed()));
    }

    let runtime = value.desc();
    let source = source.unwrap_or(&runtime);

    if let DescKind::Enum(meta) = target.kind() {
        if let Some(name) = value.downcast_ref::<String>() {
            return enum_from_name(target, meta, name).map(Some);
        }
    }

    if target.is::<String>() {
        if let DescKind::Enum(meta) = source.kind() {
            let name = (meta.name_of)(value).ok_or_else(|| BindError::Mismatch {
                expected: source.name(),
                found: format!("{value:?}"),
            })?;
            return Ok(Some(Box::new(name.to_owned())));
        }
    }

    if let DescKind::Section(meta) = target.kind() {
        if let Some(input) = document_map(value) {
            return section_from_value(r, input, target, meta).map(Some);
        }
    }

    if let Some(serializer) = r.registry().serializer_for(target.id()) {
        if let Some(input) = document_map(value) {
            let bag = DataBag::for_input(r, input);
            let out = match default {
                Some(previous) => serializer.deserialize_with_default(previous, &bag, target)?,
                None => serializer.deserialize(&bag, target)?,
            };
            if let Some(out) = out {
                return Ok(Some(out));
            }
        }
    }

    if let DescKind::List(meta) = target.kind() {
        if let Some(items) = value.as_list() {
            let item_target = target.sub_type(0).ok_or_else(|| missing_sub(target, 0))?;
            let mut resolved = Vec::with_capacity(items.item_len());
            for item in items.items() {
                let item = deserialize_inner(r, Some(item), None, item_target, None, false)?
                    .ok_or_else(|| unresolvable(item, &item.desc(), item_target))?;
                resolved.push(item);
            }
            return (meta.from_items)(resolved).map(Some);
        }
    }

    if let DescKind::Map(meta) = target.kind() {
        if let Some(entries) = value.as_map() {
            let key_target = target.sub_type(0).ok_or_else(|| missing_sub(target, 0))?;
            let value_target = target.sub_type(1).ok_or_else(|| missing_sub(target, 1))?;
            let mut resolved = Vec::with_capacity(entries.entry_len());
            for (key, entry) in entries.entries() {
                let key = deserialize_inner(r, Some(key), None, key_target, None, false)?
                    .ok_or_else(|| unresolvable(key, &key.desc(), key_target))?;
                let entry = deserialize_inner(r, Some(entry), None, value_target, None, false)?
                    .ok_or_else(|| unresolvable(entry, &entry.desc(), value_target))?;
                resolved.push((key, entry));
            }
            return (meta.from_pairs)(resolved).map(Some);
        }
    }

    if let Some(transformer) = r.registry().transformer(source.id(), target.id()) {
        if let Some(out) = transformer.apply_with_default(value, default)? {
            return Ok(Some(out));
        }
    }

    if let DescKind::Scalar(kind) = *target.kind() {
        if let Some(out) = scalar_convert(value, kind, target)? {
            return Ok(Some(out));
        }
    }

    // Last resort: lower the value to its document form once and walk
    // again. This covers chains like opaque type => text => number.
    if !retried {
        if let Ok(normalized) = ser::serialize(r, Some(value), None, true) {
            if !normalized.is_null() && value.downcast_ref::<Value>() != Some(&normalized) {
                match deserialize_inner(r, Some(&normalized), None, target, default, true) {
                    Ok(Some(out)) => return Ok(Some(out)),
                    Ok(None) | Err(BindError::Unresolvable { .. }) => {}
                    Err(other) => return Err(other),
                }
            }
        }
    }

    Err(unresolvable(value, source, target))
}

// -----------------------------------------------------------------------------
// Enum resolution

/// Exact name first, then a case-insensitive scan over the legal names.
fn enum_from_name(
    target: &TypeDesc,
    meta: &EnumMeta,
    name: &str,
) -> BindResult<Box<dyn Bindable>> {
    if let Some(value) = (meta.from_name)(name) {
        return Ok(value);
    }
    let trimmed = name.trim();
    for variant in meta.variants {
        if variant.eq_ignore_ascii_case(trimmed) {
            if let Some(value) = (meta.from_name)(variant) {
                return Ok(value);
            }
        }
    }
    Err(BindError::UnknownVariant {
        enum_name: target.name(),
        name: name.to_owned(),
        available: meta.variants.join(", "),
    })
}

// -----------------------------------------------------------------------------
// Section resolution

/// Rebuilds a nested section from a document map: a default instance is
/// updated against an in-memory view of the map, field by field.
fn section_from_value(
    r: &Resolver<'_>,
    input: ValueMap,
    target: &TypeDesc,
    meta: &SectionMeta,
) -> BindResult<Box<dyn Bindable>> {
    let decl = r.registry().section_decl(target)?;
    let mut instance = (meta.instance)();
    let mut driver = MemoryDriver::with_root(input);
    crate::document::update_object(&mut *instance, decl, &mut driver, r)?;
    Ok(instance)
}

fn document_map(value: &dyn Bindable) -> Option<ValueMap> {
    match value.downcast_ref::<Value>()? {
        Value::Map(map) => Some(map.clone()),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Scalar conversions

enum Num {
    Int(i64),
    Float(f64),
}

/// Structural conversions between scalar forms. Conversions that cannot
/// represent the value exactly fail loudly instead of rounding.
fn scalar_convert(
    value: &dyn Bindable,
    kind: ScalarKind,
    target: &TypeDesc,
) -> BindResult<Option<Box<dyn Bindable>>> {
    match kind {
        ScalarKind::Bool => return Ok(None),
        ScalarKind::Char => {
            let Some(text) = value.downcast_ref::<String>() else {
                return Ok(None);
            };
            let mut chars = text.chars();
            return Ok(match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Box::new(c)),
                _ => None,
            });
        }
        ScalarKind::Str => {
            let out = value
                .downcast_ref::<char>()
                .map(|c| Box::new(c.to_string()) as Box<dyn Bindable>);
            return Ok(out);
        }
        _ => {}
    }

    // u64 values beyond the signed range only ever fit a u64 target.
    if let Some(v) = value.downcast_ref::<u64>() {
        if i64::try_from(*v).is_err() {
            return if kind == ScalarKind::U64 {
                Ok(Some(Box::new(*v)))
            } else {
                Err(out_of_range(v, target))
            };
        }
    }

    let Some(num) = read_num(value) else {
        return Ok(None);
    };

    if kind.is_integer() {
        let whole = match num {
            Num::Int(v) => v,
            Num::Float(v) => float_to_int(v, target)?,
        };
        let out: Box<dyn Bindable> = match kind {
            ScalarKind::I8 => Box::new(checked::<i8>(whole, target)?),
            ScalarKind::I16 => Box::new(checked::<i16>(whole, target)?),
            ScalarKind::I32 => Box::new(checked::<i32>(whole, target)?),
            ScalarKind::I64 => Box::new(whole),
            ScalarKind::U8 => Box::new(checked::<u8>(whole, target)?),
            ScalarKind::U16 => Box::new(checked::<u16>(whole, target)?),
            ScalarKind::U32 => Box::new(checked::<u32>(whole, target)?),
            ScalarKind::U64 => Box::new(checked::<u64>(whole, target)?),
            _ => return Ok(None),
        };
        return Ok(Some(out));
    }

    let wide = match num {
        Num::Float(v) => v,
        Num::Int(v) => {
            // f64 holds integers exactly up to 2^53.
            if v.unsigned_abs() > (1_u64 << 53) {
                return Err(out_of_range(v, target));
            }
            v as f64
        }
    };
    match kind {
        ScalarKind::F64 => Ok(Some(Box::new(wide))),
        ScalarKind::F32 => {
            let narrowed = wide as f32;
            if wide.is_finite() && !narrowed.is_finite() {
                return Err(out_of_range(wide, target));
            }
            Ok(Some(Box::new(narrowed)))
        }
        _ => Ok(None),
    }
}

fn read_num(value: &dyn Bindable) -> Option<Num> {
    macro_rules! read_ints {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(Num::Int(i64::from(*v)));
                }
            )*
        };
    }
    read_ints!(i8, i16, i32, i64, u8, u16, u32);
    if let Some(v) = value.downcast_ref::<u64>() {
        return i64::try_from(*v).ok().map(Num::Int);
    }
    if let Some(v) = value.downcast_ref::<f32>() {
        return Some(Num::Float(f64::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<f64>() {
        return Some(Num::Float(*v));
    }
    None
}

fn float_to_int(v: f64, target: &TypeDesc) -> BindResult<i64> {
    // Exactly the f64 range whose truncation fits an i64.
    const RANGE_END: f64 = 9_223_372_036_854_775_808.0;
    if v.fract() != 0.0 || !(-RANGE_END..RANGE_END).contains(&v) {
        return Err(out_of_range(v, target));
    }
    Ok(v as i64)
}

fn checked<T: TryFrom<i64>>(v: i64, target: &TypeDesc) -> BindResult<T> {
    T::try_from(v).map_err(|_| out_of_range(v, target))
}

fn out_of_range(v: impl fmt::Display, target: &TypeDesc) -> BindError {
    BindError::Unresolvable {
        value: v.to_string(),
        source_type: "number".to_owned(),
        target_type: target.to_string(),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::bind::Bindable;
    use crate::desc::{Described, EnumMeta, TypeDesc};
    use crate::registry::{TransformRegistry, Transformer};
    use crate::resolve::Resolver;
    use crate::value::Value;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Tone {
        Soft,
        Loud,
        Harsh,
    }

    impl Tone {
        const VARIANTS: &'static [&'static str] = &["Soft", "Loud", "Harsh"];

        fn from_name(name: &str) -> Option<Box<dyn Bindable>> {
            let tone = match name {
                "Soft" => Tone::Soft,
                "Loud" => Tone::Loud,
                "Harsh" => Tone::Harsh,
                _ => return None,
            };
            Some(Box::new(tone))
        }

        fn name_of(value: &dyn Bindable) -> Option<&'static str> {
            value.downcast_ref::<Tone>().map(|tone| match tone {
                Tone::Soft => "Soft",
                Tone::Loud => "Loud",
                Tone::Harsh => "Harsh",
            })
        }
    }

    impl Described for Tone {
        fn desc() -> TypeDesc {
            TypeDesc::enumeration::<Tone>(
                "Tone",
                EnumMeta {
                    variants: Self::VARIANTS,
                    from_name: Self::from_name,
                    name_of: Self::name_of,
                },
            )
        }
    }

    impl Bindable for Tone {
        fn desc(&self) -> TypeDesc {
            <Self as Described>::desc()
        }

        crate::bind::impl_bindable_shell!();
    }

    fn resolve<T: Bindable + Described>(registry: &TransformRegistry, value: &dyn Bindable) -> Option<T> {
        Resolver::new(registry)
            .deserialize_as::<T>(Some(value), None)
            .unwrap()
    }

    #[test]
    fn matching_type_passes_through() {
        let registry = TransformRegistry::empty();
        let out = resolve::<String>(&registry, &String::from("kept")).unwrap();
        assert_eq!(out, "kept");
    }

    #[test]
    fn document_scalars_unwrap_to_their_native_type() {
        let registry = TransformRegistry::empty();
        let out = resolve::<i64>(&registry, &Value::Int(9)).unwrap();
        assert_eq!(out, 9);
    }

    #[test]
    fn text_parses_through_the_default_pack() {
        let registry = TransformRegistry::with_defaults();
        let out = resolve::<i32>(&registry, &Value::Str("  42 ".to_owned())).unwrap();
        assert_eq!(out, 42);
        let out = resolve::<bool>(&registry, &Value::Str("TRUE".to_owned())).unwrap();
        assert!(out);
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        let registry = TransformRegistry::empty();
        let resolver = Resolver::new(&registry);

        let out = resolver
            .deserialize_as::<u16>(Some(&Value::Int(300)), None)
            .unwrap();
        assert_eq!(out, Some(300));

        let err = resolver
            .deserialize_as::<u16>(Some(&Value::Int(70_000)), None)
            .unwrap_err();
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn floats_only_become_integers_when_whole() {
        let registry = TransformRegistry::empty();
        let resolver = Resolver::new(&registry);

        let out = resolver
            .deserialize_as::<i64>(Some(&Value::Float(3.0)), None)
            .unwrap();
        assert_eq!(out, Some(3));

        assert!(
            resolver
                .deserialize_as::<i64>(Some(&Value::Float(3.5)), None)
                .is_err()
        );
    }

    #[test]
    fn enum_names_match_case_insensitively() {
        let registry = TransformRegistry::empty();
        assert_eq!(
            resolve::<Tone>(&registry, &Value::Str("Loud".to_owned())),
            Some(Tone::Loud)
        );
        assert_eq!(
            resolve::<Tone>(&registry, &Value::Str("  harsh ".to_owned())),
            Some(Tone::Harsh)
        );
    }

    #[test]
    fn unknown_enum_name_lists_the_variants() {
        let registry = TransformRegistry::empty();
        let err = Resolver::new(&registry)
            .deserialize_as::<Tone>(Some(&Value::Str("Screaming".to_owned())), None)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Screaming"));
        assert!(text.contains("Soft, Loud, Harsh"));
    }

    #[test]
    fn enums_render_back_to_their_name() {
        let registry = TransformRegistry::empty();
        let out = resolve::<String>(&registry, &Tone::Soft).unwrap();
        assert_eq!(out, "Soft");
    }

    #[test]
    fn optionals_absorb_null_and_wrap_values() {
        let registry = TransformRegistry::with_defaults();
        let resolver = Resolver::new(&registry);

        let out = resolver
            .deserialize_as::<Option<i64>>(Some(&Value::Null), None)
            .unwrap();
        assert_eq!(out, Some(None));

        let out = resolver
            .deserialize_as::<Option<i64>>(Some(&Value::Int(5)), None)
            .unwrap();
        assert_eq!(out, Some(Some(5)));

        let out = resolver.deserialize_as::<i64>(None, None).unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn document_lists_fill_typed_vecs() {
        let registry = TransformRegistry::with_defaults();
        let doc = Value::List(vec![Value::Int(1), Value::Str("2".to_owned()), Value::Int(3)]);
        let out = resolve::<Vec<i64>>(&registry, &doc).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn document_maps_fill_typed_maps() {
        let registry = TransformRegistry::with_defaults();
        let mut root = crate::value::ValueMap::new();
        root.insert("alpha".to_owned(), Value::Int(1));
        root.insert("beta".to_owned(), Value::Int(2));

        let out = resolve::<IndexMap<String, i64>>(&registry, &Value::Map(root)).unwrap();
        assert_eq!(out.get("alpha"), Some(&1));
        assert_eq!(out.get("beta"), Some(&2));
        assert_eq!(out.get_index(0).map(|(k, _)| k.as_str()), Some("alpha"));
    }

    #[test]
    fn normalization_bridges_two_conversion_hops() {
        #[derive(Clone, Debug, PartialEq)]
        struct Port(u16);

        impl Described for Port {
            fn desc() -> TypeDesc {
                TypeDesc::opaque::<Port>("Port")
            }
        }

        impl Bindable for Port {
            fn desc(&self) -> TypeDesc {
                <Self as Described>::desc()
            }

            crate::bind::impl_bindable_shell!();
        }

        let mut registry = TransformRegistry::with_defaults();
        registry.register(Transformer::new(|port: &Port| Some(port.0.to_string())));

        // No Port => i64 transformer exists; the engine lowers Port to its
        // text form and parses that.
        let out = resolve::<i64>(&registry, &Port(8080)).unwrap();
        assert_eq!(out, 8080);
    }

    #[test]
    fn values_keep_their_form_when_the_target_is_a_value() {
        let registry = TransformRegistry::empty();
        let doc = Value::List(vec![Value::Int(1)]);
        let out = resolve::<Value>(&registry, &doc).unwrap();
        assert_eq!(out, doc);
    }
}
