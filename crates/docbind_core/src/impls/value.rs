use crate::bind::{BindList, BindMap, Bindable, impl_bindable_shell};
use crate::desc::{Described, ListMeta, MapMeta, TypeDesc};
use crate::error::{BindError, BindResult};
use crate::value::Value;

// -----------------------------------------------------------------------------
// Conversion back into document values

/// Repacks an engine value into a document value without consulting the
/// registry. Only values that already have a native document shape fit.
pub(crate) fn value_from_bindable(value: Box<dyn Bindable>) -> BindResult<Value> {
    macro_rules! try_take {
        ($value:ident, $($ty:ty => $wrap:expr),* $(,)?) => {
            $(
                let $value = match $value.take::<$ty>() {
                    Ok(inner) => return Ok($wrap(inner)),
                    Err($value) => $value,
                };
            )*
        };
    }

    try_take! { value,
        Value => |v| v,
        bool => Value::Bool,
        i8 => |v: i8| Value::Int(v as i64),
        i16 => |v: i16| Value::Int(v as i64),
        i32 => |v: i32| Value::Int(v as i64),
        i64 => Value::Int,
        u8 => |v: u8| Value::Int(v as i64),
        u16 => |v: u16| Value::Int(v as i64),
        u32 => |v: u32| Value::Int(v as i64),
        f32 => |v: f32| Value::Float(v as f64),
        f64 => Value::Float,
        char => |v: char| Value::Str(v.to_string()),
        String => Value::Str,
    }

    let value = match value.take::<u64>() {
        Ok(v) => {
            return i64::try_from(v).map(Value::Int).map_err(|_| {
                BindError::Unserializable {
                    type_name: "u64".into(),
                    value: v.to_string(),
                }
            });
        }
        Err(value) => value,
    };

    Err(BindError::Unserializable {
        type_name: "value".into(),
        value: format!("{value:?}"),
    })
}

fn value_list_from_items(items: Vec<Box<dyn Bindable>>) -> BindResult<Box<dyn Bindable>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(value_from_bindable(item)?);
    }
    Ok(Box::new(Value::List(out)))
}

fn value_map_from_pairs(
    pairs: Vec<(Box<dyn Bindable>, Box<dyn Bindable>)>,
) -> BindResult<Box<dyn Bindable>> {
    let mut out = crate::value::ValueMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        let key = match value_from_bindable(key)? {
            Value::Str(text) => text,
            other => other.to_string(),
        };
        out.insert(key, value_from_bindable(value)?);
    }
    Ok(Box::new(Value::Map(out)))
}

// -----------------------------------------------------------------------------
// Value as an engine citizen

impl Described for Value {
    fn desc() -> TypeDesc {
        TypeDesc::opaque::<Value>("Value")
    }
}

impl Bindable for Value {
    /// Document values classify by their runtime variant, the way a typed
    /// value classifies by its static type.
    fn desc(&self) -> TypeDesc {
        match self {
            Value::Null => <Value as Described>::desc(),
            Value::Bool(_) => <bool as Described>::desc(),
            Value::Int(_) => <i64 as Described>::desc(),
            Value::Float(_) => <f64 as Described>::desc(),
            Value::Str(_) => <String as Described>::desc(),
            Value::List(_) => TypeDesc::new::<Value>(
                "Value::List",
                crate::desc::DescKind::List(ListMeta {
                    from_items: value_list_from_items,
                }),
            ),
            Value::Map(_) => TypeDesc::new::<Value>(
                "Value::Map",
                crate::desc::DescKind::Map(MapMeta {
                    from_pairs: value_map_from_pairs,
                }),
            ),
        }
    }

    fn as_list(&self) -> Option<&dyn BindList> {
        match self {
            Value::List(_) => Some(self),
            _ => None,
        }
    }

    fn as_map(&self) -> Option<&dyn BindMap> {
        match self {
            Value::Map(_) => Some(self),
            _ => None,
        }
    }

    impl_bindable_shell!();
}

impl BindList for Value {
    fn item_len(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            _ => 0,
        }
    }

    fn items(&self) -> Box<dyn Iterator<Item = &dyn Bindable> + '_> {
        match self {
            Value::List(items) => Box::new(items.iter().map(|item| item as &dyn Bindable)),
            _ => Box::new(core::iter::empty()),
        }
    }
}

impl BindMap for Value {
    fn entry_len(&self) -> usize {
        match self {
            Value::Map(entries) => entries.len(),
            _ => 0,
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&dyn Bindable, &dyn Bindable)> + '_> {
        match self {
            Value::Map(entries) => Box::new(
                entries
                    .iter()
                    .map(|(key, value)| (key as &dyn Bindable, value as &dyn Bindable)),
            ),
            _ => Box::new(core::iter::empty()),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::value_from_bindable;
    use crate::bind::Bindable;
    use crate::value::Value;

    #[test]
    fn variants_classify_like_their_native_types() {
        assert!(Value::Int(1).desc().is::<i64>());
        assert!(Value::Str("x".into()).desc().is::<String>());
        assert!(Value::Bool(true).desc().is::<bool>());
        assert!(Value::Float(1.5).desc().is::<f64>());
        assert!(Value::List(vec![]).desc().is_list());
        assert!(Value::Map(Default::default()).desc().is_map());
    }

    #[test]
    fn shaped_views_only_open_for_matching_variants() {
        let list = Value::List(vec![Value::Int(1)]);
        assert!(list.as_list().is_some());
        assert!(list.as_map().is_none());
        assert_eq!(list.as_list().unwrap().item_len(), 1);
    }

    #[test]
    fn native_scalars_fold_back_into_values() {
        assert_eq!(
            value_from_bindable(Box::new(42_i32)).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            value_from_bindable(Box::new('x')).unwrap(),
            Value::Str("x".into())
        );
        assert!(value_from_bindable(Box::new(u64::MAX)).is_err());
    }
}
