use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use indexmap::IndexMap;

use super::take_mismatch;
use crate::bind::{BindList, BindMap, Bindable, impl_bindable_shell};
use crate::desc::{Described, ListMeta, MapMeta, OptionalMeta, TypeDesc};
use crate::error::BindResult;

// -----------------------------------------------------------------------------
// Vec

fn list_from_items<T>(items: Vec<Box<dyn Bindable>>) -> BindResult<Box<dyn Bindable>>
where
    T: Bindable + Described + Clone,
{
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match item.take::<T>() {
            Ok(value) => out.push(value),
            Err(item) => return Err(take_mismatch::<T>(&*item)),
        }
    }
    Ok(Box::new(out))
}

impl<T> Described for Vec<T>
where
    T: Bindable + Described + Clone,
{
    fn desc() -> TypeDesc {
        TypeDesc::list::<Self>(
            "Vec",
            ListMeta {
                from_items: list_from_items::<T>,
            },
            <T as Described>::desc(),
        )
    }
}

impl<T> Bindable for Vec<T>
where
    T: Bindable + Described + Clone,
{
    fn desc(&self) -> TypeDesc {
        <Self as Described>::desc()
    }

    fn as_list(&self) -> Option<&dyn BindList> {
        Some(self)
    }

    impl_bindable_shell!();
}

impl<T> BindList for Vec<T>
where
    T: Bindable + Described + Clone,
{
    fn item_len(&self) -> usize {
        self.len()
    }

    fn items(&self) -> Box<dyn Iterator<Item = &dyn Bindable> + '_> {
        Box::new(self.iter().map(|item| item as &dyn Bindable))
    }
}

// -----------------------------------------------------------------------------
// Option

fn option_none<T>() -> Box<dyn Bindable>
where
    T: Bindable + Described + Clone,
{
    Box::new(None::<T>)
}

fn option_some<T>(value: Box<dyn Bindable>) -> BindResult<Box<dyn Bindable>>
where
    T: Bindable + Described + Clone,
{
    match value.take::<T>() {
        Ok(value) => Ok(Box::new(Some(value))),
        Err(value) => Err(take_mismatch::<T>(&*value)),
    }
}

impl<T> Described for Option<T>
where
    T: Bindable + Described + Clone,
{
    fn desc() -> TypeDesc {
        TypeDesc::optional::<Self>(
            "Option",
            OptionalMeta {
                none: option_none::<T>,
                some: option_some::<T>,
            },
            <T as Described>::desc(),
        )
    }
}

impl<T> Bindable for Option<T>
where
    T: Bindable + Described + Clone,
{
    fn desc(&self) -> TypeDesc {
        <Self as Described>::desc()
    }

    fn as_optional(&self) -> Option<Option<&dyn Bindable>> {
        Some(self.as_ref().map(|value| value as &dyn Bindable))
    }

    impl_bindable_shell!();
}

// -----------------------------------------------------------------------------
// Maps

macro_rules! impl_bind_map {
    ($map:ident, $name:literal, $from:ident $(, $kextra:path)*) => {
        fn $from<K, V>(
            pairs: Vec<(Box<dyn Bindable>, Box<dyn Bindable>)>,
        ) -> BindResult<Box<dyn Bindable>>
        where
            K: Bindable + Described + Clone $(+ $kextra)*,
            V: Bindable + Described + Clone,
        {
            let mut out: $map<K, V> = $map::default();
            for (key, value) in pairs {
                let key = match key.take::<K>() {
                    Ok(key) => key,
                    Err(key) => return Err(take_mismatch::<K>(&*key)),
                };
                let value = match value.take::<V>() {
                    Ok(value) => value,
                    Err(value) => return Err(take_mismatch::<V>(&*value)),
                };
                out.insert(key, value);
            }
            Ok(Box::new(out))
        }

        impl<K, V> Described for $map<K, V>
        where
            K: Bindable + Described + Clone $(+ $kextra)*,
            V: Bindable + Described + Clone,
        {
            fn desc() -> TypeDesc {
                TypeDesc::map::<Self>(
                    $name,
                    MapMeta { from_pairs: $from::<K, V> },
                    <K as Described>::desc(),
                    <V as Described>::desc(),
                )
            }
        }

        impl<K, V> Bindable for $map<K, V>
        where
            K: Bindable + Described + Clone $(+ $kextra)*,
            V: Bindable + Described + Clone,
        {
            fn desc(&self) -> TypeDesc {
                <Self as Described>::desc()
            }

            fn as_map(&self) -> Option<&dyn BindMap> {
                Some(self)
            }

            impl_bindable_shell!();
        }

        impl<K, V> BindMap for $map<K, V>
        where
            K: Bindable + Described + Clone $(+ $kextra)*,
            V: Bindable + Described + Clone,
        {
            fn entry_len(&self) -> usize {
                self.len()
            }

            fn entries(&self) -> Box<dyn Iterator<Item = (&dyn Bindable, &dyn Bindable)> + '_> {
                Box::new(
                    self.iter()
                        .map(|(key, value)| (key as &dyn Bindable, value as &dyn Bindable)),
                )
            }
        }
    };
}

impl_bind_map!(HashMap, "HashMap", hash_map_from_pairs, Eq, Hash);
impl_bind_map!(BTreeMap, "BTreeMap", btree_map_from_pairs, Ord);
impl_bind_map!(IndexMap, "IndexMap", index_map_from_pairs, Eq, Hash);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::bind::Bindable;
    use crate::desc::{DescKind, Described, TypeDesc};

    #[test]
    fn list_descriptor_carries_the_item_type() {
        let desc = <Vec<i64> as Described>::desc();
        assert!(desc.is_list());
        assert_eq!(desc.sub_type(0), Some(&TypeDesc::of::<i64>()));
    }

    #[test]
    fn list_meta_rebuilds_the_typed_vector() {
        let DescKind::List(meta) = *<Vec<i64> as Described>::desc().kind() else {
            panic!("expected a list kind");
        };
        let items: Vec<Box<dyn Bindable>> = vec![Box::new(1_i64), Box::new(2_i64)];
        let built = (meta.from_items)(items).unwrap();
        assert_eq!(built.take::<Vec<i64>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn list_meta_rejects_foreign_items() {
        let DescKind::List(meta) = *<Vec<i64> as Described>::desc().kind() else {
            panic!("expected a list kind");
        };
        let items: Vec<Box<dyn Bindable>> = vec![Box::new(String::from("nope"))];
        assert!((meta.from_items)(items).is_err());
    }

    #[test]
    fn map_meta_rebuilds_the_typed_map() {
        let DescKind::Map(meta) = *<HashMap<String, i64> as Described>::desc().kind() else {
            panic!("expected a map kind");
        };
        let pairs: Vec<(Box<dyn Bindable>, Box<dyn Bindable>)> =
            vec![(Box::new(String::from("a")), Box::new(1_i64))];
        let built = (meta.from_pairs)(pairs).unwrap();
        let map = built.take::<HashMap<String, i64>>().unwrap();
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn optional_views_distinguish_none_from_some() {
        let none: Option<i64> = None;
        let some: Option<i64> = Some(9);

        assert!(matches!(Bindable::as_optional(&none), Some(None)));
        let inner = Bindable::as_optional(&some).flatten().unwrap();
        assert_eq!(inner.downcast_ref::<i64>(), Some(&9));
    }
}
