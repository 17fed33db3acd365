use core::any::{Any, TypeId};
use core::fmt::Debug;

use crate::desc::TypeDesc;

// -----------------------------------------------------------------------------
// Bindable

/// A value the resolution engine can carry, inspect and rebuild.
///
/// Field values, document values and everything the engine produces travel
/// as `dyn Bindable`. The trait deliberately stays small: classification
/// lives in [`TypeDesc`], construction in the descriptor's kind metadata,
/// so most implementations are a description plus downcast plumbing.
///
/// `#[derive(Bind)]` implements this for user types; hand-written
/// implementations only need [`desc`](Bindable::desc) plus the four
/// plumbing methods, which always have the same bodies.
pub trait Bindable: Any + Debug + Send + Sync {
    /// Classifies this value for the engine.
    ///
    /// For statically typed values this equals their [`Described`]
    /// descriptor. Untyped document values classify by their runtime
    /// variant instead.
    ///
    /// [`Described`]: crate::desc::Described
    fn desc(&self) -> TypeDesc;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clones the value behind a fresh box.
    fn clone_boxed(&self) -> Box<dyn Bindable>;

    /// A list view over this value, if it is list-shaped.
    fn as_list(&self) -> Option<&dyn BindList> {
        None
    }

    /// A map view over this value, if it is map-shaped.
    fn as_map(&self) -> Option<&dyn BindMap> {
        None
    }

    /// An optional view: `Some(None)` marks a present-but-empty optional.
    fn as_optional(&self) -> Option<Option<&dyn Bindable>> {
        None
    }
}

impl dyn Bindable {
    /// Whether the concrete type behind this value is `T`.
    #[inline]
    pub fn is<T: Bindable>(&self) -> bool {
        self.as_any().type_id() == TypeId::of::<T>()
    }

    /// Downcasts to a shared reference of `T`.
    #[inline]
    pub fn downcast_ref<T: Bindable>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcasts to a mutable reference of `T`.
    #[inline]
    pub fn downcast_mut<T: Bindable>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Takes the value out of the box as `T`, returning the box untouched
    /// when the type does not match.
    pub fn take<T: Bindable>(self: Box<Self>) -> Result<T, Box<dyn Bindable>> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("type id checked before the downcast"),
        }
    }
}

// -----------------------------------------------------------------------------
// Shaped views

/// A sequence of bindable items.
pub trait BindList: Bindable {
    fn item_len(&self) -> usize;

    fn items(&self) -> Box<dyn Iterator<Item = &dyn Bindable> + '_>;
}

/// A collection of bindable key-value pairs.
pub trait BindMap: Bindable {
    fn entry_len(&self) -> usize;

    fn entries(&self) -> Box<dyn Iterator<Item = (&dyn Bindable, &dyn Bindable)> + '_>;
}

// -----------------------------------------------------------------------------
// Implementation helper

/// Expands to the four plumbing methods of [`Bindable`] for a `Clone` type.
macro_rules! impl_bindable_shell {
    () => {
        #[inline]
        fn as_any(&self) -> &dyn ::core::any::Any {
            self
        }

        #[inline]
        fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
            self
        }

        #[inline]
        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
            self
        }

        #[inline]
        fn clone_boxed(&self) -> ::std::boxed::Box<dyn $crate::bind::Bindable> {
            ::std::boxed::Box::new(::core::clone::Clone::clone(self))
        }
    };
}

pub(crate) use impl_bindable_shell;

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Bindable;

    #[test]
    fn downcasts_reach_the_concrete_type() {
        let boxed: Box<dyn Bindable> = Box::new(7_i64);
        assert!(boxed.is::<i64>());
        assert!(!boxed.is::<i32>());
        assert_eq!(boxed.downcast_ref::<i64>(), Some(&7));
    }

    #[test]
    fn take_returns_the_box_on_mismatch() {
        let boxed: Box<dyn Bindable> = Box::new(String::from("seven"));
        let boxed = boxed.take::<i64>().unwrap_err();
        assert_eq!(boxed.take::<String>().unwrap(), "seven");
    }

    #[test]
    fn clone_boxed_is_deep() {
        let boxed: Box<dyn Bindable> = Box::new(vec![1_i64, 2]);
        let copy = boxed.clone_boxed();
        drop(boxed);
        assert_eq!(copy.take::<Vec<i64>>().unwrap(), vec![1, 2]);
    }
}
