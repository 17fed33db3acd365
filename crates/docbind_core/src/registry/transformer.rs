use core::any::TypeId;
use core::fmt;

use crate::bind::Bindable;
use crate::desc::{Described, TypeDesc};
use crate::error::{BindError, BindResult};

// -----------------------------------------------------------------------------
// Transformer

type ConvertFn = Box<dyn Fn(&dyn Bindable) -> BindResult<Option<Box<dyn Bindable>>> + Send + Sync>;
type RefineFn =
    Box<dyn Fn(&dyn Bindable, &dyn Bindable) -> BindResult<Option<Box<dyn Bindable>>> + Send + Sync>;

/// A conversion between exactly one source and one target type.
///
/// A transformer is a type pair plus one conversion function, optionally
/// two: the second variant also sees the previous value of the target and
/// may use it to refine the result. Returning `None` declines the input
/// without failing, which the engine treats as "no value".
///
/// There is no transformer interface to implement; closures over concrete
/// types are erased here once and dispatched by the registry.
pub struct Transformer {
    source: TypeDesc,
    target: TypeDesc,
    convert: ConvertFn,
    refine: Option<RefineFn>,
}

impl Transformer {
    /// A transformer from `S` to `T`.
    pub fn new<S, T>(convert: impl Fn(&S) -> Option<T> + Send + Sync + 'static) -> Self
    where
        S: Bindable + Described,
        T: Bindable + Described,
    {
        Self {
            source: <S as Described>::desc(),
            target: <T as Described>::desc(),
            convert: erase(convert),
            refine: None,
        }
    }

    /// A transformer from `S` to `T` that may consult the previous target
    /// value. When `refine` declines, `convert` runs as the fallback.
    pub fn with_default<S, T>(
        convert: impl Fn(&S) -> Option<T> + Send + Sync + 'static,
        refine: impl Fn(&S, &T) -> Option<T> + Send + Sync + 'static,
    ) -> Self
    where
        S: Bindable + Described,
        T: Bindable + Described,
    {
        Self {
            source: <S as Described>::desc(),
            target: <T as Described>::desc(),
            convert: erase(convert),
            refine: Some(Box::new(move |value, previous| {
                let Some(value) = value.downcast_ref::<S>() else {
                    return Err(source_mismatch(value));
                };
                let Some(previous) = previous.downcast_ref::<T>() else {
                    // A foreign default is ignored, the plain path handles it.
                    return Ok(None);
                };
                Ok(refine(value, previous).map(boxed))
            })),
        }
    }

    /// Builds both directions of a conversion pair at once.
    pub fn two_way<S, T>(
        forward: impl Fn(&S) -> Option<T> + Send + Sync + 'static,
        backward: impl Fn(&T) -> Option<S> + Send + Sync + 'static,
    ) -> (Self, Self)
    where
        S: Bindable + Described,
        T: Bindable + Described,
    {
        (Self::new(forward), Self::new(backward))
    }

    pub fn source(&self) -> &TypeDesc {
        &self.source
    }

    pub fn target(&self) -> &TypeDesc {
        &self.target
    }

    pub(crate) fn key(&self) -> (TypeId, TypeId) {
        (self.source.id(), self.target.id())
    }

    /// Runs the conversion. `Ok(None)` means the transformer declined.
    pub(crate) fn apply(&self, value: &dyn Bindable) -> BindResult<Option<Box<dyn Bindable>>> {
        (self.convert)(value)
    }

    /// Runs the refining conversion when a previous target value exists,
    /// falling back to the plain conversion.
    pub(crate) fn apply_with_default(
        &self,
        value: &dyn Bindable,
        previous: Option<&dyn Bindable>,
    ) -> BindResult<Option<Box<dyn Bindable>>> {
        if let (Some(refine), Some(previous)) = (&self.refine, previous) {
            if let Some(out) = refine(value, previous)? {
                return Ok(Some(out));
            }
        }
        (self.convert)(value)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer({} => {})", self.source, self.target)
    }
}

fn erase<S, T>(convert: impl Fn(&S) -> Option<T> + Send + Sync + 'static) -> ConvertFn
where
    S: Bindable + Described,
    T: Bindable + Described,
{
    Box::new(move |value| {
        let Some(value) = value.downcast_ref::<S>() else {
            return Err(source_mismatch(value));
        };
        Ok(convert(value).map(boxed))
    })
}

fn boxed<T: Bindable>(value: T) -> Box<dyn Bindable> {
    Box::new(value)
}

fn source_mismatch(found: &dyn Bindable) -> BindError {
    BindError::Mismatch {
        expected: "the transformer's source type",
        found: format!("{found:?}"),
    }
}

// -----------------------------------------------------------------------------
// Tests
