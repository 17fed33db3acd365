//! Built-in [`Described`] and [`Bindable`] implementations.
//!
//! [`Described`]: crate::desc::Described
//! [`Bindable`]: crate::bind::Bindable

mod collections;
mod extra;
mod scalar;
mod value;

use crate::bind::Bindable;
use crate::desc::Described;
use crate::error::BindError;

pub(crate) use value::value_from_bindable;

// Error for a failed take out of a construction table.
pub(crate) fn take_mismatch<T: Described>(found: &dyn Bindable) -> BindError {
    BindError::Mismatch {
        expected: T::desc().name(),
        found: format!("{found:?}"),
    }
}
