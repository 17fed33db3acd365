//! The dyn-capable trait every resolvable value implements.

mod bindable;

pub use bindable::{BindList, BindMap, Bindable};

pub(crate) use bindable::impl_bindable_shell;
