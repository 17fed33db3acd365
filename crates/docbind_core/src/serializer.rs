use core::any::TypeId;

use crate::bind::Bindable;
use crate::data::DataBag;
use crate::desc::TypeDesc;
use crate::error::BindResult;

// -----------------------------------------------------------------------------
// ObjectSerializer

/// Custom document mapping for types the engine cannot take apart itself.
///
/// A serializer claims types through [`supports`](Self::supports) and moves
/// values in and out of a [`DataBag`], a keyed view the engine lowers to a
/// document map. The bag resolves nested values through the same registry
/// the serializer was registered in, so entries may be of any resolvable
/// type.
///
/// When a previous value of the target exists, the engine prefers
/// [`deserialize_with_default`](Self::deserialize_with_default). The
/// default implementation ignores the previous value; override it to merge
/// partial documents into existing state.
pub trait ObjectSerializer: Send + Sync {
    /// Whether this serializer handles the given type.
    fn supports(&self, id: TypeId) -> bool;

    /// Writes `value` into the bag, one entry per document key.
    fn serialize(&self, value: &dyn Bindable, data: &mut DataBag<'_>) -> BindResult<()>;

    /// Rebuilds a value of `target` from the bag. `Ok(None)` declines.
    fn deserialize(
        &self,
        data: &DataBag<'_>,
        target: &TypeDesc,
    ) -> BindResult<Option<Box<dyn Bindable>>>;

    /// Like [`deserialize`](Self::deserialize), with access to the value
    /// the target held before.
    fn deserialize_with_default(
        &self,
        previous: &dyn Bindable,
        data: &DataBag<'_>,
        target: &TypeDesc,
    ) -> BindResult<Option<Box<dyn Bindable>>> {
        let _ = previous;
        self.deserialize(data, target)
    }
}
