//! Runtime descriptions of the types the engine can resolve.

mod described;
mod type_desc;

pub use described::Described;
pub use type_desc::{
    DescKind, EnumMeta, ListMeta, MapMeta, OptionalMeta, ScalarKind, SectionMeta, TypeDesc,
};
