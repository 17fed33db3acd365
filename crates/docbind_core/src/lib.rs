#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Extern Self

// Derive-generated code refers to this crate by its package name so that the
// same expansion works from dependent crates and from doctests. The alias
// makes that name resolve inside the crate itself as well.
extern crate self as docbind_core;

// -----------------------------------------------------------------------------
// Modules

mod data;
mod error;
mod serializer;

pub mod bind;
pub mod decl;
pub mod desc;
pub mod document;
pub mod driver;
pub mod impls;
pub mod registry;
pub mod resolve;
pub mod value;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use bind::{BindList, BindMap, Bindable};
pub use data::DataBag;
pub use decl::{
    FieldDecl, FieldSpec, NameModifier, NamePolicy, NameStrategy, Section, SectionDecl,
    SectionSpec,
};
pub use desc::{
    DescKind, Described, EnumMeta, ListMeta, MapMeta, OptionalMeta, ScalarKind, SectionMeta,
    TypeDesc,
};
pub use document::{Document, FieldState};
pub use driver::{Driver, MemoryDriver};
pub use error::{BindError, BindResult};
pub use registry::{TransformPack, TransformRegistry, Transformer};
pub use resolve::Resolver;
pub use serializer::ObjectSerializer;
pub use value::{Value, ValueMap};

pub use docbind_derive as derive;
