//! The registry of transformers, object serializers and cached section
//! declarations.
//!
//! Nothing in here is global: a registry is built explicitly and handed to
//! every document or resolver that should use it.

mod defaults;
mod pack;
mod registry;
mod transformer;

pub use defaults::{default_pack, extras_pack};
pub use pack::{PackEntry, TransformPack};
pub use registry::TransformRegistry;
pub use transformer::Transformer;
