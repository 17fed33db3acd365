//! The declaration model: how a section type describes its fields.

mod field;
mod naming;
mod section;

pub use field::{FieldDecl, FieldSpec};
pub use naming::{NameModifier, NamePolicy, NameStrategy};
pub use section::{DEFAULT_VERSION_KEY, Section, SectionDecl, SectionSpec};
