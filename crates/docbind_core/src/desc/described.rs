use super::TypeDesc;

// -----------------------------------------------------------------------------
// Described

/// Types that can describe themselves to the resolution engine.
///
/// The descriptor is recomputed on each call; only section declarations
/// are cached, by the registry. Implementations for scalars, strings,
/// `Option`, the common collections and [`crate::Value`] ship with the
/// crate, and `#[derive(Bind)]` generates one for user types.
pub trait Described: 'static {
    /// Describes this type, including its generic arguments.
    fn desc() -> TypeDesc;
}
