use super::TransformRegistry;

// -----------------------------------------------------------------------------
// TransformPack

/// A bundle of related conversions registered as one unit.
///
/// Any `Fn(&mut TransformRegistry)` is a pack, so most packs are plain
/// functions.
pub trait TransformPack {
    fn register(&self, registry: &mut TransformRegistry);
}

impl<F: Fn(&mut TransformRegistry)> TransformPack for F {
    fn register(&self, registry: &mut TransformRegistry) {
        self(registry);
    }
}

// -----------------------------------------------------------------------------
// Auto registration

/// A pack submitted for automatic registration.
///
/// Collected by [`TransformRegistry::with_defaults`] when the
/// `auto_register` feature is enabled. Use [`submit_pack!`] instead of
/// constructing this directly.
///
/// [`submit_pack!`]: crate::submit_pack
pub struct PackEntry {
    pub register: fn(&mut TransformRegistry),
}

#[cfg(feature = "auto_register")]
inventory::collect!(PackEntry);

/// Submits a `fn(&mut TransformRegistry)` for automatic registration.
///
/// ```
/// use docbind_core::{TransformRegistry, Transformer};
///
/// fn currency_pack(registry: &mut TransformRegistry) {
///     registry.register(Transformer::new(|cents: &i64| Some(format!("{}.{:02}", cents / 100, cents % 100))));
/// }
///
/// docbind_core::submit_pack!(currency_pack);
///
/// let registry = TransformRegistry::with_defaults();
/// # let _ = registry;
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_pack {
    ($register:path) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::PackEntry {
                register: $register,
            }
        }
    };
}
