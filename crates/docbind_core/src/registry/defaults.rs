use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use super::{TransformRegistry, Transformer};

// -----------------------------------------------------------------------------
// Built-in packs

/// String conversions for every scalar type, in both directions.
///
/// These carry the non-conservative serialization mode and the
/// environment-variable overrides: a document string becomes a typed
/// scalar on the way in, a scalar becomes its display form on the way
/// out. Unparseable input declines instead of failing, so a field keeps
/// its previous value when an override does not fit.
pub fn default_pack(registry: &mut TransformRegistry) {
    macro_rules! string_pairs {
        ($($ty:ty),* $(,)?) => {
            $(
                registry.register(Transformer::new(|text: &String| {
                    text.trim().parse::<$ty>().ok()
                }));
                registry.register(Transformer::new(|value: &$ty| Some(value.to_string())));
            )*
        };
    }

    string_pairs!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

    registry.register(Transformer::new(|text: &String| {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }));
    registry.register(Transformer::new(|value: &bool| Some(value.to_string())));

    registry.register(Transformer::new(|text: &String| text.parse::<char>().ok()));
    registry.register(Transformer::new(|value: &char| Some(value.to_string())));
}

/// String conversions for frequently configured std types.
pub fn extras_pack(registry: &mut TransformRegistry) {
    registry.register(Transformer::new(|text: &String| {
        Some(PathBuf::from(text))
    }));
    registry.register(Transformer::new(|path: &PathBuf| {
        Some(path.display().to_string())
    }));

    registry.register(Transformer::new(|text: &String| {
        text.trim().parse::<IpAddr>().ok()
    }));
    registry.register(Transformer::new(|addr: &IpAddr| Some(addr.to_string())));

    registry.register(Transformer::new(|text: &String| {
        text.trim().parse::<SocketAddr>().ok()
    }));
    registry.register(Transformer::new(|addr: &SocketAddr| Some(addr.to_string())));
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::TypeId;
    use std::net::IpAddr;

    use crate::bind::Bindable;
    use crate::registry::TransformRegistry;

    fn convert<S: Bindable, T: Bindable>(registry: &TransformRegistry, value: S) -> Option<T> {
        let t = registry.transformer(TypeId::of::<S>(), TypeId::of::<T>())?;
        let out = t.apply(&value).unwrap()?;
        Some(out.take::<T>().unwrap())
    }

    #[test]
    fn strings_parse_into_scalars() {
        let registry = TransformRegistry::with_defaults();
        assert_eq!(convert::<String, i32>(&registry, " 42 ".into()), Some(42));
        assert_eq!(convert::<String, f64>(&registry, "2.5".into()), Some(2.5));
        assert_eq!(convert::<String, char>(&registry, "x".into()), Some('x'));
    }

    #[test]
    fn booleans_parse_case_insensitively() {
        let registry = TransformRegistry::with_defaults();
        assert_eq!(convert::<String, bool>(&registry, "TRUE".into()), Some(true));
        assert_eq!(
            convert::<String, bool>(&registry, "false".into()),
            Some(false)
        );
        assert_eq!(convert::<String, bool>(&registry, "yes".into()), None);
    }

    #[test]
    fn garbage_declines_instead_of_failing() {
        let registry = TransformRegistry::with_defaults();
        assert_eq!(convert::<String, i32>(&registry, "forty".into()), None);
    }

    #[test]
    fn scalars_render_back_to_strings() {
        let registry = TransformRegistry::with_defaults();
        assert_eq!(
            convert::<i32, String>(&registry, 42),
            Some(String::from("42"))
        );
        assert_eq!(
            convert::<bool, String>(&registry, true),
            Some(String::from("true"))
        );
    }

    #[test]
    fn extras_cover_net_and_path_types() {
        let registry = TransformRegistry::with_defaults();
        let addr = convert::<String, IpAddr>(&registry, "127.0.0.1".into()).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1");
        assert_eq!(convert::<String, IpAddr>(&registry, "nowhere".into()), None);
    }
}
