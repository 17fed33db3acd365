use crate::bind::{Bindable, impl_bindable_shell};
use crate::desc::{Described, ScalarKind, TypeDesc};

// -----------------------------------------------------------------------------
// Scalars

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Described for $ty {
                fn desc() -> TypeDesc {
                    TypeDesc::scalar::<$ty>(stringify!($ty), ScalarKind::$kind)
                }
            }

            impl Bindable for $ty {
                fn desc(&self) -> TypeDesc {
                    <$ty as Described>::desc()
                }

                impl_bindable_shell!();
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Described for String {
    fn desc() -> TypeDesc {
        TypeDesc::scalar::<String>("String", ScalarKind::Str)
    }
}

impl Bindable for String {
    fn desc(&self) -> TypeDesc {
        <String as Described>::desc()
    }

    impl_bindable_shell!();
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::desc::{Described, ScalarKind};

    #[test]
    fn scalars_carry_their_kind() {
        let desc = i64::desc();
        assert!(matches!(
            desc.kind(),
            crate::desc::DescKind::Scalar(ScalarKind::I64)
        ));
        assert_eq!(desc.name(), "i64");
        assert!(String::desc().is_string());
        assert!(bool::desc().is_scalar());
    }
}
