use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::bind::{Bindable, impl_bindable_shell};
use crate::desc::{Described, TypeDesc};

// -----------------------------------------------------------------------------
// Frequently configured std types
//
// These stay opaque: the engine never looks inside them, the string
// transformers of the extras pack do the converting.

macro_rules! impl_opaque {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Described for $ty {
                fn desc() -> TypeDesc {
                    TypeDesc::opaque::<$ty>($name)
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

impl_opaque! {
    PathBuf => "PathBuf",
    IpAddr => "IpAddr",
    SocketAddr => "SocketAddr",
}
