//! Derive support for `docbind_core`.
//!
//! See [`Bind`].

#![cfg_attr(docsrs, feature(doc_cfg))]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, parse_macro_input};

static BIND_ATTRIBUTE_NAME: &str = "bind";

// -----------------------------------------------------------------------------
// Modules

mod enumeration;
mod manifest;
mod section;

// -----------------------------------------------------------------------------
// Macros

/// # Section Binding Derivation
///
/// On a struct with named fields, `#[derive(Bind)]` implements:
///
/// - `Described`
/// - `Bindable`
/// - `Section`
///
/// Every field becomes a declared document key; the struct must also be
/// `Clone`, `Debug`, `Default`, `Send` and `Sync`, and every declared
/// field type must itself be `Bindable + Described`.
///
/// ```rust, ignore
/// #[derive(Bind, Clone, Debug, Default)]
/// struct ServerConfig {
///     port: u16,
///     host: String,
/// }
/// ```
///
/// On an enum of unit variants, the derive implements `Described` and
/// `Bindable`; values travel through documents by variant name.
///
/// ## Container Attributes
///
/// `#[bind(version = 3)]` declares the schema version the struct is at.
/// Documents without a stored version count as version 1.
///
/// `#[bind(version_key = "config-version")]` overrides the key the
/// version is stored under.
///
/// `#[bind(rename_all = "kebab-case")]` computes document keys from
/// field names by replacing underscores with hyphens. The default,
/// `"snake_case"`, keeps names as written. An additional
/// `#[bind(modifier = "lowercase")]` or `#[bind(modifier = "uppercase")]`
/// re-cases the computed key.
///
/// `#[bind(header = "...")]` adds one comment line above the whole
/// document; repeat the attribute for multiple lines.
///
/// ## Field Attributes
///
/// `#[bind(key = "listen-port")]` overrides the computed document key.
///
/// `#[bind(comment = "...")]` adds one comment line above the field's
/// key; repeat for multiple lines.
///
/// `#[bind(migration = 3)]` marks the field as the pre-version-3 home of
/// a value. While a loaded document is older than the declared version,
/// the field still reads; afterwards its key is removed on save.
///
/// `#[bind(variable = "APP_TOKEN")]` lets the named environment variable
/// override the field at load time without the override leaking into the
/// saved document.
///
/// `#[bind(skip)]` leaves the field out of the declaration entirely; it
/// keeps its `Default` value across loads and is never written.
///
/// ```rust, ignore
/// #[derive(Bind, Clone, Debug, Default)]
/// #[bind(version = 2, rename_all = "kebab-case")]
/// #[bind(header = "Main service configuration.")]
/// struct ServiceConfig {
///     #[bind(comment = "Port the service listens on.")]
///     listen_port: u16,
///     #[bind(migration = 2)]
///     port: Option<u16>,
///     #[bind(variable = "SERVICE_TOKEN")]
///     token: String,
/// }
/// ```
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    if !ast.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &ast.generics,
            "`#[derive(Bind)]` does not support generic types",
        )
        .into_compile_error()
        .into();
    }

    let core = manifest::core_path();

    let expanded = match &ast.data {
        Data::Struct(data) => section::expand(&ast, data, &core),
        Data::Enum(data) => enumeration::expand(&ast, data, &core),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast.ident,
            "`#[derive(Bind)]` does not support unions",
        )),
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

// -----------------------------------------------------------------------------
// Shared emission

/// The `Bindable` methods every derived impl fills in the same way.
fn bindable_shell(core: &syn::Path) -> proc_macro2::TokenStream {
    quote! {
        #[inline]
        fn as_any(&self) -> &dyn ::core::any::Any {
            self
        }

        #[inline]
        fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
            self
        }

        #[inline]
        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
            self
        }

        #[inline]
        fn clone_boxed(&self) -> ::std::boxed::Box<dyn #core::Bindable> {
            ::std::boxed::Box::new(::core::clone::Clone::clone(self))
        }
    }
}
