//! Expansion for unit-variant enums.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DataEnum, DeriveInput, Fields, LitStr};

use crate::BIND_ATTRIBUTE_NAME;

pub(crate) fn expand(
    input: &DeriveInput,
    data: &DataEnum,
    core: &syn::Path,
) -> syn::Result<TokenStream> {
    reject_attrs(&input.attrs, "enumerations take no container attributes")?;

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "`#[derive(Bind)]` supports only unit variants",
            ));
        }
        reject_attrs(&variant.attrs, "enumeration variants take no attributes")?;
        names.push(LitStr::new(&variant.ident.to_string(), variant.ident.span()));
        idents.push(&variant.ident);
    }

    if idents.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Bind)]` requires at least one variant",
        ));
    }

    let ident = &input.ident;
    let name = LitStr::new(&ident.to_string(), ident.span());
    let shell = crate::bindable_shell(core);

    Ok(quote! {
        impl #core::Described for #ident {
            fn desc() -> #core::TypeDesc {
                fn from_name(
                    name: &str,
                ) -> ::core::option::Option<::std::boxed::Box<dyn #core::Bindable>> {
                    match name {
                        #(#names => ::core::option::Option::Some(
                            ::std::boxed::Box::new(#ident::#idents),
                        ),)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn name_of(
                    value: &dyn #core::Bindable,
                ) -> ::core::option::Option<&'static str> {
                    value.downcast_ref::<#ident>().map(|value| match value {
                        #(#ident::#idents => #names,)*
                    })
                }

                #core::TypeDesc::enumeration::<#ident>(
                    #name,
                    #core::EnumMeta {
                        variants: &[#(#names),*],
                        from_name,
                        name_of,
                    },
                )
            }
        }

        impl #core::Bindable for #ident {
            fn desc(&self) -> #core::TypeDesc {
                <#ident as #core::Described>::desc()
            }

            #shell
        }
    })
}

fn reject_attrs(attrs: &[Attribute], message: &str) -> syn::Result<()> {
    for attr in attrs {
        if attr.path().is_ident(BIND_ATTRIBUTE_NAME) {
            return Err(syn::Error::new_spanned(attr, message));
        }
    }
    Ok(())
}
