//! Expansion for named-field structs.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DataStruct, DeriveInput, Fields, LitInt, LitStr};

use crate::BIND_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// Expansion

pub(crate) fn expand(
    input: &DeriveInput,
    data: &DataStruct,
    core: &syn::Path,
) -> syn::Result<TokenStream> {
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Bind)]` requires a struct with named fields",
        ));
    };

    let attrs = SectionAttrs::parse(&input.attrs)?;
    let ident = &input.ident;
    let name = LitStr::new(&ident.to_string(), ident.span());

    let mut chain = TokenStream::new();
    if let Some(version) = attrs.version {
        chain.extend(quote! { .version(#version) });
    }
    if let Some(key) = &attrs.version_key {
        chain.extend(quote! { .version_key(#key) });
    }
    if let Some(policy) = attrs.policy(core) {
        chain.extend(quote! { .naming(#policy) });
    }
    for line in &attrs.headers {
        chain.extend(quote! { .header(#line) });
    }

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_attrs = FieldAttrs::parse(&field.attrs)?;
        if field_attrs.skip {
            continue;
        }
        let field_name = LitStr::new(&field_ident.to_string(), field_ident.span());
        let field_ty = &field.ty;

        let mut field_chain = TokenStream::new();
        if let Some(key) = &field_attrs.key {
            field_chain.extend(quote! { .key(#key) });
        }
        for line in &field_attrs.comments {
            field_chain.extend(quote! { .comment(#line) });
        }
        if let Some(version) = field_attrs.migration {
            field_chain.extend(quote! { .migration(#version) });
        }
        if let Some(variable) = &field_attrs.variable {
            field_chain.extend(quote! { .variable(#variable) });
        }

        chain.extend(quote! {
            .field(
                #core::FieldSpec::new::<Self, #field_ty>(
                    #field_name,
                    |object| &object.#field_ident,
                    |object| &mut object.#field_ident,
                )
                #field_chain
            )
        });
    }

    let shell = crate::bindable_shell(core);

    Ok(quote! {
        impl #core::Described for #ident {
            fn desc() -> #core::TypeDesc {
                #core::TypeDesc::section::<#ident>(#name)
            }
        }

        impl #core::Bindable for #ident {
            fn desc(&self) -> #core::TypeDesc {
                <#ident as #core::Described>::desc()
            }

            #shell
        }

        impl #core::Section for #ident {
            fn spec() -> #core::SectionSpec {
                #core::SectionSpec::new(#name)
                    #chain
            }
        }
    })
}

// -----------------------------------------------------------------------------
// Section attributes

#[derive(Clone, Copy)]
enum Strategy {
    Keep,
    Kebab,
}

#[derive(Clone, Copy)]
enum Modifier {
    Lowercase,
    Uppercase,
}

#[derive(Default)]
struct SectionAttrs {
    version: Option<u32>,
    version_key: Option<LitStr>,
    strategy: Option<Strategy>,
    modifier: Option<Modifier>,
    headers: Vec<LitStr>,
}

impl SectionAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(BIND_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("version") {
                    let lit: LitInt = meta.value()?.parse()?;
                    parsed.version = Some(lit.base10_parse()?);
                } else if meta.path.is_ident("version_key") {
                    parsed.version_key = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.strategy = Some(match lit.value().as_str() {
                        "snake_case" => Strategy::Keep,
                        "kebab-case" => Strategy::Kebab,
                        other => {
                            return Err(meta.error(format!(
                                "unknown name strategy `{other}`, \
                                 expected \"snake_case\" or \"kebab-case\""
                            )));
                        }
                    });
                } else if meta.path.is_ident("modifier") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.modifier = Some(match lit.value().as_str() {
                        "lowercase" => Modifier::Lowercase,
                        "uppercase" => Modifier::Uppercase,
                        other => {
                            return Err(meta.error(format!(
                                "unknown name modifier `{other}`, \
                                 expected \"lowercase\" or \"uppercase\""
                            )));
                        }
                    });
                } else if meta.path.is_ident("header") {
                    parsed.headers.push(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown section attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }

    fn policy(&self, core: &syn::Path) -> Option<TokenStream> {
        if self.strategy.is_none() && self.modifier.is_none() {
            return None;
        }
        let strategy = match self.strategy.unwrap_or(Strategy::Keep) {
            Strategy::Keep => quote! { #core::NameStrategy::Keep },
            Strategy::Kebab => quote! { #core::NameStrategy::Kebab },
        };
        let modifier = match self.modifier {
            None => quote! { #core::NameModifier::None },
            Some(Modifier::Lowercase) => quote! { #core::NameModifier::Lowercase },
            Some(Modifier::Uppercase) => quote! { #core::NameModifier::Uppercase },
        };
        Some(quote! { #core::NamePolicy::new(#strategy, #modifier) })
    }
}

// -----------------------------------------------------------------------------
// Field attributes

#[derive(Default)]
struct FieldAttrs {
    key: Option<LitStr>,
    comments: Vec<LitStr>,
    migration: Option<u32>,
    variable: Option<LitStr>,
    skip: bool,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(BIND_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    parsed.key = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("comment") {
                    parsed.comments.push(meta.value()?.parse()?);
                } else if meta.path.is_ident("migration") {
                    let lit: LitInt = meta.value()?.parse()?;
                    parsed.migration = Some(lit.base10_parse()?);
                } else if meta.path.is_ident("variable") {
                    parsed.variable = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}
