//! Implementation of #[derive(FromContainer)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, LitStr};

use crate::field::{classify, named_fields, Shape};

pub fn derive_from_container_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Generate field initializers
    let field_inits = named_fields(input, "FromContainer")?
        .iter()
        .map(field_init)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::xdi::FromContainer for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn from_container(
                container: &::xdi::Container,
            ) -> ::core::result::Result<Self, ::xdi::DiError> {
                ::core::result::Result::Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

fn field_init(field: &Field) -> syn::Result<TokenStream2> {
    let field_name = field.ident.as_ref().expect("named field");
    let attr = parse_from_container_attr(field)?;

    if attr.default {
        return Ok(quote! {
            #field_name: ::core::default::Default::default()
        });
    }

    let shape = classify(&field.ty);
    let service = shape.service();
    let (required, optional) = match &attr.name {
        Some(lit) => (
            quote! { container.resolve_named::<#service>(#lit)? },
            quote! { container.try_resolve_named::<#service>(#lit)? },
        ),
        None => (
            quote! { container.resolve::<#service>()? },
            quote! { container.try_resolve::<#service>()? },
        ),
    };

    let value = match shape {
        Shape::Shared(_) => required,
        Shape::OptionalShared(_) => optional,
        Shape::Owned(_) => quote! { ::core::clone::Clone::clone(&*#required) },
        Shape::OptionalOwned(_) => quote! {
            #optional.map(|service| ::core::clone::Clone::clone(&*service))
        },
    };

    Ok(quote! { #field_name: #value })
}

#[derive(Default)]
struct FromContainerAttr {
    name: Option<LitStr>,
    default: bool,
}

/// Parse `#[from_container(name = "x")]` or `#[from_container(default)]`.
fn parse_from_container_attr(field: &Field) -> syn::Result<FromContainerAttr> {
    let mut parsed = FromContainerAttr::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("from_container") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default") {
                parsed.default = true;
            } else {
                return Err(meta.error("expected `name` or `default`"));
            }
            Ok(())
        })?;

        if parsed.default && parsed.name.is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                "`default` cannot be combined with `name`",
            ));
        }
    }

    Ok(parsed)
}
