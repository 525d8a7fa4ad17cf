//! Implementation of #[derive(Inject)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, DeriveInput, Field, LitStr, Meta};

use crate::field::{classify, named_fields, Shape};

/// Parsed `#[inject(...)]` marker.
#[derive(Default)]
struct InjectAttr {
    name: Option<LitStr>,
    nested: bool,
    recurse: bool,
}

pub fn derive_inject_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let owner = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut steps = Vec::new();
    for field in named_fields(input, "Inject")? {
        if let Some(attr) = parse_inject_attr(field)? {
            steps.push(field_step(field, &attr, &owner)?);
        }
    }

    Ok(quote! {
        impl #impl_generics ::xdi::Inject for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn inject_fields(
                &mut self,
                container: &::xdi::Container,
                names: &::xdi::FieldNames,
            ) -> ::core::result::Result<(), ::xdi::DiError> {
                #(#steps)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// Code populating one marked field.
fn field_step(field: &Field, attr: &InjectAttr, owner: &str) -> syn::Result<TokenStream2> {
    let ident = field.ident.as_ref().expect("named field");

    if attr.nested {
        return Ok(quote! {
            ::xdi::Inject::inject_fields(&mut self.#ident, container, names)?;
        });
    }

    let field_name = ident.unraw().to_string();
    let default_name = match &attr.name {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    };

    let shape = classify(&field.ty);
    let service = shape.service();
    let assign = match shape {
        Shape::Shared(_) => quote! { self.#ident = service; },
        Shape::OptionalShared(_) => quote! { self.#ident = ::core::option::Option::Some(service); },
        Shape::Owned(_) => quote! { self.#ident = ::core::clone::Clone::clone(&*service); },
        Shape::OptionalOwned(_) => quote! {
            self.#ident = ::core::option::Option::Some(::core::clone::Clone::clone(&*service));
        },
    };

    let recurse = if attr.recurse {
        if matches!(shape, Shape::Shared(_) | Shape::OptionalShared(_)) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "`recurse` needs an owned field; shared `Arc` services cannot be injected into",
            ));
        }
        quote! { ::xdi::Inject::inject_fields(&mut self.#ident, container, names)?; }
    } else {
        quote! {}
    };

    Ok(quote! {
        {
            let qualifier = names
                .get(#field_name)
                .map(::std::string::String::as_str)
                .or(#default_name);
            if let ::core::option::Option::Some(service) =
                container.resolve_for_field::<#service>(#owner, #field_name, qualifier)?
            {
                #assign
                #recurse
            }
        }
    })
}

fn parse_inject_attr(field: &Field) -> syn::Result<Option<InjectAttr>> {
    let mut parsed = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }

        let mut inject = InjectAttr::default();
        if let Meta::List(_) = &attr.meta {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    inject.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("nested") {
                    inject.nested = true;
                } else if meta.path.is_ident("recurse") {
                    inject.recurse = true;
                } else {
                    return Err(meta.error("expected `name`, `nested` or `recurse`"));
                }
                Ok(())
            })?;
        }

        if inject.nested && (inject.name.is_some() || inject.recurse) {
            return Err(syn::Error::new_spanned(
                attr,
                "`nested` cannot be combined with `name` or `recurse`",
            ));
        }
        parsed = Some(inject);
    }

    Ok(parsed)
}
