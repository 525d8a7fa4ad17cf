//! Field helpers shared by both derives.

use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields, GenericArgument, PathArguments, Type};

/// How a field holds its service.
#[derive(Clone, Copy)]
pub enum Shape<'a> {
    /// `Arc<T>`
    Shared(&'a Type),
    /// `Option<Arc<T>>`
    OptionalShared(&'a Type),
    /// `T`
    Owned(&'a Type),
    /// `Option<T>`
    OptionalOwned(&'a Type),
}

impl<'a> Shape<'a> {
    /// The service type `T` inside the field type.
    pub fn service(&self) -> &'a Type {
        match self {
            Shape::Shared(ty)
            | Shape::OptionalShared(ty)
            | Shape::Owned(ty)
            | Shape::OptionalOwned(ty) => ty,
        }
    }
}

/// Classify a field type by its outer `Option`/`Arc` wrappers.
///
/// Matching is by last path segment, so `std::sync::Arc<T>` and `Arc<T>`
/// are treated alike.
pub fn classify(ty: &Type) -> Shape<'_> {
    if let Some(inner) = unwrap_generic(ty, "Option") {
        return match unwrap_generic(inner, "Arc") {
            Some(service) => Shape::OptionalShared(service),
            None => Shape::OptionalOwned(inner),
        };
    }
    match unwrap_generic(ty, "Arc") {
        Some(service) => Shape::Shared(service),
        None => Shape::Owned(ty),
    }
}

fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Named fields of a struct, or a compile error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a Punctuated<Field, Comma>, syn::Error> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}
