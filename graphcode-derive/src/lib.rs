//! # Graphcode Derive Macros
//!
//! This crate provides the procedural macros for `graphcode`. It automates the implementation
//! of `EncodeFields` together with either the `Record` contract (`GraphRecord`) or the
//! two-phase `Object` contract (`GraphObject`).
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, Generics, LitStr, Type,
};

/// Derives `EncodeFields`, `Record`, `Encode` and `Decode` for a value-typed struct.
///
/// Every field type must implement `Encode` and `Decode`. With
/// `#[graphcode(type_id = "...")]` the record writes a type descriptor and can
/// be registered for use behind a `Polymorphic` slot.
#[proc_macro_derive(GraphRecord, attributes(graphcode))]
pub fn derive_graph_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input, Kind::Record) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derives `EncodeFields` and `Object` for an arena-resident struct.
///
/// The shell is `Default::default()`; `populate` then assigns every field that
/// is not marked `skip`. Use `#[graphcode(type_id = "...")]` on the struct to
/// make the type usable behind an `ObjectRef`, or
/// `#[graphcode(type_id_fn = "path")]` when the identifier depends on the
/// type's generic parameters.
#[proc_macro_derive(GraphObject, attributes(graphcode))]
pub fn derive_graph_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input, Kind::Object) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Record,
    Object,
}

// --- Internal Data Structures ---
struct FieldSpec {
    ident: syn::Ident,
    key: String,
    skip: bool,
    default: bool,
}

/// Where the generated `type_identifier` gets its value.
enum TypeIdSource {
    Literal(String),
    Function(syn::Path),
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    default: bool,
}

fn expand(input: &DeriveInput, kind: Kind) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let derive_name = match kind {
        Kind::Record => "GraphRecord",
        Kind::Object => "GraphObject",
    };

    let data_struct = match &input.data {
        Data::Struct(ds) => ds,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                format!("{derive_name} only supports structs"),
            ));
        }
    };

    let type_id = parse_container_attributes(&input.attrs)?;

    let mut fields = Vec::new();
    match &data_struct.fields {
        Fields::Named(named) => {
            for field in &named.named {
                let attrs = parse_field_attributes(&field.attrs)?;
                let Some(ident) = field.ident.clone() else {
                    continue;
                };
                fields.push(FieldSpec {
                    key: attrs.rename.unwrap_or_else(|| ident.to_string()),
                    ident,
                    skip: attrs.skip,
                    // An absent optional key simply means `None`.
                    default: attrs.default || is_option(&field.ty),
                });
            }
        }
        Fields::Unit => {}
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                name.span(),
                format!("{derive_name} requires named fields"),
            ));
        }
    }

    let identifier = type_id.map(|source| match source {
        TypeIdSource::Literal(id) => quote! { ::std::borrow::Cow::Borrowed(#id) },
        TypeIdSource::Function(path) => quote! { ::std::convert::Into::into(#path()) },
    });

    let impl_fields = generate_encode_fields(input, &fields);
    let impl_kind = match kind {
        Kind::Record => generate_record(input, &fields, identifier),
        Kind::Object => generate_object(input, &fields, identifier),
    };

    Ok(quote! {
        #impl_fields
        #impl_kind
    })
}

/// Parses struct-level attributes. Returns the type identifier source, if any.
fn parse_container_attributes(attrs: &[Attribute]) -> syn::Result<Option<TypeIdSource>> {
    let mut type_id = None;

    for attr in attrs {
        if attr.path().is_ident("graphcode") {
            attr.parse_nested_meta(|meta| {
                if type_id.is_some()
                    && (meta.path.is_ident("type_id") || meta.path.is_ident("type_id_fn"))
                {
                    return Err(meta.error("type_id and type_id_fn may only be given once"));
                }

                if meta.path.is_ident("type_id") {
                    let s: LitStr = meta.value()?.parse()?;
                    if s.value().is_empty() {
                        return Err(meta.error("type_id must not be empty"));
                    }
                    type_id = Some(TypeIdSource::Literal(s.value()));
                    return Ok(());
                }

                if meta.path.is_ident("type_id_fn") {
                    let s: LitStr = meta.value()?.parse()?;
                    type_id = Some(TypeIdSource::Function(s.parse()?));
                    return Ok(());
                }
                Err(meta.error(
                    "Unknown graphcode container attribute. Supported: type_id, type_id_fn",
                ))
            })?;
        }
    }
    Ok(type_id)
}

/// True for `Option<_>`, however it is spelled (`Option`, `std::option::Option`, ...).
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

/// Copies the item's generics, bounding every type parameter by `bounds`.
fn bounded(
    input: &DeriveInput,
    bounds: proc_macro2::TokenStream,
    extra: Option<syn::WherePredicate>,
) -> Generics {
    let mut generics = input.generics.clone();
    let params: Vec<_> = input
        .generics
        .type_params()
        .map(|param| param.ident.clone())
        .collect();
    let where_clause = generics.make_where_clause();
    for ident in params {
        where_clause
            .predicates
            .push(parse_quote! { #ident: #bounds });
    }
    if let Some(predicate) = extra {
        where_clause.predicates.push(predicate);
    }
    generics
}

/// Parses field-level attributes.
fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("graphcode") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    out.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("default") {
                    out.default = true;
                    return Ok(());
                }

                if meta.path.is_ident("rename") {
                    let s: LitStr = meta.value()?.parse()?;
                    if s.value() == "@type" {
                        return Err(meta.error("'@type' is reserved for the type descriptor"));
                    }
                    out.rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error(
                    "Unknown graphcode field attribute. Supported: rename, skip, default",
                ))
            })?;
        }
    }
    Ok(out)
}

// --- Generator: EncodeFields ---

fn generate_encode_fields(input: &DeriveInput, fields: &[FieldSpec]) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let generics = bounded(input, quote! { graphcode::Encode }, None);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let puts = fields.iter().filter(|f| !f.skip).map(|f| {
        let ident = &f.ident;
        let key = &f.key;
        quote! { mapper.field(#key, &self.#ident); }
    });

    quote! {
        impl #impl_generics graphcode::EncodeFields for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn encode_fields<'__graphcode>(
                &'__graphcode self,
                mapper: &mut graphcode::Mapper<'__graphcode>,
            ) -> graphcode::Result<()> {
                #(#puts)*
                Ok(())
            }
        }
    }
}

// --- Generator: Record ---

fn generate_record(
    input: &DeriveInput,
    fields: &[FieldSpec],
    identifier: Option<proc_macro2::TokenStream>,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let generics = bounded(input, quote! { graphcode::Encode + graphcode::Decode }, None);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let identifier = identifier.map(|value| {
        quote! {
            fn type_identifier() -> Option<::std::borrow::Cow<'static, str>> {
                Some(#value)
            }
        }
    });

    let inits = fields.iter().map(|f| {
        let ident = &f.ident;
        let key = &f.key;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else if f.default {
            quote! { #ident: fields.get_or_default(#key)? }
        } else {
            quote! { #ident: fields.get(#key)? }
        }
    });

    quote! {
        impl #impl_generics graphcode::Record for #name #ty_generics #where_clause {
            #identifier

            #[allow(unused_variables)]
            fn from_fields(fields: &mut graphcode::Fields<'_, '_>) -> graphcode::Result<Self> {
                Ok(Self {
                    #(#inits,)*
                })
            }
        }

        impl #impl_generics graphcode::Encode for #name #ty_generics #where_clause {
            fn encoding(&self) -> graphcode::Result<graphcode::Encoding<'_>> {
                Ok(graphcode::Encoding::Record {
                    fields: self,
                    type_identifier: <Self as graphcode::Record>::type_identifier(),
                })
            }
        }

        impl #impl_generics graphcode::Decode for #name #ty_generics #where_clause {
            fn decode<'t>(
                node: graphcode::SlotNode<'t>,
                decoder: &mut graphcode::Decoder<'t>,
            ) -> graphcode::Result<Self> {
                decoder.decode_record(node)
            }
        }
    }
}

// --- Generator: Object ---

fn generate_object(
    input: &DeriveInput,
    fields: &[FieldSpec],
    identifier: Option<proc_macro2::TokenStream>,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (_, plain_ty_generics, _) = input.generics.split_for_impl();
    let shell_bound: syn::WherePredicate =
        parse_quote! { #name #plain_ty_generics: ::core::default::Default };
    let generics = bounded(
        input,
        quote! { graphcode::Encode + graphcode::Decode + 'static },
        Some(shell_bound),
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let identifier = identifier.map(|value| {
        quote! {
            fn type_identifier() -> Option<::std::borrow::Cow<'static, str>>
            where
                Self: Sized,
            {
                Some(#value)
            }
        }
    });

    let assigns = fields.iter().filter(|f| !f.skip).map(|f| {
        let ident = &f.ident;
        let key = &f.key;
        if f.default {
            quote! { self.#ident = fields.get_or_default(#key)?; }
        } else {
            quote! { self.#ident = fields.get(#key)?; }
        }
    });

    quote! {
        impl #impl_generics graphcode::Object for #name #ty_generics #where_clause {
            #identifier

            fn create_shell() -> Self {
                ::core::default::Default::default()
            }

            #[allow(unused_variables)]
            fn populate(&mut self, fields: &mut graphcode::Fields<'_, '_>) -> graphcode::Result<()> {
                #(#assigns)*
                Ok(())
            }
        }
    }
}
