// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Visibility};

/// `#[derive(Plug)]`: map a struct to an object value across the
/// plugin boundary.
///
/// Only fields carrying a `#[plug("name")]` tag are visible on the
/// other side; untagged fields are skipped on encode and filled with
/// `Default::default()` on decode. A tagged field that is not `pub` is
/// recorded as not visible and rejected when the containing type is
/// registered.
///
/// Example:
/// ```ignore
/// use plugbus::Plug;
///
/// #[derive(Plug, Default)]
/// pub struct Finding {
///     #[plug("rule")]
///     pub rule: String,
///     #[plug("severity")]
///     pub severity: i64,
///     cached_score: f64, // invisible across the boundary
/// }
/// ```
#[proc_macro_derive(Plug, attributes(plug))]
pub fn derive_plug(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let type_name = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return syn::Error::new_spanned(&input, "Only named fields are supported")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Only structs are supported")
                .to_compile_error()
                .into()
        }
    };

    struct TaggedField {
        ident: syn::Ident,
        ty: syn::Type,
        tag: String,
        public: bool,
    }

    let mut tagged = Vec::new();
    let mut untagged_idents = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.clone() else {
            return syn::Error::new_spanned(field, "Field must have a name")
                .to_compile_error()
                .into();
        };

        let mut tag = None;
        for attr in &field.attrs {
            if attr.path().is_ident("plug") {
                match attr.parse_args::<syn::LitStr>() {
                    Ok(lit) => tag = Some(lit.value()),
                    Err(_) => {
                        return syn::Error::new_spanned(
                            attr,
                            "expected #[plug(\"attribute-name\")]",
                        )
                        .to_compile_error()
                        .into()
                    }
                }
            }
        }

        match tag {
            Some(tag) => {
                if tag.is_empty() {
                    return syn::Error::new_spanned(field, "attribute name must not be empty")
                        .to_compile_error()
                        .into();
                }
                tagged.push(TaggedField {
                    ident,
                    ty: field.ty.clone(),
                    tag,
                    public: matches!(field.vis, Visibility::Public(_)),
                });
            }
            None => untagged_idents.push(ident),
        }
    }

    let native_fields = tagged.iter().map(|f| {
        let tag = &f.tag;
        let public = f.public;
        let ty = &f.ty;
        quote! {
            plugbus::NativeField {
                tag: #tag,
                public: #public,
                ty: <#ty as plugbus::Plug>::native_type(),
            }
        }
    });

    let insert_attrs = tagged.iter().map(|f| {
        let tag = &f.tag;
        let ident = &f.ident;
        quote! {
            attrs.insert(
                #tag.to_string(),
                plugbus::Plug::into_dynamic(self.#ident),
            );
        }
    });

    let decode_fields = tagged.iter().map(|f| {
        let tag = &f.tag;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            #ident: <#ty as plugbus::Plug>::from_dynamic(
                value.attribute(#tag).unwrap_or(&null),
                &path.attribute(#tag),
            )?,
        }
    });

    let default_fields = untagged_idents.iter().map(|ident| {
        quote! {
            #ident: ::core::default::Default::default(),
        }
    });

    let null_binding = if tagged.is_empty() {
        quote! {}
    } else {
        quote! {
            let null = plugbus::DynamicValue::null(plugbus::TypeDescriptor::Unknown);
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics plugbus::Plug for #name #ty_generics #where_clause {
            fn native_type() -> plugbus::NativeType {
                plugbus::NativeType::Struct {
                    name: #type_name,
                    fields: vec![#(#native_fields),*],
                }
            }

            fn into_dynamic(self) -> plugbus::DynamicValue {
                let mut attrs = ::std::collections::BTreeMap::new();
                #(#insert_attrs)*
                plugbus::DynamicValue::object(attrs)
            }

            fn from_dynamic(
                value: &plugbus::DynamicValue,
                path: &plugbus::Path,
            ) -> plugbus::Result<Self> {
                if !value.is_null() && value.entries().is_none() {
                    return Err(plugbus::Error::conversion(
                        path,
                        format!("expected object, found {}", value.ty()),
                    ));
                }
                #null_binding
                Ok(Self {
                    #(#decode_fields)*
                    #(#default_fields)*
                })
            }
        }
    };

    expanded.into()
}
