//! `#[derive(Reflect)]`: flattens a plain struct's fields into the
//! `(name, value)` pairs `intrometry::Reflect` requires.
//!
//! Supported field shapes:
//! - numeric scalars (`f64`, `f32`, any integer type, `bool`) — one entry
//!   named after the field;
//! - fixed-size arrays of a scalar type — one entry per index, named
//!   `field.0`, `field.1`, ...;
//! - any other field type is assumed to implement `Reflect` itself and is
//!   flattened recursively, with its entries prefixed `field.<name>`.
//!
//! Only structs with named fields are supported; tuple structs, unit
//! structs, and enums are rejected at macro-expansion time.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

#[proc_macro_derive(Reflect)]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Reflect can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Reflect can only be derived for structs",
            ))
        }
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let default_id = snake_case(&ident.to_string());

    let mut pushes = Vec::new();
    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.span(), "tuple fields are not supported"))?;
        pushes.push(field_push(field_ident, &field.ty));
    }

    let expanded = quote! {
        impl #impl_generics ::intrometry::Reflect for #ident #ty_generics #where_clause {
            fn default_id(&self) -> &str {
                #default_id
            }

            fn reflect(&self, sink: &mut dyn ::intrometry::ReflectSink, persistent_shape: bool) {
                let mut entries: ::std::vec::Vec<(::std::string::String, f64)> = ::std::vec::Vec::new();
                #(#pushes)*

                if !persistent_shape || ::intrometry::ReflectSink::size(sink) != entries.len() {
                    ::intrometry::ReflectSink::resize(sink, entries.len());
                    for (i, (name, _)) in entries.iter().enumerate() {
                        ::intrometry::ReflectSink::set_name(sink, i, name);
                    }
                }
                for (i, (_, value)) in entries.into_iter().enumerate() {
                    ::intrometry::ReflectSink::set_value(sink, i, value);
                }
            }
        }
    };

    Ok(expanded)
}

/// Builds the statement(s) that push `field_ident`'s contribution onto the
/// local `entries` vector, dispatching on the field's shape.
fn field_push(field_ident: &syn::Ident, ty: &Type) -> TokenStream2 {
    let name = field_ident.to_string();

    if let Type::Array(array) = ty {
        if is_scalar(&array.elem) {
            let len = &array.len;
            return quote_spanned! {field_ident.span()=>
                for i in 0..(#len) {
                    entries.push((::std::format!("{}.{}", #name, i), self.#field_ident[i] as f64));
                }
            };
        }
    }

    if is_bool(ty) {
        return quote_spanned! {field_ident.span()=>
            entries.push((#name.to_string(), if self.#field_ident { 1.0 } else { 0.0 }));
        };
    }

    if is_scalar(ty) {
        return quote_spanned! {field_ident.span()=>
            entries.push((#name.to_string(), self.#field_ident as f64));
        };
    }

    // Anything else is assumed to implement `Reflect` itself; flatten it
    // through a fresh collector and splice its entries in with a dotted
    // prefix, per the "imu.accel.0"-style nested composition.
    let nested_sink = format_ident!("__nested_{}", field_ident);
    quote_spanned! {field_ident.span()=>
        let mut #nested_sink = ::intrometry::reflect::FlatSink::new();
        ::intrometry::Reflect::reflect(&self.#field_ident, &mut #nested_sink, persistent_shape);
        for (name, value) in #nested_sink.into_entries() {
            entries.push((::std::format!("{}.{}", #name, name), value));
        }
    }
}

fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.is_ident("bool"))
}

const SCALAR_IDENTS: &[&str] = &[
    "f32", "f64", "i8", "i16", "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "isize",
    "usize",
];

fn is_scalar(ty: &Type) -> bool {
    match ty {
        Type::Path(p) => p
            .path
            .get_ident()
            .map(|ident| SCALAR_IDENTS.contains(&ident.to_string().as_str()))
            .unwrap_or(false),
        _ => false,
    }
}

/// `MyStruct` -> `my_struct`. Used only to compute the default identifier; a
/// simple ASCII case conversion is enough since Rust type identifiers are
/// ASCII by convention.
fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, c) in ident.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
