//! `#[derive(Error)]` implementation.
//!
//! ```ignore
//! use ledger_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum LedgerError {
//!     #[error("contract not found at address {0}")]
//!     ContractNotFound(String),
//!
//!     #[error("{0}")]
//!     Execution(#[from] VMError),
//!
//!     #[error("stale proof: expected {expected}, got {actual}")]
//!     StaleProof { expected: String, actual: String },
//!
//!     #[error("mining cancelled")]
//!     MiningCancelled,
//! }
//! ```
//!
//! Positional placeholders (`{0}`) refer to tuple fields, named placeholders to
//! struct fields. Fields that the message does not mention are bound but not
//! passed to `write!`. A field marked `#[from]` must be the only field of its
//! variant and produces a `From<FieldType>` impl.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (display_body, from_impls) = match &input.data {
        Data::Enum(data) => {
            let mut arms = Vec::with_capacity(data.variants.len());
            let mut froms = Vec::new();

            for variant in &data.variants {
                let ident = &variant.ident;
                let message = message_from_attrs(
                    &variant.attrs,
                    variant,
                    &format!("variant `{}`", ident),
                )?;
                arms.push(display_arm(ident, &variant.fields, &message));

                if let Some(from) = from_impl(name, ident, &variant.fields)? {
                    froms.push(from);
                }
            }

            (
                quote! {
                    match self {
                        #(#arms)*
                    }
                },
                froms,
            )
        }
        Data::Struct(data) => {
            let message = message_from_attrs(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;
            (struct_display(&data.fields, &message), Vec::new())
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}

        #(#from_impls)*
    })
}

/// Returns true if `message` interpolates the placeholder `name`.
fn mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

fn display_arm(variant: &syn::Ident, fields: &Fields, message: &str) -> TokenStream2 {
    match fields {
        Fields::Unit => quote! {
            Self::#variant => write!(f, #message),
        },
        Fields::Unnamed(unnamed) => {
            let bindings: Vec<_> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let format = positional_to_named(message, bindings.len());
            let used: Vec<_> = bindings
                .iter()
                .filter(|b| mentions(&format, &b.to_string()))
                .collect();
            quote! {
                Self::#variant(#(#bindings),*) => write!(f, #format, #(#used = #used),*),
            }
        }
        Fields::Named(named) => {
            let bindings: Vec<_> = named.named.iter().filter_map(|f| f.ident.as_ref()).collect();
            let used: Vec<_> = bindings
                .iter()
                .filter(|b| mentions(message, &b.to_string()))
                .collect();
            quote! {
                Self::#variant { #(#bindings),* } => write!(f, #message, #(#used = #used),*),
            }
        }
    }
}

fn struct_display(fields: &Fields, message: &str) -> TokenStream2 {
    match fields {
        Fields::Unit => quote! { write!(f, #message) },
        Fields::Named(named) => {
            let used: Vec<_> = named
                .named
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .filter(|ident| mentions(message, &ident.to_string()))
                .collect();
            quote! { write!(f, #message, #(#used = self.#used),*) }
        }
        Fields::Unnamed(unnamed) => {
            let format = positional_to_named(message, unnamed.unnamed.len());
            let (idents, indices): (Vec<_>, Vec<_>) = (0..unnamed.unnamed.len())
                .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                .filter(|(ident, _)| mentions(&format, &ident.to_string()))
                .unzip();
            quote! { write!(f, #format, #(#idents = self.#indices),*) }
        }
    }
}

/// Builds `impl From<T> for Enum` when the variant's single field carries `#[from]`.
fn from_impl(
    enum_name: &syn::Ident,
    variant: &syn::Ident,
    fields: &Fields,
) -> syn::Result<Option<TokenStream2>> {
    let all: Vec<&syn::Field> = fields.iter().collect();
    let marked = all
        .iter()
        .filter(|field| field.attrs.iter().any(|a| a.path().is_ident("from")))
        .count();
    if marked == 0 {
        return Ok(None);
    }
    if marked != 1 || all.len() != 1 {
        return Err(syn::Error::new_spanned(
            variant,
            "#[from] requires a variant with exactly one field",
        ));
    }

    let field = all[0];
    let ty = &field.ty;
    let construct = match &field.ident {
        Some(ident) => quote! { #enum_name::#variant { #ident: source } },
        None => quote! { #enum_name::#variant(source) },
    };

    Ok(Some(quote! {
        impl ::std::convert::From<#ty> for #enum_name {
            fn from(source: #ty) -> Self {
                #construct
            }
        }
    }))
}

/// Reads the string literal out of `#[error("...")]`.
fn message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!("missing #[error(\"...\")] attribute on {target_desc}"),
        ));
    };

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] message must be a single string literal",
        )),
    }
}

/// Rewrites `{0}` / `{0:?}` placeholders to `{f0}` / `{f0:?}`.
fn positional_to_named(message: &str, field_count: usize) -> String {
    let mut out = message.to_string();
    for i in (0..field_count).rev() {
        out = out
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    out
}
