use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, Type, parse_macro_input};

use crate::utils;

enum Kind<'a> {
    /// Required constructor argument.
    Required { ident: &'a Ident, ty: &'a Type },
    /// `Option<T>` field, starts as `None`.
    Optional { ident: &'a Ident, inner: &'a Type },
    /// `#[new(default)]` field, starts as `Default::default()`.
    Defaulted { ident: &'a Ident, ty: &'a Type },
}

pub fn derive_new_inner(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let generics = input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&name, "`New` can only be derived for structs")
            .to_compile_error()
            .into();
    };
    let Fields::Named(named) = &data.fields else {
        return syn::Error::new_spanned(&name, "`New` requires named fields")
            .to_compile_error()
            .into();
    };

    let mut kinds = Vec::<Kind>::new();
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        let mut defaulted = false;
        for attr in &field.attrs {
            if !attr.path().is_ident("new") {
                continue;
            }
            let parse_result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    defaulted = true;
                    return Ok(());
                }
                Err(meta.error("unsupported new attribute; expected default"))
            });
            if let Err(err) = parse_result {
                return err.to_compile_error().into();
            }
        }

        if defaulted {
            kinds.push(Kind::Defaulted {
                ident,
                ty: &field.ty,
            });
        } else if let Some(inner) = utils::inner_of_option(&field.ty) {
            kinds.push(Kind::Optional { ident, inner });
        } else {
            kinds.push(Kind::Required {
                ident,
                ty: &field.ty,
            });
        }
    }

    let mut new_args = Vec::new();
    let mut inits = Vec::new();
    let mut builders = Vec::new();
    let mut has_defaulted = false;

    for kind in &kinds {
        match kind {
            Kind::Required { ident, ty } => {
                new_args.push(quote! { #ident: #ty });
                inits.push(quote! { #ident });
                let method = format_ident!("with_{}", ident);
                builders.push(quote! {
                    pub fn #method(mut self, #ident: #ty) -> Self {
                        self.#ident = #ident;
                        self
                    }
                });
            }
            Kind::Optional { ident, inner } => {
                inits.push(quote! { #ident: None });
                let method = format_ident!("with_{}", ident);
                builders.push(quote! {
                    pub fn #method(mut self, #ident: #inner) -> Self {
                        self.#ident = Some(#ident);
                        self
                    }
                });
            }
            Kind::Defaulted { ident, ty } => {
                has_defaulted = true;
                inits.push(quote! { #ident: <#ty as Default>::default() });
                let method = format_ident!("with_{}", ident);
                builders.push(quote! {
                    pub fn #method(mut self, #ident: #ty) -> Self {
                        self.#ident = #ident;
                        self
                    }
                });
            }
        }
    }

    // `Default::default()` is not callable in a const context.
    let constness = if has_defaulted {
        quote! {}
    } else {
        quote! { const }
    };

    let expanded = quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Auto-generated constructor.
            pub #constness fn new(#(#new_args),*) -> Self {
                Self { #(#inits),* }
            }

            #(#builders)*
        }
    };

    TokenStream::from(expanded)
}
