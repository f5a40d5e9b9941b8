use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Variant, spanned::Spanned};

use crate::utils;

/// One accepted spelling set for a unit variant.
struct VariantNames {
    ident: Ident,
    canonical: String,
    aliases: Vec<String>,
}

impl VariantNames {
    fn from_variant(variant: &Variant) -> syn::Result<Self> {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "CliValue only supports enums with unit variants",
            ));
        }

        let mut names = Self {
            ident: variant.ident.clone(),
            canonical: utils::to_kebab_case(&variant.ident.to_string()),
            aliases: Vec::new(),
        };
        for attr in variant.attrs.iter().filter(|a| a.path().is_ident("cli")) {
            attr.parse_nested_meta(|meta| {
                let lit: LitStr = meta.value()?.parse()?;
                if meta.path.is_ident("name") {
                    names.canonical = lit.value();
                } else if meta.path.is_ident("alias") {
                    names.aliases.push(lit.value());
                } else {
                    return Err(meta.error("unsupported cli attribute; expected name/alias"));
                }
                Ok(())
            })?;
        }
        Ok(names)
    }

    fn parse_arm(&self) -> TokenStream2 {
        let ident = &self.ident;
        let spellings = std::iter::once(&self.canonical).chain(&self.aliases);
        quote! { #(#spellings)|* => Ok(Self::#ident), }
    }

    fn name_arm(&self) -> TokenStream2 {
        let (ident, canonical) = (&self.ident, &self.canonical);
        quote! { Self::#ident => #canonical, }
    }
}

fn option_name(enum_ident: &Ident, attrs: &[Attribute]) -> syn::Result<String> {
    let mut name = utils::to_kebab_case(&enum_ident.to_string());
    for attr in attrs.iter().filter(|a| a.path().is_ident("cli_value")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("option") {
                return Err(meta.error("unsupported cli_value attribute; expected option = \"...\""));
            }
            name = meta.value()?.parse::<LitStr>()?.value();
            Ok(())
        })?;
    }
    Ok(name)
}

pub fn derive_cli_value_inner(item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "CliValue can only be derived for enums",
        ));
    };

    let enum_ident = &input.ident;
    let option = option_name(enum_ident, &input.attrs)?;
    let variants = data_enum
        .variants
        .iter()
        .map(VariantNames::from_variant)
        .collect::<syn::Result<Vec<_>>>()?;

    let idents = variants.iter().map(|s| &s.ident);
    let parse_arms = variants.iter().map(VariantNames::parse_arm);
    let name_arms = variants.iter().map(VariantNames::name_arm);
    let expected = variants
        .iter()
        .map(|s| s.canonical.as_str())
        .collect::<Vec<_>>()
        .join("|");

    Ok(quote! {
        impl #enum_ident {
            /// Every variant, in declaration order.
            pub const VARIANTS: &'static [Self] = &[#(Self::#idents),*];

            pub fn parse(raw: &str) -> crate::Result<Self> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    #(#parse_arms)*
                    _ => Err(crate::Error::invalid_input(format!(
                        "Invalid value for --{}: {} (expected {})",
                        #option, raw, #expected
                    ))),
                }
            }

            pub const fn as_str(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }

        impl std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    })
}
